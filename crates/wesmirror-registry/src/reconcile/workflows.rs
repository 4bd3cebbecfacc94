//! Workflow list reconciliation.

use std::collections::{HashMap, HashSet};

use wesmirror_client::{WorkflowInfo, WorkflowList};
use wesmirror_store::Mutation;
use wesmirror_types::Workflow;

/// Plan one insert per remote entry, without deduplication.
pub fn plan_workflow_seed(list: &WorkflowList) -> Vec<Mutation> {
    list.workflows
        .iter()
        .map(|wf| Mutation::CreateWorkflow {
            draft: wf.to_draft(),
        })
        .collect()
}

/// Plan the merge of a fresh `/workflows` list into a service's stored
/// workflows, soft-deleted ones included.
///
/// Workflows are matched by name. A stored row whose name is gone is
/// soft-deleted. A row whose version is not among the remote versions for
/// its name is rewritten from the first remote entry with that name. A
/// soft-deleted row whose name is listed again is revived. Remote entries
/// with no stored `(name, version)` row are created.
pub fn plan_workflow_sync(stored: &[Workflow], list: &WorkflowList) -> Vec<Mutation> {
    let mut plan = Vec::new();

    let mut by_name: HashMap<&str, Vec<&WorkflowInfo>> = HashMap::new();
    for remote in &list.workflows {
        by_name
            .entry(remote.workflow_name.as_str())
            .or_default()
            .push(remote);
    }

    let mut present: HashSet<(String, String)> = HashSet::new();
    for workflow in stored {
        let Some(candidates) = by_name.get(workflow.name.as_str()) else {
            if !workflow.deleted {
                plan.push(Mutation::SoftDeleteWorkflow {
                    token: workflow.token.clone(),
                });
            }
            continue;
        };

        let matched = candidates
            .iter()
            .find(|r| r.workflow_version == workflow.version);
        match matched {
            Some(remote) => {
                if workflow.deleted {
                    plan.push(Mutation::UpdateWorkflow {
                        token: workflow.token.clone(),
                        draft: remote.to_draft(),
                        revive: true,
                    });
                }
            }
            None => {
                let first = candidates[0];
                plan.push(Mutation::UpdateWorkflow {
                    token: workflow.token.clone(),
                    draft: first.to_draft(),
                    revive: workflow.deleted,
                });
                present.insert((first.workflow_name.clone(), first.workflow_version.clone()));
                continue;
            }
        }
        present.insert((workflow.name.clone(), workflow.version.clone()));
    }

    for remote in &list.workflows {
        let key = (remote.workflow_name.clone(), remote.workflow_version.clone());
        if present.insert(key) {
            plan.push(Mutation::CreateWorkflow {
                draft: remote.to_draft(),
            });
        }
    }
    plan
}
