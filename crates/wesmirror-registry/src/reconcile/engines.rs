//! Engine, workflow type and supported version reconciliation.

use std::collections::{BTreeSet, HashSet};

use wesmirror_client::{ServiceInfo, WorkflowEngineInfo};
use wesmirror_store::Mutation;
use wesmirror_types::{SupportedWesVersion, TypeKey, WorkflowEngine};

/// Plan the inserts for a freshly registered service.
///
/// Insert-only: one engine per remote entry and one row per listed version,
/// in payload order.
pub fn plan_registration_seed(info: &ServiceInfo) -> Vec<Mutation> {
    let engines = info
        .workflow_engines
        .iter()
        .map(|engine| Mutation::CreateEngine {
            name: engine.engine_name.clone(),
            version: engine.engine_version.clone(),
            workflow_types: engine.type_keys(),
        });
    let versions = info
        .supported_wes_versions
        .iter()
        .map(|v| Mutation::CreateWesVersion {
            wes_version: v.clone(),
        });
    engines.chain(versions).collect()
}

/// Plan the merge of a fresh `/service-info` payload into a service's
/// stored engines and supported versions.
///
/// Engines are matched by name. A stored engine whose version is one of the
/// remote versions for its name is kept; each remote `(name, version)` entry
/// satisfies at most one stored row. Remaining stored engines of a listed
/// name take over the first unclaimed remote entry of that name, with their
/// types relinked; surplus ones and those whose name vanished are deleted.
/// Unclaimed remote entries are created. Applying the plan and planning
/// again with the same payload yields only the service info update.
pub fn plan_engine_sync(
    engines: &[WorkflowEngine],
    versions: &[SupportedWesVersion],
    info: &ServiceInfo,
) -> Vec<Mutation> {
    let mut plan = Vec::new();

    // Remote entries keyed by (name, version); the first occurrence wins.
    let mut remote: Vec<&WorkflowEngineInfo> = Vec::new();
    for entry in &info.workflow_engines {
        if !remote
            .iter()
            .any(|r| r.engine_name == entry.engine_name && r.engine_version == entry.engine_version)
        {
            remote.push(entry);
        }
    }
    let mut claimed: Vec<Option<&WorkflowEngine>> = vec![None; remote.len()];

    let mut unmatched = Vec::new();
    for engine in engines {
        let exact = (0..remote.len()).find(|&i| {
            claimed[i].is_none()
                && remote[i].engine_name == engine.name
                && remote[i].engine_version == engine.version
        });
        match exact {
            Some(i) => claimed[i] = Some(engine),
            None => unmatched.push(engine),
        }
    }

    for engine in unmatched {
        let free = (0..remote.len())
            .find(|&i| claimed[i].is_none() && remote[i].engine_name == engine.name);
        match free {
            Some(i) => {
                plan.push(Mutation::UpdateEngine {
                    token: engine.token.clone(),
                    version: remote[i].engine_version.clone(),
                    workflow_types: remote[i].type_keys(),
                });
                claimed[i] = Some(engine);
            }
            None => plan.push(Mutation::DeleteEngine {
                token: engine.token.clone(),
            }),
        }
    }

    for (entry, stored) in remote.iter().zip(&claimed) {
        let keys = entry.type_keys();
        match stored {
            None => plan.push(Mutation::CreateEngine {
                name: entry.engine_name.clone(),
                version: entry.engine_version.clone(),
                workflow_types: keys,
            }),
            // Rows moved to a new version above already carry the remote types.
            Some(engine) if engine.version == entry.engine_version => {
                if !same_types(&engine.type_keys(), &keys) {
                    plan.push(Mutation::RelinkEngineTypes {
                        token: engine.token.clone(),
                        workflow_types: keys,
                    });
                }
            }
            Some(_) => {}
        }
    }

    plan.extend(plan_version_sync(versions, &info.supported_wes_versions));

    plan.push(Mutation::UpdateServiceInfo {
        auth_instructions_url: info.auth_instructions_url.clone(),
        contact_info_url: info.contact_info_url.clone(),
    });
    plan
}

fn plan_version_sync(versions: &[SupportedWesVersion], remote: &[String]) -> Vec<Mutation> {
    let mut plan = Vec::new();
    let remote_set: HashSet<&str> = remote.iter().map(String::as_str).collect();

    let mut kept = HashSet::new();
    for version in versions {
        if remote_set.contains(version.wes_version.as_str()) {
            kept.insert(version.wes_version.as_str());
        } else {
            plan.push(Mutation::DeleteWesVersion {
                token: version.token.clone(),
            });
        }
    }

    for v in remote {
        if kept.insert(v.as_str()) {
            plan.push(Mutation::CreateWesVersion {
                wes_version: v.clone(),
            });
        }
    }
    plan
}

fn same_types(a: &[TypeKey], b: &[TypeKey]) -> bool {
    a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wesmirror_client::WorkflowTypeInfo;
    use wesmirror_types::WorkflowType;

    fn remote_engine(name: &str, version: &str, types: &[(&str, &str)]) -> WorkflowEngineInfo {
        WorkflowEngineInfo {
            engine_name: name.to_string(),
            engine_version: version.to_string(),
            workflow_types: types
                .iter()
                .map(|(t, v)| WorkflowTypeInfo {
                    language_type: t.to_string(),
                    language_version: v.to_string(),
                })
                .collect(),
        }
    }

    fn info(engines: Vec<WorkflowEngineInfo>, versions: &[&str]) -> ServiceInfo {
        ServiceInfo {
            auth_instructions_url: "https://example.org/auth".into(),
            contact_info_url: "https://example.org/contact".into(),
            workflow_engines: engines,
            supported_wes_versions: versions.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn local_engine(token: &str, name: &str, version: &str, types: &[(&str, &str)]) -> WorkflowEngine {
        let now = Utc::now();
        WorkflowEngine {
            token: token.into(),
            service_token: "svc".into(),
            name: name.into(),
            version: version.into(),
            workflow_types: types
                .iter()
                .map(|(t, v)| WorkflowType {
                    token: format!("{t}-{v}"),
                    language_type: t.to_string(),
                    version: v.to_string(),
                    deleted: false,
                    created_at: now,
                    updated_at: now,
                })
                .collect(),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn local_version(token: &str, version: &str) -> SupportedWesVersion {
        let now = Utc::now();
        SupportedWesVersion {
            token: token.into(),
            service_token: "svc".into(),
            wes_version: version.into(),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn without_info_update(plan: Vec<Mutation>) -> Vec<Mutation> {
        plan.into_iter()
            .filter(|m| !matches!(m, Mutation::UpdateServiceInfo { .. }))
            .collect()
    }

    #[test]
    fn test_registration_seed_is_insert_only() {
        let payload = info(
            vec![
                remote_engine("cwltool", "2.0", &[("CWL", "v1.0")]),
                remote_engine("nextflow", "21", &[]),
            ],
            &["1.0.0"],
        );
        let seed = plan_registration_seed(&payload);
        assert_eq!(seed.len(), 3);
        assert!(seed.iter().all(|m| m.kind() == wesmirror_store::MutationKind::Create));
    }

    #[test]
    fn test_unchanged_payload_plans_only_info_update() {
        let payload = info(
            vec![remote_engine("cwltool", "2.0", &[("CWL", "v1.0")])],
            &["1.0.0"],
        );
        let engines = [local_engine("e1", "cwltool", "2.0", &[("CWL", "v1.0")])];
        let versions = [local_version("v1", "1.0.0")];

        let plan = plan_engine_sync(&engines, &versions, &payload);
        assert_eq!(plan.len(), 1);
        assert!(matches!(plan[0], Mutation::UpdateServiceInfo { .. }));
    }

    #[test]
    fn test_engine_upgrade_updates_in_place() {
        let payload = info(
            vec![remote_engine("cwltool", "2.1", &[("CWL", "v1.1")])],
            &[],
        );
        let engines = [local_engine("e1", "cwltool", "2.0", &[("CWL", "v1.0")])];

        let plan = without_info_update(plan_engine_sync(&engines, &[], &payload));
        assert_eq!(
            plan,
            vec![Mutation::UpdateEngine {
                token: "e1".into(),
                version: "2.1".into(),
                workflow_types: vec![TypeKey::new("CWL", "v1.1")],
            }]
        );
    }

    #[test]
    fn test_vanished_engine_deleted_and_new_engine_created() {
        let payload = info(vec![remote_engine("toil", "5", &[("CWL", "v1.0")])], &[]);
        let engines = [local_engine("e1", "cwltool", "2.0", &[])];

        let plan = without_info_update(plan_engine_sync(&engines, &[], &payload));
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0], Mutation::DeleteEngine { token: "e1".into() });
        assert!(matches!(&plan[1], Mutation::CreateEngine { name, .. } if name == "toil"));
    }

    #[test]
    fn test_changed_type_set_relinks() {
        let payload = info(
            vec![remote_engine("cwltool", "2.0", &[("CWL", "v1.0"), ("CWL", "v1.1")])],
            &[],
        );
        let engines = [local_engine("e1", "cwltool", "2.0", &[("CWL", "v1.0")])];

        let plan = without_info_update(plan_engine_sync(&engines, &[], &payload));
        assert!(matches!(&plan[..], [Mutation::RelinkEngineTypes { token, workflow_types }]
            if token == "e1" && workflow_types.len() == 2));
    }

    #[test]
    fn test_reordered_types_do_not_relink() {
        let payload = info(
            vec![remote_engine("cwltool", "2.0", &[("CWL", "v1.1"), ("CWL", "v1.0")])],
            &[],
        );
        let engines = [local_engine("e1", "cwltool", "2.0", &[("CWL", "v1.0"), ("CWL", "v1.1")])];
        assert!(without_info_update(plan_engine_sync(&engines, &[], &payload)).is_empty());
    }

    #[test]
    fn test_duplicate_remote_names_create_missing_version() {
        let payload = info(
            vec![
                remote_engine("cwltool", "2.0", &[]),
                remote_engine("cwltool", "3.0", &[]),
            ],
            &[],
        );
        let engines = [local_engine("e1", "cwltool", "2.0", &[])];

        let plan = without_info_update(plan_engine_sync(&engines, &[], &payload));
        assert_eq!(plan.len(), 1);
        assert!(matches!(&plan[0], Mutation::CreateEngine { version, .. } if version == "3.0"));
    }

    #[test]
    fn test_duplicate_remote_names_keep_every_listed_version() {
        let payload = info(
            vec![
                remote_engine("cwltool", "2.0", &[("CWL", "v1.0")]),
                remote_engine("cwltool", "3.0", &[("CWL", "v1.2")]),
            ],
            &[],
        );
        let engines = [
            local_engine("e1", "cwltool", "2.0", &[("CWL", "v1.0")]),
            local_engine("e2", "cwltool", "3.0", &[("CWL", "v1.2")]),
        ];
        assert!(without_info_update(plan_engine_sync(&engines, &[], &payload)).is_empty());
    }

    #[test]
    fn test_stale_duplicate_takes_unclaimed_version() {
        let payload = info(
            vec![
                remote_engine("cwltool", "2.0", &[]),
                remote_engine("cwltool", "3.1", &[("CWL", "v1.2")]),
            ],
            &[],
        );
        let engines = [
            local_engine("e1", "cwltool", "3.0", &[]),
            local_engine("e2", "cwltool", "2.0", &[]),
        ];

        let plan = without_info_update(plan_engine_sync(&engines, &[], &payload));
        assert_eq!(
            plan,
            vec![Mutation::UpdateEngine {
                token: "e1".into(),
                version: "3.1".into(),
                workflow_types: vec![TypeKey::new("CWL", "v1.2")],
            }]
        );
    }

    #[test]
    fn test_surplus_rows_of_one_version_are_deleted() {
        let payload = info(
            vec![
                remote_engine("cwltool", "2.0", &[]),
                remote_engine("cwltool", "2.0", &[]),
            ],
            &[],
        );
        let engines = [
            local_engine("e1", "cwltool", "2.0", &[]),
            local_engine("e2", "cwltool", "2.0", &[]),
        ];

        let plan = without_info_update(plan_engine_sync(&engines, &[], &payload));
        assert_eq!(plan, vec![Mutation::DeleteEngine { token: "e2".into() }]);
    }

    #[test]
    fn test_version_sync() {
        let payload = info(vec![], &["1.0.0", "1.1.0", "1.1.0"]);
        let versions = [local_version("v0", "0.3.0"), local_version("v1", "1.0.0")];

        let plan = without_info_update(plan_engine_sync(&[], &versions, &payload));
        assert_eq!(
            plan,
            vec![
                Mutation::DeleteWesVersion { token: "v0".into() },
                Mutation::CreateWesVersion {
                    wes_version: "1.1.0".into()
                },
            ]
        );
    }
}
