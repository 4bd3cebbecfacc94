//! Write vocabulary for the mirror.
//!
//! Reconciliation computes a list of [`Mutation`]s against one service and
//! hands it to [`MirrorStorage::apply`](crate::MirrorStorage::apply), which
//! applies the whole list in a single transaction.

use serde::Serialize;
use wesmirror_types::{Token, TypeKey, WorkflowDraft};

/// One change to a service's mirrored children.
///
/// Workflow types are referenced by [`TypeKey`] and resolved with an upsert
/// when applied, so they are never duplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Overwrite the cached URLs on the service row and bump `updated_at`.
    UpdateServiceInfo {
        auth_instructions_url: String,
        contact_info_url: String,
    },
    /// Hard-delete an engine mirror row (join rows cascade).
    DeleteEngine { token: Token },
    /// Change an engine's version and replace its type links.
    UpdateEngine {
        token: Token,
        version: String,
        workflow_types: Vec<TypeKey>,
    },
    /// Replace an engine's type links, keeping its version.
    RelinkEngineTypes {
        token: Token,
        workflow_types: Vec<TypeKey>,
    },
    /// Insert a new engine and link its types.
    CreateEngine {
        name: String,
        version: String,
        workflow_types: Vec<TypeKey>,
    },
    /// Hard-delete a supported WES version row.
    DeleteWesVersion { token: Token },
    /// Insert a supported WES version row.
    CreateWesVersion { wes_version: String },
    /// Insert a workflow row.
    CreateWorkflow { draft: WorkflowDraft },
    /// Overwrite a workflow row in place; `revive` clears its deleted flag.
    UpdateWorkflow {
        token: Token,
        draft: WorkflowDraft,
        revive: bool,
    },
    /// Mark a workflow row deleted without removing it.
    SoftDeleteWorkflow { token: Token },
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::CreateEngine { .. }
            | Self::CreateWesVersion { .. }
            | Self::CreateWorkflow { .. } => MutationKind::Create,
            Self::DeleteEngine { .. }
            | Self::DeleteWesVersion { .. }
            | Self::SoftDeleteWorkflow { .. } => MutationKind::Delete,
            Self::UpdateServiceInfo { .. }
            | Self::UpdateEngine { .. }
            | Self::RelinkEngineTypes { .. }
            | Self::UpdateWorkflow { .. } => MutationKind::Update,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

/// Row counts touched by an applied plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl PlanSummary {
    pub fn of(mutations: &[Mutation]) -> Self {
        let mut summary = Self::default();
        for m in mutations {
            match m.kind() {
                MutationKind::Create => summary.created += 1,
                MutationKind::Update => summary.updated += 1,
                MutationKind::Delete => summary.deleted += 1,
            }
        }
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deleted == 0
    }
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deleted",
            self.created, self.updated, self.deleted
        )
    }
}
