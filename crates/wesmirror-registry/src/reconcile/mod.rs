//! Reconciliation of remote WES metadata into the mirror.
//!
//! Planning is pure: each function compares stored rows with a remote
//! payload and returns the [`Mutation`](wesmirror_store::Mutation)s that
//! bring the mirror in line. The registry applies a plan in one storage
//! transaction, so a failed fetch or a failed write leaves no partial state.

mod engines;
mod workflows;

use serde::Serialize;
use wesmirror_store::PlanSummary;

pub use engines::{plan_engine_sync, plan_registration_seed};
pub use workflows::{plan_workflow_seed, plan_workflow_sync};

/// Result of one synchronization against a remote server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The payload was fetched and the plan applied.
    Applied { summary: PlanSummary },
    /// The fetch failed; nothing was written.
    RemoteUnavailable { reason: String },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Applied { summary } => write!(f, "{summary}"),
            Self::RemoteUnavailable { reason } => write!(f, "remote unavailable: {reason}"),
        }
    }
}

/// Outcomes of a full refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub engines: SyncOutcome,
    pub workflows: SyncOutcome,
}

impl RefreshReport {
    pub fn is_success(&self) -> bool {
        self.engines.is_success() && self.workflows.is_success()
    }
}
