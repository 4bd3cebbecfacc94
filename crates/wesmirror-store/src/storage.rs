//! Storage abstraction for the mirror.
//!
//! # Architecture
//!
//! ```text
//! MirrorStorage (trait)      - service lifecycle, child reads, plan apply
//!     └── SqliteMirrorStore  - default SQLite implementation
//! ```
//!
//! Reads return rows regardless of their `deleted` flag unless a method says
//! otherwise; soft-deleted rows stay queryable.

use serde::{Deserialize, Serialize};
use wesmirror_types::{
    Scheme, Service, SupportedWesVersion, Token, TypeKey, Workflow, WorkflowEngine, WorkflowType,
};

use crate::mutation::{Mutation, PlanSummary};
use crate::Result;

/// Fields of a service row supplied at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewService {
    pub name: String,
    pub server_scheme: Scheme,
    pub server_host: String,
    pub server_token: Option<String>,
    pub auth_instructions_url: String,
    pub contact_info_url: String,
}

/// Which rows a listing includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    /// Only rows with `deleted = false`.
    #[default]
    Live,
    /// Live and soft-deleted rows.
    All,
}

impl Visibility {
    pub fn includes_deleted(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// Repository over the mirrored metadata.
pub trait MirrorStorage: Send + Sync {
    // ── Services ────────────────────────────────────────────────────────

    /// Insert a service and apply `seed` against it, in one transaction.
    ///
    /// Fails with [`StoreError::Conflict`](crate::StoreError::Conflict) if
    /// the name is taken.
    fn create_service(&self, service: &NewService, seed: &[Mutation]) -> Result<Service>;

    /// Get a service by token.
    fn get_service(&self, token: &str) -> Result<Service>;

    /// Find a service by its unique name, deleted or not.
    fn find_service_by_name(&self, name: &str) -> Result<Option<Service>>;

    /// List services ordered by name.
    fn list_services(&self, visibility: Visibility) -> Result<Vec<Service>>;

    /// Set `deleted` on the service and every engine, supported version and
    /// workflow it owns, in one transaction.
    fn soft_delete_service(&self, token: &str) -> Result<()>;

    /// Remove a service row; owned rows cascade, workflow types remain.
    fn purge_service(&self, token: &str) -> Result<()>;

    // ── Children ────────────────────────────────────────────────────────

    /// Engines of a service with their linked types, in insertion order.
    fn list_engines(&self, service_token: &str) -> Result<Vec<WorkflowEngine>>;

    /// Supported WES versions of a service, in insertion order.
    fn list_supported_versions(&self, service_token: &str) -> Result<Vec<SupportedWesVersion>>;

    /// Workflows, optionally restricted to one service, in insertion order.
    fn list_workflows(
        &self,
        service_token: Option<&str>,
        visibility: Visibility,
    ) -> Result<Vec<Workflow>>;

    /// Get a workflow by token.
    fn get_workflow(&self, token: &str) -> Result<Workflow>;

    // ── Workflow types ──────────────────────────────────────────────────

    /// Get or create the type row for `key`.
    fn upsert_workflow_type(&self, key: &TypeKey) -> Result<WorkflowType>;

    /// All workflow type rows, ordered by type then version.
    fn list_workflow_types(&self) -> Result<Vec<WorkflowType>>;

    // ── Reconciliation ──────────────────────────────────────────────────

    /// Apply `mutations` against the service in one transaction.
    fn apply(&self, service_token: &Token, mutations: &[Mutation]) -> Result<PlanSummary>;
}
