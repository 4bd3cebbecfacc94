//! Registry error types.

use thiserror::Error;

/// Message shown when the submitted server does not answer `/service-info`.
pub const UNREACHABLE_MESSAGE: &str = "Please enter the correct URL.";

/// Message shown when the submitted service name is taken.
pub const DUPLICATE_NAME_MESSAGE: &str = "A service with that name already exists.";

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors from registry operations.
///
/// Remote failures during synchronization are not errors; they are reported
/// as [`SyncOutcome::RemoteUnavailable`](crate::SyncOutcome::RemoteUnavailable).
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Storage error: {0}")]
    Store(#[from] wesmirror_store::StoreError),

    #[error("{0}")]
    Validation(String),

    #[error("{UNREACHABLE_MESSAGE}")]
    Unreachable(#[source] wesmirror_client::Error),

    #[error("{DUPLICATE_NAME_MESSAGE}")]
    DuplicateName(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("{0}")]
    Cwl(String),

    #[error("Parameter error: {0}")]
    Parameter(#[from] wesmirror_types::Error),
}
