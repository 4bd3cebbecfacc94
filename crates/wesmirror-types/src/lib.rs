//! Shared types for the wesmirror system.
//!
//! Entities mirrored from remote WES servers, the connection endpoint of a
//! registered service, and the typed run-parameter schema.

pub mod entities;
pub mod error;
pub mod params;

use chrono::{DateTime, Utc};

pub use entities::{
    Endpoint, Scheme, Service, SupportedWesVersion, TypeKey, Workflow, WorkflowDraft,
    WorkflowEngine, WorkflowType,
};
pub use error::{Error, Result};
pub use params::{InputParam, ParamKind, ParamValue};

/// Opaque row identifier shared by every mirrored entity.
pub type Token = String;

/// UTC timestamp used for `created_at` / `updated_at`.
pub type Timestamp = DateTime<Utc>;

/// Generate a fresh row token: 32 lowercase hex characters.
pub fn new_token() -> Token {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Current UTC time.
pub fn now() -> Timestamp {
    Utc::now()
}
