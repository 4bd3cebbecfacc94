//! Local mirror of WES service metadata.
//!
//! SQLite holds services and the engines, supported versions, workflows and
//! workflow types mirrored from them. Writes made during reconciliation are
//! expressed as [`Mutation`] plans and applied atomically.

pub mod error;
pub mod mutation;
pub mod storage;
pub mod store;

pub use error::{Result, StoreError};
pub use mutation::{Mutation, MutationKind, PlanSummary};
pub use storage::{MirrorStorage, NewService, Visibility};
pub use store::SqliteMirrorStore;
