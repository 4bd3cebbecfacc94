//! Registration and reconciliation of WES services.
//!
//! The registry sits between the CLI and the infrastructure crates:
//!
//! - **Registration**: validates a submission, probes `/service-info` and
//!   stores the service with its engines and supported versions
//! - **Reconciliation**: merges fresh `/service-info` and `/workflows`
//!   payloads into the mirror as one transactional plan
//! - **Runs**: reads CWL inputs and validates run requests
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wesmirror_client::HttpRemote;
//! use wesmirror_registry::{ServiceRegistration, ServiceRegistry};
//! use wesmirror_store::SqliteMirrorStore;
//!
//! let store = Arc::new(SqliteMirrorStore::open(path)?);
//! let registry = ServiceRegistry::new(store, Arc::new(HttpRemote::new()));
//!
//! let registered = registry.register(&form).await?;
//! let report = registry.refresh(&registered.service.token).await?;
//! ```

pub mod cwl;
mod error;
pub mod reconcile;
mod registry;
pub mod runs;

pub use cwl::{cwl_viewer_url, parse_cwl_input_params};
pub use error::{DUPLICATE_NAME_MESSAGE, RegistryError, Result, UNREACHABLE_MESSAGE};
pub use reconcile::{RefreshReport, SyncOutcome};
pub use registry::{
    MAX_FIELD_LEN, Registration, ServiceDetail, ServiceRegistration, ServiceRegistry,
    ValidRegistration,
};
pub use runs::{PreparedRun, RunRequest, parse_run_inputs};
