//! HTTP client for Workflow Execution Service (WES) servers.
//!
//! Only the two read endpoints the mirror needs are covered:
//!
//! - **Service info**: `GET /service-info`, engines, types and WES versions
//! - **Workflows**: `GET /workflows`, the runnable workflow list
//!
//! # Example
//!
//! ```no_run
//! use wesmirror_client::{Result, WesClient};
//!
//! # async fn example() -> Result<()> {
//! let client = WesClient::builder()
//!     .base_url("http://localhost:8000")
//!     .auth_token("secret")
//!     .build()?;
//!
//! let info = client.service_info().fetch().await?;
//! println!("{} engines", info.workflow_engines.len());
//!
//! let workflows = client.workflows().list().await?;
//! println!("{} workflows", workflows.workflows.len());
//! # Ok(())
//! # }
//! ```
//!
//! Callers that mirror many servers go through the [`RemoteClient`] trait,
//! which takes the target [`Endpoint`](wesmirror_types::Endpoint) per call.

pub mod api;
pub mod client;
pub mod error;
pub mod remote;
pub mod types;

pub use client::{ClientBuilder, WesClient};
pub use error::{Error, Result};
pub use remote::{HttpRemote, MockRemote, RemoteClient};
pub use types::*;
