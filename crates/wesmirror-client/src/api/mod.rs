//! API endpoint implementations.

mod service_info;
mod workflows;

pub use service_info::ServiceInfoApi;
pub use workflows::WorkflowsApi;
