//! Workflows API.

use crate::client::WesClient;
use crate::error::Result;
use crate::types::WorkflowList;

/// Workflows API client.
pub struct WorkflowsApi {
    client: WesClient,
}

impl WorkflowsApi {
    pub(crate) fn new(client: WesClient) -> Self {
        Self { client }
    }

    /// List the workflows the server can run.
    pub async fn list(&self) -> Result<WorkflowList> {
        self.client.get("workflows").await
    }
}
