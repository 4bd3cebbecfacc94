//! Service info API.

use crate::client::WesClient;
use crate::error::Result;
use crate::types::ServiceInfo;

/// Service info API client.
pub struct ServiceInfoApi {
    client: WesClient,
}

impl ServiceInfoApi {
    pub(crate) fn new(client: WesClient) -> Self {
        Self { client }
    }

    /// Fetch `/service-info`.
    pub async fn fetch(&self) -> Result<ServiceInfo> {
        self.client.get("service-info").await
    }
}
