//! Endpoint-addressed access to WES servers.
//!
//! ```text
//! RemoteClient (trait)   - fetch service-info / workflows for an Endpoint
//!     └── HttpRemote     - builds a WesClient per call
//!     └── MockRemote     - scripted responses for testing
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use wesmirror_types::Endpoint;

use crate::client::{DEFAULT_TIMEOUT, WesClient};
use crate::error::{Error, Result};
use crate::types::{ServiceInfo, WorkflowList};

/// Fetches metadata from the WES server behind an [`Endpoint`].
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// `GET {scheme}://{host}/service-info`
    async fn service_info(&self, endpoint: &Endpoint) -> Result<ServiceInfo>;

    /// `GET {scheme}://{host}/workflows`
    async fn workflows(&self, endpoint: &Endpoint) -> Result<WorkflowList>;
}

/// [`RemoteClient`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    timeout: Duration,
    user_agent: Option<String>,
}

impl HttpRemote {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, agent: Option<String>) -> Self {
        self.user_agent = agent;
        self
    }

    fn client_for(&self, endpoint: &Endpoint) -> Result<WesClient> {
        let mut builder = WesClient::builder()
            .base_url(endpoint.base_url())
            .timeout(self.timeout);
        if let Some(token) = &endpoint.token {
            builder = builder.auth_token(token.clone());
        }
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        builder.build()
    }
}

impl Default for HttpRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteClient for HttpRemote {
    async fn service_info(&self, endpoint: &Endpoint) -> Result<ServiceInfo> {
        self.client_for(endpoint)?.service_info().fetch().await
    }

    async fn workflows(&self, endpoint: &Endpoint) -> Result<WorkflowList> {
        self.client_for(endpoint)?.workflows().list().await
    }
}

/// Scripted [`RemoteClient`] for testing.
///
/// Responses are keyed by host. A host with nothing scripted answers as a
/// server returning HTTP 500.
#[derive(Debug, Default)]
pub struct MockRemote {
    service_info: Mutex<HashMap<String, ServiceInfo>>,
    workflows: Mutex<HashMap<String, WorkflowList>>,
    calls: Mutex<Vec<String>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_service_info(&self, host: &str, info: ServiceInfo) {
        self.service_info.lock().insert(host.to_string(), info);
    }

    pub fn set_workflows(&self, host: &str, list: WorkflowList) {
        self.workflows.lock().insert(host.to_string(), list);
    }

    /// Make every request against `host` fail.
    pub fn fail(&self, host: &str) {
        self.service_info.lock().remove(host);
        self.workflows.lock().remove(host);
    }

    /// Requests made so far, as `"{host}{path}"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn unavailable() -> Error {
        Error::Api {
            status: 500,
            message: "HTTP 500".to_string(),
        }
    }
}

#[async_trait]
impl RemoteClient for MockRemote {
    async fn service_info(&self, endpoint: &Endpoint) -> Result<ServiceInfo> {
        self.calls
            .lock()
            .push(format!("{}/service-info", endpoint.host));
        self.service_info
            .lock()
            .get(&endpoint.host)
            .cloned()
            .ok_or_else(Self::unavailable)
    }

    async fn workflows(&self, endpoint: &Endpoint) -> Result<WorkflowList> {
        self.calls.lock().push(format!("{}/workflows", endpoint.host));
        self.workflows
            .lock()
            .get(&endpoint.host)
            .cloned()
            .ok_or_else(Self::unavailable)
    }
}
