//! Service registry: registration, synchronization and queries.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use wesmirror_client::RemoteClient;
use wesmirror_store::{MirrorStorage, NewService, StoreError, Visibility};
use wesmirror_types::{
    Endpoint, InputParam, Scheme, Service, SupportedWesVersion, Workflow, WorkflowEngine,
};

use crate::reconcile::{
    RefreshReport, SyncOutcome, plan_engine_sync, plan_registration_seed, plan_workflow_seed,
    plan_workflow_sync,
};
use crate::runs::{self, PreparedRun, RunRequest};
use crate::{RegistryError, Result};

/// Longest accepted value for any registration field.
pub const MAX_FIELD_LEN: usize = 256;

// ─────────────────────────────────────────────────────────────────────────────
// Registration input
// ─────────────────────────────────────────────────────────────────────────────

/// A service registration as submitted by a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceRegistration {
    pub service_name: String,
    /// `http` or `https`.
    pub server_scheme: String,
    /// Host and optional port, e.g. `localhost:8000`.
    pub server_host: String,
    #[serde(default, skip_serializing)]
    pub server_token: Option<String>,
}

/// A registration that passed field validation.
#[derive(Debug, Clone)]
pub struct ValidRegistration {
    pub name: String,
    pub endpoint: Endpoint,
}

impl ServiceRegistration {
    pub fn validate(&self) -> Result<ValidRegistration> {
        let name = self.service_name.trim();
        let host = self.server_host.trim();
        if name.is_empty() {
            return Err(RegistryError::Validation("Service name is required".into()));
        }
        if host.is_empty() {
            return Err(RegistryError::Validation("Server host is required".into()));
        }

        let token = self
            .server_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        for (field, value) in [
            ("Service name", name),
            ("Server host", host),
            ("Server token", token.unwrap_or_default()),
        ] {
            if value.chars().count() > MAX_FIELD_LEN {
                return Err(RegistryError::Validation(format!(
                    "{field} must be at most {MAX_FIELD_LEN} characters"
                )));
            }
        }

        let scheme: Scheme = self
            .server_scheme
            .trim()
            .parse()
            .map_err(|e: wesmirror_types::Error| RegistryError::Validation(e.to_string()))?;

        Ok(ValidRegistration {
            name: name.to_string(),
            endpoint: Endpoint::new(scheme, host).with_token(token.map(str::to_string)),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Query results
// ─────────────────────────────────────────────────────────────────────────────

/// A registered service with everything mirrored from it.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceDetail {
    pub service: Service,
    pub workflow_engines: Vec<WorkflowEngine>,
    pub supported_wes_versions: Vec<SupportedWesVersion>,
    pub workflows: Vec<Workflow>,
}

/// Outcome of a full registration.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub service: Service,
    pub workflows: SyncOutcome,
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Coordinates the remote client and the mirror storage.
///
/// Each synchronization performs one remote fetch followed by one storage
/// transaction.
#[derive(Clone)]
pub struct ServiceRegistry {
    storage: Arc<dyn MirrorStorage>,
    remote: Arc<dyn RemoteClient>,
}

impl ServiceRegistry {
    pub fn new(storage: Arc<dyn MirrorStorage>, remote: Arc<dyn RemoteClient>) -> Self {
        Self { storage, remote }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Register a service and mirror its engines, versions and workflows.
    pub async fn register(&self, form: &ServiceRegistration) -> Result<Registration> {
        let service = self.create_from_form(form).await?;
        let workflows = self.create_workflows_from_server(&service.token).await?;
        Ok(Registration { service, workflows })
    }

    /// Validate a registration, contact the server once and store the
    /// service with its engines, types and supported versions.
    pub async fn create_from_form(&self, form: &ServiceRegistration) -> Result<Service> {
        let valid = form.validate()?;

        let info = self
            .remote
            .service_info(&valid.endpoint)
            .await
            .map_err(|e| {
                warn!(host = %valid.endpoint.host, error = %e, "Service info unavailable at registration");
                RegistryError::Unreachable(e)
            })?;

        if self.storage.find_service_by_name(&valid.name)?.is_some() {
            return Err(RegistryError::DuplicateName(valid.name));
        }

        let new_service = NewService {
            name: valid.name.clone(),
            server_scheme: valid.endpoint.scheme,
            server_host: valid.endpoint.host.clone(),
            server_token: valid.endpoint.token.clone(),
            auth_instructions_url: info.auth_instructions_url.clone(),
            contact_info_url: info.contact_info_url.clone(),
        };
        let seed = plan_registration_seed(&info);
        let service = self
            .storage
            .create_service(&new_service, &seed)
            .map_err(|e| match e {
                StoreError::Conflict(_) => RegistryError::DuplicateName(valid.name.clone()),
                other => other.into(),
            })?;

        info!(
            service = %service.name,
            token = %service.token,
            engines = info.workflow_engines.len(),
            "Registered service"
        );
        Ok(service)
    }

    /// Merge the server's current `/service-info` into the mirror.
    pub async fn update_from_server(&self, token: &str) -> Result<SyncOutcome> {
        let service = self.live_service(token)?;
        let info = match self.remote.service_info(&service.endpoint()).await {
            Ok(info) => info,
            Err(e) => return Ok(unavailable(&service, "/service-info", e)),
        };

        let engines = self.storage.list_engines(&service.token)?;
        let versions = self.storage.list_supported_versions(&service.token)?;
        let plan = plan_engine_sync(&engines, &versions, &info);
        debug!(service = %service.name, mutations = plan.len(), "Planned engine sync");

        let summary = self.storage.apply(&service.token, &plan)?;
        info!(service = %service.name, %summary, "Synchronized engines");
        Ok(SyncOutcome::Applied { summary })
    }

    /// Insert every workflow the server lists. Used right after registration.
    pub async fn create_workflows_from_server(&self, token: &str) -> Result<SyncOutcome> {
        let service = self.live_service(token)?;
        let list = match self.remote.workflows(&service.endpoint()).await {
            Ok(list) => list,
            Err(e) => return Ok(unavailable(&service, "/workflows", e)),
        };

        let plan = plan_workflow_seed(&list);
        let summary = self.storage.apply(&service.token, &plan)?;
        info!(service = %service.name, %summary, "Imported workflows");
        Ok(SyncOutcome::Applied { summary })
    }

    /// Merge the server's current `/workflows` into the mirror.
    pub async fn update_workflows_from_server(&self, token: &str) -> Result<SyncOutcome> {
        let service = self.live_service(token)?;
        let list = match self.remote.workflows(&service.endpoint()).await {
            Ok(list) => list,
            Err(e) => return Ok(unavailable(&service, "/workflows", e)),
        };

        let stored = self
            .storage
            .list_workflows(Some(&service.token), Visibility::All)?;
        let plan = plan_workflow_sync(&stored, &list);
        debug!(service = %service.name, mutations = plan.len(), "Planned workflow sync");

        let summary = self.storage.apply(&service.token, &plan)?;
        if summary.is_empty() {
            debug!(service = %service.name, "Workflows already in sync");
        } else {
            info!(service = %service.name, %summary, "Synchronized workflows");
        }
        Ok(SyncOutcome::Applied { summary })
    }

    /// Synchronize engines and versions, then workflows.
    pub async fn refresh(&self, token: &str) -> Result<RefreshReport> {
        let engines = self.update_from_server(token).await?;
        let workflows = self.update_workflows_from_server(token).await?;
        Ok(RefreshReport { engines, workflows })
    }

    /// Soft-delete a service and everything mirrored from it.
    pub fn delete_by_flag(&self, token: &str) -> Result<()> {
        let service = self.live_service(token)?;
        self.storage.soft_delete_service(&service.token)?;
        info!(service = %service.name, "Deleted service");
        Ok(())
    }

    /// Remove a service row and its children permanently.
    pub fn purge(&self, token: &str) -> Result<()> {
        let service = self.service(token)?;
        self.storage.purge_service(&service.token)?;
        info!(service = %service.name, "Purged service");
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn list_services(&self) -> Result<Vec<Service>> {
        Ok(self.storage.list_services(Visibility::Live)?)
    }

    pub fn find_service_by_name(&self, name: &str) -> Result<Option<Service>> {
        Ok(self.storage.find_service_by_name(name)?)
    }

    /// Resolve a service by token or by name, deleted or not.
    pub fn service(&self, name_or_token: &str) -> Result<Service> {
        if let Some(service) = self.storage.find_service_by_name(name_or_token)? {
            return Ok(service);
        }
        self.storage.get_service(name_or_token).map_err(|e| {
            if e.is_not_found() {
                RegistryError::ServiceNotFound(name_or_token.to_string())
            } else {
                e.into()
            }
        })
    }

    /// Resolve a service that has not been deleted.
    pub fn live_service(&self, name_or_token: &str) -> Result<Service> {
        let service = self.service(name_or_token)?;
        if service.deleted {
            return Err(RegistryError::ServiceNotFound(name_or_token.to_string()));
        }
        Ok(service)
    }

    pub fn service_detail(&self, name_or_token: &str) -> Result<ServiceDetail> {
        let service = self.live_service(name_or_token)?;
        Ok(ServiceDetail {
            workflow_engines: self.storage.list_engines(&service.token)?,
            supported_wes_versions: self.storage.list_supported_versions(&service.token)?,
            workflows: self
                .storage
                .list_workflows(Some(&service.token), Visibility::Live)?,
            service,
        })
    }

    /// Live workflows, optionally of one service.
    pub fn list_workflows(&self, service: Option<&str>) -> Result<Vec<Workflow>> {
        let token = match service {
            Some(s) => Some(self.live_service(s)?.token),
            None => None,
        };
        Ok(self
            .storage
            .list_workflows(token.as_deref(), Visibility::Live)?)
    }

    pub fn get_workflow(&self, token: &str) -> Result<Workflow> {
        self.storage.get_workflow(token).map_err(|e| {
            if e.is_not_found() {
                RegistryError::WorkflowNotFound(token.to_string())
            } else {
                e.into()
            }
        })
    }

    // ── Runs ────────────────────────────────────────────────────────────

    /// Declared inputs of a workflow.
    pub fn workflow_params(&self, token: &str) -> Result<Vec<InputParam>> {
        runs::workflow_inputs(&self.get_workflow(token)?)
    }

    /// Engines of the workflow's service that can execute it.
    pub fn executable_engines(&self, token: &str) -> Result<Vec<WorkflowEngine>> {
        let workflow = self.get_workflow(token)?;
        let engines = self.storage.list_engines(&workflow.service_token)?;
        Ok(runs::executable_engines(&engines, &workflow)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Validate a run request for a mirrored workflow.
    pub fn prepare_run(&self, token: &str, request: &RunRequest) -> Result<PreparedRun> {
        let workflow = self.get_workflow(token)?;
        let engines = self.storage.list_engines(&workflow.service_token)?;
        runs::prepare_run(&workflow, &engines, request, Utc::now())
    }
}

fn unavailable(service: &Service, path: &str, error: wesmirror_client::Error) -> SyncOutcome {
    warn!(
        service = %service.name,
        path,
        auth = error.is_auth_error(),
        error = %error,
        "Remote fetch failed; mirror unchanged"
    );
    SyncOutcome::RemoteUnavailable {
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, scheme: &str, host: &str) -> ServiceRegistration {
        ServiceRegistration {
            service_name: name.into(),
            server_scheme: scheme.into(),
            server_host: host.into(),
            server_token: None,
        }
    }

    #[test]
    fn test_validate_accepts_trimmed_fields() {
        let mut f = form("  S  ", "https", " wes.example.org ");
        f.server_token = Some("  ".into());
        let valid = f.validate().unwrap();
        assert_eq!(valid.name, "S");
        assert_eq!(valid.endpoint.base_url(), "https://wes.example.org");
        assert!(valid.endpoint.token.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(form("", "http", "h").validate().is_err());
        assert!(form("S", "http", "").validate().is_err());
        assert!(form("S", "ftp", "h").validate().is_err());
        assert!(form(&"x".repeat(257), "http", "h").validate().is_err());
        assert!(form(&"x".repeat(256), "http", "h").validate().is_ok());
    }
}
