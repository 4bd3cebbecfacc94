//! Mirrored entities.
//!
//! A [`Service`] is the aggregate root. It owns [`WorkflowEngine`],
//! [`SupportedWesVersion`] and [`Workflow`] rows. [`WorkflowType`] rows are
//! global and shared by reference, deduplicated by [`TypeKey`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Timestamp, Token};

/// URL scheme used to reach a WES server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(Error::InvalidScheme(other.to_string())),
        }
    }
}

/// Connection information for one remote WES server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub scheme: Scheme,
    /// Host with optional port and path prefix, e.g. `localhost:8000`.
    pub host: String,
    /// Optional bearer token sent with every request.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

impl Endpoint {
    pub fn new(scheme: Scheme, host: impl Into<String>) -> Self {
        Self {
            scheme,
            host: host.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// `{scheme}://{host}`
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host.trim_end_matches('/'))
    }
}

/// A locally registered pointer to one remote WES server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub token: Token,
    pub name: String,
    pub server_scheme: Scheme,
    pub server_host: String,
    /// Bearer token for the server; never serialized.
    #[serde(default, skip_serializing)]
    pub server_token: Option<String>,
    pub auth_instructions_url: String,
    pub contact_info_url: String,
    pub deleted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Service {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.server_scheme, self.server_host.clone())
            .with_token(self.server_token.clone())
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service: {}", self.name)
    }
}

/// Natural key of a workflow type: `(type, version)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeKey {
    #[serde(rename = "type")]
    pub language_type: String,
    #[serde(rename = "version")]
    pub language_version: String,
}

impl TypeKey {
    pub fn new(language_type: impl Into<String>, language_version: impl Into<String>) -> Self {
        Self {
            language_type: language_type.into(),
            language_version: language_version.into(),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.language_type, self.language_version)
    }
}

/// A workflow language and version, shared across engines and workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowType {
    pub token: Token,
    #[serde(rename = "type")]
    pub language_type: String,
    pub version: String,
    pub deleted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WorkflowType {
    pub fn key(&self) -> TypeKey {
        TypeKey::new(self.language_type.clone(), self.version.clone())
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Workflow Type: {} {}", self.language_type, self.version)
    }
}

/// An execution engine advertised by a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEngine {
    pub token: Token,
    pub service_token: Token,
    pub name: String,
    pub version: String,
    /// Types this engine can execute, in link order.
    #[serde(default)]
    pub workflow_types: Vec<WorkflowType>,
    pub deleted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WorkflowEngine {
    pub fn type_keys(&self) -> Vec<TypeKey> {
        self.workflow_types.iter().map(WorkflowType::key).collect()
    }

    pub fn supports(&self, key: &TypeKey) -> bool {
        self.workflow_types.iter().any(|t| &t.key() == key)
    }
}

impl fmt::Display for WorkflowEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Workflow Engine: {}", self.name)
    }
}

/// A WES API version string advertised by a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportedWesVersion {
    pub token: Token,
    pub service_token: Token,
    pub wes_version: String,
    pub deleted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl fmt::Display for SupportedWesVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Supported Wes Version: {}", self.wes_version)
    }
}

/// The writable fields of a workflow, as reported by a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDraft {
    pub name: String,
    pub version: String,
    pub workflow_type: TypeKey,
    pub location: String,
    pub content: String,
    #[serde(default)]
    pub parameters_template_location: Option<String>,
    #[serde(default)]
    pub parameters_template: Option<String>,
}

/// A runnable workflow mirrored from a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub token: Token,
    pub service_token: Token,
    pub name: String,
    pub version: String,
    pub workflow_type: WorkflowType,
    pub location: String,
    pub content: String,
    #[serde(default)]
    pub parameters_template_location: Option<String>,
    #[serde(default)]
    pub parameters_template: Option<String>,
    pub deleted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Workflow {
    /// The writable fields of this row, for comparison with a remote entry.
    pub fn draft(&self) -> WorkflowDraft {
        WorkflowDraft {
            name: self.name.clone(),
            version: self.version.clone(),
            workflow_type: self.workflow_type.key(),
            location: self.location.clone(),
            content: self.content.clone(),
            parameters_template_location: self.parameters_template_location.clone(),
            parameters_template: self.parameters_template.clone(),
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Workflow: {} {}", self.name, self.version)
    }
}
