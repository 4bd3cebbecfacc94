//! Response types for the WES read endpoints.
//!
//! These types mirror the server's API contract. Every listed field is
//! required; a body missing one is treated as malformed.

use serde::{Deserialize, Serialize};
use wesmirror_types::{TypeKey, WorkflowDraft};

// ─────────────────────────────────────────────────────────────────────────────
// Service info
// ─────────────────────────────────────────────────────────────────────────────

/// Body of `GET /service-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Where users learn how to authenticate against the server.
    pub auth_instructions_url: String,
    /// Contact for the server operators.
    pub contact_info_url: String,
    /// Engines the server can dispatch to.
    pub workflow_engines: Vec<WorkflowEngineInfo>,
    /// WES API versions the server speaks.
    pub supported_wes_versions: Vec<String>,
}

/// One engine entry in the service info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEngineInfo {
    pub engine_name: String,
    pub engine_version: String,
    pub workflow_types: Vec<WorkflowTypeInfo>,
}

impl WorkflowEngineInfo {
    pub fn type_keys(&self) -> Vec<TypeKey> {
        self.workflow_types.iter().map(WorkflowTypeInfo::key).collect()
    }
}

/// A workflow language an engine can execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTypeInfo {
    pub language_type: String,
    pub language_version: String,
}

impl WorkflowTypeInfo {
    pub fn key(&self) -> TypeKey {
        TypeKey::new(self.language_type.clone(), self.language_version.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Workflows
// ─────────────────────────────────────────────────────────────────────────────

/// Body of `GET /workflows`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowList {
    pub workflows: Vec<WorkflowInfo>,
}

/// One runnable workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInfo {
    pub workflow_name: String,
    pub workflow_version: String,
    pub language_type: String,
    pub language_version: String,
    pub workflow_location: String,
    pub workflow_content: String,
    /// May be null when the workflow has no parameter template.
    pub workflow_parameters_template_location: Option<String>,
    pub workflow_parameters_template: Option<String>,
}

impl WorkflowInfo {
    pub fn type_key(&self) -> TypeKey {
        TypeKey::new(self.language_type.clone(), self.language_version.clone())
    }

    /// The writable workflow fields carried by this entry.
    pub fn to_draft(&self) -> WorkflowDraft {
        WorkflowDraft {
            name: self.workflow_name.clone(),
            version: self.workflow_version.clone(),
            workflow_type: self.type_key(),
            location: self.workflow_location.clone(),
            content: self.workflow_content.clone(),
            parameters_template_location: self.workflow_parameters_template_location.clone(),
            parameters_template: self.workflow_parameters_template.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_info_decodes() {
        let info: ServiceInfo = serde_json::from_value(json!({
            "auth_instructions_url": "https://example.org/auth",
            "contact_info_url": "mailto:ops@example.org",
            "workflow_engines": [{
                "engine_name": "cwltool",
                "engine_version": "3.1",
                "workflow_types": [{"language_type": "CWL", "language_version": "v1.2"}]
            }],
            "supported_wes_versions": ["1.0.0"]
        }))
        .unwrap();

        assert_eq!(info.workflow_engines[0].engine_name, "cwltool");
        assert_eq!(
            info.workflow_engines[0].type_keys(),
            vec![TypeKey::new("CWL", "v1.2")]
        );
    }

    #[test]
    fn test_service_info_missing_field_is_error() {
        let result = serde_json::from_value::<ServiceInfo>(json!({
            "auth_instructions_url": "https://example.org/auth",
            "workflow_engines": [],
            "supported_wes_versions": []
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_workflow_null_templates() {
        let list: WorkflowList = serde_json::from_value(json!({
            "workflows": [{
                "workflow_name": "trimming",
                "workflow_version": "1.0",
                "language_type": "CWL",
                "language_version": "v1.0",
                "workflow_location": "https://example.org/trimming.cwl",
                "workflow_content": "cwlVersion: v1.0",
                "workflow_parameters_template_location": null,
                "workflow_parameters_template": null
            }]
        }))
        .unwrap();

        let draft = list.workflows[0].to_draft();
        assert_eq!(draft.name, "trimming");
        assert_eq!(draft.workflow_type, TypeKey::new("CWL", "v1.0"));
        assert!(draft.parameters_template.is_none());
    }
}
