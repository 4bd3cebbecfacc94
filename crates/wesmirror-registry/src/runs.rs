//! Run preparation for mirrored workflows.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_yaml::Value as Yaml;
use wesmirror_types::{InputParam, Token, TypeKey, Workflow, WorkflowEngine};

use crate::cwl::parse_cwl_input_params;
use crate::{RegistryError, Result};

/// What a user submits to launch a workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRequest {
    /// Engine token or name; may be omitted when exactly one engine can run
    /// the workflow.
    pub engine: Option<String>,
    /// Run name; defaults to the workflow name and the current time.
    pub run_name: Option<String>,
    /// Raw values keyed by input label.
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
}

/// A validated run, ready to be submitted to the owning WES server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedRun {
    pub service_token: Token,
    pub workflow_token: Token,
    pub run_name: String,
    pub engine_name: String,
    pub engine_version: String,
    pub workflow_type: TypeKey,
    pub workflow_url: String,
    /// Typed parameter object keyed by input label.
    pub parameters: Value,
}

/// Live engines of the workflow's service that execute its type.
pub fn executable_engines<'a>(
    engines: &'a [WorkflowEngine],
    workflow: &Workflow,
) -> Vec<&'a WorkflowEngine> {
    let key = workflow.workflow_type.key();
    engines
        .iter()
        .filter(|e| !e.deleted && e.service_token == workflow.service_token && e.supports(&key))
        .collect()
}

/// `"{workflow name} {YYYY-MM-DD HH:MM:SS}"`
pub fn default_run_name(workflow_name: &str, at: DateTime<Utc>) -> String {
    format!("{} {}", workflow_name, at.format("%Y-%m-%d %H:%M:%S"))
}

/// Read run inputs from a YAML or JSON document mapping labels to values.
///
/// Scalars are taken as written. CWL `File`/`Directory` objects contribute
/// their `path` (or `location`). Null values are skipped.
pub fn parse_run_inputs(document: &str) -> Result<BTreeMap<String, String>> {
    let parsed: Yaml = serde_yaml::from_str(document)
        .map_err(|e| RegistryError::Validation(format!("Invalid parameters file: {e}")))?;
    let map = match parsed {
        Yaml::Null => return Ok(BTreeMap::new()),
        Yaml::Mapping(map) => map,
        _ => {
            return Err(RegistryError::Validation(
                "Parameters file must map input labels to values".to_string(),
            ));
        }
    };

    let mut inputs = BTreeMap::new();
    for (key, value) in map {
        let Yaml::String(label) = key else {
            return Err(RegistryError::Validation(
                "Parameter labels must be strings".to_string(),
            ));
        };
        let value = match value {
            Yaml::Null => continue,
            Yaml::Mapping(ref obj) => obj
                .get("path")
                .or_else(|| obj.get("location"))
                .and_then(scalar_text),
            ref other => scalar_text(other),
        };
        match value {
            Some(value) => {
                inputs.insert(label, value);
            }
            None => {
                return Err(RegistryError::Validation(format!(
                    "Parameter '{label}' must be a scalar value"
                )));
            }
        }
    }
    Ok(inputs)
}

fn scalar_text(value: &Yaml) -> Option<String> {
    match value {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Bool(b) => Some(b.to_string()),
        Yaml::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Declared inputs of a workflow. Only CWL content carries a schema.
pub fn workflow_inputs(workflow: &Workflow) -> Result<Vec<InputParam>> {
    if workflow.workflow_type.language_type.eq_ignore_ascii_case("CWL") {
        parse_cwl_input_params(&workflow.content)
    } else {
        Ok(Vec::new())
    }
}

/// Validate `request` against the workflow and its service's engines.
pub fn prepare_run(
    workflow: &Workflow,
    engines: &[WorkflowEngine],
    request: &RunRequest,
    now: DateTime<Utc>,
) -> Result<PreparedRun> {
    if workflow.deleted {
        return Err(RegistryError::WorkflowNotFound(workflow.token.clone()));
    }

    let candidates = executable_engines(engines, workflow);
    let engine = match &request.engine {
        Some(wanted) => candidates
            .iter()
            .find(|e| e.token == *wanted || e.name == *wanted)
            .copied()
            .ok_or_else(|| {
                RegistryError::Validation(format!(
                    "Engine '{wanted}' cannot execute {}",
                    workflow.workflow_type.key()
                ))
            })?,
        None => match candidates.as_slice() {
            [only] => *only,
            [] => {
                return Err(RegistryError::Validation(format!(
                    "No engine of this service can execute {}",
                    workflow.workflow_type.key()
                )));
            }
            _ => {
                let names: Vec<&str> = candidates.iter().map(|e| e.name.as_str()).collect();
                return Err(RegistryError::Validation(format!(
                    "Choose an execution engine: {}",
                    names.join(", ")
                )));
            }
        },
    };

    let run_name = match request.run_name.as_deref().map(str::trim) {
        Some("") => return Err(RegistryError::Validation("Run name is required".to_string())),
        Some(name) => name.to_string(),
        None => default_run_name(&workflow.name, now),
    };

    let declared = workflow_inputs(workflow)?;
    if let Some(unknown) = request
        .inputs
        .keys()
        .find(|label| !declared.iter().any(|p| &p.label == *label))
    {
        return Err(RegistryError::Validation(format!(
            "Unknown input parameter '{unknown}'"
        )));
    }

    let mut parameters = Map::new();
    for param in &declared {
        let raw = request.inputs.get(&param.label).map(String::as_str);
        let value = param.resolve(raw)?;
        parameters.insert(param.label.clone(), value.to_json());
    }

    Ok(PreparedRun {
        service_token: workflow.service_token.clone(),
        workflow_token: workflow.token.clone(),
        run_name,
        engine_name: engine.name.clone(),
        engine_version: engine.version.clone(),
        workflow_type: workflow.workflow_type.key(),
        workflow_url: workflow.location.clone(),
        parameters: Value::Object(parameters),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wesmirror_types::WorkflowType;

    const CONTENT: &str = "inputs:\n  reads: File\n  threads:\n    type: int\n    default: 4\n  keep: boolean?\n";

    fn wf_type(t: &str, v: &str) -> WorkflowType {
        let now = Utc::now();
        WorkflowType {
            token: format!("{t}{v}"),
            language_type: t.into(),
            version: v.into(),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn workflow() -> Workflow {
        let now = Utc::now();
        Workflow {
            token: "wf".into(),
            service_token: "svc".into(),
            name: "trim".into(),
            version: "1".into(),
            workflow_type: wf_type("CWL", "v1.0"),
            location: "https://example.org/trim.cwl".into(),
            content: CONTENT.into(),
            parameters_template_location: None,
            parameters_template: None,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn engine(token: &str, name: &str, types: Vec<WorkflowType>, deleted: bool) -> WorkflowEngine {
        let now = Utc::now();
        WorkflowEngine {
            token: token.into(),
            service_token: "svc".into(),
            name: name.into(),
            version: "1".into(),
            workflow_types: types,
            deleted,
            created_at: now,
            updated_at: now,
        }
    }

    fn inputs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_executable_engines_filter() {
        let engines = vec![
            engine("e1", "cwltool", vec![wf_type("CWL", "v1.0")], false),
            engine("e2", "toil", vec![wf_type("CWL", "v1.0")], true),
            engine("e3", "nextflow", vec![wf_type("NFL", "1")], false),
        ];
        let wf = workflow();
        let names: Vec<_> = executable_engines(&engines, &wf)
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, ["cwltool"]);
    }

    #[test]
    fn test_default_run_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(default_run_name("trim", at), "trim 2024-03-05 07:08:09");
    }

    #[test]
    fn test_prepare_run_typed_parameters() {
        let engines = vec![engine("e1", "cwltool", vec![wf_type("CWL", "v1.0")], false)];
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let request = RunRequest {
            inputs: inputs(&[("reads", "/data/r1.fq"), ("keep", "yes")]),
            ..Default::default()
        };

        let run = prepare_run(&workflow(), &engines, &request, at).unwrap();
        assert_eq!(run.run_name, "trim 2024-03-05 07:08:09");
        assert_eq!(run.engine_name, "cwltool");
        assert_eq!(
            run.parameters,
            json!({"reads": "/data/r1.fq", "threads": 4, "keep": true})
        );
    }

    #[test]
    fn test_prepare_run_missing_parameter() {
        let engines = vec![engine("e1", "cwltool", vec![wf_type("CWL", "v1.0")], false)];
        let request = RunRequest {
            inputs: inputs(&[("reads", "/data/r1.fq")]),
            ..Default::default()
        };
        let err = prepare_run(&workflow(), &engines, &request, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("keep"));
    }

    #[test]
    fn test_prepare_run_invalid_value() {
        let engines = vec![engine("e1", "cwltool", vec![wf_type("CWL", "v1.0")], false)];
        let request = RunRequest {
            inputs: inputs(&[("reads", "r"), ("keep", "true"), ("threads", "many")]),
            ..Default::default()
        };
        let err = prepare_run(&workflow(), &engines, &request, Utc::now()).unwrap_err();
        assert!(matches!(err, RegistryError::Parameter(_)));
    }

    #[test]
    fn test_prepare_run_rejects_unsupported_engine() {
        let engines = vec![
            engine("e1", "cwltool", vec![wf_type("CWL", "v1.0")], false),
            engine("e3", "nextflow", vec![wf_type("NFL", "1")], false),
        ];
        let request = RunRequest {
            engine: Some("nextflow".into()),
            inputs: inputs(&[("reads", "r"), ("keep", "true")]),
            ..Default::default()
        };
        let err = prepare_run(&workflow(), &engines, &request, Utc::now()).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[test]
    fn test_prepare_run_requires_choice_between_engines() {
        let engines = vec![
            engine("e1", "cwltool", vec![wf_type("CWL", "v1.0")], false),
            engine("e2", "toil", vec![wf_type("CWL", "v1.0")], false),
        ];
        let request = RunRequest {
            inputs: inputs(&[("reads", "r"), ("keep", "true")]),
            ..Default::default()
        };
        assert!(prepare_run(&workflow(), &engines, &request, Utc::now()).is_err());

        let request = RunRequest {
            engine: Some("e2".into()),
            run_name: Some("custom".into()),
            inputs: inputs(&[("reads", "r"), ("keep", "true")]),
        };
        let run = prepare_run(&workflow(), &engines, &request, Utc::now()).unwrap();
        assert_eq!(run.engine_name, "toil");
        assert_eq!(run.run_name, "custom");
    }

    #[test]
    fn test_prepare_run_unknown_input() {
        let engines = vec![engine("e1", "cwltool", vec![wf_type("CWL", "v1.0")], false)];
        let request = RunRequest {
            inputs: inputs(&[("reads", "r"), ("keep", "true"), ("bogus", "1")]),
            ..Default::default()
        };
        let err = prepare_run(&workflow(), &engines, &request, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_parse_run_inputs_yaml() {
        let doc = "reads:\n  class: File\n  path: /data/r1.fq\nthreads: 8\nkeep: true\nnote: ~\n";
        let inputs = parse_run_inputs(doc).unwrap();
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs["reads"], "/data/r1.fq");
        assert_eq!(inputs["threads"], "8");
        assert_eq!(inputs["keep"], "true");
    }

    #[test]
    fn test_parse_run_inputs_json() {
        let inputs = parse_run_inputs(r#"{"threads": 2, "reads": "/data/r2.fq"}"#).unwrap();
        assert_eq!(inputs["threads"], "2");
        assert_eq!(inputs["reads"], "/data/r2.fq");
        assert!(parse_run_inputs("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_run_inputs_rejects_non_scalars() {
        assert!(matches!(
            parse_run_inputs("- a\n- b\n"),
            Err(RegistryError::Validation(_))
        ));
        assert!(matches!(
            parse_run_inputs("reads: [a, b]\n"),
            Err(RegistryError::Validation(msg)) if msg.contains("reads")
        ));
    }
}
