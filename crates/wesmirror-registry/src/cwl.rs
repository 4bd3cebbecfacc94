//! CWL document helpers.

use serde_yaml::Value as Yaml;
use url::Url;
use wesmirror_types::{InputParam, ParamKind};

use crate::{RegistryError, Result};

const CWL_VIEWER: &str = "https://view.commonwl.org";

/// Read the declared inputs of a CWL document (YAML or JSON), in order.
///
/// Inputs may be given as a mapping keyed by label or as a list of entries
/// with an `id`. An input's type may be written in shorthand
/// (`reads: File`). A trailing `?` marks an optional type and is dropped.
pub fn parse_cwl_input_params(document: &str) -> Result<Vec<InputParam>> {
    let parsed: Yaml = serde_yaml::from_str(document)
        .map_err(|e| RegistryError::Cwl(format!("Invalid CWL document: {e}")))?;

    let inputs = parsed
        .get("inputs")
        .ok_or_else(|| RegistryError::Cwl("CWL file does not have inputs field.".to_string()))?;

    match inputs {
        Yaml::Mapping(map) => map
            .iter()
            .map(|(label, body)| {
                let label = label.as_str().ok_or_else(incorrect)?;
                input_param(label, body)
            })
            .collect(),
        Yaml::Sequence(items) => items
            .iter()
            .map(|item| {
                let id = item.get("id").and_then(Yaml::as_str).ok_or_else(incorrect)?;
                input_param(id.trim_start_matches('#'), item)
            })
            .collect(),
        Yaml::Null => Ok(Vec::new()),
        _ => Err(incorrect()),
    }
}

fn input_param(label: &str, body: &Yaml) -> Result<InputParam> {
    let (declared, default, doc) = match body {
        Yaml::String(shorthand) => (shorthand.as_str(), None, None),
        Yaml::Mapping(_) => {
            let declared = match body.get("type") {
                Some(Yaml::String(t)) => t.as_str(),
                Some(other) => {
                    let shown = serde_yaml::to_string(other).unwrap_or_default();
                    return Err(wesmirror_types::Error::UnsupportedParamType(
                        shown.trim().to_string(),
                    )
                    .into());
                }
                None => return Err(incorrect()),
            };
            let default = match body.get("default") {
                Some(value) => Some(
                    serde_json::to_value(value)
                        .map_err(|e| RegistryError::Cwl(format!("Invalid default for '{label}': {e}")))?,
                ),
                None => None,
            };
            let doc = body
                .get("doc")
                .or_else(|| body.get("label"))
                .and_then(Yaml::as_str)
                .map(str::to_string);
            (declared, default, doc)
        }
        _ => return Err(incorrect()),
    };

    let cwl_type = declared.trim_end_matches('?');
    Ok(InputParam {
        label: label.to_string(),
        kind: ParamKind::from_cwl_type(cwl_type)?,
        cwl_type: cwl_type.to_string(),
        default,
        doc,
    })
}

fn incorrect() -> RegistryError {
    RegistryError::Cwl("The content of CWL file is incorrect".to_string())
}

/// CWL Viewer page for a workflow hosted on GitHub.
///
/// `raw.githubusercontent.com/{owner}/{repo}/{ref}/...` and
/// `github.com/{owner}/{repo}/blob/{ref}/...` both map to
/// `https://view.commonwl.org/workflows/github.com/{owner}/{repo}/blob/{ref}/...`.
/// Other hosts have no viewer page.
pub fn cwl_viewer_url(location: &str) -> Option<String> {
    let parsed = Url::parse(location).ok()?;
    let path = match parsed.host_str()? {
        "raw.githubusercontent.com" => {
            let mut segments: Vec<&str> = parsed.path().split('/').collect();
            // ["", owner, repo, ref, ...]
            if segments.len() < 3 {
                return None;
            }
            segments.insert(3, "blob");
            format!("/workflows/github.com{}", segments.join("/"))
        }
        "github.com" => format!("/workflows/github.com{}", parsed.path()),
        _ => return None,
    };

    let mut viewer = Url::parse(CWL_VIEWER).ok()?;
    viewer.set_path(&path);
    viewer.set_query(parsed.query());
    viewer.set_fragment(parsed.fragment());
    Some(viewer.to_string())
}
