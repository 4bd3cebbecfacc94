//! Typed run parameters.
//!
//! Workflow inputs are described by a [`ParamKind`] chosen from the declared
//! CWL type, and raw user input is resolved into a [`ParamValue`] at
//! validation time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Value kind accepted for a workflow input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Boolean,
    Integer,
    Float,
    String,
}

impl ParamKind {
    /// Map a CWL input type (without a trailing `?`) onto a value kind.
    ///
    /// `int`, `long` and `double` all collapse to [`ParamKind::Integer`];
    /// `File` and `Directory` are entered as paths.
    pub fn from_cwl_type(cwl_type: &str) -> Result<Self> {
        match cwl_type {
            "boolean" => Ok(Self::Boolean),
            "int" | "long" | "double" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "string" | "File" | "Directory" => Ok(Self::String),
            other => Err(Error::UnsupportedParamType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
        }
    }

    /// Parse raw text entered for the input named `label`.
    pub fn parse(&self, label: &str, raw: &str) -> Result<ParamValue> {
        let trimmed = raw.trim();
        let invalid = || Error::InvalidParamValue {
            label: label.to_string(),
            expected: self.as_str(),
            value: raw.to_string(),
        };

        match self {
            Self::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(ParamValue::Boolean(true)),
                "false" | "0" | "no" | "off" => Ok(ParamValue::Boolean(false)),
                _ => Err(invalid()),
            },
            Self::Integer => trimmed
                .parse::<i64>()
                .map(ParamValue::Integer)
                .map_err(|_| invalid()),
            Self::Float => match trimmed.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(ParamValue::Float(f)),
                _ => Err(invalid()),
            },
            Self::String => {
                if trimmed.is_empty() {
                    Err(Error::MissingParam(label.to_string()))
                } else {
                    Ok(ParamValue::String(raw.to_string()))
                }
            }
        }
    }

    /// Coerce a JSON value (e.g. a CWL `default`) into this kind.
    pub fn coerce(&self, label: &str, value: &Value) -> Result<ParamValue> {
        match (self, value) {
            (Self::Boolean, Value::Bool(b)) => Ok(ParamValue::Boolean(*b)),
            (Self::Integer, Value::Number(n)) if n.is_i64() => {
                Ok(ParamValue::Integer(n.as_i64().unwrap_or_default()))
            }
            (Self::Float, Value::Number(n)) => n
                .as_f64()
                .map(ParamValue::Float)
                .ok_or_else(|| Error::InvalidParamValue {
                    label: label.to_string(),
                    expected: self.as_str(),
                    value: n.to_string(),
                }),
            (_, Value::String(s)) => self.parse(label, s),
            (_, other) => Err(Error::InvalidParamValue {
                label: label.to_string(),
                expected: self.as_str(),
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            Self::Boolean(_) => ParamKind::Boolean,
            Self::Integer(_) => ParamKind::Integer,
            Self::Float(_) => ParamKind::Float,
            Self::String(_) => ParamKind::String,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Boolean(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::String(s) => Value::String(s.clone()),
        }
    }
}

/// One declared workflow input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputParam {
    pub label: String,
    pub kind: ParamKind,
    /// Declared type with any trailing `?` removed.
    pub cwl_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl InputParam {
    /// Resolve the value for this input from optional raw text, falling back
    /// to the declared default. Every input is required.
    pub fn resolve(&self, raw: Option<&str>) -> Result<ParamValue> {
        match (raw, &self.default) {
            (Some(raw), _) => self.kind.parse(&self.label, raw),
            (None, Some(default)) if !default.is_null() => self.kind.coerce(&self.label, default),
            _ => Err(Error::MissingParam(self.label.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cwl_type_mapping() {
        assert_eq!(ParamKind::from_cwl_type("boolean").unwrap(), ParamKind::Boolean);
        assert_eq!(ParamKind::from_cwl_type("int").unwrap(), ParamKind::Integer);
        assert_eq!(ParamKind::from_cwl_type("long").unwrap(), ParamKind::Integer);
        assert_eq!(ParamKind::from_cwl_type("double").unwrap(), ParamKind::Integer);
        assert_eq!(ParamKind::from_cwl_type("float").unwrap(), ParamKind::Float);
        assert_eq!(ParamKind::from_cwl_type("File").unwrap(), ParamKind::String);
        assert_eq!(ParamKind::from_cwl_type("Directory").unwrap(), ParamKind::String);
        assert!(matches!(
            ParamKind::from_cwl_type("record"),
            Err(Error::UnsupportedParamType(_))
        ));
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(
            ParamKind::Boolean.parse("flag", "Yes").unwrap(),
            ParamValue::Boolean(true)
        );
        assert_eq!(
            ParamKind::Integer.parse("n", " 42 ").unwrap(),
            ParamValue::Integer(42)
        );
        assert_eq!(
            ParamKind::Float.parse("x", "0.5").unwrap(),
            ParamValue::Float(0.5)
        );
        assert!(ParamKind::Integer.parse("n", "4.2").is_err());
        assert!(ParamKind::Float.parse("x", "NaN").is_err());
        assert!(matches!(
            ParamKind::String.parse("s", "  "),
            Err(Error::MissingParam(_))
        ));
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let param = InputParam {
            label: "threads".into(),
            kind: ParamKind::Integer,
            cwl_type: "int".into(),
            default: Some(json!(4)),
            doc: None,
        };
        assert_eq!(param.resolve(None).unwrap(), ParamValue::Integer(4));
        assert_eq!(param.resolve(Some("8")).unwrap(), ParamValue::Integer(8));

        let required = InputParam {
            default: None,
            ..param
        };
        assert!(matches!(required.resolve(None), Err(Error::MissingParam(_))));
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(ParamValue::Integer(3).to_json(), json!(3));
        assert_eq!(ParamValue::String("a.fq".into()).to_json(), json!("a.fq"));
        assert_eq!(ParamValue::Boolean(false).kind(), ParamKind::Boolean);
    }
}
