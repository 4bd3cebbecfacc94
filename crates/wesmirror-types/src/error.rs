//! Error types for shared wesmirror types.

use thiserror::Error;

/// Result type alias using the shared error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while interpreting shared types.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid scheme: {0} (expected http or https)")]
    InvalidScheme(String),

    #[error("Unsupported parameter type: {0}")]
    UnsupportedParamType(String),

    #[error("Invalid value for '{label}': expected {expected}, got '{value}'")]
    InvalidParamValue {
        label: String,
        expected: &'static str,
        value: String,
    },

    #[error("Missing value for required parameter '{0}'")]
    MissingParam(String),
}
