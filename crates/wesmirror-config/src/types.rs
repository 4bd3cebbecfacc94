//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [database]
//! path = "/var/lib/wesmirror/mirror.db"
//!
//! [remote]
//! timeout_secs = 30
//! user_agent = "wesmirror/0.1"
//!
//! [logging]
//! directory = "/var/log/wesmirror"
//! json = true
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application name for platform directory resolution.
pub const APP_NAME: &str = "wesmirror";

/// Database filename under the platform data directory.
pub const DEFAULT_DATABASE_FILE: &str = "mirror.db";

/// Default per-request timeout for remote WES calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Local mirror database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseConfig>,

    /// Remote WES client settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,

    /// File logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

impl MirrorConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: MirrorConfig) {
        if other.database.is_some() {
            self.database = other.database;
        }

        if other.remote.is_some() {
            self.remote = other.remote;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Database path: the configured one, else `<data_dir>/wesmirror/mirror.db`.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database
            .as_ref()
            .and_then(|d| d.path.clone())
            .or_else(default_database_path)
    }

    /// Request timeout for remote calls.
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(
            self.remote
                .as_ref()
                .map(|r| r.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// User agent override for remote calls.
    pub fn user_agent(&self) -> Option<&str> {
        self.remote.as_ref().and_then(|r| r.user_agent.as_deref())
    }

    /// Logging settings, defaulted when the section is absent.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

/// Platform default database location.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_NAME).join(DEFAULT_DATABASE_FILE))
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// `[database]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

/// `[remote]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Overrides the client's default `User-Agent`.
    pub user_agent: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for rotating log files; defaults to `logs/` in the config dir.
    pub directory: Option<PathBuf>,
    /// Write file logs as JSON lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            json: true,
        }
    }
}
