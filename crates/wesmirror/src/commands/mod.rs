//! CLI command handlers.

pub mod config;
pub mod service;
pub mod workflow;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use console::Style;
use serde::Serialize;
use wesmirror_client::HttpRemote;
use wesmirror_config::LoadedConfig;
use wesmirror_registry::ServiceRegistry;
use wesmirror_store::SqliteMirrorStore;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Mirror database file.
    pub database: PathBuf,
    /// Merged configuration and where it came from.
    pub loaded: LoadedConfig,
}

impl Context {
    /// Open the mirror and wire it to an HTTP remote built from config.
    pub fn registry(&self) -> Result<ServiceRegistry> {
        let store = SqliteMirrorStore::open(&self.database).with_context(|| {
            format!("failed to open mirror database {}", self.database.display())
        })?;
        let config = &self.loaded.config;
        let remote = HttpRemote::new()
            .with_timeout(config.remote_timeout())
            .with_user_agent(config.user_agent().map(str::to_string));
        Ok(ServiceRegistry::new(Arc::new(store), Arc::new(remote)))
    }

    /// Print `value` as pretty JSON.
    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Print a bold title followed by a rule.
pub(crate) fn heading(title: &str) {
    let dim = Style::new().dim();
    println!("{}", Style::new().bold().apply_to(title));
    println!("{}", dim.apply_to("─".repeat(50)));
}

pub(crate) fn success(message: &str) {
    println!("{} {}", Style::new().green().apply_to("✓"), message);
}

/// First eight characters of a token.
pub(crate) fn short(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}
