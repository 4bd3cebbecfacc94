//! wesmirror - mirror WES service metadata into a local database
//!
//! Main entry point for the wesmirror CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use wesmirror_config::LoadedConfig;

mod commands;

use commands::{config, service, workflow};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// wesmirror - mirror WES service metadata into a local database
#[derive(Parser)]
#[command(name = "wesmirror")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding config.toml and logs
    #[arg(long, global = true, env = "WESMIRROR_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Mirror database file (overrides [database] path)
    #[arg(long, global = true, env = "WESMIRROR_DATABASE")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register, inspect and synchronize WES services
    Service(service::ServiceArgs),

    /// Browse mirrored workflows and prepare runs
    Workflow(workflow::WorkflowArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = wesmirror_config::load_config_with_options(None, cli.config_dir.as_deref())
        .context("failed to load configuration")?;
    let _guard = init_tracing(cli.verbose, &loaded);
    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }

    let database = cli
        .database
        .clone()
        .or_else(|| loaded.config.database_path())
        .unwrap_or_else(|| PathBuf::from("mirror.db"));

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        database,
        loaded,
    };

    match cli.command {
        Commands::Service(args) => service::run(args, &ctx).await,
        Commands::Workflow(args) => workflow::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

/// Console logs on stderr plus a daily-rotated file under the log directory.
///
/// The returned guard flushes the file writer on drop.
fn init_tracing(verbose: bool, loaded: &LoadedConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "wesmirror=debug,wesmirror_registry=debug,wesmirror_store=debug,wesmirror_client=debug,info"
    } else {
        "wesmirror=warn,wesmirror_registry=warn,wesmirror_store=warn,wesmirror_client=warn,error"
    };
    let file_filter = "wesmirror=debug,wesmirror_registry=debug,wesmirror_store=debug,wesmirror_client=debug,info";

    let log_dir = loaded.log_dir().unwrap_or_else(|| PathBuf::from("logs"));
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("wesmirror")
        .filename_suffix("log")
        .build(&log_dir)
        .ok();
    let (writer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let json = loaded.config.logging().json;
    let json_layer = writer.clone().filter(|_| json).map(|w| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(w)
            .with_filter(EnvFilter::new(file_filter))
    });
    let text_layer = writer.filter(|_| !json).map(|w| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(w)
            .with_filter(EnvFilter::new(file_filter))
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::new(filter)),
        )
        .with(json_layer)
        .with(text_layer)
        .init();

    guard
}
