//! Config command - inspect the effective configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;
use serde_json::json;

use super::{Context, heading};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the merged configuration and where it was loaded from
    Show,

    /// Print the user config file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let config = &loaded.config;

    if ctx.json_output {
        return ctx.print_json(&json!({
            "sources": loaded.loaded_from(),
            "database": ctx.database,
            "remote": {
                "timeout_secs": config.remote_timeout().as_secs(),
                "user_agent": config.user_agent(),
            },
            "logging": {
                "directory": loaded.log_dir(),
                "json": config.logging().json,
            },
            "warnings": loaded.warnings,
        }));
    }

    let dim = Style::new().dim();
    heading("wesmirror configuration");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("{}", dim.apply_to("No config files loaded (using defaults)"));
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
    }
    println!();

    println!("Database:");
    println!("  path: {}", ctx.database.display());
    println!();

    println!("Remote:");
    println!("  timeout: {}s", config.remote_timeout().as_secs());
    if let Some(agent) = config.user_agent() {
        println!("  user agent: {agent}");
    }
    println!();

    println!("Logging:");
    if let Some(dir) = loaded.log_dir() {
        println!("  directory: {}", dir.display());
    }
    println!("  json: {}", config.logging().json);

    if !loaded.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {w}");
        }
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = config.to_toml() {
            println!("{toml_str}");
        }
    }

    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    match &ctx.loaded.config_dir {
        Some(dir) => println!("{}", dir.join("config.toml").display()),
        None => eprintln!("Could not determine config directory"),
    }
    Ok(())
}
