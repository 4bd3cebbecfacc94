//! Service command - register and synchronize WES services.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::Style;
use serde_json::json;
use wesmirror_registry::{RefreshReport, ServiceDetail, ServiceRegistration, SyncOutcome};
use wesmirror_types::Service;

use super::{Context, heading, short, success};

/// Arguments for the service command.
#[derive(Args, Debug)]
pub struct ServiceArgs {
    #[command(subcommand)]
    pub command: ServiceCommand,
}

#[derive(Subcommand, Debug)]
pub enum ServiceCommand {
    /// Register a WES server and mirror its metadata
    Add {
        /// Unique service name
        name: String,

        /// Server host and optional port, e.g. localhost:8000
        #[arg(long)]
        host: String,

        /// http or https
        #[arg(long, default_value = "http")]
        scheme: String,

        /// Bearer token sent to the server
        #[arg(long, env = "WESMIRROR_SERVER_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// List registered services
    List,

    /// Show a service with its engines, versions and workflows
    Show {
        /// Service name or token
        service: String,
    },

    /// Synchronize services with their servers (all when none given)
    Refresh {
        /// Service name or token
        service: Option<String>,
    },

    /// Mark a service and everything mirrored from it as deleted
    Delete {
        /// Service name or token
        service: String,
    },

    /// Permanently remove a service and its mirrored rows
    Purge {
        /// Service name or token
        service: String,

        /// Confirm the removal
        #[arg(long)]
        yes: bool,
    },
}

/// Run the service command.
pub async fn run(args: ServiceArgs, ctx: &Context) -> Result<()> {
    let registry = ctx.registry()?;
    let dim = Style::new().dim();

    match args.command {
        ServiceCommand::Add {
            name,
            host,
            scheme,
            token,
        } => {
            let form = ServiceRegistration {
                service_name: name,
                server_scheme: scheme,
                server_host: host,
                server_token: token,
            };
            let registered = registry.register(&form).await?;

            if ctx.json_output {
                ctx.print_json(&registered)?;
            } else {
                success(&format!(
                    "Registered {} {}",
                    registered.service.name,
                    dim.apply_to(short(&registered.service.token))
                ));
                print_outcome("workflows", &registered.workflows);
            }
        }
        ServiceCommand::List => {
            let services = registry.list_services()?;
            if ctx.json_output {
                ctx.print_json(&services)?;
            } else {
                heading("Services");
                if services.is_empty() {
                    println!("{}", dim.apply_to("No services registered"));
                }
                for service in &services {
                    println!(
                        "{} {:<24} {}",
                        dim.apply_to(format!("[{}]", short(&service.token))),
                        service.name,
                        service.endpoint().base_url()
                    );
                }
            }
        }
        ServiceCommand::Show { service } => {
            let detail = registry.service_detail(&service)?;
            if ctx.json_output {
                ctx.print_json(&detail)?;
            } else {
                print_detail(&detail, ctx.verbose);
            }
        }
        ServiceCommand::Refresh { service } => {
            let targets: Vec<Service> = match service {
                Some(s) => vec![registry.live_service(&s)?],
                None => registry.list_services()?,
            };

            let mut reports = Vec::with_capacity(targets.len());
            for target in &targets {
                let report = registry.refresh(&target.token).await?;
                if !ctx.json_output {
                    print_report(target, &report);
                }
                reports.push((target, report));
            }

            if ctx.json_output {
                let out: Vec<_> = reports
                    .iter()
                    .map(|(s, r)| json!({"service": s.name, "token": s.token, "report": r}))
                    .collect();
                ctx.print_json(&out)?;
            }

            let failed = reports.iter().filter(|(_, r)| !r.is_success()).count();
            if failed > 0 {
                bail!("{failed} of {} services could not be refreshed", reports.len());
            }
        }
        ServiceCommand::Delete { service } => {
            let target = registry.live_service(&service)?;
            registry.delete_by_flag(&target.token)?;
            if ctx.json_output {
                ctx.print_json(&json!({"deleted": target.token}))?;
            } else {
                success(&format!("Deleted {}", target.name));
            }
        }
        ServiceCommand::Purge { service, yes } => {
            let target = registry.service(&service)?;
            if !yes {
                bail!(
                    "refusing to purge '{}' without --yes; this cannot be undone",
                    target.name
                );
            }
            registry.purge(&target.token)?;
            if ctx.json_output {
                ctx.print_json(&json!({"purged": target.token}))?;
            } else {
                success(&format!("Purged {}", target.name));
            }
        }
    }

    Ok(())
}

fn print_outcome(label: &str, outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Applied { summary } => {
            println!("  {:<10} {}", label, summary);
        }
        SyncOutcome::RemoteUnavailable { reason } => {
            let red = Style::new().red();
            println!("  {:<10} {} {}", label, red.apply_to("failed:"), reason);
        }
    }
}

fn print_report(service: &Service, report: &RefreshReport) {
    let marker = if report.is_success() {
        Style::new().green().apply_to("✓")
    } else {
        Style::new().red().apply_to("✗")
    };
    println!("{} {}", marker, service.name);
    print_outcome("engines", &report.engines);
    print_outcome("workflows", &report.workflows);
}

fn print_detail(detail: &ServiceDetail, verbose: bool) {
    let dim = Style::new().dim();
    let service = &detail.service;

    heading(&service.to_string());
    println!("  token:     {}", service.token);
    println!("  server:    {}", service.endpoint().base_url());
    println!("  auth:      {}", service.auth_instructions_url);
    println!("  contact:   {}", service.contact_info_url);
    if verbose {
        println!("  created:   {}", service.created_at.to_rfc3339());
        println!("  updated:   {}", service.updated_at.to_rfc3339());
    }
    println!();

    println!("Workflow engines:");
    if detail.workflow_engines.is_empty() {
        println!("  {}", dim.apply_to("none"));
    }
    for engine in &detail.workflow_engines {
        let types: Vec<String> = engine.type_keys().iter().map(|k| k.to_string()).collect();
        println!(
            "  {} {}  {}",
            engine.name,
            engine.version,
            dim.apply_to(types.join(", "))
        );
    }
    println!();

    let versions: Vec<&str> = detail
        .supported_wes_versions
        .iter()
        .map(|v| v.wes_version.as_str())
        .collect();
    println!("Supported WES versions: {}", versions.join(", "));
    println!();

    println!("Workflows:");
    if detail.workflows.is_empty() {
        println!("  {}", dim.apply_to("none"));
    }
    for wf in &detail.workflows {
        println!(
            "  {} {} {}  {}",
            dim.apply_to(format!("[{}]", short(&wf.token))),
            wf.name,
            wf.version,
            dim.apply_to(wf.workflow_type.key())
        );
    }
}
