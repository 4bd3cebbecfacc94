//! Workflow command - browse mirrored workflows and prepare runs.

use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow};
use clap::{Args, Subcommand};
use console::Style;
use serde::Serialize;
use wesmirror_registry::{RunRequest, cwl_viewer_url, parse_run_inputs};
use wesmirror_types::{InputParam, Workflow, WorkflowEngine};

use super::{Context, heading, short};

/// Arguments for the workflow command.
#[derive(Args, Debug)]
pub struct WorkflowArgs {
    #[command(subcommand)]
    pub command: WorkflowCommand,
}

#[derive(Subcommand, Debug)]
pub enum WorkflowCommand {
    /// List mirrored workflows
    List {
        /// Only workflows of this service (name or token)
        #[arg(short, long)]
        service: Option<String>,
    },

    /// Show a workflow and the engines that can run it
    Show {
        /// Workflow token
        workflow: String,
    },

    /// List the declared inputs of a workflow
    Params {
        /// Workflow token
        workflow: String,
    },

    /// Validate run inputs and print the resulting run request
    Prepare {
        /// Workflow token
        workflow: String,

        /// Execution engine (name or token)
        #[arg(short, long)]
        engine: Option<String>,

        /// Run name (default: workflow name and current time)
        #[arg(short, long)]
        name: Option<String>,

        /// Input value as label=value (repeatable, overrides the params file)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// YAML or JSON file mapping input labels to values
        #[arg(long)]
        params_file: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct WorkflowView<'a> {
    #[serde(flatten)]
    workflow: &'a Workflow,
    cwl_viewer_url: Option<String>,
    executable_engines: &'a [WorkflowEngine],
}

/// Run the workflow command.
pub async fn run(args: WorkflowArgs, ctx: &Context) -> Result<()> {
    let registry = ctx.registry()?;
    let dim = Style::new().dim();

    match args.command {
        WorkflowCommand::List { service } => {
            let workflows = registry.list_workflows(service.as_deref())?;
            if ctx.json_output {
                ctx.print_json(&workflows)?;
            } else {
                heading("Workflows");
                if workflows.is_empty() {
                    println!("{}", dim.apply_to("No workflows mirrored"));
                }
                for wf in &workflows {
                    println!(
                        "{} {:<24} {:<10} {}",
                        dim.apply_to(format!("[{}]", short(&wf.token))),
                        wf.name,
                        wf.version,
                        wf.workflow_type.key()
                    );
                }
            }
        }
        WorkflowCommand::Show { workflow } => {
            let wf = registry.get_workflow(&workflow)?;
            let engines = registry.executable_engines(&wf.token)?;
            let view = WorkflowView {
                workflow: &wf,
                cwl_viewer_url: cwl_viewer_url(&wf.location),
                executable_engines: &engines,
            };

            if ctx.json_output {
                ctx.print_json(&view)?;
            } else {
                heading(&wf.to_string());
                println!("  token:     {}", wf.token);
                println!("  version:   {}", wf.version);
                println!("  type:      {}", wf.workflow_type.key());
                println!("  location:  {}", wf.location);
                if let Some(url) = &view.cwl_viewer_url {
                    println!("  viewer:    {url}");
                }
                if let Some(loc) = &wf.parameters_template_location {
                    println!("  template:  {loc}");
                }
                let names: Vec<&str> = engines.iter().map(|e| e.name.as_str()).collect();
                println!("  engines:   {}", names.join(", "));
                if ctx.verbose {
                    println!();
                    println!("{}", wf.content);
                }
            }
        }
        WorkflowCommand::Params { workflow } => {
            let params = registry.workflow_params(&workflow)?;
            if ctx.json_output {
                ctx.print_json(&params)?;
            } else {
                heading("Inputs");
                if params.is_empty() {
                    println!("{}", dim.apply_to("No declared inputs"));
                }
                for param in &params {
                    print_param(param);
                }
            }
        }
        WorkflowCommand::Prepare {
            workflow,
            engine,
            name,
            params,
            params_file,
        } => {
            let mut inputs = match &params_file {
                Some(path) => {
                    let document = std::fs::read_to_string(path).with_context(|| {
                        format!("failed to read parameters file {}", path.display())
                    })?;
                    parse_run_inputs(&document)?
                }
                None => Default::default(),
            };
            inputs.extend(params);

            let request = RunRequest {
                engine,
                run_name: name,
                inputs,
            };
            let run = registry.prepare_run(&workflow, &request)?;
            // The prepared request is the output in both modes.
            ctx.print_json(&run)?;
        }
    }

    Ok(())
}

fn print_param(param: &InputParam) {
    let dim = Style::new().dim();
    let default = param
        .default
        .as_ref()
        .map(|d| format!(" (default: {d})"))
        .unwrap_or_default();
    println!(
        "  {:<20} {:<8}{}",
        param.label,
        param.kind.as_str(),
        dim.apply_to(default)
    );
    if let Some(doc) = &param.doc {
        println!("  {:<20} {}", "", dim.apply_to(doc));
    }
}

fn parse_param(s: &str) -> Result<(String, String)> {
    let (label, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected label=value, got '{s}'"))?;
    if label.trim().is_empty() {
        return Err(anyhow!("empty parameter label in '{s}'"));
    }
    Ok((label.trim().to_string(), value.to_string()))
}
