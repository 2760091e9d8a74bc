//! Archflow - guided architectural-analysis workflows.
//!
//! Compose a workflow of analysis steps for a building purpose, preview the
//! prompts each step will send, and run the whole workflow against a
//! text-generation backend.

#![allow(clippy::single_match_else)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use archflow::ai::{backend_from_config, GenerationAdapter, GenerationMethod};
use archflow::catalog::{DefinitionSet, Objective, Purpose, Step, StepCatalog};
use archflow::pipeline::{Pipeline, PipelineState, RunOutcome, SessionInputs};
use archflow::prompt::{DocumentSource, ProjectFields, PromptCompiler, PromptInputs, TextDocument};
use archflow::workflow::{Workflow, WorkflowComposer, WorkflowRecord};
use archflow::Config;

/// Guided architectural-analysis workflows
#[derive(Parser)]
#[command(name = "archflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this configuration file instead of the default lookup
    #[arg(long, global = true, env = "ARCHFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Step-definition YAML (overrides the configured path)
    #[arg(long, global = true)]
    definitions: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List building purposes and the objectives each offers
    Purposes {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List catalog steps
    Steps {
        /// Only show steps recommended for this objective
        #[arg(short, long)]
        objective: Option<Objective>,
    },

    /// Compose a workflow and print its final order
    Suggest {
        /// Building purpose
        #[arg(short, long)]
        purpose: Purpose,

        /// Analysis objectives, in priority order
        #[arg(short, long = "objective", required = true)]
        objectives: Vec<Objective>,

        /// Optional steps to add
        #[arg(long)]
        add: Vec<String>,

        /// Steps to remove (required steps stay)
        #[arg(long)]
        remove: Vec<String>,

        /// New step order (comma-separated ids)
        #[arg(long, value_delimiter = ',')]
        order: Vec<String>,

        /// Write the workflow record to this file
        #[arg(short = 'O', long)]
        output: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the prompts compiled for one step
    Prompt {
        /// Step id
        step: String,

        /// Project fields file (TOML or JSON)
        #[arg(long)]
        fields: Option<PathBuf>,

        /// Text document to summarize and search
        #[arg(long)]
        document: Option<PathBuf>,

        /// Print only the full prompt of this sub-stage (1-based)
        #[arg(long)]
        stage: Option<usize>,
    },

    /// Run a workflow through the generation backend
    Run {
        /// Workflow record written by `suggest --output`
        #[arg(short, long, conflicts_with = "purpose")]
        workflow: Option<PathBuf>,

        /// Building purpose
        #[arg(short, long, required_unless_present = "workflow")]
        purpose: Option<Purpose>,

        /// Analysis objectives, in priority order
        #[arg(short, long = "objective", requires = "purpose")]
        objectives: Vec<Objective>,

        /// Project fields file (TOML or JSON)
        #[arg(long)]
        fields: Option<PathBuf>,

        /// Text document to summarize and search
        #[arg(long)]
        document: Option<PathBuf>,

        /// Write step records (JSON) to this file
        #[arg(long)]
        history: Option<PathBuf>,

        /// First generation method to try
        #[arg(short, long)]
        method: Option<GenerationMethod>,

        /// Use the offline backend instead of the configured one
        #[arg(long)]
        dry_run: bool,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    let config = load_config(cli.config.as_deref(), cli.definitions)?;

    match cli.command {
        Commands::Purposes { format } => cmd_purposes(&format)?,
        Commands::Steps { objective } => cmd_steps(objective),
        Commands::Suggest { purpose, objectives, add, remove, order, output, format } => {
            let edits = Edits { add, remove, order };
            cmd_suggest(purpose, &objectives, &edits, output.as_deref(), &format)?;
        }
        Commands::Prompt { step, fields, document, stage } => {
            cmd_prompt(&config, &step, fields.as_deref(), document.as_deref(), stage)?;
        }
        Commands::Run {
            workflow,
            purpose,
            objectives,
            fields,
            document,
            history,
            method,
            dry_run,
        } => {
            let source = match (workflow, purpose) {
                (Some(path), _) => WorkflowSource::Record(path),
                (None, Some(purpose)) => WorkflowSource::Suggest(purpose, objectives),
                (None, None) => anyhow::bail!("Either --workflow or --purpose is required"),
            };
            let options = RunOptions { fields, document, history, method, dry_run };
            cmd_run(&config, source, &options)?;
        }
        Commands::Config { path } => cmd_config(&config, path)?,
        Commands::Completions { shell } => cmd_completions(shell),
    }

    Ok(())
}

/// Load configuration, applying command-line overrides.
fn load_config(path: Option<&Path>, definitions: Option<PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load()?,
    };
    if let Some(definitions) = definitions {
        config.catalog.definitions = definitions;
    }
    Ok(config)
}

/// List purposes and their objectives.
fn cmd_purposes(format: &str) -> Result<()> {
    match format {
        "json" => {
            let listing: Vec<_> = Purpose::all()
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "purpose": p.label(),
                        "key": p.key(),
                        "objectives": p.objectives().iter().map(|o| o.label()).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        _ => {
            for purpose in Purpose::all() {
                println!("{} ({})", purpose.label(), purpose.key());
                for objective in purpose.objectives() {
                    println!("  - {} ({})", objective.label(), objective.key());
                }
            }
        }
    }
    Ok(())
}

/// List catalog steps.
fn cmd_steps(objective: Option<Objective>) {
    let catalog = StepCatalog::builtin();

    if let Some(objective) = objective {
        println!("Recommended for {objective}:");
        print_steps(catalog.recommended_steps(objective));
        return;
    }

    println!("Required:");
    print_steps(catalog.required_steps());
    for objective in Objective::all() {
        println!("\nRecommended for {objective}:");
        print_steps(catalog.recommended_steps(*objective));
    }
    println!("\nOptional:");
    print_steps(catalog.optional_steps());
}

fn print_steps(steps: &[Step]) {
    for step in steps {
        println!("  {:>2}. {} - {} [{}]", step.order, step.id, step.title, step.category);
    }
}

/// Workflow edits applied after suggestion.
struct Edits {
    add: Vec<String>,
    remove: Vec<String>,
    order: Vec<String>,
}

/// Compose a workflow, apply edits, and print the final order.
fn cmd_suggest(
    purpose: Purpose,
    objectives: &[Objective],
    edits: &Edits,
    output: Option<&Path>,
    format: &str,
) -> Result<()> {
    let composer = WorkflowComposer::builtin();
    let mut workflow = composer.suggest(purpose, objectives)?;

    for id in &edits.add {
        workflow = composer.add_optional(workflow, id);
    }
    for id in &edits.remove {
        workflow = composer.remove(workflow, id);
    }
    if !edits.order.is_empty() {
        let order: Vec<&str> = edits.order.iter().map(String::as_str).collect();
        workflow = composer.reorder(workflow, &order);
    }

    let record = composer.export(&workflow);
    let json = record.to_json()?;

    if let Some(path) = output {
        std::fs::write(path, &json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = ?path, "Workflow record written");
    }

    match format {
        "json" => println!("{json}"),
        _ => {
            println!("{} / {}", workflow.purpose, workflow.objective);
            for (i, step) in composer.final_order(&workflow).iter().enumerate() {
                println!(
                    "{:>2}. {} - {} ({}, order {})",
                    i + 1,
                    step.id,
                    step.title,
                    step.tier.as_str(),
                    step.order
                );
            }
        }
    }

    Ok(())
}

/// Print the prompts for one step.
fn cmd_prompt(
    config: &Config,
    step_id: &str,
    fields: Option<&Path>,
    document: Option<&Path>,
    stage: Option<usize>,
) -> Result<()> {
    let definitions = DefinitionSet::load(&config.catalog.definitions)?;
    let step = StepCatalog::builtin()
        .find(step_id)
        .ok_or_else(|| anyhow::anyhow!("Unknown step: {step_id}"))?;
    let definition = definitions.resolve(step);

    let fields = load_fields(fields)?;
    let document = load_document(document)?;
    let inputs = PromptInputs {
        fields: &fields,
        prior_context: "",
        documents: document.as_ref().map(|d| d as &dyn DocumentSource),
    };

    let base = PromptCompiler::new(config.pipeline.max_passages).compile_base(&definition, &inputs);

    if let Some(stage) = stage {
        let index = stage.checked_sub(1).ok_or_else(|| anyhow::anyhow!("Stages start at 1"))?;
        let sub_stage = PromptCompiler::compile_sub_stage(&base, &definition, index)
            .ok_or_else(|| anyhow::anyhow!("Step '{step_id}' has no stage {stage}"))?;
        println!("{}", sub_stage.prompt);
        return Ok(());
    }

    println!("{base}");
    for sub_stage in PromptCompiler::compile_sub_stages(&base, &definition) {
        let suffix = sub_stage.prompt.strip_prefix(&base).unwrap_or(&sub_stage.prompt);
        println!("----- {} -----{}", sub_stage.label, suffix.trim_end());
    }

    Ok(())
}

/// Where `run` gets its workflow from.
enum WorkflowSource {
    Record(PathBuf),
    Suggest(Purpose, Vec<Objective>),
}

/// Options for `run`.
struct RunOptions {
    fields: Option<PathBuf>,
    document: Option<PathBuf>,
    history: Option<PathBuf>,
    method: Option<GenerationMethod>,
    dry_run: bool,
}

/// Run a workflow end to end.
fn cmd_run(config: &Config, source: WorkflowSource, options: &RunOptions) -> Result<()> {
    let definitions = DefinitionSet::load(&config.catalog.definitions)?;
    let composer = WorkflowComposer::builtin();
    let workflow = load_workflow(&composer, source)?;

    let fields = load_fields(options.fields.as_deref())?;
    let document = load_document(options.document.as_deref())?;

    let backend = backend_from_config(&config.ai, options.dry_run)?;
    let adapter = GenerationAdapter::new(backend);
    println!("Backend: {}", adapter.backend_name());

    let mut pipeline = Pipeline::from_config(adapter, definitions, config);
    if let Some(method) = options.method {
        pipeline = pipeline.with_method(method);
    }
    if options.dry_run {
        pipeline = pipeline.with_inter_call_delay(Duration::ZERO);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        eprintln!("\nStopping after the current step...");
        handler_stop.store(true, Ordering::SeqCst);
    })?;

    let mut state = PipelineState::new(composer.final_order(&workflow));
    let inputs = SessionInputs {
        fields: &fields,
        documents: document.as_ref().map(|d| d as &dyn DocumentSource),
    };

    // Create tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(pipeline.run_all_with_progress(
        &mut state,
        inputs,
        &stop,
        |index, total, step| eprintln!("[{}/{}] {}", index + 1, total, step.title),
    ));

    for (i, record) in state.records().iter().enumerate() {
        println!("\n## [{}] {}\n", i + 1, record.title);
        println!("{}", record.result);
    }

    if let Some(path) = &options.history {
        std::fs::write(path, state.records_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("\nHistory written to {}", path.display());
    }

    let (done, total) = state.progress();
    match outcome {
        Ok(RunOutcome::Completed) => println!("\nCompleted {done}/{total} steps."),
        Ok(RunOutcome::Cancelled) => println!("\nStopped after {done}/{total} steps."),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("Run halted at {}; re-run to resume", state.phase())));
        }
    }

    Ok(())
}

/// Build the workflow from a record file or a fresh suggestion.
fn load_workflow(composer: &WorkflowComposer<'_>, source: WorkflowSource) -> Result<Workflow> {
    match source {
        WorkflowSource::Record(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let record = WorkflowRecord::from_json(&content)?;
            Ok(composer.import(&record)?)
        }
        WorkflowSource::Suggest(purpose, objectives) => {
            Ok(composer.suggest(purpose, &objectives)?)
        }
    }
}

fn load_fields(path: Option<&Path>) -> Result<ProjectFields> {
    path.map_or_else(|| Ok(ProjectFields::default()), ProjectFields::load)
}

fn load_document(path: Option<&Path>) -> Result<Option<TextDocument>> {
    path.map(TextDocument::from_file).transpose()
}

/// Show configuration.
fn cmd_config(config: &Config, show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::global_path() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let toml = toml::to_string_pretty(config)?;
    println!("{toml}");

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "archflow", &mut io::stdout());
}
