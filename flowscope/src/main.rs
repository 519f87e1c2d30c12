//! flowscope - BPMN process instance replay
//!
//! Computes how a process diagram should be annotated for a given instance
//! history and prints the resulting plan.
//!
//! Commands:
//! - `plan`: replay history payloads saved as JSON files
//! - `fetch`: replay an instance fetched from the configured workflow engine
//! - `steps`: list the ordered trace with badges, durations and labels
//!
//! Configuration lives at $XDG_CONFIG_HOME/flowscope/config.toml
//! (~/.config/flowscope/config.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use flowscope_core::format::{format_duration_opt, format_timestamp};
use flowscope_core::{
    apply_plan, BlockingEngineClient, Config, DefinitionCache, EdgeState, ProcessGraph,
    ReplayModel, TextSurface,
};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "flowscope")]
#[command(about = "Replay BPMN process instance history as diagram annotations")]
#[command(version)]
struct Args {
    /// Write debug logs to the state directory
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the annotation plan for saved history payloads
    Plan {
        #[command(flatten)]
        input: HistoryFiles,

        /// Process graph document (JSON)
        #[arg(long)]
        graph: Option<PathBuf>,

        /// Number of trace records to reveal (default: all)
        #[arg(long)]
        cursor: Option<usize>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Fetch an instance from the workflow engine and compute its plan
    Fetch {
        /// Process instance id
        #[arg(long)]
        instance: String,

        /// Process definition id (default: taken from the history)
        #[arg(long)]
        definition: Option<String>,

        /// Number of trace records to reveal (default: all)
        #[arg(long)]
        cursor: Option<usize>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List the ordered execution trace
    Steps {
        #[command(flatten)]
        input: HistoryFiles,

        /// Process graph document (JSON)
        #[arg(long)]
        graph: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct HistoryFiles {
    /// Historic-activity list (JSON)
    #[arg(long)]
    activities: PathBuf,

    /// Task history list (JSON)
    #[arg(long)]
    tasks: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;

    // File logging only when asked for; the guard must outlive the command.
    let _log_guard = if args.verbose {
        Some(
            flowscope_core::logging::init(&config.logging)
                .context("failed to initialize logging")?,
        )
    } else {
        None
    };

    match args.command {
        Command::Plan {
            input,
            graph,
            cursor,
            format,
        } => cmd_plan(&input, graph.as_deref(), cursor, format),
        Command::Fetch {
            instance,
            definition,
            cursor,
            format,
        } => cmd_fetch(&config, &instance, definition.as_deref(), cursor, format),
        Command::Steps { input, graph } => cmd_steps(&input, graph.as_deref()),
    }
}

fn cmd_plan(
    input: &HistoryFiles,
    graph: Option<&Path>,
    cursor: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let model = load_model(input, graph)?;
    print_plan(&model, cursor, format)
}

fn cmd_fetch(
    config: &Config,
    instance: &str,
    definition: Option<&str>,
    cursor: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    if !config.engine.is_ready() {
        anyhow::bail!(
            "no workflow engine configured; set engine.base_url in {}",
            Config::config_path().display()
        );
    }

    let client = BlockingEngineClient::new(config.engine.clone())
        .context("failed to create engine client")?;
    let mut cache = DefinitionCache::new(config.replay.definition_cache_capacity);

    tracing::info!(instance, "Fetching process instance history");
    let model = client
        .load_replay_model(instance, definition, &mut cache)
        .with_context(|| format!("failed to load process instance {}", instance))?;

    print_plan(&model, cursor, format)
}

fn cmd_steps(input: &HistoryFiles, graph: Option<&Path>) -> Result<()> {
    let model = load_model(input, graph)?;

    if model.is_empty() {
        println!("No activity recorded for this instance.");
        return Ok(());
    }

    println!(
        "{:>4}  {:<24} {:<18} {:<19} {:>8}  LABEL",
        "#", "ACTIVITY", "TYPE", "STARTED", "DURATION"
    );

    let mut ordinal = 0u32;
    for record in model.trace() {
        let badge = if record.is_node() {
            ordinal += 1;
            ordinal.to_string()
        } else {
            "-".to_string()
        };

        let label = model
            .labels()
            .get(&record.activity_id)
            .map(String::as_str)
            .or(record.activity_name.as_deref())
            .unwrap_or("");

        let marker = if record.is_edge()
            && model.loops().state(&record.activity_id) == EdgeState::LoopBack
        {
            " (loop)"
        } else {
            ""
        };

        println!(
            "{:>4}  {:<24} {:<18} {:<19} {:>8}  {}{}",
            badge,
            record.activity_id,
            record.activity_type.as_str(),
            format_timestamp(record.start_time),
            format_duration_opt(record.duration()),
            label,
            marker
        );
    }

    print_warnings(&model);
    Ok(())
}

/// Read the saved payloads and build the replay model.
fn load_model(input: &HistoryFiles, graph: Option<&Path>) -> Result<ReplayModel> {
    let activities = read_json(&input.activities)?;
    let tasks = match &input.tasks {
        Some(path) => read_json(path)?,
        None => json!([]),
    };
    let graph = match graph {
        Some(path) => {
            let doc = read_json(path)?;
            Some(ProcessGraph::from_value(&doc).context("failed to read process graph")?)
        }
        None => None,
    };

    let model = ReplayModel::from_payloads(&activities, &tasks, graph.as_ref())
        .context("failed to build replay model")?;

    tracing::debug!(
        records = model.len(),
        warnings = model.warnings().len(),
        "Replay model built"
    );

    Ok(model)
}

fn read_json(path: &Path) -> Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {} as JSON", path.display()))
}

fn print_plan(model: &ReplayModel, cursor: Option<usize>, format: OutputFormat) -> Result<()> {
    let plan = model.plan(cursor);
    let revealed = cursor.map_or(model.len(), |c| c.min(model.len()));

    match format {
        OutputFormat::Json => {
            let doc = json!({
                "cursor": revealed,
                "traceLength": model.len(),
                "plan": plan,
                "warnings": model.warnings(),
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Text => {
            println!("Step {} of {}", revealed, model.len());
            if let Some(active) = plan.active_node() {
                println!("Active: {}", active);
            }
            println!();

            let mut surface = TextSurface::new();
            apply_plan(&mut surface, &plan);
            print!("{}", surface.render());

            print_warnings(model);
        }
    }

    Ok(())
}

fn print_warnings(model: &ReplayModel) {
    for warning in model.warnings() {
        eprintln!("warning: {}", warning);
    }
}
