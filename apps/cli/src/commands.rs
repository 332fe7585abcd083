//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use specindex_core::index_file::{digest, load_index, load_raw_list, render_index, write_atomic};
use specindex_core::{
    BuildContext, BuildOutcome, BuildStep, CheckpointStore, Collaborators, DiffMode,
    ProgressReporter, RunMode, STEPS, StepKind,
};
use specindex_fetch::Fetcher;
use specindex_shared::{AppConfig, FetchConfig, SpecEntry, github_token, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// specindex — build a linked index of specification documents.
#[derive(Parser)]
#[command(
    name = "specindex",
    version,
    about = "Build and maintain a deduplicated, linked index of specification documents.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build the index from the raw input list.
    Build {
        /// Raw input list (defaults to `build.input` from the config).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output index file (defaults to `build.output`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Previous index, used as fallback for discontinued entries.
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Checkpoint directory (defaults to `build.checkpoint_dir`).
        #[arg(long)]
        checkpoints: Option<PathBuf>,

        /// Resume at this step, reading the previous step's checkpoint.
        #[arg(long, conflicts_with = "only")]
        from: Option<StepKind>,

        /// Run this step only, reading the previous step's checkpoint.
        #[arg(long)]
        only: Option<StepKind>,
    },

    /// Rebuild only what changed since a previous build.
    Diff {
        /// Raw input list the base index was built from.
        #[arg(long)]
        base_raw: PathBuf,

        /// Index built from the base raw list.
        #[arg(long)]
        base_index: PathBuf,

        /// New raw input list (defaults to `build.input`).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Produce the complete updated index instead of the changes only.
        #[arg(long)]
        full: bool,

        /// Where to write the result (stdout when omitted).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show the identity derived from a locator.
    Resolve {
        /// Document URL or bare name.
        locator: String,

        /// Shortname of the document this one forks.
        #[arg(long)]
        fork_of: Option<String>,
    },

    /// List the build steps in execution order.
    Steps,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "specindex=info",
        1 => "specindex=debug",
        _ => "specindex=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build {
            input,
            out,
            previous,
            checkpoints,
            from,
            only,
        } => {
            let mode = match (from, only) {
                (Some(step), _) => RunMode::From(step),
                (None, Some(step)) => RunMode::Only(step),
                (None, None) => RunMode::Full,
            };
            cmd_build(input, out, previous, checkpoints, mode).await
        }
        Command::Diff {
            base_raw,
            base_index,
            input,
            full,
            out,
        } => cmd_diff(&base_raw, &base_index, input, full, out).await,
        Command::Resolve { locator, fork_of } => cmd_resolve(&locator, fork_of.as_deref()),
        Command::Steps => cmd_steps(),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

/// HTTP collaborators sharing one throttled fetcher.
fn http_collaborators(config: &AppConfig) -> Result<Collaborators> {
    let fetcher = Fetcher::new(&FetchConfig::from(config))?.with_github_token(github_token(config));
    Ok(Collaborators::http(Arc::new(fetcher), &config.sources))
}

async fn cmd_build(
    input: Option<PathBuf>,
    out: Option<PathBuf>,
    previous: Option<PathBuf>,
    checkpoints: Option<PathBuf>,
    mode: RunMode,
) -> Result<()> {
    let config = load_config()?;
    let input = input.unwrap_or_else(|| PathBuf::from(&config.build.input));
    let out = out.unwrap_or_else(|| PathBuf::from(&config.build.output));
    let previous = previous.or_else(|| config.build.previous_index.as_ref().map(PathBuf::from));
    let checkpoints = checkpoints.unwrap_or_else(|| PathBuf::from(&config.build.checkpoint_dir));

    let raw = load_raw_list(&input)?;
    let previous_index = match &previous {
        Some(path) if path.exists() => load_index(path)?,
        Some(path) => {
            info!(path = %path.display(), "previous index not found, building without fallback");
            Vec::new()
        }
        None => Vec::new(),
    };

    info!(input = %input.display(), items = raw.len(), %mode, "building index");

    let store = CheckpointStore::open(&checkpoints)?;
    let ctx = BuildContext::new(raw, http_collaborators(&config)?)
        .with_previous(previous_index)
        .with_progress(Arc::new(CliProgress::new()));

    let outcome = specindex_core::run_build(&ctx, mode, Some(&store)).await?;

    let finalized = outcome.steps.last() == Some(&StepKind::Finalize.step().name);
    if !finalized {
        println!();
        println!("  Steps run:   {}", outcome.steps.join(", "));
        println!("  Checkpoints: {}", store.dir().display());
        println!();
        return Ok(());
    }

    let rendered = render_index(&outcome.index)?;
    let baseline = previous.as_deref().filter(|p| p.exists()).unwrap_or(out.as_path());
    let unchanged = std::fs::read_to_string(baseline)
        .map(|old| digest(&old) == digest(&rendered))
        .unwrap_or(false);

    write_atomic(&out, &rendered)?;

    println!();
    if unchanged {
        println!("  Index built: no changes.");
    } else {
        println!("  Index built successfully!");
    }
    println!("  Entries: {}", outcome.index.len());
    println!("  Output:  {}", out.display());
    println!("  Run:     {}", outcome.run_id);
    println!("  Time:    {:.1}s", outcome.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_diff(
    base_raw: &Path,
    base_index: &Path,
    input: Option<PathBuf>,
    full: bool,
    out: Option<PathBuf>,
) -> Result<()> {
    let config = load_config()?;
    let input = input.unwrap_or_else(|| PathBuf::from(&config.build.input));

    let raw = load_raw_list(&input)?;
    let base_raw = load_raw_list(base_raw)?;
    let base_index = load_index(base_index)?;
    let mode = if full { DiffMode::Full } else { DiffMode::Diff };

    let ctx = BuildContext::new(raw, http_collaborators(&config)?)
        .with_progress(Arc::new(CliProgress::new()));
    let outcome = specindex_core::diff(ctx, &base_raw, base_index, mode).await?;

    let rendered = match &outcome.index {
        Some(index) => render_index(index)?,
        None => {
            let changes = serde_json::json!({
                "added": outcome.added,
                "updated": outcome.updated,
                "deleted": outcome.deleted,
            });
            format!("{}\n", serde_json::to_string_pretty(&changes)?)
        }
    };

    match &out {
        Some(path) => write_atomic(path, &rendered)?,
        None => print!("{rendered}"),
    }

    eprintln!();
    eprintln!("  Added:   {}", names(&outcome.added));
    eprintln!("  Updated: {}", names(&outcome.updated));
    eprintln!("  Deleted: {}", names(&outcome.deleted));
    if let Some(path) = &out {
        eprintln!("  Output:  {}", path.display());
    }
    eprintln!();

    Ok(())
}

fn names(entries: &[SpecEntry]) -> String {
    if entries.is_empty() {
        return "-".to_string();
    }
    entries
        .iter()
        .map(|e| e.shortname.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn cmd_resolve(locator: &str, fork_of: Option<&str>) -> Result<()> {
    let id = specindex_naming::resolve(locator, fork_of)?;
    println!("shortname: {}", id.shortname);
    println!("series:    {}", id.series_shortname);
    println!("version:   {}", id.series_version.as_deref().unwrap_or("-"));
    Ok(())
}

fn cmd_steps() -> Result<()> {
    for step in &STEPS {
        println!("{:>2}  {:<11} {}", step.position, step.name, step.description);
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using one indicatif bar per step.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn stage_started(&self, step: &BuildStep, items: usize) {
        self.bar.reset();
        self.bar.set_length(items as u64);
        self.bar.set_message(format!("{} ({})", step.name, step.description));
    }

    fn item_done(&self, _stage: &str, item: &str) {
        self.bar.inc(1);
        self.bar.set_message(item.to_string());
    }

    fn stage_finished(&self, step: &BuildStep, items: usize) {
        self.bar
            .println(format!("  ✓ {:<11} {items} entries", step.name));
    }

    fn done(&self, _outcome: &BuildOutcome) {
        self.bar.finish_and_clear();
    }
}
