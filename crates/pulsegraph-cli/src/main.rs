use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use pulsegraph_core::{
    ConfigManager, InjectionMode, InjectionOptions, Instrumenter, LoggingConfig, NodeStatus,
    PulseGraphConfig, CONFIG_FILE_NAME,
};
use pulsegraph_graph::{parse_trace_file, FlowReconciler, ReconciledGraph};
use pulsegraph_parser::TreeSitterParser;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_REPORT: &str = "pulsegraph-report.json";

#[derive(Parser)]
#[command(name = "pulsegraph")]
#[command(about = "PulseGraph - static call graphs checked against runtime traces", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./.pulsegraph.toml, then ~/.pulsegraph/config.toml)
    #[arg(short, long, global = true, env = "PULSEGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Extract the static code graph of a source tree
    Extract {
        /// Source directory
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Add tracing to one source file or a whole tree
    Inject {
        /// File or directory to instrument
        target: PathBuf,

        /// Rewrite in place or write copies elsewhere
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Root of the mirrored tree in sidecar mode
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Print the instrumented file instead of writing it
        #[arg(long)]
        stdout: bool,

        /// Type name used in span names instead of the enclosing class
        #[arg(long)]
        class_name: Option<String>,
    },

    /// Merge the static graph with recorded traces
    Reconcile {
        /// Source directory
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Trace file (JSON Lines or OTLP JSON)
        #[arg(short, long)]
        traces: Option<PathBuf>,

        /// Report file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Intrusive,
    Sidecar,
}

impl From<ModeArg> for InjectionMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Intrusive => InjectionMode::Intrusive,
            ModeArg::Sidecar => InjectionMode::Sidecar,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { force } = cli.command {
        let path = cli
            .config
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        return init_config(&path, force);
    }

    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ConfigManager::load().context("Failed to load configuration")?,
    };
    let config = manager.config();

    init_logging(&config.logging, cli.verbose);
    if let Some(path) = manager.config_path() {
        debug!("Using config file {}", path.display());
    }

    let parser = TreeSitterParser::from_config(config);

    match cli.command {
        Commands::Init { .. } => unreachable!("handled before configuration is loaded"),

        Commands::Extract { source, output } => {
            let source = resolve_source(source, config);
            let graph = parser
                .parse_project(&source, &config.walker.skip_dirs)
                .with_context(|| format!("Failed to extract {}", source.display()))?;
            write_json(&graph, output.or_else(|| config.defaults.output.clone()).as_deref())?;
            eprintln!(
                "{} {} nodes, {} edges",
                "Extracted".green().bold(),
                graph.nodes.len(),
                graph.edges.len()
            );
        }

        Commands::Inject {
            target,
            mode,
            out_dir,
            stdout,
            class_name,
        } => {
            let options = InjectionOptions {
                mode: mode.map(Into::into).unwrap_or(config.instrumentation.mode),
                class_name_override: class_name,
            };
            if stdout {
                inject_to_stdout(&parser, &target, &options)?;
            } else {
                inject_tree(&parser, &target, &options, out_dir.as_deref(), config)?;
            }
        }

        Commands::Reconcile {
            source,
            traces,
            output,
        } => {
            let source = resolve_source(source, config);
            let Some(traces) = traces.or_else(|| config.defaults.traces.clone()) else {
                bail!("No trace file given; pass --traces or set defaults.traces in the config");
            };
            let output = output
                .or_else(|| config.defaults.output.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT));

            let graph = parser
                .parse_project(&source, &config.walker.skip_dirs)
                .with_context(|| format!("Failed to extract {}", source.display()))?;
            let spans = parse_trace_file(&traces)
                .with_context(|| format!("Failed to read traces from {}", traces.display()))?;

            let reconciled = FlowReconciler::new().reconcile(&graph, &spans);
            write_json(&reconciled, Some(&output))?;
            print_summary(&reconciled, &output);
        }
    }

    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    ConfigManager::create_default_config(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{} {}", "Created".green().bold(), path.display());
    Ok(())
}

/// `RUST_LOG` wins over the configured level; `--verbose` wins over both.
fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let registry = tracing_subscriber::registry().with(filter);
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => registry.with(layer.json()).init(),
        "compact" => registry.with(layer.compact()).init(),
        _ => registry.with(layer.pretty()).init(),
    }
}

fn resolve_source(source: Option<PathBuf>, config: &PulseGraphConfig) -> PathBuf {
    source
        .or_else(|| config.defaults.source.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    match output {
        Some(path) => {
            create_parent(path)?;
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

fn inject_to_stdout(
    parser: &TreeSitterParser,
    target: &Path,
    options: &InjectionOptions,
) -> Result<()> {
    if !target.is_file() {
        bail!("--stdout needs a single file, got {}", target.display());
    }
    let content = fs::read_to_string(target)
        .with_context(|| format!("Failed to read {}", target.display()))?;
    print!("{}", parser.inject(&content, &target.to_string_lossy(), options));
    Ok(())
}

fn inject_tree(
    parser: &TreeSitterParser,
    target: &Path,
    options: &InjectionOptions,
    out_dir: Option<&Path>,
    config: &PulseGraphConfig,
) -> Result<()> {
    let files = parser
        .instrument_project(target, &config.walker.skip_dirs, options, out_dir)
        .with_context(|| format!("Failed to instrument {}", target.display()))?;

    let mut written = 0usize;
    let mut changed = 0usize;
    for file in &files {
        if file.changed {
            changed += 1;
        }
        // In place, an unchanged file needs no write.
        if options.mode == InjectionMode::Intrusive && !file.changed {
            continue;
        }
        create_parent(&file.destination)?;
        fs::write(&file.destination, &file.content)
            .with_context(|| format!("Failed to write {}", file.destination.display()))?;
        debug!("{} -> {}", file.source.display(), file.destination.display());
        written += 1;
    }

    println!(
        "{} {} of {} files ({} mode), {} written",
        "Instrumented".green().bold(),
        changed,
        files.len(),
        options.mode,
        written
    );
    if let (InjectionMode::Sidecar, Some(dir)) = (options.mode, out_dir) {
        println!("  {} {}", "Output:".bold(), dir.display());
    }
    Ok(())
}

fn print_summary(graph: &ReconciledGraph, output: &Path) {
    let summary = &graph.summary;
    println!("{}", "Reconciliation summary".bold());
    println!("  {:<12} {}", "Nodes:", summary.total_nodes);
    println!("  {:<12} {}", "Verified:", summary.verified.to_string().green());
    println!("  {:<12} {}", "Zombies:", summary.zombies.to_string().yellow());
    println!("  {:<12} {}", "Discovered:", summary.discovered.to_string().cyan());

    let errors: Vec<&str> = graph
        .nodes
        .iter()
        .filter(|n| n.status == NodeStatus::Error)
        .map(|n| n.id())
        .collect();
    if !errors.is_empty() {
        println!("  {:<12} {}", "Errors:", errors.join(", ").red());
    }

    for node in graph.nodes.iter().filter(|n| n.status == NodeStatus::PotentiallyDead) {
        debug!("Zombie: {}", node.id());
    }
    println!("  {:<12} {}", "Report:", output.display());
}
