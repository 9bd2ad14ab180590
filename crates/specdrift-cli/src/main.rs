mod config;
mod output;

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use specdrift_core::{
    normalize, parse_with, semantic_hash, validate, validate_batch, validate_comparison,
    BatchInput, ComparisonError, ParseError, SurfaceKind,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;

/// specdrift: behavioral contract validation and drift detection
///
/// Exit codes: 0 success, 1 invalid contract or drift, 2 unreadable input.
#[derive(Parser)]
#[command(name = "specdrift", version, about, long_about = None)]
struct Cli {
    /// Print nothing; report through the exit code only
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file (default: ./specdrift.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one contract
    Validate {
        file: PathBuf,
        /// Parse as this notation instead of detecting it
        #[arg(long, value_name = "key-value|inline")]
        surface: Option<SurfaceKind>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Detect drift between a baseline contract and a candidate
    Compare {
        baseline: PathBuf,
        candidate: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-serialize a contract in canonical form
    Normalize {
        file: PathBuf,
        /// Target notation (default: key-value)
        #[arg(long, value_name = "key-value|inline")]
        to: Option<SurfaceKind>,
    },

    /// Compute semantic hash (SHA-256) of a contract
    Hash { file: PathBuf },

    /// Validate many contracts in parallel
    Batch {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

/// Anything that stops a command from producing a report
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{error}")]
    Parse { path: PathBuf, error: ParseError },

    #[error("{0}")]
    Comparison(#[from] ComparisonError),

    #[error("cannot encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// `--> path:line:column` pointer for errors that have a location
    fn pointer(&self) -> Option<String> {
        match self {
            CliError::Parse { path, error } => Some(format!(
                "{}:{}:{}",
                path.display(),
                error.span.line,
                error.span.column
            )),
            _ => None,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("error: {err}");
            if let Some(pointer) = err.pointer() {
                eprintln!("  --> {pointer}");
            }
            2
        }
    };

    process::exit(exit_code);
}

fn run(cli: &Cli) -> Result<i32, CliError> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Validate {
            ref file,
            surface,
            json,
        } => {
            let text = read(file)?;
            let report = validate(&text, &config.options(surface)).map_err(|error| {
                CliError::Parse {
                    path: file.clone(),
                    error,
                }
            })?;
            emit(cli, || {
                if config.json(json) {
                    output::json(&report)
                } else {
                    Ok(output::report(&file.display().to_string(), &report))
                }
            })?;
            Ok(if report.overall_status.is_valid() { 0 } else { 1 })
        }
        Commands::Compare {
            ref baseline,
            ref candidate,
            json,
        } => {
            let before = read(baseline)?;
            let after = read(candidate)?;
            let report = validate_comparison(&before, &after, &config.options(None))?;
            let drifted = report
                .comparison
                .as_ref()
                .is_some_and(|c| c.has_failures());
            emit(cli, || {
                if config.json(json) {
                    output::json(&report)
                } else {
                    Ok(report
                        .comparison
                        .as_ref()
                        .map(output::comparison)
                        .unwrap_or_default())
                }
            })?;
            Ok(if drifted { 1 } else { 0 })
        }
        Commands::Normalize { ref file, to } => {
            let text = read(file)?;
            let target = to.or(config.surface).unwrap_or(SurfaceKind::KeyValue);
            let normalized = normalize(&text, target).map_err(|error| CliError::Parse {
                path: file.clone(),
                error,
            })?;
            emit(cli, || Ok(normalized))?;
            Ok(0)
        }
        Commands::Hash { ref file } => {
            let text = read(file)?;
            let parsed = parse_with(&text, config.surface).map_err(|error| CliError::Parse {
                path: file.clone(),
                error,
            })?;
            let digest = semantic_hash(&parsed.model);
            emit(cli, || Ok(format!("{digest}\n")))?;
            Ok(0)
        }
        Commands::Batch { ref files, json } => {
            let inputs = files
                .iter()
                .map(|file| Ok(BatchInput::new(file.display().to_string(), read(file)?)))
                .collect::<Result<Vec<_>, CliError>>()?;
            let entries = validate_batch(&inputs, &config.options(None));
            emit(cli, || {
                if config.json(json) {
                    output::json(&entries)
                } else {
                    Ok(output::batch(&entries))
                }
            })?;
            Ok(if entries.iter().any(|e| e.is_invalid()) { 1 } else { 0 })
        }
        Commands::Version => {
            emit(cli, || {
                Ok(format!(
                    "specdrift {} (specdrift-core {})\n",
                    env!("CARGO_PKG_VERSION"),
                    specdrift_core::VERSION
                ))
            })?;
            Ok(0)
        }
    }
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Print the rendered output unless `--quiet`
fn emit(cli: &Cli, render: impl FnOnce() -> Result<String, CliError>) -> Result<(), CliError> {
    if cli.quiet {
        return Ok(());
    }
    let text = render()?;
    if text.ends_with('\n') {
        print!("{text}");
    } else {
        println!("{text}");
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("SPECDRIFT_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if env_bool("SPECDRIFT_LOG_JSON", false) {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .init();
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes" | "on"))
        .unwrap_or(default)
}
