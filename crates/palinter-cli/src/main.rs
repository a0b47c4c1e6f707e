//! palinter CLI tool.
//!
//! Usage:
//! ```bash
//! palinter check [OPTIONS] [ROOT]
//! palinter list-rules
//! palinter test-config <DIR>
//! palinter init
//! ```
//!
//! Exit codes: 0 clean, 1 failing violations, 2 invalid config, 3 any other
//! failure.

use clap::{Parser, Subcommand};
use palinter_core::{ConfigError, Severity};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Linter for project folder structure, naming and file contents
#[derive(Parser)]
#[command(name = "palinter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "PALINTER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a project against the configured rules
    Check {
        /// Project root (default: current directory)
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Lowest severity that makes the run fail
        #[arg(long, default_value = "error")]
        fail_on: FailOn,

        /// Number of worker threads (default: one per CPU)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Extra exclude patterns (can be specified multiple times)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Do not honour .gitignore files
        #[arg(long)]
        no_gitignore: bool,
    },

    /// List the resolved rules of each folder scope
    ListRules {
        /// Project root used to find the config (default: current directory)
        #[arg(default_value = ".")]
        root: PathBuf,
    },

    /// Run config self-test cases from a directory of YAML files
    TestConfig {
        /// Directory holding the case files
        dir: PathBuf,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for lint results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-violation compact format.
    Compact,
}

/// Failure threshold.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum FailOn {
    /// Only errors fail the run.
    #[default]
    Error,
    /// Errors and warnings fail the run.
    Warning,
}

impl From<FailOn> for Severity {
    fn from(value: FailOn) -> Self {
        match value {
            FailOn::Error => Self::Error,
            FailOn::Warning => Self::Warning,
        }
    }
}

/// Process exit codes.
pub mod exit {
    /// No failing violations.
    pub const CLEAN: u8 = 0;
    /// At least one failing violation.
    pub const VIOLATIONS: u8 = 1;
    /// The config could not be loaded.
    pub const CONFIG: u8 = 2;
    /// Any other failure.
    pub const FAILURE: u8 = 3;
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let outcome = match cli.command {
        Commands::Check {
            root,
            format,
            fail_on,
            jobs,
            exclude,
            no_gitignore,
        } => commands::check::run(&commands::check::CheckArgs {
            root: &root,
            config,
            format,
            fail_on: fail_on.into(),
            jobs,
            exclude,
            respect_gitignore: !no_gitignore,
        }),
        Commands::ListRules { root } => commands::list_rules::run(&root, config),
        Commands::TestConfig { dir } => commands::test_config::run(&dir, config),
        Commands::Init { force } => commands::init::run(force),
    };

    match outcome {
        Ok(true) => ExitCode::from(exit::CLEAN),
        Ok(false) => ExitCode::from(exit::VIOLATIONS),
        Err(err) => match err.downcast::<ConfigError>() {
            Ok(config_error) => {
                eprintln!("{:?}", miette::Report::new(config_error));
                ExitCode::from(exit::CONFIG)
            }
            Err(err) => {
                eprintln!("\x1b[31merror\x1b[0m: {err:#}");
                ExitCode::from(exit::FAILURE)
            }
        },
    }
}
