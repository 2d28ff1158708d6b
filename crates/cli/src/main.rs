//! `memhier-sim`: the trace-driven memory-hierarchy and Tomasulo pipeline
//! timing simulator CLI.
//!
//! Two subcommands, each reading a fixed-format config file named on the
//! command line and a trace from stdin: `hierarchy` drives the coupled
//! TLB/page-table/cache simulator, `pipeline` drives the reorder-buffer
//! scheduler.

mod error;
mod hierarchy_report;
mod pipeline_report;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use memhier_core::config::{HierarchyConfig, PipelineConfig};
use memhier_core::SimError;

use error::CliError;

#[derive(Parser, Debug)]
#[command(
    name = "memhier-sim",
    author,
    version,
    about = "Trace-driven memory-hierarchy and Tomasulo pipeline timing simulator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the TLB/page-table/cache hierarchy simulator over a trace read
    /// from stdin.
    Hierarchy {
        /// Path to the hierarchy config file.
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run the Tomasulo/reorder-buffer pipeline timing scheduler over a
    /// trace read from stdin.
    Pipeline {
        /// Path to the pipeline config file.
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_owned()),
        ))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Hierarchy { config } => run_hierarchy(&config),
        Commands::Pipeline { config } => run_pipeline(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn open_config(path: &Path) -> Result<File, CliError> {
    File::open(path).map_err(|source| CliError::OpenConfig { path: path.to_path_buf(), source })
}

fn run_hierarchy(path: &Path) -> Result<(), CliError> {
    let file = open_config(path)?;
    let config = HierarchyConfig::parse(file).map_err(SimError::from)?;
    hierarchy_report::run(config, std::io::stdin())
}

fn run_pipeline(path: &Path) -> Result<(), CliError> {
    let file = open_config(path)?;
    let config = PipelineConfig::parse(file).map_err(SimError::from)?;
    pipeline_report::run(config, std::io::stdin())
}
