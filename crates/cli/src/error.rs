//! The CLI's single error type, wrapping every fallible boundary `main`
//! needs to turn into a diagnostic and an exit code.

use std::path::PathBuf;

use memhier_core::SimError;

/// Everything that can go wrong running a subcommand, from opening the
/// config file to a validation failure inside `memhier-core`.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The config file named on the command line could not be opened.
    #[error("failed to open config file {path}: {source}")]
    OpenConfig {
        /// The path given on the command line.
        path: PathBuf,
        /// The underlying I/O failure.
        source: std::io::Error,
    },

    /// Config parsing or validation failed.
    #[error(transparent)]
    Sim(#[from] SimError),

    /// Reading the trace from stdin failed.
    #[error("failed to read trace: {0}")]
    Trace(#[from] std::io::Error),
}
