//! Error types for configuration validation and trace-line parsing.
//!
//! Per the two-tier error model: configuration failures are fatal (the
//! caller should stop the run), while trace-line failures are recoverable —
//! the line is skipped and simulation continues.

use std::fmt;

/// A fatal configuration or validation error.
///
/// Carries enough context (the offending field and value) that a CLI can
/// print a diagnostic naming the field, per the config reader's contract.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required label was never found while scanning the config file.
    #[error("missing configuration label: {0}")]
    MissingLabel(&'static str),

    /// A numeric field failed to parse as a decimal unsigned integer.
    #[error("field `{field}` is not a valid unsigned integer: {value:?}")]
    NotANumber {
        /// The field's label.
        field: &'static str,
        /// The raw text that failed to parse.
        value: String,
    },

    /// A field that must be a power of two was not.
    #[error("field `{field}` = {value} must be a power of two")]
    NotPowerOfTwo {
        /// The field's label.
        field: &'static str,
        /// The offending value.
        value: usize,
    },

    /// A field exceeded its configured upper bound.
    #[error("field `{field}` = {value} exceeds the maximum of {max}")]
    OutOfRange {
        /// The field's label.
        field: &'static str,
        /// The offending value.
        value: usize,
        /// The inclusive maximum allowed.
        max: usize,
    },

    /// `L2 line_size` was configured smaller than `DC line_size`.
    #[error("L2 line_size ({l2}) must be >= DC line_size ({dc})")]
    L2LineSmallerThanL1 {
        /// The configured L2 line size.
        l2: usize,
        /// The configured L1 (DC) line size.
        dc: usize,
    },

    /// An `I/O` failure while reading the config file.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

/// A non-fatal problem with a single trace line.
///
/// The simulator logs this and moves on to the next line; rejected lines are
/// not counted in any statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLineError {
    /// 1-based line number within the trace, for diagnostics.
    pub line_no: usize,
    /// What went wrong.
    pub reason: TraceLineErrorKind,
}

/// The specific reason a trace line was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceLineErrorKind {
    /// The line did not match any recognized trace-line grammar.
    Malformed(String),
    /// The decoded address exceeds the configured address space.
    AddressOutOfRange {
        /// The rejected address.
        address: u64,
        /// The configured (exclusive) upper bound.
        limit: u64,
    },
    /// The opcode/mnemonic is not one this simulator recognizes.
    UnknownOpcode(String),
}

impl fmt::Display for TraceLineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line_no, self.reason)
    }
}

impl fmt::Display for TraceLineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(line) => write!(f, "malformed trace line: {line:?}"),
            Self::AddressOutOfRange { address, limit } => {
                write!(f, "address {address:#x} exceeds configured space ({limit:#x})")
            }
            Self::UnknownOpcode(op) => write!(f, "unknown opcode: {op:?}"),
        }
    }
}

impl std::error::Error for TraceLineError {}

/// Top-level error type surfaced by the CLI.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Configuration validation failed; the run cannot proceed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Every line in the trace was rejected; nothing was simulated.
    #[error("every trace line was rejected; nothing to simulate")]
    TraceEmpty,
}
