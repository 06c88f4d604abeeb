use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Stable identifier of a failed run. Callers branch on this, never on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoEligibleProducts,
    NoProductsForRate,
    InsufficientStock,
    NoLinesGenerated,
    GenerationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoEligibleProducts => "no_eligible_products",
            ErrorKind::NoProductsForRate => "no_products_for_rate",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::NoLinesGenerated => "no_lines_generated",
            ErrorKind::GenerationError => "generation_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of a synthesis run. No partial result accompanies it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthError {
    #[error("No catalog product matches the allowed tax rates and unit price band")]
    NoEligibleProducts,

    #[error("No eligible products for tax rate {rate}%")]
    NoProductsForRate { rate: f64 },

    #[error("Insufficient stock for tax rate {rate}%: {outstanding:.2} of {target:.2} still outstanding")]
    InsufficientStock {
        rate: f64,
        outstanding: f64,
        target: f64,
    },

    #[error("No lines could be generated for the given targets")]
    NoLinesGenerated,

    #[error("Generation failed: {0}")]
    Generation(String),
}

impl SynthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SynthError::NoEligibleProducts => ErrorKind::NoEligibleProducts,
            SynthError::NoProductsForRate { .. } => ErrorKind::NoProductsForRate,
            SynthError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            SynthError::NoLinesGenerated => ErrorKind::NoLinesGenerated,
            SynthError::Generation(_) => ErrorKind::GenerationError,
        }
    }
}

/// Errors of the command-line front end: file loading plus engine failures.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Config directory not found at {0}. Run 'invoice-synth init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Request file not found: {0}")]
    RequestNotFound(PathBuf),

    #[error("Failed to parse {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Failed to serialize output: {0}")]
    Serialize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{source} [{}]", .source.kind())]
    Synth {
        #[from]
        source: SynthError,
    },

    /// A failure envelope returned by `Synthesizer::respond`.
    #[error("{message} [{kind}]")]
    Failed { kind: ErrorKind, message: String },
}

pub type Result<T> = std::result::Result<T, CliError>;
