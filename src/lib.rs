pub mod config;
pub mod error;
pub mod synth;

pub use config::{CatalogEntry, Constraints, GenerationParameters, Policy, TargetAmount, TargetSpec};
pub use error::{CliError, ErrorKind, Result, SynthError};
pub use synth::{Generation, GeneratedLine, Response, RunSummary, StockLedger, Synthesizer};
