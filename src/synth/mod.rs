mod allocator;
mod filter;
mod ledger;
mod line;
mod selector;
mod summary;
mod target;

pub use allocator::{
    allocate_target, decide, AllocState, Allocation, AllocationContext, Exhaustion, Progress,
};
pub use filter::{filter_catalog, RateKey, RatePools};
pub use ledger::{Capacity, StockLedger};
pub use line::{round_money, GeneratedLine};
pub use selector::{best_fit, line_amount, select_line, Fit, Pick};
pub use summary::{summarize, RunSummary, TargetComparison, TargetOutcome};
pub use target::{normalize_target, normalize_targets, ResolvedTarget};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};

use crate::config::{GenerationParameters, Policy};
use crate::error::{ErrorKind, SynthError};

/// Result of a successful run. The ledger shows what the run reserved; it
/// was never applied to any stored stock level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generation {
    pub lines: Vec<GeneratedLine>,
    pub summary: RunSummary,
    pub ledger: StockLedger,
}

/// Wire shape of a run: `{ success, lines, summary }` or `{ success, error, message }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Success {
        success: bool,
        lines: Vec<GeneratedLine>,
        summary: RunSummary,
    },
    Failure {
        success: bool,
        error: ErrorKind,
        message: String,
    },
}

impl Response {
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }
}

impl From<Generation> for Response {
    fn from(generation: Generation) -> Self {
        Response::Success {
            success: true,
            lines: generation.lines,
            summary: generation.summary,
        }
    }
}

impl From<SynthError> for Response {
    fn from(err: SynthError) -> Self {
        Response::Failure {
            success: false,
            error: err.kind(),
            message: err.to_string(),
        }
    }
}

/// The line synthesis engine. The random source is supplied at
/// construction; seed it to make runs reproducible.
pub struct Synthesizer<R> {
    policy: Policy,
    rng: R,
}

impl Synthesizer<StdRng> {
    pub fn seeded(policy: Policy, seed: u64) -> Self {
        Self::new(policy, StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy(policy: Policy) -> Self {
        Self::new(policy, StdRng::from_entropy())
    }
}

impl<R: Rng> Synthesizer<R> {
    pub fn new(policy: Policy, rng: R) -> Self {
        Self { policy, rng }
    }

    /// Synthesize lines approximating every target of `params`.
    ///
    /// Fails fast: the first target that cannot be served aborts the run and
    /// nothing generated for earlier targets is returned.
    pub fn generate(&mut self, params: &GenerationParameters) -> Result<Generation, SynthError> {
        self.policy.validate().map_err(SynthError::Generation)?;

        let constraints = &params.constraints;
        let pools = filter_catalog(&params.catalog, constraints)?;
        let targets = normalize_targets(&params.targets, constraints.foreign_client)?;

        let mut ledger = StockLedger::new();
        let mut lines: Vec<GeneratedLine> = Vec::new();
        let mut outcomes: Vec<(ResolvedTarget, TargetOutcome)> = Vec::with_capacity(targets.len());

        for target in targets {
            if target.is_skipped() {
                tracing::debug!(rate = target.tax_rate, "target resolves to zero, skipped");
                outcomes.push((target, TargetOutcome::Skipped));
                continue;
            }

            let ctx = AllocationContext {
                candidates: pools.candidates(target.tax_rate),
                lines_left: constraints.max_lines.saturating_sub(lines.len()),
                foreign_client: constraints.foreign_client,
                policy: &self.policy,
            };
            let (allocation, next) = allocate_target(&mut self.rng, &target, &ctx, ledger)?;
            ledger = next;

            let outcome = match allocation.state {
                AllocState::Exhausted(Exhaustion::LineBudget) => TargetOutcome::LineBudget,
                AllocState::Exhausted(Exhaustion::Candidates) => TargetOutcome::Exhausted,
                _ => TargetOutcome::Satisfied,
            };
            outcomes.push((target, outcome));
            lines.extend(allocation.lines);
        }

        if lines.is_empty() {
            return Err(SynthError::NoLinesGenerated);
        }

        let summary = summarize(&lines, &outcomes);
        tracing::info!(
            lines = summary.line_count,
            subtotal_net = summary.subtotal_net,
            total_gross = summary.total_gross,
            "generation complete"
        );

        Ok(Generation {
            lines,
            summary,
            ledger,
        })
    }

    /// Run [`generate`](Self::generate) as a request handler: every failure,
    /// including a panic inside the run, becomes a failure response.
    pub fn respond(&mut self, params: &GenerationParameters) -> Response {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.generate(params)));
        match outcome {
            Ok(Ok(generation)) => generation.into(),
            Ok(Err(err)) => {
                tracing::warn!(kind = %err.kind(), "generation failed: {err}");
                err.into()
            }
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!("generation panicked: {reason}");
                SynthError::Generation(reason).into()
            }
        }
    }
}
