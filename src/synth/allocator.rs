//! Per-rate allocation loop.
//!
//! Each target runs through a small state machine. [`decide`] is the only
//! place that chooses between continuing and stopping, and it looks at
//! nothing but plain numbers, so termination can be tested on its own.

use rand::Rng;
use std::collections::HashSet;

use super::ledger::StockLedger;
use super::line::{round_money, GeneratedLine};
use super::selector::{select_line, Pick};
use super::target::ResolvedTarget;
use crate::config::{CatalogEntry, Policy, Tolerances};
use crate::error::SynthError;

/// Why a target stopped short of being met without failing the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    /// No candidate left, or attempts used up, with the shortfall inside the threshold
    Candidates,
    /// The global line budget ran out
    LineBudget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocState {
    Allocating,
    Satisfied,
    Exhausted(Exhaustion),
    /// Candidates ran out with too much of the target outstanding
    Blocked,
}

impl AllocState {
    pub fn is_terminal(self) -> bool {
        self != AllocState::Allocating
    }
}

/// Inputs of one termination decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub remaining: f64,
    pub target: f64,
    pub pool_size: usize,
    pub lines_left: usize,
    pub attempts_left: usize,
}

/// Next state of a target's allocation.
pub fn decide(progress: &Progress, tolerances: &Tolerances) -> AllocState {
    if progress.remaining <= tolerances.epsilon {
        return AllocState::Satisfied;
    }
    if progress.lines_left == 0 {
        return AllocState::Exhausted(Exhaustion::LineBudget);
    }
    if progress.pool_size == 0 || progress.attempts_left == 0 {
        if progress.remaining > progress.target * tolerances.shortfall_threshold {
            return AllocState::Blocked;
        }
        return AllocState::Exhausted(Exhaustion::Candidates);
    }
    AllocState::Allocating
}

/// Lines produced for one target and where its state machine ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub lines: Vec<GeneratedLine>,
    pub state: AllocState,
    pub remaining: f64,
}

/// Everything one target's allocation reads but does not own.
pub struct AllocationContext<'p, 'a> {
    pub candidates: &'p [&'a CatalogEntry],
    pub lines_left: usize,
    pub foreign_client: bool,
    pub policy: &'p Policy,
}

/// Allocate lines for one target. The ledger is moved in and handed back
/// with this target's reservations added.
pub fn allocate_target<R: Rng>(
    rng: &mut R,
    target: &ResolvedTarget,
    ctx: &AllocationContext<'_, '_>,
    mut ledger: StockLedger,
) -> Result<(Allocation, StockLedger), SynthError> {
    if ctx.candidates.is_empty() {
        return Err(SynthError::NoProductsForRate {
            rate: target.tax_rate,
        });
    }

    let tolerances = &ctx.policy.tolerances;
    let mut remaining = target.net;
    let mut lines: Vec<GeneratedLine> = Vec::new();
    let mut attempts = 0usize;
    // Products that cannot fit this target, whatever is drawn later
    let mut rejected: HashSet<&str> = HashSet::new();

    let state = loop {
        let pool: Vec<&CatalogEntry> = ctx
            .candidates
            .iter()
            .copied()
            .filter(|entry| {
                !rejected.contains(entry.id.as_str())
                    && entry.unit_price_net <= remaining * tolerances.pool_overshoot
                    && ledger.has_capacity(entry)
            })
            .collect();

        let progress = Progress {
            remaining,
            target: target.net,
            pool_size: pool.len(),
            lines_left: ctx.lines_left.saturating_sub(lines.len()),
            attempts_left: ctx.policy.search.max_attempts.saturating_sub(attempts),
        };

        let state = decide(&progress, tolerances);
        if state.is_terminal() {
            break state;
        }

        attempts += 1;
        match select_line(rng, remaining, &pool, &ledger, ctx.foreign_client, ctx.policy) {
            Some(Pick::Line(line)) => {
                tracing::debug!(
                    product = %line.product_id,
                    quantity = line.quantity,
                    discount = line.discount,
                    line_net = line.line_net,
                    "line accepted"
                );
                ledger = ledger.reserve(&line.product_id, line.quantity);
                remaining = round_money(remaining - line.line_net);
                lines.push(line);
            }
            Some(Pick::NoFit(entry)) => {
                tracing::trace!(product = %entry.id, remaining, "candidate cannot fit");
                rejected.insert(entry.id.as_str());
            }
            None => {}
        }
    };

    match state {
        AllocState::Blocked => {
            return Err(SynthError::InsufficientStock {
                rate: target.tax_rate,
                outstanding: remaining,
                target: target.net,
            });
        }
        AllocState::Exhausted(reason) => {
            tracing::warn!(
                rate = target.tax_rate,
                outstanding = remaining,
                ?reason,
                "target accepted with shortfall"
            );
        }
        _ => {}
    }

    Ok((
        Allocation {
            lines,
            state,
            remaining,
        },
        ledger,
    ))
}
