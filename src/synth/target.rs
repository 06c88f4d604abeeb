use serde::Serialize;

use super::line::round_money;
use crate::config::{TargetAmount, TargetSpec};
use crate::error::SynthError;

/// A target with both amounts resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedTarget {
    pub tax_rate: f64,
    pub net: f64,
    pub gross: f64,
}

impl ResolvedTarget {
    /// Non-positive targets produce no lines.
    pub fn is_skipped(&self) -> bool {
        self.net <= 0.0
    }
}

/// Derive the missing amount of a target. A foreign client pays no tax, so
/// net and gross coincide whatever the nominal rate.
pub fn normalize_target(spec: &TargetSpec, foreign_client: bool) -> Result<ResolvedTarget, SynthError> {
    let effective_rate = if foreign_client { 0.0 } else { spec.tax_rate };
    let factor = 1.0 + effective_rate / 100.0;

    if !factor.is_finite() || factor <= 0.0 {
        return Err(SynthError::Generation(format!(
            "tax rate {}% cannot be applied",
            spec.tax_rate
        )));
    }

    let (net, gross) = match spec.amount {
        TargetAmount::Net(net) => (net, net * factor),
        TargetAmount::Gross(gross) => (gross / factor, gross),
    };

    if !net.is_finite() || !gross.is_finite() {
        return Err(SynthError::Generation(format!(
            "target for tax rate {}% is not a finite amount",
            spec.tax_rate
        )));
    }

    Ok(ResolvedTarget {
        tax_rate: spec.tax_rate,
        net: round_money(net),
        gross: round_money(gross),
    })
}

pub fn normalize_targets(
    specs: &[TargetSpec],
    foreign_client: bool,
) -> Result<Vec<ResolvedTarget>, SynthError> {
    specs
        .iter()
        .map(|spec| normalize_target(spec, foreign_client))
        .collect()
}
