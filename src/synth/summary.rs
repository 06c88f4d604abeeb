use serde::Serialize;

use super::filter::RateKey;
use super::line::{round_money, GeneratedLine};
use super::target::ResolvedTarget;

/// How a target's allocation ended in a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetOutcome {
    Satisfied,
    /// Candidates ran out with the shortfall inside the threshold
    Exhausted,
    /// Stopped because the run hit its line limit
    LineBudget,
    /// Target resolved to zero or less
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetComparison {
    pub tax_rate: f64,
    pub target_net: f64,
    pub actual_net: f64,
    /// actual - target
    pub delta: f64,
    pub deviation_pct: f64,
    pub outcome: TargetOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub subtotal_net: f64,
    pub tax_total: f64,
    pub total_gross: f64,
    pub line_count: usize,
    pub targets: Vec<TargetComparison>,
}

/// Sum the lines and compare each target with what its rate received.
pub fn summarize(lines: &[GeneratedLine], targets: &[(ResolvedTarget, TargetOutcome)]) -> RunSummary {
    let subtotal_net = round_money(lines.iter().map(|l| l.line_net).sum());
    let tax_total = round_money(lines.iter().map(|l| l.line_tax).sum());
    let total_gross = round_money(lines.iter().map(|l| l.line_gross).sum());

    let targets = targets
        .iter()
        .map(|(target, outcome)| {
            let key = RateKey::from_rate(target.tax_rate);
            let actual_net = round_money(
                lines
                    .iter()
                    .filter(|l| RateKey::from_rate(l.tax_rate) == key)
                    .map(|l| l.line_net)
                    .sum(),
            );
            let delta = round_money(actual_net - target.net);
            let deviation_pct = if target.net != 0.0 {
                round_money(delta / target.net * 100.0)
            } else {
                0.0
            };

            TargetComparison {
                tax_rate: target.tax_rate,
                target_net: target.net,
                actual_net,
                delta,
                deviation_pct,
                outcome: *outcome,
            }
        })
        .collect();

    RunSummary {
        subtotal_net,
        tax_total,
        total_gross,
        line_count: lines.len(),
        targets,
    }
}
