use serde::{Deserialize, Serialize};

use super::catalog::CatalogEntry;

/// Business constraints of one generation request.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Constraints {
    pub max_lines: usize,
    /// Lower bound of the tax-inclusive unit price band
    #[serde(default)]
    pub min_unit_price: Option<f64>,
    /// Upper bound of the tax-inclusive unit price band
    #[serde(default)]
    pub max_unit_price: Option<f64>,
    pub allowed_rates: Vec<f64>,
    #[serde(default)]
    pub foreign_client: bool,
}

/// The one amount a target is expressed in; the other is derived.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TargetAmount {
    /// Tax-exclusive
    Net(f64),
    /// Tax-inclusive
    Gross(f64),
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct TargetSpec {
    pub tax_rate: f64,
    pub amount: TargetAmount,
}

impl TargetSpec {
    pub fn net(tax_rate: f64, amount: f64) -> Self {
        Self {
            tax_rate,
            amount: TargetAmount::Net(amount),
        }
    }

    pub fn gross(tax_rate: f64, amount: f64) -> Self {
        Self {
            tax_rate,
            amount: TargetAmount::Gross(amount),
        }
    }
}

/// Everything a synthesis run consumes. The engine never mutates it.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GenerationParameters {
    pub constraints: Constraints,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}
