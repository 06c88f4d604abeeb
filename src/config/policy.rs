use serde::{Deserialize, Serialize};

/// Business policy values steering the search.
///
/// The defaults are the values the invoicing back office runs with; a
/// `policy.toml` in the config directory overrides any subset of them.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Policy {
    pub tolerances: Tolerances,
    pub search: SearchLimits,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Tolerances {
    /// Multiplier on the remaining amount a candidate's unit price may reach
    /// and still enter the pool
    pub pool_overshoot: f64,
    /// Multiplier on the remaining amount a line may reach
    pub selection_overshoot: f64,
    /// Fraction of a target that may stay unallocated once candidates run out
    pub shortfall_threshold: f64,
    /// Remaining amount at or below which a target counts as met
    pub epsilon: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SearchLimits {
    /// Discount granularity in percentage points
    pub discount_step: f64,
    /// Selector invocations allowed per target
    pub max_attempts: usize,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            pool_overshoot: 1.10,
            selection_overshoot: 1.05,
            shortfall_threshold: 0.20,
            epsilon: 0.01,
        }
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            discount_step: 0.5,
            max_attempts: 500,
        }
    }
}

impl Policy {
    /// Reject values that would make the search loop forever or accept nonsense.
    pub fn validate(&self) -> Result<(), String> {
        let t = &self.tolerances;
        if !(t.pool_overshoot.is_finite() && t.pool_overshoot >= 1.0) {
            return Err(format!("pool_overshoot must be >= 1.0, got {}", t.pool_overshoot));
        }
        if !(t.selection_overshoot.is_finite() && t.selection_overshoot >= 1.0) {
            return Err(format!(
                "selection_overshoot must be >= 1.0, got {}",
                t.selection_overshoot
            ));
        }
        if !(0.0..=1.0).contains(&t.shortfall_threshold) {
            return Err(format!(
                "shortfall_threshold must be within 0..=1, got {}",
                t.shortfall_threshold
            ));
        }
        if !(t.epsilon.is_finite() && t.epsilon >= 0.0) {
            return Err(format!("epsilon must be >= 0, got {}", t.epsilon));
        }
        let s = &self.search;
        if !(s.discount_step.is_finite() && s.discount_step > 0.0) {
            return Err(format!("discount_step must be > 0, got {}", s.discount_step));
        }
        if s.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        Ok(())
    }
}
