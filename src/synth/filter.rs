use std::collections::BTreeMap;

use crate::config::{CatalogEntry, Constraints};
use crate::error::SynthError;

/// Tax rate in hundredths of a percent, so that float rates group exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RateKey(i64);

impl RateKey {
    pub fn from_rate(rate: f64) -> Self {
        Self((rate * 100.0).round() as i64)
    }

    pub fn rate(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

/// Eligible catalog entries partitioned by tax rate.
#[derive(Debug, Default)]
pub struct RatePools<'a> {
    pools: BTreeMap<RateKey, Vec<&'a CatalogEntry>>,
}

impl<'a> RatePools<'a> {
    /// Candidates for a rate; empty when none qualify.
    pub fn candidates(&self, rate: f64) -> &[&'a CatalogEntry] {
        self.pools
            .get(&RateKey::from_rate(rate))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn product_count(&self) -> usize {
        self.pools.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &[&'a CatalogEntry])> + '_ {
        self.pools
            .iter()
            .map(|(key, entries)| (key.rate(), entries.as_slice()))
    }
}

fn within_band(price: f64, constraints: &Constraints) -> bool {
    let above_min = constraints.min_unit_price.map_or(true, |min| price >= min);
    let below_max = constraints.max_unit_price.map_or(true, |max| price <= max);
    above_min && below_max
}

/// Narrow the catalog to entries with an allowed rate and a gross unit price inside the band.
pub fn filter_catalog<'a>(
    catalog: &'a [CatalogEntry],
    constraints: &Constraints,
) -> Result<RatePools<'a>, SynthError> {
    let allowed: Vec<RateKey> = constraints
        .allowed_rates
        .iter()
        .map(|rate| RateKey::from_rate(*rate))
        .collect();

    let mut pools: BTreeMap<RateKey, Vec<&CatalogEntry>> = BTreeMap::new();

    for entry in catalog {
        let key = RateKey::from_rate(entry.tax_rate);
        if !allowed.contains(&key) || !within_band(entry.unit_price_gross, constraints) {
            continue;
        }

        // The search divides by the net price
        if !entry.unit_price_net.is_finite() || entry.unit_price_net <= 0.0 {
            return Err(SynthError::Generation(format!(
                "product '{}' has invalid net unit price {}",
                entry.id, entry.unit_price_net
            )));
        }

        pools.entry(key).or_default().push(entry);
    }

    if pools.is_empty() {
        return Err(SynthError::NoEligibleProducts);
    }

    tracing::debug!(
        rates = pools.len(),
        products = pools.values().map(Vec::len).sum::<usize>(),
        "catalog filtered"
    );

    Ok(RatePools { pools })
}
