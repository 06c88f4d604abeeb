//! Run-local stock reservations.
//!
//! The ledger only records what the current run has tentatively consumed;
//! the recorded stock of a product is never touched. It is moved into each
//! allocation step and handed back, so no run shares it with another.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::CatalogEntry;

/// How much more of a product the run may still place on lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// Unlimited stock or backorders allowed
    Unbounded,
    Limited(u64),
}

impl Capacity {
    pub fn is_available(self) -> bool {
        match self {
            Capacity::Unbounded => true,
            Capacity::Limited(left) => left > 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StockLedger {
    reserved: BTreeMap<String, u64>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserved(&self, product_id: &str) -> u64 {
        self.reserved.get(product_id).copied().unwrap_or(0)
    }

    /// Remaining capacity. A stock-limited product without a recorded stock has none.
    pub fn capacity(&self, entry: &CatalogEntry) -> Capacity {
        if !entry.is_stock_limited() {
            return Capacity::Unbounded;
        }
        let stock = entry.stock.unwrap_or(0).max(0) as u64;
        Capacity::Limited(stock.saturating_sub(self.reserved(&entry.id)))
    }

    pub fn has_capacity(&self, entry: &CatalogEntry) -> bool {
        self.capacity(entry).is_available()
    }

    #[must_use]
    pub fn reserve(mut self, product_id: &str, quantity: u32) -> Self {
        *self.reserved.entry(product_id.to_string()).or_insert(0) += u64::from(quantity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(stock: Option<i64>, unlimited: bool, backorder: bool) -> CatalogEntry {
        CatalogEntry {
            id: "p1".into(),
            name: "Widget".into(),
            reference: None,
            unit_price_net: 10.0,
            unit_price_gross: 11.9,
            tax_rate: 19.0,
            max_discount: None,
            stock,
            unlimited_stock: unlimited,
            allow_backorder: backorder,
        }
    }

    #[test]
    fn reservations_reduce_capacity() {
        let product = entry(Some(5), false, false);
        let ledger = StockLedger::new().reserve("p1", 2).reserve("p1", 1);

        assert_eq!(ledger.reserved("p1"), 3);
        assert_eq!(ledger.capacity(&product), Capacity::Limited(2));

        let ledger = ledger.reserve("p1", 2);
        assert!(!ledger.has_capacity(&product));
    }

    #[test]
    fn unlimited_and_backorder_are_unbounded() {
        let ledger = StockLedger::new().reserve("p1", 1_000);
        assert_eq!(ledger.capacity(&entry(None, true, false)), Capacity::Unbounded);
        assert_eq!(ledger.capacity(&entry(Some(0), false, true)), Capacity::Unbounded);
    }

    #[test]
    fn missing_or_negative_stock_has_no_capacity() {
        let ledger = StockLedger::new();
        assert_eq!(ledger.capacity(&entry(None, false, false)), Capacity::Limited(0));
        assert_eq!(ledger.capacity(&entry(Some(-3), false, false)), Capacity::Limited(0));
    }

    #[test]
    fn over_reservation_saturates() {
        let ledger = StockLedger::new().reserve("p1", 9);
        assert_eq!(ledger.capacity(&entry(Some(4), false, false)), Capacity::Limited(0));
    }
}
