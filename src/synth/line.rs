use serde::{Deserialize, Serialize};

use crate::config::CatalogEntry;

/// Round a monetary value to cents.
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// An invoice line produced by the engine.
///
/// Stock and discount metadata are echoed from the catalog entry so that
/// downstream consumers can display or re-check them without the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedLine {
    pub product_id: String,
    pub product_name: String,
    pub reference: Option<String>,
    pub quantity: u32,
    pub unit_price_net: f64,
    /// Nominal rate of the product, even when the line is tax exempt
    pub tax_rate: f64,
    /// Discount applied, in percent
    pub discount: f64,
    pub line_net: f64,
    pub line_tax: f64,
    pub line_gross: f64,
    pub stock: Option<i64>,
    pub unlimited_stock: bool,
    pub allow_backorder: bool,
    pub max_discount: Option<f64>,
}

impl GeneratedLine {
    pub(crate) fn build(
        entry: &CatalogEntry,
        quantity: u32,
        discount: f64,
        line_net: f64,
        foreign_client: bool,
    ) -> Self {
        let line_tax = if foreign_client {
            0.0
        } else {
            round_money(line_net * entry.tax_rate / 100.0)
        };

        Self {
            product_id: entry.id.clone(),
            product_name: entry.name.clone(),
            reference: entry.reference.clone(),
            quantity,
            unit_price_net: entry.unit_price_net,
            tax_rate: entry.tax_rate,
            discount,
            line_net,
            line_tax,
            line_gross: round_money(line_net + line_tax),
            stock: entry.stock,
            unlimited_stock: entry.unlimited_stock,
            allow_backorder: entry.allow_backorder,
            max_discount: entry.max_discount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CatalogEntry {
        CatalogEntry {
            id: "p1".into(),
            name: "Widget".into(),
            reference: Some("W-1".into()),
            unit_price_net: 100.0,
            unit_price_gross: 119.0,
            tax_rate: 19.0,
            max_discount: Some(10.0),
            stock: Some(4),
            unlimited_stock: false,
            allow_backorder: false,
        }
    }

    #[test]
    fn rounds_to_cents() {
        assert_eq!(round_money(10.005_1), 10.01);
        assert_eq!(round_money(-3.333), -3.33);
        assert_eq!(round_money(200.0), 200.0);
    }

    #[test]
    fn domestic_line_carries_tax() {
        let line = GeneratedLine::build(&entry(), 2, 0.0, 200.0, false);
        assert_eq!(line.line_tax, 38.0);
        assert_eq!(line.line_gross, 238.0);
        assert_eq!(line.stock, Some(4));
        assert_eq!(line.reference.as_deref(), Some("W-1"));
    }

    #[test]
    fn foreign_line_is_tax_free() {
        let line = GeneratedLine::build(&entry(), 2, 5.0, 190.0, true);
        assert_eq!(line.line_tax, 0.0);
        assert_eq!(line.line_gross, 190.0);
        assert_eq!(line.tax_rate, 19.0);
    }
}
