use serde::{Deserialize, Serialize};

/// A product as it appears in the catalog snapshot handed to the engine.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub reference: Option<String>,
    /// Unit price excluding tax
    pub unit_price_net: f64,
    /// Unit price including tax
    pub unit_price_gross: f64,
    /// Nominal tax rate in percent (19.0 for 19%)
    pub tax_rate: f64,
    /// Highest discount in percent the product may be sold at
    #[serde(default)]
    pub max_discount: Option<f64>,
    /// Recorded stock, absent for unlimited products
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub unlimited_stock: bool,
    #[serde(default)]
    pub allow_backorder: bool,
}

impl CatalogEntry {
    /// Whether recorded stock bounds how much of this product can be sold.
    pub fn is_stock_limited(&self) -> bool {
        !(self.unlimited_stock || self.allow_backorder)
    }

    pub fn discount_ceiling(&self) -> f64 {
        self.max_discount.unwrap_or(0.0).clamp(0.0, 100.0)
    }
}
