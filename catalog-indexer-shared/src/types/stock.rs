//! Stock types.

use serde::{Deserialize, Serialize};

/// Salability as reported to the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    InStock,
    OutOfStock,
}

impl StockStatus {
    pub fn from_salable(is_salable: bool) -> Self {
        if is_salable {
            StockStatus::InStock
        } else {
            StockStatus::OutOfStock
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::InStock => "IN_STOCK",
            StockStatus::OutOfStock => "OUT_OF_STOCK",
        }
    }
}

/// One row of the authoritative stock join for a SKU, as returned by the stock store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub sku: String,
    /// Stock-status salability flag. Authoritative for `stock_status`.
    pub is_salable: bool,
    /// Quantity from the stock-status index.
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub min_qty: f64,
    #[serde(default)]
    pub is_in_stock: bool,
    #[serde(default)]
    pub max_sale_qty: Option<f64>,
    /// Quantity from the stock item.
    #[serde(default)]
    pub stock_qty: Option<f64>,
}

/// Per-SKU stock view attached to products for one indexing pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub sku: String,
    pub salable_qty: f64,
    pub stock_status: StockStatus,
    pub is_in_stock: bool,
    pub max_sale_qty: Option<f64>,
    pub min_sale_qty: f64,
    pub qty: f64,
    pub stock_qty: Option<f64>,
    pub reservation_qty: f64,
}

impl StockSnapshot {
    /// Join a stock record with the summed reservations for its SKU.
    ///
    /// `stock_status` follows the record's salability flag, never the computed
    /// `salable_qty`.
    pub fn from_record(record: &StockRecord, reservation_qty: f64) -> Self {
        Self {
            sku: record.sku.clone(),
            salable_qty: record.quantity + reservation_qty - record.min_qty,
            stock_status: StockStatus::from_salable(record.is_salable),
            is_in_stock: record.is_in_stock,
            max_sale_qty: record.max_sale_qty,
            min_sale_qty: record.min_qty,
            qty: record.quantity,
            stock_qty: record.stock_qty,
            reservation_qty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(is_salable: bool, quantity: f64, min_qty: f64) -> StockRecord {
        StockRecord {
            sku: "SKU".to_string(),
            is_salable,
            quantity,
            min_qty,
            is_in_stock: true,
            max_sale_qty: Some(10000.0),
            stock_qty: Some(quantity),
        }
    }

    #[test]
    fn test_salable_qty_includes_reservations() {
        let snapshot = StockSnapshot::from_record(&record(true, 10.0, 2.0), -3.0);
        assert_eq!(snapshot.salable_qty, 5.0);
        assert_eq!(snapshot.reservation_qty, -3.0);
        assert_eq!(snapshot.min_sale_qty, 2.0);
    }

    #[test]
    fn test_salability_flag_wins_over_arithmetic() {
        let snapshot = StockSnapshot::from_record(&record(true, 0.0, 1.0), -5.0);
        assert!(snapshot.salable_qty < 0.0);
        assert_eq!(snapshot.stock_status, StockStatus::InStock);

        let snapshot = StockSnapshot::from_record(&record(false, 100.0, 0.0), 0.0);
        assert_eq!(snapshot.stock_status, StockStatus::OutOfStock);
    }

    #[test]
    fn test_stock_status_serialization() {
        assert_eq!(
            serde_json::to_string(&StockStatus::OutOfStock).unwrap(),
            "\"OUT_OF_STOCK\""
        );
    }
}
