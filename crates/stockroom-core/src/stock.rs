//! # Stock Ledger Arithmetic
//!
//! The pure half of stock adjustment. The database layer loads product rows,
//! runs them through these functions and writes them back with a version
//! check.
//!
//! ```text
//! sale of 7, stock 5   →  deduct(5, 7)  = 0   (floored, sale still recorded)
//! receipt of 10, stock 0 → receive(0, 10) = 10
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::ProductStatus;

/// Stock after selling `quantity`. Never negative.
#[inline]
pub fn deduct(current: i64, quantity: i64) -> i64 {
    current.saturating_sub(quantity).max(0)
}

/// Stock after receiving `quantity`.
#[inline]
pub fn receive(current: i64, quantity: i64) -> i64 {
    current.saturating_add(quantity)
}

/// Status after a stock level change.
///
/// Only flips between `available` and `out of stock`. Manually set statuses
/// (pending, discounted, discontinued) are left alone.
pub fn status_after_stock_change(status: ProductStatus, new_stock: i64) -> ProductStatus {
    match status {
        ProductStatus::Available if new_stock <= 0 => ProductStatus::OutOfStock,
        ProductStatus::OutOfStock if new_stock > 0 => ProductStatus::Available,
        other => other,
    }
}

/// One line to take out of stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLine {
    pub product_id: String,
    pub quantity: i64,
}

/// The before/after of one adjusted product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockAdjustment {
    pub product_id: String,
    pub before: i64,
    pub after: i64,
}

/// Outcome of applying a batch of stock lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockAdjustmentReport {
    pub adjusted: Vec<StockAdjustment>,
    /// Product ids that did not exist and were skipped.
    pub skipped: Vec<String>,
}

impl StockAdjustmentReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduct_floors_at_zero() {
        assert_eq!(deduct(10, 3), 7);
        assert_eq!(deduct(5, 5), 0);
        assert_eq!(deduct(5, 7), 0);
        assert_eq!(deduct(0, 1), 0);
        assert_eq!(deduct(i64::MIN + 1, i64::MAX), 0);
    }

    #[test]
    fn test_receive_adds() {
        assert_eq!(receive(0, 10), 10);
        assert_eq!(receive(i64::MAX, 1), i64::MAX);
    }

    #[test]
    fn test_status_toggles_between_available_and_out_of_stock() {
        assert_eq!(
            status_after_stock_change(ProductStatus::Available, 0),
            ProductStatus::OutOfStock
        );
        assert_eq!(
            status_after_stock_change(ProductStatus::OutOfStock, 10),
            ProductStatus::Available
        );
        assert_eq!(
            status_after_stock_change(ProductStatus::Available, 4),
            ProductStatus::Available
        );
    }

    #[test]
    fn test_manual_statuses_are_kept() {
        for status in [
            ProductStatus::Pending,
            ProductStatus::Discounted,
            ProductStatus::Discontinued,
        ] {
            assert_eq!(status_after_stock_change(status, 0), status);
            assert_eq!(status_after_stock_change(status, 50), status);
        }
    }
}
