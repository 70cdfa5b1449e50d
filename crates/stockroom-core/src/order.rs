//! # Order Math
//!
//! Line validation, totals and status transitions for orders.
//!
//! Line prices are snapshots chosen by the caller (usually the tax-inclusive
//! price captured in the cart). They are not re-derived here, and tax is
//! not added a second time.
//!
//! ```text
//! lines:  10.00 × 2  +  5.00 × 3
//! subtotal = 35.00   discount = 0   tax = 0   total = 35.00
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::stock::StockLine;
use crate::types::OrderStatus;
use crate::validation::{validate_price_cents, validate_quantity, validate_required};
use crate::MAX_ORDER_LINES;

/// A line submitted for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price snapshot in minor units. Clients that only know the
    /// catalogue price may send it as `basePrice`.
    #[serde(alias = "basePrice")]
    pub price: Money,
}

impl OrderLine {
    pub fn line_total(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }
}

impl From<&OrderLine> for StockLine {
    fn from(line: &OrderLine) -> Self {
        StockLine {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
        }
    }
}

/// Checks an order's lines before anything is written.
pub fn validate_lines(lines: &[OrderLine]) -> CoreResult<()> {
    if lines.is_empty() {
        return Err(CoreError::EmptyOrder);
    }
    if lines.len() > MAX_ORDER_LINES {
        return Err(CoreError::TooManyLines {
            max: MAX_ORDER_LINES,
        });
    }

    for line in lines {
        validate_required("productId", &line.product_id)?;
        validate_quantity(line.quantity)?;
        validate_price_cents(line.price.cents())?;
    }

    Ok(())
}

/// Monetary summary of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

impl OrderTotals {
    /// `subtotal = Σ price × quantity`, no discount, no extra tax.
    pub fn from_lines(lines: &[OrderLine]) -> Self {
        let subtotal: Money = lines.iter().map(OrderLine::line_total).sum();
        let discount = Money::zero();
        let tax = Money::zero();

        OrderTotals {
            subtotal,
            discount,
            tax,
            total: subtotal - discount + tax,
        }
    }
}

impl OrderStatus {
    /// pending → paid, pending → cancelled, paid → cancelled.
    /// Nothing leaves `cancelled`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Paid, OrderStatus::Cancelled)
        )
    }
}

/// Errors with [`CoreError::InvalidTransition`] unless the move is allowed.
pub fn check_transition(current: OrderStatus, next: OrderStatus) -> CoreResult<()> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            entity: "order".to_string(),
            from: current.as_str().to_string(),
            to: next.as_str().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::{MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

    fn line(product: &str, price: i64, quantity: i64) -> OrderLine {
        OrderLine {
            product_id: product.to_string(),
            quantity,
            price: Money::from_cents(price),
        }
    }

    #[test]
    fn test_totals_sum_snapshot_prices() {
        let lines = vec![line("a", 1000, 2), line("b", 500, 3)];
        let totals = OrderTotals::from_lines(&lines);

        assert_eq!(totals.subtotal.cents(), 3500);
        assert_eq!(totals.discount.cents(), 0);
        assert_eq!(totals.tax.cents(), 0);
        assert_eq!(totals.total.cents(), 3500);
    }

    #[test]
    fn test_total_identity_holds() {
        let totals = OrderTotals::from_lines(&[line("a", 1999, 7)]);
        assert_eq!(totals.total, totals.subtotal - totals.discount + totals.tax);
    }

    #[test]
    fn test_line_accepts_base_price_in_place_of_price() {
        let parsed: OrderLine =
            serde_json::from_str(r#"{"productId":"a","quantity":2,"basePrice":250}"#).unwrap();
        assert_eq!(parsed, line("a", 250, 2));

        let parsed: OrderLine =
            serde_json::from_str(r#"{"productId":"a","quantity":2,"price":300}"#).unwrap();
        assert_eq!(parsed.price.cents(), 300);

        let missing = serde_json::from_str::<OrderLine>(r#"{"productId":"a","quantity":2}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn test_empty_order_rejected() {
        assert!(matches!(validate_lines(&[]), Err(CoreError::EmptyOrder)));
    }

    #[test]
    fn test_bad_lines_rejected() {
        assert!(validate_lines(&[line("a", 100, 0)]).is_err());
        assert!(validate_lines(&[line("a", 100, 1000)]).is_err());
        assert!(validate_lines(&[line("a", -1, 1)]).is_err());
        assert!(validate_lines(&[line("  ", 100, 1)]).is_err());
        assert!(validate_lines(&[line("a", 0, 1)]).is_ok());
    }

    #[test]
    fn test_oversized_price_rejected_before_totals() {
        let huge = line("a", i64::MAX / 2, 3);
        assert!(matches!(
            validate_lines(&[huge]),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_largest_valid_order_fits_totals() {
        let lines: Vec<_> = (0..MAX_ORDER_LINES)
            .map(|i| line(&format!("p{}", i), MAX_PRICE_CENTS, MAX_ITEM_QUANTITY))
            .collect();
        assert!(validate_lines(&lines).is_ok());

        let totals = OrderTotals::from_lines(&lines);
        let expected = MAX_PRICE_CENTS * MAX_ITEM_QUANTITY * MAX_ORDER_LINES as i64;
        assert_eq!(totals.subtotal.cents(), expected);
        assert_eq!(totals.total.cents(), expected);
    }

    #[test]
    fn test_too_many_lines_rejected() {
        let lines: Vec<_> = (0..=MAX_ORDER_LINES)
            .map(|i| line(&format!("p{}", i), 100, 1))
            .collect();
        assert!(matches!(
            validate_lines(&lines),
            Err(CoreError::TooManyLines { .. })
        ));
    }

    #[test]
    fn test_status_transitions() {
        assert!(check_transition(OrderStatus::Pending, OrderStatus::Paid).is_ok());
        assert!(check_transition(OrderStatus::Paid, OrderStatus::Cancelled).is_ok());
        assert!(check_transition(OrderStatus::Cancelled, OrderStatus::Paid).is_err());
        assert!(check_transition(OrderStatus::Paid, OrderStatus::Pending).is_err());
        assert!(check_transition(OrderStatus::Paid, OrderStatus::Paid).is_err());
    }
}
