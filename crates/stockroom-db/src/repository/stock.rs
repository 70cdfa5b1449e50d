//! # Stock Ledger
//!
//! Every stock movement goes through this module: deductions when an order
//! is placed, increments when goods are received.
//!
//! ## Version-Checked Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each line:                                                        │
//! │    SELECT stock, status, version FROM products WHERE id = ?            │
//! │         │                                                               │
//! │         ├── no row ──► warn!, add to report.skipped, next line         │
//! │         ▼                                                               │
//! │    new = max(stock - qty, 0)                                           │
//! │    UPDATE products SET stock = new, version = version + 1              │
//! │     WHERE id = ? AND version = <read version>                          │
//! │         │                                                               │
//! │         ├── 1 row  ──► adjusted                                        │
//! │         └── 0 rows ──► someone else won, re-read (bounded retries)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The helpers take a `&mut SqliteConnection` so callers run them inside
//! their own transaction. A retry budget of `n` allows `n + 1` attempts.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use stockroom_core::stock::{
    deduct, receive, status_after_stock_change, StockAdjustment, StockAdjustmentReport, StockLine,
};
use stockroom_core::validation::{validate_price_cents, validate_received_quantity};
use stockroom_core::{Money, Principal, Product, ProductStatus, StockReceipt};
use tracing::{debug, info, warn};

use super::{new_id, product};
use crate::error::{DbError, DbResult};

const RECEIPT_COLUMNS: &str = "id, product_id, supplier_id, purchase_order_id, quantity_received, \
     cost_per_unit, total_cost, received_date, notes, received_by, created_at";

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Applies `next` to one product's stock under a version check.
///
/// Inside a SQLite write transaction the enclosing lock already keeps other
/// writers out, so the check only fails when the read and the write are
/// separate statements on an autocommit connection. Returns `None` when the
/// product does not exist.
async fn adjust_one(
    conn: &mut SqliteConnection,
    product_id: &str,
    retries: u32,
    next: impl Fn(i64) -> i64,
) -> DbResult<Option<StockAdjustment>> {
    for attempt in 0..=retries {
        let row: Option<(i64, ProductStatus, i64)> =
            sqlx::query_as("SELECT stock, status, version FROM products WHERE id = ?")
                .bind(product_id)
                .fetch_optional(&mut *conn)
                .await?;

        let Some((before, status, version)) = row else {
            return Ok(None);
        };

        let after = next(before);
        let status = status_after_stock_change(status, after);

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = ?, status = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(after)
        .bind(status)
        .bind(Utc::now())
        .bind(product_id)
        .bind(version)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(Some(StockAdjustment {
                product_id: product_id.to_string(),
                before,
                after,
            }));
        }

        debug!(product_id = %product_id, attempt, "Stock version changed, retrying");
    }

    Err(DbError::Conflict(format!(
        "Stock for product {} changed during update, please retry",
        product_id
    )))
}

/// Deducts every line from stock, floored at zero.
///
/// Unknown products are skipped and listed in the report. Exhausting the
/// retry budget on any line fails with `DbError::Conflict`; the caller's
/// transaction then rolls back every line.
pub(crate) async fn apply_stock_deduction(
    conn: &mut SqliteConnection,
    lines: &[StockLine],
    retries: u32,
) -> DbResult<StockAdjustmentReport> {
    let mut report = StockAdjustmentReport::default();

    for line in lines {
        let quantity = line.quantity;
        match adjust_one(conn, &line.product_id, retries, |stock| deduct(stock, quantity)).await? {
            Some(adjustment) => {
                if adjustment.before < quantity {
                    warn!(
                        product_id = %line.product_id,
                        stock = adjustment.before,
                        quantity,
                        "Sold more than recorded stock, floored at zero"
                    );
                }
                report.adjusted.push(adjustment);
            }
            None => {
                warn!(product_id = %line.product_id, "Skipping stock line for unknown product");
                report.skipped.push(line.product_id.clone());
            }
        }
    }

    Ok(report)
}

/// Adds `quantity` to a product's stock and returns the updated product.
pub(crate) async fn apply_receipt(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> DbResult<Product> {
    adjust_one(conn, product_id, 0, |stock| receive(stock, quantity))
        .await?
        .ok_or_else(|| DbError::not_found("Product", product_id))?;

    product::find(conn, product_id)
        .await?
        .ok_or_else(|| DbError::not_found("Product", product_id))
}

pub(crate) async fn insert_receipt(conn: &mut SqliteConnection, receipt: &StockReceipt) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_receipts (
            id, product_id, supplier_id, purchase_order_id, quantity_received,
            cost_per_unit, total_cost, received_date, notes, received_by, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&receipt.id)
    .bind(&receipt.product_id)
    .bind(&receipt.supplier_id)
    .bind(&receipt.purchase_order_id)
    .bind(receipt.quantity_received)
    .bind(receipt.cost_per_unit)
    .bind(receipt.total_cost)
    .bind(receipt.received_date)
    .bind(&receipt.notes)
    .bind(&receipt.received_by)
    .bind(receipt.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Goods arriving for one product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveStock {
    #[serde(default, alias = "supplier")]
    pub supplier_id: Option<String>,
    pub quantity_received: i64,
    pub cost_per_unit: Money,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub received_date: Option<DateTime<Utc>>,
}

/// A receipt and the product after it was applied.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReceivedStock {
    pub receipt: StockReceipt,
    pub product: Product,
}

#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Records a stock receipt and increments stock in one transaction.
    pub async fn receive_stock(
        &self,
        principal: &Principal,
        product_id: &str,
        input: ReceiveStock,
    ) -> DbResult<ReceivedStock> {
        validate_received_quantity(input.quantity_received)?;
        validate_price_cents(input.cost_per_unit.cents())?;

        let now = Utc::now();
        let receipt = StockReceipt {
            id: new_id(),
            product_id: product_id.to_string(),
            supplier_id: input.supplier_id.filter(|s| !s.trim().is_empty()),
            purchase_order_id: None,
            quantity_received: input.quantity_received,
            cost_per_unit: input.cost_per_unit,
            total_cost: input.cost_per_unit.multiply_quantity(input.quantity_received),
            received_date: input.received_date.unwrap_or(now),
            notes: input.notes,
            received_by: principal.user_id.clone(),
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;

        if product::find(&mut *tx, product_id).await?.is_none() {
            return Err(DbError::not_found("Product", product_id));
        }

        insert_receipt(&mut *tx, &receipt).await?;
        let product = apply_receipt(&mut *tx, product_id, receipt.quantity_received).await?;

        tx.commit().await?;

        info!(
            product_id = %product_id,
            quantity = receipt.quantity_received,
            stock = product.stock,
            user = %principal.user_id,
            "Stock received"
        );
        Ok(ReceivedStock { receipt, product })
    }

    /// Receipts for a product, newest first.
    pub async fn history(&self, product_id: &str) -> DbResult<Vec<StockReceipt>> {
        let mut conn = self.pool.acquire().await?;
        if product::find(&mut conn, product_id).await?.is_none() {
            return Err(DbError::not_found("Product", product_id));
        }

        let sql = format!(
            "SELECT {} FROM stock_receipts WHERE product_id = ? ORDER BY received_date DESC, created_at DESC",
            RECEIPT_COLUMNS
        );
        let receipts = sqlx::query_as::<_, StockReceipt>(&sql)
            .bind(product_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(receipts)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
