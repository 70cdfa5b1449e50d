//! # Order Repository
//!
//! Order placement, listings and sales figures.
//!
//! ## Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place_order(&principal, PlaceOrder { items, paymentMethod, ... })     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  order::validate_lines  ──► "No items in the order." (400)             │
//! │  OrderTotals::from_lines                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │  ├── INSERT orders (status = paid, user_id = principal)                │
//! │  ├── INSERT order_items (price snapshots)                              │
//! │  ├── stock::apply_stock_deduction (floored, unknown ids skipped)       │
//! │  COMMIT ── any error rolls back the order and every stock line         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use stockroom_core::order::{check_transition, validate_lines, OrderLine, OrderTotals};
use stockroom_core::report::{DashboardStats, SalesReport};
use stockroom_core::stock::{StockAdjustmentReport, StockLine};
use stockroom_core::{
    Money, Order, OrderDetail, OrderItem, OrderItemDetail, OrderStatus, PaymentMethod, Principal,
    ProductSummary, UserSummary,
};
use tracing::{debug, info, warn};

use super::{new_id, stock};
use crate::error::{DbError, DbResult};

const ORDER_COLUMNS: &str = "id, user_id, subtotal, discount, tax, total, payment_method, \
     transaction_ref, status, created_at, updated_at";

/// Body of an order request. A `user` field, if sent, is ignored: the
/// preparer is always the authenticated principal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    #[serde(default)]
    pub items: Vec<OrderLine>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub transaction_ref: Option<String>,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    order_id: String,
    product_id: String,
    quantity: i64,
    price: Money,
    product_name: Option<String>,
    product_sku: Option<String>,
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Writes an order and its lines, then deducts stock, on `conn`.
///
/// The caller owns the transaction.
pub(crate) async fn record_sale(
    conn: &mut SqliteConnection,
    principal: &Principal,
    input: &PlaceOrder,
    retries: u32,
) -> DbResult<(Order, StockAdjustmentReport)> {
    validate_lines(&input.items)?;
    let totals = OrderTotals::from_lines(&input.items);
    let now = Utc::now();

    let mut order = Order {
        id: new_id(),
        user_id: principal.user_id.clone(),
        subtotal: totals.subtotal,
        discount: totals.discount,
        tax: totals.tax,
        total: totals.total,
        payment_method: input.payment_method,
        transaction_ref: input
            .transaction_ref
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string),
        status: OrderStatus::Paid,
        items: Vec::with_capacity(input.items.len()),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, user_id, subtotal, discount, tax, total,
            payment_method, transaction_ref, status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&order.id)
    .bind(&order.user_id)
    .bind(order.subtotal)
    .bind(order.discount)
    .bind(order.tax)
    .bind(order.total)
    .bind(order.payment_method)
    .bind(&order.transaction_ref)
    .bind(order.status)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    for line in &input.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, price) VALUES (?, ?, ?, ?)",
        )
        .bind(&order.id)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.price)
        .execute(&mut *conn)
        .await?;

        order.items.push(OrderItem {
            order_id: order.id.clone(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            price: line.price,
        });
    }

    let lines: Vec<StockLine> = input.items.iter().map(StockLine::from).collect();
    let report = stock::apply_stock_deduction(conn, &lines, retries).await?;

    if !report.is_complete() {
        warn!(
            order_id = %order.id,
            skipped = ?report.skipped,
            "Order recorded with stock lines for unknown products"
        );
    }

    Ok((order, report))
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
    retries: u32,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool, retries: u32) -> Self {
        OrderRepository { pool, retries }
    }

    /// Places a paid order and deducts stock in one transaction.
    ///
    /// ## Returns
    /// The stored order and the stock adjustments made for it. Lines for
    /// unknown products are kept on the order and listed in
    /// `StockAdjustmentReport::skipped`.
    ///
    /// ## Errors
    /// - `Core(EmptyOrder)` / `Core(Validation)` for bad lines
    /// - `Conflict` when a stock line kept losing its version check
    pub async fn place_order(
        &self,
        principal: &Principal,
        input: PlaceOrder,
    ) -> DbResult<(Order, StockAdjustmentReport)> {
        let mut tx = self.pool.begin().await?;
        let (order, report) = record_sale(&mut *tx, principal, &input, self.retries).await?;
        tx.commit().await?;

        info!(
            order_id = %order.id,
            total = %order.total,
            lines = order.items.len(),
            adjusted = report.adjusted.len(),
            user = %principal.user_id,
            "Order placed"
        );
        Ok((order, report))
    }

    /// All orders, newest first, with preparer and products resolved.
    pub async fn list_populated(&self) -> DbResult<Vec<OrderDetail>> {
        self.details(None).await
    }

    pub async fn get(&self, id: &str) -> DbResult<OrderDetail> {
        self.details(Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    async fn details(&self, id: Option<&str>) -> DbResult<Vec<OrderDetail>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE ?1 IS NULL OR id = ?1 ORDER BY created_at DESC, id",
            ORDER_COLUMNS
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        let users: HashMap<String, UserSummary> = sqlx::query_as::<_, UserSummary>(
            "SELECT id, full_name, email FROM users WHERE id IN (SELECT user_id FROM orders)",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect();

        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT oi.order_id, oi.product_id, oi.quantity, oi.price,
                   p.name AS product_name, p.sku AS product_sku
            FROM order_items oi
            LEFT JOIN products p ON p.id = oi.product_id
            WHERE ?1 IS NULL OR oi.order_id = ?1
            ORDER BY oi.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<String, Vec<OrderItemDetail>> = HashMap::new();
        for row in rows {
            let product = match (row.product_name, row.product_sku) {
                (Some(name), Some(sku)) => Some(ProductSummary {
                    id: row.product_id.clone(),
                    name,
                    sku,
                }),
                _ => None,
            };
            items.entry(row.order_id).or_default().push(OrderItemDetail {
                product_id: row.product_id,
                product,
                quantity: row.quantity,
                price: row.price,
            });
        }

        debug!(count = orders.len(), "Loaded orders");

        Ok(orders
            .into_iter()
            .map(|order| OrderDetail {
                user: users.get(&order.user_id).cloned(),
                items: items.remove(&order.id).unwrap_or_default(),
                id: order.id,
                subtotal: order.subtotal,
                discount: order.discount,
                tax: order.tax,
                total: order.total,
                payment_method: order.payment_method,
                transaction_ref: order.transaction_ref,
                status: order.status,
                created_at: order.created_at,
                updated_at: order.updated_at,
            })
            .collect())
    }

    /// Moves an order along its lifecycle. Stock is not restored on
    /// cancellation.
    pub async fn update_status(
        &self,
        principal: &Principal,
        id: &str,
        status: OrderStatus,
    ) -> DbResult<OrderDetail> {
        let current: OrderStatus = sqlx::query_scalar("SELECT status FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        check_transition(current, status)?;

        let result =
            sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
                .bind(status)
                .bind(Utc::now())
                .bind(id)
                .bind(current)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::Conflict(format!(
                "Order {} changed status during update, please retry",
                id
            )));
        }

        info!(
            order_id = %id,
            from = current.as_str(),
            to = status.as_str(),
            user = %principal.user_id,
            "Order status changed"
        );
        self.get(id).await
    }

    pub async fn dashboard_stats(&self) -> DbResult<DashboardStats> {
        let (total_products, total_users, total_orders, total_revenue): (i64, i64, i64, Money) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM products),
                    (SELECT COUNT(*) FROM users),
                    (SELECT COUNT(*) FROM orders),
                    (SELECT COALESCE(SUM(total), 0) FROM orders WHERE status = 'paid')
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(DashboardStats {
            total_products,
            total_users,
            total_orders,
            total_revenue,
        })
    }

    /// `(created_at, total)` of every paid order, for chart bucketing.
    pub async fn paid_orders(&self) -> DbResult<Vec<(DateTime<Utc>, Money)>> {
        let rows = sqlx::query_as::<_, (DateTime<Utc>, Money)>(
            "SELECT created_at, total FROM orders WHERE status = 'paid' ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Paid orders created within `[from, to]`.
    pub async fn sales_report(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<SalesReport> {
        let (total_orders, total_revenue): (i64, Money) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(total), 0)
            FROM orders
            WHERE status = 'paid' AND created_at >= ? AND created_at <= ?
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesReport {
            total_orders,
            total_revenue,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, product, test_db};
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use stockroom_core::report::{bucket_sales, SalesPeriod};
    use stockroom_core::{CoreError, ProductStatus};

    fn line(product_id: &str, price: i64, quantity: i64) -> OrderLine {
        OrderLine {
            product_id: product_id.to_string(),
            quantity,
            price: Money::from_cents(price),
        }
    }

    fn order(items: Vec<OrderLine>) -> PlaceOrder {
        PlaceOrder {
            items,
            payment_method: PaymentMethod::Cash,
            transaction_ref: None,
        }
    }

    #[tokio::test]
    async fn test_place_order_totals_and_status() {
        let db = test_db().await;
        let user = admin(&db).await;
        let a = product(&db, &user, "A1", 50).await;
        let b = product(&db, &user, "B1", 50).await;

        let (placed, report) = db
            .orders()
            .place_order(&user, order(vec![line(&a.id, 1_000, 2), line(&b.id, 500, 3)]))
            .await
            .unwrap();

        assert_eq!(placed.subtotal, Money::from_cents(3_500));
        assert_eq!(placed.discount, Money::zero());
        assert_eq!(placed.tax, Money::zero());
        assert_eq!(placed.total, Money::from_cents(3_500));
        assert_eq!(placed.status, OrderStatus::Paid);
        assert_eq!(placed.user_id, user.user_id);
        assert!(report.is_complete());

        assert_eq!(db.products().get(&a.id).await.unwrap().stock, 48);
        assert_eq!(db.products().get(&b.id).await.unwrap().stock, 47);
    }

    #[tokio::test]
    async fn test_oversell_floors_stock_and_keeps_order() {
        let db = test_db().await;
        let user = admin(&db).await;
        let p = product(&db, &user, "A1", 5).await;

        let (placed, _) = db
            .orders()
            .place_order(&user, order(vec![line(&p.id, 1_000, 7)]))
            .await
            .unwrap();

        let p = db.products().get(&p.id).await.unwrap();
        assert_eq!(p.stock, 0);
        assert_eq!(p.status, ProductStatus::OutOfStock);

        let stored = db.orders().get(&placed.id).await.unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].quantity, 7);
        assert_eq!(stored.items[0].product.as_ref().unwrap().sku, "A1");
        assert_eq!(stored.user.unwrap().id, user.user_id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_sales_share_stock_without_over_deducting() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("stockroom.db")).max_connections(4))
            .await
            .unwrap();
        let user = admin(&db).await;
        let roomy = product(&db, &user, "A1", 10).await;
        let tight = product(&db, &user, "B1", 5).await;

        let orders = db.orders();
        let (first, second, third) = tokio::join!(
            orders.place_order(&user, order(vec![line(&roomy.id, 100, 4), line(&tight.id, 100, 4)])),
            orders.place_order(&user, order(vec![line(&roomy.id, 100, 3), line(&tight.id, 100, 3)])),
            orders.place_order(&user, order(vec![line(&roomy.id, 100, 2)])),
        );
        first.unwrap();
        second.unwrap();
        third.unwrap();

        let roomy = db.products().get(&roomy.id).await.unwrap();
        assert_eq!(roomy.stock, 10 - 4 - 3 - 2);
        assert_eq!(roomy.version, 3);

        let tight = db.products().get(&tight.id).await.unwrap();
        assert_eq!(tight.stock, 0);
        assert_eq!(tight.status, ProductStatus::OutOfStock);
        assert_eq!(tight.version, 2);

        assert_eq!(db.orders().list_populated().await.unwrap().len(), 3);
        db.close().await;
    }

    #[tokio::test]
    async fn test_unknown_product_line_is_kept_but_not_adjusted() {
        let db = test_db().await;
        let user = admin(&db).await;
        let p = product(&db, &user, "A1", 5).await;

        let (placed, report) = db
            .orders()
            .place_order(&user, order(vec![line("ghost", 100, 1), line(&p.id, 100, 1)]))
            .await
            .unwrap();

        assert_eq!(report.skipped, vec!["ghost".to_string()]);
        assert_eq!(placed.items.len(), 2);

        let stored = db.orders().get(&placed.id).await.unwrap();
        assert!(stored.items[0].product.is_none());
        assert_eq!(db.products().get(&p.id).await.unwrap().stock, 4);
    }

    #[tokio::test]
    async fn test_empty_order_is_rejected() {
        let db = test_db().await;
        let user = admin(&db).await;

        let err = db.orders().place_order(&user, order(vec![])).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::EmptyOrder)));
        assert_eq!(err.to_string(), "No items in the order.");
        assert!(db.orders().list_populated().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rolled_back_sale_leaves_no_trace() {
        let db = test_db().await;
        let user = admin(&db).await;
        let p = product(&db, &user, "A1", 5).await;

        let mut tx = db.pool().begin().await.unwrap();
        let (sale, report) = record_sale(&mut *tx, &user, &order(vec![line(&p.id, 100, 2)]), 3)
            .await
            .unwrap();
        assert_eq!(report.adjusted[0].after, 3);
        tx.rollback().await.unwrap();

        assert!(matches!(
            db.orders().get(&sale.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
        assert_eq!(db.products().get(&p.id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_unknown_principal_is_rejected() {
        let db = test_db().await;
        let user = admin(&db).await;
        let p = product(&db, &user, "A1", 5).await;

        let stranger = Principal::new("no-such-user", "admin");
        let err = db
            .orders()
            .place_order(&stranger, order(vec![line(&p.id, 100, 2)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        assert!(db.orders().list_populated().await.unwrap().is_empty());
        assert_eq!(db.products().get(&p.id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let db = test_db().await;
        let user = admin(&db).await;
        let p = product(&db, &user, "A1", 5).await;
        let (placed, _) = db
            .orders()
            .place_order(&user, order(vec![line(&p.id, 100, 1)]))
            .await
            .unwrap();

        let cancelled = db
            .orders()
            .update_status(&user, &placed.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let err = db
            .orders()
            .update_status(&user, &placed.id, OrderStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_status_change_that_matches_no_row_is_conflict() {
        let db = test_db().await;
        let user = admin(&db).await;
        let p = product(&db, &user, "A1", 5).await;
        let (placed, _) = db
            .orders()
            .place_order(&user, order(vec![line(&p.id, 100, 1)]))
            .await
            .unwrap();

        // Stands in for another writer moving the order first
        sqlx::query(
            "CREATE TRIGGER status_lost BEFORE UPDATE OF status ON orders BEGIN SELECT RAISE(IGNORE); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = db
            .orders()
            .update_status(&user, &placed.id, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
        assert_eq!(db.orders().get(&placed.id).await.unwrap().status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_stats_and_reports_count_paid_orders() {
        let db = test_db().await;
        let user = admin(&db).await;
        let p = product(&db, &user, "A1", 50).await;

        for qty in [1, 2] {
            db.orders()
                .place_order(&user, order(vec![line(&p.id, 1_000, qty)]))
                .await
                .unwrap();
        }
        let (cancel_me, _) = db
            .orders()
            .place_order(&user, order(vec![line(&p.id, 1_000, 5)]))
            .await
            .unwrap();
        db.orders()
            .update_status(&user, &cancel_me.id, OrderStatus::Cancelled)
            .await
            .unwrap();

        let stats = db.orders().dashboard_stats().await.unwrap();
        assert_eq!(stats.total_products, 1);
        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.total_revenue, Money::from_cents(3_000));

        let now = Utc::now();
        let report = db
            .orders()
            .sales_report(now - Duration::days(1), now + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(report.total_orders, 2);
        assert_eq!(report.total_revenue, Money::from_cents(3_000));

        let buckets = bucket_sales(SalesPeriod::Daily, db.orders().paid_orders().await.unwrap());
        assert_eq!(buckets.iter().map(|b| b.order_count).sum::<i64>(), 2);
    }
}
