//! # Purchase Order Repository
//!
//! Purchase orders record goods expected from a supplier. They move
//! `pending → received` or `pending → cancelled` and nothing else.
//!
//! ## Receiving
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  update_status(id, received)                                           │
//! │       │                                                                 │
//! │  BEGIN                                                                 │
//! │  ├── check pending → received                                          │
//! │  ├── UPDATE purchase_orders SET status = 'received'                    │
//! │  ├── INSERT stock_receipts (purchase_order_id = id)                    │
//! │  ├── stock::apply_receipt(product, quantity)                           │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use stockroom_core::validation::{validate_price_cents, validate_received_quantity};
use stockroom_core::{CoreError, Money, Principal, PurchaseOrder, PurchaseOrderStatus, StockReceipt};
use tracing::{debug, info};

use super::{new_id, product, stock};
use crate::error::{DbError, DbResult};

const PURCHASE_ORDER_COLUMNS: &str = "id, product_id, supplier_id, quantity_received, cost_per_unit, \
     received_date, notes, received_by, status, created_at, updated_at";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPurchaseOrder {
    #[serde(alias = "product")]
    pub product_id: String,
    #[serde(alias = "supplier")]
    pub supplier_id: String,
    pub quantity_received: i64,
    pub cost_per_unit: Money,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub received_date: Option<DateTime<Utc>>,
}

/// List filters; all optional, combined with AND.
#[derive(Debug, Clone, Default)]
pub struct PurchaseOrderFilter {
    pub supplier_id: Option<String>,
    pub product_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<PurchaseOrder>> {
    let sql = format!("SELECT {} FROM purchase_orders WHERE id = ?", PURCHASE_ORDER_COLUMNS);
    let order = sqlx::query_as::<_, PurchaseOrder>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

#[derive(Debug, Clone)]
pub struct PurchaseOrderRepository {
    pool: SqlitePool,
}

impl PurchaseOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseOrderRepository { pool }
    }

    /// Records a pending purchase order received by `principal`.
    pub async fn create(&self, principal: &Principal, input: NewPurchaseOrder) -> DbResult<PurchaseOrder> {
        validate_received_quantity(input.quantity_received)?;
        validate_price_cents(input.cost_per_unit.cents())?;

        let mut tx = self.pool.begin().await?;

        if product::find(&mut *tx, &input.product_id).await?.is_none() {
            return Err(DbError::invalid_reference(format!("Unknown product {}", input.product_id)));
        }
        let supplier: Option<i64> = sqlx::query_scalar("SELECT 1 FROM suppliers WHERE id = ?")
            .bind(&input.supplier_id)
            .fetch_optional(&mut *tx)
            .await?;
        if supplier.is_none() {
            return Err(DbError::invalid_reference(format!("Unknown supplier {}", input.supplier_id)));
        }

        let now = Utc::now();
        let order = PurchaseOrder {
            id: new_id(),
            product_id: input.product_id,
            supplier_id: input.supplier_id,
            quantity_received: input.quantity_received,
            cost_per_unit: input.cost_per_unit,
            received_date: input.received_date.unwrap_or(now),
            notes: input.notes,
            received_by: principal.user_id.clone(),
            status: PurchaseOrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                id, product_id, supplier_id, quantity_received, cost_per_unit,
                received_date, notes, received_by, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id)
        .bind(&order.product_id)
        .bind(&order.supplier_id)
        .bind(order.quantity_received)
        .bind(order.cost_per_unit)
        .bind(order.received_date)
        .bind(&order.notes)
        .bind(&order.received_by)
        .bind(order.status)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            purchase_order_id = %order.id,
            product_id = %order.product_id,
            quantity = order.quantity_received,
            user = %principal.user_id,
            "Purchase order created"
        );
        Ok(order)
    }

    /// Purchase orders matching `filter`, newest received date first.
    pub async fn list(&self, filter: &PurchaseOrderFilter) -> DbResult<Vec<PurchaseOrder>> {
        debug!(?filter, "Listing purchase orders");

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM purchase_orders WHERE 1 = 1",
            PURCHASE_ORDER_COLUMNS
        ));
        if let Some(supplier) = &filter.supplier_id {
            qb.push(" AND supplier_id = ").push_bind(supplier.clone());
        }
        if let Some(product) = &filter.product_id {
            qb.push(" AND product_id = ").push_bind(product.clone());
        }
        if let Some(from) = filter.from {
            qb.push(" AND received_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND received_date <= ").push_bind(to);
        }
        qb.push(" ORDER BY received_date DESC, created_at DESC");

        let orders = qb.build_query_as::<PurchaseOrder>().fetch_all(&self.pool).await?;
        Ok(orders)
    }

    pub async fn by_supplier(&self, supplier_id: &str) -> DbResult<Vec<PurchaseOrder>> {
        self.list(&PurchaseOrderFilter {
            supplier_id: Some(supplier_id.to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn by_product(&self, product_id: &str) -> DbResult<Vec<PurchaseOrder>> {
        self.list(&PurchaseOrderFilter {
            product_id: Some(product_id.to_string()),
            ..Default::default()
        })
        .await
    }

    /// Purchase orders received within `[from, to]`.
    pub async fn date_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Vec<PurchaseOrder>> {
        self.list(&PurchaseOrderFilter {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        })
        .await
    }

    pub async fn get(&self, id: &str) -> DbResult<PurchaseOrder> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase order", id))
    }

    /// Moves a purchase order to `status`. Receiving adds its quantity to
    /// stock and records a stock receipt in the same transaction.
    pub async fn update_status(
        &self,
        principal: &Principal,
        id: &str,
        status: PurchaseOrderStatus,
    ) -> DbResult<PurchaseOrder> {
        let mut tx = self.pool.begin().await?;

        let mut order = find(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase order", id))?;

        if !order.status.can_transition_to(status) {
            return Err(CoreError::InvalidTransition {
                entity: "purchase order".to_string(),
                from: order.status.as_str().to_string(),
                to: status.as_str().to_string(),
            }
            .into());
        }

        let now = Utc::now();
        sqlx::query("UPDATE purchase_orders SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        order.status = status;
        order.updated_at = now;

        if status == PurchaseOrderStatus::Received {
            let receipt = StockReceipt {
                id: new_id(),
                product_id: order.product_id.clone(),
                supplier_id: Some(order.supplier_id.clone()),
                purchase_order_id: Some(order.id.clone()),
                quantity_received: order.quantity_received,
                cost_per_unit: order.cost_per_unit,
                total_cost: order.cost_per_unit.multiply_quantity(order.quantity_received),
                received_date: now,
                notes: order.notes.clone(),
                received_by: principal.user_id.clone(),
                created_at: now,
            };
            stock::insert_receipt(&mut *tx, &receipt).await?;
            let product = stock::apply_receipt(&mut *tx, &order.product_id, order.quantity_received).await?;
            debug!(product_id = %product.id, stock = product.stock, "Purchase order stock applied");
        }

        tx.commit().await?;

        info!(
            purchase_order_id = %id,
            status = status.as_str(),
            user = %principal.user_id,
            "Purchase order status changed"
        );
        Ok(order)
    }

    pub async fn delete(&self, principal: &Principal, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM purchase_orders WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase order", id));
        }

        info!(purchase_order_id = %id, user = %principal.user_id, "Purchase order deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, product, test_db};
    use chrono::Duration;
    use stockroom_core::import::SupplierDraft;
    use stockroom_core::{Supplier, SupplierStatus};

    async fn acme(db: &crate::Database, user: &Principal) -> Supplier {
        db.suppliers()
            .create(
                user,
                SupplierDraft {
                    name: "Acme".to_string(),
                    phone: "0300 1234567".to_string(),
                    email: None,
                    address: None,
                    contact_person_name: None,
                    contact_person_phone: None,
                    status: SupplierStatus::Active,
                },
            )
            .await
            .unwrap()
    }

    fn input(product_id: &str, supplier_id: &str, qty: i64) -> NewPurchaseOrder {
        NewPurchaseOrder {
            product_id: product_id.to_string(),
            supplier_id: supplier_id.to_string(),
            quantity_received: qty,
            cost_per_unit: Money::from_cents(400),
            notes: None,
            received_date: None,
        }
    }

    #[tokio::test]
    async fn test_receiving_adds_stock_once() {
        let db = test_db().await;
        let user = admin(&db).await;
        let p = product(&db, &user, "A1", 2).await;
        let s = acme(&db, &user).await;
        let repo = db.purchase_orders();

        let po = repo.create(&user, input(&p.id, &s.id, 12)).await.unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::Pending);
        assert_eq!(db.products().get(&p.id).await.unwrap().stock, 2);

        let po = repo
            .update_status(&user, &po.id, PurchaseOrderStatus::Received)
            .await
            .unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::Received);
        assert_eq!(db.products().get(&p.id).await.unwrap().stock, 14);

        let history = db.stock().history(&p.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].purchase_order_id.as_deref(), Some(po.id.as_str()));
        assert_eq!(history[0].total_cost, Money::from_cents(4_800));

        let err = repo
            .update_status(&user, &po.id, PurchaseOrderStatus::Received)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidTransition { .. })));
        assert_eq!(db.products().get(&p.id).await.unwrap().stock, 14);
    }

    #[tokio::test]
    async fn test_cancel_leaves_stock() {
        let db = test_db().await;
        let user = admin(&db).await;
        let p = product(&db, &user, "A1", 2).await;
        let s = acme(&db, &user).await;
        let repo = db.purchase_orders();

        let po = repo.create(&user, input(&p.id, &s.id, 5)).await.unwrap();
        repo.update_status(&user, &po.id, PurchaseOrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(db.products().get(&p.id).await.unwrap().stock, 2);
        assert!(db.stock().history(&p.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filters_and_references() {
        let db = test_db().await;
        let user = admin(&db).await;
        let a = product(&db, &user, "A1", 0).await;
        let b = product(&db, &user, "B1", 0).await;
        let s = acme(&db, &user).await;
        let repo = db.purchase_orders();

        repo.create(&user, input(&a.id, &s.id, 1)).await.unwrap();
        let mut old = input(&b.id, &s.id, 2);
        old.received_date = Some(Utc::now() - Duration::days(30));
        repo.create(&user, old).await.unwrap();

        assert_eq!(repo.by_supplier(&s.id).await.unwrap().len(), 2);
        assert_eq!(repo.by_product(&a.id).await.unwrap().len(), 1);

        let recent = repo
            .date_range(Utc::now() - Duration::days(7), Utc::now() + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].product_id, a.id);

        let err = repo.create(&user, input("ghost", &s.id, 1)).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        let err = repo.create(&user, input(&a.id, "ghost", 1)).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown supplier ghost");

        let id = repo.list(&PurchaseOrderFilter::default()).await.unwrap()[0].id.clone();
        repo.delete(&user, &id).await.unwrap();
        assert!(matches!(repo.get(&id).await.unwrap_err(), DbError::NotFound { .. }));
    }
}
