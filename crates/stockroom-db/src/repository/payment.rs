//! Payment repository.
//!
//! Payments are recorded against an existing order. The order itself is not
//! changed; settlement status lives on the payment.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use stockroom_core::report::PaymentSummary;
use stockroom_core::validation::validate_price_cents;
use stockroom_core::{Money, Payment, PaymentMethod, PaymentStatus, Principal};
use tracing::info;

use super::new_id;
use crate::error::{DbError, DbResult};

const PAYMENT_COLUMNS: &str =
    "id, order_id, method, amount, status, transaction_id, created_at, updated_at";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    #[serde(alias = "order")]
    pub order_id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Records a payment. An unknown order is an invalid reference.
    pub async fn create(&self, principal: &Principal, input: NewPayment) -> DbResult<Payment> {
        validate_price_cents(input.amount.cents())?;

        let order: Option<i64> = sqlx::query_scalar("SELECT 1 FROM orders WHERE id = ?")
            .bind(&input.order_id)
            .fetch_optional(&self.pool)
            .await?;
        if order.is_none() {
            return Err(DbError::invalid_reference("Invalid order"));
        }

        let now = Utc::now();
        let payment = Payment {
            id: new_id(),
            order_id: input.order_id,
            method: input.method,
            amount: input.amount,
            status: input.status,
            transaction_id: input
                .transaction_id
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, method, amount, status, transaction_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.order_id)
        .bind(payment.method)
        .bind(payment.amount)
        .bind(payment.status)
        .bind(&payment.transaction_id)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?;

        info!(
            payment_id = %payment.id,
            order_id = %payment.order_id,
            amount = %payment.amount,
            status = payment.status.as_str(),
            user = %principal.user_id,
            "Payment recorded"
        );
        Ok(payment)
    }

    /// All payments, newest first.
    pub async fn list(&self) -> DbResult<Vec<Payment>> {
        let sql = format!("SELECT {} FROM payments ORDER BY created_at DESC", PAYMENT_COLUMNS);
        let payments = sqlx::query_as::<_, Payment>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(payments)
    }

    /// Payment amounts summed per status.
    pub async fn summary(&self) -> DbResult<Vec<PaymentSummary>> {
        let rows = sqlx::query_as::<_, (PaymentStatus, Money)>(
            "SELECT status, COALESCE(SUM(amount), 0) FROM payments GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(status, total)| PaymentSummary { status, total })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::order::PlaceOrder;
    use crate::test_support::{admin, product, test_db};
    use stockroom_core::order::OrderLine;

    fn payment(order_id: &str, cents: i64) -> NewPayment {
        NewPayment {
            order_id: order_id.to_string(),
            amount: Money::from_cents(cents),
            method: PaymentMethod::Card,
            status: PaymentStatus::Completed,
            transaction_id: Some("TXN-1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_payment_requires_existing_order() {
        let db = test_db().await;
        let user = admin(&db).await;

        let err = db.payments().create(&user, payment("ghost", 100)).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert_eq!(err.to_string(), "Invalid order");
    }

    #[tokio::test]
    async fn test_payment_recorded_and_listed() {
        let db = test_db().await;
        let user = admin(&db).await;
        let p = product(&db, &user, "A1", 5).await;
        let (order, _) = db
            .orders()
            .place_order(
                &user,
                PlaceOrder {
                    items: vec![OrderLine {
                        product_id: p.id.clone(),
                        quantity: 1,
                        price: Money::from_cents(1_000),
                    }],
                    payment_method: PaymentMethod::Card,
                    transaction_ref: None,
                },
            )
            .await
            .unwrap();

        db.payments().create(&user, payment(&order.id, 1_000)).await.unwrap();
        let err = db.payments().create(&user, payment(&order.id, 1_000)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let payments = db.payments().list().await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, Money::from_cents(1_000));

        let mut pending = payment(&order.id, 250);
        pending.status = PaymentStatus::Pending;
        pending.transaction_id = None;
        db.payments().create(&user, pending).await.unwrap();

        let summary = db.payments().summary().await.unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].status, PaymentStatus::Completed);
        assert_eq!(summary[0].total, Money::from_cents(1_000));
        assert_eq!(summary[1].status, PaymentStatus::Pending);
        assert_eq!(summary[1].total, Money::from_cents(250));
    }
}
