//! # Cart Repository
//!
//! Each user has at most one `active` cart. Lines capture the product name
//! and tax-inclusive price when first added; later price changes do not
//! touch lines already in a cart.
//!
//! ## Checkout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                 │
//! │  ├── load active cart + lines        (none / empty → EmptyCart)        │
//! │  ├── order::record_sale(lines)       order row, items, stock deduction │
//! │  ├── UPDATE carts SET status = 'checked_out'                           │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use stockroom_core::order::OrderLine;
use stockroom_core::stock::StockAdjustmentReport;
use stockroom_core::validation::{validate_quantity, validate_required};
use stockroom_core::{
    Cart, CartItem, CartStatus, CoreError, Order, PaymentMethod, Principal, MAX_ORDER_LINES,
};
use tracing::{debug, info};

use super::order::{record_sale, PlaceOrder};
use super::{new_id, product};
use crate::error::{DbError, DbResult};

const CART_COLUMNS: &str = "id, user_id, status, created_at, updated_at";

// =============================================================================
// Transaction Helpers
// =============================================================================

/// The principal's active cart with its lines.
async fn active_cart(conn: &mut SqliteConnection, user_id: &str) -> DbResult<Option<Cart>> {
    let sql = format!(
        "SELECT {} FROM carts WHERE user_id = ? AND status = 'active'",
        CART_COLUMNS
    );
    let cart = sqlx::query_as::<_, Cart>(&sql)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(mut cart) = cart else {
        return Ok(None);
    };

    cart.items = sqlx::query_as::<_, CartItem>(
        "SELECT cart_id, product_id, name, quantity, price FROM cart_items WHERE cart_id = ? ORDER BY rowid",
    )
    .bind(&cart.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(cart))
}

async fn touch(conn: &mut SqliteConnection, cart_id: &str) -> DbResult<()> {
    sqlx::query("UPDATE carts SET updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(cart_id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn require_cart(conn: &mut SqliteConnection, user_id: &str) -> DbResult<Cart> {
    active_cart(conn, user_id)
        .await?
        .ok_or_else(|| DbError::not_found("Cart", user_id))
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
    retries: u32,
}

impl CartRepository {
    pub fn new(pool: SqlitePool, retries: u32) -> Self {
        CartRepository { pool, retries }
    }

    /// The principal's open cart, if any.
    pub async fn get(&self, principal: &Principal) -> DbResult<Option<Cart>> {
        let mut conn = self.pool.acquire().await?;
        active_cart(&mut conn, &principal.user_id).await
    }

    /// Adds `quantity` of a product, opening a cart when needed. Adding a
    /// product already in the cart increases its quantity; a new product
    /// beyond `MAX_ORDER_LINES` lines is refused.
    pub async fn add_item(&self, principal: &Principal, product_id: &str, quantity: i64) -> DbResult<Cart> {
        validate_required("productId", product_id)?;
        validate_quantity(quantity)?;

        let mut tx = self.pool.begin().await?;

        let product = product::find(&mut *tx, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let cart_id = match active_cart(&mut *tx, &principal.user_id).await? {
            Some(cart) => cart.id,
            None => {
                let id = new_id();
                let now = Utc::now();
                sqlx::query(
                    "INSERT INTO carts (id, user_id, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(&id)
                .bind(&principal.user_id)
                .bind(CartStatus::Active)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                debug!(cart_id = %id, user = %principal.user_id, "Cart opened");
                id
            }
        };

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM cart_items WHERE cart_id = ? AND product_id = ?")
                .bind(&cart_id)
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?;

        match existing {
            Some(current) => {
                let total = current + quantity;
                validate_quantity(total)?;
                sqlx::query("UPDATE cart_items SET quantity = ? WHERE cart_id = ? AND product_id = ?")
                    .bind(total)
                    .bind(&cart_id)
                    .bind(product_id)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE cart_id = ?")
                    .bind(&cart_id)
                    .fetch_one(&mut *tx)
                    .await?;
                if lines >= MAX_ORDER_LINES as i64 {
                    return Err(CoreError::TooManyLines {
                        max: MAX_ORDER_LINES,
                    }
                    .into());
                }

                sqlx::query(
                    "INSERT INTO cart_items (cart_id, product_id, name, quantity, price) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(&cart_id)
                .bind(product_id)
                .bind(&product.name)
                .bind(quantity)
                .bind(product.price_with_tax)
                .execute(&mut *tx)
                .await?;
            }
        }

        touch(&mut *tx, &cart_id).await?;
        let cart = require_cart(&mut *tx, &principal.user_id).await?;
        tx.commit().await?;

        info!(cart_id = %cart.id, product_id = %product_id, quantity, user = %principal.user_id, "Added to cart");
        Ok(cart)
    }

    /// Sets a line's quantity. Zero or less removes the line.
    pub async fn update_quantity(
        &self,
        principal: &Principal,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<Cart> {
        if quantity <= 0 {
            return self.remove_item(principal, product_id).await;
        }
        validate_quantity(quantity)?;

        let mut tx = self.pool.begin().await?;
        let cart = require_cart(&mut *tx, &principal.user_id).await?;

        let result = sqlx::query("UPDATE cart_items SET quantity = ? WHERE cart_id = ? AND product_id = ?")
            .bind(quantity)
            .bind(&cart.id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart item", product_id));
        }

        touch(&mut *tx, &cart.id).await?;
        let cart = require_cart(&mut *tx, &principal.user_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    /// Removes a product's line from the open cart.
    pub async fn remove_item(&self, principal: &Principal, product_id: &str) -> DbResult<Cart> {
        let mut tx = self.pool.begin().await?;
        let cart = require_cart(&mut *tx, &principal.user_id).await?;

        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = ? AND product_id = ?")
            .bind(&cart.id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart item", product_id));
        }

        touch(&mut *tx, &cart.id).await?;
        let cart = require_cart(&mut *tx, &principal.user_id).await?;
        tx.commit().await?;

        debug!(cart_id = %cart.id, product_id = %product_id, "Removed from cart");
        Ok(cart)
    }

    /// Turns the open cart into a paid order at the captured prices.
    ///
    /// ## Errors
    /// - `Core(EmptyCart)` when there is no open cart or it has no lines
    /// - `Conflict` when a stock line kept losing its version check
    pub async fn checkout(
        &self,
        principal: &Principal,
        payment_method: PaymentMethod,
        transaction_ref: Option<String>,
    ) -> DbResult<(Order, StockAdjustmentReport)> {
        let mut tx = self.pool.begin().await?;

        let cart = match active_cart(&mut *tx, &principal.user_id).await? {
            Some(cart) if !cart.items.is_empty() => cart,
            _ => return Err(CoreError::EmptyCart.into()),
        };

        let input = PlaceOrder {
            items: cart
                .items
                .iter()
                .map(|item| OrderLine {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
            payment_method,
            transaction_ref,
        };
        let (order, report) = record_sale(&mut *tx, principal, &input, self.retries).await?;

        sqlx::query("UPDATE carts SET status = ?, updated_at = ? WHERE id = ?")
            .bind(CartStatus::CheckedOut)
            .bind(Utc::now())
            .bind(&cart.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            cart_id = %cart.id,
            order_id = %order.id,
            total = %order.total,
            user = %principal.user_id,
            "Cart checked out"
        );
        Ok((order, report))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::tax::TaxPatch;
    use crate::test_support::{admin, product, tax, test_db};
    use stockroom_core::{Money, OrderStatus};

    #[tokio::test]
    async fn test_add_merges_lines_and_snapshots_price() {
        let db = test_db().await;
        let user = admin(&db).await;
        let vat = tax(&db, &user, "VAT", 10.0, &["General"]).await;
        let p = product(&db, &user, "A1", 10).await;
        assert_eq!(p.price_with_tax, Money::from_cents(1_100));

        db.carts().add_item(&user, &p.id, 2).await.unwrap();
        let cart = db.carts().add_item(&user, &p.id, 1).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.items[0].price, Money::from_cents(1_100));
        assert_eq!(cart.subtotal(), Money::from_cents(3_300));

        // A later tax change does not touch the captured price
        let patch = TaxPatch {
            is_active: Some(false),
            ..Default::default()
        };
        db.taxes().update(&user, &vat.id, patch).await.unwrap();
        let cart = db.carts().get(&user).await.unwrap().unwrap();
        assert_eq!(cart.items[0].price, Money::from_cents(1_100));
    }

    #[tokio::test]
    async fn test_update_and_remove_lines() {
        let db = test_db().await;
        let user = admin(&db).await;
        let a = product(&db, &user, "A1", 10).await;
        let b = product(&db, &user, "B1", 10).await;

        db.carts().add_item(&user, &a.id, 1).await.unwrap();
        db.carts().add_item(&user, &b.id, 1).await.unwrap();

        let cart = db.carts().update_quantity(&user, &a.id, 4).await.unwrap();
        assert_eq!(cart.items[0].quantity, 4);

        let cart = db.carts().update_quantity(&user, &a.id, 0).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product_id, b.id);

        let cart = db.carts().remove_item(&user, &b.id).await.unwrap();
        assert!(cart.items.is_empty());

        assert!(matches!(
            db.carts().remove_item(&user, &b.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
        assert!(matches!(
            db.carts().add_item(&user, "ghost", 1).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_cart_refuses_more_lines_than_an_order_allows() {
        let db = test_db().await;
        let user = admin(&db).await;

        let mut first = None;
        for i in 0..MAX_ORDER_LINES {
            let p = product(&db, &user, &format!("P{}", i), 5).await;
            db.carts().add_item(&user, &p.id, 1).await.unwrap();
            if first.is_none() {
                first = Some(p.id);
            }
        }

        let extra = product(&db, &user, "EXTRA", 5).await;
        let err = db.carts().add_item(&user, &extra.id, 1).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::TooManyLines { .. })));

        // Topping up an existing line is still fine
        let cart = db.carts().add_item(&user, &first.unwrap(), 1).await.unwrap();
        assert_eq!(cart.items.len(), MAX_ORDER_LINES);
        assert_eq!(cart.items[0].quantity, 2);

        let (order, _) = db
            .carts()
            .checkout(&user, PaymentMethod::Cash, None)
            .await
            .unwrap();
        assert_eq!(order.items.len(), MAX_ORDER_LINES);
    }

    #[tokio::test]
    async fn test_checkout_places_order_and_closes_cart() {
        let db = test_db().await;
        let user = admin(&db).await;
        let p = product(&db, &user, "A1", 5).await;

        db.carts().add_item(&user, &p.id, 2).await.unwrap();
        let (order, report) = db
            .carts()
            .checkout(&user, PaymentMethod::Cash, None)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.total, Money::from_cents(2_000));
        assert_eq!(report.adjusted[0].after, 3);
        assert!(db.carts().get(&user).await.unwrap().is_none());

        let err = db
            .carts()
            .checkout(&user, PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::EmptyCart)));

        // A new cart can be opened after checkout
        let cart = db.carts().add_item(&user, &p.id, 1).await.unwrap();
        assert_eq!(cart.items.len(), 1);
    }
}
