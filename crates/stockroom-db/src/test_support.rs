//! Fixtures shared by the repository tests.

use chrono::Utc;
use stockroom_core::import::ProductDraft;
use stockroom_core::{Money, Principal, Product, ProductStatus, Tax, TaxRate};

use crate::pool::{Database, DbConfig};
use crate::repository::new_id;
use crate::repository::tax::TaxInput;

pub const ADMIN_ROLE_ID: &str = "00000000-0000-4000-8000-000000000001";

pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Inserts an active admin user and returns it as a principal.
pub async fn admin(db: &Database) -> Principal {
    let id = new_id();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (id, full_name, email, password_hash, status, role_id, created_at, updated_at)
         VALUES (?, ?, ?, 'x', 'active', ?, ?, ?)",
    )
    .bind(&id)
    .bind(format!("Admin {}", &id[..8]))
    .bind(format!("{}@example.com", &id[..8]))
    .bind(ADMIN_ROLE_ID)
    .bind(now)
    .bind(now)
    .execute(db.pool())
    .await
    .unwrap();

    Principal::new(id, "admin")
}

pub fn draft(sku: &str, category: &str, base_price: i64, stock: i64) -> ProductDraft {
    ProductDraft {
        name: format!("Product {}", sku),
        sku: sku.to_string(),
        barcode: None,
        description: None,
        category: category.to_string(),
        supplier_id: None,
        base_price: Money::from_cents(base_price),
        cost: Money::from_cents(base_price / 2),
        stock,
        reorder_level: 10,
        status: ProductStatus::Available,
    }
}

pub async fn product(db: &Database, principal: &Principal, sku: &str, stock: i64) -> Product {
    db.products()
        .create(principal, draft(sku, "General", 1_000, stock))
        .await
        .unwrap()
}

pub fn tax_input(code: &str, pct: f64, categories: &[&str]) -> TaxInput {
    TaxInput {
        name: format!("{} tax", code),
        code: code.to_string(),
        rate: TaxRate::from_percentage(pct).unwrap(),
        description: None,
        applicable_categories: categories.iter().map(|c| c.to_string()).collect(),
        is_active: true,
    }
}

pub async fn tax(db: &Database, principal: &Principal, code: &str, pct: f64, categories: &[&str]) -> Tax {
    db.taxes()
        .create(principal, tax_input(code, pct, categories))
        .await
        .unwrap()
}
