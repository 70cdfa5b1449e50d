//! # Tax Repository
//!
//! Stores tax rules and resolves the tax-inclusive price for a category.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  price_for("Snacks", 100.00)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT ... FROM taxes WHERE is_active = 1                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pricing::resolve_tax(taxes, "Snacks", precedence)                     │
//! │       │                                                                 │
//! │       ├── VAT 15% matches  ──► 115.00                                  │
//! │       └── nothing matches  ──► 100.00 (no error)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Under [`TaxPrecedence::Exclusive`] writes are rejected when an active rule
//! would share a category with another active rule, so resolution never has
//! to choose.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use stockroom_core::pricing::{self, TaxPrecedence};
use stockroom_core::validation::{validate_code, validate_name};
use stockroom_core::{CoreError, Money, Principal, Tax, TaxRate};
use tracing::{debug, info};

use super::new_id;
use crate::error::{DbError, DbResult};

const TAX_COLUMNS: &str = "id, name, code, rate, description, applicable_categories, is_active, \
     created_by, updated_by, created_at, updated_at";

/// Fields for a new tax rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxInput {
    pub name: String,
    pub code: String,
    pub rate: TaxRate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub applicable_categories: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial update of a tax rule. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxPatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub rate: Option<TaxRate>,
    pub description: Option<String>,
    pub applicable_categories: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Trimmed, non-empty, first occurrence kept.
fn clean_categories(categories: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(categories.len());
    for category in categories {
        let category = category.trim().to_string();
        if !category.is_empty() && !out.contains(&category) {
            out.push(category);
        }
    }
    out
}

/// Active rules, oldest first. Used inside product and order transactions.
pub(crate) async fn load_active(conn: &mut SqliteConnection) -> DbResult<Vec<Tax>> {
    let sql = format!(
        "SELECT {} FROM taxes WHERE is_active = 1 ORDER BY created_at, id",
        TAX_COLUMNS
    );
    let taxes = sqlx::query_as::<_, Tax>(&sql).fetch_all(conn).await?;
    Ok(taxes)
}

#[derive(Debug, Clone)]
pub struct TaxRepository {
    pool: SqlitePool,
    precedence: TaxPrecedence,
}

impl TaxRepository {
    pub fn new(pool: SqlitePool, precedence: TaxPrecedence) -> Self {
        TaxRepository { pool, precedence }
    }

    pub fn precedence(&self) -> TaxPrecedence {
        self.precedence
    }

    /// All rules, newest first.
    pub async fn list(&self) -> DbResult<Vec<Tax>> {
        let sql = format!("SELECT {} FROM taxes ORDER BY created_at DESC, id", TAX_COLUMNS);
        let taxes = sqlx::query_as::<_, Tax>(&sql).fetch_all(&self.pool).await?;
        Ok(taxes)
    }

    pub async fn list_active(&self) -> DbResult<Vec<Tax>> {
        let mut conn = self.pool.acquire().await?;
        load_active(&mut conn).await
    }

    pub async fn get(&self, id: &str) -> DbResult<Tax> {
        let sql = format!("SELECT {} FROM taxes WHERE id = ?", TAX_COLUMNS);
        sqlx::query_as::<_, Tax>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Tax", id))
    }

    /// Tax-inclusive price of `base` in `category` under the configured
    /// precedence. Unmatched categories return `base`.
    pub async fn price_for(&self, category: &str, base: Money) -> DbResult<Money> {
        let taxes = self.list_active().await?;
        Ok(pricing::compute_tax_inclusive_price(
            &taxes,
            category,
            base,
            self.precedence,
        ))
    }

    /// Creates a rule. The code is stored upper-cased.
    ///
    /// ## Errors
    /// - `UniqueViolation` when the name or code is taken
    /// - `Core(OverlappingTax)` under exclusive precedence
    pub async fn create(&self, principal: &Principal, input: TaxInput) -> DbResult<Tax> {
        let now = Utc::now();
        let tax = Tax {
            id: new_id(),
            name: input.name.trim().to_string(),
            code: input.code.trim().to_uppercase(),
            rate: input.rate,
            description: input.description,
            applicable_categories: clean_categories(input.applicable_categories),
            is_active: input.is_active,
            created_by: Some(principal.user_id.clone()),
            updated_by: Some(principal.user_id.clone()),
            created_at: now,
            updated_at: now,
        };

        validate_name("name", &tax.name)?;
        validate_code("code", &tax.code)?;

        let mut tx = self.pool.begin().await?;
        self.check_unique(&mut *tx, &tax).await?;
        self.check_exclusive(&mut *tx, &tax).await?;

        let categories = serde_json::to_string(&tax.applicable_categories)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO taxes (
                id, name, code, rate, description, applicable_categories,
                is_active, created_by, updated_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&tax.id)
        .bind(&tax.name)
        .bind(&tax.code)
        .bind(tax.rate)
        .bind(&tax.description)
        .bind(categories)
        .bind(tax.is_active)
        .bind(&tax.created_by)
        .bind(&tax.updated_by)
        .bind(tax.created_at)
        .bind(tax.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(tax_id = %tax.id, code = %tax.code, user = %principal.user_id, "Tax created");
        Ok(tax)
    }

    pub async fn update(&self, principal: &Principal, id: &str, patch: TaxPatch) -> DbResult<Tax> {
        let mut tax = self.get(id).await?;

        if let Some(name) = patch.name {
            tax.name = name.trim().to_string();
        }
        if let Some(code) = patch.code {
            tax.code = code.trim().to_uppercase();
        }
        if let Some(rate) = patch.rate {
            tax.rate = rate;
        }
        if patch.description.is_some() {
            tax.description = patch.description;
        }
        if let Some(categories) = patch.applicable_categories {
            tax.applicable_categories = clean_categories(categories);
        }
        if let Some(active) = patch.is_active {
            tax.is_active = active;
        }
        tax.updated_by = Some(principal.user_id.clone());
        tax.updated_at = Utc::now();

        validate_name("name", &tax.name)?;
        validate_code("code", &tax.code)?;

        let mut tx = self.pool.begin().await?;
        self.check_unique(&mut *tx, &tax).await?;
        self.check_exclusive(&mut *tx, &tax).await?;

        let categories = serde_json::to_string(&tax.applicable_categories)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            UPDATE taxes SET
                name = ?, code = ?, rate = ?, description = ?,
                applicable_categories = ?, is_active = ?,
                updated_by = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&tax.name)
        .bind(&tax.code)
        .bind(tax.rate)
        .bind(&tax.description)
        .bind(categories)
        .bind(tax.is_active)
        .bind(&tax.updated_by)
        .bind(tax.updated_at)
        .bind(&tax.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(tax_id = %tax.id, user = %principal.user_id, "Tax updated");
        Ok(tax)
    }

    pub async fn delete(&self, principal: &Principal, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM taxes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Tax", id));
        }

        info!(tax_id = %id, user = %principal.user_id, "Tax deleted");
        Ok(())
    }

    async fn check_unique(&self, conn: &mut SqliteConnection, tax: &Tax) -> DbResult<()> {
        let clash: Option<(String, String)> = sqlx::query_as(
            "SELECT name, code FROM taxes WHERE (name = ? OR code = ?) AND id != ? LIMIT 1",
        )
        .bind(&tax.name)
        .bind(&tax.code)
        .bind(&tax.id)
        .fetch_optional(&mut *conn)
        .await?;

        match clash {
            Some((name, _)) if name == tax.name => Err(DbError::duplicate("name", &tax.name)),
            Some(_) => Err(DbError::duplicate("code", &tax.code)),
            None => Ok(()),
        }
    }

    async fn check_exclusive(&self, conn: &mut SqliteConnection, tax: &Tax) -> DbResult<()> {
        if self.precedence != TaxPrecedence::Exclusive {
            return Ok(());
        }

        let existing = load_active(conn).await?;
        if let Some((code, category)) = pricing::find_overlap(tax, &existing) {
            debug!(code = %code, category = %category, "Rejected overlapping tax");
            return Err(CoreError::OverlappingTax { code, category }.into());
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
