//! # Product Repository
//!
//! Catalogue reads and writes, tax-inclusive pricing on write, and the
//! spreadsheet import pipeline.
//!
//! ## Price Caching
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create / update (price or category changed)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │  ├── tax::load_active(tx)                                              │
//! │  ├── pricing::compute_tax_inclusive_price(...)  → price_with_tax       │
//! │  ├── INSERT / UPDATE products ... version = version + 1                │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The tax lookup and the product write share a transaction, so a product
//! never stores a price computed from a rule set it did not commit against.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use stockroom_core::import::{parse_product_row, ImportReport, ProductDraft, RawRow, SeenKeys};
use stockroom_core::pricing::{self, TaxPrecedence};
use stockroom_core::stock::status_after_stock_change;
use stockroom_core::validation::{
    validate_name, validate_price_cents, validate_sku, validate_stock_level,
};
use stockroom_core::{Money, Principal, Product, ProductStatus, Tax};
use tracing::{debug, info, warn};

use super::{new_id, tax, Page, PageRequest};
use crate::error::{DbError, DbResult};

pub(crate) const PRODUCT_COLUMNS: &str = "id, sku, barcode, name, description, category, supplier_id, \
     base_price, price_with_tax, cost, stock, reorder_level, status, version, created_at, updated_at";

// =============================================================================
// Inputs
// =============================================================================

/// List filters. `q` matches name, sku or barcode as a substring.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub q: Option<String>,
    pub category: Option<String>,
    pub status: Option<ProductStatus>,
    #[serde(alias = "supplier")]
    pub supplier_id: Option<String>,
}

/// Partial product update. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(alias = "supplier")]
    pub supplier_id: Option<String>,
    #[serde(alias = "price")]
    pub base_price: Option<Money>,
    pub cost: Option<Money>,
    pub stock: Option<i64>,
    pub reorder_level: Option<i64>,
    pub status: Option<ProductStatus>,
}

impl ProductPatch {
    fn reprices(&self) -> bool {
        self.base_price.is_some() || self.category.is_some()
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

pub(crate) async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(product)
}

/// First product other than `exclude` holding `sku` or `barcode`.
async fn code_owner(
    conn: &mut SqliteConnection,
    sku: &str,
    barcode: Option<&str>,
    exclude: Option<&str>,
) -> DbResult<Option<(String, Option<String>)>> {
    let owner = sqlx::query_as::<_, (String, Option<String>)>(
        r#"
        SELECT sku, barcode FROM products
        WHERE (sku = ?1 OR (?2 IS NOT NULL AND barcode = ?2))
          AND id != COALESCE(?3, '')
        LIMIT 1
        "#,
    )
    .bind(sku)
    .bind(barcode)
    .bind(exclude)
    .fetch_optional(conn)
    .await?;
    Ok(owner)
}

async fn supplier_exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM suppliers WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

/// Inserts a validated draft, pricing it against `taxes`.
async fn insert_draft(
    conn: &mut SqliteConnection,
    draft: ProductDraft,
    taxes: &[Tax],
    precedence: TaxPrecedence,
) -> DbResult<Product> {
    let now = Utc::now();
    let price_with_tax =
        pricing::compute_tax_inclusive_price(taxes, &draft.category, draft.base_price, precedence);

    let product = Product {
        id: new_id(),
        sku: draft.sku,
        barcode: draft.barcode,
        name: draft.name,
        description: draft.description,
        category: draft.category,
        supplier_id: draft.supplier_id,
        base_price: draft.base_price,
        price_with_tax,
        cost: draft.cost,
        stock: draft.stock,
        reorder_level: draft.reorder_level,
        status: draft.status,
        version: 0,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO products (
            id, sku, barcode, name, description, category, supplier_id,
            base_price, price_with_tax, cost, stock, reorder_level, status,
            version, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&product.id)
    .bind(&product.sku)
    .bind(&product.barcode)
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.category)
    .bind(&product.supplier_id)
    .bind(product.base_price)
    .bind(product.price_with_tax)
    .bind(product.cost)
    .bind(product.stock)
    .bind(product.reorder_level)
    .bind(product.status)
    .bind(product.version)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(conn)
    .await?;

    Ok(product)
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ProductFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", q);
        qb.push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR sku LIKE ")
            .push_bind(pattern.clone())
            .push(" OR barcode LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(supplier) = &filter.supplier_id {
        qb.push(" AND supplier_id = ").push_bind(supplier.clone());
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let product = repo.create(&principal, draft).await?;
/// let found = repo.get_by_code("COKE-330").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    precedence: TaxPrecedence,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool, precedence: TaxPrecedence) -> Self {
        ProductRepository { pool, precedence }
    }

    /// One page of products, newest first.
    pub async fn list(&self, filter: &ProductFilter, page: PageRequest) -> DbResult<Page<Product>> {
        debug!(?filter, page = page.page, limit = page.limit, "Listing products");

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM products");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM products", PRODUCT_COLUMNS));
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let products = select.build_query_as::<Product>().fetch_all(&self.pool).await?;

        Ok(Page::new(products, total, page))
    }

    pub async fn get(&self, id: &str) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Looks a scanned code up as a SKU first, then as a barcode.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Product> {
        let code = code.trim();
        let sql = format!(
            "SELECT {} FROM products WHERE sku = ?1 OR barcode = ?1 \
             ORDER BY CASE WHEN sku = ?1 THEN 0 ELSE 1 END LIMIT 1",
            PRODUCT_COLUMNS
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", code))
    }

    /// Creates one product with its tax-inclusive price.
    ///
    /// ## Errors
    /// - `Core(Validation)` for bad fields
    /// - `UniqueViolation` when the SKU or barcode is taken
    /// - `ForeignKeyViolation` for an unknown supplier
    pub async fn create(&self, principal: &Principal, draft: ProductDraft) -> DbResult<Product> {
        let draft = draft.normalized();
        draft.validate()?;

        let mut tx = self.pool.begin().await?;

        if let Some((sku, _)) =
            code_owner(&mut *tx, &draft.sku, draft.barcode.as_deref(), None).await?
        {
            return Err(if sku == draft.sku {
                DbError::duplicate("sku", &draft.sku)
            } else {
                DbError::duplicate("barcode", draft.barcode.clone().unwrap_or_default())
            });
        }
        if let Some(supplier) = &draft.supplier_id {
            if !supplier_exists(&mut *tx, supplier).await? {
                return Err(DbError::invalid_reference(format!("Unknown supplier {}", supplier)));
            }
        }

        let taxes = tax::load_active(&mut *tx).await?;
        let product = insert_draft(&mut *tx, draft, &taxes, self.precedence).await?;
        tx.commit().await?;

        info!(
            product_id = %product.id,
            sku = %product.sku,
            price_with_tax = %product.price_with_tax,
            user = %principal.user_id,
            "Product created"
        );
        Ok(product)
    }

    /// Creates a batch. Invalid or duplicate entries are skipped and
    /// reported; the rest are inserted in one transaction.
    pub async fn create_many(
        &self,
        principal: &Principal,
        drafts: Vec<ProductDraft>,
    ) -> DbResult<(Vec<Product>, ImportReport)> {
        let mut report = ImportReport::default();
        let mut created = Vec::with_capacity(drafts.len());
        let mut seen = SeenKeys::new();

        let mut tx = self.pool.begin().await?;
        let taxes = tax::load_active(&mut *tx).await?;

        for (index, draft) in drafts.into_iter().enumerate() {
            let row = index + 1;
            let draft = draft.normalized();

            if let Err(e) = draft.validate() {
                report.skip(row, e.to_string());
                continue;
            }
            if !seen.claim(&[("sku", Some(draft.sku.as_str())), ("barcode", draft.barcode.as_deref())]) {
                report.skip(row, "Duplicate SKU or barcode in request");
                continue;
            }
            if code_owner(&mut *tx, &draft.sku, draft.barcode.as_deref(), None)
                .await?
                .is_some()
            {
                report.skip(row, "SKU or barcode already exists");
                continue;
            }
            if let Some(supplier) = &draft.supplier_id {
                if !supplier_exists(&mut *tx, supplier).await? {
                    report.skip(row, "Unknown supplier");
                    continue;
                }
            }

            created.push(insert_draft(&mut *tx, draft, &taxes, self.precedence).await?);
            report.add();
        }

        tx.commit().await?;

        info!(
            added = report.added,
            skipped = report.skipped,
            user = %principal.user_id,
            "Product batch created"
        );
        Ok((created, report))
    }

    /// Applies a partial update.
    ///
    /// The tax-inclusive price is recomputed when the base price or the
    /// category is part of the patch. A stock change moves the status
    /// between `available` and `out of stock`.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        patch: ProductPatch,
    ) -> DbResult<Product> {
        let mut tx = self.pool.begin().await?;

        let mut product = find(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;
        let expected_version = product.version;
        let reprice = patch.reprices();

        if let Some(name) = patch.name {
            product.name = name.trim().to_string();
        }
        if let Some(sku) = patch.sku {
            product.sku = sku.trim().to_string();
        }
        if let Some(barcode) = patch.barcode {
            let barcode = barcode.trim().to_string();
            product.barcode = (!barcode.is_empty()).then_some(barcode);
        }
        if let Some(description) = patch.description {
            product.description = Some(description);
        }
        if let Some(category) = patch.category {
            product.category = category.trim().to_string();
        }
        if let Some(supplier) = patch.supplier_id {
            let supplier = supplier.trim().to_string();
            product.supplier_id = (!supplier.is_empty()).then_some(supplier);
        }
        if let Some(base_price) = patch.base_price {
            product.base_price = base_price;
        }
        if let Some(cost) = patch.cost {
            product.cost = cost;
        }
        if let Some(reorder_level) = patch.reorder_level {
            product.reorder_level = reorder_level;
        }
        if let Some(status) = patch.status {
            product.status = status;
        }
        if let Some(stock) = patch.stock {
            if stock != product.stock {
                product.stock = stock;
                product.status = status_after_stock_change(product.status, stock);
            }
        }

        validate_name("name", &product.name)?;
        validate_sku(&product.sku)?;
        validate_name("category", &product.category)?;
        validate_price_cents(product.base_price.cents())?;
        validate_price_cents(product.cost.cents())?;
        validate_stock_level("stock", product.stock)?;
        validate_stock_level("reorderLevel", product.reorder_level)?;

        if let Some((sku, _)) =
            code_owner(&mut *tx, &product.sku, product.barcode.as_deref(), Some(id)).await?
        {
            return Err(if sku == product.sku {
                DbError::duplicate("sku", &product.sku)
            } else {
                DbError::duplicate("barcode", product.barcode.clone().unwrap_or_default())
            });
        }
        if let Some(supplier) = &product.supplier_id {
            if !supplier_exists(&mut *tx, supplier).await? {
                return Err(DbError::invalid_reference(format!("Unknown supplier {}", supplier)));
            }
        }

        if reprice {
            let taxes = tax::load_active(&mut *tx).await?;
            product.price_with_tax = pricing::compute_tax_inclusive_price(
                &taxes,
                &product.category,
                product.base_price,
                self.precedence,
            );
        }

        product.version += 1;
        product.updated_at = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?, barcode = ?, name = ?, description = ?, category = ?,
                supplier_id = ?, base_price = ?, price_with_tax = ?, cost = ?,
                stock = ?, reorder_level = ?, status = ?,
                version = ?, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(&product.supplier_id)
        .bind(product.base_price)
        .bind(product.price_with_tax)
        .bind(product.cost)
        .bind(product.stock)
        .bind(product.reorder_level)
        .bind(product.status)
        .bind(product.version)
        .bind(product.updated_at)
        .bind(&product.id)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict(format!(
                "Product {} was modified concurrently",
                id
            )));
        }

        tx.commit().await?;

        info!(
            product_id = %product.id,
            repriced = reprice,
            user = %principal.user_id,
            "Product updated"
        );
        Ok(product)
    }

    pub async fn delete(&self, principal: &Principal, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(product_id = %id, user = %principal.user_id, "Product deleted");
        Ok(())
    }

    /// Imports spreadsheet rows.
    ///
    /// Each row is validated, checked against earlier rows in the file and
    /// against the catalogue, then inserted on its own. A failing row is
    /// reported as `Row N: reason` and never stops the rest.
    pub async fn import_rows(&self, principal: &Principal, rows: &[RawRow]) -> DbResult<ImportReport> {
        let mut report = ImportReport::default();
        let mut seen = SeenKeys::new();
        let mut conn = self.pool.acquire().await?;
        let taxes = tax::load_active(&mut conn).await?;

        for row in rows.iter().filter(|r| !r.is_blank()) {
            let draft = match parse_product_row(row) {
                Ok(draft) => draft,
                Err(reason) => {
                    report.skip(row.number, reason);
                    continue;
                }
            };

            if !seen.claim(&[("sku", Some(draft.sku.as_str())), ("barcode", draft.barcode.as_deref())]) {
                report.skip(row.number, "Duplicate SKU or barcode in file");
                continue;
            }
            if code_owner(&mut conn, &draft.sku, draft.barcode.as_deref(), None)
                .await?
                .is_some()
            {
                report.skip(row.number, "SKU or barcode already exists");
                continue;
            }
            if let Some(supplier) = &draft.supplier_id {
                if !supplier_exists(&mut conn, supplier).await? {
                    report.skip(row.number, "Unknown supplier");
                    continue;
                }
            }

            match insert_draft(&mut conn, draft, &taxes, self.precedence).await {
                Ok(_) => report.add(),
                Err(e) => {
                    warn!(row = row.number, error = %e, "Import row failed on insert");
                    report.skip(row.number, e.to_string());
                }
            }
        }

        info!(
            added = report.added,
            skipped = report.skipped,
            user = %principal.user_id,
            "Product import finished"
        );
        Ok(report)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
