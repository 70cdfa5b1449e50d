//! Category repository.
//!
//! Categories are free labels. Products store the category name, not the
//! id, so renaming or deleting a category never touches products.

use chrono::Utc;
use sqlx::SqlitePool;
use stockroom_core::validation::validate_name;
use stockroom_core::{Category, Principal};
use tracing::{debug, info};

use super::new_id;
use crate::error::{DbError, DbResult};

const CATEGORY_COLUMNS: &str = "id, name, user_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Category>> {
        debug!("Listing categories");
        let sql = format!("SELECT {} FROM categories ORDER BY name", CATEGORY_COLUMNS);
        let categories = sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    pub async fn get(&self, id: &str) -> DbResult<Category> {
        let sql = format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS);
        sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Creates a category owned by `principal`.
    pub async fn create(&self, principal: &Principal, name: &str) -> DbResult<Category> {
        let name = name.trim();
        validate_name("name", name)?;

        let now = Utc::now();
        let category = Category {
            id: new_id(),
            name: name.to_string(),
            user_id: principal.user_id.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO categories (id, name, user_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.user_id)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;

        info!(category_id = %category.id, name = %category.name, user = %principal.user_id, "Category created");
        Ok(category)
    }

    pub async fn rename(&self, principal: &Principal, id: &str, name: &str) -> DbResult<Category> {
        let name = name.trim();
        validate_name("name", name)?;

        let result = sqlx::query("UPDATE categories SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        info!(category_id = %id, name = %name, user = %principal.user_id, "Category renamed");
        self.get(id).await
    }

    /// Deletes a category and returns what was removed.
    pub async fn delete(&self, principal: &Principal, id: &str) -> DbResult<Category> {
        let category = self.get(id).await?;

        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!(category_id = %id, user = %principal.user_id, "Category deleted");
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, test_db};

    #[tokio::test]
    async fn test_category_lifecycle() {
        let db = test_db().await;
        let user = admin(&db).await;
        let repo = db.categories();

        let snacks = repo.create(&user, "  Snacks ").await.unwrap();
        assert_eq!(snacks.name, "Snacks");
        assert_eq!(snacks.user_id, user.user_id);

        let renamed = repo.rename(&user, &snacks.id, "Chips").await.unwrap();
        assert_eq!(renamed.name, "Chips");

        let removed = repo.delete(&user, &snacks.id).await.unwrap();
        assert_eq!(removed.id, snacks.id);
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_category_missing_and_invalid() {
        let db = test_db().await;
        let user = admin(&db).await;
        let repo = db.categories();

        assert!(matches!(
            repo.create(&user, "   ").await.unwrap_err(),
            DbError::Core(_)
        ));
        assert!(matches!(
            repo.rename(&user, "ghost", "x").await.unwrap_err(),
            DbError::NotFound { .. }
        ));
        assert!(matches!(
            repo.delete(&user, "ghost").await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_category_requires_known_principal() {
        let db = test_db().await;
        let stranger = Principal::new("nobody", "admin");

        let err = db.categories().create(&stranger, "Drinks").await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
