//! # Supplier Repository
//!
//! Supplier CRUD and the supplier spreadsheet import.
//!
//! Phone is unique. Email is unique when present and stored lower-cased.
//! Both are checked before writing so callers get the offending field back
//! instead of a bare constraint name.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use stockroom_core::import::{parse_supplier_row, ImportReport, RawRow, SeenKeys, SupplierDraft};
use stockroom_core::{Principal, Supplier, SupplierStatus};
use tracing::{debug, info};

use super::new_id;
use crate::error::{DbError, DbResult};

const SUPPLIER_COLUMNS: &str = "id, name, contact_person_name, contact_person_phone, phone, email, \
     address, status, created_at, updated_at";

/// Partial supplier update. Absent fields keep their value; a blank string
/// clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub contact_person_name: Option<String>,
    pub contact_person_phone: Option<String>,
    pub status: Option<SupplierStatus>,
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Supplier>> {
    let sql = format!("SELECT {} FROM suppliers WHERE id = ?", SUPPLIER_COLUMNS);
    let supplier = sqlx::query_as::<_, Supplier>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(supplier)
}

/// Which of `phone` / `email` another supplier already holds.
async fn contact_owner(
    conn: &mut SqliteConnection,
    phone: &str,
    email: Option<&str>,
    exclude: Option<&str>,
) -> DbResult<Option<DbError>> {
    let owner = sqlx::query_as::<_, (String, Option<String>)>(
        r#"
        SELECT phone, email FROM suppliers
        WHERE (phone = ?1 OR (?2 IS NOT NULL AND email = ?2))
          AND id != COALESCE(?3, '')
        LIMIT 1
        "#,
    )
    .bind(phone)
    .bind(email)
    .bind(exclude)
    .fetch_optional(conn)
    .await?;

    Ok(owner.map(|(owner_phone, _)| {
        if owner_phone == phone {
            DbError::duplicate("phone", phone)
        } else {
            DbError::duplicate("email", email.unwrap_or_default())
        }
    }))
}

async fn insert(conn: &mut SqliteConnection, draft: SupplierDraft) -> DbResult<Supplier> {
    let now = Utc::now();
    let supplier = Supplier {
        id: new_id(),
        name: draft.name,
        contact_person_name: draft.contact_person_name,
        contact_person_phone: draft.contact_person_phone,
        phone: draft.phone,
        email: draft.email,
        address: draft.address,
        status: draft.status,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO suppliers (
            id, name, contact_person_name, contact_person_phone, phone, email,
            address, status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&supplier.id)
    .bind(&supplier.name)
    .bind(&supplier.contact_person_name)
    .bind(&supplier.contact_person_phone)
    .bind(&supplier.phone)
    .bind(&supplier.email)
    .bind(&supplier.address)
    .bind(supplier.status)
    .bind(supplier.created_at)
    .bind(supplier.updated_at)
    .execute(conn)
    .await?;

    Ok(supplier)
}

fn blank_to_none(value: String) -> Option<String> {
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        debug!("Listing suppliers");
        let sql = format!("SELECT {} FROM suppliers ORDER BY name", SUPPLIER_COLUMNS);
        let suppliers = sqlx::query_as::<_, Supplier>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(suppliers)
    }

    pub async fn get(&self, id: &str) -> DbResult<Supplier> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn create(&self, principal: &Principal, draft: SupplierDraft) -> DbResult<Supplier> {
        let draft = draft.normalized();
        draft.validate()?;

        let mut tx = self.pool.begin().await?;
        if let Some(err) = contact_owner(&mut *tx, &draft.phone, draft.email.as_deref(), None).await? {
            return Err(err);
        }
        let supplier = insert(&mut *tx, draft).await?;
        tx.commit().await?;

        info!(supplier_id = %supplier.id, name = %supplier.name, user = %principal.user_id, "Supplier created");
        Ok(supplier)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        patch: SupplierPatch,
    ) -> DbResult<Supplier> {
        let mut tx = self.pool.begin().await?;

        let current = find(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))?;

        let draft = SupplierDraft {
            name: patch.name.unwrap_or(current.name),
            phone: patch.phone.unwrap_or(current.phone),
            email: patch.email.map_or(current.email, blank_to_none),
            address: patch.address.map_or(current.address, blank_to_none),
            contact_person_name: patch
                .contact_person_name
                .map_or(current.contact_person_name, blank_to_none),
            contact_person_phone: patch
                .contact_person_phone
                .map_or(current.contact_person_phone, blank_to_none),
            status: patch.status.unwrap_or(current.status),
        }
        .normalized();
        draft.validate()?;

        if let Some(err) = contact_owner(&mut *tx, &draft.phone, draft.email.as_deref(), Some(id)).await? {
            return Err(err);
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE suppliers SET
                name = ?, contact_person_name = ?, contact_person_phone = ?,
                phone = ?, email = ?, address = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.contact_person_name)
        .bind(&draft.contact_person_phone)
        .bind(&draft.phone)
        .bind(&draft.email)
        .bind(&draft.address)
        .bind(draft.status)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(supplier_id = %id, user = %principal.user_id, "Supplier updated");
        Ok(Supplier {
            id: current.id,
            name: draft.name,
            contact_person_name: draft.contact_person_name,
            contact_person_phone: draft.contact_person_phone,
            phone: draft.phone,
            email: draft.email,
            address: draft.address,
            status: draft.status,
            created_at: current.created_at,
            updated_at: now,
        })
    }

    /// Deletes a supplier. Products keep existing with no supplier; a
    /// supplier still named on a purchase order cannot be deleted.
    pub async fn delete(&self, principal: &Principal, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        info!(supplier_id = %id, user = %principal.user_id, "Supplier deleted");
        Ok(())
    }

    /// Imports decoded spreadsheet rows in one transaction.
    ///
    /// A row is skipped when it fails validation, repeats a phone or email
    /// seen earlier in the file, or collides with an existing supplier.
    pub async fn import_rows(&self, principal: &Principal, rows: &[RawRow]) -> DbResult<ImportReport> {
        let mut report = ImportReport::default();
        let mut seen = SeenKeys::new();

        let mut tx = self.pool.begin().await?;

        for row in rows.iter().filter(|r| !r.is_blank()) {
            let draft = match parse_supplier_row(row) {
                Ok(draft) => draft,
                Err(reason) => {
                    report.skip(row.number, reason);
                    continue;
                }
            };

            if !seen.claim(&[("phone", Some(draft.phone.as_str())), ("email", draft.email.as_deref())]) {
                report.skip(row.number, "Duplicate phone or email in file");
                continue;
            }
            if contact_owner(&mut *tx, &draft.phone, draft.email.as_deref(), None)
                .await?
                .is_some()
            {
                report.skip(row.number, "Phone or email already exists");
                continue;
            }

            insert(&mut *tx, draft).await?;
            report.add();
        }

        tx.commit().await?;

        info!(
            added = report.added,
            skipped = report.skipped,
            user = %principal.user_id,
            "Supplier import finished"
        );
        Ok(report)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, draft, test_db};

    fn supplier(name: &str, phone: &str, email: Option<&str>) -> SupplierDraft {
        SupplierDraft {
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.map(str::to_string),
            address: None,
            contact_person_name: None,
            contact_person_phone: None,
            status: SupplierStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_and_rejects_duplicates() {
        let db = test_db().await;
        let user = admin(&db).await;
        let repo = db.suppliers();

        let acme = repo
            .create(&user, supplier(" Acme ", "0300 1234567", Some("Sales@Acme.io")))
            .await
            .unwrap();
        assert_eq!(acme.name, "Acme");
        assert_eq!(acme.email.as_deref(), Some("sales@acme.io"));

        let err = repo
            .create(&user, supplier("Other", "0300 1234567", None))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "phone"));

        let err = repo
            .create(&user, supplier("Other", "0311 7654321", Some("sales@acme.io")))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = test_db().await;
        let user = admin(&db).await;
        let repo = db.suppliers();

        let acme = repo.create(&user, supplier("Acme", "0300 1234567", None)).await.unwrap();
        let patch = SupplierPatch {
            address: Some("12 Mall Road".to_string()),
            status: Some(SupplierStatus::Inactive),
            ..Default::default()
        };
        let updated = repo.update(&user, &acme.id, patch).await.unwrap();
        assert_eq!(updated.address.as_deref(), Some("12 Mall Road"));
        assert_eq!(updated.status, SupplierStatus::Inactive);
        assert_eq!(repo.get(&acme.id).await.unwrap().status, SupplierStatus::Inactive);

        repo.delete(&user, &acme.id).await.unwrap();
        assert!(matches!(
            repo.get(&acme.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_delete_detaches_products() {
        let db = test_db().await;
        let user = admin(&db).await;
        let acme = db
            .suppliers()
            .create(&user, supplier("Acme", "0300 1234567", None))
            .await
            .unwrap();

        let mut d = draft("A1", "General", 100, 1);
        d.supplier_id = Some(acme.id.clone());
        let p = db.products().create(&user, d).await.unwrap();

        db.suppliers().delete(&user, &acme.id).await.unwrap();
        assert_eq!(db.products().get(&p.id).await.unwrap().supplier_id, None);
    }

    #[tokio::test]
    async fn test_import_rows_reports_each_skip() {
        let db = test_db().await;
        let user = admin(&db).await;
        db.suppliers()
            .create(&user, supplier("Existing", "0300 0000000", Some("old@x.io")))
            .await
            .unwrap();

        let rows = vec![
            RawRow::from_pairs(2, [("name", "Acme"), ("email", "a@x.io"), ("phone", "0300 1111111")]),
            RawRow::from_pairs(3, [("name", "Acme 2"), ("email", "A@x.io"), ("phone", "0300 2222222")]),
            RawRow::from_pairs(4, [("name", "No Phone"), ("email", "b@x.io")]),
            RawRow::from_pairs(5, [("name", "Old"), ("email", "old@x.io"), ("phone", "0300 3333333")]),
            RawRow::from_pairs(6, [("name", ""), ("email", ""), ("phone", "")]),
        ];

        let report = db.suppliers().import_rows(&user, &rows).await.unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.skipped, 3);
        assert_eq!(report.errors[0], "Row 3: Duplicate phone or email in file");
        assert!(report.errors[1].starts_with("Row 4: Missing required fields"));
        assert_eq!(report.errors[2], "Row 5: Phone or email already exists");
        assert_eq!(db.suppliers().list().await.unwrap().len(), 2);
    }
}
