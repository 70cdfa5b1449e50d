//! # Access Control Repository
//!
//! Roles, permissions and the role → permission assignment.
//!
//! ## Model
//! ```text
//! ┌──────────┐      ┌──────────────────┐      ┌──────────────┐
//! │  roles   │ 1──* │ role_permissions │ *──1 │ permissions  │
//! └──────────┘      └──────────────────┘      └──────────────┘
//!      1
//!      │
//!      *
//! ┌──────────┐
//! │  users   │   (role_id)
//! └──────────┘
//! ```
//!
//! Batch creation is all-or-nothing for roles: one bad entry rejects the
//! whole request. Permission batches skip names that already exist.

use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use stockroom_core::validation::validate_name;
use stockroom_core::{Permission, Principal, Role};
use tracing::{debug, info};

use super::new_id;
use crate::error::{DbError, DbResult};

const ROLE_COLUMNS: &str = "id, name, description, created_at, updated_at";
const PERMISSION_COLUMNS: &str = "id, name, description, created_at";

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Permission ids.
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Replaces the role's permissions when present.
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Finds a role by id, or by case-insensitive name.
pub(crate) async fn find_role(conn: &mut SqliteConnection, id_or_name: &str) -> DbResult<Option<Role>> {
    let sql = format!(
        "SELECT {} FROM roles WHERE id = ?1 OR name = ?1 COLLATE NOCASE LIMIT 1",
        ROLE_COLUMNS
    );
    let role = sqlx::query_as::<_, Role>(&sql)
        .bind(id_or_name.trim())
        .fetch_optional(conn)
        .await?;
    Ok(role)
}

/// Fails unless every id names an existing permission.
async fn check_permissions(conn: &mut SqliteConnection, ids: &[String], message: &str) -> DbResult<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM permissions WHERE id IN (");
    let mut list = qb.separated(", ");
    for id in ids {
        list.push_bind(id.clone());
    }
    list.push_unseparated(")");

    let found: i64 = qb.build_query_scalar().fetch_one(&mut *conn).await?;
    if found as usize != ids.len() {
        return Err(DbError::invalid_reference(message));
    }
    Ok(())
}

async fn replace_permissions(conn: &mut SqliteConnection, role_id: &str, ids: &[String]) -> DbResult<()> {
    sqlx::query("DELETE FROM role_permissions WHERE role_id = ?")
        .bind(role_id)
        .execute(&mut *conn)
        .await?;

    for id in ids {
        sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES (?, ?)")
            .bind(role_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Attaches each role's permissions, sorted by name.
async fn populate(conn: &mut SqliteConnection, roles: &mut [Role]) -> DbResult<()> {
    let rows = sqlx::query_as::<_, (String, String, String, Option<String>, chrono::DateTime<Utc>)>(
        r#"
        SELECT rp.role_id, p.id, p.name, p.description, p.created_at
        FROM role_permissions rp
        JOIN permissions p ON p.id = rp.permission_id
        ORDER BY p.name
        "#,
    )
    .fetch_all(conn)
    .await?;

    let mut by_role: HashMap<String, Vec<Permission>> = HashMap::new();
    for (role_id, id, name, description, created_at) in rows {
        by_role.entry(role_id).or_default().push(Permission {
            id,
            name,
            description,
            created_at,
        });
    }

    for role in roles.iter_mut() {
        role.permissions = by_role.remove(&role.id).unwrap_or_default();
    }
    Ok(())
}

fn dedup(ids: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.trim().to_string();
        if !id.is_empty() && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct AccessRepository {
    pool: SqlitePool,
}

impl AccessRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AccessRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Roles
    // -------------------------------------------------------------------------

    pub async fn list_roles(&self) -> DbResult<Vec<Role>> {
        debug!("Listing roles");
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {} FROM roles ORDER BY name", ROLE_COLUMNS);
        let mut roles = sqlx::query_as::<_, Role>(&sql).fetch_all(&mut *conn).await?;
        populate(&mut conn, &mut roles).await?;
        Ok(roles)
    }

    pub async fn get_role(&self, id: &str) -> DbResult<Role> {
        let mut conn = self.pool.acquire().await?;
        let role = find_role(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Role", id))?;
        let mut roles = [role];
        populate(&mut conn, &mut roles).await?;
        let [role] = roles;
        Ok(role)
    }

    /// Creates every role or none.
    ///
    /// ## Errors
    /// - `UniqueViolation` naming every role that already exists
    /// - `ForeignKeyViolation` when a role lists an unknown permission
    pub async fn create_roles(&self, principal: &Principal, inputs: Vec<RoleInput>) -> DbResult<Vec<Role>> {
        let mut tx = self.pool.begin().await?;

        let mut names: Vec<String> = Vec::with_capacity(inputs.len());
        for input in &inputs {
            validate_name("name", &input.name)?;
            names.push(input.name.trim().to_string());
        }

        let mut taken = Vec::new();
        for name in &names {
            if find_role(&mut *tx, name).await?.is_some() {
                taken.push(name.clone());
            }
        }
        if !taken.is_empty() {
            return Err(DbError::duplicate("role", taken.join(", ")));
        }

        let mut created = Vec::with_capacity(inputs.len());
        for (input, name) in inputs.into_iter().zip(names) {
            let permissions = dedup(input.permissions);
            check_permissions(
                &mut *tx,
                &permissions,
                &format!("Invalid permissions for role \"{}\"", name),
            )
            .await?;

            let now = Utc::now();
            let role = Role {
                id: new_id(),
                name,
                description: clean_description(input.description),
                permissions: Vec::new(),
                created_at: now,
                updated_at: now,
            };

            sqlx::query(
                "INSERT INTO roles (id, name, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&role.id)
            .bind(&role.name)
            .bind(&role.description)
            .bind(role.created_at)
            .bind(role.updated_at)
            .execute(&mut *tx)
            .await?;

            replace_permissions(&mut *tx, &role.id, &permissions).await?;
            created.push(role);
        }

        populate(&mut *tx, &mut created).await?;
        tx.commit().await?;

        info!(count = created.len(), user = %principal.user_id, "Roles created");
        Ok(created)
    }

    pub async fn update_role(&self, principal: &Principal, id: &str, patch: RolePatch) -> DbResult<Role> {
        let mut tx = self.pool.begin().await?;

        let mut role = find_role(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Role", id))?;

        if let Some(name) = patch.name {
            validate_name("name", &name)?;
            let name = name.trim().to_string();
            if let Some(other) = find_role(&mut *tx, &name).await? {
                if other.id != role.id {
                    return Err(DbError::duplicate("role", name));
                }
            }
            role.name = name;
        }
        if patch.description.is_some() {
            role.description = clean_description(patch.description);
        }
        role.updated_at = Utc::now();

        sqlx::query("UPDATE roles SET name = ?, description = ?, updated_at = ? WHERE id = ?")
            .bind(&role.name)
            .bind(&role.description)
            .bind(role.updated_at)
            .bind(&role.id)
            .execute(&mut *tx)
            .await?;

        if let Some(permissions) = patch.permissions {
            let permissions = dedup(permissions);
            check_permissions(&mut *tx, &permissions, "Some permissions are invalid").await?;
            replace_permissions(&mut *tx, &role.id, &permissions).await?;
        }

        let mut roles = [role];
        populate(&mut *tx, &mut roles).await?;
        tx.commit().await?;

        let [role] = roles;
        info!(role_id = %role.id, user = %principal.user_id, "Role updated");
        Ok(role)
    }

    /// Deletes a role that no user holds.
    pub async fn delete_role(&self, principal: &Principal, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let role = find_role(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Role", id))?;

        let holders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role_id = ?")
            .bind(&role.id)
            .fetch_one(&mut *tx)
            .await?;
        if holders > 0 {
            return Err(DbError::Conflict(format!(
                "Role {} is assigned to {} user(s)",
                role.name, holders
            )));
        }

        sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(&role.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(role_id = %role.id, name = %role.name, user = %principal.user_id, "Role deleted");
        Ok(())
    }

    /// Replaces a role's permissions.
    pub async fn assign_permissions(
        &self,
        principal: &Principal,
        role_id: &str,
        permission_ids: Vec<String>,
    ) -> DbResult<Role> {
        let patch = RolePatch {
            permissions: Some(permission_ids),
            ..Default::default()
        };
        let role = self.update_role(principal, role_id, patch).await?;
        info!(role_id = %role.id, permissions = role.permissions.len(), "Permissions assigned");
        Ok(role)
    }

    // -------------------------------------------------------------------------
    // Permissions
    // -------------------------------------------------------------------------

    pub async fn list_permissions(&self) -> DbResult<Vec<Permission>> {
        let sql = format!("SELECT {} FROM permissions ORDER BY name", PERMISSION_COLUMNS);
        let permissions = sqlx::query_as::<_, Permission>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(permissions)
    }

    /// Creates the permissions whose names are new. Names are lower-cased.
    ///
    /// Fails with `Conflict` when every name already exists.
    pub async fn create_permissions(
        &self,
        principal: &Principal,
        inputs: Vec<PermissionInput>,
    ) -> DbResult<Vec<Permission>> {
        for input in &inputs {
            validate_name("name", &input.name)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut created: Vec<Permission> = Vec::new();

        for input in inputs {
            let name = input.name.trim().to_lowercase();
            if created.iter().any(|p| p.name == name) {
                continue;
            }

            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM permissions WHERE name = ?")
                .bind(&name)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_some() {
                debug!(name = %name, "Permission already exists");
                continue;
            }

            let permission = Permission {
                id: new_id(),
                name,
                description: clean_description(input.description),
                created_at: Utc::now(),
            };
            sqlx::query("INSERT INTO permissions (id, name, description, created_at) VALUES (?, ?, ?, ?)")
                .bind(&permission.id)
                .bind(&permission.name)
                .bind(&permission.description)
                .bind(permission.created_at)
                .execute(&mut *tx)
                .await?;
            created.push(permission);
        }

        if created.is_empty() {
            return Err(DbError::Conflict("All permissions already exist".to_string()));
        }

        tx.commit().await?;

        info!(count = created.len(), user = %principal.user_id, "Permissions created");
        Ok(created)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
