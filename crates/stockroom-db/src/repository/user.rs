//! # User Repository
//!
//! Registration, credential checks and role changes.
//!
//! Passwords are hashed with Argon2id (PHC string format). The plain
//! password never leaves this module.
//!
//! ## Bootstrap
//! ```text
//! register(None, ..)        users table empty?  ── yes ──► create, default role admin
//!                                   │
//!                                   └── no ──► Conflict (an admin must register users)
//! register(Some(admin), ..) ─────────────────────────────► create, default role cashier
//! ```
//! The emptiness check runs inside the registration transaction, so two
//! concurrent bootstrap requests cannot both succeed.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use stockroom_core::validation::{validate_email, validate_name, validate_required};
use stockroom_core::{Principal, User, UserStatus, ADMIN_ROLE, DEFAULT_ROLE};
use tracing::{debug, info, warn};

use super::access::find_role;
use super::new_id;
use crate::error::{DbError, DbResult};

const USER_SELECT: &str = "SELECT u.id, u.full_name, u.email, u.password_hash, u.status, u.role_id, \
     r.name AS role_name, u.created_at, u.updated_at \
     FROM users u JOIN roles r ON r.id = u.role_id";

/// A registration entry. `role` is a role id; `roleName` a role name.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub role_name: Option<String>,
}

// =============================================================================
// Password Hashing
// =============================================================================

pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<User>> {
    let sql = format!("{} WHERE u.id = ?", USER_SELECT);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

async fn count(conn: &mut SqliteConnection) -> DbResult<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(conn)
        .await?;
    Ok(total)
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn count(&self) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        count(&mut conn).await
    }

    pub async fn get(&self, id: &str) -> DbResult<User> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!("{} ORDER BY u.created_at", USER_SELECT);
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?;
        Ok(users)
    }

    /// Registers one or more users, all or none.
    ///
    /// `registrar` is `None` only for the bootstrap registration on an
    /// empty database.
    ///
    /// ## Errors
    /// - `Core(Validation)` for a missing name, email or password
    /// - `UniqueViolation` when the name or email is taken
    /// - `ForeignKeyViolation` for an unknown role
    /// - `Conflict` for an anonymous registration once users exist
    pub async fn register(
        &self,
        registrar: Option<&Principal>,
        entries: Vec<NewUser>,
    ) -> DbResult<Vec<User>> {
        let mut tx = self.pool.begin().await?;

        let bootstrap = count(&mut *tx).await? == 0;
        if registrar.is_none() && !bootstrap {
            return Err(DbError::Conflict(
                "Users already exist; an administrator must register new users".to_string(),
            ));
        }
        let default_role = if bootstrap { ADMIN_ROLE } else { DEFAULT_ROLE };

        let mut created = Vec::with_capacity(entries.len());
        for entry in entries {
            let full_name = entry.full_name.trim().to_string();
            let email = entry.email.trim().to_lowercase();
            validate_name("fullName", &full_name)?;
            validate_email(&email)?;
            validate_required("password", &entry.password)?;

            let taken: Option<(String, String)> = sqlx::query_as(
                "SELECT full_name, email FROM users WHERE full_name = ? OR email = ? LIMIT 1",
            )
            .bind(&full_name)
            .bind(&email)
            .fetch_optional(&mut *tx)
            .await?;
            if let Some((name, _)) = taken {
                return Err(if name == full_name {
                    DbError::duplicate("fullName", full_name)
                } else {
                    DbError::duplicate("email", email)
                });
            }

            let wanted = entry
                .role
                .as_deref()
                .or(entry.role_name.as_deref())
                .unwrap_or(default_role);
            let role = find_role(&mut *tx, wanted)
                .await?
                .ok_or_else(|| DbError::invalid_reference("Invalid role provided"))?;

            let now = Utc::now();
            let user = User {
                id: new_id(),
                full_name,
                email,
                password_hash: hash_password(&entry.password)?,
                status: UserStatus::Active,
                role_id: role.id,
                role_name: role.name,
                created_at: now,
                updated_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO users (id, full_name, email, password_hash, status, role_id, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&user.id)
            .bind(&user.full_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.status)
            .bind(&user.role_id)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&mut *tx)
            .await?;

            created.push(user);
        }

        tx.commit().await?;

        info!(
            count = created.len(),
            bootstrap,
            registrar = registrar.map(|p| p.user_id.as_str()).unwrap_or("-"),
            "Users registered"
        );
        Ok(created)
    }

    /// Returns the user when the email and password match.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> DbResult<Option<User>> {
        let sql = format!("{} WHERE u.email = ?", USER_SELECT);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        match user {
            Some(user) if verify_password(password, &user.password_hash) => Ok(Some(user)),
            Some(user) => {
                warn!(user_id = %user.id, "Password mismatch");
                Ok(None)
            }
            None => {
                debug!("Login for unknown email");
                Ok(None)
            }
        }
    }

    pub async fn update_role(&self, principal: &Principal, id: &str, role_id: &str) -> DbResult<User> {
        validate_required("roleId", role_id)?;

        let mut tx = self.pool.begin().await?;
        let role = find_role(&mut *tx, role_id)
            .await?
            .ok_or_else(|| DbError::not_found("Role", role_id))?;

        let result = sqlx::query("UPDATE users SET role_id = ?, updated_at = ? WHERE id = ?")
            .bind(&role.id)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        let user = find(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;
        tx.commit().await?;

        info!(user_id = %id, role = %user.role_name, by = %principal.user_id, "User role changed");
        Ok(user)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
