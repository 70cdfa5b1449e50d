//! # Database Handle
//!
//! Opens the SQLite pool, applies migrations and hands out repositories that
//! share it.
//!
//! ```text
//! DbConfig { path, pool size, WritePolicy }
//!     │
//!     ▼
//! Database::new ──► SqlitePool (WAL for files, one pinned conn for :memory:)
//!     │                 │
//!     │                 └──► migrations::run_migrations
//!     ▼
//! db.taxes()    db.products()   ◄── WritePolicy.tax_precedence
//! db.orders()   db.carts()      ◄── WritePolicy.stock_retries
//! db.stock()    db.users() ...
//! ```
//!
//! File databases run in WAL mode so readers never block the writer.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use stockroom_core::pricing::TaxPrecedence;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::access::AccessRepository;
use crate::repository::cart::CartRepository;
use crate::repository::category::CategoryRepository;
use crate::repository::order::OrderRepository;
use crate::repository::payment::PaymentRepository;
use crate::repository::product::ProductRepository;
use crate::repository::purchase_order::PurchaseOrderRepository;
use crate::repository::stock::StockRepository;
use crate::repository::supplier::SupplierRepository;
use crate::repository::tax::TaxRepository;
use crate::repository::user::UserRepository;

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// How writes that touch pricing or stock behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
    /// Tie-break between several active taxes on one category.
    pub tax_precedence: TaxPrecedence,
    /// Extra attempts for a stock update that loses its version check.
    pub stock_retries: u32,
}

impl Default for WritePolicy {
    fn default() -> Self {
        WritePolicy {
            tax_precedence: TaxPrecedence::Oldest,
            stock_retries: 3,
        }
    }
}

/// Database configuration.
///
/// ```rust,ignore
/// let config = DbConfig::new("./stockroom.db")
///     .max_connections(5)
///     .tax_precedence(TaxPrecedence::Exclusive);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool. Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive. Default: 1
    pub min_connections: u32,

    /// Connection acquire timeout. Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection. Default: 10 minutes
    pub idle_timeout: Duration,

    pub write_policy: WritePolicy,
}

impl DbConfig {
    /// Creates a configuration for the given file. The file is created if
    /// missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            write_policy: WritePolicy::default(),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn tax_precedence(mut self, precedence: TaxPrecedence) -> Self {
        self.write_policy.tax_precedence = precedence;
        self
    }

    pub fn stock_retries(mut self, retries: u32) -> Self {
        self.write_policy.stock_retries = retries;
        self
    }

    /// Creates an isolated in-memory database configuration (for testing).
    ///
    /// In-memory SQLite lives only as long as its connection, so the pool is
    /// pinned to exactly one connection that never expires.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            write_policy: WritePolicy::default(),
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cloning is cheap: the pool is reference counted.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    policy: WritePolicy,
}

impl Database {
    /// Creates the connection pool and runs pending migrations.
    ///
    /// ## SQLite settings
    /// - WAL journal (file databases only)
    /// - NORMAL synchronous
    /// - Foreign keys enforced
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let pool = if config.is_in_memory() {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
                .foreign_keys(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .acquire_timeout(config.connect_timeout)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

            let options = SqliteConnectOptions::from_str(&connect_url)
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .foreign_keys(true)
                .busy_timeout(Duration::from_secs(5))
                .create_if_missing(true);

            debug!("Connection options configured");

            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .acquire_timeout(config.connect_timeout)
                .idle_timeout(Some(config.idle_timeout))
                .connect_with(options)
                .await
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        };

        info!(
            max_connections = config.max_connections,
            tax_precedence = config.write_policy.tax_precedence.as_str(),
            "Database pool created"
        );

        let db = Database {
            pool,
            policy: config.write_policy,
        };

        migrations::run_migrations(&db.pool).await?;
        Ok(db)
    }

    /// Raw pool for queries not covered by a repository.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone(), self.policy.tax_precedence)
    }

    pub fn taxes(&self) -> TaxRepository {
        TaxRepository::new(self.pool.clone(), self.policy.tax_precedence)
    }

    pub fn stock(&self) -> StockRepository {
        StockRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone(), self.policy.stock_retries)
    }

    pub fn carts(&self) -> CartRepository {
        CartRepository::new(self.pool.clone(), self.policy.stock_retries)
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    pub fn suppliers(&self) -> SupplierRepository {
        SupplierRepository::new(self.pool.clone())
    }

    pub fn access(&self) -> AccessRepository {
        AccessRepository::new(self.pool.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn purchase_orders(&self) -> PurchaseOrderRepository {
        PurchaseOrderRepository::new(self.pool.clone())
    }

    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.pool.clone())
    }

    /// Closes the pool. Repository calls fail afterwards.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// `(total, applied)` migration counts.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    /// True when the database answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
