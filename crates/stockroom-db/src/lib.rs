//! # stockroom-db: Database Layer for Stockroom
//!
//! SQLite storage for the back office. Every SQL statement and every
//! transaction in the workspace lives in this crate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Stockroom Data Flow                               │
//! │                                                                         │
//! │  HTTP handler (POST /api/order)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockroom-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (product.rs)  │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo     │    │ 001_init.sql │  │   │
//! │  │   │ WritePolicy   │    │ StockRepo     │    │ 002_roles.sql│  │   │
//! │  │   │               │    │ TaxRepo ...   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  SQLite Database (WAL)                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration and write policy
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per aggregate
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockroom_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./stockroom.db")).await?;
//!
//! let (order, report) = db.orders().place_order(&principal, input).await?;
//! let page = db.products().list(&filter, PageRequest::default()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, WritePolicy};
pub use repository::{Page, PageMeta, PageRequest};

// Repository re-exports for convenience
pub use repository::access::AccessRepository;
pub use repository::cart::CartRepository;
pub use repository::category::CategoryRepository;
pub use repository::order::OrderRepository;
pub use repository::payment::PaymentRepository;
pub use repository::product::ProductRepository;
pub use repository::purchase_order::PurchaseOrderRepository;
pub use repository::stock::StockRepository;
pub use repository::supplier::SupplierRepository;
pub use repository::tax::TaxRepository;
pub use repository::user::UserRepository;
