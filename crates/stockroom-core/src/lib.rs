//! # stockroom-core: Pure Business Logic for Stockroom
//!
//! Everything the back office decides without touching a database lives here:
//! money math, tax resolution, order totals, stock arithmetic, spreadsheet
//! row validation and sales bucketing.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Admin Dashboard (React SPA)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ stockroom-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   types   money   pricing   order   stock   import   report     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              stockroom-db (SQLite repositories)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Product, Order, Tax, ...)
//! - [`money`] - Integer money in minor units
//! - [`pricing`] - Tax rule resolution and tax-inclusive prices
//! - [`order`] - Order line validation and totals
//! - [`stock`] - Stock ledger arithmetic
//! - [`import`] - Spreadsheet row validation for bulk import
//! - [`report`] - Sales bucketing by period
//! - [`validation`] - Field validators
//! - [`error`] - Domain error types
//!
//! ## Example
//!
//! ```rust
//! use stockroom_core::money::Money;
//! use stockroom_core::types::TaxRate;
//!
//! let base = Money::from_cents(10_000);
//! let vat = TaxRate::from_bps(1_500); // 15%
//! assert_eq!((base + base.calculate_tax(vat)).cents(), 11_500);
//! ```

pub mod error;
pub mod import;
pub mod money;
pub mod order;
pub mod pricing;
pub mod report;
pub mod stock;
pub mod types;
pub mod validation;

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines accepted in one order or cart.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches fat-finger entries (1000 instead of 10) at the till.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest accepted price, cost or payment in minor units (10 billion major units).
///
/// Keeps every line total, order total, tax-inclusive price and receipt cost
/// within `i64`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000_000;

/// Largest quantity accepted in one stock receipt.
pub const MAX_RECEIVED_QUANTITY: i64 = 1_000_000;

/// Stock threshold at which a new product is flagged for replenishment.
pub const DEFAULT_REORDER_LEVEL: i64 = 10;

/// Default and maximum page sizes for list endpoints.
pub const DEFAULT_PAGE_LIMIT: i64 = 25;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Role given to users registered without an explicit role.
pub const DEFAULT_ROLE: &str = "cashier";

/// Role allowed to manage users, roles and permissions.
pub const ADMIN_ROLE: &str = "admin";
