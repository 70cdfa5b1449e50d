//! # Repository Module
//!
//! One repository per aggregate. Each holds a cloned `SqlitePool` and owns
//! every SQL statement for its tables.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  axum handler                                                          │
//! │       │                                                                 │
//! │       │  state.db.orders().place_order(&principal, order)              │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── pool.begin()                                                      │
//! │  ├── insert order + items          (&mut *tx)                          │
//! │  ├── stock::apply_stock_deduction  (&mut *tx)                          │
//! │  └── tx.commit()                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Workflows that span several aggregates (order placement, checkout,
//! purchase order receipt) share transaction-scoped helpers that take a
//! `&mut SqliteConnection` instead of the pool.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalogue, pricing, import
//! - [`TaxRepository`](tax::TaxRepository) - Tax rules and resolution
//! - [`StockRepository`](stock::StockRepository) - Receipts and stock history
//! - [`OrderRepository`](order::OrderRepository) - Order placement and reporting
//! - [`CartRepository`](cart::CartRepository) - Per-user cart and checkout
//! - [`CategoryRepository`](category::CategoryRepository)
//! - [`SupplierRepository`](supplier::SupplierRepository) - Suppliers and import
//! - [`AccessRepository`](access::AccessRepository) - Roles and permissions
//! - [`UserRepository`](user::UserRepository) - Accounts and credentials
//! - [`PurchaseOrderRepository`](purchase_order::PurchaseOrderRepository)
//! - [`PaymentRepository`](payment::PaymentRepository) - Payments and status totals

pub mod access;
pub mod cart;
pub mod category;
pub mod order;
pub mod payment;
pub mod product;
pub mod purchase_order;
pub mod stock;
pub mod supplier;
pub mod tax;
pub mod user;

use serde::Serialize;
use stockroom_core::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use uuid::Uuid;

/// Fresh primary key.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Pagination
// =============================================================================

/// Requested page, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Clamps to `page >= 1` and `1 <= limit <= MAX_PAGE_LIMIT`.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        PageRequest {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(None, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

/// One page of results plus totals, serialised as `{data, meta}`.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, request: PageRequest) -> Self {
        Page {
            data,
            meta: PageMeta {
                total,
                page: request.page,
                limit: request.limit,
                pages: (total + request.limit - 1) / request.limit,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        let req = PageRequest::new(Some(0), Some(1_000));
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, MAX_PAGE_LIMIT);
        assert_eq!(req.offset(), 0);

        let req = PageRequest::new(Some(3), Some(10));
        assert_eq!(req.offset(), 20);
    }

    #[test]
    fn test_page_count_rounds_up() {
        let page = Page::new(vec![1, 2], 21, PageRequest::new(Some(1), Some(10)));
        assert_eq!(page.meta.pages, 3);

        let empty: Page<i32> = Page::new(vec![], 0, PageRequest::default());
        assert_eq!(empty.meta.pages, 0);
    }
}
