//! # Domain Types
//!
//! Core domain types shared by the database layer and the HTTP API.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalogue            Sales               Procurement      Access       │
//! │  ─────────            ─────               ───────────      ──────       │
//! │  Product              Order               Supplier         User         │
//! │  Category             OrderItem           PurchaseOrder    Role         │
//! │  Tax                  Cart / CartItem     StockReceipt     Permission   │
//! │                       Payment                              Principal    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! JSON uses camelCase field names. Money is always an integer count of
//! minor units; tax rates travel as percentages and are stored as basis points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (1 bps = 0.01%).
///
/// Serialized as a percentage (`15.5` for 1550 bps) so the dashboard can show
/// it directly. Stored as an integer column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(into = "f64", try_from = "f64")]
pub struct TaxRate(u32);

impl TaxRate {
    pub const MAX_BPS: u32 = 10_000;

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a rate from a percentage between 0 and 100.
    pub fn from_percentage(pct: f64) -> Result<Self, ValidationError> {
        if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
            return Err(ValidationError::OutOfRange {
                field: "rate".to_string(),
                min: 0,
                max: 100,
            });
        }
        Ok(TaxRate((pct * 100.0).round() as u32))
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

impl From<TaxRate> for f64 {
    fn from(rate: TaxRate) -> Self {
        rate.percentage()
    }
}

impl TryFrom<f64> for TaxRate {
    type Error = ValidationError;

    fn try_from(pct: f64) -> Result<Self, Self::Error> {
        TaxRate::from_percentage(pct)
    }
}

// =============================================================================
// Product
// =============================================================================

/// Availability of a product on the shelf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum ProductStatus {
    #[default]
    #[serde(rename = "available")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "available"))]
    Available,
    #[serde(rename = "out of stock")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "out of stock"))]
    OutOfStock,
    #[serde(rename = "pending")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "pending"))]
    Pending,
    #[serde(rename = "discounted")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "discounted"))]
    Discounted,
    #[serde(rename = "discontinued")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "discontinued"))]
    Discontinued,
}

impl ProductStatus {
    pub const ALL: [ProductStatus; 5] = [
        ProductStatus::Available,
        ProductStatus::OutOfStock,
        ProductStatus::Pending,
        ProductStatus::Discounted,
        ProductStatus::Discontinued,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Available => "available",
            ProductStatus::OutOfStock => "out of stock",
            ProductStatus::Pending => "pending",
            ProductStatus::Discounted => "discounted",
            ProductStatus::Discontinued => "discontinued",
        }
    }

    /// Parses the stored/display form, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

/// A product in the catalogue.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Stock keeping unit, unique.
    pub sku: String,
    /// Optional scan code, unique when present.
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// Free-text category label, matched against tax rules.
    pub category: String,
    pub supplier_id: Option<String>,
    /// Pre-tax selling price.
    pub base_price: Money,
    /// Cached `base_price` plus the resolved tax.
    pub price_with_tax: Money,
    pub cost: Money,
    pub stock: i64,
    pub reorder_level: i64,
    pub status: ProductStatus,
    /// Optimistic concurrency token, bumped on every stock change.
    pub version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Stock has fallen to or below the reorder level.
    pub fn needs_reorder(&self) -> bool {
        self.stock <= self.reorder_level
    }
}

// =============================================================================
// Tax
// =============================================================================

/// A tax rule applied to product categories.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Tax {
    pub id: String,
    pub name: String,
    /// Upper-cased short code (`VAT`, `GST`).
    pub code: String,
    #[ts(type = "number")]
    pub rate: TaxRate,
    pub description: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub applicable_categories: Vec<String>,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Tax {
    /// Active and lists the category (surrounding whitespace ignored).
    pub fn applies_to(&self, category: &str) -> bool {
        let category = category.trim();
        self.is_active
            && self
                .applicable_categories
                .iter()
                .any(|c| c.trim() == category)
    }
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// User who created the category.
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Supplier
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SupplierStatus {
    #[default]
    Active,
    Inactive,
    Terminated,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact_person_name: Option<String>,
    pub contact_person_phone: Option<String>,
    /// Unique.
    pub phone: String,
    /// Unique when present, stored lower-cased.
    pub email: Option<String>,
    pub address: Option<String>,
    pub status: SupplierStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// How an order or payment was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    Card,
    #[serde(alias = "mobile money")]
    MobileMoney,
}

/// A recorded sale. Immutable apart from `status`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// User who prepared the order.
    pub user_id: String,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub transaction_ref: Option<String>,
    pub status: OrderStatus,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<OrderItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// An order line. `price` is the snapshot taken at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderItem {
    #[serde(skip)]
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub price: Money,
}

/// Who placed an order, as shown in order listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserSummary {
    pub id: String,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub sku: String,
}

/// Order line with its product resolved. `product` is `None` once the
/// product has been deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderItemDetail {
    pub product_id: String,
    pub product: Option<ProductSummary>,
    pub quantity: i64,
    pub price: Money,
}

/// Order with user and products populated, for listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderDetail {
    pub id: String,
    pub user: Option<UserSummary>,
    pub items: Vec<OrderItemDetail>,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub transaction_ref: Option<String>,
    pub status: OrderStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub status: PaymentStatus,
    /// Processor reference, unique when present.
    pub transaction_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CartStatus {
    #[default]
    Active,
    CheckedOut,
}

/// A user's open cart. Prices are captured when the line is added.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    pub id: String,
    pub user_id: String,
    pub status: CartStatus,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<CartItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn subtotal(&self) -> Money {
        self.items
            .iter()
            .map(|item| item.price.multiply_quantity(item.quantity))
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartItem {
    #[serde(skip)]
    pub cart_id: String,
    pub product_id: String,
    /// Product name at the time it was added.
    pub name: String,
    pub quantity: i64,
    /// Tax-inclusive price at the time it was added.
    pub price: Money,
}

// =============================================================================
// Procurement
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PurchaseOrderStatus {
    #[default]
    Pending,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Pending => "pending",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }

    /// Only pending purchase orders may change; they can be received or cancelled.
    pub fn can_transition_to(&self, next: PurchaseOrderStatus) -> bool {
        matches!(
            (self, next),
            (PurchaseOrderStatus::Pending, PurchaseOrderStatus::Received)
                | (PurchaseOrderStatus::Pending, PurchaseOrderStatus::Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseOrder {
    pub id: String,
    pub product_id: String,
    pub supplier_id: String,
    pub quantity_received: i64,
    pub cost_per_unit: Money,
    #[ts(as = "String")]
    pub received_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub received_by: String,
    pub status: PurchaseOrderStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A stock intake entry. Every increment of product stock has one.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockReceipt {
    pub id: String,
    pub product_id: String,
    pub supplier_id: Option<String>,
    pub purchase_order_id: Option<String>,
    pub quantity_received: i64,
    pub cost_per_unit: Money,
    pub total_cost: Money,
    #[ts(as = "String")]
    pub received_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub received_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Access Control
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Permission {
    pub id: String,
    /// Unique, lower-cased (`manage_products`).
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub permissions: Vec<Permission>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub status: UserStatus,
    pub role_id: String,
    /// Name of `role_id`, joined in on read.
    pub role_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// The authenticated actor behind a mutating operation.
///
/// Every write that records who did it takes one of these. There is no
/// anonymous or placeholder principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: String,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: impl Into<String>) -> Self {
        Principal {
            user_id: user_id.into(),
            role: role.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case(crate::ADMIN_ROLE)
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Principal::new(user.id.clone(), user.role_name.clone())
    }
}

// =============================================================================
// One or Many
// =============================================================================

/// A request body that is either a single record or a batch.
///
/// ```rust
/// use stockroom_core::OneOrMany;
///
/// let one: OneOrMany<u32> = serde_json::from_str("7").unwrap();
/// let many: OneOrMany<u32> = serde_json::from_str("[1, 2]").unwrap();
/// assert_eq!(one.into_vec(), vec![7]);
/// assert!(many.is_batch());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn is_batch(&self) -> bool {
        matches!(self, OneOrMany::Many(_))
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tax(categories: &[&str], active: bool) -> Tax {
        let now = Utc::now();
        Tax {
            id: "t1".to_string(),
            name: "Value Added Tax".to_string(),
            code: "VAT".to_string(),
            rate: TaxRate::from_bps(1500),
            description: None,
            applicable_categories: categories.iter().map(|c| c.to_string()).collect(),
            is_active: active,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_tax_rate_percentage_round_trip() {
        let rate = TaxRate::from_percentage(8.25).unwrap();
        assert_eq!(rate.bps(), 825);
        assert!((rate.percentage() - 8.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tax_rate_rejects_out_of_range() {
        assert!(TaxRate::from_percentage(-1.0).is_err());
        assert!(TaxRate::from_percentage(100.5).is_err());
        assert!(TaxRate::from_percentage(f64::NAN).is_err());
        assert!(TaxRate::from_percentage(100.0).is_ok());
    }

    #[test]
    fn test_tax_rate_serializes_as_percentage() {
        let json = serde_json::to_string(&TaxRate::from_bps(1550)).unwrap();
        assert_eq!(json, "15.5");

        let parsed: TaxRate = serde_json::from_str("15").unwrap();
        assert_eq!(parsed.bps(), 1500);

        assert!(serde_json::from_str::<TaxRate>("250").is_err());
    }

    #[test]
    fn test_product_status_wire_format() {
        let json = serde_json::to_string(&ProductStatus::OutOfStock).unwrap();
        assert_eq!(json, "\"out of stock\"");
        assert_eq!(ProductStatus::parse("Out of Stock"), Some(ProductStatus::OutOfStock));
        assert_eq!(ProductStatus::parse("gone"), None);
    }

    #[test]
    fn test_payment_method_accepts_spaced_alias() {
        let method: PaymentMethod = serde_json::from_str("\"mobile money\"").unwrap();
        assert_eq!(method, PaymentMethod::MobileMoney);
        assert_eq!(serde_json::to_string(&method).unwrap(), "\"mobile_money\"");
    }

    #[test]
    fn test_tax_applies_only_when_active_and_listed() {
        assert!(tax(&["Snacks", "Drinks"], true).applies_to("Snacks"));
        assert!(tax(&[" Snacks "], true).applies_to("Snacks"));
        assert!(!tax(&["Snacks"], false).applies_to("Snacks"));
        assert!(!tax(&["Snacks"], true).applies_to("snacks"));
    }

    #[test]
    fn test_one_or_many_object_and_array() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Item {
            name: String,
        }

        let one: OneOrMany<Item> = serde_json::from_str(r#"{"name":"a"}"#).unwrap();
        assert!(!one.is_batch());
        assert_eq!(one.into_vec().len(), 1);

        let many: OneOrMany<Item> =
            serde_json::from_str(r#"[{"name":"a"},{"name":"b"}]"#).unwrap();
        assert!(many.is_batch());
        assert_eq!(many.into_vec().len(), 2);
    }

    #[test]
    fn test_principal_admin_check() {
        assert!(Principal::new("u1", "Admin").is_admin());
        assert!(!Principal::new("u1", "cashier").is_admin());
    }
}
