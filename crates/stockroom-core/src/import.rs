//! # Bulk Import Rows
//!
//! Turns decoded spreadsheet rows into validated drafts and keeps the
//! per-file tally.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  csv/xlsx bytes ──(apps/api)──► Vec<RawRow>                             │
//! │                                    │                                    │
//! │                 for each row:      ▼                                    │
//! │                 parse_*_row ── Err(reason) ──► report.skip(row, reason) │
//! │                     │                                                   │
//! │                     ▼ Ok(draft)                                         │
//! │                 SeenKeys::claim ── dup in file ──► skip                 │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │                 (stockroom-db) exists in DB? ── yes ──► skip            │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │                 insert ──► report.add()                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are independent. A bad row never stops the rest of the file.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{ProductStatus, SupplierStatus};
use crate::validation::{
    validate_email, validate_name, validate_phone, validate_price_cents, validate_sku,
    validate_stock_level, ValidationResult,
};
use crate::DEFAULT_REORDER_LEVEL;

// =============================================================================
// Raw Rows
// =============================================================================

/// One spreadsheet data row, keyed by normalised header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based row number as shown in the spreadsheet (header is row 1).
    pub number: usize,
    cells: BTreeMap<String, String>,
}

impl RawRow {
    pub fn new(number: usize) -> Self {
        RawRow {
            number,
            cells: BTreeMap::new(),
        }
    }

    /// Builds a row from header/value pairs.
    pub fn from_pairs<'a>(number: usize, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut row = RawRow::new(number);
        for (header, value) in pairs {
            row.insert(header, value);
        }
        row
    }

    pub fn insert(&mut self, header: &str, value: &str) {
        let key = normalize_header(header);
        if !key.is_empty() {
            self.cells.insert(key, value.trim().to_string());
        }
    }

    /// Trimmed, non-empty cell value. Header lookup ignores case, spaces
    /// and underscores, so `Base Price`, `base_price` and `basePrice` match.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .get(&normalize_header(header))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// True when every cell is blank.
    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.is_empty())
    }
}

fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parses a whole, non-negative count. Spreadsheets often store integers as
/// floats (`12.0`), which are accepted.
pub fn parse_count(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(n) = value.parse::<i64>() {
        return (n >= 0).then_some(n);
    }
    let f = value.parse::<f64>().ok()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= i64::MAX as f64).then_some(f as i64)
}

// =============================================================================
// Drafts
// =============================================================================

fn default_reorder_level() -> i64 {
    DEFAULT_REORDER_LEVEL
}

/// A product before it has an id, timestamps or a computed tax price.
///
/// Shared by the create endpoint (JSON) and the spreadsheet importer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductDraft {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    #[serde(default, alias = "supplier")]
    pub supplier_id: Option<String>,
    #[serde(alias = "price")]
    pub base_price: Money,
    pub cost: Money,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_reorder_level")]
    pub reorder_level: i64,
    #[serde(default)]
    pub status: ProductStatus,
}

impl ProductDraft {
    /// Trims text fields and turns blank optionals into `None`.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.sku = self.sku.trim().to_string();
        self.category = self.category.trim().to_string();
        self.barcode = blank_to_none(self.barcode);
        self.description = blank_to_none(self.description);
        self.supplier_id = blank_to_none(self.supplier_id);
        self
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_sku(&self.sku)?;
        validate_name("category", &self.category)?;
        validate_price_cents(self.base_price.cents())?;
        validate_price_cents(self.cost.cents())?;
        validate_stock_level("stock", self.stock)?;
        validate_stock_level("reorderLevel", self.reorder_level)?;
        Ok(())
    }
}

/// A supplier before it has an id or timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SupplierDraft {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub contact_person_name: Option<String>,
    #[serde(default)]
    pub contact_person_phone: Option<String>,
    #[serde(default)]
    pub status: SupplierStatus,
}

impl SupplierDraft {
    /// Trims text fields, lower-cases the email and turns blanks into `None`.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.phone = self.phone.trim().to_string();
        self.email = blank_to_none(self.email).map(|e| e.to_lowercase());
        self.address = blank_to_none(self.address);
        self.contact_person_name = blank_to_none(self.contact_person_name);
        self.contact_person_phone = blank_to_none(self.contact_person_phone);
        self
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_phone(&self.phone)?;
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Row Parsing
// =============================================================================

/// Required product columns, in the order named in error messages.
pub const PRODUCT_REQUIRED: [&str; 5] = ["name", "sku", "category", "basePrice", "cost"];

/// Required supplier columns.
pub const SUPPLIER_REQUIRED: [&str; 3] = ["name", "email", "phone"];

/// Validates a product row. The error is the reason shown to the user.
pub fn parse_product_row(row: &RawRow) -> Result<ProductDraft, String> {
    if PRODUCT_REQUIRED.iter().any(|h| row.get(h).is_none()) {
        return Err(format!(
            "Missing required fields ({})",
            PRODUCT_REQUIRED.join(", ")
        ));
    }

    let money = |header: &str| {
        row.get(header)
            .and_then(Money::parse_decimal)
            .filter(|m| !m.is_negative())
            .ok_or_else(|| format!("Invalid {} value", header))
    };
    let count = |header: &str, default: i64| match row.get(header) {
        None => Ok(default),
        Some(v) => parse_count(v).ok_or_else(|| format!("Invalid {} value", header)),
    };

    let base_price = money("basePrice")?;
    let cost = money("cost")?;
    let stock = count("stock", 0)?;
    let reorder_level = count("reorderLevel", DEFAULT_REORDER_LEVEL)?;

    let status = match row.get("status") {
        None => ProductStatus::Available,
        Some(v) => ProductStatus::parse(v).ok_or_else(|| "Invalid status value".to_string())?,
    };

    let draft = ProductDraft {
        name: row.get("name").unwrap_or_default().to_string(),
        sku: row.get("sku").unwrap_or_default().to_string(),
        barcode: row.get("barcode").map(str::to_string),
        description: row.get("description").map(str::to_string),
        category: row.get("category").unwrap_or_default().to_string(),
        supplier_id: row.get("supplier").map(str::to_string),
        base_price,
        cost,
        stock,
        reorder_level,
        status,
    }
    .normalized();

    draft.validate().map_err(|e| e.to_string())?;
    Ok(draft)
}

/// Validates a supplier row.
pub fn parse_supplier_row(row: &RawRow) -> Result<SupplierDraft, String> {
    if SUPPLIER_REQUIRED.iter().any(|h| row.get(h).is_none()) {
        return Err(format!(
            "Missing required fields ({})",
            SUPPLIER_REQUIRED.join(", ")
        ));
    }

    let draft = SupplierDraft {
        name: row.get("name").unwrap_or_default().to_string(),
        phone: row.get("phone").unwrap_or_default().to_string(),
        email: row.get("email").map(str::to_string),
        address: row.get("address").map(str::to_string),
        contact_person_name: row.get("contactPersonName").map(str::to_string),
        contact_person_phone: row.get("contactPersonPhone").map(str::to_string),
        status: SupplierStatus::Active,
    }
    .normalized();

    draft.validate().map_err(|e| e.to_string())?;
    Ok(draft)
}

// =============================================================================
// Tally
// =============================================================================

/// Result of importing one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ImportReport {
    pub added: usize,
    pub skipped: usize,
    /// `Row N: reason` for every skipped row.
    pub errors: Vec<String>,
}

impl ImportReport {
    pub fn add(&mut self) {
        self.added += 1;
    }

    pub fn skip(&mut self, row: usize, reason: impl AsRef<str>) {
        self.skipped += 1;
        self.errors.push(format!("Row {}: {}", row, reason.as_ref()));
    }
}

/// Unique keys accepted earlier in the same file.
#[derive(Debug, Default)]
pub struct SeenKeys {
    seen: HashSet<(&'static str, String)>,
}

impl SeenKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every key unless one was already seen. Returns false (and
    /// records nothing) on a repeat. Keys compare case-insensitively.
    pub fn claim(&mut self, keys: &[(&'static str, Option<&str>)]) -> bool {
        let keys: Vec<_> = keys
            .iter()
            .filter_map(|(field, value)| value.map(|v| (*field, v.trim().to_lowercase())))
            .collect();

        if keys.iter().any(|k| self.seen.contains(k)) {
            return false;
        }
        self.seen.extend(keys);
        true
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
