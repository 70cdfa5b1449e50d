//! # Tax Resolver
//!
//! Picks the tax rule for a product category and computes tax-inclusive
//! prices.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  category = "Snacks", base = 100.00                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  candidates = active taxes listing "Snacks"                             │
//! │       │                                                                 │
//! │       ├── none      → 100.00 (no tax, not an error)                     │
//! │       ├── one       → that rule                                         │
//! │       └── several   → TaxPrecedence decides                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  VAT 15%  → 100.00 + 15.00 = 115.00                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Under [`TaxPrecedence::Exclusive`] overlapping active rules are refused
//! when taxes are written (see [`find_overlap`]), so resolution never has to
//! choose.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::money::Money;
use crate::types::Tax;

// =============================================================================
// Precedence
// =============================================================================

/// How to choose between several active taxes covering one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxPrecedence {
    /// Earliest created rule wins.
    #[default]
    Oldest,
    /// Most recently created rule wins.
    Newest,
    HighestRate,
    LowestRate,
    /// At most one active rule per category, enforced on write.
    Exclusive,
}

impl TaxPrecedence {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxPrecedence::Oldest => "oldest",
            TaxPrecedence::Newest => "newest",
            TaxPrecedence::HighestRate => "highest_rate",
            TaxPrecedence::LowestRate => "lowest_rate",
            TaxPrecedence::Exclusive => "exclusive",
        }
    }
}

impl FromStr for TaxPrecedence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "oldest" => Ok(TaxPrecedence::Oldest),
            "newest" => Ok(TaxPrecedence::Newest),
            "highest_rate" => Ok(TaxPrecedence::HighestRate),
            "lowest_rate" => Ok(TaxPrecedence::LowestRate),
            "exclusive" => Ok(TaxPrecedence::Exclusive),
            other => Err(format!("unknown tax precedence '{}'", other)),
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Finds the tax rule that applies to `category`.
///
/// Inactive rules and rules not listing the category are ignored. Ties on
/// the precedence key fall back to the earliest `created_at`, then `id`, so
/// the result never depends on input order.
pub fn resolve_tax<'a>(
    taxes: &'a [Tax],
    category: &str,
    precedence: TaxPrecedence,
) -> Option<&'a Tax> {
    let candidates = taxes.iter().filter(|t| t.applies_to(category));

    let oldest_first = |a: &&Tax, b: &&Tax| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    };

    match precedence {
        TaxPrecedence::Oldest | TaxPrecedence::Exclusive => candidates.min_by(oldest_first),
        TaxPrecedence::Newest => candidates.max_by(oldest_first),
        TaxPrecedence::HighestRate => {
            candidates.min_by(|a, b| b.rate.cmp(&a.rate).then_with(|| oldest_first(a, b)))
        }
        TaxPrecedence::LowestRate => {
            candidates.min_by(|a, b| a.rate.cmp(&b.rate).then_with(|| oldest_first(a, b)))
        }
    }
}

/// `base` plus the tax of `tax`, or `base` unchanged when there is none.
pub fn price_with_tax(base: Money, tax: Option<&Tax>) -> Money {
    match tax {
        Some(tax) => base + base.calculate_tax(tax.rate),
        None => base,
    }
}

/// Tax-inclusive price for a category.
///
/// An unmatched category is not an error: the base price comes back as is.
pub fn compute_tax_inclusive_price(
    taxes: &[Tax],
    category: &str,
    base: Money,
    precedence: TaxPrecedence,
) -> Money {
    price_with_tax(base, resolve_tax(taxes, category, precedence))
}

/// Returns the first `(existing code, category)` where `candidate` would
/// overlap another active tax. Rules with the same id are skipped so an
/// update does not collide with itself.
pub fn find_overlap(candidate: &Tax, existing: &[Tax]) -> Option<(String, String)> {
    if !candidate.is_active {
        return None;
    }

    existing
        .iter()
        .filter(|t| t.id != candidate.id && t.is_active)
        .find_map(|other| {
            candidate
                .applicable_categories
                .iter()
                .map(|c| c.trim())
                .find(|c| other.applies_to(c))
                .map(|c| (other.code.clone(), c.to_string()))
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaxRate;
    use chrono::{Duration, Utc};

    fn tax(id: &str, code: &str, bps: u32, categories: &[&str], age_days: i64) -> Tax {
        let created = Utc::now() - Duration::days(age_days);
        Tax {
            id: id.to_string(),
            name: format!("{} tax", code),
            code: code.to_string(),
            rate: TaxRate::from_bps(bps),
            description: None,
            applicable_categories: categories.iter().map(|c| c.to_string()).collect(),
            is_active: true,
            created_by: None,
            updated_by: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_matching_tax_adds_rate() {
        let taxes = vec![tax("1", "VAT", 1500, &["Snacks"], 1)];
        let price = compute_tax_inclusive_price(
            &taxes,
            "Snacks",
            Money::from_cents(10_000),
            TaxPrecedence::Oldest,
        );
        assert_eq!(price.cents(), 11_500);
    }

    #[test]
    fn test_full_rate_on_largest_price_does_not_overflow() {
        let taxes = vec![tax("1", "VAT", TaxRate::MAX_BPS, &["Snacks"], 1)];
        let base = Money::from_cents(crate::MAX_PRICE_CENTS);
        let price = compute_tax_inclusive_price(&taxes, "Snacks", base, TaxPrecedence::Oldest);
        assert_eq!(price.cents(), crate::MAX_PRICE_CENTS * 2);
        assert!(price >= base);
    }

    #[test]
    fn test_unmatched_category_returns_base() {
        let taxes = vec![tax("1", "VAT", 1500, &["Snacks"], 1)];
        let base = Money::from_cents(4_999);
        assert_eq!(
            compute_tax_inclusive_price(&taxes, "Tools", base, TaxPrecedence::Oldest),
            base
        );
        assert_eq!(
            compute_tax_inclusive_price(&[], "Snacks", base, TaxPrecedence::Oldest),
            base
        );
    }

    #[test]
    fn test_inactive_tax_is_ignored() {
        let mut vat = tax("1", "VAT", 1500, &["Snacks"], 1);
        vat.is_active = false;
        let base = Money::from_cents(1_000);
        assert_eq!(
            compute_tax_inclusive_price(&[vat], "Snacks", base, TaxPrecedence::Oldest),
            base
        );
    }

    #[test]
    fn test_precedence_picks_between_overlapping_rules() {
        let taxes = vec![
            tax("new", "LEVY", 500, &["Snacks"], 1),
            tax("old", "VAT", 1500, &["Snacks"], 30),
        ];

        let pick = |p| resolve_tax(&taxes, "Snacks", p).map(|t| t.code.as_str());
        assert_eq!(pick(TaxPrecedence::Oldest), Some("VAT"));
        assert_eq!(pick(TaxPrecedence::Newest), Some("LEVY"));
        assert_eq!(pick(TaxPrecedence::HighestRate), Some("VAT"));
        assert_eq!(pick(TaxPrecedence::LowestRate), Some("LEVY"));
    }

    #[test]
    fn test_equal_rates_fall_back_to_oldest() {
        let taxes = vec![
            tax("b", "B", 1000, &["Snacks"], 1),
            tax("a", "A", 1000, &["Snacks"], 5),
        ];
        let picked = resolve_tax(&taxes, "Snacks", TaxPrecedence::HighestRate).unwrap();
        assert_eq!(picked.code, "A");
    }

    #[test]
    fn test_find_overlap_reports_code_and_category() {
        let existing = vec![tax("1", "VAT", 1500, &["Snacks", "Drinks"], 3)];

        let clash = tax("2", "LEVY", 200, &["Bakery", "Drinks"], 0);
        assert_eq!(
            find_overlap(&clash, &existing),
            Some(("VAT".to_string(), "Drinks".to_string()))
        );

        let disjoint = tax("3", "ECO", 100, &["Bakery"], 0);
        assert_eq!(find_overlap(&disjoint, &existing), None);

        // Updating a rule in place does not collide with itself
        let same = tax("1", "VAT", 1600, &["Snacks"], 3);
        assert_eq!(find_overlap(&same, &existing), None);
    }

    #[test]
    fn test_precedence_parsing() {
        assert_eq!("highest_rate".parse::<TaxPrecedence>(), Ok(TaxPrecedence::HighestRate));
        assert_eq!(" Exclusive ".parse::<TaxPrecedence>(), Ok(TaxPrecedence::Exclusive));
        assert!("first".parse::<TaxPrecedence>().is_err());
    }
}
