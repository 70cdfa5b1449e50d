//! # Sales Reporting
//!
//! Buckets paid orders by calendar period and defines the report shapes the
//! dashboard charts read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::money::Money;
use crate::types::PaymentStatus;

/// Grouping for the sales chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SalesPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl SalesPeriod {
    /// Unknown or missing periods fall back to daily.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("weekly") => SalesPeriod::Weekly,
            Some("monthly") => SalesPeriod::Monthly,
            Some("yearly") => SalesPeriod::Yearly,
            _ => SalesPeriod::Daily,
        }
    }

    /// strftime pattern of the bucket key. Weeks start on Sunday (`%U`).
    pub fn key_format(&self) -> &'static str {
        match self {
            SalesPeriod::Daily => "%Y-%m-%d",
            SalesPeriod::Weekly => "%Y-%U",
            SalesPeriod::Monthly => "%Y-%m",
            SalesPeriod::Yearly => "%Y",
        }
    }

    pub fn bucket_key(&self, at: DateTime<Utc>) -> String {
        at.format(self.key_format()).to_string()
    }
}

/// One point on the sales chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesBucket {
    #[serde(rename = "_id")]
    pub key: String,
    pub total_sales: Money,
    pub order_count: i64,
}

/// Groups `(created_at, total)` pairs into buckets sorted by key.
pub fn bucket_sales(
    period: SalesPeriod,
    orders: impl IntoIterator<Item = (DateTime<Utc>, Money)>,
) -> Vec<SalesBucket> {
    let mut buckets: BTreeMap<String, (Money, i64)> = BTreeMap::new();

    for (at, total) in orders {
        let entry = buckets
            .entry(period.bucket_key(at))
            .or_insert((Money::zero(), 0));
        entry.0 += total;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(key, (total_sales, order_count))| SalesBucket {
            key,
            total_sales,
            order_count,
        })
        .collect()
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardStats {
    pub total_products: i64,
    pub total_users: i64,
    pub total_orders: i64,
    /// Sum of paid order totals.
    pub total_revenue: Money,
}

/// Paid orders within a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesReport {
    pub total_orders: i64,
    pub total_revenue: Money,
}

/// Payment amounts summed per status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentSummary {
    #[serde(rename = "_id")]
    pub status: PaymentStatus,
    pub total: Money,
}
