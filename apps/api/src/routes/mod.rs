//! # HTTP Routes
//!
//! One module per resource. Each exposes `router()`, merged under `/api` by
//! [`crate::build_router`].
//!
//! ## Response Shapes
//! ```text
//! list          → 200 [ ... ]
//! get           → 200 { ... }
//! create        → 201 { message, data }
//! update        → 200 { message, data }
//! delete        → 200 { message }
//! error         → 4xx/5xx { code, message }
//! ```

pub mod access;
pub mod auth;
pub mod cart;
pub mod category;
pub mod health;
pub mod order;
pub mod payment;
pub mod product;
pub mod purchase;
pub mod supplier;
pub mod tax;

use std::sync::Arc;

use axum::{http::StatusCode, Json, Router};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

/// Every `/api` route.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(auth::router())
        .merge(product::router())
        .merge(order::router())
        .merge(tax::router())
        .merge(category::router())
        .merge(supplier::router())
        .merge(access::router())
        .merge(purchase::router())
        .merge(payment::router())
        .merge(cart::router())
}

// =============================================================================
// Response Helpers
// =============================================================================

pub(crate) fn created<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({ "message": message, "data": data })),
    )
}

pub(crate) fn updated<T: Serialize>(message: &str, data: T) -> Json<Value> {
    Json(json!({ "message": message, "data": data }))
}

pub(crate) fn message(message: &str) -> Json<Value> {
    Json(json!({ "message": message }))
}

// =============================================================================
// Date Ranges
// =============================================================================

/// `?startDate=...&endDate=...`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DateRangeQuery {
    /// Both bounds, required. A bare end date covers that whole day.
    pub fn required(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
        let (Some(start), Some(end)) = (self.start_date.as_deref(), self.end_date.as_deref())
        else {
            return Err(ApiError::bad_request("startDate and endDate are required"));
        };

        let from = parse_bound(start, NaiveTime::MIN, "startDate")?;
        let to = parse_bound(end, end_of_day(), "endDate")?;
        if from > to {
            return Err(ApiError::bad_request("startDate must not be after endDate"));
        }
        Ok((from, to))
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

/// Accepts RFC 3339 timestamps or `YYYY-MM-DD`. A bare date takes `time`.
fn parse_bound(value: &str, time: NaiveTime, field: &str) -> Result<DateTime<Utc>, ApiError> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(time).and_utc())
        .map_err(|_| ApiError::bad_request(format!("{} must be a date (YYYY-MM-DD)", field)))
}
