//! Orders and the dashboard figures built from them.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use stockroom_core::report::{bucket_sales, SalesPeriod};
use stockroom_core::OrderStatus;
use stockroom_db::repository::order::PlaceOrder;
use tracing::warn;

use super::{created, updated};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/order", get(list_orders).post(place_order))
        .route("/order/dashboard-stats", get(dashboard_stats))
        .route("/order/sales-data", get(sales_data))
        .route("/order/{id}", get(get_order))
        .route("/order/{id}/status", patch(update_status))
}

#[derive(Debug, Deserialize)]
pub struct SalesDataQuery {
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

/// Places an order for the authenticated user. Totals are computed from the
/// submitted lines; any `user` field in the body is ignored.
async fn place_order(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Json(body): Json<PlaceOrder>,
) -> ApiResult<impl IntoResponse> {
    let (order, report) = state.db.orders().place_order(&principal, body).await?;

    if !report.is_complete() {
        warn!(
            order_id = %order.id,
            skipped = ?report.skipped,
            "Order placed with lines for unknown products"
        );
    }

    Ok(created("Order placed successfully", order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.orders().list_populated().await?))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.orders().get(&id).await?))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let order = state
        .db
        .orders()
        .update_status(&principal, &id, body.status)
        .await?;
    Ok(updated("Order status updated", order))
}

async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.orders().dashboard_stats().await?))
}

/// Paid order totals grouped by `daily`, `weekly`, `monthly` or `yearly`.
async fn sales_data(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Query(query): Query<SalesDataQuery>,
) -> ApiResult<impl IntoResponse> {
    let period = SalesPeriod::parse_or_default(query.period.as_deref());
    let orders = state.db.orders().paid_orders().await?;

    Ok(Json(json!({
        "period": period,
        "data": bucket_sales(period, orders),
    })))
}
