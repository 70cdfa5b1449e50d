//! Purchase orders: goods ordered from a supplier, added to stock when the
//! order is marked `received`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use stockroom_core::PurchaseOrderStatus;
use stockroom_db::repository::purchase_order::{NewPurchaseOrder, PurchaseOrderFilter};

use super::{created, message, updated, DateRangeQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/purchase/order",
            get(list_purchase_orders).post(create_purchase_order),
        )
        .route("/purchase/order/date-range", get(by_date_range))
        .route("/purchase/order/supplier/{id}", get(by_supplier))
        .route("/purchase/order/product/{id}", get(by_product))
        .route(
            "/purchase/order/{id}",
            get(get_purchase_order).delete(delete_purchase_order),
        )
        .route("/purchase/order/{id}/status", put(update_status))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: PurchaseOrderStatus,
}

async fn list_purchase_orders(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let orders = state
        .db
        .purchase_orders()
        .list(&PurchaseOrderFilter::default())
        .await?;
    Ok(Json(orders))
}

async fn create_purchase_order(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Json(body): Json<NewPurchaseOrder>,
) -> ApiResult<impl IntoResponse> {
    let order = state.db.purchase_orders().create(&principal, body).await?;
    Ok(created("Purchase order created", order))
}

async fn get_purchase_order(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.purchase_orders().get(&id).await?))
}

async fn by_supplier(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.purchase_orders().by_supplier(&id).await?))
}

async fn by_product(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.purchase_orders().by_product(&id).await?))
}

/// Purchase orders received between two dates, both inclusive.
async fn by_date_range(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<impl IntoResponse> {
    let (from, to) = range.required()?;
    Ok(Json(state.db.purchase_orders().date_range(from, to).await?))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let order = state
        .db
        .purchase_orders()
        .update_status(&principal, &id, body.status)
        .await?;
    Ok(updated("Purchase order status updated", order))
}

async fn delete_purchase_order(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.db.purchase_orders().delete(&principal, &id).await?;
    Ok(message("Purchase order deleted successfully"))
}
