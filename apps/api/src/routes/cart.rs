//! The authenticated user's open cart.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use stockroom_core::PaymentMethod;

use super::{created, updated};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cart", get(get_cart).post(add_item))
        .route("/cart/checkout", post(checkout))
        .route("/cart/{product_id}", patch(update_item).delete(remove_item))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub transaction_ref: Option<String>,
}

async fn get_cart(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let body = match state.db.carts().get(&principal).await? {
        Some(cart) => json!(cart),
        None => json!({ "message": "Cart is empty", "items": [] }),
    };
    Ok(Json(body))
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Json(body): Json<AddItemRequest>,
) -> ApiResult<impl IntoResponse> {
    let cart = state
        .db
        .carts()
        .add_item(&principal, &body.product_id, body.quantity)
        .await?;
    Ok(created("Product added to cart successfully", cart))
}

/// A quantity of zero or less removes the line.
async fn update_item(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(product_id): Path<String>,
    Json(body): Json<QuantityRequest>,
) -> ApiResult<impl IntoResponse> {
    let cart = state
        .db
        .carts()
        .update_quantity(&principal, &product_id, body.quantity)
        .await?;
    Ok(updated("Cart updated", cart))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(product_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let cart = state.db.carts().remove_item(&principal, &product_id).await?;
    Ok(updated("Item removed successfully", cart))
}

async fn checkout(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Json(body): Json<CheckoutRequest>,
) -> ApiResult<impl IntoResponse> {
    let (order, _) = state
        .db
        .carts()
        .checkout(&principal, body.payment_method, body.transaction_ref)
        .await?;
    Ok(created("Checkout successful", order))
}
