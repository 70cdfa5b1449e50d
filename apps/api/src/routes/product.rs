//! Catalogue routes: products, spreadsheet import and stock receipts.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use stockroom_core::import::ProductDraft;
use stockroom_core::OneOrMany;
use stockroom_db::repository::product::{ProductFilter, ProductPatch};
use stockroom_db::repository::stock::ReceiveStock;
use stockroom_db::PageRequest;

use super::{created, message, updated};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::spreadsheet;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/product", get(list_products).post(create_products))
        .route("/product/import", post(import_products))
        .route("/product/barcode/{code}", get(get_by_code))
        .route(
            "/product/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/product/{id}/receive-stock", post(receive_stock))
        .route("/product/{id}/stock-history", get(stock_history))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Query(filter): Query<ProductFilter>,
    Query(page): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = state
        .db
        .products()
        .list(&filter, PageRequest::new(page.page, page.limit))
        .await?;
    Ok(Json(page))
}

/// A single product is all-or-nothing. A batch inserts what it can and
/// reports the rest.
async fn create_products(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Json(body): Json<OneOrMany<ProductDraft>>,
) -> ApiResult<impl IntoResponse> {
    match body {
        OneOrMany::One(draft) => {
            let product = state.db.products().create(&principal, draft).await?;
            Ok(created("Product created successfully", product))
        }
        OneOrMany::Many(drafts) => {
            if drafts.is_empty() {
                return Err(ApiError::bad_request("At least one product is required"));
            }
            let (products, report) = state.db.products().create_many(&principal, drafts).await?;
            Ok((
                StatusCode::CREATED,
                Json(json!({
                    "message": format!("{} product(s) created", products.len()),
                    "data": products,
                    "skipped": report.skipped,
                    "errors": report.errors,
                })),
            ))
        }
    }
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.products().get(&id).await?))
}

/// Looks a code up as a SKU first, then as a barcode.
async fn get_by_code(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Path(code): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let product = state.db.products().get_by_code(&code).await?;
    Ok(Json(json!({ "data": product })))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> ApiResult<impl IntoResponse> {
    let product = state.db.products().update(&principal, &id, patch).await?;
    Ok(updated("Product updated successfully", product))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.db.products().delete(&principal, &id).await?;
    Ok(message("Product deleted successfully"))
}

async fn import_products(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let rows = spreadsheet::read_upload(multipart).await?;
    let report = state.db.products().import_rows(&principal, &rows).await?;

    Ok(Json(json!({
        "message": "Import completed",
        "added": report.added,
        "skipped": report.skipped,
        "errors": report.errors,
    })))
}

async fn receive_stock(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<ReceiveStock>,
) -> ApiResult<impl IntoResponse> {
    let received = state.db.stock().receive_stock(&principal, &id, body).await?;
    Ok(created("Stock received successfully", received))
}

async fn stock_history(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let receipts = state.db.stock().history(&id).await?;
    Ok(Json(json!({ "data": receipts })))
}
