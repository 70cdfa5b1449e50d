use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use stockroom_core::import::SupplierDraft;
use stockroom_db::repository::supplier::SupplierPatch;

use super::{created, message, updated};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::spreadsheet;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/supplier", get(list_suppliers).post(create_supplier))
        .route("/supplier/import", post(import_suppliers))
        .route(
            "/supplier/{id}",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
}

async fn list_suppliers(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.suppliers().list().await?))
}

async fn get_supplier(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.suppliers().get(&id).await?))
}

async fn create_supplier(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Json(body): Json<SupplierDraft>,
) -> ApiResult<impl IntoResponse> {
    let supplier = state.db.suppliers().create(&principal, body).await?;
    Ok(created("Supplier created successfully", supplier))
}

async fn update_supplier(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<SupplierPatch>,
) -> ApiResult<impl IntoResponse> {
    let supplier = state.db.suppliers().update(&principal, &id, patch).await?;
    Ok(updated("Supplier updated", supplier))
}

/// Products of a deleted supplier keep existing with no supplier.
async fn delete_supplier(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.db.suppliers().delete(&principal, &id).await?;
    Ok(message("Supplier deleted"))
}

async fn import_suppliers(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let rows = spreadsheet::read_upload(multipart).await?;
    let report = state.db.suppliers().import_rows(&principal, &rows).await?;

    Ok(Json(json!({
        "message": "Import completed",
        "added": report.added,
        "skipped": report.skipped,
        "errors": report.errors,
    })))
}
