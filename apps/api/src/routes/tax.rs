use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use stockroom_db::repository::tax::{TaxInput, TaxPatch};

use super::{created, message, updated};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/taxes", get(list_taxes).post(create_tax))
        .route("/taxes/{id}", get(get_tax).put(update_tax).delete(delete_tax))
}

async fn list_taxes(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.taxes().list().await?))
}

async fn get_tax(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.taxes().get(&id).await?))
}

async fn create_tax(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Json(body): Json<TaxInput>,
) -> ApiResult<impl IntoResponse> {
    let tax = state.db.taxes().create(&principal, body).await?;
    Ok(created("Tax created successfully", tax))
}

/// Existing product prices are not recomputed.
async fn update_tax(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<TaxPatch>,
) -> ApiResult<impl IntoResponse> {
    let tax = state.db.taxes().update(&principal, &id, patch).await?;
    Ok(updated("Tax updated successfully", tax))
}

async fn delete_tax(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.db.taxes().delete(&principal, &id).await?;
    Ok(message("Tax deleted successfully"))
}
