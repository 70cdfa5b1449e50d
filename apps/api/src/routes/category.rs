use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use super::{created, updated};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/category", get(list_categories).post(create_category))
        .route("/category/{id}", put(rename_category).delete(delete_category))
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub name: String,
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.categories().list().await?))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Json(body): Json<CategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let category = state.db.categories().create(&principal, &body.name).await?;
    Ok(created("Category created successfully", category))
}

async fn rename_category(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<CategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let category = state
        .db
        .categories()
        .rename(&principal, &id, &body.name)
        .await?;
    Ok(updated("Category updated successfully", category))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let category = state.db.categories().delete(&principal, &id).await?;
    Ok(updated("Category deleted successfully", category))
}
