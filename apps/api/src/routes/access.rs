//! Roles and permissions. Everything except listing permissions is admin
//! only.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use stockroom_core::OneOrMany;
use stockroom_db::repository::access::{PermissionInput, RoleInput, RolePatch};

use super::{created, message, updated};
use crate::auth::{AdminUser, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/role", get(list_roles).post(create_roles))
        .route("/role/permissions", post(assign_permissions))
        .route("/role/{id}", get(get_role).put(update_role).delete(delete_role))
        .route("/permission", get(list_permissions).post(create_permissions))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPermissionsRequest {
    pub role_id: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

// =============================================================================
// Roles
// =============================================================================

async fn list_roles(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.access().list_roles().await?))
}

async fn get_role(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.access().get_role(&id).await?))
}

/// All roles in a batch are created, or none.
async fn create_roles(
    State(state): State<Arc<AppState>>,
    AdminUser(principal): AdminUser,
    Json(body): Json<OneOrMany<RoleInput>>,
) -> ApiResult<impl IntoResponse> {
    let inputs = body.into_vec();
    if inputs.is_empty() {
        return Err(ApiError::bad_request("At least one role is required"));
    }

    let roles = state.db.access().create_roles(&principal, inputs).await?;
    Ok(created("Role(s) created successfully", roles))
}

async fn update_role(
    State(state): State<Arc<AppState>>,
    AdminUser(principal): AdminUser,
    Path(id): Path<String>,
    Json(patch): Json<RolePatch>,
) -> ApiResult<impl IntoResponse> {
    let role = state.db.access().update_role(&principal, &id, patch).await?;
    Ok(updated("Role updated successfully", role))
}

async fn delete_role(
    State(state): State<Arc<AppState>>,
    AdminUser(principal): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.db.access().delete_role(&principal, &id).await?;
    Ok(message("Role deleted successfully"))
}

async fn assign_permissions(
    State(state): State<Arc<AppState>>,
    AdminUser(principal): AdminUser,
    Json(body): Json<AssignPermissionsRequest>,
) -> ApiResult<impl IntoResponse> {
    let role = state
        .db
        .access()
        .assign_permissions(&principal, &body.role_id, body.permissions)
        .await?;
    Ok(updated("Permissions assigned", role))
}

// =============================================================================
// Permissions
// =============================================================================

async fn list_permissions(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.access().list_permissions().await?))
}

/// Names that already exist are skipped.
async fn create_permissions(
    State(state): State<Arc<AppState>>,
    AdminUser(principal): AdminUser,
    Json(body): Json<OneOrMany<PermissionInput>>,
) -> ApiResult<impl IntoResponse> {
    let inputs = body.into_vec();
    if inputs.is_empty() {
        return Err(ApiError::bad_request("At least one permission is required"));
    }

    let permissions = state
        .db
        .access()
        .create_permissions(&principal, inputs)
        .await?;
    Ok(created("Permission(s) created successfully", permissions))
}
