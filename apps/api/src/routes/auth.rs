//! Registration, login and user administration.
//!
//! The very first registration needs no token and makes an admin. After that
//! only an admin can register users.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use stockroom_core::{OneOrMany, UserStatus};
use stockroom_db::repository::user::NewUser;
use tracing::{info, warn};

use crate::auth::{AdminUser, MaybeAuthUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/users", get(list_users))
        .route("/users/{id}", put(update_user_role))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub role_id: Option<String>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(principal): MaybeAuthUser,
    Json(body): Json<OneOrMany<NewUser>>,
) -> ApiResult<impl IntoResponse> {
    let registrar = match principal {
        Some(p) if !p.is_admin() => {
            return Err(ApiError::forbidden("Only administrators can register users"))
        }
        Some(p) => Some(p),
        None => {
            if state.db.users().count().await? > 0 {
                return Err(ApiError::unauthenticated("Authentication required"));
            }
            None
        }
    };

    let entries = body.into_vec();
    if entries.is_empty() {
        return Err(ApiError::bad_request("At least one user is required"));
    }

    let users = state.db.users().register(registrar.as_ref(), entries).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("{} user(s) registered successfully", users.len()),
            "users": users,
        })),
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("Email and password required"));
    }

    let Some(user) = state
        .db
        .users()
        .verify_credentials(&body.email, &body.password)
        .await?
    else {
        warn!(email = %body.email.trim(), "Failed login attempt");
        return Err(ApiError::unauthenticated("Invalid email or password"));
    };
    if user.status != UserStatus::Active {
        return Err(ApiError::unauthenticated("User is not active"));
    }

    let token = state.jwt.generate_token(&user)?;
    info!(user_id = %user.id, role = %user.role_name, "User logged in");

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": user,
    })))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> ApiResult<impl IntoResponse> {
    let users = state.db.users().list().await?;
    Ok(Json(json!({ "users": users })))
}

async fn update_user_role(
    State(state): State<Arc<AppState>>,
    AdminUser(principal): AdminUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    let role_id = body
        .role_id
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Role ID is required"))?;

    let user = state.db.users().update_role(&principal, &id, &role_id).await?;
    Ok(Json(json!({ "message": "User role updated", "user": user })))
}
