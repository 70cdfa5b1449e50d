use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// `GET /health`: 200 when the database answers and is fully migrated,
/// 503 otherwise.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let reachable = state.db.health_check().await;
    let migrations = match state.db.migration_status().await {
        Ok((total, applied)) => Some(json!({ "total": total, "applied": applied })),
        Err(_) => None,
    };
    let migrated = migrations
        .as_ref()
        .is_some_and(|m| m["total"] == m["applied"]);

    if reachable && migrated {
        (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "connected", "migrations": migrations })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "database": "unreachable", "migrations": migrations })),
        )
    }
}
