//! # Stockroom API
//!
//! HTTP server for the back office: catalogue, taxes, stock, orders, carts,
//! suppliers, users and reports.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          API Server                                     │
//! │                                                                         │
//! │  Dashboard ───► HTTP (8000) ───► TraceLayer ───► routes::* ───► Database│
//! │                                      │              │                   │
//! │                                      ▼              ▼                   │
//! │                               request span    AuthUser (JWT)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod spreadsheet;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    routing::get,
    Router,
};
use tower_http::{classify::ServerErrorsFailureClass, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, info_span, Span};
use uuid::Uuid;

pub use config::{ApiConfig, ConfigError, LogFormat};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Builds the full router: `/health` plus every route under `/api`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", routes::api_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        user_id = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                        info!(
                            status = response.status().as_u16(),
                            latency_ms = latency.as_millis(),
                            "finished processing request"
                        );
                    },
                )
                .on_failure(
                    |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                        error!("request failed: {:?}", error);
                    },
                ),
        )
        .with_state(state)
}
