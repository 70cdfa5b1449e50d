use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use stockroom_db::repository::payment::NewPayment;

use super::{created, DateRangeQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payment", get(list_payments).post(create_payment))
        .route("/payment/report", get(payment_report))
        .route("/sales/report", get(sales_report))
}

async fn list_payments(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.payments().list().await?))
}

async fn create_payment(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Json(body): Json<NewPayment>,
) -> ApiResult<impl IntoResponse> {
    let payment = state.db.payments().create(&principal, body).await?;
    Ok(created("Payment recorded", payment))
}

/// `[{_id: status, total}]`
async fn payment_report(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.payments().summary().await?))
}

/// Paid order count and revenue between two dates.
async fn sales_report(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<impl IntoResponse> {
    let (from, to) = range.required()?;
    Ok(Json(state.db.orders().sales_report(from, to).await?))
}
