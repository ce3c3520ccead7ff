//! Payment routes.
//!
//! Every posting is idempotent on the gateway reference: a replay answers
//! 200 with `duplicate: true` instead of 201.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rentflow_core::payment::{InitializePaymentInput, PaymentResult, ProcessPaymentInput};

use crate::{AppState, error::ApiError};

/// Creates the payment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments", post(process_payment))
        .route("/payments/initialize", post(initialize_payment))
        .route("/payments/{reference}", get(get_payment))
        .route("/payments/{reference}/complete", post(complete_payment))
}

fn posted(result: PaymentResult) -> impl IntoResponse {
    let status = if result.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    (status, Json(result))
}

/// POST `/payments` - Posts a payment confirmed out of band.
async fn process_payment(
    State(state): State<AppState>,
    Json(payload): Json<ProcessPaymentInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(posted(state.payments.process_payment(payload).await?))
}

/// POST `/payments/initialize` - Opens a hosted checkout.
async fn initialize_payment(
    State(state): State<AppState>,
    Json(payload): Json<InitializePaymentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let checkout = state.payments.initialize_payment(payload).await?;
    Ok((StatusCode::CREATED, Json(checkout)))
}

async fn get_payment(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = state
        .store
        .find_payment_by_reference(&reference)
        .await?
        .ok_or_else(|| {
            ApiError::not_found("PAYMENT_NOT_FOUND", format!("Payment not found: {reference}"))
        })?;
    Ok(Json(payment))
}

/// POST `/payments/{reference}/complete` - Verifies a checkout and posts it.
async fn complete_payment(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(posted(state.payments.complete_payment(&reference).await?))
}
