//! Contract routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rentflow_core::contract::CreateContractInput;
use rentflow_shared::types::ContractId;
use serde_json::json;
use tracing::info;

use crate::{AppState, error::ApiError};

/// Creates the contract routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/contracts", post(create_contract))
        .route("/contracts/{id}", get(get_contract))
        .route("/contracts/{id}/terminate", post(terminate_contract))
        .route("/contracts/{id}/arrears", get(get_arrears))
        .route("/contracts/{id}/payments", get(list_payments))
        .route("/contracts/{id}/escrow", get(list_escrow))
        .route("/contracts/{id}/charge", post(charge_contract))
}

/// POST `/contracts` - Registers a finalized tenancy.
async fn create_contract(
    State(state): State<AppState>,
    Json(payload): Json<CreateContractInput>,
) -> Result<impl IntoResponse, ApiError> {
    let contract = state.contracts.create_contract(payload).await?;
    Ok((StatusCode::CREATED, Json(contract)))
}

/// GET `/contracts/{id}`
async fn get_contract(
    State(state): State<AppState>,
    Path(id): Path<ContractId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.contracts.get_contract(id).await?))
}

/// POST `/contracts/{id}/terminate`
async fn terminate_contract(
    State(state): State<AppState>,
    Path(id): Path<ContractId>,
) -> Result<impl IntoResponse, ApiError> {
    let contract = state.contracts.terminate_contract(id).await?;
    info!(contract_id = %id, "Contract terminated via API");
    Ok(Json(contract))
}

/// GET `/contracts/{id}/arrears` - Outstanding cycles as of today.
async fn get_arrears(
    State(state): State<AppState>,
    Path(id): Path<ContractId>,
) -> Result<impl IntoResponse, ApiError> {
    let arrears = state.contracts.arrears(id).await?;
    Ok(Json(json!({
        "contract_id": id,
        "cycles": arrears.cycles,
        "amount": arrears.amount,
        "oldest_due": arrears.oldest_due,
    })))
}

/// GET `/contracts/{id}/payments` - Posted payment history.
async fn list_payments(
    State(state): State<AppState>,
    Path(id): Path<ContractId>,
) -> Result<impl IntoResponse, ApiError> {
    state.contracts.get_contract(id).await?;
    let payments = state.store.payments_for_contract(id).await?;
    Ok(Json(json!({ "payments": payments })))
}

async fn list_escrow(
    State(state): State<AppState>,
    Path(id): Path<ContractId>,
) -> Result<impl IntoResponse, ApiError> {
    state.contracts.get_contract(id).await?;
    let escrows = state.store.escrows_for_contract(id).await?;
    Ok(Json(json!({ "escrows": escrows })))
}

/// POST `/contracts/{id}/charge` - Charges the tenant's stored card.
async fn charge_contract(
    State(state): State<AppState>,
    Path(id): Path<ContractId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.payments.charge_recurring_payment(id).await?))
}
