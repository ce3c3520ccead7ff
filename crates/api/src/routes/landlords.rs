//! Landlord wallet, withdrawal and payout-account routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
};
use rentflow_core::payment::RegisterPayoutAccountInput;
use rentflow_shared::types::{PageRequest, UserId};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{AppState, error::ApiError};

const MAX_PER_PAGE: u32 = 100;

/// Creates the landlord routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/landlords/{id}/wallet", get(get_wallet))
        .route("/landlords/{id}/wallet/transactions", get(list_transactions))
        .route("/landlords/{id}/wallet/verify", get(verify_wallet))
        .route("/landlords/{id}/withdrawals", post(withdraw))
        .route("/landlords/{id}/payout-account", put(register_payout_account))
}

/// Request body for a withdrawal.
#[derive(Debug, Deserialize)]
pub struct WithdrawalRequest {
    /// Amount to pay out.
    pub amount: Decimal,
    /// Client-chosen idempotency key. Generated when absent.
    pub reference: Option<String>,
}

/// GET `/landlords/{id}/wallet` - Zero balance when the landlord has no wallet yet.
async fn get_wallet(
    State(state): State<AppState>,
    Path(landlord_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.wallet.get_balance(landlord_id).await?))
}

/// GET `/landlords/{id}/wallet/transactions?page=&per_page=` - Newest first.
async fn list_transactions(
    State(state): State<AppState>,
    Path(landlord_id): Path<UserId>,
    Query(page): Query<PageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if page.page == 0 || page.per_page == 0 || page.per_page > MAX_PER_PAGE {
        return Err(ApiError::validation(
            "INVALID_PAGINATION",
            format!("page must be >= 1 and per_page between 1 and {MAX_PER_PAGE}"),
        ));
    }
    Ok(Json(state.wallet.get_transactions(landlord_id, &page).await?))
}

/// GET `/landlords/{id}/wallet/verify` - Replays the ledger against the balance.
async fn verify_wallet(
    State(state): State<AppState>,
    Path(landlord_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let body = match state.wallet.verify(landlord_id).await? {
        Ok(()) => json!({ "landlord_id": landlord_id, "consistent": true }),
        Err(mismatch) => json!({
            "landlord_id": landlord_id,
            "consistent": false,
            "mismatch": mismatch,
            "message": mismatch.to_string(),
        }),
    };
    Ok(Json(body))
}

/// POST `/landlords/{id}/withdrawals`
async fn withdraw(
    State(state): State<AppState>,
    Path(landlord_id): Path<UserId>,
    Json(payload): Json<WithdrawalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .payments
        .process_withdrawal(landlord_id, payload.amount, payload.reference)
        .await?;
    info!(
        landlord_id = %landlord_id,
        reference = %result.reference,
        status = ?result.status,
        "Withdrawal requested via API"
    );
    Ok(Json(result))
}

/// PUT `/landlords/{id}/payout-account`
async fn register_payout_account(
    State(state): State<AppState>,
    Path(landlord_id): Path<UserId>,
    Json(payload): Json<RegisterPayoutAccountInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state
            .payments
            .register_payout_account(landlord_id, payload)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use rentflow_core::gateway::TransferOutcome;
    use serde_json::json;

    use crate::testing::{LANDLORD, TestApp, date, test_app};

    async fn funded(app: &TestApp) {
        let contract = app.create_contract("monthly", date(2024, 2, 1)).await;
        let (status, _) = app
            .post(
                "/api/v1/payments",
                &json!({
                    "contract_id": contract["id"],
                    "amount": "50000",
                    "payment_method": "card",
                    "reference": "RENT_fund",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        app.gateway.add_account("0123456789", "058", "Ada Landlord");
        let (status, account) = app
            .json(
                Method::PUT,
                &format!("/api/v1/landlords/{LANDLORD}/payout-account"),
                &json!({ "account_number": "0123456789", "bank_code": "058" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{account}");
        assert_eq!(account["account_name"], "Ada Landlord");
    }

    #[tokio::test]
    async fn test_empty_wallet_is_zero() {
        let app = test_app(date(2024, 2, 1));
        let (status, body) = app.get(&format!("/api/v1/landlords/{LANDLORD}/wallet")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["available_balance"], "0");
        assert_eq!(body["currency"], "NGN");
    }

    #[tokio::test]
    async fn test_withdrawal_settles_and_ledger_verifies() {
        let app = test_app(date(2024, 2, 1));
        funded(&app).await;

        let (status, result) = app
            .post(
                &format!("/api/v1/landlords/{LANDLORD}/withdrawals"),
                &json!({ "amount": "20000", "reference": "WD_api_1" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{result}");
        assert_eq!(result["status"], "completed");

        let (_, wallet) = app.get(&format!("/api/v1/landlords/{LANDLORD}/wallet")).await;
        assert_eq!(wallet["available_balance"], "30000");
        assert_eq!(wallet["total_withdrawn"], "20000");

        let (status, page) = app
            .get(&format!(
                "/api/v1/landlords/{LANDLORD}/wallet/transactions?page=1&per_page=10"
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["data"].as_array().unwrap().len(), 2);

        let (_, verify) = app
            .get(&format!("/api/v1/landlords/{LANDLORD}/wallet/verify"))
            .await;
        assert_eq!(verify["consistent"], true);
    }

    #[tokio::test]
    async fn test_rejected_transfer_refunds() {
        let app = test_app(date(2024, 2, 1));
        funded(&app).await;
        app.gateway
            .script_transfer(TransferOutcome::Reject("Insufficient float".into()));

        let (status, body) = app
            .post(
                &format!("/api/v1/landlords/{LANDLORD}/withdrawals"),
                &json!({ "amount": "20000" }),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "TRANSFER_FAILED");

        let (_, wallet) = app.get(&format!("/api/v1/landlords/{LANDLORD}/wallet")).await;
        assert_eq!(wallet["available_balance"], "50000");
    }

    #[tokio::test]
    async fn test_overdraw_is_rejected() {
        let app = test_app(date(2024, 2, 1));
        funded(&app).await;
        let (status, body) = app
            .post(
                &format!("/api/v1/landlords/{LANDLORD}/withdrawals"),
                &json!({ "amount": "90000" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INSUFFICIENT_BALANCE");
    }

    #[tokio::test]
    async fn test_pagination_bounds() {
        let app = test_app(date(2024, 2, 1));
        let (status, body) = app
            .get(&format!(
                "/api/v1/landlords/{LANDLORD}/wallet/transactions?per_page=500"
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_PAGINATION");
    }
}
