//! `PaystackClient` against a local mock of the processor API.

use std::time::Duration;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use rentflow_core::gateway::{
    AccountDetails, GatewayError, InitializeTransaction, PaymentGateway, TransactionStatus,
    TransferRequest,
};
use rentflow_gateway::PaystackClient;
use rentflow_shared::config::GatewayConfig;
use rentflow_shared::types::Currency;
use rust_decimal_macros::dec;
use serde_json::{Value, json};

const SECRET: &str = "sk_test_mock";

async fn serve(router: Router) -> PaystackClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    let config = GatewayConfig {
        base_url: format!("http://{addr}/"),
        secret_key: SECRET.into(),
        callback_url: None,
        timeout_secs: 1,
    };
    PaystackClient::new(&config, Currency::Ngn).unwrap()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("authorization").and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {SECRET}").as_str())
}

async fn initialize(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status": false, "message": "Invalid key"})),
        );
    }
    assert_eq!(body["amount"], 5_000_000);
    assert_eq!(body["currency"], "NGN");
    (
        StatusCode::OK,
        Json(json!({
            "status": true,
            "message": "Authorization URL created",
            "data": {
                "authorization_url": "https://checkout.example/abc",
                "access_code": "abc",
                "reference": body["reference"],
            }
        })),
    )
}

async fn verify(Path(reference): Path<String>) -> Json<Value> {
    Json(json!({
        "status": true,
        "message": "Verification successful",
        "data": {
            "reference": reference,
            "status": "success",
            "amount": 5_000_050,
            "channel": "card",
            "customer": { "email": "tenant@example.com" },
            "authorization": {
                "authorization_code": "AUTH_x1",
                "reusable": true,
                "card_type": "visa",
                "last4": "4081",
                "bank": "TEST BANK"
            },
            "metadata": ""
        }
    }))
}

async fn missing_transfer() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"status": false, "message": "Transfer not found"})),
    )
}

async fn slow_transfer() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({"status": true, "data": {}}))
}

async fn bad_account() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"status": false, "message": "Invalid account number"})),
    )
}

async fn down() -> StatusCode {
    StatusCode::BAD_GATEWAY
}

fn router() -> Router {
    Router::new()
        .route("/transaction/initialize", post(initialize))
        .route("/transaction/verify/{reference}", get(verify))
        .route("/transfer/verify/{reference}", get(missing_transfer))
        .route("/transfer", post(slow_transfer))
        .route("/transferrecipient", post(bad_account))
        .route("/bank/resolve", get(down))
}

#[tokio::test]
async fn test_initialize_sends_minor_units() {
    let client = serve(router()).await;
    let reference = client.new_reference("rent");
    let initialized = client
        .initialize_transaction(InitializeTransaction {
            email: "tenant@example.com".into(),
            amount: dec!(50000),
            reference: reference.clone(),
            callback_url: None,
            metadata: json!({ "contract_id": "c1" }),
        })
        .await
        .unwrap();
    assert_eq!(initialized.reference, reference);
    assert_eq!(initialized.access_code, "abc");
}

#[tokio::test]
async fn test_verify_normalizes_response() {
    let client = serve(router()).await;
    let verified = client.verify_transaction("RENT_1_abc").await.unwrap();
    assert_eq!(verified.status, TransactionStatus::Success);
    assert_eq!(verified.amount, dec!(50000.50));
    assert_eq!(verified.customer_email.as_deref(), Some("tenant@example.com"));
    assert!(verified.metadata.is_null());
    let auth = verified.authorization.unwrap();
    assert_eq!(auth.authorization_code, "AUTH_x1");
    assert!(auth.reusable);
}

#[tokio::test]
async fn test_error_classification() {
    let client = serve(router()).await;

    assert!(matches!(
        client.verify_transfer("WD_1_x").await,
        Err(GatewayError::NotFound(_))
    ));
    assert!(matches!(
        client.resolve_account_number("0123456789", "058").await,
        Err(GatewayError::Unavailable(_))
    ));
    assert!(matches!(
        client
            .create_transfer_recipient(AccountDetails {
                account_name: "Landlord".into(),
                account_number: "000".into(),
                bank_code: "058".into(),
                currency: "NGN".into(),
            })
            .await,
        Err(GatewayError::Rejected(_))
    ));
}

#[tokio::test]
async fn test_slow_transfer_is_a_timeout() {
    let client = serve(router()).await;
    let err = client
        .initiate_transfer(TransferRequest {
            amount: dec!(10000),
            recipient_code: "RCP_1".into(),
            reason: "Rent payout".into(),
            reference: "WD_1_slow".into(),
        })
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "got {err:?}");
}

#[tokio::test]
async fn test_unreachable_gateway_is_unavailable() {
    let config = GatewayConfig {
        base_url: "http://127.0.0.1:9".into(),
        secret_key: SECRET.into(),
        callback_url: None,
        timeout_secs: 1,
    };
    let client = PaystackClient::new(&config, Currency::Ngn).unwrap();
    let err = client.verify_transaction("RENT_1").await.unwrap_err();
    assert!(
        matches!(err, GatewayError::Unavailable(_) | GatewayError::Timeout(_)),
        "got {err:?}"
    );
}
