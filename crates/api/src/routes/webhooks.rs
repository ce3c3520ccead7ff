//! Gateway webhook endpoint.
//!
//! The signature covers the raw body, so the handler takes `Bytes` and only
//! parses JSON after verification. Authentic events are always answered
//! with 200; a processing failure is logged and the event stays unrecorded
//! so a redelivery or a manual complete can apply it later.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
};
use rentflow_gateway::SIGNATURE_HEADER;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{AppState, error::ApiError};

/// Creates the webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/gateway", post(receive_event))
}

/// POST `/webhooks/gateway`
async fn receive_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !state.webhooks.verify(&body, signature) {
        warn!(bytes = body.len(), "Rejected webhook with invalid signature");
        return Err(ApiError::unauthorized("Invalid webhook signature"));
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::validation("INVALID_PAYLOAD", format!("Invalid JSON: {e}")))?;

    match state.payments.handle_event(&payload).await {
        Ok(outcome) => {
            info!(?outcome, "Webhook handled");
            Ok(Json(outcome).into_response())
        }
        Err(e) => {
            warn!(error = %e, "Webhook processing deferred");
            Ok(Json(json!({ "outcome": "deferred" })).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use rentflow_core::gateway::GatewayError;
    use rentflow_gateway::SIGNATURE_HEADER;
    use serde_json::json;

    use crate::testing::{LANDLORD, date, test_app};

    #[tokio::test]
    async fn test_bad_signature_is_401() {
        let app = test_app(date(2024, 2, 1));
        let (status, body) = app
            .send(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/webhooks/gateway")
                    .header(SIGNATURE_HEADER, "deadbeef")
                    .body(Body::from(r#"{"event":"charge.success"}"#))
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_missing_signature_is_401() {
        let app = test_app(date(2024, 2, 1));
        let (status, _) = app
            .post("/api/v1/webhooks/gateway", &json!({"event": "charge.success"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_charge_success_posts_once() {
        let app = test_app(date(2024, 2, 1));
        let contract = app.create_contract("monthly", date(2024, 2, 1)).await;
        let (_, checkout) = app
            .post(
                "/api/v1/payments/initialize",
                &json!({ "contract_id": contract["id"], "email": "tenant@example.com" }),
            )
            .await;
        let reference = checkout["reference"].as_str().unwrap().to_string();
        app.gateway.complete_checkout(&reference, "card").unwrap();

        let event = json!({ "event": "charge.success", "data": { "reference": reference } });
        let (status, body) = app.webhook(&event).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "processed");

        let (status, body) = app.webhook(&event).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "duplicate");

        let (_, wallet) = app.get(&format!("/api/v1/landlords/{LANDLORD}/wallet")).await;
        assert_eq!(wallet["available_balance"], "50000");
    }

    #[tokio::test]
    async fn test_transient_failure_is_deferred_with_200() {
        let app = test_app(date(2024, 2, 1));
        let contract = app.create_contract("monthly", date(2024, 2, 1)).await;
        let (_, checkout) = app
            .post(
                "/api/v1/payments/initialize",
                &json!({ "contract_id": contract["id"], "email": "tenant@example.com" }),
            )
            .await;
        let reference = checkout["reference"].as_str().unwrap().to_string();
        app.gateway.complete_checkout(&reference, "card").unwrap();
        app.gateway
            .fail_next_verification(GatewayError::Unavailable("maintenance".into()));

        let event = json!({ "event": "charge.success", "data": { "reference": reference } });
        let (status, body) = app.webhook(&event).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "deferred");

        let (_, body) = app.webhook(&event).await;
        assert_eq!(body["outcome"], "processed");
    }

    #[tokio::test]
    async fn test_unhandled_event_is_ignored() {
        let app = test_app(date(2024, 2, 1));
        let (status, body) = app
            .webhook(&json!({ "event": "subscription.create", "data": {} }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "ignored");
    }
}
