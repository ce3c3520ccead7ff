//! Notification contact routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::put,
};
use rentflow_core::notification::Recipient;
use rentflow_shared::types::UserId;
use serde::Deserialize;

use crate::{AppState, error::ApiError};

/// Creates the user contact routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/users/{id}/contact", put(upsert_contact))
}

/// Contact details used by the notification channels.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    /// Name used in messages.
    pub display_name: String,
    /// Email address.
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Push token.
    pub push_token: Option<String>,
}

/// PUT `/users/{id}/contact`
async fn upsert_contact(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(payload): Json<ContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.display_name.trim().is_empty() {
        return Err(ApiError::validation(
            "INVALID_CONTACT",
            "display_name is required",
        ));
    }
    let recipient = Recipient {
        user_id,
        display_name: payload.display_name,
        email: payload.email,
        phone: payload.phone,
        push_token: payload.push_token,
    };
    if !recipient.has_channel() {
        return Err(ApiError::validation(
            "INVALID_CONTACT",
            "At least one of email, phone or push_token is required",
        ));
    }
    state.store.upsert_recipient(&recipient).await?;
    Ok(Json(recipient))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use rentflow_core::store::LedgerStore;
    use rentflow_shared::types::UserId;
    use serde_json::json;

    use crate::testing::{date, test_app};

    #[tokio::test]
    async fn test_upsert_contact() {
        let app = test_app(date(2024, 2, 1));
        let user = UserId::new();
        let (status, _) = app
            .json(
                Method::PUT,
                &format!("/api/v1/users/{user}/contact"),
                &json!({ "display_name": "Ada", "email": "ada@example.com" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let stored = app.store.find_recipient(user).await.unwrap().unwrap();
        assert_eq!(stored.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn test_tenant_contact_receives_payment_receipt() {
        let app = test_app(date(2024, 2, 1));
        let tenant = "0190a000-0000-7000-8000-000000000001";
        app.json(
            Method::PUT,
            &format!("/api/v1/users/{tenant}/contact"),
            &json!({ "display_name": "Tenant", "email": "tenant@example.com" }),
        )
        .await;
        let contract = app.create_contract("monthly", date(2024, 2, 1)).await;
        let (status, _) = app
            .post(
                "/api/v1/payments",
                &json!({
                    "contract_id": contract["id"],
                    "amount": "50000",
                    "payment_method": "card",
                    "reference": "RENT_receipt",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let sent = app.outbox.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user_id.to_string(), tenant);
    }

    #[tokio::test]
    async fn test_contact_without_channel_is_rejected() {
        let app = test_app(date(2024, 2, 1));
        let (status, body) = app
            .json(
                Method::PUT,
                &format!("/api/v1/users/{}/contact", UserId::new()),
                &json!({ "display_name": "Ada", "email": "  " }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_CONTACT");
    }
}
