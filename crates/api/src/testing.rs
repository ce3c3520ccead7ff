//! Router fixture over the in-memory store and sandbox gateway.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use rentflow_core::clock::FixedClock;
use rentflow_core::contract::ContractService;
use rentflow_core::escrow::{EscrowPolicy, EscrowReleaseEngine};
use rentflow_core::gateway::SandboxGateway;
use rentflow_core::jobs::{JobRunner, RetryPolicy, register_standard_jobs};
use rentflow_core::notification::{NotificationScheduler, OutboxSender, ReminderPolicy};
use rentflow_core::payment::{PaymentProcessor, PaymentSettings};
use rentflow_core::store::InMemoryLedgerStore;
use rentflow_core::wallet::WalletService;
use rentflow_gateway::{SIGNATURE_HEADER, WebhookVerifier};
use rentflow_shared::config::JobsConfig;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::{AppState, create_router};

pub const SECRET: &str = "sk_test_api";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryLedgerStore>,
    pub gateway: Arc<SandboxGateway>,
    pub outbox: Arc<OutboxSender>,
    pub verifier: WebhookVerifier,
}

pub fn test_app(today: NaiveDate) -> TestApp {
    let store = Arc::new(InMemoryLedgerStore::new());
    let clock = Arc::new(FixedClock::on(today));
    let gateway = Arc::new(SandboxGateway::new());
    let outbox = Arc::new(OutboxSender::new());

    let wallet = Arc::new(WalletService::new(store.clone(), clock.clone()));
    let notifications = Arc::new(NotificationScheduler::new(
        store.clone(),
        outbox.clone(),
        clock.clone(),
        ReminderPolicy::default(),
    ));
    let contracts = Arc::new(ContractService::new(store.clone(), clock.clone()));
    let payments = Arc::new(
        PaymentProcessor::new(
            store.clone(),
            wallet.clone(),
            gateway.clone(),
            clock.clone(),
            PaymentSettings::default(),
        )
        .with_notifier(notifications.clone()),
    );
    let escrow = Arc::new(
        EscrowReleaseEngine::new(
            store.clone(),
            wallet.clone(),
            clock.clone(),
            EscrowPolicy::default(),
        )
        .with_notifier(notifications.clone()),
    );
    let jobs = register_standard_jobs(
        JobRunner::new(RetryPolicy::default(), clock),
        &JobsConfig::default(),
        escrow.clone(),
        notifications,
        contracts.clone(),
    )
    .unwrap();

    let verifier = WebhookVerifier::new(SECRET);
    let state = AppState {
        store: store.clone(),
        contracts,
        payments,
        wallet,
        escrow,
        jobs: Arc::new(jobs),
        webhooks: Arc::new(verifier.clone()),
    };

    TestApp {
        router: create_router(state),
        store,
        gateway,
        outbox,
        verifier,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn json(&self, method: Method, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.json(Method::POST, uri, body).await
    }

    /// Delivers a webhook signed with the test secret.
    pub async fn webhook(&self, payload: &Value) -> (StatusCode, Value) {
        let body = payload.to_string();
        let signature = self.verifier.sign(body.as_bytes());
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/webhooks/gateway")
                .header(SIGNATURE_HEADER, signature)
                .header("Content-Type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// Creates a 50 000/month contract through the API.
    pub async fn create_contract(&self, payout: &str, start: NaiveDate) -> Value {
        let (status, body) = self
            .post(
                "/api/v1/contracts",
                &json!({
                    "tenant_id": "0190a000-0000-7000-8000-000000000001",
                    "landlord_id": "0190a000-0000-7000-8000-000000000002",
                    "property_id": "0190a000-0000-7000-8000-000000000003",
                    "unit_id": "0190a000-0000-7000-8000-000000000004",
                    "monthly_amount": "50000",
                    "start_date": start,
                    "expiry_date": date(2026, 12, 31),
                    "payout_type": payout,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

pub const LANDLORD: &str = "0190a000-0000-7000-8000-000000000002";
