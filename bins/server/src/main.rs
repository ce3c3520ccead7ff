//! Rentflow API Server
//!
//! Wires the ledger store, payment gateway and notification channel into the
//! engine services, starts the job schedules and serves the HTTP API.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rentflow_api::{AppState, create_router};
use rentflow_core::clock::{Clock, SystemClock};
use rentflow_core::contract::ContractService;
use rentflow_core::escrow::{EscrowPolicy, EscrowReleaseEngine};
use rentflow_core::gateway::{PaymentGateway, SandboxGateway};
use rentflow_core::jobs::{JobRunner, RetryPolicy, register_standard_jobs};
use rentflow_core::notification::{
    EmailNotificationSender, LogNotificationSender, NotificationScheduler, NotificationSender,
    ReminderPolicy,
};
use rentflow_core::payment::{PaymentProcessor, PaymentSettings};
use rentflow_core::store::{InMemoryLedgerStore, LedgerStore};
use rentflow_core::wallet::WalletService;
use rentflow_db::{PgLedgerStore, connect_with};
use rentflow_gateway::{PaystackClient, WebhookVerifier};
use rentflow_shared::types::Currency;
use rentflow_shared::{AppConfig, EmailService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rentflow=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store: Arc<dyn LedgerStore> = if config.database.url.is_some() {
        let db = connect_with(&config.database).await?;
        info!("Connected to database");
        Arc::new(PgLedgerStore::new(db))
    } else {
        warn!("database.url not set; using the in-memory ledger store");
        Arc::new(InMemoryLedgerStore::new())
    };

    let gateway: Arc<dyn PaymentGateway> = if config.gateway.secret_key.is_empty() {
        warn!("gateway.secret_key not set; using the sandbox gateway");
        Arc::new(SandboxGateway::new())
    } else {
        let currency: Currency = config
            .engine
            .currency
            .parse()
            .map_err(|e| anyhow::anyhow!("engine.currency: {e}"))?;
        info!(base_url = %config.gateway.base_url, "Payment gateway configured");
        Arc::new(PaystackClient::new(&config.gateway, currency)?)
    };

    let sender: Arc<dyn NotificationSender> = if config.email.smtp_username.is_empty() {
        info!("SMTP credentials not set; notifications go to the log");
        Arc::new(LogNotificationSender)
    } else {
        info!(
            smtp_host = %config.email.smtp_host,
            smtp_port = %config.email.smtp_port,
            "Email notifications configured"
        );
        Arc::new(EmailNotificationSender::new(EmailService::new(
            config.email.clone(),
        )))
    };

    let currency = config.engine.currency.clone();
    let wallet = Arc::new(
        WalletService::new(store.clone(), clock.clone()).with_currency(currency.clone()),
    );
    let notifications = Arc::new(
        NotificationScheduler::new(
            store.clone(),
            sender,
            clock.clone(),
            ReminderPolicy::from(&config.notifications),
        )
        .with_currency(currency),
    );
    let contracts = Arc::new(
        ContractService::new(store.clone(), clock.clone())
            .with_grace_days(config.notifications.overdue_grace_days),
    );
    let payments = Arc::new(
        PaymentProcessor::new(
            store.clone(),
            wallet.clone(),
            gateway,
            clock.clone(),
            PaymentSettings::from(&config),
        )
        .with_notifier(notifications.clone()),
    );
    let escrow = Arc::new(
        EscrowReleaseEngine::new(
            store.clone(),
            wallet.clone(),
            clock.clone(),
            EscrowPolicy::from(&config.escrow),
        )
        .with_notifier(notifications.clone()),
    );

    let jobs = Arc::new(register_standard_jobs(
        JobRunner::new(RetryPolicy::from(&config.jobs), clock),
        &config.jobs,
        escrow.clone(),
        notifications,
        contracts.clone(),
    )?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let job_handles = if config.jobs.enabled {
        Arc::clone(&jobs).spawn(shutdown_rx)
    } else {
        info!("Scheduled jobs disabled");
        Vec::new()
    };

    let state = AppState {
        store,
        contracts,
        payments,
        wallet,
        escrow,
        jobs,
        webhooks: Arc::new(WebhookVerifier::new(config.gateway.secret_key.clone())),
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        })
        .await?;

    shutdown_tx.send(true).ok();
    for handle in job_handles {
        handle.await.ok();
    }
    info!("Server stopped");

    Ok(())
}
