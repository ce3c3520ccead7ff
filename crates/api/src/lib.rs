//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes for contracts, payments, wallets, escrow and jobs
//! - The gateway webhook endpoint
//! - Mapping of engine errors onto HTTP responses

pub mod error;
pub mod routes;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use axum::Router;
use rentflow_core::contract::ContractService;
use rentflow_core::escrow::EscrowReleaseEngine;
use rentflow_core::jobs::JobRunner;
use rentflow_core::payment::PaymentProcessor;
use rentflow_core::store::LedgerStore;
use rentflow_core::wallet::WalletService;
use rentflow_gateway::WebhookVerifier;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Ledger store for read-only listings.
    pub store: Arc<dyn LedgerStore>,
    /// Contract lifecycle.
    pub contracts: Arc<ContractService>,
    /// Payments, withdrawals and webhook events.
    pub payments: Arc<PaymentProcessor>,
    /// Landlord wallets.
    pub wallet: Arc<WalletService>,
    /// Escrow releases.
    pub escrow: Arc<EscrowReleaseEngine>,
    /// Scheduled jobs, for manual runs and metrics.
    pub jobs: Arc<JobRunner>,
    /// Webhook signature check.
    pub webhooks: Arc<WebhookVerifier>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
