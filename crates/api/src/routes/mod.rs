//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod contracts;
pub mod escrow;
pub mod health;
pub mod jobs;
pub mod landlords;
pub mod payments;
pub mod users;
pub mod webhooks;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(contracts::routes())
        .merge(payments::routes())
        .merge(webhooks::routes())
        .merge(landlords::routes())
        .merge(escrow::routes())
        .merge(users::routes())
        .merge(jobs::routes())
}
