//! Escrow routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use rentflow_shared::types::EscrowId;
use tracing::info;

use crate::{AppState, error::ApiError};

/// Creates the escrow routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/escrow/{id}", get(get_escrow))
        .route("/escrow/{id}/release", post(release_escrow))
}

async fn get_escrow(
    State(state): State<AppState>,
    Path(id): Path<EscrowId>,
) -> Result<impl IntoResponse, ApiError> {
    let escrow = state
        .store
        .find_escrow(id)
        .await?
        .ok_or_else(|| ApiError::not_found("ESCROW_NOT_FOUND", format!("Escrow not found: {id}")))?;
    Ok(Json(escrow))
}

/// POST `/escrow/{id}/release` - Administrative release ahead of schedule.
///
/// Releasing an already released bucket answers `released: false`.
async fn release_escrow(
    State(state): State<AppState>,
    Path(id): Path<EscrowId>,
) -> Result<impl IntoResponse, ApiError> {
    let release = state.escrow.release_escrow(id).await?;
    info!(escrow_id = %id, released = release.released, amount = %release.amount, "Manual escrow release");
    Ok(Json(release))
}
