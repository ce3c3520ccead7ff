//! Mapping of `SeaORM` errors onto the store's error classes.

use rentflow_core::store::StoreError;
use sea_orm::{DbErr, SqlErr};

/// Postgres messages for failures that succeed when retried.
const RETRYABLE_MARKERS: [&str; 4] = [
    "could not serialize access",
    "deadlock detected",
    "lock timeout",
    "could not obtain lock",
];

/// Classifies a database error.
pub(crate) fn db_err(err: DbErr) -> StoreError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return StoreError::Conflict(detail);
    }
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => StoreError::Unavailable(err.to_string()),
        DbErr::RecordNotFound(id) => StoreError::NotFound { entity: "row", id },
        _ => {
            let message = err.to_string();
            if RETRYABLE_MARKERS.iter().any(|m| message.contains(m)) {
                StoreError::Unavailable(message)
            } else {
                StoreError::Database(message)
            }
        }
    }
}
