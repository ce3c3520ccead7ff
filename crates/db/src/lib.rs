//! Postgres persistence for the Rentflow engine.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - [`PgLedgerStore`], the Postgres implementation of the core Ledger Store port
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod store;

mod convert;
mod error;

pub use store::{PgLedgerStore, PgLedgerTx};

use std::time::Duration;

use rentflow_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Opens a pool sized from `database.*` settings.
///
/// # Errors
///
/// Returns an error if no URL is configured or the connection fails.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| DbErr::Custom("database.url is not set".to_string()))?;

    let mut options = ConnectOptions::new(url.to_string());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
