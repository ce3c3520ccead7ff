//! Database migration runner for Rentflow.
//!
//! Usage:
//!   migrator up      - Apply the ledger schema
//!   migrator down    - Roll back the last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop every ledger table and re-apply
//!
//! The connection string comes from `DATABASE_URL` (or `-u`).

use sea_orm_migration::prelude::*;
use rentflow_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The CLI sets up its own tracing.
    cli::run_cli(Migrator).await;
}
