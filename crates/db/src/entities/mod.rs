//! `SeaORM` entities, one module per table.
//!
//! Enumerated columns are stored as `VARCHAR` guarded by `CHECK` constraints
//! and parsed through the domain enums' `FromStr`.

pub mod escrow_balances;
pub mod notification_recipients;
pub mod payment_authorizations;
pub mod payment_notifications;
pub mod payment_records;
pub mod payout_accounts;
pub mod rent_contracts;
pub mod wallet_balances;
pub mod wallet_transactions;
pub mod webhook_events;
