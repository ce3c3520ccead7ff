//! Landlord wallets and the append-only wallet ledger.

pub mod error;
pub mod integrity;
pub mod service;
pub mod types;

#[cfg(test)]
mod integrity_props;

pub use error::WalletError;
pub use integrity::{LedgerMismatch, verify_ledger};
pub use service::{REVERSAL_SUFFIX, WalletService};
pub use types::{
    WalletBalance, WalletEntry, WalletTransaction, WalletTransactionStatus, WalletTransactionType,
};
