//! Wallet error types.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::error::{Classify, ErrorKind};
use crate::store::StoreError;

/// Errors from wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Amounts must be positive.
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Debit exceeds the available balance.
    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Available balance.
        available: Decimal,
        /// Requested amount.
        requested: Decimal,
    },

    /// No wallet entry with this reference.
    #[error("Wallet transaction not found: {0}")]
    TransactionNotFound(String),

    /// The referenced entry is not a withdrawal.
    #[error("Wallet transaction {0} is not a withdrawal")]
    NotAWithdrawal(String),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WalletError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::TransactionNotFound(_) => "WALLET_TRANSACTION_NOT_FOUND",
            Self::NotAWithdrawal(_) => "NOT_A_WITHDRAWAL",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

impl Classify for WalletError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_) | Self::InsufficientBalance { .. } | Self::NotAWithdrawal(_) => {
                ErrorKind::Validation
            }
            Self::TransactionNotFound(_) => ErrorKind::NotFound,
            Self::Store(e) => e.kind(),
        }
    }
}
