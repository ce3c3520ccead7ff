//! Contract error types.

use chrono::NaiveDate;
use rentflow_shared::types::ContractId;
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::ContractStatus;
use crate::error::{Classify, ErrorKind};
use crate::store::StoreError;

/// Errors from contract operations.
#[derive(Debug, Error)]
pub enum ContractError {
    /// Contract does not exist.
    #[error("Contract not found: {0}")]
    NotFound(ContractId),

    /// Monthly amount must be positive.
    #[error("Monthly amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Expiry must come after the first due date.
    #[error("Expiry date {expiry_date} must be after first due date {first_due}")]
    InvalidDates {
        /// First due date.
        first_due: NaiveDate,
        /// Requested expiry.
        expiry_date: NaiveDate,
    },

    /// Existing tenants need a transition start date.
    #[error("Existing tenant contracts require a transition start date")]
    MissingTransitionDate,

    /// Operation requires an active contract.
    #[error("Contract {id} is {status:?}, not active")]
    NotActive {
        /// Contract.
        id: ContractId,
        /// Current status.
        status: ContractStatus,
    },

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ContractError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "CONTRACT_NOT_FOUND",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidDates { .. } => "INVALID_DATES",
            Self::MissingTransitionDate => "MISSING_TRANSITION_DATE",
            Self::NotActive { .. } => "CONTRACT_NOT_ACTIVE",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

impl Classify for ContractError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidAmount(_)
            | Self::InvalidDates { .. }
            | Self::MissingTransitionDate
            | Self::NotActive { .. } => ErrorKind::Validation,
            Self::Store(e) => e.kind(),
        }
    }
}
