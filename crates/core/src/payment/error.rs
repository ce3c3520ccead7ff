//! Payment error types.

use chrono::NaiveDate;
use rentflow_shared::types::{ContractId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::contract::ContractStatus;
use crate::error::{Classify, ErrorKind};
use crate::gateway::GatewayError;
use crate::store::StoreError;
use crate::wallet::WalletError;

/// Errors from payment processing and withdrawals.
#[derive(Debug, Error)]
pub enum PaymentError {
    // ========== Validation ==========
    /// Contract does not exist.
    #[error("Contract not found: {0}")]
    ContractNotFound(ContractId),

    /// Contract no longer accepts payments.
    #[error("Contract {id} is {status:?}, not active")]
    ContractNotActive {
        /// Contract.
        id: ContractId,
        /// Current status.
        status: ContractStatus,
    },

    /// Amount differs from the monthly rent by more than the tolerance.
    #[error("Amount mismatch: expected {expected}, received {received}")]
    AmountMismatch {
        /// Monthly rent.
        expected: Decimal,
        /// Amount received.
        received: Decimal,
    },

    /// Amounts must be positive.
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Reference belongs to another contract.
    #[error("Reference {reference} belongs to contract {contract_id}")]
    ReferenceMismatch {
        /// Reference.
        reference: String,
        /// Contract that owns it.
        contract_id: ContractId,
    },

    /// Reference is not known locally or at the gateway.
    #[error("Unknown payment reference: {0}")]
    UnknownReference(String),

    /// Withdrawal below the configured minimum.
    #[error("Minimum withdrawal is {minimum}, requested {requested}")]
    BelowMinimumWithdrawal {
        /// Configured minimum.
        minimum: Decimal,
        /// Requested amount.
        requested: Decimal,
    },

    /// Tenant has no reusable card authorization.
    #[error("No stored authorization for tenant {0}")]
    NoAuthorization(UserId),

    /// Recurring charge requested before the cycle falls due.
    #[error("Contract {contract_id} is not due until {due}")]
    CycleNotDue {
        /// Contract.
        contract_id: ContractId,
        /// Next due date.
        due: NaiveDate,
    },

    /// Landlord has not registered a payout account.
    #[error("No payout account for landlord {0}")]
    NoPayoutAccount(UserId),

    /// Withdrawal reference belongs to another landlord.
    #[error("Withdrawal reference {0} belongs to another landlord")]
    ForeignWithdrawal(String),

    /// Webhook payload is missing required fields.
    #[error("Invalid gateway event: {0}")]
    InvalidEvent(String),

    // ========== Gateway outcomes ==========
    /// Gateway reports the charge as not successful.
    #[error("Payment {reference} not successful at gateway: {status}")]
    NotSuccessful {
        /// Reference.
        reference: String,
        /// Gateway status.
        status: String,
    },

    /// Transfer failed; the wallet debit has been reversed.
    #[error("Transfer {reference} failed and was reversed: {reason}")]
    TransferFailed {
        /// Withdrawal reference.
        reference: String,
        /// Gateway reason.
        reason: String,
    },

    // ========== Wrapped ==========
    /// Gateway call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Wallet operation failed.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PaymentError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ContractNotFound(_) => "CONTRACT_NOT_FOUND",
            Self::ContractNotActive { .. } => "CONTRACT_NOT_ACTIVE",
            Self::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::ReferenceMismatch { .. } => "REFERENCE_MISMATCH",
            Self::UnknownReference(_) => "UNKNOWN_REFERENCE",
            Self::BelowMinimumWithdrawal { .. } => "BELOW_MINIMUM_WITHDRAWAL",
            Self::NoAuthorization(_) => "NO_AUTHORIZATION",
            Self::CycleNotDue { .. } => "CYCLE_NOT_DUE",
            Self::NoPayoutAccount(_) => "NO_PAYOUT_ACCOUNT",
            Self::ForeignWithdrawal(_) => "FOREIGN_WITHDRAWAL",
            Self::InvalidEvent(_) => "INVALID_EVENT",
            Self::NotSuccessful { .. } => "PAYMENT_NOT_SUCCESSFUL",
            Self::TransferFailed { .. } => "TRANSFER_FAILED",
            Self::Gateway(e) => e.error_code(),
            Self::Wallet(e) => e.error_code(),
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

impl Classify for PaymentError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::ContractNotFound(_) | Self::UnknownReference(_) => ErrorKind::NotFound,
            Self::ContractNotActive { .. }
            | Self::AmountMismatch { .. }
            | Self::InvalidAmount(_)
            | Self::ReferenceMismatch { .. }
            | Self::BelowMinimumWithdrawal { .. }
            | Self::NoAuthorization(_)
            | Self::CycleNotDue { .. }
            | Self::NoPayoutAccount(_)
            | Self::ForeignWithdrawal(_)
            | Self::InvalidEvent(_) => ErrorKind::Validation,
            Self::NotSuccessful { .. } | Self::TransferFailed { .. } => {
                ErrorKind::GatewayRejection
            }
            Self::Gateway(e) => e.kind(),
            Self::Wallet(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }
}
