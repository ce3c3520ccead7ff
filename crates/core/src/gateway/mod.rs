//! Payment Gateway port.
//!
//! Amounts cross this boundary as major-unit decimals; adapters convert to
//! the processor's minor units.

mod sandbox;

pub use sandbox::{SandboxGateway, TransferOutcome};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Classify, ErrorKind};

/// Errors returned by a gateway adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The request timed out; the outcome is unknown.
    #[error("Gateway request timed out: {0}")]
    Timeout(String),

    /// Network failure or 5xx.
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    /// The processor declined the request.
    #[error("Gateway rejected the request: {0}")]
    Rejected(String),

    /// Unknown reference or account.
    #[error("Not found at gateway: {0}")]
    NotFound(String),

    /// The response could not be understood.
    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    /// Amount cannot be expressed in minor units.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl GatewayError {
    /// Returns true if the request may have taken effect.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "GATEWAY_TIMEOUT",
            Self::Unavailable(_) => "GATEWAY_UNAVAILABLE",
            Self::Rejected(_) => "GATEWAY_REJECTED",
            Self::NotFound(_) => "GATEWAY_NOT_FOUND",
            Self::InvalidResponse(_) => "GATEWAY_INVALID_RESPONSE",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
        }
    }
}

impl Classify for GatewayError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) | Self::Unavailable(_) => ErrorKind::Transient,
            Self::Rejected(_) => ErrorKind::GatewayRejection,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidAmount(_) => ErrorKind::Validation,
            Self::InvalidResponse(_) => ErrorKind::Internal,
        }
    }
}

/// Charge status as reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Money captured.
    Success,
    /// Declined.
    Failed,
    /// Checkout never completed.
    Abandoned,
    /// Still in progress.
    Pending,
    /// Refunded or charged back.
    Reversed,
}

impl TransactionStatus {
    /// Maps a processor status string.
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status {
            "success" => Self::Success,
            "failed" => Self::Failed,
            "abandoned" => Self::Abandoned,
            "reversed" => Self::Reversed,
            _ => Self::Pending,
        }
    }
}

/// Card authorization returned with a successful charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    /// Code used for recurring charges.
    pub authorization_code: String,
    /// Whether the processor allows reuse.
    pub reusable: bool,
    /// Card brand.
    pub card_type: Option<String>,
    /// Last four digits.
    pub last4: Option<String>,
    /// Issuing bank.
    pub bank: Option<String>,
}

/// Request to open a hosted checkout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitializeTransaction {
    /// Payer email.
    pub email: String,
    /// Amount in major units.
    pub amount: Decimal,
    /// Reference to attach.
    pub reference: String,
    /// Redirect after checkout.
    pub callback_url: Option<String>,
    /// Echoed back on verification.
    pub metadata: serde_json::Value,
}

/// Hosted checkout handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializedTransaction {
    /// Redirect URL.
    pub authorization_url: String,
    /// Access code.
    pub access_code: String,
    /// Reference.
    pub reference: String,
}

/// Normalized charge verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedTransaction {
    /// Reference.
    pub reference: String,
    /// Charge status.
    pub status: TransactionStatus,
    /// Amount in major units.
    pub amount: Decimal,
    /// Channel name (card, bank, ussd...).
    pub channel: String,
    /// Payer email.
    pub customer_email: Option<String>,
    /// Card authorization, when the channel produced one.
    pub authorization: Option<Authorization>,
    /// Metadata attached at initialization.
    pub metadata: serde_json::Value,
}

/// Request to charge a stored authorization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeAuthorization {
    /// Email bound to the authorization.
    pub email: String,
    /// Amount in major units.
    pub amount: Decimal,
    /// Authorization code.
    pub authorization_code: String,
    /// Reference for the charge.
    pub reference: String,
    /// Echoed back on verification.
    pub metadata: serde_json::Value,
}

/// Request to pay out to a transfer recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferRequest {
    /// Amount in major units.
    pub amount: Decimal,
    /// Recipient code.
    pub recipient_code: String,
    /// Reason shown on the statement.
    pub reason: String,
    /// Reference; the processor rejects duplicates.
    pub reference: String,
}

/// Transfer status as reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Queued or processing.
    Pending,
    /// Paid out.
    Success,
    /// Not paid out.
    Failed,
    /// Paid out then reversed.
    Reversed,
}

impl TransferStatus {
    /// Maps a processor status string.
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status {
            "success" => Self::Success,
            "failed" | "abandoned" | "rejected" => Self::Failed,
            "reversed" => Self::Reversed,
            _ => Self::Pending,
        }
    }

    /// Returns true if the money will not reach the recipient.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Reversed)
    }
}

/// Transfer as acknowledged by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Reference.
    pub reference: String,
    /// Processor transfer code.
    pub transfer_code: String,
    /// Status.
    pub status: TransferStatus,
}

/// Bank account to register as a transfer recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDetails {
    /// Account holder name.
    pub account_name: String,
    /// Account number.
    pub account_number: String,
    /// Bank code.
    pub bank_code: String,
    /// ISO 4217 code.
    pub currency: String,
}

/// Registered transfer recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecipient {
    /// Recipient code.
    pub recipient_code: String,
    /// Account holder name.
    pub account_name: String,
}

/// Account resolution result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAccount {
    /// Account number.
    pub account_number: String,
    /// Name on the account.
    pub account_name: String,
}

/// External payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Generates a collision-resistant reference: `{prefix}_{timestamp}_{random}`.
    fn new_reference(&self, prefix: &str) -> String;

    /// Opens a hosted checkout.
    async fn initialize_transaction(
        &self,
        request: InitializeTransaction,
    ) -> Result<InitializedTransaction, GatewayError>;

    /// Verifies a charge by reference.
    async fn verify_transaction(&self, reference: &str)
    -> Result<VerifiedTransaction, GatewayError>;

    /// Charges a stored authorization.
    async fn charge_authorization(
        &self,
        request: ChargeAuthorization,
    ) -> Result<VerifiedTransaction, GatewayError>;

    /// Requests a payout.
    async fn initiate_transfer(
        &self,
        request: TransferRequest,
    ) -> Result<TransferReceipt, GatewayError>;

    /// Looks up a payout by reference.
    async fn verify_transfer(&self, reference: &str) -> Result<TransferReceipt, GatewayError>;

    /// Registers a bank account as a transfer recipient.
    async fn create_transfer_recipient(
        &self,
        details: AccountDetails,
    ) -> Result<TransferRecipient, GatewayError>;

    /// Resolves the name on a bank account.
    async fn resolve_account_number(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> Result<ResolvedAccount, GatewayError>;
}
