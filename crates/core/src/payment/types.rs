//! Payment domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rentflow_shared::types::{
    ContractId, EscrowId, PaymentId, PropertyId, UnitId, UserId, WalletTransactionId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contract::RentContract;
use crate::wallet::WalletTransactionStatus;

/// Posting status of a rent payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting payment.
    Pending,
    /// Paid in part.
    Partial,
    /// Fully paid.
    Paid,
    /// Unpaid past its due date.
    Overdue,
}

impl PaymentStatus {
    /// Classifies a payment by how much of `amount_due` has been paid.
    #[must_use]
    pub fn classify(
        amount_due: Decimal,
        amount_paid: Decimal,
        due_date: NaiveDate,
        today: NaiveDate,
    ) -> Self {
        if amount_paid >= amount_due {
            Self::Paid
        } else if amount_paid > Decimal::ZERO {
            Self::Partial
        } else if today > due_date {
            Self::Overdue
        } else {
            Self::Pending
        }
    }

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            "overdue" => Ok(Self::Overdue),
            _ => Err(format!("Unknown payment status: {s}")),
        }
    }
}

/// Payment channel reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Debit or credit card.
    Card,
    /// Bank transfer or direct debit.
    BankTransfer,
    /// USSD short code.
    Ussd,
    /// Mobile money wallet.
    MobileMoney,
    /// Anything else the gateway reports.
    Other,
}

impl PaymentMethod {
    /// Maps a gateway channel name.
    #[must_use]
    pub fn from_channel(channel: &str) -> Self {
        match channel.to_ascii_lowercase().as_str() {
            "card" => Self::Card,
            "bank" | "bank_transfer" | "dedicated_nuban" => Self::BankTransfer,
            "ussd" => Self::Ussd,
            "mobile_money" => Self::MobileMoney,
            _ => Self::Other,
        }
    }

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::BankTransfer => "bank_transfer",
            Self::Ussd => "ussd",
            Self::MobileMoney => "mobile_money",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "bank_transfer" => Ok(Self::BankTransfer),
            "ussd" => Ok(Self::Ussd),
            "mobile_money" => Ok(Self::MobileMoney),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown payment method: {s}")),
        }
    }
}

/// A posted (or initialized) rent payment, keyed by gateway reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Record ID.
    pub id: PaymentId,
    /// Contract paid against.
    pub contract_id: ContractId,
    /// Landlord.
    pub landlord_id: UserId,
    /// Tenant.
    pub tenant_id: UserId,
    /// Property.
    pub property_id: PropertyId,
    /// Unit.
    pub unit_id: UnitId,
    /// Amount due for the cycle.
    pub amount: Decimal,
    /// Amount actually received.
    pub amount_paid: Decimal,
    /// Due date of the cycle this payment covers.
    pub due_date: NaiveDate,
    /// When the payment was posted.
    pub paid_date: Option<DateTime<Utc>>,
    /// Always `rent` for contract payments.
    pub payment_type: String,
    /// Channel.
    pub payment_method: PaymentMethod,
    /// Posting status.
    pub status: PaymentStatus,
    /// Gateway reference; doubles as the receipt number.
    pub reference: String,
    /// Description.
    pub description: String,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Wallet credit produced by a monthly-payout payment.
    pub wallet_transaction_id: Option<WalletTransactionId>,
    /// Escrow bucket fed by a yearly-payout payment.
    pub escrow_id: Option<EscrowId>,
    /// Contract due date after this payment was posted.
    pub next_payment_due: Option<NaiveDate>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// A pending record for the contract's current cycle.
    #[must_use]
    pub fn pending(
        contract: &RentContract,
        reference: impl Into<String>,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            contract_id: contract.id,
            landlord_id: contract.landlord_id,
            tenant_id: contract.tenant_id,
            property_id: contract.property_id,
            unit_id: contract.unit_id,
            amount: contract.monthly_amount,
            amount_paid: Decimal::ZERO,
            due_date: contract.next_payment_due,
            paid_date: None,
            payment_type: "rent".to_string(),
            payment_method: method,
            status: PaymentStatus::Pending,
            reference: reference.into(),
            description: format!("Rent due {}", contract.next_payment_due),
            notes: None,
            wallet_transaction_id: None,
            escrow_id: None,
            next_payment_due: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Where the money went, once posted.
    #[must_use]
    pub fn routing(&self) -> Option<PayoutRouting> {
        match (self.wallet_transaction_id, self.escrow_id) {
            (Some(transaction_id), _) => Some(PayoutRouting::Wallet { transaction_id }),
            (None, Some(escrow_id)) => Some(PayoutRouting::Escrow { escrow_id }),
            (None, None) => None,
        }
    }
}

/// Input to `ProcessPayment`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessPaymentInput {
    /// Contract being paid.
    pub contract_id: ContractId,
    /// Amount received.
    pub amount: Decimal,
    /// Channel.
    pub payment_method: PaymentMethod,
    /// Gateway reference (idempotency key).
    pub reference: String,
}

/// Where a payment's money was routed. Exactly one branch per payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum PayoutRouting {
    /// Credited to the landlord wallet immediately.
    Wallet {
        /// The wallet credit.
        transaction_id: WalletTransactionId,
    },
    /// Accumulated in the contract's open escrow bucket.
    Escrow {
        /// The bucket.
        escrow_id: EscrowId,
    },
}

/// Outcome of `ProcessPayment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentResult {
    /// Payment record.
    pub payment_id: PaymentId,
    /// Contract.
    pub contract_id: ContractId,
    /// Gateway reference.
    pub reference: String,
    /// Amount posted.
    pub amount: Decimal,
    /// Money routing.
    pub routing: PayoutRouting,
    /// Contract due date after posting.
    pub next_payment_due: NaiveDate,
    /// True when the reference had already been processed.
    pub duplicate: bool,
}

/// Request to start a gateway checkout for a contract's current cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializePaymentInput {
    /// Contract.
    pub contract_id: ContractId,
    /// Payer email for the gateway.
    pub email: String,
}

/// Gateway checkout handle returned to the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitializedPayment {
    /// Redirect for the hosted checkout.
    pub authorization_url: String,
    /// Gateway access code.
    pub access_code: String,
    /// Reference to complete the payment with.
    pub reference: String,
    /// Amount requested.
    pub amount: Decimal,
}

/// Reusable card authorization kept for recurring charges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAuthorization {
    /// Tenant that owns the card.
    pub tenant_id: UserId,
    /// Gateway authorization code.
    pub authorization_code: String,
    /// Email the authorization is bound to.
    pub email: String,
    /// Card brand.
    pub card_type: Option<String>,
    /// Last four digits.
    pub last4: Option<String>,
    /// Issuing bank.
    pub bank: Option<String>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Landlord bank account registered as a transfer recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutAccount {
    /// Landlord.
    pub landlord_id: UserId,
    /// Bank account number.
    pub account_number: String,
    /// Bank code.
    pub bank_code: String,
    /// Name on the account, as resolved by the gateway.
    pub account_name: String,
    /// Gateway transfer recipient code.
    pub recipient_code: String,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input to `RegisterPayoutAccount`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterPayoutAccountInput {
    /// Bank account number.
    pub account_number: String,
    /// Bank code.
    pub bank_code: String,
}

/// Outcome of `ProcessWithdrawal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawalResult {
    /// Transfer reference (wallet debit reference).
    pub reference: String,
    /// The debit row.
    pub transaction_id: WalletTransactionId,
    /// Amount withdrawn.
    pub amount: Decimal,
    /// Debit status after the transfer request.
    pub status: WalletTransactionStatus,
    /// Gateway transfer code, when known.
    pub transfer_code: Option<String>,
    /// True when this reference had already been attempted.
    pub duplicate: bool,
}
