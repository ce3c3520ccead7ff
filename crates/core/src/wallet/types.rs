//! Wallet domain types.

use chrono::{DateTime, Utc};
use rentflow_shared::types::{PaymentId, UserId, WalletTransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of wallet ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletTransactionType {
    /// Rent or escrow release paid in.
    Credit,
    /// Generic debit.
    Debit,
    /// Payout to the landlord's bank account.
    Withdrawal,
    /// Reversal of a failed withdrawal.
    Refund,
    /// Processing fee.
    Fee,
}

impl WalletTransactionType {
    /// Returns true if the entry increases the available balance.
    #[must_use]
    pub const fn is_inflow(self) -> bool {
        matches!(self, Self::Credit | Self::Refund)
    }

    /// `+amount` for inflows, `-amount` for outflows.
    #[must_use]
    pub fn signed(self, amount: Decimal) -> Decimal {
        if self.is_inflow() { amount } else { -amount }
    }

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Withdrawal => "withdrawal",
            Self::Refund => "refund",
            Self::Fee => "fee",
        }
    }
}

impl std::str::FromStr for WalletTransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            "withdrawal" => Ok(Self::Withdrawal),
            "refund" => Ok(Self::Refund),
            "fee" => Ok(Self::Fee),
            _ => Err(format!("Unknown wallet transaction type: {s}")),
        }
    }
}

/// Settlement status of a wallet ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletTransactionStatus {
    /// Balance moved, external settlement outstanding.
    Pending,
    /// Settled.
    Completed,
    /// External step failed; a compensating entry exists.
    Failed,
    /// Withdrawn before settlement.
    Cancelled,
}

impl WalletTransactionStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for WalletTransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown wallet transaction status: {s}")),
        }
    }
}

/// A landlord's wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    /// Owner.
    pub landlord_id: UserId,
    /// Spendable balance. Never negative.
    pub available_balance: Decimal,
    /// Amount debited for withdrawals awaiting transfer settlement.
    pub pending_balance: Decimal,
    /// Lifetime rent credited.
    pub total_earned: Decimal,
    /// Lifetime amount paid out.
    pub total_withdrawn: Decimal,
    /// ISO 4217 code.
    pub currency: String,
    /// Incremented on every balance mutation.
    pub version: i64,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl WalletBalance {
    /// An empty wallet.
    #[must_use]
    pub fn empty(landlord_id: UserId, currency: &str, now: DateTime<Utc>) -> Self {
        Self {
            landlord_id,
            available_balance: Decimal::ZERO,
            pending_balance: Decimal::ZERO,
            total_earned: Decimal::ZERO,
            total_withdrawn: Decimal::ZERO,
            currency: currency.to_string(),
            version: 0,
            updated_at: now,
        }
    }
}

/// Immutable wallet ledger entry.
///
/// `balance_after - balance_before == transaction_type.signed(amount)` and
/// `sequence` is the wallet version produced by this entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    /// Entry ID.
    pub id: WalletTransactionId,
    /// Wallet owner.
    pub landlord_id: UserId,
    /// Entry kind.
    pub transaction_type: WalletTransactionType,
    /// Positive amount.
    pub amount: Decimal,
    /// Available balance before the entry.
    pub balance_before: Decimal,
    /// Available balance after the entry.
    pub balance_after: Decimal,
    /// Idempotency key; unique across all entries.
    pub reference: String,
    /// Rent payment that produced the entry.
    pub payment_id: Option<PaymentId>,
    /// Settlement status.
    pub status: WalletTransactionStatus,
    /// Human-readable description.
    pub description: String,
    /// Free-form context (contract, escrow, transfer codes).
    pub metadata: serde_json::Value,
    /// Per-wallet ordering.
    pub sequence: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Request to move money in or out of a wallet.
#[derive(Debug, Clone)]
pub struct WalletEntry {
    /// Wallet owner.
    pub landlord_id: UserId,
    /// Positive amount.
    pub amount: Decimal,
    /// Idempotency key.
    pub reference: String,
    /// Related rent payment.
    pub payment_id: Option<PaymentId>,
    /// Description.
    pub description: String,
    /// Free-form context.
    pub metadata: serde_json::Value,
}

impl WalletEntry {
    /// Creates an entry with empty metadata.
    #[must_use]
    pub fn new(
        landlord_id: UserId,
        amount: Decimal,
        reference: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            landlord_id,
            amount,
            reference: reference.into(),
            payment_id: None,
            description: description.into(),
            metadata: serde_json::Value::Null,
        }
    }

    /// Attaches metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Links the entry to a rent payment.
    #[must_use]
    pub fn with_payment(mut self, payment_id: PaymentId) -> Self {
        self.payment_id = Some(payment_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signed_amounts() {
        assert_eq!(WalletTransactionType::Credit.signed(dec!(10)), dec!(10));
        assert_eq!(WalletTransactionType::Refund.signed(dec!(10)), dec!(10));
        assert_eq!(WalletTransactionType::Debit.signed(dec!(10)), dec!(-10));
        assert_eq!(WalletTransactionType::Withdrawal.signed(dec!(10)), dec!(-10));
        assert_eq!(WalletTransactionType::Fee.signed(dec!(10)), dec!(-10));
    }

    #[test]
    fn test_type_and_status_round_trip() {
        use std::str::FromStr;
        for t in [
            WalletTransactionType::Credit,
            WalletTransactionType::Debit,
            WalletTransactionType::Withdrawal,
            WalletTransactionType::Refund,
            WalletTransactionType::Fee,
        ] {
            assert_eq!(WalletTransactionType::from_str(t.as_str()).unwrap(), t);
        }
        for s in [
            WalletTransactionStatus::Pending,
            WalletTransactionStatus::Completed,
            WalletTransactionStatus::Failed,
            WalletTransactionStatus::Cancelled,
        ] {
            assert_eq!(WalletTransactionStatus::from_str(s.as_str()).unwrap(), s);
        }
    }
}
