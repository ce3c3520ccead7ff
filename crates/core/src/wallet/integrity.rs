//! Ledger replay.
//!
//! Rows must chain: each `balance_before` equals the previous row's
//! `balance_after`, each row's delta equals its signed amount, and the sum of
//! signed amounts equals the wallet's available balance.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use super::types::{WalletBalance, WalletTransaction, WalletTransactionStatus, WalletTransactionType};

/// First inconsistency found while replaying a wallet ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "mismatch", rename_all = "snake_case")]
pub enum LedgerMismatch {
    /// A row does not start where the previous one ended.
    #[error("Gap at sequence {sequence}: expected balance_before {expected}, found {found}")]
    Gap {
        /// Offending row.
        sequence: i64,
        /// Previous row's `balance_after`.
        expected: Decimal,
        /// This row's `balance_before`.
        found: Decimal,
    },

    /// A row's before/after delta disagrees with its type and amount.
    #[error("Bad delta at sequence {sequence}: expected {expected}, found {found}")]
    BadDelta {
        /// Offending row.
        sequence: i64,
        /// Signed amount.
        expected: Decimal,
        /// `balance_after - balance_before`.
        found: Decimal,
    },

    /// Sequence numbers are not strictly increasing.
    #[error("Sequence {sequence} is out of order")]
    OutOfOrder {
        /// Offending row.
        sequence: i64,
    },

    /// Replayed total differs from the stored available balance.
    #[error("Replayed balance {replayed} differs from available balance {stored}")]
    Balance {
        /// Sum of signed amounts.
        replayed: Decimal,
        /// Stored available balance.
        stored: Decimal,
    },

    /// Pending withdrawals differ from the stored pending balance.
    #[error("Pending withdrawals {replayed} differ from pending balance {stored}")]
    Pending {
        /// Sum of pending withdrawals.
        replayed: Decimal,
        /// Stored pending balance.
        stored: Decimal,
    },
}

/// Replays `transactions` (in sequence order) against `balance`.
pub fn verify_ledger(
    transactions: &[WalletTransaction],
    balance: &WalletBalance,
) -> Result<(), LedgerMismatch> {
    let mut running = Decimal::ZERO;
    let mut pending = Decimal::ZERO;
    let mut last_sequence = i64::MIN;

    for row in transactions {
        if row.sequence <= last_sequence {
            return Err(LedgerMismatch::OutOfOrder {
                sequence: row.sequence,
            });
        }
        last_sequence = row.sequence;

        if row.balance_before != running {
            return Err(LedgerMismatch::Gap {
                sequence: row.sequence,
                expected: running,
                found: row.balance_before,
            });
        }

        let expected = row.transaction_type.signed(row.amount);
        let found = row.balance_after - row.balance_before;
        if found != expected {
            return Err(LedgerMismatch::BadDelta {
                sequence: row.sequence,
                expected,
                found,
            });
        }
        running = row.balance_after;

        if row.transaction_type == WalletTransactionType::Withdrawal
            && row.status == WalletTransactionStatus::Pending
        {
            pending += row.amount;
        }
    }

    if running != balance.available_balance {
        return Err(LedgerMismatch::Balance {
            replayed: running,
            stored: balance.available_balance,
        });
    }
    if pending != balance.pending_balance {
        return Err(LedgerMismatch::Pending {
            replayed: pending,
            stored: balance.pending_balance,
        });
    }
    Ok(())
}
