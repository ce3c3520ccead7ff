//! Wallet Service.
//!
//! Every balance change is one read-modify-write of the locked
//! [`WalletBalance`] plus one appended [`WalletTransaction`]. Entries are
//! idempotent by reference: posting a reference twice returns the first
//! entry unchanged.
//!
//! The `*_in` variants run inside a caller's unit of work so a credit can
//! commit atomically with other writes (payment record, due-date advance).

use std::sync::Arc;

use rentflow_shared::types::{PageRequest, PageResponse, UserId, WalletTransactionId};
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::error::WalletError;
use super::integrity::{self, LedgerMismatch};
use super::types::{
    WalletBalance, WalletEntry, WalletTransaction, WalletTransactionStatus, WalletTransactionType,
};
use crate::clock::Clock;
use crate::store::{LedgerStore, LedgerTx};

/// Suffix of the refund entry that reverses a withdrawal.
pub const REVERSAL_SUFFIX: &str = "_reversal";

/// Landlord wallet operations.
pub struct WalletService {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    currency: String,
}

impl WalletService {
    /// Creates a service for NGN wallets.
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            currency: "NGN".to_string(),
        }
    }

    /// Sets the currency new wallets are opened in.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    // ------------------------------------------------------------------
    // Standalone operations
    // ------------------------------------------------------------------

    /// Credits a landlord wallet.
    pub async fn credit(&self, entry: WalletEntry) -> Result<WalletTransaction, WalletError> {
        let mut tx = self.store.begin().await?;
        let posted = self.credit_in(tx.as_mut(), entry).await?;
        tx.commit().await?;
        Ok(posted)
    }

    /// Debits a landlord wallet.
    pub async fn debit(&self, entry: WalletEntry) -> Result<WalletTransaction, WalletError> {
        let mut tx = self.store.begin().await?;
        let posted = self.debit_in(tx.as_mut(), entry).await?;
        tx.commit().await?;
        Ok(posted)
    }

    /// Current balance; all zeros for a landlord without a wallet yet.
    pub async fn get_balance(&self, landlord_id: UserId) -> Result<WalletBalance, WalletError> {
        Ok(self
            .store
            .find_wallet(landlord_id)
            .await?
            .unwrap_or_else(|| WalletBalance::empty(landlord_id, &self.currency, self.clock.now())))
    }

    /// A page of wallet entries, newest first.
    pub async fn get_transactions(
        &self,
        landlord_id: UserId,
        page: &PageRequest,
    ) -> Result<PageResponse<WalletTransaction>, WalletError> {
        let (rows, total) = self.store.wallet_transactions(landlord_id, page).await?;
        Ok(PageResponse::new(rows, page.page, page.per_page, total))
    }

    /// Replays the landlord's ledger against the stored balance.
    pub async fn verify(&self, landlord_id: UserId) -> Result<Result<(), LedgerMismatch>, WalletError> {
        let balance = self.get_balance(landlord_id).await?;
        let ledger = self.store.wallet_ledger(landlord_id).await?;
        Ok(integrity::verify_ledger(&ledger, &balance))
    }

    // ------------------------------------------------------------------
    // Unit-of-work operations
    // ------------------------------------------------------------------

    /// Credits inside `tx`. Adds to `total_earned`.
    pub async fn credit_in(
        &self,
        tx: &mut dyn LedgerTx,
        entry: WalletEntry,
    ) -> Result<WalletTransaction, WalletError> {
        self.post(tx, entry, WalletTransactionType::Credit, WalletTransactionStatus::Completed)
            .await
    }

    /// Debits inside `tx`. Fails if the available balance is short.
    pub async fn debit_in(
        &self,
        tx: &mut dyn LedgerTx,
        entry: WalletEntry,
    ) -> Result<WalletTransaction, WalletError> {
        self.post(tx, entry, WalletTransactionType::Debit, WalletTransactionStatus::Completed)
            .await
    }

    /// Moves `amount` from available to pending for an outgoing transfer.
    ///
    /// The entry stays `pending` until [`WalletService::settle_withdrawal_in`]
    /// or [`WalletService::reverse_withdrawal_in`].
    pub async fn withdraw_in(
        &self,
        tx: &mut dyn LedgerTx,
        entry: WalletEntry,
    ) -> Result<WalletTransaction, WalletError> {
        self.post(tx, entry, WalletTransactionType::Withdrawal, WalletTransactionStatus::Pending)
            .await
    }

    /// Marks a pending withdrawal as paid out. No-op unless it is pending.
    pub async fn settle_withdrawal_in(
        &self,
        tx: &mut dyn LedgerTx,
        reference: &str,
        transfer_code: Option<&str>,
    ) -> Result<WalletTransaction, WalletError> {
        let mut withdrawal = Self::withdrawal_by_reference(tx, reference).await?;
        if withdrawal.status != WalletTransactionStatus::Pending {
            debug!(reference, status = withdrawal.status.as_str(), "Withdrawal already settled");
            return Ok(withdrawal);
        }

        let now = self.clock.now();
        let mut wallet = tx.lock_wallet(withdrawal.landlord_id, &self.currency).await?;
        wallet.pending_balance -= withdrawal.amount;
        wallet.total_withdrawn += withdrawal.amount;
        wallet.version += 1;
        wallet.updated_at = now;
        tx.update_wallet(&wallet).await?;

        withdrawal.status = WalletTransactionStatus::Completed;
        if let Some(code) = transfer_code {
            set_metadata(&mut withdrawal.metadata, "transfer_code", code);
        }
        tx.update_wallet_transaction(&withdrawal).await?;

        info!(
            landlord_id = %withdrawal.landlord_id,
            reference,
            amount = %withdrawal.amount,
            "Withdrawal settled"
        );
        Ok(withdrawal)
    }

    /// Compensates a withdrawal whose transfer failed or was reversed.
    ///
    /// Appends one refund entry `{reference}_reversal` and marks the
    /// withdrawal `failed`. Calling it again returns the existing refund.
    pub async fn reverse_withdrawal_in(
        &self,
        tx: &mut dyn LedgerTx,
        reference: &str,
        reason: &str,
    ) -> Result<WalletTransaction, WalletError> {
        let refund_reference = format!("{reference}{REVERSAL_SUFFIX}");
        if let Some(existing) = tx.wallet_transaction_by_reference(&refund_reference).await? {
            debug!(reference, "Withdrawal already reversed");
            return Ok(existing);
        }

        let mut withdrawal = Self::withdrawal_by_reference(tx, reference).await?;
        let now = self.clock.now();
        let mut wallet = tx.lock_wallet(withdrawal.landlord_id, &self.currency).await?;

        match withdrawal.status {
            WalletTransactionStatus::Completed => wallet.total_withdrawn -= withdrawal.amount,
            _ => wallet.pending_balance -= withdrawal.amount,
        }
        let before = wallet.available_balance;
        wallet.available_balance += withdrawal.amount;
        wallet.version += 1;
        wallet.updated_at = now;

        let refund = WalletTransaction {
            id: WalletTransactionId::new(),
            landlord_id: withdrawal.landlord_id,
            transaction_type: WalletTransactionType::Refund,
            amount: withdrawal.amount,
            balance_before: before,
            balance_after: wallet.available_balance,
            reference: refund_reference,
            payment_id: None,
            status: WalletTransactionStatus::Completed,
            description: format!("Reversal of withdrawal {reference}"),
            metadata: serde_json::json!({ "reverses": reference, "reason": reason }),
            sequence: wallet.version,
            created_at: now,
        };
        tx.update_wallet(&wallet).await?;
        tx.insert_wallet_transaction(&refund).await?;

        withdrawal.status = WalletTransactionStatus::Failed;
        set_metadata(&mut withdrawal.metadata, "failure_reason", reason);
        tx.update_wallet_transaction(&withdrawal).await?;

        info!(
            landlord_id = %withdrawal.landlord_id,
            reference,
            amount = %withdrawal.amount,
            reason,
            "Withdrawal reversed"
        );
        Ok(refund)
    }

    async fn withdrawal_by_reference(
        tx: &mut dyn LedgerTx,
        reference: &str,
    ) -> Result<WalletTransaction, WalletError> {
        let row = tx
            .wallet_transaction_by_reference(reference)
            .await?
            .ok_or_else(|| WalletError::TransactionNotFound(reference.to_string()))?;
        if row.transaction_type != WalletTransactionType::Withdrawal {
            return Err(WalletError::NotAWithdrawal(reference.to_string()));
        }
        Ok(row)
    }

    async fn post(
        &self,
        tx: &mut dyn LedgerTx,
        entry: WalletEntry,
        kind: WalletTransactionType,
        status: WalletTransactionStatus,
    ) -> Result<WalletTransaction, WalletError> {
        if entry.amount <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount(entry.amount));
        }
        if let Some(existing) = tx.wallet_transaction_by_reference(&entry.reference).await? {
            debug!(reference = %entry.reference, "Wallet entry already posted");
            return Ok(existing);
        }

        let now = self.clock.now();
        let mut wallet = tx.lock_wallet(entry.landlord_id, &self.currency).await?;
        let before = wallet.available_balance;
        let after = before + kind.signed(entry.amount);
        if after < Decimal::ZERO {
            return Err(WalletError::InsufficientBalance {
                available: before,
                requested: entry.amount,
            });
        }

        wallet.available_balance = after;
        match kind {
            WalletTransactionType::Credit => wallet.total_earned += entry.amount,
            WalletTransactionType::Withdrawal => wallet.pending_balance += entry.amount,
            _ => {}
        }
        wallet.version += 1;
        wallet.updated_at = now;

        let posted = WalletTransaction {
            id: WalletTransactionId::new(),
            landlord_id: entry.landlord_id,
            transaction_type: kind,
            amount: entry.amount,
            balance_before: before,
            balance_after: after,
            reference: entry.reference,
            payment_id: entry.payment_id,
            status,
            description: entry.description,
            metadata: entry.metadata,
            sequence: wallet.version,
            created_at: now,
        };
        tx.update_wallet(&wallet).await?;
        tx.insert_wallet_transaction(&posted).await?;

        debug!(
            landlord_id = %posted.landlord_id,
            kind = kind.as_str(),
            amount = %posted.amount,
            balance_after = %after,
            reference = %posted.reference,
            "Wallet entry posted"
        );
        Ok(posted)
    }
}

fn set_metadata(metadata: &mut serde_json::Value, key: &str, value: &str) {
    if !metadata.is_object() {
        *metadata = serde_json::json!({});
    }
    if let Some(map) = metadata.as_object_mut() {
        map.insert(key.to_string(), serde_json::Value::String(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::{FailPoint, InMemoryLedgerStore};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn setup() -> (WalletService, Arc<InMemoryLedgerStore>) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let clock = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        (WalletService::new(store.clone(), clock), store)
    }

    fn entry(landlord: UserId, amount: Decimal, reference: &str) -> WalletEntry {
        WalletEntry::new(landlord, amount, reference, "test")
    }

    #[tokio::test]
    async fn test_credit_then_debit() {
        let (wallet, _) = setup();
        let landlord = UserId::new();

        let credit = wallet.credit(entry(landlord, dec!(50000), "C1")).await.unwrap();
        assert_eq!(credit.balance_before, dec!(0));
        assert_eq!(credit.balance_after, dec!(50000));

        let debit = wallet.debit(entry(landlord, dec!(20000), "D1")).await.unwrap();
        assert_eq!(debit.balance_before, dec!(50000));
        assert_eq!(debit.balance_after, dec!(30000));

        let balance = wallet.get_balance(landlord).await.unwrap();
        assert_eq!(balance.available_balance, dec!(30000));
        assert_eq!(balance.total_earned, dec!(50000));
        assert_eq!(balance.version, 2);
    }

    #[tokio::test]
    async fn test_debit_rejects_overdraft() {
        let (wallet, _) = setup();
        let landlord = UserId::new();
        wallet.credit(entry(landlord, dec!(100), "C1")).await.unwrap();

        let err = wallet.debit(entry(landlord, dec!(101), "D1")).await.unwrap_err();
        assert!(matches!(err, WalletError::InsufficientBalance { .. }));
        assert_eq!(err.error_code(), "INSUFFICIENT_BALANCE");
        assert_eq!(
            wallet.get_balance(landlord).await.unwrap().available_balance,
            dec!(100)
        );
    }

    #[tokio::test]
    async fn test_credit_is_idempotent_by_reference() {
        let (wallet, store) = setup();
        let landlord = UserId::new();
        let first = wallet.credit(entry(landlord, dec!(100), "C1")).await.unwrap();
        let second = wallet.credit(entry(landlord, dec!(100), "C1")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.wallet_ledger(landlord).await.unwrap().len(), 1);
        assert_eq!(
            wallet.get_balance(landlord).await.unwrap().available_balance,
            dec!(100)
        );
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amounts() {
        let (wallet, _) = setup();
        let err = wallet
            .credit(entry(UserId::new(), dec!(0), "C0"))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_balance_untouched() {
        let (wallet, store) = setup();
        let landlord = UserId::new();
        store.fail_on(FailPoint::InsertWalletTransaction);

        assert!(wallet.credit(entry(landlord, dec!(100), "C1")).await.is_err());
        assert!(store.find_wallet(landlord).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_withdraw_settle() {
        let (wallet, store) = setup();
        let landlord = UserId::new();
        wallet.credit(entry(landlord, dec!(50000), "C1")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let debit = wallet
            .withdraw_in(tx.as_mut(), entry(landlord, dec!(10000), "WD1"))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(debit.status, WalletTransactionStatus::Pending);

        let balance = wallet.get_balance(landlord).await.unwrap();
        assert_eq!(balance.available_balance, dec!(40000));
        assert_eq!(balance.pending_balance, dec!(10000));

        let mut tx = store.begin().await.unwrap();
        let settled = wallet
            .settle_withdrawal_in(tx.as_mut(), "WD1", Some("TRF_1"))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(settled.status, WalletTransactionStatus::Completed);
        assert_eq!(settled.metadata["transfer_code"], "TRF_1");

        let balance = wallet.get_balance(landlord).await.unwrap();
        assert_eq!(balance.pending_balance, dec!(0));
        assert_eq!(balance.total_withdrawn, dec!(10000));
        assert!(wallet.verify(landlord).await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_reverse_withdrawal_exactly_once() {
        let (wallet, store) = setup();
        let landlord = UserId::new();
        wallet.credit(entry(landlord, dec!(50000), "C1")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        wallet
            .withdraw_in(tx.as_mut(), entry(landlord, dec!(10000), "WD1"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        for _ in 0..2 {
            let mut tx = store.begin().await.unwrap();
            let refund = wallet
                .reverse_withdrawal_in(tx.as_mut(), "WD1", "declined")
                .await
                .unwrap();
            tx.commit().await.unwrap();
            assert_eq!(refund.reference, "WD1_reversal");
        }

        let balance = wallet.get_balance(landlord).await.unwrap();
        assert_eq!(balance.available_balance, dec!(50000));
        assert_eq!(balance.pending_balance, dec!(0));
        assert_eq!(balance.total_withdrawn, dec!(0));

        let ledger = store.wallet_ledger(landlord).await.unwrap();
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger[1].status, WalletTransactionStatus::Failed);
        assert_eq!(ledger[2].transaction_type, WalletTransactionType::Refund);
        assert!(wallet.verify(landlord).await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_get_transactions_paginates_newest_first() {
        let (wallet, _) = setup();
        let landlord = UserId::new();
        for i in 0..5 {
            wallet
                .credit(entry(landlord, dec!(10), &format!("C{i}")))
                .await
                .unwrap();
        }

        let page = wallet
            .get_transactions(landlord, &PageRequest { page: 1, per_page: 2 })
            .await
            .unwrap();
        assert_eq!(page.meta.total, 5);
        assert_eq!(page.meta.total_pages, 3);
        assert_eq!(page.data[0].reference, "C4");
        assert_eq!(page.data[1].reference, "C3");
    }

    #[tokio::test]
    async fn test_empty_balance_for_unknown_landlord() {
        let (wallet, _) = setup();
        let balance = wallet.get_balance(UserId::new()).await.unwrap();
        assert_eq!(balance.available_balance, dec!(0));
        assert_eq!(balance.currency, "NGN");
    }
}
