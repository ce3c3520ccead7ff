//! In-memory [`LedgerStore`] for tests and database-less local runs.
//!
//! A unit of work takes the single store lock for its whole lifetime and
//! edits a private copy of the state; commit swaps the copy in. This gives
//! the same serialization a row lock gives, at store granularity.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rentflow_shared::types::{ContractId, EscrowId, PageRequest, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LedgerStore, LedgerTx, StoreError};
use crate::contract::{ContractFilter, RentContract};
use crate::escrow::EscrowBalance;
use crate::notification::{NotificationStatus, PaymentNotification, Recipient};
use crate::payment::{PaymentRecord, PayoutAccount, StoredAuthorization};
use crate::wallet::{WalletBalance, WalletTransaction};

/// Operations that can be made to fail with [`StoreError::Unavailable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// Opening a unit of work.
    Begin,
    /// Committing a unit of work.
    Commit,
    /// Appending a wallet entry.
    InsertWalletTransaction,
    /// Writing a payment.
    SavePayment,
    /// Writing a contract.
    UpdateContract,
    /// Writing an escrow bucket.
    UpdateEscrow,
    /// Claiming a notification row.
    InsertNotification,
    /// Looking up a notification recipient.
    FindRecipient,
}

#[derive(Debug, Default, Clone)]
struct State {
    contracts: HashMap<ContractId, RentContract>,
    escrows: HashMap<EscrowId, EscrowBalance>,
    wallets: HashMap<UserId, WalletBalance>,
    wallet_transactions: Vec<WalletTransaction>,
    payments: HashMap<String, PaymentRecord>,
    notifications: Vec<PaymentNotification>,
    recipients: HashMap<UserId, Recipient>,
    authorizations: HashMap<UserId, StoredAuthorization>,
    payout_accounts: HashMap<UserId, PayoutAccount>,
    webhook_events: HashSet<String>,
}

#[derive(Debug, Default)]
struct Faults(StdMutex<HashSet<FailPoint>>);

impl Faults {
    fn check(&self, point: FailPoint) -> Result<(), StoreError> {
        let armed = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&point);
        if armed {
            return Err(StoreError::Unavailable(format!(
                "injected failure at {point:?}"
            )));
        }
        Ok(())
    }

    fn set(&self, point: FailPoint, armed: bool) {
        let mut points = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if armed {
            points.insert(point);
        } else {
            points.remove(&point);
        }
    }
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<State>>,
    faults: Arc<Faults>,
}

impl InMemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `point` fail until [`InMemoryLedgerStore::heal`] is called.
    pub fn fail_on(&self, point: FailPoint) {
        self.faults.set(point, true);
    }

    /// Disarms `point`.
    pub fn heal(&self, point: FailPoint) {
        self.faults.set(point, false);
    }
}

fn page<T: Clone>(rows: &[T], page: &PageRequest) -> Vec<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    rows.iter().skip(offset).take(limit).cloned().collect()
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        self.faults.check(FailPoint::Begin)?;
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            faults: Arc::clone(&self.faults),
        }))
    }

    async fn insert_contract(&self, contract: &RentContract) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.contracts.contains_key(&contract.id) {
            return Err(StoreError::Conflict(format!("contract {}", contract.id)));
        }
        state.contracts.insert(contract.id, contract.clone());
        Ok(())
    }

    async fn find_contract(&self, id: ContractId) -> Result<Option<RentContract>, StoreError> {
        Ok(self.state.lock().await.contracts.get(&id).cloned())
    }

    async fn list_contracts(
        &self,
        filter: &ContractFilter,
    ) -> Result<Vec<RentContract>, StoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<_> = state
            .contracts
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        rows.sort_by_key(|c| (c.next_payment_due, c.id.0));
        Ok(rows)
    }

    async fn unreleased_escrows(&self) -> Result<Vec<EscrowBalance>, StoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<_> = state
            .escrows
            .values()
            .filter(|e| !e.is_released)
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.created_at);
        Ok(rows)
    }

    async fn find_escrow(&self, id: EscrowId) -> Result<Option<EscrowBalance>, StoreError> {
        Ok(self.state.lock().await.escrows.get(&id).cloned())
    }

    async fn escrows_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Vec<EscrowBalance>, StoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<_> = state
            .escrows
            .values()
            .filter(|e| e.contract_id == contract_id)
            .cloned()
            .collect();
        rows.sort_by_key(|e| (e.created_at, e.id.0));
        Ok(rows)
    }

    async fn find_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(self.state.lock().await.payments.get(reference).cloned())
    }

    async fn insert_payment_if_absent(&self, payment: &PaymentRecord) -> Result<bool, StoreError> {
        self.faults.check(FailPoint::SavePayment)?;
        let mut state = self.state.lock().await;
        if state.payments.contains_key(&payment.reference) {
            return Ok(false);
        }
        state
            .payments
            .insert(payment.reference.clone(), payment.clone());
        Ok(true)
    }

    async fn payments_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<_> = state
            .payments
            .values()
            .filter(|p| p.contract_id == contract_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| (p.created_at, p.id.0));
        Ok(rows)
    }

    async fn find_wallet(&self, landlord_id: UserId) -> Result<Option<WalletBalance>, StoreError> {
        Ok(self.state.lock().await.wallets.get(&landlord_id).cloned())
    }

    async fn wallet_transactions(
        &self,
        landlord_id: UserId,
        request: &PageRequest,
    ) -> Result<(Vec<WalletTransaction>, u64), StoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<_> = state
            .wallet_transactions
            .iter()
            .filter(|t| t.landlord_id == landlord_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        let total = rows.len() as u64;
        Ok((page(&rows, request), total))
    }

    async fn wallet_ledger(
        &self,
        landlord_id: UserId,
    ) -> Result<Vec<WalletTransaction>, StoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<_> = state
            .wallet_transactions
            .iter()
            .filter(|t| t.landlord_id == landlord_id)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.sequence);
        Ok(rows)
    }

    async fn insert_notification_if_absent(
        &self,
        notification: &PaymentNotification,
        stale_before: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.faults.check(FailPoint::InsertNotification)?;
        let mut state = self.state.lock().await;
        let existing = state
            .notifications
            .iter_mut()
            .find(|n| n.dedupe_key == notification.dedupe_key);
        match existing {
            Some(row)
                if row.status == NotificationStatus::Pending && row.created_at < stale_before =>
            {
                *row = notification.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                state.notifications.push(notification.clone());
                Ok(true)
            }
        }
    }

    async fn update_notification(
        &self,
        notification: &PaymentNotification,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let row = state
            .notifications
            .iter_mut()
            .find(|n| n.id == notification.id)
            .ok_or_else(|| StoreError::not_found("notification", notification.id))?;
        *row = notification.clone();
        Ok(())
    }

    async fn notifications_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Vec<PaymentNotification>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.contract_id == contract_id)
            .cloned()
            .collect())
    }

    async fn find_recipient(&self, user_id: UserId) -> Result<Option<Recipient>, StoreError> {
        self.faults.check(FailPoint::FindRecipient)?;
        Ok(self.state.lock().await.recipients.get(&user_id).cloned())
    }

    async fn upsert_recipient(&self, recipient: &Recipient) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .recipients
            .insert(recipient.user_id, recipient.clone());
        Ok(())
    }

    async fn save_authorization(&self, auth: &StoredAuthorization) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .authorizations
            .insert(auth.tenant_id, auth.clone());
        Ok(())
    }

    async fn find_authorization(
        &self,
        tenant_id: UserId,
    ) -> Result<Option<StoredAuthorization>, StoreError> {
        Ok(self.state.lock().await.authorizations.get(&tenant_id).cloned())
    }

    async fn save_payout_account(&self, account: &PayoutAccount) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .payout_accounts
            .insert(account.landlord_id, account.clone());
        Ok(())
    }

    async fn find_payout_account(
        &self,
        landlord_id: UserId,
    ) -> Result<Option<PayoutAccount>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .payout_accounts
            .get(&landlord_id)
            .cloned())
    }

    async fn record_webhook_event(
        &self,
        event: &str,
        reference: &str,
        _payload: &serde_json::Value,
    ) -> Result<bool, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .webhook_events
            .insert(format!("{event}:{reference}")))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    working: State,
    faults: Arc<Faults>,
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn lock_contract(&mut self, id: ContractId) -> Result<Option<RentContract>, StoreError> {
        Ok(self.working.contracts.get(&id).cloned())
    }

    async fn update_contract(&mut self, contract: &RentContract) -> Result<(), StoreError> {
        self.faults.check(FailPoint::UpdateContract)?;
        let row = self
            .working
            .contracts
            .get_mut(&contract.id)
            .ok_or_else(|| StoreError::not_found("contract", contract.id))?;
        *row = contract.clone();
        Ok(())
    }

    async fn lock_wallet(
        &mut self,
        landlord_id: UserId,
        currency: &str,
    ) -> Result<WalletBalance, StoreError> {
        let wallet = self
            .working
            .wallets
            .entry(landlord_id)
            .or_insert_with(|| WalletBalance::empty(landlord_id, currency, Utc::now()));
        Ok(wallet.clone())
    }

    async fn update_wallet(&mut self, wallet: &WalletBalance) -> Result<(), StoreError> {
        self.working
            .wallets
            .insert(wallet.landlord_id, wallet.clone());
        Ok(())
    }

    async fn wallet_transaction_by_reference(
        &mut self,
        reference: &str,
    ) -> Result<Option<WalletTransaction>, StoreError> {
        Ok(self
            .working
            .wallet_transactions
            .iter()
            .find(|t| t.reference == reference)
            .cloned())
    }

    async fn insert_wallet_transaction(
        &mut self,
        transaction: &WalletTransaction,
    ) -> Result<(), StoreError> {
        self.faults.check(FailPoint::InsertWalletTransaction)?;
        if self
            .working
            .wallet_transactions
            .iter()
            .any(|t| t.reference == transaction.reference)
        {
            return Err(StoreError::Conflict(format!(
                "wallet transaction reference {}",
                transaction.reference
            )));
        }
        self.working.wallet_transactions.push(transaction.clone());
        Ok(())
    }

    async fn update_wallet_transaction(
        &mut self,
        transaction: &WalletTransaction,
    ) -> Result<(), StoreError> {
        let row = self
            .working
            .wallet_transactions
            .iter_mut()
            .find(|t| t.id == transaction.id)
            .ok_or_else(|| StoreError::not_found("wallet transaction", transaction.id))?;
        row.status = transaction.status;
        row.metadata = transaction.metadata.clone();
        Ok(())
    }

    async fn lock_open_escrow(
        &mut self,
        contract_id: ContractId,
    ) -> Result<Option<EscrowBalance>, StoreError> {
        Ok(self
            .working
            .escrows
            .values()
            .find(|e| e.contract_id == contract_id && !e.is_released)
            .cloned())
    }

    async fn lock_escrow(&mut self, id: EscrowId) -> Result<Option<EscrowBalance>, StoreError> {
        Ok(self.working.escrows.get(&id).cloned())
    }

    async fn insert_escrow(&mut self, escrow: &EscrowBalance) -> Result<(), StoreError> {
        if self
            .working
            .escrows
            .values()
            .any(|e| e.contract_id == escrow.contract_id && !e.is_released)
        {
            return Err(StoreError::Conflict(format!(
                "open escrow for contract {}",
                escrow.contract_id
            )));
        }
        self.working.escrows.insert(escrow.id, escrow.clone());
        Ok(())
    }

    async fn update_escrow(&mut self, escrow: &EscrowBalance) -> Result<(), StoreError> {
        self.faults.check(FailPoint::UpdateEscrow)?;
        let row = self
            .working
            .escrows
            .get_mut(&escrow.id)
            .ok_or_else(|| StoreError::not_found("escrow", escrow.id))?;
        *row = escrow.clone();
        Ok(())
    }

    async fn payment_by_reference(
        &mut self,
        reference: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(self.working.payments.get(reference).cloned())
    }

    async fn save_payment(&mut self, payment: &PaymentRecord) -> Result<(), StoreError> {
        self.faults.check(FailPoint::SavePayment)?;
        self.working
            .payments
            .insert(payment.reference.clone(), payment.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.faults.check(FailPoint::Commit)?;
        let Self {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
