//! Ledger Store port.
//!
//! [`LedgerStore`] serves reads and opens units of work. A [`LedgerTx`] holds
//! row locks until it is committed or dropped; dropping without
//! [`LedgerTx::commit`] rolls back.
//!
//! Callers never issue [`LedgerStore`] reads while holding a [`LedgerTx`],
//! and never cross a network boundary inside one.

mod memory;

pub use memory::{FailPoint, InMemoryLedgerStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rentflow_shared::types::{ContractId, EscrowId, PageRequest, UserId};
use thiserror::Error;

use crate::contract::{ContractFilter, RentContract};
use crate::error::{Classify, ErrorKind};
use crate::escrow::EscrowBalance;
use crate::notification::{PaymentNotification, Recipient};
use crate::payment::{PaymentRecord, PayoutAccount, StoredAuthorization};
use crate::wallet::{WalletBalance, WalletTransaction};

/// Persistence failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Connection lost, pool exhausted, lock timeout, serialization failure.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Unique constraint violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Row expected to exist is missing.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity name.
        entity: &'static str,
        /// Lookup key.
        id: String,
    },

    /// Any other database error.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored value could not be decoded.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Shorthand for [`StoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl Classify for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable(_) => ErrorKind::Transient,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Database(_) | Self::Corrupt(_) => ErrorKind::Internal,
        }
    }
}

/// Read access and unit-of-work factory.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Opens a unit of work.
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;

    // ---- contracts ----

    /// Inserts a new contract.
    async fn insert_contract(&self, contract: &RentContract) -> Result<(), StoreError>;

    /// Fetches a contract.
    async fn find_contract(&self, id: ContractId) -> Result<Option<RentContract>, StoreError>;

    /// Lists contracts matching every set criterion.
    async fn list_contracts(&self, filter: &ContractFilter)
    -> Result<Vec<RentContract>, StoreError>;

    // ---- escrow ----

    /// Every bucket not yet released.
    async fn unreleased_escrows(&self) -> Result<Vec<EscrowBalance>, StoreError>;

    /// Fetches a bucket.
    async fn find_escrow(&self, id: EscrowId) -> Result<Option<EscrowBalance>, StoreError>;

    /// All buckets of a contract, oldest first.
    async fn escrows_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Vec<EscrowBalance>, StoreError>;

    // ---- payments ----

    /// Fetches a payment by gateway reference.
    async fn find_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentRecord>, StoreError>;

    /// Inserts a payment unless its reference exists. Returns true if inserted.
    async fn insert_payment_if_absent(&self, payment: &PaymentRecord) -> Result<bool, StoreError>;

    /// All payments of a contract, oldest first.
    async fn payments_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Vec<PaymentRecord>, StoreError>;

    // ---- wallet ----

    /// Fetches a landlord wallet.
    async fn find_wallet(&self, landlord_id: UserId) -> Result<Option<WalletBalance>, StoreError>;

    /// A page of wallet entries, newest first, with the total count.
    async fn wallet_transactions(
        &self,
        landlord_id: UserId,
        page: &PageRequest,
    ) -> Result<(Vec<WalletTransaction>, u64), StoreError>;

    /// Every wallet entry of a landlord in sequence order.
    async fn wallet_ledger(&self, landlord_id: UserId)
    -> Result<Vec<WalletTransaction>, StoreError>;

    // ---- notifications ----

    /// Inserts a notification unless its dedupe key exists. A `pending` row
    /// created before `stale_before` is an abandoned claim and is taken over.
    /// Returns true if inserted or taken over.
    async fn insert_notification_if_absent(
        &self,
        notification: &PaymentNotification,
        stale_before: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Records a delivery outcome.
    async fn update_notification(
        &self,
        notification: &PaymentNotification,
    ) -> Result<(), StoreError>;

    /// All notifications of a contract, oldest first.
    async fn notifications_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Vec<PaymentNotification>, StoreError>;

    /// Contact details of a user.
    async fn find_recipient(&self, user_id: UserId) -> Result<Option<Recipient>, StoreError>;

    /// Creates or replaces contact details.
    async fn upsert_recipient(&self, recipient: &Recipient) -> Result<(), StoreError>;

    // ---- gateway bookkeeping ----

    /// Creates or replaces a tenant's reusable authorization.
    async fn save_authorization(&self, auth: &StoredAuthorization) -> Result<(), StoreError>;

    /// A tenant's reusable authorization.
    async fn find_authorization(
        &self,
        tenant_id: UserId,
    ) -> Result<Option<StoredAuthorization>, StoreError>;

    /// Creates or replaces a landlord's payout account.
    async fn save_payout_account(&self, account: &PayoutAccount) -> Result<(), StoreError>;

    /// A landlord's payout account.
    async fn find_payout_account(
        &self,
        landlord_id: UserId,
    ) -> Result<Option<PayoutAccount>, StoreError>;

    /// Records a webhook delivery. Returns false if `(event, reference)` was seen before.
    async fn record_webhook_event(
        &self,
        event: &str,
        reference: &str,
        payload: &serde_json::Value,
    ) -> Result<bool, StoreError>;
}

/// A unit of work holding row locks.
#[async_trait]
pub trait LedgerTx: Send {
    /// Locks and fetches a contract.
    async fn lock_contract(&mut self, id: ContractId) -> Result<Option<RentContract>, StoreError>;

    /// Writes a contract.
    async fn update_contract(&mut self, contract: &RentContract) -> Result<(), StoreError>;

    /// Locks a landlord wallet, creating an empty one on first use.
    async fn lock_wallet(
        &mut self,
        landlord_id: UserId,
        currency: &str,
    ) -> Result<WalletBalance, StoreError>;

    /// Writes a wallet.
    async fn update_wallet(&mut self, wallet: &WalletBalance) -> Result<(), StoreError>;

    /// Fetches a wallet entry by reference.
    async fn wallet_transaction_by_reference(
        &mut self,
        reference: &str,
    ) -> Result<Option<WalletTransaction>, StoreError>;

    /// Appends a wallet entry. Fails with `Conflict` on a duplicate reference.
    async fn insert_wallet_transaction(
        &mut self,
        transaction: &WalletTransaction,
    ) -> Result<(), StoreError>;

    /// Updates the status and metadata of a wallet entry.
    async fn update_wallet_transaction(
        &mut self,
        transaction: &WalletTransaction,
    ) -> Result<(), StoreError>;

    /// Locks the contract's unreleased bucket, if any.
    async fn lock_open_escrow(
        &mut self,
        contract_id: ContractId,
    ) -> Result<Option<EscrowBalance>, StoreError>;

    /// Locks a bucket by ID.
    async fn lock_escrow(&mut self, id: EscrowId) -> Result<Option<EscrowBalance>, StoreError>;

    /// Inserts a bucket. Fails with `Conflict` if the contract already has an open one.
    async fn insert_escrow(&mut self, escrow: &EscrowBalance) -> Result<(), StoreError>;

    /// Writes a bucket.
    async fn update_escrow(&mut self, escrow: &EscrowBalance) -> Result<(), StoreError>;

    /// Fetches a payment by reference.
    async fn payment_by_reference(
        &mut self,
        reference: &str,
    ) -> Result<Option<PaymentRecord>, StoreError>;

    /// Inserts or updates a payment keyed by reference.
    async fn save_payment(&mut self, payment: &PaymentRecord) -> Result<(), StoreError>;

    /// Commits every write made through this unit of work.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
