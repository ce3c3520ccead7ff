//! Postgres Ledger Store.
//!
//! Reads run on the pool. [`PgLedgerTx`] wraps a `DatabaseTransaction` and
//! takes row locks with `SELECT ... FOR UPDATE`; dropping it without a commit
//! rolls back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rentflow_core::contract::{ContractFilter, RentContract};
use rentflow_core::escrow::EscrowBalance;
use rentflow_core::notification::{NotificationStatus, PaymentNotification, Recipient};
use rentflow_core::payment::{PaymentRecord, PayoutAccount, StoredAuthorization};
use rentflow_core::store::{LedgerStore, LedgerTx, StoreError};
use rentflow_core::wallet::{WalletBalance, WalletTransaction};
use rentflow_shared::types::{ContractId, EscrowId, PageRequest, UserId};
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{
    escrow_balances, notification_recipients, payment_authorizations, payment_notifications,
    payment_records, payout_accounts, rent_contracts, wallet_balances, wallet_transactions,
    webhook_events,
};
use crate::error::db_err;

fn rows<M, T>(models: Vec<M>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<M, Error = StoreError>,
{
    models.into_iter().map(T::try_from).collect()
}

fn update_err(entity: &'static str, id: impl ToString) -> impl FnOnce(DbErr) -> StoreError {
    move |err| match err {
        DbErr::RecordNotUpdated => StoreError::not_found(entity, id),
        other => db_err(other),
    }
}

/// [`LedgerStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
}

impl PgLedgerStore {
    /// Wraps a connection pool. The schema must be migrated.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Underlying pool.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        Ok(Box::new(PgLedgerTx { txn }))
    }

    // ---- contracts ----

    async fn insert_contract(&self, contract: &RentContract) -> Result<(), StoreError> {
        rent_contracts::Entity::insert(rent_contracts::ActiveModel::from(contract))
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_contract(&self, id: ContractId) -> Result<Option<RentContract>, StoreError> {
        rent_contracts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(RentContract::try_from)
            .transpose()
    }

    async fn list_contracts(
        &self,
        filter: &ContractFilter,
    ) -> Result<Vec<RentContract>, StoreError> {
        use rent_contracts::Column;

        let condition = Condition::all()
            .add_option(filter.status.map(|s| Column::Status.eq(s.as_str())))
            .add_option(filter.due_on.map(|d| Column::NextPaymentDue.eq(d)))
            .add_option(filter.due_before.map(|d| Column::NextPaymentDue.lt(d)))
            .add_option(filter.expiring_from.map(|d| Column::ExpiryDate.gte(d)))
            .add_option(filter.expiring_to.map(|d| Column::ExpiryDate.lte(d)))
            .add_option(filter.expired_before.map(|d| Column::ExpiryDate.lt(d)))
            .add_option(filter.landlord_id.map(|l| Column::LandlordId.eq(l.into_inner())));

        let models = rent_contracts::Entity::find()
            .filter(condition)
            .order_by_asc(Column::NextPaymentDue)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        rows(models)
    }

    // ---- escrow ----

    async fn unreleased_escrows(&self) -> Result<Vec<EscrowBalance>, StoreError> {
        let models = escrow_balances::Entity::find()
            .filter(escrow_balances::Column::IsReleased.eq(false))
            .order_by_asc(escrow_balances::Column::ExpectedReleaseDate)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        rows(models)
    }

    async fn find_escrow(&self, id: EscrowId) -> Result<Option<EscrowBalance>, StoreError> {
        escrow_balances::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(EscrowBalance::try_from)
            .transpose()
    }

    async fn escrows_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Vec<EscrowBalance>, StoreError> {
        let models = escrow_balances::Entity::find()
            .filter(escrow_balances::Column::ContractId.eq(contract_id.into_inner()))
            .order_by_asc(escrow_balances::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        rows(models)
    }

    // ---- payments ----

    async fn find_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        payment_records::Entity::find()
            .filter(payment_records::Column::Reference.eq(reference))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(PaymentRecord::try_from)
            .transpose()
    }

    async fn insert_payment_if_absent(&self, payment: &PaymentRecord) -> Result<bool, StoreError> {
        let inserted = payment_records::Entity::insert(payment_records::ActiveModel::from(payment))
            .on_conflict(
                OnConflict::column(payment_records::Column::Reference)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(inserted == 1)
    }

    async fn payments_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        let models = payment_records::Entity::find()
            .filter(payment_records::Column::ContractId.eq(contract_id.into_inner()))
            .order_by_asc(payment_records::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        rows(models)
    }

    // ---- wallet ----

    async fn find_wallet(&self, landlord_id: UserId) -> Result<Option<WalletBalance>, StoreError> {
        Ok(wallet_balances::Entity::find_by_id(landlord_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(WalletBalance::from))
    }

    async fn wallet_transactions(
        &self,
        landlord_id: UserId,
        page: &PageRequest,
    ) -> Result<(Vec<WalletTransaction>, u64), StoreError> {
        let query = wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::LandlordId.eq(landlord_id.into_inner()));

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let models = query
            .order_by_desc(wallet_transactions::Column::Sequence)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok((rows(models)?, total))
    }

    async fn wallet_ledger(
        &self,
        landlord_id: UserId,
    ) -> Result<Vec<WalletTransaction>, StoreError> {
        let models = wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::LandlordId.eq(landlord_id.into_inner()))
            .order_by_asc(wallet_transactions::Column::Sequence)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        rows(models)
    }

    // ---- notifications ----

    async fn insert_notification_if_absent(
        &self,
        notification: &PaymentNotification,
        stale_before: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        use payment_notifications::{Column, Entity};

        let reclaim = OnConflict::column(Column::DedupeKey)
            .update_columns([
                Column::Id,
                Column::RecipientId,
                Column::ScheduledFor,
                Column::Title,
                Column::Message,
                Column::CreatedAt,
            ])
            .action_and_where(
                Expr::col((Entity, Column::Status))
                    .eq(NotificationStatus::Pending.as_str())
                    .and(Expr::col((Entity, Column::CreatedAt)).lt(stale_before)),
            )
            .to_owned();
        let inserted = Entity::insert(payment_notifications::ActiveModel::from(notification))
            .on_conflict(reclaim)
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(inserted == 1)
    }

    async fn update_notification(
        &self,
        notification: &PaymentNotification,
    ) -> Result<(), StoreError> {
        payment_notifications::Entity::update(payment_notifications::ActiveModel::from(
            notification,
        ))
        .exec(&self.db)
        .await
        .map_err(update_err("notification", notification.id))?;
        Ok(())
    }

    async fn notifications_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Vec<PaymentNotification>, StoreError> {
        let models = payment_notifications::Entity::find()
            .filter(payment_notifications::Column::ContractId.eq(contract_id.into_inner()))
            .order_by_asc(payment_notifications::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        rows(models)
    }

    async fn find_recipient(&self, user_id: UserId) -> Result<Option<Recipient>, StoreError> {
        Ok(notification_recipients::Entity::find_by_id(user_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(Recipient::from))
    }

    async fn upsert_recipient(&self, recipient: &Recipient) -> Result<(), StoreError> {
        use notification_recipients::Column;

        notification_recipients::Entity::insert(notification_recipients::ActiveModel::from(
            recipient,
        ))
        .on_conflict(
            OnConflict::column(Column::UserId)
                .update_columns([
                    Column::DisplayName,
                    Column::Email,
                    Column::Phone,
                    Column::PushToken,
                ])
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    // ---- gateway bookkeeping ----

    async fn save_authorization(&self, auth: &StoredAuthorization) -> Result<(), StoreError> {
        use payment_authorizations::Column;

        payment_authorizations::Entity::insert(payment_authorizations::ActiveModel::from(auth))
            .on_conflict(
                OnConflict::column(Column::TenantId)
                    .update_columns([
                        Column::AuthorizationCode,
                        Column::Email,
                        Column::CardType,
                        Column::Last4,
                        Column::Bank,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_authorization(
        &self,
        tenant_id: UserId,
    ) -> Result<Option<StoredAuthorization>, StoreError> {
        Ok(payment_authorizations::Entity::find_by_id(tenant_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(StoredAuthorization::from))
    }

    async fn save_payout_account(&self, account: &PayoutAccount) -> Result<(), StoreError> {
        use payout_accounts::Column;

        payout_accounts::Entity::insert(payout_accounts::ActiveModel::from(account))
            .on_conflict(
                OnConflict::column(Column::LandlordId)
                    .update_columns([
                        Column::AccountNumber,
                        Column::BankCode,
                        Column::AccountName,
                        Column::RecipientCode,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_payout_account(
        &self,
        landlord_id: UserId,
    ) -> Result<Option<PayoutAccount>, StoreError> {
        Ok(payout_accounts::Entity::find_by_id(landlord_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(PayoutAccount::from))
    }

    async fn record_webhook_event(
        &self,
        event: &str,
        reference: &str,
        payload: &serde_json::Value,
    ) -> Result<bool, StoreError> {
        let row = webhook_events::ActiveModel {
            id: Set(Uuid::now_v7()),
            event: Set(event.to_string()),
            reference: Set(reference.to_string()),
            payload: Set(payload.clone()),
            received_at: Set(Utc::now().into()),
        };
        let inserted = webhook_events::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    webhook_events::Column::Event,
                    webhook_events::Column::Reference,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        if inserted == 0 {
            debug!(event, reference, "Webhook event already recorded");
        }
        Ok(inserted == 1)
    }
}

/// Unit of work over one Postgres transaction.
pub struct PgLedgerTx {
    txn: DatabaseTransaction,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_contract(&mut self, id: ContractId) -> Result<Option<RentContract>, StoreError> {
        rent_contracts::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(RentContract::try_from)
            .transpose()
    }

    async fn update_contract(&mut self, contract: &RentContract) -> Result<(), StoreError> {
        rent_contracts::Entity::update(rent_contracts::ActiveModel::from(contract))
            .exec(&self.txn)
            .await
            .map_err(update_err("contract", contract.id))?;
        Ok(())
    }

    async fn lock_wallet(
        &mut self,
        landlord_id: UserId,
        currency: &str,
    ) -> Result<WalletBalance, StoreError> {
        let empty = WalletBalance::empty(landlord_id, currency, Utc::now());
        wallet_balances::Entity::insert(wallet_balances::ActiveModel::from(&empty))
            .on_conflict(
                OnConflict::column(wallet_balances::Column::LandlordId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;

        wallet_balances::Entity::find_by_id(landlord_id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(WalletBalance::from)
            .ok_or_else(|| StoreError::not_found("wallet", landlord_id))
    }

    async fn update_wallet(&mut self, wallet: &WalletBalance) -> Result<(), StoreError> {
        wallet_balances::Entity::update(wallet_balances::ActiveModel::from(wallet))
            .exec(&self.txn)
            .await
            .map_err(update_err("wallet", wallet.landlord_id))?;
        Ok(())
    }

    async fn wallet_transaction_by_reference(
        &mut self,
        reference: &str,
    ) -> Result<Option<WalletTransaction>, StoreError> {
        wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::Reference.eq(reference))
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(WalletTransaction::try_from)
            .transpose()
    }

    async fn insert_wallet_transaction(
        &mut self,
        transaction: &WalletTransaction,
    ) -> Result<(), StoreError> {
        wallet_transactions::Entity::insert(wallet_transactions::ActiveModel::from(transaction))
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_wallet_transaction(
        &mut self,
        transaction: &WalletTransaction,
    ) -> Result<(), StoreError> {
        let changes = wallet_transactions::ActiveModel {
            id: Set(transaction.id.into_inner()),
            status: Set(transaction.status.as_str().to_string()),
            metadata: Set(transaction.metadata.clone()),
            ..Default::default()
        };
        wallet_transactions::Entity::update(changes)
            .exec(&self.txn)
            .await
            .map_err(update_err("wallet transaction", &transaction.reference))?;
        Ok(())
    }

    async fn lock_open_escrow(
        &mut self,
        contract_id: ContractId,
    ) -> Result<Option<EscrowBalance>, StoreError> {
        escrow_balances::Entity::find()
            .filter(escrow_balances::Column::ContractId.eq(contract_id.into_inner()))
            .filter(escrow_balances::Column::IsReleased.eq(false))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(EscrowBalance::try_from)
            .transpose()
    }

    async fn lock_escrow(&mut self, id: EscrowId) -> Result<Option<EscrowBalance>, StoreError> {
        escrow_balances::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(EscrowBalance::try_from)
            .transpose()
    }

    async fn insert_escrow(&mut self, escrow: &EscrowBalance) -> Result<(), StoreError> {
        escrow_balances::Entity::insert(escrow_balances::ActiveModel::try_from(escrow)?)
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_escrow(&mut self, escrow: &EscrowBalance) -> Result<(), StoreError> {
        escrow_balances::Entity::update(escrow_balances::ActiveModel::try_from(escrow)?)
            .exec(&self.txn)
            .await
            .map_err(update_err("escrow", escrow.id))?;
        Ok(())
    }

    async fn payment_by_reference(
        &mut self,
        reference: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        payment_records::Entity::find()
            .filter(payment_records::Column::Reference.eq(reference))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(PaymentRecord::try_from)
            .transpose()
    }

    async fn save_payment(&mut self, payment: &PaymentRecord) -> Result<(), StoreError> {
        use payment_records::Column;

        payment_records::Entity::insert(payment_records::ActiveModel::from(payment))
            .on_conflict(
                OnConflict::column(Column::Reference)
                    .update_columns([
                        Column::Amount,
                        Column::AmountPaid,
                        Column::DueDate,
                        Column::PaidDate,
                        Column::PaymentMethod,
                        Column::Status,
                        Column::Description,
                        Column::Notes,
                        Column::WalletTransactionId,
                        Column::EscrowId,
                        Column::NextPaymentDue,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(db_err)
    }
}
