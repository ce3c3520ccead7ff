//! Escrow Release Engine.
//!
//! The release credit and the `is_released` flag commit in one unit of
//! work under the escrow row lock. The credit also carries the
//! release-scoped reference `escrow_release_{id}`, so a retry after any
//! failure finds the credit instead of posting it again.

use std::sync::Arc;

use rentflow_shared::types::EscrowId;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::types::{EscrowPolicy, EscrowRelease, ReleaseReason};
use crate::clock::Clock;
use crate::error::{Classify, ErrorKind};
use crate::jobs::BatchReport;
use crate::notification::NotificationScheduler;
use crate::store::{LedgerStore, StoreError};
use crate::wallet::{WalletEntry, WalletError, WalletService};

/// Errors from escrow operations.
#[derive(Debug, Error)]
pub enum EscrowError {
    /// Bucket does not exist.
    #[error("Escrow not found: {0}")]
    NotFound(EscrowId),

    /// Wallet credit failed.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EscrowError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "ESCROW_NOT_FOUND",
            Self::Wallet(e) => e.error_code(),
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

impl Classify for EscrowError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Wallet(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }
}

/// Releases matured escrow buckets into landlord wallets.
pub struct EscrowReleaseEngine {
    store: Arc<dyn LedgerStore>,
    wallet: Arc<WalletService>,
    clock: Arc<dyn Clock>,
    policy: EscrowPolicy,
    notifier: Option<Arc<NotificationScheduler>>,
}

impl EscrowReleaseEngine {
    /// Creates an engine.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        wallet: Arc<WalletService>,
        clock: Arc<dyn Clock>,
        policy: EscrowPolicy,
    ) -> Self {
        Self {
            store,
            wallet,
            clock,
            policy,
            notifier: None,
        }
    }

    /// Notifies landlords after each release.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<NotificationScheduler>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Daily pass: releases every eligible unreleased bucket.
    pub async fn check_and_release_escrow(&self) -> Result<BatchReport, EscrowError> {
        let today = self.clock.today();
        let escrows = self.store.unreleased_escrows().await?;
        let mut report = BatchReport::new();

        for escrow in escrows {
            let expiry = match self.store.find_contract(escrow.contract_id).await {
                Ok(contract) => contract.map(|c| c.expiry_date),
                Err(e) => {
                    warn!(escrow_id = %escrow.id, error = %e, "Failed to load escrow contract");
                    report.failed(escrow.id, e);
                    continue;
                }
            };

            let Some(reason) = escrow.release_reason(expiry, today, &self.policy) else {
                report.skipped();
                continue;
            };

            match self.release(escrow.id, reason).await {
                Ok(release) if release.released => report.succeeded(),
                Ok(_) => report.skipped(),
                Err(e) => {
                    warn!(escrow_id = %escrow.id, error = %e, "Escrow release failed");
                    report.failed(escrow.id, e);
                }
            }
        }

        info!(job = "escrow_release", %report, "Escrow release pass finished");
        Ok(report)
    }

    /// Releases one bucket. Releasing an already released bucket is a no-op.
    pub async fn release_escrow(&self, id: EscrowId) -> Result<EscrowRelease, EscrowError> {
        self.release(id, ReleaseReason::Manual).await
    }

    async fn release(
        &self,
        id: EscrowId,
        reason: ReleaseReason,
    ) -> Result<EscrowRelease, EscrowError> {
        let mut tx = self.store.begin().await?;
        let mut escrow = tx.lock_escrow(id).await?.ok_or(EscrowError::NotFound(id))?;
        let reference = escrow.release_reference();

        if escrow.is_released {
            debug!(escrow_id = %id, "Escrow already released");
            return Ok(EscrowRelease {
                escrow_id: id,
                amount: Decimal::ZERO,
                released: false,
                reference,
            });
        }

        if tx.wallet_transaction_by_reference(&reference).await?.is_some() {
            warn!(escrow_id = %id, %reference, "Release credit exists for unreleased escrow; marking only");
        } else {
            let entry = WalletEntry::new(
                escrow.landlord_id,
                escrow.total_escrowed,
                reference.clone(),
                format!("Escrow release ({} months)", escrow.months_accumulated),
            )
            .with_metadata(serde_json::json!({
                "type": "escrow_release",
                "escrow_id": escrow.id,
                "contract_id": escrow.contract_id,
                "reason": reason.as_str(),
            }));
            self.wallet.credit_in(tx.as_mut(), entry).await?;
        }

        escrow.mark_released(self.clock.now());
        tx.update_escrow(&escrow).await?;
        tx.commit().await?;

        info!(
            escrow_id = %id,
            contract_id = %escrow.contract_id,
            landlord_id = %escrow.landlord_id,
            amount = %escrow.total_escrowed,
            months = escrow.months_accumulated,
            reason = reason.as_str(),
            "Escrow released"
        );

        if let Some(notifier) = &self.notifier {
            self.notify(notifier, &escrow).await;
        }

        Ok(EscrowRelease {
            escrow_id: id,
            amount: escrow.total_escrowed,
            released: true,
            reference,
        })
    }

    async fn notify(&self, notifier: &NotificationScheduler, escrow: &super::EscrowBalance) {
        let tenant_id = match self.store.find_contract(escrow.contract_id).await {
            Ok(Some(contract)) => contract.tenant_id,
            Ok(None) => return,
            Err(e) => {
                warn!(escrow_id = %escrow.id, error = %e, "Skipping release notice");
                return;
            }
        };
        if let Err(e) = notifier.notify_escrow_released(escrow, tenant_id).await {
            warn!(escrow_id = %escrow.id, error = %e, "Release notice failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::contract::{ContractStatus, PayoutType, RentContract};
    use crate::escrow::EscrowBalance;
    use crate::notification::{OutboxSender, Recipient, ReminderPolicy};
    use crate::store::{FailPoint, InMemoryLedgerStore};
    use chrono::{NaiveDate, Utc};
    use rentflow_shared::types::{ContractId, PropertyId, UnitId, UserId};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Harness {
        store: Arc<InMemoryLedgerStore>,
        clock: Arc<FixedClock>,
        wallet: Arc<WalletService>,
        engine: EscrowReleaseEngine,
        outbox: Arc<OutboxSender>,
    }

    fn harness(today: NaiveDate) -> Harness {
        let store = Arc::new(InMemoryLedgerStore::new());
        let clock = Arc::new(FixedClock::on(today));
        let wallet = Arc::new(WalletService::new(store.clone(), clock.clone()));
        let outbox = Arc::new(OutboxSender::new());
        let notifier = Arc::new(NotificationScheduler::new(
            store.clone(),
            outbox.clone(),
            clock.clone(),
            ReminderPolicy::default(),
        ));
        let engine = EscrowReleaseEngine::new(
            store.clone(),
            wallet.clone(),
            clock.clone(),
            EscrowPolicy::default(),
        )
        .with_notifier(notifier);
        Harness {
            store,
            clock,
            wallet,
            engine,
            outbox,
        }
    }

    async fn seed(h: &Harness, months: u32, expiry: NaiveDate) -> EscrowBalance {
        let contract = RentContract {
            id: ContractId::new(),
            tenant_id: UserId::new(),
            landlord_id: UserId::new(),
            property_id: PropertyId::new(),
            unit_id: UnitId::new(),
            monthly_amount: dec!(50000),
            expiry_date: expiry,
            payout_type: PayoutType::Yearly,
            next_payment_due: date(2024, 1, 1),
            transition_start_date: date(2024, 1, 1),
            status: ContractStatus::Active,
            is_existing_tenant: false,
            original_expiry_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        h.store.insert_contract(&contract).await.unwrap();
        h.store
            .upsert_recipient(&Recipient {
                user_id: contract.landlord_id,
                display_name: "Landlord".into(),
                email: Some("landlord@example.com".into()),
                phone: None,
                push_token: None,
            })
            .await
            .unwrap();

        let mut escrow = EscrowBalance::open(
            contract.landlord_id,
            contract.id,
            dec!(50000),
            date(2024, 1, 1),
            12,
            Utc::now(),
        );
        for _ in 1..months {
            escrow.accumulate(dec!(50000), Utc::now());
        }
        let mut tx = h.store.begin().await.unwrap();
        tx.insert_escrow(&escrow).await.unwrap();
        tx.commit().await.unwrap();
        escrow
    }

    #[tokio::test]
    async fn test_release_is_exactly_once() {
        let h = harness(date(2024, 6, 1));
        let escrow = seed(&h, 12, date(2025, 12, 31)).await;

        let first = h.engine.release_escrow(escrow.id).await.unwrap();
        let second = h.engine.release_escrow(escrow.id).await.unwrap();
        assert!(first.released);
        assert_eq!(first.amount, dec!(600000));
        assert!(!second.released);

        let balance = h.wallet.get_balance(escrow.landlord_id).await.unwrap();
        assert_eq!(balance.available_balance, dec!(600000));
        assert_eq!(
            h.store.wallet_ledger(escrow.landlord_id).await.unwrap().len(),
            1
        );
        let stored = h.store.find_escrow(escrow.id).await.unwrap().unwrap();
        assert!(stored.is_released);
        assert_eq!(stored.released_amount, Some(dec!(600000)));
        assert_eq!(h.outbox.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_mark_rolls_back_credit_and_retry_succeeds() {
        let h = harness(date(2024, 6, 1));
        let escrow = seed(&h, 12, date(2025, 12, 31)).await;

        h.store.fail_on(FailPoint::UpdateEscrow);
        assert!(h.engine.release_escrow(escrow.id).await.is_err());
        assert_eq!(
            h.wallet
                .get_balance(escrow.landlord_id)
                .await
                .unwrap()
                .available_balance,
            dec!(0)
        );

        h.store.heal(FailPoint::UpdateEscrow);
        assert!(h.engine.release_escrow(escrow.id).await.unwrap().released);
        assert_eq!(
            h.wallet
                .get_balance(escrow.landlord_id)
                .await
                .unwrap()
                .available_balance,
            dec!(600000)
        );
    }

    #[tokio::test]
    async fn test_daily_pass_selects_eligible_buckets() {
        let h = harness(date(2024, 6, 1));
        let full = seed(&h, 12, date(2025, 12, 31)).await;
        let young = seed(&h, 5, date(2025, 12, 31)).await;
        let expired = seed(&h, 3, date(2024, 5, 20)).await;

        let report = h.engine.check_and_release_escrow().await.unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.skipped, 1);

        assert!(h.store.find_escrow(full.id).await.unwrap().unwrap().is_released);
        assert!(!h.store.find_escrow(young.id).await.unwrap().unwrap().is_released);
        assert!(h.store.find_escrow(expired.id).await.unwrap().unwrap().is_released);

        // Second pass has nothing left to do for released buckets.
        let again = h.engine.check_and_release_escrow().await.unwrap();
        assert_eq!(again.processed, 1);
        assert_eq!(again.succeeded, 0);
    }

    #[tokio::test]
    async fn test_expiry_release_waits_for_grace_period() {
        let h = harness(date(2024, 5, 25));
        let escrow = seed(&h, 3, date(2024, 5, 20)).await;

        assert_eq!(h.engine.check_and_release_escrow().await.unwrap().succeeded, 0);
        h.clock.set_date(date(2024, 5, 27));
        assert_eq!(h.engine.check_and_release_escrow().await.unwrap().succeeded, 1);
        assert!(h.store.find_escrow(escrow.id).await.unwrap().unwrap().is_released);
    }

    #[tokio::test]
    async fn test_unknown_escrow() {
        let h = harness(date(2024, 6, 1));
        let err = h.engine.release_escrow(EscrowId::new()).await.unwrap_err();
        assert_eq!(err.error_code(), "ESCROW_NOT_FOUND");
    }
}
