//! Shared fixtures for payment tests.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rentflow_shared::types::{ContractId, PropertyId, UnitId, UserId};
use rust_decimal_macros::dec;

use super::processor::{PaymentProcessor, PaymentSettings};
use crate::clock::FixedClock;
use crate::contract::schedule::add_months;
use crate::contract::{ContractStatus, PayoutType, RentContract};
use crate::gateway::SandboxGateway;
use crate::notification::{NotificationScheduler, OutboxSender, Recipient, ReminderPolicy};
use crate::store::{InMemoryLedgerStore, LedgerStore};
use crate::wallet::WalletService;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub struct Harness {
    pub store: Arc<InMemoryLedgerStore>,
    pub gateway: Arc<SandboxGateway>,
    pub wallet: Arc<WalletService>,
    pub outbox: Arc<OutboxSender>,
    pub processor: PaymentProcessor,
}

pub fn harness(today: NaiveDate) -> Harness {
    let store = Arc::new(InMemoryLedgerStore::new());
    let clock = Arc::new(FixedClock::on(today));
    let gateway = Arc::new(SandboxGateway::new());
    let wallet = Arc::new(WalletService::new(store.clone(), clock.clone()));
    let outbox = Arc::new(OutboxSender::new());
    let notifier = Arc::new(NotificationScheduler::new(
        store.clone(),
        outbox.clone(),
        clock.clone(),
        ReminderPolicy::default(),
    ));
    let processor = PaymentProcessor::new(
        store.clone(),
        wallet.clone(),
        gateway.clone(),
        clock.clone(),
        PaymentSettings::default(),
    )
    .with_notifier(notifier);
    Harness {
        store,
        gateway,
        wallet,
        outbox,
        processor,
    }
}

/// An active 50 000/month contract starting on `start`, with a reachable tenant.
pub async fn contract(h: &Harness, payout: PayoutType, start: NaiveDate) -> RentContract {
    let contract = RentContract {
        id: ContractId::new(),
        tenant_id: UserId::new(),
        landlord_id: UserId::new(),
        property_id: PropertyId::new(),
        unit_id: UnitId::new(),
        monthly_amount: dec!(50000),
        expiry_date: add_months(start, 24),
        payout_type: payout,
        next_payment_due: start,
        transition_start_date: start,
        status: ContractStatus::Active,
        is_existing_tenant: false,
        original_expiry_date: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    h.store.insert_contract(&contract).await.unwrap();
    h.store
        .upsert_recipient(&Recipient {
            user_id: contract.tenant_id,
            display_name: "Tenant".into(),
            email: Some("tenant@example.com".into()),
            phone: None,
            push_token: None,
        })
        .await
        .unwrap();
    contract
}
