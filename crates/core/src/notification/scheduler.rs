//! Notification Scheduler.
//!
//! Each send first claims a [`PaymentNotification`] row by its dedupe key;
//! only the run that claims the row delivers it. Overlapping runs and
//! re-runs on the same day therefore never send twice.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rentflow_shared::types::{ContractId, NotificationId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::policy::{self, ReminderPolicy};
use super::sender::{ChannelHint, NotificationSender, OutboundNotification};
use super::types::{NotificationStatus, NotificationTrigger, PaymentNotification};
use crate::clock::Clock;
use crate::contract::{ContractFilter, RentContract};
use crate::error::{Classify, ErrorKind};
use crate::escrow::EscrowBalance;
use crate::jobs::BatchReport;
use crate::store::{LedgerStore, StoreError};

/// Age after which a `pending` claim left by an interrupted pass is taken over.
const CLAIM_TIMEOUT_MINUTES: i64 = 15;

/// Errors that abort a whole notification pass.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Classify for NotificationError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(e) => e.kind(),
        }
    }
}

/// Result of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Delivered.
    Sent,
    /// Already claimed by an earlier run.
    Duplicate,
    /// Recipient unknown or without a channel; recorded as failed, not retried.
    NoRecipient,
    /// Sender failed; recorded as failed.
    Failed(String),
}

struct Draft {
    contract_id: ContractId,
    tenant_id: UserId,
    recipient_id: UserId,
    trigger: NotificationTrigger,
    cycle: String,
    scheduled_for: NaiveDate,
    amount: Decimal,
    date: NaiveDate,
}

/// Reminder, escalation and receipt notifications.
pub struct NotificationScheduler {
    store: Arc<dyn LedgerStore>,
    sender: Arc<dyn NotificationSender>,
    clock: Arc<dyn Clock>,
    policy: ReminderPolicy,
    currency: String,
}

impl NotificationScheduler {
    /// Creates a scheduler.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        sender: Arc<dyn NotificationSender>,
        clock: Arc<dyn Clock>,
        policy: ReminderPolicy,
    ) -> Self {
        Self {
            store,
            sender,
            clock,
            policy,
            currency: "NGN".to_string(),
        }
    }

    /// Sets the currency shown in messages.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Early and due-today reminders for active contracts.
    pub async fn send_payment_reminders(&self) -> Result<BatchReport, NotificationError> {
        let today = self.clock.today();
        let mut due_dates = vec![today];
        let early = self.policy.early_reminder_date(today);
        if early != today {
            due_dates.push(early);
        }

        let mut report = BatchReport::new();
        for due in due_dates {
            let contracts = self
                .store
                .list_contracts(&ContractFilter {
                    due_on: Some(due),
                    ..ContractFilter::active()
                })
                .await?;

            for contract in contracts {
                let Some(trigger) = self.policy.reminder_trigger(contract.next_payment_due, today)
                else {
                    report.skipped();
                    continue;
                };
                let draft = Self::tenant_draft(&contract, trigger, today);
                Self::tally(&mut report, contract.id, self.dispatch(draft).await);
            }
        }

        info!(job = "payment_reminders", %report, "Reminder pass finished");
        Ok(report)
    }

    /// Overdue notices on the configured day offsets only.
    pub async fn send_overdue_notices(&self) -> Result<BatchReport, NotificationError> {
        let today = self.clock.today();
        let contracts = self
            .store
            .list_contracts(&ContractFilter {
                due_before: Some(self.policy.overdue_cutoff(today)),
                ..ContractFilter::active()
            })
            .await?;

        let mut report = BatchReport::new();
        for contract in contracts {
            let Some(trigger) = self.policy.overdue_trigger(contract.next_payment_due, today) else {
                debug!(
                    contract_id = %contract.id,
                    due = %contract.next_payment_due,
                    "Overdue but not on an escalation day"
                );
                report.skipped();
                continue;
            };
            let draft = Self::tenant_draft(&contract, trigger, today);
            Self::tally(&mut report, contract.id, self.dispatch(draft).await);
        }

        info!(job = "overdue_escalation", %report, "Overdue pass finished");
        Ok(report)
    }

    /// One warning per contract expiring inside the warning window.
    pub async fn send_expiry_warnings(&self) -> Result<BatchReport, NotificationError> {
        let today = self.clock.today();
        let window_end = today + chrono::Duration::days(i64::from(self.policy.expiry_warning_days));
        let contracts = self
            .store
            .list_contracts(&ContractFilter {
                expiring_from: Some(today),
                expiring_to: Some(window_end),
                ..ContractFilter::active()
            })
            .await?;

        let mut report = BatchReport::new();
        for contract in contracts {
            let draft = Draft {
                contract_id: contract.id,
                tenant_id: contract.tenant_id,
                recipient_id: contract.tenant_id,
                trigger: NotificationTrigger::ExpiryWarning,
                cycle: contract.expiry_date.to_string(),
                scheduled_for: today,
                amount: contract.monthly_amount,
                date: contract.expiry_date,
            };
            Self::tally(&mut report, contract.id, self.dispatch(draft).await);
        }

        info!(job = "expiry_warnings", %report, "Expiry warning pass finished");
        Ok(report)
    }

    /// Receipt to the tenant, once per payment reference.
    pub async fn notify_payment_received(
        &self,
        contract: &RentContract,
        reference: &str,
        amount: Decimal,
    ) -> Result<DispatchOutcome, NotificationError> {
        self.dispatch(Draft {
            contract_id: contract.id,
            tenant_id: contract.tenant_id,
            recipient_id: contract.tenant_id,
            trigger: NotificationTrigger::PaymentReceived,
            cycle: reference.to_string(),
            scheduled_for: self.clock.today(),
            amount,
            date: contract.next_payment_due,
        })
        .await
    }

    /// Release notice to the landlord, once per bucket.
    pub async fn notify_escrow_released(
        &self,
        escrow: &EscrowBalance,
        tenant_id: UserId,
    ) -> Result<DispatchOutcome, NotificationError> {
        let today = self.clock.today();
        self.dispatch(Draft {
            contract_id: escrow.contract_id,
            tenant_id,
            recipient_id: escrow.landlord_id,
            trigger: NotificationTrigger::EscrowReleased,
            cycle: escrow.id.to_string(),
            scheduled_for: today,
            amount: escrow.released_amount.unwrap_or(escrow.total_escrowed),
            date: today,
        })
        .await
    }

    fn tenant_draft(
        contract: &RentContract,
        trigger: NotificationTrigger,
        today: NaiveDate,
    ) -> Draft {
        Draft {
            contract_id: contract.id,
            tenant_id: contract.tenant_id,
            recipient_id: contract.tenant_id,
            trigger,
            cycle: contract.next_payment_due.to_string(),
            scheduled_for: today,
            amount: contract.monthly_amount,
            date: contract.next_payment_due,
        }
    }

    fn tally(
        report: &mut BatchReport,
        contract_id: ContractId,
        outcome: Result<DispatchOutcome, NotificationError>,
    ) {
        match outcome {
            Ok(DispatchOutcome::Sent) => report.succeeded(),
            Ok(DispatchOutcome::Duplicate | DispatchOutcome::NoRecipient) => report.skipped(),
            Ok(DispatchOutcome::Failed(reason)) => report.failed(contract_id, reason),
            Err(e) => {
                warn!(contract_id = %contract_id, error = %e, "Notification dispatch failed");
                report.failed(contract_id, e);
            }
        }
    }

    async fn dispatch(&self, draft: Draft) -> Result<DispatchOutcome, NotificationError> {
        let (title, message) = policy::render(draft.trigger, draft.amount, &self.currency, draft.date);
        let mut row = PaymentNotification {
            id: NotificationId::new(),
            contract_id: draft.contract_id,
            tenant_id: draft.tenant_id,
            recipient_id: draft.recipient_id,
            notification_type: draft.trigger.notification_type(),
            trigger: draft.trigger.label(),
            scheduled_for: draft.scheduled_for,
            sent_at: None,
            title,
            message,
            status: NotificationStatus::Pending,
            delivery_receipt_id: None,
            delivery_method: None,
            error: None,
            dedupe_key: policy::dedupe_key(draft.contract_id, draft.trigger, &draft.cycle),
            created_at: self.clock.now(),
        };

        let stale_before = row.created_at - Duration::minutes(CLAIM_TIMEOUT_MINUTES);
        if !self
            .store
            .insert_notification_if_absent(&row, stale_before)
            .await?
        {
            debug!(dedupe_key = %row.dedupe_key, "Notification already claimed");
            return Ok(DispatchOutcome::Duplicate);
        }

        let recipient = self
            .store
            .find_recipient(draft.recipient_id)
            .await?
            .filter(super::types::Recipient::has_channel);
        let Some(recipient) = recipient else {
            warn!(
                contract_id = %draft.contract_id,
                user_id = %draft.recipient_id,
                trigger = %row.trigger,
                "No contact channel for recipient, skipping"
            );
            row.status = NotificationStatus::Failed;
            row.error = Some("no contact channel".to_string());
            self.store.update_notification(&row).await?;
            return Ok(DispatchOutcome::NoRecipient);
        };

        let outbound = OutboundNotification {
            user_id: draft.recipient_id,
            recipient,
            title: row.title.clone(),
            body: row.message.clone(),
            channel_hint: match draft.trigger {
                NotificationTrigger::Overdue { .. } => ChannelHint::Sms,
                _ => ChannelHint::Any,
            },
        };

        let outcome = match self.sender.send(&outbound).await {
            Ok(receipt) if receipt.success => {
                row.status = NotificationStatus::Sent;
                row.sent_at = Some(self.clock.now());
                row.delivery_receipt_id = receipt.receipt_id;
                row.delivery_method = Some(receipt.method);
                DispatchOutcome::Sent
            }
            Ok(receipt) => {
                let reason = format!("{} delivery not accepted", receipt.method);
                row.status = NotificationStatus::Failed;
                row.delivery_method = Some(receipt.method);
                row.error = Some(reason.clone());
                DispatchOutcome::Failed(reason)
            }
            Err(e) => {
                row.status = NotificationStatus::Failed;
                row.error = Some(e.to_string());
                DispatchOutcome::Failed(e.to_string())
            }
        };
        self.store.update_notification(&row).await?;

        match &outcome {
            DispatchOutcome::Sent => info!(
                contract_id = %draft.contract_id,
                trigger = %row.trigger,
                method = row.delivery_method.as_deref().unwrap_or_default(),
                "Notification sent"
            ),
            DispatchOutcome::Failed(reason) => warn!(
                contract_id = %draft.contract_id,
                trigger = %row.trigger,
                reason = %reason,
                "Notification delivery failed"
            ),
            _ => {}
        }
        Ok(outcome)
    }
}
