//! The engine's scheduled jobs.

use std::sync::Arc;

use async_trait::async_trait;
use rentflow_shared::config::JobsConfig;

use super::report::BatchReport;
use super::runner::{Job, JobError, JobRunner};
use super::schedule::{JobSchedule, ScheduleError};
use crate::contract::ContractService;
use crate::escrow::EscrowReleaseEngine;
use crate::notification::NotificationScheduler;

/// Releases matured escrow buckets.
pub struct EscrowReleaseJob(pub Arc<EscrowReleaseEngine>);

#[async_trait]
impl Job for EscrowReleaseJob {
    fn name(&self) -> &'static str {
        "escrow_release"
    }

    async fn run(&self) -> Result<BatchReport, JobError> {
        self.0
            .check_and_release_escrow()
            .await
            .map_err(|e| JobError::from_error(&e))
    }
}

/// Early and due-day reminders.
pub struct PaymentReminderJob(pub Arc<NotificationScheduler>);

#[async_trait]
impl Job for PaymentReminderJob {
    fn name(&self) -> &'static str {
        "payment_reminders"
    }

    async fn run(&self) -> Result<BatchReport, JobError> {
        self.0
            .send_payment_reminders()
            .await
            .map_err(|e| JobError::from_error(&e))
    }
}

/// Overdue escalation on the configured offsets.
pub struct OverdueEscalationJob(pub Arc<NotificationScheduler>);

#[async_trait]
impl Job for OverdueEscalationJob {
    fn name(&self) -> &'static str {
        "overdue_escalation"
    }

    async fn run(&self) -> Result<BatchReport, JobError> {
        self.0
            .send_overdue_notices()
            .await
            .map_err(|e| JobError::from_error(&e))
    }
}

/// Moves lapsed contracts to `expired`.
pub struct ContractExpiryJob(pub Arc<ContractService>);

#[async_trait]
impl Job for ContractExpiryJob {
    fn name(&self) -> &'static str {
        "contract_expiry"
    }

    async fn run(&self) -> Result<BatchReport, JobError> {
        self.0
            .expire_contracts()
            .await
            .map_err(|e| JobError::from_error(&e))
    }
}

/// Warns tenants whose contract expires soon.
pub struct ExpiryWarningJob(pub Arc<NotificationScheduler>);

#[async_trait]
impl Job for ExpiryWarningJob {
    fn name(&self) -> &'static str {
        "expiry_warnings"
    }

    async fn run(&self) -> Result<BatchReport, JobError> {
        self.0
            .send_expiry_warnings()
            .await
            .map_err(|e| JobError::from_error(&e))
    }
}

/// Registers the five standard jobs on their configured cadences.
pub fn register_standard_jobs(
    runner: JobRunner,
    config: &JobsConfig,
    escrow: Arc<EscrowReleaseEngine>,
    notifications: Arc<NotificationScheduler>,
    contracts: Arc<ContractService>,
) -> Result<JobRunner, ScheduleError> {
    let daily = JobSchedule::daily(config)?;
    let weekly = JobSchedule::weekly(config)?;
    Ok(runner
        .register(Arc::new(EscrowReleaseJob(escrow)), daily)
        .register(Arc::new(PaymentReminderJob(notifications.clone())), daily)
        .register(Arc::new(OverdueEscalationJob(notifications.clone())), daily)
        .register(Arc::new(ContractExpiryJob(contracts)), daily)
        .register(Arc::new(ExpiryWarningJob(notifications)), weekly))
}
