//! Job Runner and the scheduled batch jobs.

pub mod backoff;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod schedule;
pub mod tasks;

pub use backoff::RetryPolicy;
pub use metrics::{JobMetrics, JobStats};
pub use report::BatchReport;
pub use runner::{Job, JobError, JobRunner};
pub use schedule::{JobSchedule, ScheduleError};
pub use tasks::{
    ContractExpiryJob, EscrowReleaseJob, ExpiryWarningJob, OverdueEscalationJob,
    PaymentReminderJob, register_standard_jobs,
};
