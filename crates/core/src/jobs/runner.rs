//! Job Runner.
//!
//! Each registered job gets its own task that sleeps until the next fire
//! time, runs the job under the retry policy and records metrics. Whole-job
//! transient failures are retried; per-item failures are the job's own
//! business and show up in its [`BatchReport`].

use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::backoff::RetryPolicy;
use super::metrics::JobMetrics;
use super::report::BatchReport;
use super::schedule::JobSchedule;
use crate::clock::Clock;
use crate::error::{Classify, ErrorKind};

/// A whole-job failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    /// No job registered under this name.
    #[error("Unknown job: {0}")]
    UnknownJob(String),

    /// The job function returned an error.
    #[error("{message}")]
    Failed {
        /// Rendered error.
        message: String,
        /// Its class.
        kind: ErrorKind,
    },
}

impl JobError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownJob(_) => "UNKNOWN_JOB",
            Self::Failed { .. } => "JOB_FAILED",
        }
    }

    /// Captures a domain error.
    pub fn from_error<E: Classify + Display>(error: &E) -> Self {
        Self::Failed {
            message: error.to_string(),
            kind: error.kind(),
        }
    }
}

impl Classify for JobError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownJob(_) => ErrorKind::NotFound,
            Self::Failed { kind, .. } => *kind,
        }
    }
}

/// A scheduled batch operation.
#[async_trait]
pub trait Job: Send + Sync {
    /// Stable name used in logs, metrics and the API.
    fn name(&self) -> &'static str;

    /// Runs one pass.
    async fn run(&self) -> Result<BatchReport, JobError>;
}

struct Registration {
    job: Arc<dyn Job>,
    schedule: JobSchedule,
}

/// Runs jobs on their schedules.
pub struct JobRunner {
    jobs: Vec<Registration>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    metrics: Arc<JobMetrics>,
}

impl JobRunner {
    /// Creates a runner with no jobs.
    pub fn new(retry: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            jobs: Vec::new(),
            retry,
            clock,
            metrics: Arc::new(JobMetrics::new()),
        }
    }

    /// Adds a job.
    #[must_use]
    pub fn register(mut self, job: Arc<dyn Job>, schedule: JobSchedule) -> Self {
        self.jobs.push(Registration { job, schedule });
        self
    }

    /// Shared metrics registry.
    #[must_use]
    pub fn metrics(&self) -> Arc<JobMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Registered jobs and their cadences.
    #[must_use]
    pub fn schedules(&self) -> Vec<(&'static str, JobSchedule)> {
        self.jobs
            .iter()
            .map(|r| (r.job.name(), r.schedule))
            .collect()
    }

    /// Runs one job now, with retries, and records the outcome.
    pub async fn run_once(&self, name: &str) -> Result<BatchReport, JobError> {
        let registration = self
            .jobs
            .iter()
            .find(|r| r.job.name() == name)
            .ok_or_else(|| JobError::UnknownJob(name.to_string()))?;
        self.execute(registration.job.as_ref()).await
    }

    /// Runs every job once, in registration order.
    pub async fn run_all(&self) -> Vec<(&'static str, Result<BatchReport, JobError>)> {
        let mut results = Vec::with_capacity(self.jobs.len());
        for registration in &self.jobs {
            let job = registration.job.as_ref();
            results.push((job.name(), self.execute(job).await));
        }
        results
    }

    async fn execute(&self, job: &dyn Job) -> Result<BatchReport, JobError> {
        let started_at = self.clock.now();
        let timer = Instant::now();
        let (result, attempts) = self.retry.retry(job.name(), || job.run()).await;
        let elapsed_ms = u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(report) => {
                info!(
                    job = job.name(),
                    processed = report.processed,
                    succeeded = report.succeeded,
                    skipped = report.skipped,
                    failed = report.failed,
                    attempts,
                    elapsed_ms,
                    "Job run finished"
                );
                self.metrics
                    .record(job.name(), started_at, elapsed_ms, attempts, Ok(report));
            }
            Err(e) => {
                error!(job = job.name(), attempts, elapsed_ms, error = %e, "Job run failed");
                let message = e.to_string();
                self.metrics
                    .record(job.name(), started_at, elapsed_ms, attempts, Err(&message));
            }
        }
        result
    }

    /// Starts one timer task per job. Tasks exit when `shutdown` flips to true.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        (0..self.jobs.len())
            .map(|index| {
                let runner = Arc::clone(&self);
                let mut shutdown = shutdown.clone();
                tokio::spawn(async move { runner.schedule_loop(index, &mut shutdown).await })
            })
            .collect()
    }

    async fn schedule_loop(&self, index: usize, shutdown: &mut watch::Receiver<bool>) {
        let Some(registration) = self.jobs.get(index) else {
            return;
        };
        let name = registration.job.name();
        info!(job = name, schedule = %registration.schedule, "Job scheduled");

        loop {
            if *shutdown.borrow() {
                break;
            }
            let now = self.clock.now();
            let next = registration.schedule.next_after(now);
            let wait = (next - now).to_std().unwrap_or_default();

            tokio::select! {
                () = tokio::time::sleep(wait) => {
                    if self.execute(registration.job.as_ref()).await.is_err() {
                        warn!(job = name, next_run = %registration.schedule.next_after(self.clock.now()), "Job will run again on schedule");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(job = name, "Job stopped");
    }
}
