//! Per-job run statistics.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::report::BatchReport;

/// Statistics for one job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    /// Completed runs, successful or not.
    pub runs: u64,
    /// Runs that returned a report.
    pub successes: u64,
    /// Runs that failed as a whole.
    pub failures: u64,
    /// Items that failed across all runs.
    pub item_failures: u64,
    /// Start of the latest run.
    pub last_started_at: Option<DateTime<Utc>>,
    /// Duration of the latest run.
    pub last_duration_ms: u64,
    /// Attempts used by the latest run.
    pub last_attempts: u32,
    /// Report of the latest successful run.
    pub last_report: Option<BatchReport>,
    /// Error of the latest failed run.
    pub last_error: Option<String>,
}

/// Thread-safe registry of [`JobStats`] keyed by job name.
#[derive(Debug, Default)]
pub struct JobMetrics {
    stats: Mutex<BTreeMap<String, JobStats>>,
}

impl JobMetrics {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finished run.
    pub fn record(
        &self,
        job: &str,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        attempts: u32,
        outcome: Result<&BatchReport, &str>,
    ) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = stats.entry(job.to_string()).or_default();
        entry.runs += 1;
        entry.last_started_at = Some(started_at);
        entry.last_duration_ms = duration_ms;
        entry.last_attempts = attempts;
        match outcome {
            Ok(report) => {
                entry.successes += 1;
                entry.item_failures += u64::from(report.failed);
                entry.last_report = Some(report.clone());
                entry.last_error = None;
            }
            Err(error) => {
                entry.failures += 1;
                entry.last_error = Some(error.to_string());
            }
        }
    }

    /// Stats for one job.
    #[must_use]
    pub fn get(&self, job: &str) -> Option<JobStats> {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job)
            .cloned()
    }

    /// Every job's stats, ordered by name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, JobStats> {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
