//! Per-run item accounting.

use std::fmt;

use serde::Serialize;

/// Counts of what a batch job did with each item it looked at.
///
/// `processed == succeeded + skipped + failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Items examined.
    pub processed: u32,
    /// Items acted on.
    pub succeeded: u32,
    /// Items that needed no action.
    pub skipped: u32,
    /// Items whose action failed.
    pub failed: u32,
    /// `item: error` for each failure.
    pub failures: Vec<String>,
}

impl BatchReport {
    /// Empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts an item that was acted on.
    pub fn succeeded(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    /// Counts an item that needed no action.
    pub fn skipped(&mut self) {
        self.processed += 1;
        self.skipped += 1;
    }

    /// Counts a failed item.
    pub fn failed(&mut self, item: impl fmt::Display, error: impl fmt::Display) {
        self.processed += 1;
        self.failed += 1;
        self.failures.push(format!("{item}: {error}"));
    }

    /// Adds another report's counts to this one.
    pub fn merge(&mut self, other: Self) {
        self.processed += other.processed;
        self.succeeded += other.succeeded;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.failures.extend(other.failures);
    }

    /// Returns true if no item failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} succeeded={} skipped={} failed={}",
            self.processed, self.succeeded, self.skipped, self.failed
        )
    }
}
