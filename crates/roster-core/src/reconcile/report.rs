//! Sync result aggregation

use serde::{Deserialize, Serialize};

use crate::util::compact_text;

/// Overall outcome of a batch that ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Ok,
    PartialSuccess,
}

/// Summary returned to the caller after a sync batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    pub processed_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub message: String,
    /// One entry per failed item, in processing order
    pub errors: Vec<String>,
    /// Items skipped for a reason worth surfacing
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl SyncReport {
    #[must_use]
    pub const fn status(&self) -> SyncStatus {
        if self.success {
            SyncStatus::Ok
        } else {
            SyncStatus::PartialSuccess
        }
    }

    /// Number of decisions the batch contained
    #[must_use]
    pub const fn total(&self) -> usize {
        self.processed_count + self.failed_count + self.skipped_count
    }
}

/// Running counters for one batch
#[derive(Debug, Default)]
pub struct SyncTally {
    processed: usize,
    failed: usize,
    skipped: usize,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl SyncTally {
    pub fn processed(&mut self) {
        self.processed += 1;
    }

    pub fn skipped(&mut self, note: Option<String>) {
        self.skipped += 1;
        if let Some(note) = note {
            self.warnings.push(compact_text(&note));
        }
    }

    pub fn failed(&mut self, label: &str, reason: &str) {
        self.failed += 1;
        self.errors.push(compact_text(&format!("{label}: {reason}")));
    }

    /// Move an item already counted as processed over to the failures
    pub fn retract(&mut self, label: &str, reason: &str) {
        self.processed = self.processed.saturating_sub(1);
        self.failed(label, reason);
    }

    #[must_use]
    pub fn finish(self) -> SyncReport {
        let success = self.failed == 0;
        let message = if success {
            format!(
                "Sync completed successfully: {} processed, {} skipped",
                self.processed, self.skipped
            )
        } else {
            format!(
                "Sync completed with errors: {} processed, {} failed, {} skipped",
                self.processed, self.failed, self.skipped
            )
        };

        SyncReport {
            success,
            processed_count: self.processed,
            failed_count: self.failed,
            skipped_count: self.skipped,
            message,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}
