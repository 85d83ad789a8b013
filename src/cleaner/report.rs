//! Summary of one cleaner run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanerOutcome {
    /// The run visited every phase.
    Completed,
    /// Cancellation was observed; mutations already applied stand.
    Cancelled,
}

/// Counters for one run, reported back to the caller on success and on
/// cancellation alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanerReport {
    /// How the run ended.
    pub outcome: CleanerOutcome,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub finished_at: DateTime<Utc>,
    /// Media released because reachability no longer included them.
    pub media_released: u64,
    /// Media whose storage was rewritten into output resources.
    pub media_repacked: u64,
    /// Output resources allocated by the repacker.
    pub resources_created: u64,
    /// Resources moved to quarantine and deregistered.
    pub resources_quarantined: u64,
    /// Orphan files (present on disk, backed by no resource) quarantined.
    pub orphans_quarantined: u64,
    /// Resources whose reclamation was deferred by a recoverable failure.
    pub resources_deferred: u64,
    /// Payload bytes streamed into output resources.
    pub bytes_written: u64,
    /// Bytes of backing files moved to quarantine.
    pub bytes_reclaimed: u64,
}

impl CleanerReport {
    /// Start a report clocked at now.
    #[must_use]
    pub(crate) fn begin() -> Self {
        let now = Utc::now();
        Self {
            outcome: CleanerOutcome::Completed,
            started_at: now,
            finished_at: now,
            media_released: 0,
            media_repacked: 0,
            resources_created: 0,
            resources_quarantined: 0,
            orphans_quarantined: 0,
            resources_deferred: 0,
            bytes_written: 0,
            bytes_reclaimed: 0,
        }
    }

    /// Stamp the end of the run.
    pub(crate) fn finish(&mut self, outcome: CleanerOutcome) {
        self.outcome = outcome;
        self.finished_at = Utc::now();
    }

    /// Whether the run changed nothing (the idempotent second pass).
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.media_released == 0
            && self.media_repacked == 0
            && self.resources_created == 0
            && self.resources_quarantined == 0
            && self.orphans_quarantined == 0
    }
}
