//! Cleaner event payloads.
//!
//! One compaction run reports its lifecycle through these explicit variants,
//! dispatched through the sink the caller installs on the cleaner. Events are
//! fire-and-forget notifications, never a synchronization barrier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{MediaId, ResourceId};

// ---------------------------------------------------------------------------
// CleanerPhase
// ---------------------------------------------------------------------------

/// State machine for one cleaner run.
///
/// `Cancelled` is reachable from every state once cancellation is observed;
/// no state rolls back mutations committed by an earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanerPhase {
    /// No run in progress.
    Idle,
    /// Releasing media absent from the reachability set.
    ComputingReachability,
    /// Building hole maps for audio resources (skipped in preserve mode).
    ComputingHoles,
    /// Streaming used bytes into consolidated output resources.
    Repacking,
    /// Quarantining unreferenced resources.
    Reclaiming,
    /// The run finished normally.
    Done,
    /// The run observed cancellation and returned early.
    Cancelled,
}

// ---------------------------------------------------------------------------
// CleanerEvent
// ---------------------------------------------------------------------------

/// Payload describing what happened during a cleaner run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CleanerEvent {
    // -- Run lifecycle -------------------------------------------------------
    PhaseChanged {
        phase: CleanerPhase,
    },
    /// Throttled progress. `percent` is -1 when indeterminate.
    Progress {
        percent: i32,
        message: String,
    },

    // -- Media lifecycle -----------------------------------------------------
    MediaReleased {
        media: MediaId,
    },
    MediaRepacked {
        media: MediaId,
        resource: ResourceId,
        bytes: u64,
    },

    // -- Resource lifecycle --------------------------------------------------
    ResourceQuarantined {
        resource: ResourceId,
        file_name: String,
        bytes: u64,
    },
    /// A recoverable per-resource condition deferred this resource to a
    /// future pass.
    ResourceSkipped {
        resource: ResourceId,
        reason: String,
    },
    /// A file in the data directory backed by no registered resource was
    /// moved to quarantine.
    OrphanQuarantined {
        file_name: String,
    },
}

/// A timestamped event ready for dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanerNotice {
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub payload: CleanerEvent,
}

impl CleanerNotice {
    /// Wrap a payload with the current timestamp.
    pub fn new(payload: CleanerEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            payload,
        }
    }
}
