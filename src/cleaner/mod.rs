//! The cleaner: media-data garbage collection and audio repacking.
//!
//! One run is a single-threaded, synchronous batch walking the phases
//! `ComputingReachability -> ComputingHoles -> Repacking -> Reclaiming ->
//! Done`. Cancellation is cooperative: the shared token is polled at the top
//! of every loop and at every phase boundary, and an observed cancellation
//! returns early without rolling back mutations already applied. Reclaiming
//! is only entered after repacking succeeds, so a mid-pass failure always
//! surfaces before any file is quarantined.

mod classify;
mod holes;
mod progress;
mod reclaim;
mod repack;
mod report;

pub use holes::{HoleMap, Span};
pub use progress::CleanerSink;
pub use report::{CleanerOutcome, CleanerReport};

use tokio_util::sync::CancellationToken;

use soundloom_core::events::CleanerPhase;
use soundloom_core::{CleanerConfig, Result};
use soundloom_media::{Project, UsedSet};

use progress::ProgressTracker;

/// The compaction engine.
///
/// Owns neither media nor resources; it mutates clip lists and the resource
/// registry of the [`Project`] handed to [`run`](Cleaner::run). Callers must
/// not mutate the same project while a run is in progress.
#[derive(Debug)]
pub struct Cleaner {
    config: CleanerConfig,
    cancel: CancellationToken,
    sink: CleanerSink,
}

impl Cleaner {
    /// Create a cleaner with the given configuration.
    #[must_use]
    pub fn new(config: CleanerConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
            sink: CleanerSink::noop(),
        }
    }

    /// Builder: attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Builder: attach an event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: CleanerSink) -> Self {
        self.sink = sink;
        self
    }

    /// Run one compaction pass.
    ///
    /// Returns `Ok` with the run's counters on normal completion and on
    /// cancellation alike (cancellation is not an error); structural
    /// failures (missing backing data, I/O during streaming) abort the run
    /// and propagate.
    ///
    /// The pass is resumable at media/resource granularity but not atomic
    /// end-to-end: re-invocation after a failure picks up where it left off.
    pub fn run(&self, project: &mut Project, used: &UsedSet) -> Result<CleanerReport> {
        self.config.validate()?;
        let mut report = CleanerReport::begin();
        let mut progress = ProgressTracker::new(&self.sink);
        tracing::info!(
            media = project.media.len(),
            resources = project.resources.len(),
            retained = used.len(),
            preserve = self.config.preserve_resources,
            "starting cleanup"
        );

        if self.cancel.is_cancelled() {
            return Ok(self.cancelled(report, &mut progress));
        }
        progress.phase(CleanerPhase::ComputingReachability);
        progress.report(0, "Releasing unreachable media");
        report.media_released =
            classify::release_unused(project, used, &self.cancel, &mut progress);
        if self.cancel.is_cancelled() {
            return Ok(self.cancelled(report, &mut progress));
        }

        let classification = if self.config.preserve_resources {
            classify::Classification::empty()
        } else {
            progress.phase(CleanerPhase::ComputingHoles);
            classify::classify(
                project,
                self.config.hole_tolerance(),
                &self.cancel,
                &mut progress,
            )?
        };
        if self.cancel.is_cancelled() {
            return Ok(self.cancelled(report, &mut progress));
        }

        if !classification.repack_candidates.is_empty() {
            progress.phase(CleanerPhase::Repacking);
            repack::repack(
                project,
                &classification.repack_candidates,
                &self.config,
                &self.cancel,
                &mut progress,
                &mut report,
            )?;
        }
        if self.cancel.is_cancelled() {
            return Ok(self.cancelled(report, &mut progress));
        }

        progress.phase(CleanerPhase::Reclaiming);
        reclaim::reclaim(project, &self.config, &self.cancel, &mut progress, &mut report)?;
        if self.cancel.is_cancelled() {
            return Ok(self.cancelled(report, &mut progress));
        }

        progress.phase(CleanerPhase::Done);
        progress.report(100, "Cleanup complete");
        report.finish(CleanerOutcome::Completed);
        tracing::info!(
            released = report.media_released,
            repacked = report.media_repacked,
            quarantined = report.resources_quarantined,
            bytes_reclaimed = report.bytes_reclaimed,
            "cleanup complete"
        );
        Ok(report)
    }

    fn cancelled(
        &self,
        mut report: CleanerReport,
        progress: &mut ProgressTracker<'_>,
    ) -> CleanerReport {
        tracing::info!("cleanup cancelled");
        progress.phase(CleanerPhase::Cancelled);
        report.finish(CleanerOutcome::Cancelled);
        report
    }
}
