//! Event dispatch and progress throttling for one cleaner run.

use soundloom_core::events::{CleanerEvent, CleanerNotice, CleanerPhase};

/// Sink for cleaner events.
///
/// Wraps a callback that receives each [`CleanerNotice`]. Dispatch is
/// fire-and-forget: the cleaner never waits on the sink.
pub struct CleanerSink {
    callback: Box<dyn Fn(&CleanerNotice) + Send + Sync>,
}

impl CleanerSink {
    /// Create a sink from the given callback.
    pub fn new(callback: impl Fn(&CleanerNotice) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a sink that discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_| {}),
        }
    }

    /// Dispatch one event.
    pub fn emit(&self, payload: CleanerEvent) {
        (self.callback)(&CleanerNotice::new(payload));
    }
}

impl std::fmt::Debug for CleanerSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanerSink").finish_non_exhaustive()
    }
}

impl Default for CleanerSink {
    fn default() -> Self {
        Self::noop()
    }
}

/// Throttled progress reporting on top of a [`CleanerSink`].
///
/// Progress events only go out when the integer percentage moves, so a run
/// over thousands of resources cannot flood the sink.
pub(crate) struct ProgressTracker<'a> {
    sink: &'a CleanerSink,
    last_percent: i32,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a CleanerSink) -> Self {
        Self {
            sink,
            last_percent: i32::MIN,
        }
    }

    /// Announce a phase transition.
    pub(crate) fn phase(&mut self, phase: CleanerPhase) {
        tracing::info!(?phase, "cleaner phase");
        self.sink.emit(CleanerEvent::PhaseChanged { phase });
    }

    /// Report progress. `percent` is clamped to `[-1, 100]`; -1 means
    /// indeterminate and is never throttled.
    pub(crate) fn report(&mut self, percent: i32, message: &str) {
        let percent = percent.clamp(-1, 100);
        if percent >= 0 && percent == self.last_percent {
            return;
        }
        self.last_percent = percent;
        self.sink.emit(CleanerEvent::Progress {
            percent,
            message: message.to_owned(),
        });
    }

    /// Pass a non-progress event through to the sink.
    pub(crate) fn emit(&self, payload: CleanerEvent) {
        self.sink.emit(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_sink() -> (CleanerSink, Arc<Mutex<Vec<CleanerEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let inner = events.clone();
        let sink = CleanerSink::new(move |notice| {
            inner.lock().unwrap().push(notice.payload.clone());
        });
        (sink, events)
    }

    #[test]
    fn repeated_percent_is_throttled() {
        let (sink, events) = recording_sink();
        let mut progress = ProgressTracker::new(&sink);
        progress.report(10, "a");
        progress.report(10, "b");
        progress.report(11, "c");
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn indeterminate_is_never_throttled() {
        let (sink, events) = recording_sink();
        let mut progress = ProgressTracker::new(&sink);
        progress.report(-1, "a");
        progress.report(-1, "b");
        assert_eq!(events.lock().unwrap().len(), 2);
    }

    #[test]
    fn percent_is_clamped() {
        let (sink, events) = recording_sink();
        let mut progress = ProgressTracker::new(&sink);
        progress.report(250, "too much");
        let recorded = events.lock().unwrap();
        match &recorded[0] {
            CleanerEvent::Progress { percent, .. } => assert_eq!(*percent, 100),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn phase_changes_are_dispatched() {
        let (sink, events) = recording_sink();
        let mut progress = ProgressTracker::new(&sink);
        progress.phase(CleanerPhase::Repacking);
        assert!(matches!(
            events.lock().unwrap()[0],
            CleanerEvent::PhaseChanged {
                phase: CleanerPhase::Repacking
            }
        ));
    }

    #[test]
    fn noop_sink_does_not_panic() {
        let sink = CleanerSink::noop();
        sink.emit(CleanerEvent::Progress {
            percent: 50,
            message: "halfway".into(),
        });
    }
}
