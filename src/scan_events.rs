//! Events emitted by a scan session (consumed by notifiers)

use crate::report::{Finding, ScanOutcome, ScanTarget};

/// User-visible events raised on state transitions and detections.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// A scan has started.
    Started { target: ScanTarget },

    /// The scan was paused; progress is frozen at this point.
    Paused { progress_percent: f64 },

    /// The scan resumed from its preserved progress point.
    Resumed { progress_percent: f64 },

    /// The classifier returned a critical-confidence verdict.
    ThreatDetected { finding: Finding },

    /// A classifier call failed or timed out; the scan continues and no
    /// verdict is recorded for the artifact.
    ClassifierFailed { label: String, error: String },

    /// The scan ran to completion. The outcome has also been handed to
    /// the history sink.
    Completed { outcome: ScanOutcome },

    /// The scan was cancelled. The outcome carries the findings gathered
    /// so far but is not persisted.
    Cancelled { outcome: ScanOutcome },

    /// Persisting a completed outcome failed; the outcome is still
    /// available on the session.
    PersistFailed { error: String },
}
