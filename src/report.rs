//! Scan findings and outcome aggregation
//!
//! The severity thresholds here drive everything downstream (overall
//! severity, history dashboards), so they are fixed constants rather than
//! configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a session is scanning. Fixed for the session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanTarget {
    File { name: String, size_bytes: u64 },
    System,
}

impl ScanTarget {
    /// Short label for tables and notifications.
    pub fn label(&self) -> String {
        match self {
            ScanTarget::File { name, .. } => name.clone(),
            ScanTarget::System => "Full system".to_string(),
        }
    }

    /// Human-readable description including the file size where known.
    pub fn describe(&self) -> String {
        match self {
            ScanTarget::File { name, size_bytes } => {
                format!("{} ({})", name, bytesize::to_string(*size_bytes, true))
            }
            ScanTarget::System => "Full system scan".to_string(),
        }
    }
}

/// Threat severity, ordered: `Safe < Suspicious < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    Safe,
    Suspicious,
    Critical,
}

impl Severity {
    /// Map a classifier confidence in [0, 1] to a severity bucket.
    ///
    /// Boundaries are inclusive on the upper side: 0.30 is already
    /// Suspicious and 0.70 is already Critical.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence < 0.30 {
            Severity::Safe
        } else if confidence < 0.70 {
            Severity::Suspicious
        } else {
            Severity::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Safe => "Safe",
            Severity::Suspicious => "Suspicious",
            Severity::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected item. Append-only within a session; never mutated after
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: Uuid,
    /// Name or path of the affected artifact.
    pub label: String,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
    pub severity: Severity,
    pub detected_at: DateTime<Utc>,
}

impl Finding {
    /// Create a finding from a classifier verdict. Confidence is clamped
    /// into [0, 1] before the severity is derived.
    pub fn new(label: &str, confidence: f64) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        Self {
            id: Uuid::new_v4(),
            label: label.to_string(),
            confidence,
            severity: Severity::from_confidence(confidence),
            detected_at: Utc::now(),
        }
    }
}

/// Immutable snapshot of a terminated scan, handed to the history sink
/// (completed scans only) and the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub target: ScanTarget,
    pub total_steps: usize,
    /// Findings in detection order.
    pub findings: Vec<Finding>,
    pub overall_severity: Severity,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// True when the scan was stopped before completion. Cancelled
    /// outcomes are never persisted.
    pub cancelled: bool,
}

impl ScanOutcome {
    /// One-line summary for notifications and table rows.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} finding(s), overall {}",
            self.target.label(),
            self.findings.len(),
            self.overall_severity
        )
    }

    /// Count of findings at exactly the given severity.
    pub fn count_at(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }
}

/// Worst severity across the findings; `Safe` when there are none.
/// Pure function of the findings list.
pub fn overall_severity(findings: &[Finding]) -> Severity {
    findings
        .iter()
        .map(|f| f.severity)
        .max()
        .unwrap_or(Severity::Safe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_thresholds_are_boundary_exact() {
        assert_eq!(Severity::from_confidence(0.0), Severity::Safe);
        assert_eq!(Severity::from_confidence(0.29), Severity::Safe);
        assert_eq!(Severity::from_confidence(0.30), Severity::Suspicious);
        assert_eq!(Severity::from_confidence(0.69), Severity::Suspicious);
        assert_eq!(Severity::from_confidence(0.70), Severity::Critical);
        assert_eq!(Severity::from_confidence(1.0), Severity::Critical);
    }

    #[test]
    fn severity_ordering_safe_lt_suspicious_lt_critical() {
        assert!(Severity::Safe < Severity::Suspicious);
        assert!(Severity::Suspicious < Severity::Critical);
    }

    #[test]
    fn finding_clamps_confidence() {
        let high = Finding::new("a.exe", 1.7);
        assert_eq!(high.confidence, 1.0);
        assert_eq!(high.severity, Severity::Critical);

        let low = Finding::new("b.dll", -0.2);
        assert_eq!(low.confidence, 0.0);
        assert_eq!(low.severity, Severity::Safe);
    }

    #[test]
    fn overall_severity_of_empty_findings_is_safe() {
        assert_eq!(overall_severity(&[]), Severity::Safe);
    }

    #[test]
    fn overall_severity_is_the_maximum() {
        let findings = vec![
            Finding::new("clean.txt", 0.1),
            Finding::new("odd.dll", 0.5),
            Finding::new("bad.exe", 0.9),
        ];
        assert_eq!(overall_severity(&findings), Severity::Critical);

        let findings = vec![Finding::new("clean.txt", 0.1), Finding::new("odd.dll", 0.5)];
        assert_eq!(overall_severity(&findings), Severity::Suspicious);
    }

    #[test]
    fn outcome_round_trips_through_json() {
        let outcome = ScanOutcome {
            target: ScanTarget::File {
                name: "report.pdf".to_string(),
                size_bytes: 48_213,
            },
            total_steps: 6,
            findings: vec![
                Finding::new("report.pdf", 0.42),
                Finding::new("embedded.js", 0.88),
            ],
            overall_severity: Severity::Critical,
            duration_ms: 10_300,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            cancelled: false,
        };

        let json = serde_json::to_string(&outcome).unwrap();
        let back: ScanOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
        // Detection order survives the trip
        assert_eq!(back.findings[0].label, "report.pdf");
        assert_eq!(back.findings[1].label, "embedded.js");
    }

    #[test]
    fn outcome_rejects_entries_missing_timestamps() {
        // Both timestamps are required; a record missing either is treated
        // as corrupt rather than backfilled with a fabricated time.
        let outcome = ScanOutcome {
            target: ScanTarget::System,
            total_steps: 6,
            findings: Vec::new(),
            overall_severity: Severity::Safe,
            duration_ms: 100,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            cancelled: false,
        };
        let mut value = serde_json::to_value(&outcome).unwrap();
        value.as_object_mut().unwrap().remove("started_at");
        assert!(serde_json::from_value::<ScanOutcome>(value).is_err());
    }

    #[test]
    fn count_at_buckets_by_exact_severity() {
        let outcome = ScanOutcome {
            target: ScanTarget::System,
            total_steps: 6,
            findings: vec![
                Finding::new("a", 0.1),
                Finding::new("b", 0.1),
                Finding::new("c", 0.5),
            ],
            overall_severity: Severity::Suspicious,
            duration_ms: 100,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            cancelled: false,
        };
        assert_eq!(outcome.count_at(Severity::Safe), 2);
        assert_eq!(outcome.count_at(Severity::Suspicious), 1);
        assert_eq!(outcome.count_at(Severity::Critical), 0);
    }
}
