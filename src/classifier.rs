//! Threat classifier contract
//!
//! The detection model itself is an external collaborator; the engine only
//! consumes its contract: hand over an artifact reference, get back a
//! maliciousness confidence in [0, 1]. Calls may fail or time out, and the
//! session treats both as "no verdict for this artifact".

use crate::random::RandomSource;
use crate::report::ScanTarget;
use std::sync::Arc;
use thiserror::Error;

/// Result of one classification call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    /// Maliciousness confidence in [0, 1].
    pub confidence: f64,
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier timed out")]
    Timeout,
    #[error("classifier backend error: {0}")]
    Backend(String),
}

/// Asynchronous (from the session's perspective) threat classifier. The
/// call itself is blocking; the session dispatches it off the tick path.
pub trait ThreatClassifier: Send + Sync {
    fn classify(&self, target: &ScanTarget, artifact: &str) -> Result<Verdict, ClassifierError>;
}

/// Demo-mode classifier: draws the confidence from the injected random
/// source. This reproduces the product's marketing behavior where no real
/// model is attached.
pub struct StubClassifier {
    random: Arc<dyn RandomSource>,
}

impl StubClassifier {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }
}

impl ThreatClassifier for StubClassifier {
    fn classify(&self, _target: &ScanTarget, _artifact: &str) -> Result<Verdict, ClassifierError> {
        Ok(Verdict {
            confidence: self.random.next_f64(),
        })
    }
}

/// Classifier returning a constant confidence. Useful for tests and
/// demos that need a predictable verdict.
pub struct FixedClassifier {
    pub confidence: f64,
}

impl ThreatClassifier for FixedClassifier {
    fn classify(&self, _target: &ScanTarget, _artifact: &str) -> Result<Verdict, ClassifierError> {
        Ok(Verdict {
            confidence: self.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SequenceRandom;

    #[test]
    fn stub_classifier_reports_the_drawn_confidence() {
        let random = Arc::new(SequenceRandom::new(vec![0.42], 0.0));
        let classifier = StubClassifier::new(random);
        let verdict = classifier
            .classify(&ScanTarget::System, "file_a1b2c3.exe")
            .unwrap();
        assert_eq!(verdict.confidence, 0.42);
    }

    #[test]
    fn fixed_classifier_is_constant() {
        let classifier = FixedClassifier { confidence: 0.7 };
        for _ in 0..3 {
            let v = classifier.classify(&ScanTarget::System, "x").unwrap();
            assert_eq!(v.confidence, 0.7);
        }
    }
}
