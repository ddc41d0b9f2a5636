//! Progress/step scheduling
//!
//! Pure functions mapping elapsed time to progress and progress to the
//! current step, kept free of timers so they are independently testable.
//! The step index is always re-derived from progress rather than
//! incremented, so pause/resume cannot desynchronize it.

use serde::{Deserialize, Serialize};

/// One ordered unit of work within a scan. `weight` is a relative
/// duration; the weights of all steps together normalize progress to
/// [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanStep {
    pub name: String,
    pub weight: f64,
}

impl ScanStep {
    pub fn new(name: &str, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            weight,
        }
    }
}

/// Index of the step active at the given progress: the first step whose
/// cumulative weight fraction reaches `progress_percent / 100`.
pub fn step_index_for_progress(steps: &[ScanStep], progress_percent: f64) -> usize {
    if steps.is_empty() {
        return 0;
    }
    let total: f64 = steps.iter().map(|s| s.weight).sum();
    if total <= 0.0 {
        return 0;
    }

    let fraction = (progress_percent / 100.0).clamp(0.0, 1.0);
    let mut cumulative = 0.0;
    for (i, step) in steps.iter().enumerate() {
        cumulative += step.weight / total;
        if cumulative >= fraction {
            return i;
        }
    }
    // Floating-point sum can land just under 1.0 at full progress.
    steps.len() - 1
}

/// Progress gained by `elapsed_ms` of scanning against a nominal total
/// duration, in percent. The caller clamps the running total.
pub fn progress_delta(elapsed_ms: u64, total_duration_ms: u64) -> f64 {
    if total_duration_ms == 0 {
        return 100.0;
    }
    (elapsed_ms as f64 / total_duration_ms as f64) * 100.0
}
