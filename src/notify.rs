//! Notifier contract and implementations
//!
//! The session surfaces user-visible messages exclusively through this
//! contract. `notify` is fire-and-forget and must never block the engine.

use crate::report::Severity;
use crate::scan_events::ScanEvent;
use colored::*;
use std::sync::Mutex;

/// Surface for user-visible messages on session state transitions.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &ScanEvent);
}

/// Console notifier in the CLI's idiom: warnings to stderr, detections
/// and transitions to stdout.
pub struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, event: &ScanEvent) {
        match event {
            ScanEvent::ClassifierFailed { label, error } => {
                // Errors always surface, even in quiet mode
                eprintln!("{} classification of {} failed: {}", "Warning:".yellow(), label, error);
            }
            ScanEvent::PersistFailed { error } => {
                eprintln!("{} could not save scan to history: {}", "Error:".red(), error);
            }
            _ if self.quiet => {}
            ScanEvent::Started { target } => {
                println!("{} {}", "Scanning:".cyan(), target.describe());
            }
            ScanEvent::Paused { progress_percent } => {
                println!("{} at {:.0}%", "Paused".yellow(), progress_percent);
            }
            ScanEvent::Resumed { progress_percent } => {
                println!("{} from {:.0}%", "Resumed".cyan(), progress_percent);
            }
            ScanEvent::ThreatDetected { finding } => {
                println!(
                    "{} {} (confidence {:.2})",
                    "Critical threat:".red().bold(),
                    finding.label,
                    finding.confidence
                );
            }
            ScanEvent::Completed { outcome } => {
                let headline = if outcome.overall_severity == Severity::Safe {
                    "Scan complete - no threats found".green().to_string()
                } else {
                    format!("Scan complete - {}", outcome.summary()).yellow().to_string()
                };
                println!("{headline}");
            }
            ScanEvent::Cancelled { outcome } => {
                println!(
                    "{} {} finding(s) before cancellation (not saved)",
                    "Scan cancelled:".yellow(),
                    outcome.findings.len()
                );
            }
        }
    }
}

/// Drops every event. For embedders that render state themselves.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &ScanEvent) {}
}

/// Records every event in memory. Used by tests and embedders that want
/// to replay the event stream.
#[derive(Default)]
pub struct MemoryNotifier {
    events: Mutex<Vec<ScanEvent>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ScanEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, event: &ScanEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
