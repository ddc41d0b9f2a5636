//! CyberGuard scan session engine
//!
//! This crate provides both a CLI binary and a library API: the scan
//! lifecycle state machine behind the CyberGuard scanner demo, with
//! swappable classifier, history, and notification collaborators.

pub mod classifier;
pub mod cli;
pub mod clock;
pub mod history;
pub mod notify;
pub mod output;
pub mod progress;
pub mod random;
pub mod report;
pub mod scan_events;
pub mod session;
pub mod steps;
