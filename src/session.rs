//! Scan session state machine
//!
//! One session governs one scan: Idle -> Scanning (-> Paused -> Scanning)*
//! -> Completed | Cancelled, with progress driven by clock ticks and
//! findings produced by probabilistic classifier dispatch. The session owns
//! its tick subscription handle exclusively and releases it on pause,
//! cancel, and completion.
//!
//! State-machine misuse (start while scanning, pause while idle, ...) is a
//! silent no-op: rapid double-clicks in the product UI must never corrupt
//! an in-flight scan. The only rejections are construction-time programmer
//! errors.

use crate::classifier::{ClassifierError, ThreatClassifier, Verdict};
use crate::clock::{Clock, TickHandle};
use crate::history::HistorySink;
use crate::notify::Notifier;
use crate::random::{self, RandomSource};
use crate::report::{overall_severity, Finding, ScanOutcome, ScanTarget, Severity};
use crate::scan_events::ScanEvent;
use crate::steps::{progress_delta, step_index_for_progress, ScanStep};
use chrono::{DateTime, Utc};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Lifecycle status. Exactly one is active per session at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Idle,
    Scanning,
    Paused,
    Completed,
    Cancelled,
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Cancelled)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a scan needs at least one step")]
    NoSteps,
    #[error("step '{0}' has an invalid weight; weights must be finite and nonnegative")]
    InvalidWeight(String),
    #[error("scan duration must be positive")]
    InvalidDuration,
    #[error("discovery chance {0} is outside [0, 1]")]
    InvalidDiscoveryChance(f64),
}

/// Tunable inputs for one session. Tick interval and discovery chance
/// varied across product revisions, so both are configuration rather than
/// constants.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub target: ScanTarget,
    pub steps: Vec<ScanStep>,
    /// Nominal wall-clock length of a full scan.
    pub total_duration_ms: u64,
    pub tick_interval_ms: u64,
    /// Per-tick probability of dispatching one classification.
    pub discovery_chance: f64,
    pub classifier_timeout: Duration,
}

impl SessionConfig {
    pub fn new(target: ScanTarget) -> Self {
        let steps = Self::demo_steps();
        let total_duration_ms = steps.iter().map(|s| s.weight as u64).sum();
        Self {
            target,
            steps,
            total_duration_ms,
            tick_interval_ms: 200,
            discovery_chance: 0.10,
            classifier_timeout: Duration::from_secs(2),
        }
    }

    /// The product's stock scan phases; weights are the demo durations in
    /// milliseconds.
    pub fn demo_steps() -> Vec<ScanStep> {
        vec![
            ScanStep::new("Initializing scan engine", 1500.0),
            ScanStep::new("Analyzing system files", 2000.0),
            ScanStep::new("Scanning for vulnerabilities", 2200.0),
            ScanStep::new("Checking network connections", 1800.0),
            ScanStep::new("Examining application permissions", 1600.0),
            ScanStep::new("Finalizing scan results", 1200.0),
        ]
    }

    fn validate(&self) -> Result<(), SessionError> {
        if self.steps.is_empty() {
            return Err(SessionError::NoSteps);
        }
        for step in &self.steps {
            if !step.weight.is_finite() || step.weight < 0.0 {
                return Err(SessionError::InvalidWeight(step.name.clone()));
            }
        }
        if self.total_duration_ms == 0 {
            return Err(SessionError::InvalidDuration);
        }
        if !(0.0..=1.0).contains(&self.discovery_chance) {
            return Err(SessionError::InvalidDiscoveryChance(self.discovery_chance));
        }
        Ok(())
    }
}

/// Mutable per-session state, guarded by one mutex so ticks and classifier
/// resolutions are serialized.
struct SessionState {
    status: ScanStatus,
    progress_percent: f64,
    /// `None` before the first start.
    current_step: Option<usize>,
    findings: Vec<Finding>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    /// Outcome of the most recent terminal transition. Kept on the session
    /// so a sink failure never loses data.
    last_outcome: Option<ScanOutcome>,
    /// Bumped on every start; classifier resolutions from an older epoch
    /// are discarded.
    epoch: u64,
    tick_handle: Option<TickHandle>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            status: ScanStatus::Idle,
            progress_percent: 0.0,
            current_step: None,
            findings: Vec::new(),
            started_at: None,
            completed_at: None,
            last_outcome: None,
            epoch: 0,
            tick_handle: None,
        }
    }
}

/// The scan session engine. Cheap to clone (all shared state behind Arcs);
/// clones observe and drive the same scan.
#[derive(Clone)]
pub struct ScanSession {
    config: Arc<SessionConfig>,
    state: Arc<Mutex<SessionState>>,
    clock: Arc<dyn Clock>,
    classifier: Arc<dyn ThreatClassifier>,
    sink: Arc<dyn HistorySink>,
    notifier: Arc<dyn Notifier>,
    random: Arc<dyn RandomSource>,
}

impl ScanSession {
    pub fn new(
        config: SessionConfig,
        clock: Arc<dyn Clock>,
        classifier: Arc<dyn ThreatClassifier>,
        sink: Arc<dyn HistorySink>,
        notifier: Arc<dyn Notifier>,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(SessionState::new())),
            clock,
            classifier,
            sink,
            notifier,
            random,
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // --- public operations -------------------------------------------------

    /// Begin a scan. Valid from Idle or a terminal state; a no-op while
    /// Scanning or Paused so a double start cannot reset in-flight
    /// progress.
    pub fn start(&self) {
        let mut s = self.lock();
        if matches!(s.status, ScanStatus::Scanning | ScanStatus::Paused) {
            return;
        }

        s.epoch += 1;
        s.status = ScanStatus::Scanning;
        s.progress_percent = 0.0;
        s.current_step = Some(0);
        s.findings.clear();
        s.started_at = Some(Utc::now());
        s.completed_at = None;
        s.last_outcome = None;
        s.tick_handle = Some(self.subscribe_ticks(s.epoch));
        drop(s);

        self.notifier.notify(&ScanEvent::Started {
            target: self.config.target.clone(),
        });
    }

    /// Freeze progress. Valid only while Scanning; no-op otherwise.
    pub fn pause(&self) {
        let mut s = self.lock();
        if s.status != ScanStatus::Scanning {
            return;
        }
        s.status = ScanStatus::Paused;
        let handle = s.tick_handle.take();
        let progress = s.progress_percent;
        drop(s);
        drop(handle);

        self.notifier.notify(&ScanEvent::Paused {
            progress_percent: progress,
        });
    }

    /// Continue from the preserved progress point. Valid only while
    /// Paused; no-op otherwise.
    pub fn resume(&self) {
        let mut s = self.lock();
        if s.status != ScanStatus::Paused {
            return;
        }
        s.status = ScanStatus::Scanning;
        s.tick_handle = Some(self.subscribe_ticks(s.epoch));
        let progress = s.progress_percent;
        drop(s);

        self.notifier.notify(&ScanEvent::Resumed {
            progress_percent: progress,
        });
    }

    /// Stop the scan before completion. The partial outcome is reported to
    /// the notifier but never persisted; in-flight classifications are
    /// discarded when they resolve. Valid from Scanning or Paused.
    pub fn cancel(&self) {
        let mut s = self.lock();
        if !matches!(s.status, ScanStatus::Scanning | ScanStatus::Paused) {
            return;
        }
        let outcome = self.finalize(&mut s, true);
        let handle = s.tick_handle.take();
        drop(s);
        drop(handle);

        self.notifier.notify(&ScanEvent::Cancelled { outcome });
    }

    /// Return to Idle from any state, clearing all mutable fields.
    pub fn reset(&self) {
        let mut s = self.lock();
        let handle = s.tick_handle.take();
        let epoch = s.epoch;
        *s = SessionState::new();
        s.epoch = epoch; // keep stale classifier resolutions stale
        drop(s);
        drop(handle);
    }

    // --- accessors ----------------------------------------------------------

    pub fn status(&self) -> ScanStatus {
        self.lock().status
    }

    pub fn progress_percent(&self) -> f64 {
        self.lock().progress_percent
    }

    /// Index of the active step; `None` before the first start.
    pub fn current_step(&self) -> Option<usize> {
        self.lock().current_step
    }

    /// Name of the active step, for progress displays.
    pub fn current_step_name(&self) -> Option<String> {
        self.lock()
            .current_step
            .and_then(|i| self.config.steps.get(i))
            .map(|s| s.name.clone())
    }

    /// Findings accumulated so far, in detection order.
    pub fn findings(&self) -> Vec<Finding> {
        self.lock().findings.clone()
    }

    /// Outcome of the most recent completed or cancelled scan. Survives a
    /// sink failure, so the caller can retry persistence.
    pub fn last_outcome(&self) -> Option<ScanOutcome> {
        self.lock().last_outcome.clone()
    }

    pub fn target(&self) -> &ScanTarget {
        &self.config.target
    }

    pub fn steps(&self) -> &[ScanStep] {
        &self.config.steps
    }

    // --- tick driving --------------------------------------------------------

    fn subscribe_ticks(&self, epoch: u64) -> TickHandle {
        let session = self.clone();
        self.clock.subscribe(
            self.config.tick_interval_ms,
            Box::new(move |elapsed_ms| session.on_tick(epoch, elapsed_ms)),
        )
    }

    /// One tick of `elapsed_ms`. Serialized through the state mutex;
    /// ignored unless the session is Scanning in the given epoch.
    fn on_tick(&self, epoch: u64, elapsed_ms: u64) {
        let mut s = self.lock();
        if s.epoch != epoch || s.status != ScanStatus::Scanning {
            return;
        }

        let delta = progress_delta(elapsed_ms, self.config.total_duration_ms);
        s.progress_percent = (s.progress_percent + delta).min(100.0);
        s.current_step = Some(step_index_for_progress(
            &self.config.steps,
            s.progress_percent,
        ));

        if s.progress_percent >= 100.0 {
            // Finalize with only the findings resolved before this tick;
            // later resolutions are dropped by the status check.
            let outcome = self.finalize(&mut s, false);
            let handle = s.tick_handle.take();
            drop(s);
            drop(handle);
            self.report_completed(outcome);
            return;
        }
        drop(s);

        if self.random.next_f64() < self.config.discovery_chance {
            self.dispatch_classification(epoch);
        }
    }

    /// Terminal-transition bookkeeping. Caller holds the lock and decides
    /// whether this is a completion or a cancellation.
    fn finalize(&self, s: &mut SessionState, cancelled: bool) -> ScanOutcome {
        let now = Utc::now();
        s.status = if cancelled {
            ScanStatus::Cancelled
        } else {
            ScanStatus::Completed
        };
        s.completed_at = Some(now);

        let started_at = s.started_at.unwrap_or(now);
        let outcome = ScanOutcome {
            target: self.config.target.clone(),
            total_steps: self.config.steps.len(),
            findings: s.findings.clone(),
            overall_severity: overall_severity(&s.findings),
            duration_ms: (now - started_at).num_milliseconds().max(0) as u64,
            started_at,
            finished_at: now,
            cancelled,
        };
        s.last_outcome = Some(outcome.clone());
        outcome
    }

    fn report_completed(&self, outcome: ScanOutcome) {
        if let Err(e) = self.sink.append(&outcome) {
            self.notifier.notify(&ScanEvent::PersistFailed {
                error: format!("{e:#}"),
            });
        }
        self.notifier.notify(&ScanEvent::Completed { outcome });
    }

    // --- classification -------------------------------------------------------

    /// Fire-and-forget classification of one synthesized artifact. Never
    /// blocks tick delivery; the verdict is recorded when (and if) it
    /// resolves in time.
    fn dispatch_classification(&self, epoch: u64) {
        let label = self.synthesize_label();
        let session = self.clone();
        thread::spawn(move || {
            let verdict = session.classify_with_timeout(&label);
            session.record_verdict(epoch, &label, verdict);
        });
    }

    fn classify_with_timeout(&self, label: &str) -> Result<Verdict, ClassifierError> {
        let (tx, rx) = mpsc::channel();
        let classifier = Arc::clone(&self.classifier);
        let target = self.config.target.clone();
        let artifact = label.to_string();
        thread::spawn(move || {
            let _ = tx.send(classifier.classify(&target, &artifact));
        });
        match rx.recv_timeout(self.config.classifier_timeout) {
            Ok(result) => result,
            Err(_) => Err(ClassifierError::Timeout),
        }
    }

    /// Record one resolved classification. Findings order is resolution
    /// order. The verdict is dropped when the scan it belongs to is no
    /// longer accepting findings (terminal, reset, or restarted since
    /// dispatch). A failed call is reported as a warning, never as "Safe".
    fn record_verdict(
        &self,
        epoch: u64,
        label: &str,
        verdict: Result<Verdict, ClassifierError>,
    ) {
        let verdict = match verdict {
            Ok(v) => v,
            Err(e) => {
                self.notifier.notify(&ScanEvent::ClassifierFailed {
                    label: label.to_string(),
                    error: e.to_string(),
                });
                return;
            }
        };

        let finding = Finding::new(label, verdict.confidence);
        let mut s = self.lock();
        if s.epoch != epoch
            || !matches!(s.status, ScanStatus::Scanning | ScanStatus::Paused)
        {
            return;
        }
        s.findings.push(finding.clone());
        drop(s);

        if finding.severity == Severity::Critical {
            self.notifier.notify(&ScanEvent::ThreatDetected { finding });
        }
    }

    /// Artifact reference for one classification: the file's own name for
    /// file scans, a synthesized system path for full-system scans.
    fn synthesize_label(&self) -> String {
        match &self.config.target {
            ScanTarget::File { name, .. } => name.clone(),
            ScanTarget::System => {
                let dir = if self.random.next_f64() > 0.5 {
                    "program files"
                } else {
                    "users"
                };
                let ext = if self.random.next_f64() > 0.5 { "exe" } else { "dll" };
                format!(
                    "/system/{}/{}/file_{}.{}",
                    dir,
                    random::token(self.random.as_ref(), 6),
                    random::token(self.random.as_ref(), 6),
                    ext
                )
            }
        }
    }
}
