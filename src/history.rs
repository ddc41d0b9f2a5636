//! Scan history persistence
//!
//! Completed scan outcomes are appended here for the history dashboard.
//! The sink contract is deliberately small (append/list/clear) so the
//! backing store is swappable: JSON files on disk for the CLI, in-memory
//! for tests and embedders. Cancelled outcomes are never appended.

use crate::report::ScanOutcome;
use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persistence surface for terminated scans. Append is eventually
/// durable; the engine assumes no stronger guarantee.
pub trait HistorySink: Send + Sync {
    fn append(&self, outcome: &ScanOutcome) -> Result<()>;
    /// All stored outcomes, newest first.
    fn list(&self) -> Result<Vec<ScanOutcome>>;
    fn clear(&self) -> Result<()>;
}

/// File-backed sink: one pretty-printed JSON file per outcome in a
/// history directory.
pub struct JsonHistory {
    dir: PathBuf,
}

impl JsonHistory {
    /// Open (creating if needed) a history directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create history directory: {}", dir.display()))?;
        }
        Ok(Self { dir })
    }

    /// Open the per-user default history directory
    /// (e.g. `~/.local/share/cyberguard/history` on Linux).
    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "cyberguard")
            .context("Could not determine a data directory for scan history")?;
        Self::open(dirs.data_dir().join("history"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read history directory: {}", self.dir.display()))?;
        Ok(entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|ext| ext == "json").unwrap_or(false))
            .collect())
    }
}

impl HistorySink for JsonHistory {
    fn append(&self, outcome: &ScanOutcome) -> Result<()> {
        // Timestamped filename; millisecond suffix avoids collisions
        let filename = format!(
            "scan_{}.json",
            outcome.finished_at.format("%Y%m%d_%H%M%S_%3f")
        );
        let path = self.dir.join(filename);

        let json = serde_json::to_string_pretty(outcome)
            .context("Failed to serialize scan outcome")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write scan outcome to {}", path.display()))?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<ScanOutcome>> {
        let mut outcomes = Vec::new();
        for path in self.entry_paths()? {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read history entry: {}", path.display()))?;
            match serde_json::from_str::<ScanOutcome>(&content) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    // Skip corrupt entries instead of hiding the whole history
                    eprintln!(
                        "{} skipping unreadable history entry {}: {}",
                        "Warning:".yellow(),
                        path.display(),
                        e
                    );
                }
            }
        }
        outcomes.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
        Ok(outcomes)
    }

    fn clear(&self) -> Result<()> {
        for path in self.entry_paths()? {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete history entry: {}", path.display()))?;
        }
        Ok(())
    }
}

/// In-memory sink for tests and embedders without persistence.
#[derive(Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<ScanOutcome>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HistorySink for MemoryHistory {
    fn append(&self, outcome: &ScanOutcome) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(outcome.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<ScanOutcome>> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        entries.reverse(); // newest first
        Ok(entries)
    }

    fn clear(&self) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Finding, ScanTarget, Severity};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn sample_outcome(label: &str, minutes_ago: i64) -> ScanOutcome {
        let finished = Utc::now() - Duration::minutes(minutes_ago);
        ScanOutcome {
            target: ScanTarget::File {
                name: label.to_string(),
                size_bytes: 1024,
            },
            total_steps: 6,
            findings: vec![Finding::new(label, 0.5)],
            overall_severity: Severity::Suspicious,
            duration_ms: 10_300,
            started_at: finished - Duration::seconds(10),
            finished_at: finished,
            cancelled: false,
        }
    }

    #[test]
    fn append_then_list_round_trips() {
        let tmp = TempDir::new().unwrap();
        let sink = JsonHistory::open(tmp.path()).unwrap();

        let outcome = sample_outcome("invoice.pdf", 0);
        sink.append(&outcome).unwrap();

        let listed = sink.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], outcome);
        assert_eq!(listed[0].findings[0].label, "invoice.pdf");
    }

    #[test]
    fn list_is_newest_first() {
        let tmp = TempDir::new().unwrap();
        let sink = JsonHistory::open(tmp.path()).unwrap();

        sink.append(&sample_outcome("old.exe", 60)).unwrap();
        sink.append(&sample_outcome("new.exe", 1)).unwrap();

        let listed = sink.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].target.label(), "new.exe");
        assert_eq!(listed[1].target.label(), "old.exe");
    }

    #[test]
    fn clear_removes_all_entries() {
        let tmp = TempDir::new().unwrap();
        let sink = JsonHistory::open(tmp.path()).unwrap();

        sink.append(&sample_outcome("a", 2)).unwrap();
        sink.append(&sample_outcome("b", 1)).unwrap();
        sink.clear().unwrap();

        assert!(sink.list().unwrap().is_empty());
    }

    #[test]
    fn corrupt_entries_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let sink = JsonHistory::open(tmp.path()).unwrap();

        sink.append(&sample_outcome("good.exe", 1)).unwrap();
        std::fs::write(tmp.path().join("scan_bogus.json"), "not json").unwrap();

        let listed = sink.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].target.label(), "good.exe");
    }

    #[test]
    fn memory_history_orders_newest_first() {
        let sink = MemoryHistory::new();
        sink.append(&sample_outcome("first", 2)).unwrap();
        sink.append(&sample_outcome("second", 1)).unwrap();

        let listed = sink.list().unwrap();
        assert_eq!(listed[0].target.label(), "second");
        assert_eq!(sink.len(), 2);

        sink.clear().unwrap();
        assert!(sink.is_empty());
    }
}
