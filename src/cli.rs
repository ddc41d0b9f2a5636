use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::classifier::StubClassifier;
use crate::clock::ThreadClock;
use crate::history::{HistorySink, JsonHistory};
use crate::notify::{ConsoleNotifier, Notifier};
use crate::output;
use crate::progress;
use crate::random::{RandomSource, XorShiftRandom};
use crate::report::ScanTarget;
use crate::session::{ScanSession, SessionConfig};

#[derive(Parser)]
#[command(name = "cyberguard")]
#[command(version)]
#[command(about = "AI-powered scanner demo: scan files or your system for threats")]
#[command(long_about = "CyberGuard is the scan engine behind the CyberGuard demo: it runs \
    file or full-system scans, classifies discovered artifacts, and keeps a scan history.\n\n\
    Examples:\n  \
    cyberguard scan --system                 # Full-system scan\n  \
    cyberguard scan --file report.pdf        # Scan one file\n  \
    cyberguard scan --system --seed 7 --json # Deterministic run for scripting\n  \
    cyberguard history list                  # Show past scans")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Suppress all output except errors
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a scan and record the outcome
    #[command(visible_alias = "s")]
    Scan {
        /// File to scan
        #[arg(long, value_name = "PATH", conflicts_with = "system")]
        file: Option<PathBuf>,

        /// Run a full-system scan (the default when no file is given)
        #[arg(long)]
        system: bool,

        /// Nominal scan duration in milliseconds [default: sum of step durations]
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,

        /// Tick interval in milliseconds
        #[arg(long, default_value = "200", value_name = "MS")]
        interval_ms: u64,

        /// Per-tick chance of running a classification, in [0,1]
        #[arg(long, default_value = "0.1", value_name = "CHANCE")]
        discovery_chance: f64,

        /// Classifier timeout in milliseconds
        #[arg(long, default_value = "2000", value_name = "MS")]
        timeout_ms: u64,

        /// Seed the random source for a deterministic run
        #[arg(long, value_name = "SEED")]
        seed: Option<u64>,

        /// Output the final result as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show or manage the scan history
    #[command(visible_alias = "h")]
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List past scan outcomes, newest first
    #[command(visible_alias = "ls")]
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Delete all stored scan outcomes
    Clear {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Scan {
                file,
                system: _, // implied whenever no file is given
                duration_ms,
                interval_ms,
                discovery_chance,
                timeout_ms,
                seed,
                json,
            } => run_scan(
                file,
                duration_ms,
                interval_ms,
                discovery_chance,
                timeout_ms,
                seed,
                json,
                self.quiet,
            ),
            Commands::History { command } => match command {
                HistoryCommands::List { json } => run_history_list(json),
                HistoryCommands::Clear { yes } => run_history_clear(yes),
            },
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_scan(
    file: Option<PathBuf>,
    duration_ms: Option<u64>,
    interval_ms: u64,
    discovery_chance: f64,
    timeout_ms: u64,
    seed: Option<u64>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let target = match file {
        Some(path) => {
            let metadata = std::fs::metadata(&path)
                .with_context(|| format!("Cannot read file to scan: {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            ScanTarget::File {
                name,
                size_bytes: metadata.len(),
            }
        }
        None => ScanTarget::System,
    };

    let mut config = SessionConfig::new(target);
    if let Some(ms) = duration_ms {
        config.total_duration_ms = ms;
    }
    config.tick_interval_ms = interval_ms;
    config.discovery_chance = discovery_chance;
    config.classifier_timeout = Duration::from_millis(timeout_ms);

    let random: Arc<dyn RandomSource> = match seed {
        Some(seed) => Arc::new(XorShiftRandom::seeded(seed)),
        None => Arc::new(XorShiftRandom::from_entropy()),
    };
    let classifier = Arc::new(StubClassifier::new(Arc::clone(&random)));
    let sink = Arc::new(JsonHistory::open_default()?);
    // JSON mode keeps stdout machine-readable
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier::new(quiet || json));

    let session = ScanSession::new(
        config,
        Arc::new(ThreadClock),
        classifier,
        sink,
        notifier,
        random,
    )?;

    session.start();

    let bar = if quiet || json {
        None
    } else {
        Some(progress::create_scan_bar())
    };

    loop {
        if let Some(ref bar) = bar {
            bar.set_position(session.progress_percent() as u64);
            if let Some(name) = session.current_step_name() {
                bar.set_message(name);
            }
        }
        if session.status().is_terminal() {
            break;
        }
        thread::sleep(Duration::from_millis(50));
    }

    if let Some(ref bar) = bar {
        progress::finish_and_clear(bar);
    }

    let outcome = session
        .last_outcome()
        .context("Scan ended without producing an outcome")?;
    if json {
        output::print_outcome_json(&outcome)?;
    } else if !quiet {
        output::print_outcome(&outcome);
    }
    Ok(())
}

fn run_history_list(json: bool) -> Result<()> {
    let sink = JsonHistory::open_default()?;
    let entries = sink.list()?;
    if json {
        output::print_history_json(&entries)?;
    } else {
        output::print_history(&entries);
    }
    Ok(())
}

fn run_history_clear(yes: bool) -> Result<()> {
    let sink = JsonHistory::open_default()?;
    let entries = sink.list()?;
    if entries.is_empty() {
        println!("Scan history is already empty.");
        return Ok(());
    }

    if !yes {
        print!("Delete {} stored scan(s)? [y/N] ", entries.len());
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    sink.clear()?;
    println!("Deleted {} stored scan(s).", entries.len());
    Ok(())
}
