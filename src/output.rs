//! Human and JSON rendering of scan outcomes

use crate::report::{ScanOutcome, Severity};
use anyhow::Result;
use colored::*;

fn severity_colored(severity: Severity) -> ColoredString {
    match severity {
        Severity::Safe => "Safe".green(),
        Severity::Suspicious => "Suspicious".yellow(),
        Severity::Critical => "Critical".red().bold(),
    }
}

/// Print the result summary of one finished scan.
pub fn print_outcome(outcome: &ScanOutcome) {
    println!();
    println!("{}", "CyberGuard Scan Results".cyan().bold());
    println!("{}", "=".repeat(60));
    println!("{:<14} {}", "Target:".cyan(), outcome.target.describe());
    println!("{:<14} {} ms", "Duration:".cyan(), outcome.duration_ms);
    println!(
        "{:<14} {}",
        "Verdict:".cyan(),
        severity_colored(outcome.overall_severity)
    );
    println!(
        "{:<14} {} safe / {} suspicious / {} critical",
        "Findings:".cyan(),
        outcome.count_at(Severity::Safe),
        outcome.count_at(Severity::Suspicious),
        outcome.count_at(Severity::Critical),
    );

    if !outcome.findings.is_empty() {
        println!("{}", "-".repeat(60));
        for finding in &outcome.findings {
            println!(
                "  {:<12} {:.2}  {}",
                severity_colored(finding.severity),
                finding.confidence,
                finding.label
            );
        }
    }
    println!();
}

/// Print one finished scan as JSON for scripting.
pub fn print_outcome_json(outcome: &ScanOutcome) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}

/// Print the scan history table, newest first.
pub fn print_history(entries: &[ScanOutcome]) {
    if entries.is_empty() {
        println!("No scans recorded yet. Run {} first.", "cyberguard scan".cyan());
        return;
    }

    println!();
    println!("{}", "Scan History".cyan().bold());
    println!("{}", "=".repeat(72));
    println!(
        "{:<20} {:<28} {:>8} {:>12}",
        "Date".cyan(),
        "Target".cyan(),
        "Findings".cyan(),
        "Verdict".cyan()
    );
    println!("{}", "-".repeat(72));

    for entry in entries {
        println!(
            "{:<20} {:<28} {:>8} {:>12}",
            entry.finished_at.format("%Y-%m-%d %H:%M:%S"),
            truncate(&entry.target.label(), 28),
            entry.findings.len(),
            severity_colored(entry.overall_severity)
        );
    }
    println!();
}

/// Print the scan history as JSON for scripting.
pub fn print_history_json(entries: &[ScanOutcome]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(entries)?);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_strings_alone() {
        assert_eq!(truncate("short.exe", 28), "short.exe");
    }

    #[test]
    fn truncate_clips_long_strings_with_ellipsis() {
        let long = "a".repeat(40);
        let t = truncate(&long, 28);
        assert_eq!(t.chars().count(), 28);
        assert!(t.ends_with("..."));
    }
}
