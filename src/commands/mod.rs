//! Command implementations for the skillfork CLI

pub mod completions;
pub mod fork;
pub mod package;
pub mod record;
pub mod validate;
pub mod version;

use console::Style;
use skillfork::validation::{Finding, Severity};

/// Print findings, one per line, colored by severity
pub fn print_findings(findings: &[Finding], to_stderr: bool) {
    for finding in findings {
        let style = match finding.severity {
            Severity::Error => Style::new().red().bold(),
            Severity::Warning => Style::new().yellow(),
        };
        let line = format!(
            "  {}[{}] {}: {}",
            style.apply_to(&finding.severity),
            finding.kind,
            Style::new().dim().apply_to(&finding.location),
            finding.message
        );
        if to_stderr {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
}
