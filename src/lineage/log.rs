//! `CUSTOMIZATION_LOG.md`: provenance header plus append-only version entries
//!
//! ```text
//! # Customization Log: finance-pdf
//!
//! ## Base Skill
//! - **Source**: pdf
//! - **Base version**: 2.0
//! - **Forked on**: 2025-10-21 14:30:05
//!
//! ## Customization History
//!
//! ### Version 1.1 - 2025-10-22 09:12:44
//! - Use fiscal quarters in summaries
//! - **Verification**: checked against Q3 report
//! ```
//!
//! Entries are only ever appended as text; existing bytes are never rewritten.

use chrono::NaiveDateTime;

use crate::metadata::Version;

/// Timestamp format used in entry headings and the fork header
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ENTRY_PREFIX: &str = "### Version ";
const VERIFICATION_PREFIX: &str = "- **Verification**:";

/// One parsed entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// 1-based line of the entry heading
    pub line: usize,
    pub version: Version,
    pub timestamp: NaiveDateTime,
    pub description: String,
    pub verification: Option<String>,
}

/// Entry heading that could not be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEntry {
    pub line: usize,
    pub heading: String,
    pub reason: String,
}

/// Adjacent pair of entries that break append-only ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingViolation {
    /// Line of the later entry
    pub line: usize,
    pub message: String,
}

/// Parsed customization log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomizationLog {
    pub entries: Vec<LogEntry>,
    pub malformed: Vec<MalformedEntry>,
}

impl CustomizationLog {
    /// Parse log text. Never fails: unreadable headings are collected in `malformed`.
    pub fn parse(content: &str) -> Self {
        let mut log = Self::default();
        let mut current: Option<LogEntry> = None;
        let mut description: Vec<String> = Vec::new();

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim_end();

            if line.starts_with('#') {
                log.finish_entry(current.take(), &mut description);
                if let Some(rest) = line.strip_prefix(ENTRY_PREFIX) {
                    match parse_heading(rest) {
                        Ok((version, timestamp)) => {
                            current = Some(LogEntry {
                                line: line_no,
                                version,
                                timestamp,
                                description: String::new(),
                                verification: None,
                            });
                        }
                        Err(reason) => log.malformed.push(MalformedEntry {
                            line: line_no,
                            heading: line.to_string(),
                            reason,
                        }),
                    }
                }
                continue;
            }

            let Some(entry) = current.as_mut() else {
                continue;
            };
            if let Some(note) = line.strip_prefix(VERIFICATION_PREFIX) {
                entry.verification = Some(note.trim().to_string());
            } else if let (Some(note), true) = (
                entry.verification.as_mut(),
                raw.starts_with(char::is_whitespace) && !line.trim().is_empty(),
            ) {
                note.push('\n');
                note.push_str(line.trim());
            } else if let Some(item) = line.strip_prefix("- ") {
                description.push(item.trim().to_string());
            } else if !line.trim().is_empty() {
                description.push(line.trim().to_string());
            }
        }
        log.finish_entry(current.take(), &mut description);
        log
    }

    fn finish_entry(&mut self, entry: Option<LogEntry>, lines: &mut Vec<String>) {
        if let Some(mut entry) = entry {
            entry.description = lines.join("\n");
            self.entries.push(entry);
        }
        lines.clear();
    }

    /// Version of the most recent entry
    pub fn last_version(&self) -> Option<&Version> {
        self.entries.last().map(|e| &e.version)
    }

    /// Entries whose timestamp or version goes backwards relative to the previous entry
    pub fn ordering_violations(&self) -> Vec<OrderingViolation> {
        self.entries
            .windows(2)
            .filter_map(|pair| {
                let (prev, next) = (&pair[0], &pair[1]);
                if next.timestamp < prev.timestamp {
                    Some(OrderingViolation {
                        line: next.line,
                        message: format!(
                            "entry {} dated {} precedes earlier entry {} dated {}",
                            next.version,
                            next.timestamp.format(TIMESTAMP_FORMAT),
                            prev.version,
                            prev.timestamp.format(TIMESTAMP_FORMAT)
                        ),
                    })
                } else if next.version < prev.version {
                    Some(OrderingViolation {
                        line: next.line,
                        message: format!(
                            "version {} follows higher version {}",
                            next.version, prev.version
                        ),
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}

fn parse_heading(rest: &str) -> Result<(Version, NaiveDateTime), String> {
    let (version, timestamp) = rest
        .split_once(" - ")
        .ok_or_else(|| "expected '### Version <version> - <timestamp>'".to_string())?;
    let version: Version = version
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a dotted numeric version", version.trim()))?;
    let timestamp = NaiveDateTime::parse_from_str(timestamp.trim(), TIMESTAMP_FORMAT)
        .map_err(|_| format!("'{}' is not a YYYY-MM-DD HH:MM:SS timestamp", timestamp.trim()))?;
    Ok((version, timestamp))
}

/// Log written by a fork: provenance only, no entries
pub fn render_new_log(
    name: &str,
    source: &str,
    base_version: &str,
    forked_at: NaiveDateTime,
) -> String {
    format!(
        "# Customization Log: {name}\n\
         \n\
         ## Base Skill\n\
         - **Source**: {source}\n\
         - **Base version**: {base_version}\n\
         - **Forked on**: {}\n\
         \n\
         ## Customization History\n",
        forked_at.format(TIMESTAMP_FORMAT)
    )
}

/// Log started by the first recorded customization of a skill that was never forked
pub fn render_empty_log(name: &str) -> String {
    format!("# Customization Log: {name}\n\n## Customization History\n")
}

/// Text of one entry, ready to append
pub fn render_entry(
    version: &Version,
    timestamp: NaiveDateTime,
    description: &str,
    verification: Option<&str>,
) -> String {
    let mut out = format!(
        "\n{ENTRY_PREFIX}{version} - {}\n",
        timestamp.format(TIMESTAMP_FORMAT)
    );
    for line in description.lines().filter(|l| !l.trim().is_empty()) {
        out.push_str(&format!("- {}\n", line.trim()));
    }
    if let Some(note) = verification {
        // continuation lines are indented so none of them can open a heading
        let mut lines = note.lines().map(str::trim).filter(|l| !l.is_empty());
        out.push_str(&format!(
            "{VERIFICATION_PREFIX} {}\n",
            lines.next().unwrap_or_default()
        ));
        for line in lines {
            out.push_str(&format!("  {line}\n"));
        }
    }
    out
}

/// `existing` followed by `entry`, with the existing bytes left untouched
pub fn append_entry(existing: &str, entry: &str) -> String {
    let mut out = String::with_capacity(existing.len() + entry.len() + 1);
    out.push_str(existing);
    if !existing.is_empty() && !existing.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(entry);
    out
}
