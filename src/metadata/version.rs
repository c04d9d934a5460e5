//! Dotted numeric versions (`1.0`, `2.3.1`) used for customization tracking.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::SkillforkError;

/// A dotted numeric version
///
/// Missing trailing components compare as zero, so `1.0` and `1.0.0` are equal while
/// `1.10` is greater than `1.9`.
#[derive(Debug, Clone)]
pub struct Version {
    parts: Vec<u64>,
    raw: String,
}

impl Version {
    /// Version assigned to a freshly forked skill
    pub fn initial() -> Self {
        Self {
            parts: vec![1, 0],
            raw: "1.0".to_string(),
        }
    }

    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Version {
    type Err = SkillforkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SkillforkError::InvalidVersion {
            version: s.to_string(),
            reason: reason.to_string(),
        };

        let raw = s.trim();
        if raw.is_empty() {
            return Err(invalid("version is empty"));
        }

        let parts = raw
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid("each component must be a non-negative integer"));
                }
                part.parse::<u64>()
                    .map_err(|_| invalid("component is too large"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            parts,
            raw: raw.to_string(),
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
