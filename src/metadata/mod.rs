//! Skill metadata: the `---` delimited header at the top of `SKILL.md`
//!
//! The header is kept as an ordered list of `key: value` pairs so that rewriting it
//! (on fork or when recording a customization) preserves the author's key order and any
//! keys this crate does not interpret.

mod parser;
pub mod version;

pub use parser::{HEADER_MARKER, parse_document};
pub use version::Version;

/// Header key holding the skill slug
pub const KEY_NAME: &str = "name";
/// Header key holding the skill description
pub const KEY_DESCRIPTION: &str = "description";
/// Name of the skill this one was forked from
pub const KEY_CUSTOMIZED_FROM: &str = "customized-from";
/// Version of the source skill at fork time
pub const KEY_BASE_SKILL_VERSION: &str = "base-skill-version";
/// Current customization version of a forked skill
pub const KEY_CUSTOMIZATION_VERSION: &str = "customization-version";
/// Date the fork was last synchronised with its source
pub const KEY_LAST_SYNC_DATE: &str = "last-sync-date";
/// Free-form version some source skills declare
pub const KEY_VERSION: &str = "version";

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    key: String,
    value: String,
}

/// Ordered key/value mapping parsed from a metadata header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    entries: Vec<HeaderEntry>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Set `key` to `value`, keeping its position if it already exists
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = value,
            None => self.entries.push(HeaderEntry {
                key: key.to_string(),
                value,
            }),
        }
    }

    /// Iterate entries in source order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.key.as_str(), e.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.get(KEY_NAME)
    }

    pub fn description(&self) -> Option<&str> {
        self.get(KEY_DESCRIPTION)
    }

    /// Typed view over the lineage keys
    pub fn lineage(&self) -> Lineage {
        let owned = |key: &str| self.get(key).map(str::to_string);
        Lineage {
            customized_from: owned(KEY_CUSTOMIZED_FROM),
            base_skill_version: owned(KEY_BASE_SKILL_VERSION),
            customization_version: owned(KEY_CUSTOMIZATION_VERSION),
            last_sync_date: owned(KEY_LAST_SYNC_DATE),
        }
    }

    /// Render the header block including both markers
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(HEADER_MARKER);
        out.push('\n');
        for entry in &self.entries {
            if entry.value.is_empty() {
                out.push_str(&format!("{}:\n", entry.key));
            } else {
                out.push_str(&format!("{}: {}\n", entry.key, entry.value));
            }
        }
        out.push_str(HEADER_MARKER);
        out.push('\n');
        out
    }
}

/// Fork ancestry recorded in the header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lineage {
    pub customized_from: Option<String>,
    pub base_skill_version: Option<String>,
    pub customization_version: Option<String>,
    pub last_sync_date: Option<String>,
}

impl Lineage {
    /// Whether the skill was produced by a fork
    pub fn is_fork(&self) -> bool {
        self.customized_from.is_some()
    }
}

/// A parsed `SKILL.md`: header plus untouched body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillDocument {
    pub header: Header,
    pub body: String,
}

impl SkillDocument {
    /// Serialize back to document text
    pub fn render(&self) -> String {
        let mut out = self.header.render();
        out.push_str(&self.body);
        out
    }
}
