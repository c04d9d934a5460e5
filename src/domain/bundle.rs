//! Bundle domain types
//!
//! A bundle (skill) is a directory holding `SKILL.md`, optional `scripts/`,
//! `references/` and `assets/` directories, and lifecycle files.

use std::path::{Path, PathBuf};

use crate::error::{Result, SkillforkError, fs as fs_error};
use crate::metadata::{SkillDocument, parse_document};
use crate::storage::Storage;
use crate::validation::ValidationResult;

/// The primary document carrying the metadata header
pub const PRIMARY_DOCUMENT: &str = "SKILL.md";
/// Append-only record of customizations
pub const CUSTOMIZATION_LOG: &str = "CUSTOMIZATION_LOG.md";
/// Optional resource directories
pub const OPTIONAL_DIRS: [&str; 3] = ["scripts", "references", "assets"];

/// A bundle located on storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    root: PathBuf,
    dir_name: String,
}

impl Bundle {
    /// Bundle rooted at `root`, named after its final path component
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let dir_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { root, dir_name }
    }

    /// Resolve `path` (which may be `.` or relative) to a bundle with a real directory name
    pub fn locate<S: Storage + ?Sized>(storage: &S, path: &Path) -> Result<Self> {
        if !storage.is_dir(path) {
            return Err(fs_error::not_found(path));
        }
        let root = storage
            .canonicalize(path)
            .map_err(|e| fs_error::io_error("Failed to resolve", path, &e))?;
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the bundle directory, which the header `name` must equal
    pub fn dir_name(&self) -> &str {
        &self.dir_name
    }

    pub fn primary_document(&self) -> PathBuf {
        self.root.join(PRIMARY_DOCUMENT)
    }

    pub fn customization_log(&self) -> PathBuf {
        self.root.join(CUSTOMIZATION_LOG)
    }

    /// Read and parse `SKILL.md`
    pub fn load_document<S: Storage + ?Sized>(&self, storage: &S) -> Result<SkillDocument> {
        let path = self.primary_document();
        let content = storage
            .read_to_string(&path)
            .map_err(|e| fs_error::read_failed(&path, &e))?;
        Ok(parse_document(&content)?)
    }

    /// Write `SKILL.md` back atomically
    pub fn save_document<S: Storage + ?Sized>(
        &self,
        storage: &S,
        document: &SkillDocument,
    ) -> Result<()> {
        let path = self.primary_document();
        storage
            .write_atomic(&path, document.render().as_bytes())
            .map_err(|e| fs_error::write_failed(&path, &e))
    }
}

/// Check that `name` is a slug: lowercase alphanumerics and hyphens, no leading, trailing
/// or doubled hyphen, at most `max_len` characters
///
/// Returns the reason on failure.
pub fn check_slug(name: &str, max_len: usize) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("name is empty".to_string());
    }
    let len = name.chars().count();
    if len > max_len {
        return Err(format!("name is {len} characters, maximum is {max_len}"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(format!(
            "contains '{c}'; only lowercase letters, digits and hyphens are allowed"
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err("must not start or end with a hyphen".to_string());
    }
    if name.contains("--") {
        return Err("must not contain consecutive hyphens".to_string());
    }
    Ok(())
}

/// Validate a name for a new bundle
pub fn require_slug(name: &str, max_len: usize) -> Result<()> {
    check_slug(name, max_len).map_err(|reason| SkillforkError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

/// Packaging lifecycle of a bundle
///
/// Never stored: it is recomputed from the latest validation run, so any edit puts the
/// bundle back in `Draft` until validated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleState {
    Draft,
    Validated,
    Invalid,
    Packaged,
}

impl BundleState {
    /// State after a validation run
    pub fn after_validation(result: &ValidationResult) -> Self {
        if result.is_packageable() {
            BundleState::Validated
        } else {
            BundleState::Invalid
        }
    }

    /// State after producing an artifact; only a validated bundle can be packaged
    pub fn after_packaging(self) -> Option<Self> {
        match self {
            BundleState::Validated => Some(BundleState::Packaged),
            _ => None,
        }
    }
}
