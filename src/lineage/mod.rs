//! Fork ancestry and customization history
//!
//! [`LineageTracker::fork`] derives a new skill from an existing one and
//! [`LineageTracker::record_customization`] appends to its history. Both run under the
//! bundle lock and inside a [`Transaction`], so a failure leaves no partial result.

pub mod log;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::Config;
use crate::domain::{Bundle, PRIMARY_DOCUMENT, bundle::require_slug};
use crate::error::{Result, SkillforkError, fs as fs_error};
use crate::metadata::{
    KEY_BASE_SKILL_VERSION, KEY_CUSTOMIZATION_VERSION, KEY_CUSTOMIZED_FROM, KEY_LAST_SYNC_DATE,
    KEY_NAME, KEY_VERSION, SkillDocument, Version, parse_document,
};
use crate::storage::{BundleLock, Storage};
use crate::transaction::Transaction;

use self::log::CustomizationLog;

/// Result of a successful fork
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkOutcome {
    /// Directory of the new skill
    pub destination: PathBuf,
    /// `name` of the source skill
    pub source_name: String,
    /// Value written to `base-skill-version`
    pub base_version: String,
}

/// Result of a recorded customization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub previous: Option<Version>,
    pub version: Version,
    pub log_path: PathBuf,
}

/// Creates forks and records customizations
pub struct LineageTracker<'a, S: Storage + ?Sized, C: Clock + ?Sized> {
    storage: &'a S,
    clock: &'a C,
    config: &'a Config,
}

impl<'a, S: Storage + ?Sized, C: Clock + ?Sized> LineageTracker<'a, S, C> {
    pub fn new(storage: &'a S, clock: &'a C, config: &'a Config) -> Self {
        Self {
            storage,
            clock,
            config,
        }
    }

    /// Copy the skill at `source` to `dest_dir/new_name` and rewrite its lineage
    ///
    /// # Errors
    ///
    /// - [`SkillforkError::InvalidName`] if `new_name` is not a slug
    /// - [`SkillforkError::SourceNotFound`] if `source` has no parsable `SKILL.md`
    /// - [`SkillforkError::DestinationExists`] if the target directory exists
    /// - [`SkillforkError::DestinationInsideSource`] if `dest_dir` is inside `source`
    /// - File system errors, after removing everything created so far
    pub fn fork(&self, source: &Path, new_name: &str, dest_dir: &Path) -> Result<ForkOutcome> {
        require_slug(new_name, self.config.validation.max_name_length)?;

        let (source_bundle, source_doc) = self.load_source(source)?;
        let source_name = match source_doc.header.name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                warn!(
                    source = %source.display(),
                    "source skill has no name, using its directory name"
                );
                source_bundle.dir_name().to_string()
            }
        };

        let target = dest_dir.join(new_name);
        if self.storage.exists(&target) {
            return Err(SkillforkError::DestinationExists {
                path: target.display().to_string(),
            });
        }

        let mut transaction = Transaction::new(self.storage);
        if !self.storage.is_dir(dest_dir) {
            self.storage
                .create_dir_all(dest_dir)
                .map_err(|e| fs_error::io_error("Failed to create directory", dest_dir, &e))?;
            transaction.track_dir_created(dest_dir);
        }

        let resolved_dest = self
            .storage
            .canonicalize(dest_dir)
            .map_err(|e| fs_error::io_error("Failed to resolve", dest_dir, &e))?;
        if resolved_dest.starts_with(source_bundle.root()) {
            return Err(SkillforkError::DestinationInsideSource {
                path: dest_dir.display().to_string(),
            });
        }

        let _lock = self.lock(&resolved_dest.join(new_name))?;
        // another process may have forked to the same name while we waited
        if self.storage.exists(&target) {
            return Err(SkillforkError::DestinationExists {
                path: target.display().to_string(),
            });
        }

        let staging = dest_dir.join(format!(".{new_name}.fork-{}", std::process::id()));
        if self.storage.exists(&staging) {
            self.storage
                .remove_dir_all(&staging)
                .map_err(|e| fs_error::io_error("Failed to remove stale staging", &staging, &e))?;
        }
        transaction.track_tree_created(&staging);

        debug!(
            source = %source_bundle.root().display(),
            staging = %staging.display(),
            "copying skill tree"
        );
        self.storage
            .copy_tree(source_bundle.root(), &staging)
            .map_err(|e| fs_error::io_error("Failed to copy skill", source, &e))?;

        let now = self.clock.now();
        let base_version = source_doc
            .header
            .get(KEY_CUSTOMIZATION_VERSION)
            .or_else(|| source_doc.header.get(KEY_VERSION))
            .filter(|v| !v.is_empty())
            .unwrap_or(self.config.lineage.base_version_sentinel.as_str())
            .to_string();

        let mut document = source_doc;
        document.header.set(KEY_NAME, new_name);
        document.header.set(KEY_CUSTOMIZED_FROM, source_name.as_str());
        document
            .header
            .set(KEY_CUSTOMIZATION_VERSION, Version::initial().to_string());
        document
            .header
            .set(KEY_BASE_SKILL_VERSION, base_version.as_str());
        document
            .header
            .set(KEY_LAST_SYNC_DATE, now.format("%Y-%m-%d").to_string());

        let staged = Bundle::new(&staging);
        staged.save_document(self.storage, &document)?;

        let log_path = staged.customization_log();
        let log = log::render_new_log(new_name, &source_name, &base_version, now);
        self.storage
            .write_atomic(&log_path, log.as_bytes())
            .map_err(|e| fs_error::write_failed(&log_path, &e))?;

        self.storage
            .rename(&staging, &target)
            .map_err(|e| fs_error::io_error("Failed to move fork into place", &target, &e))?;
        transaction.commit();

        info!(
            source = %source_name,
            destination = %target.display(),
            base_version = %base_version,
            "forked skill"
        );
        Ok(ForkOutcome {
            destination: target,
            source_name,
            base_version,
        })
    }

    /// Append a history entry to the skill at `bundle_path` and bump its version
    ///
    /// # Errors
    ///
    /// - [`SkillforkError::InvalidVersion`] if `version` is not dotted numeric
    /// - [`SkillforkError::NonMonotonicVersion`] if `version` does not exceed the
    ///   current version; both files are left byte-for-byte unchanged
    pub fn record_customization(
        &self,
        bundle_path: &Path,
        version: &str,
        description: &str,
        verification: Option<&str>,
    ) -> Result<RecordOutcome> {
        let bundle = Bundle::locate(self.storage, bundle_path)?;
        let requested: Version = version.parse()?;
        let _lock = self.lock(bundle.root())?;

        let mut document = bundle.load_document(self.storage)?;
        let log_path = bundle.customization_log();
        let existing_log = if self.storage.is_file(&log_path) {
            Some(
                self.storage
                    .read_to_string(&log_path)
                    .map_err(|e| fs_error::read_failed(&log_path, &e))?,
            )
        } else {
            None
        };

        let header_version = document
            .header
            .get(KEY_CUSTOMIZATION_VERSION)
            .map(str::parse::<Version>)
            .transpose()?;
        let logged_version = existing_log
            .as_deref()
            .map(CustomizationLog::parse)
            .and_then(|log| log.last_version().cloned());
        let current = match (header_version, logged_version) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };

        if let Some(current) = &current {
            if requested <= *current {
                return Err(SkillforkError::NonMonotonicVersion {
                    requested: requested.to_string(),
                    current: current.to_string(),
                });
            }
        }

        let name = document
            .header
            .name()
            .map_or_else(|| bundle.dir_name().to_string(), str::to_string);
        let entry = log::render_entry(&requested, self.clock.now(), description, verification);
        let base = existing_log.unwrap_or_else(|| log::render_empty_log(&name));
        let updated_log = log::append_entry(&base, &entry);

        let mut transaction = Transaction::new(self.storage);
        transaction.backup_file(&log_path)?;
        transaction.backup_file(&bundle.primary_document())?;

        self.storage
            .write_atomic(&log_path, updated_log.as_bytes())
            .map_err(|e| fs_error::write_failed(&log_path, &e))?;
        document
            .header
            .set(KEY_CUSTOMIZATION_VERSION, requested.to_string());
        bundle.save_document(self.storage, &document)?;
        transaction.commit();

        info!(
            bundle = %bundle.root().display(),
            version = %requested,
            "recorded customization"
        );
        Ok(RecordOutcome {
            previous: current,
            version: requested,
            log_path,
        })
    }

    fn load_source(&self, source: &Path) -> Result<(Bundle, SkillDocument)> {
        let not_found = |reason: String| SkillforkError::SourceNotFound {
            path: source.display().to_string(),
            reason,
        };

        if !self.storage.is_dir(source) {
            return Err(not_found("not a directory".to_string()));
        }
        let bundle = Bundle::locate(self.storage, source)?;
        let doc_path = bundle.primary_document();
        if !self.storage.is_file(&doc_path) {
            return Err(not_found(format!("{PRIMARY_DOCUMENT} not found")));
        }
        let content = self
            .storage
            .read_to_string(&doc_path)
            .map_err(|e| fs_error::read_failed(&doc_path, &e))?;
        let document = parse_document(&content).map_err(|e| not_found(e.to_string()))?;
        Ok((bundle, document))
    }

    fn lock(&self, bundle_root: &Path) -> Result<BundleLock> {
        self.storage
            .lock(bundle_root)
            .map_err(|e| SkillforkError::LockFailed {
                path: bundle_root.display().to_string(),
                reason: e.to_string(),
            })
    }
}
