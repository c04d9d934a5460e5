//! Packaging a validated skill into a timestamped zip artifact
//!
//! The packaging timestamp is taken once, when [`PackageBuilder::package`] starts. The
//! archive is streamed into a temporary file in the output directory and only renamed
//! to `<name>-<YYYYMMDD-HHMMSS>.zip` after it is complete; any failure discards the
//! temporary file, and an existing artifact is never replaced.

pub mod archive;

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::ValidationPolicy;
use crate::domain::{Bundle, BundleState};
use crate::error::{Result, SkillforkError, fs as fs_error};
use crate::hash;
use crate::progress::{NoProgress, Progress};
use crate::storage::{EntryKind, Storage, WalkEntry};
use crate::validation::{StructureValidator, ValidationResult};

/// Extension of produced artifacts
pub const ARTIFACT_EXTENSION: &str = "zip";

/// File name of the artifact for `name` packaged at `timestamp`
pub fn artifact_file_name(name: &str, timestamp: NaiveDateTime) -> String {
    format!(
        "{name}-{}.{ARTIFACT_EXTENSION}",
        timestamp.format("%Y%m%d-%H%M%S")
    )
}

/// A written artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageArtifact {
    pub path: PathBuf,
    /// Number of regular files stored
    pub file_count: usize,
    /// Archive size in bytes
    pub bytes: u64,
    /// BLAKE3 digest of the archive
    pub digest: String,
}

impl PackageArtifact {
    /// Format size as human-readable string
    pub fn formatted_size(&self) -> String {
        let size = self.bytes as f64;
        if size < 1024.0 {
            format!("{} B", self.bytes)
        } else if size < 1024.0 * 1024.0 {
            format!("{:.1} KB", size / 1024.0)
        } else {
            format!("{:.1} MB", size / (1024.0 * 1024.0))
        }
    }
}

/// Successful packaging: the artifact plus the (warning-only) validation result
#[derive(Debug, Clone)]
pub struct PackageOutcome {
    pub artifact: PackageArtifact,
    pub validation: ValidationResult,
    pub state: BundleState,
}

/// Validates a bundle and writes its archive
pub struct PackageBuilder<'a, S: Storage + ?Sized, C: Clock + ?Sized> {
    storage: &'a S,
    clock: &'a C,
    policy: &'a ValidationPolicy,
    progress: &'a dyn Progress,
}

impl<'a, S: Storage + ?Sized, C: Clock + ?Sized> PackageBuilder<'a, S, C> {
    pub fn new(storage: &'a S, clock: &'a C, policy: &'a ValidationPolicy) -> Self {
        Self {
            storage,
            clock,
            policy,
            progress: &NoProgress,
        }
    }

    /// Report per-file progress to `progress`
    pub fn with_progress(mut self, progress: &'a dyn Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Validate the bundle at `bundle_path` and package it into `output_dir`
    ///
    /// # Errors
    ///
    /// - [`SkillforkError::PackagingAborted`] with the full result if validation reports
    ///   any error; nothing is written
    /// - [`SkillforkError::OutputDirUnavailable`] if `output_dir` cannot be created or
    ///   written
    /// - [`SkillforkError::ArtifactExists`] if the artifact name is already taken
    pub fn package(&self, bundle_path: &Path, output_dir: &Path) -> Result<PackageOutcome> {
        let timestamp = self.clock.now();
        let bundle = Bundle::locate(self.storage, bundle_path)?;
        let _lock = self
            .storage
            .lock(bundle.root())
            .map_err(|e| SkillforkError::LockFailed {
                path: bundle.root().display().to_string(),
                reason: e.to_string(),
            })?;

        let validation = StructureValidator::new(self.storage, self.policy).validate(&bundle)?;
        let state = BundleState::after_validation(&validation);
        let Some(state) = state.after_packaging() else {
            debug!(
                bundle = %bundle.root().display(),
                errors = validation.error_count(),
                "validation failed, not packaging"
            );
            return Err(SkillforkError::PackagingAborted { result: validation });
        };

        self.prepare_output_dir(output_dir)?;

        let file_name = artifact_file_name(bundle.dir_name(), timestamp);
        let target = output_dir.join(&file_name);
        if self.storage.exists(&target) {
            return Err(SkillforkError::ArtifactExists {
                path: target.display().to_string(),
            });
        }

        let entries = self.archive_entries(&bundle, output_dir)?;
        let file_count = entries
            .iter()
            .filter(|e| e.kind == EntryKind::File)
            .count();
        let modified = archive::zip_timestamp(timestamp)?;

        let sink = self
            .storage
            .create_artifact(output_dir, &file_name)
            .map_err(|e| output_unavailable(output_dir, &e))?;

        self.progress.start(file_count as u64);
        let written = archive::write_archive(
            sink,
            self.storage,
            bundle.root(),
            bundle.dir_name(),
            &entries,
            modified,
            self.progress,
        );
        let sink = match written {
            Ok(sink) => sink,
            Err(e) => {
                self.progress.abandon();
                return Err(e);
            }
        };
        self.progress.finish();

        let path = sink.commit().map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                SkillforkError::ArtifactExists {
                    path: target.display().to_string(),
                }
            } else {
                fs_error::write_failed(&target, &e)
            }
        })?;

        let (digest, bytes) = hash::hash_file(self.storage, &path)?;
        info!(
            artifact = %path.display(),
            files = file_count,
            bytes,
            "packaged skill"
        );
        Ok(PackageOutcome {
            artifact: PackageArtifact {
                path,
                file_count,
                bytes,
                digest,
            },
            validation,
            state,
        })
    }

    fn prepare_output_dir(&self, output_dir: &Path) -> Result<()> {
        match self.storage.kind(output_dir) {
            Some(EntryKind::Dir) => Ok(()),
            Some(EntryKind::File) => Err(SkillforkError::OutputDirUnavailable {
                path: output_dir.display().to_string(),
                reason: "path exists and is not a directory".to_string(),
            }),
            None => self
                .storage
                .create_dir_all(output_dir)
                .map_err(|e| output_unavailable(output_dir, &e)),
        }
    }

    /// Sorted bundle entries, minus the output directory when it lies inside the bundle
    fn archive_entries(&self, bundle: &Bundle, output_dir: &Path) -> Result<Vec<WalkEntry>> {
        let entries = self
            .storage
            .walk(bundle.root())
            .map_err(|e| fs_error::io_error("Failed to list", bundle.root(), &e))?;

        let resolved_output = self
            .storage
            .canonicalize(output_dir)
            .map_err(|e| output_unavailable(output_dir, &e))?;
        let Ok(inside) = resolved_output.strip_prefix(bundle.root()) else {
            return Ok(entries);
        };
        if inside.as_os_str().is_empty() {
            // Packaging into the skill itself: leave earlier artifacts out
            let stem = format!("{}-", bundle.dir_name());
            let suffix = format!(".{ARTIFACT_EXTENSION}");
            return Ok(entries
                .into_iter()
                .filter(|e| {
                    let key = e.key();
                    !(e.kind == EntryKind::File
                        && !key.contains('/')
                        && key.starts_with(&stem)
                        && key.ends_with(&suffix))
                })
                .collect());
        }
        let inside = inside.to_path_buf();
        debug!(output = %inside.display(), "excluding output directory from archive");
        Ok(entries
            .into_iter()
            .filter(|e| !e.relative.starts_with(&inside))
            .collect())
    }
}

fn output_unavailable(path: &Path, err: &io::Error) -> SkillforkError {
    SkillforkError::OutputDirUnavailable {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
