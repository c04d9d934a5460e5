//! Transaction support for atomic operations
//!
//! Fork and record-customization touch several paths. A [`Transaction`] remembers what
//! was created or overwritten so that a failure part-way through leaves the filesystem
//! as it was.
//!
//! ## Usage
//!
//! ```ignore
//! let mut transaction = Transaction::new(&storage);
//! transaction.backup_file(&log_path)?;
//!
//! // Perform operations...
//! transaction.track_tree_created(&staging_dir);
//!
//! // On success:
//! transaction.commit();
//!
//! // On error (automatic via Drop if not committed):
//! // rollback happens automatically
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, fs as fs_error};
use crate::storage::Storage;

/// Original state of a file touched by the transaction
#[derive(Debug, Clone)]
struct FileBackup {
    path: PathBuf,
    /// `None` when the file did not exist before
    content: Option<Vec<u8>>,
}

/// A transaction over a [`Storage`]
pub struct Transaction<'a, S: Storage + ?Sized> {
    storage: &'a S,

    /// Files to restore (or remove) on rollback
    file_backups: Vec<FileBackup>,

    /// Trees created during this transaction, removed recursively on rollback
    created_trees: Vec<PathBuf>,

    /// Directories created during this transaction, removed on rollback if empty
    created_dirs: Vec<PathBuf>,

    /// Whether the transaction has been committed
    committed: bool,
}

impl<'a, S: Storage + ?Sized> Transaction<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self {
            storage,
            file_backups: Vec::new(),
            created_trees: Vec::new(),
            created_dirs: Vec::new(),
            committed: false,
        }
    }

    /// Snapshot `path` before it is modified
    pub fn backup_file(&mut self, path: &Path) -> Result<()> {
        let content = if self.storage.is_file(path) {
            Some(
                self.storage
                    .read(path)
                    .map_err(|e| fs_error::read_failed(path, &e))?,
            )
        } else {
            None
        };
        self.file_backups.push(FileBackup {
            path: path.to_path_buf(),
            content,
        });
        Ok(())
    }

    /// Track a directory tree that only this transaction created
    pub fn track_tree_created(&mut self, path: impl Into<PathBuf>) {
        self.created_trees.push(path.into());
    }

    /// Track a directory that was created during this transaction
    pub fn track_dir_created(&mut self, path: impl Into<PathBuf>) {
        self.created_dirs.push(path.into());
    }

    /// Commit the transaction (prevent rollback)
    pub fn commit(mut self) {
        self.committed = true;
    }

    /// Undo everything recorded so far
    pub fn rollback(&mut self) {
        if self.committed {
            return;
        }

        for tree in self.created_trees.iter().rev() {
            if self.storage.exists(tree) {
                if let Err(e) = self.storage.remove_dir_all(tree) {
                    warn!(path = %tree.display(), error = %e, "failed to remove partial tree");
                }
            }
        }

        for backup in self.file_backups.iter().rev() {
            let restored = match &backup.content {
                Some(content) => self.storage.write_atomic(&backup.path, content),
                None if self.storage.is_file(&backup.path) => {
                    self.storage.remove_file(&backup.path)
                }
                None => Ok(()),
            };
            if let Err(e) = restored {
                warn!(path = %backup.path.display(), error = %e, "failed to restore file");
            }
        }

        // Remove created directories (deepest first to handle nesting)
        let mut dirs: Vec<_> = self.created_dirs.iter().collect();
        dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
        for dir in dirs {
            let empty = self
                .storage
                .list_dir(dir)
                .map(|entries| entries.is_empty())
                .unwrap_or(false);
            if empty {
                let _ = self.storage.remove_dir(dir);
            }
        }

        debug!("transaction rolled back");
        self.committed = true;
    }
}

impl<S: Storage + ?Sized> Drop for Transaction<'_, S> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_commit_keeps_changes() {
        let storage = MemoryStorage::new();
        storage.add_file("/b/CUSTOMIZATION_LOG.md", "old");

        let mut transaction = Transaction::new(&storage);
        transaction
            .backup_file(Path::new("/b/CUSTOMIZATION_LOG.md"))
            .unwrap();
        storage
            .write_atomic(Path::new("/b/CUSTOMIZATION_LOG.md"), b"new")
            .unwrap();
        transaction.commit();

        assert_eq!(
            storage.file_contents("/b/CUSTOMIZATION_LOG.md").as_deref(),
            Some("new")
        );
    }

    #[test]
    fn test_drop_restores_backups() {
        let storage = MemoryStorage::new();
        storage.add_file("/b/SKILL.md", "original");

        {
            let mut transaction = Transaction::new(&storage);
            transaction.backup_file(Path::new("/b/SKILL.md")).unwrap();
            transaction.backup_file(Path::new("/b/NEW.md")).unwrap();
            storage
                .write_atomic(Path::new("/b/SKILL.md"), b"changed")
                .unwrap();
            storage.write_atomic(Path::new("/b/NEW.md"), b"x").unwrap();
        }

        assert_eq!(
            storage.file_contents("/b/SKILL.md").as_deref(),
            Some("original")
        );
        assert!(!storage.exists(Path::new("/b/NEW.md")));
    }

    #[test]
    fn test_drop_removes_created_tree_and_empty_dirs() {
        let storage = MemoryStorage::new();
        storage.add_dir("/work");

        {
            let mut transaction = Transaction::new(&storage);
            storage.create_dir_all(Path::new("/work/out")).unwrap();
            transaction.track_dir_created("/work/out");
            storage.add_file("/work/out/.stage/SKILL.md", "x");
            transaction.track_tree_created("/work/out/.stage");
        }

        assert!(!storage.exists(Path::new("/work/out")));
        assert!(storage.exists(Path::new("/work")));
    }

    #[test]
    fn test_non_empty_created_dir_survives() {
        let storage = MemoryStorage::new();
        {
            let mut transaction = Transaction::new(&storage);
            storage.create_dir_all(Path::new("/out")).unwrap();
            transaction.track_dir_created("/out");
            storage.add_file("/out/other-skill/SKILL.md", "x");
        }
        assert!(storage.exists(Path::new("/out/other-skill/SKILL.md")));
    }
}
