//! Narrow storage access used by the validation, lineage and packaging logic
//!
//! Every filesystem effect goes through [`Storage`], so the business logic can run
//! against [`MemoryStorage`] in tests and against [`FsStorage`] for real.

mod fs;
mod memory;

pub use fs::FsStorage;
pub use memory::MemoryStorage;

use std::fs::File;
use std::io::{self, Seek, Write};
use std::path::{Component, Path, PathBuf};

/// What a path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// Entry produced by [`Storage::walk`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path relative to the walk root
    pub relative: PathBuf,
    pub kind: EntryKind,
}

impl WalkEntry {
    /// Relative path with `/` separators, the form used for ordering and archive entries
    pub fn key(&self) -> String {
        relative_key(&self.relative)
    }
}

/// Join the normal components of `path` with `/`
pub fn relative_key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Sort walk entries by their `/`-joined relative path
pub fn sort_entries(entries: &mut [WalkEntry]) {
    entries.sort_by_key(WalkEntry::key);
}

/// Destination for an archive that only becomes visible once committed
///
/// Bytes go to a temporary file next to the final path. Dropping the sink without
/// calling [`ArtifactSink::commit`] discards the temporary file.
pub trait ArtifactSink: Write + Seek {
    /// Move the finished temporary file to its final name, failing with
    /// [`io::ErrorKind::AlreadyExists`] instead of replacing an existing file
    fn commit(self: Box<Self>) -> io::Result<PathBuf>;
}

/// Advisory exclusive lock held for the duration of a mutating operation
///
/// Released on drop. The lock file itself is kept so that waiters never end up
/// holding a lock on an unlinked file.
#[derive(Debug)]
pub struct BundleLock {
    held: Option<(File, PathBuf)>,
}

impl BundleLock {
    /// A lock that guards nothing (in-memory storage, unwritable lock directory)
    pub fn unlocked() -> Self {
        Self { held: None }
    }

    pub(crate) fn held(file: File, path: PathBuf) -> Self {
        Self {
            held: Some((file, path)),
        }
    }
}

impl Drop for BundleLock {
    fn drop(&mut self) {
        if let Some((file, path)) = self.held.take() {
            if let Err(e) = fs2::FileExt::unlock(&file) {
                tracing::warn!(path = %path.display(), error = %e, "failed to release bundle lock");
            } else {
                tracing::debug!(path = %path.display(), "released bundle lock");
            }
        }
    }
}

/// Filesystem operations needed by the core
pub trait Storage {
    /// Kind of entry at `path`, or `None` if nothing exists there
    fn kind(&self, path: &Path) -> Option<EntryKind>;

    fn exists(&self, path: &Path) -> bool {
        self.kind(path).is_some()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.kind(path) == Some(EntryKind::Dir)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.kind(path) == Some(EntryKind::File)
    }

    /// Whether the file at `path` has an executable permission bit set
    fn is_executable(&self, _path: &Path) -> bool {
        false
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Replace the contents of `path` so readers see either the old or the new bytes
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Direct children of `path`, sorted by name
    fn list_dir(&self, path: &Path) -> io::Result<Vec<WalkEntry>>;

    /// Every file and directory below `root`, sorted by `/`-joined relative path
    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory
    fn remove_dir(&self, path: &Path) -> io::Result<()>;

    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Copy the tree at `src` into `dst`, preserving relative paths
    fn copy_tree(&self, src: &Path, dst: &Path) -> io::Result<()>;

    /// Open a temporary sink in `dir` that commits to `dir/file_name`
    fn create_artifact(&self, dir: &Path, file_name: &str) -> io::Result<Box<dyn ArtifactSink>>;

    /// Take the advisory lock scoped to the bundle rooted at `bundle_root`
    ///
    /// Nothing is created inside or next to `bundle_root`. Callers pass a resolved path so
    /// every spelling of one bundle maps to the same lock.
    fn lock(&self, bundle_root: &Path) -> io::Result<BundleLock>;

    /// Absolute form of `path` with symlinks resolved
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}
