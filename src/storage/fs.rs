//! Real filesystem storage

use std::fs::{self, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{ArtifactSink, BundleLock, EntryKind, Storage, WalkEntry, sort_entries};

/// [`Storage`] backed by `std::fs`
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

fn entry_kind(file_type: fs::FileType) -> EntryKind {
    if file_type.is_dir() {
        EntryKind::Dir
    } else {
        EntryKind::File
    }
}

fn walk_error(err: walkdir::Error) -> io::Error {
    let message = err.to_string();
    err.into_io_error()
        .unwrap_or_else(|| io::Error::other(message))
}

/// Temp files are created owner-only; published files get the usual 0644
#[cfg(unix)]
fn set_default_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Directory holding bundle lock files, outside every bundle and output tree
fn lock_dir() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("skillfork-locks")
}

/// Lock file for the bundle at `bundle_root`, keyed by a digest of the path
pub(crate) fn lock_file_path(bundle_root: &Path) -> PathBuf {
    let digest = blake3::hash(bundle_root.as_os_str().as_encoded_bytes());
    lock_dir().join(format!("{}.lock", digest.to_hex()))
}

fn parent_or_current(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

impl Storage for FsStorage {
    fn kind(&self, path: &Path) -> Option<EntryKind> {
        fs::metadata(path).ok().map(|m| entry_kind(m.file_type()))
    }

    #[cfg(unix)]
    fn is_executable(&self, path: &Path) -> bool {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let dir = parent_or_current(path);
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(contents)?;
        temp.as_file().sync_all()?;
        match fs::metadata(path) {
            // keep e.g. the executable bit of the file being replaced
            Ok(metadata) => fs::set_permissions(temp.path(), metadata.permissions())?,
            Err(_) => set_default_permissions(temp.path())?,
        }
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<WalkEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let kind = entry_kind(fs::metadata(entry.path())?.file_type());
            entries.push(WalkEntry {
                relative: PathBuf::from(entry.file_name()),
                kind,
            });
        }
        sort_entries(&mut entries);
        Ok(entries)
    }

    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).follow_links(true) {
            let entry = entry.map_err(walk_error)?;
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(io::Error::other)?
                .to_path_buf();
            entries.push(WalkEntry {
                relative,
                kind: entry_kind(entry.file_type()),
            });
        }
        sort_entries(&mut entries);
        Ok(entries)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn copy_tree(&self, src: &Path, dst: &Path) -> io::Result<()> {
        fs::create_dir_all(dst)?;
        for entry in self.walk(src)? {
            let target = dst.join(&entry.relative);
            match entry.kind {
                EntryKind::Dir => fs::create_dir_all(&target)?,
                EntryKind::File => {
                    fs::copy(src.join(&entry.relative), &target)?;
                }
            }
        }
        Ok(())
    }

    fn create_artifact(&self, dir: &Path, file_name: &str) -> io::Result<Box<dyn ArtifactSink>> {
        let file = tempfile::Builder::new()
            .prefix(&format!(".{file_name}."))
            .suffix(".tmp")
            .tempfile_in(dir)?;
        debug!(temp = %file.path().display(), "opened artifact temp file");
        Ok(Box::new(FsArtifact {
            file,
            target: dir.join(file_name),
        }))
    }

    fn lock(&self, bundle_root: &Path) -> io::Result<BundleLock> {
        let lock_path = lock_file_path(bundle_root);
        let opened = lock_path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| {
                OpenOptions::new()
                    .create(true)
                    .truncate(false)
                    .read(true)
                    .write(true)
                    .open(&lock_path)
            });
        let file = match opened {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warn!(
                    path = %lock_path.display(),
                    "cannot create lock file, continuing without a bundle lock"
                );
                return Ok(BundleLock::unlocked());
            }
            Err(e) => return Err(e),
        };

        fs2::FileExt::lock_exclusive(&file)?;
        debug!(
            bundle = %bundle_root.display(),
            path = %lock_path.display(),
            "acquired bundle lock"
        );
        Ok(BundleLock::held(file, lock_path))
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        dunce::canonicalize(path)
    }
}

/// Temporary file that is renamed into place on commit
struct FsArtifact {
    file: NamedTempFile,
    target: PathBuf,
}

impl Write for FsArtifact {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for FsArtifact {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl ArtifactSink for FsArtifact {
    fn commit(self: Box<Self>) -> io::Result<PathBuf> {
        let FsArtifact { mut file, target } = *self;
        file.flush()?;
        file.as_file().sync_all()?;
        set_default_permissions(file.path())?;
        file.persist_noclobber(&target).map_err(|e| e.error)?;
        Ok(target)
    }
}
