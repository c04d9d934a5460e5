//! In-memory storage for tests, with fault injection

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::{ArtifactSink, BundleLock, EntryKind, Storage, WalkEntry, sort_entries};

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

#[derive(Debug, Default)]
struct Inner {
    nodes: BTreeMap<PathBuf, Node>,
    /// Successful writes left before one injected failure
    writes_left: Option<usize>,
    /// Successful reads left before one injected failure
    reads_left: Option<usize>,
    temp_counter: usize,
}

impl Inner {
    fn take_write(&mut self, path: &Path) -> io::Result<()> {
        take(&mut self.writes_left, "write", path)
    }

    fn take_read(&mut self, path: &Path) -> io::Result<()> {
        take(&mut self.reads_left, "read", path)
    }

    fn ensure_parent_dir(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => match self.nodes.get(parent) {
                Some(Node::Dir) => Ok(()),
                _ if parent == Path::new("/") => Ok(()),
                _ => Err(not_found(parent)),
            },
            _ => Ok(()),
        }
    }

    fn children(&self, root: &Path) -> Vec<(PathBuf, Node)> {
        self.nodes
            .iter()
            .filter(|(path, _)| path.starts_with(root) && path.as_path() != root)
            .map(|(path, node)| (path.clone(), node.clone()))
            .collect()
    }
}

fn take(budget: &mut Option<usize>, op: &str, path: &Path) -> io::Result<()> {
    match budget {
        Some(0) => {
            *budget = None;
            Err(io::Error::other(format!(
                "injected {op} failure at {}",
                path.display()
            )))
        }
        Some(n) => {
            *n -= 1;
            Ok(())
        }
        None => Ok(()),
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found", path.display()),
    )
}

/// [`Storage`] that keeps a whole tree in memory
///
/// Paths are used exactly as given; tests should use absolute paths such as
/// `/skills/pdf`. The root `/` always exists.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    inner: Rc<RefCell<Inner>>,
    locks_taken: Rc<Cell<usize>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating parent directories
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.inner
            .borrow_mut()
            .nodes
            .insert(path.to_path_buf(), Node::File(contents.as_ref().to_vec()));
    }

    /// Add a directory and its ancestors
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut inner = self.inner.borrow_mut();
        for ancestor in path.as_ref().ancestors() {
            if ancestor.as_os_str().is_empty() || ancestor == Path::new("/") {
                continue;
            }
            inner.nodes.insert(ancestor.to_path_buf(), Node::Dir);
        }
    }

    /// Contents of a file as UTF-8, if it exists
    pub fn file_contents(&self, path: impl AsRef<Path>) -> Option<String> {
        match self.inner.borrow().nodes.get(path.as_ref()) {
            Some(Node::File(bytes)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }

    /// All paths currently stored, in order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.inner.borrow().nodes.keys().cloned().collect()
    }

    /// Allow `n` more writes, then fail the next one (file writes, copied files, artifact
    /// chunks, commits); later writes succeed again
    pub fn fail_writes_after(&self, n: usize) {
        self.inner.borrow_mut().writes_left = Some(n);
    }

    /// Allow `n` more reads, then fail the next one
    pub fn fail_reads_after(&self, n: usize) {
        self.inner.borrow_mut().reads_left = Some(n);
    }

    /// Stop injecting faults
    pub fn clear_faults(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.writes_left = None;
        inner.reads_left = None;
    }

    /// Number of times [`Storage::lock`] was called
    pub fn locks_taken(&self) -> usize {
        self.locks_taken.get()
    }
}

impl Storage for MemoryStorage {
    fn kind(&self, path: &Path) -> Option<EntryKind> {
        if path == Path::new("/") {
            return Some(EntryKind::Dir);
        }
        match self.inner.borrow().nodes.get(path) {
            Some(Node::File(_)) => Some(EntryKind::File),
            Some(Node::Dir) => Some(EntryKind::Dir),
            None => None,
        }
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut inner = self.inner.borrow_mut();
        inner.take_read(path)?;
        match inner.nodes.get(path) {
            Some(Node::File(bytes)) => Ok(bytes.clone()),
            Some(Node::Dir) => Err(io::Error::other(format!(
                "{} is a directory",
                path.display()
            ))),
            None => Err(not_found(path)),
        }
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.take_write(path)?;
        inner.ensure_parent_dir(path)?;
        inner
            .nodes
            .insert(path.to_path_buf(), Node::File(contents.to_vec()));
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<WalkEntry>> {
        if !self.is_dir(path) {
            return Err(not_found(path));
        }
        let inner = self.inner.borrow();
        let mut entries: Vec<WalkEntry> = inner
            .children(path)
            .into_iter()
            .filter(|(child, _)| child.parent() == Some(path))
            .filter_map(|(child, node)| {
                let name = child.file_name()?;
                Some(WalkEntry {
                    relative: PathBuf::from(name),
                    kind: match node {
                        Node::File(_) => EntryKind::File,
                        Node::Dir => EntryKind::Dir,
                    },
                })
            })
            .collect();
        sort_entries(&mut entries);
        Ok(entries)
    }

    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>> {
        if !self.is_dir(root) {
            return Err(not_found(root));
        }
        let inner = self.inner.borrow();
        let mut entries: Vec<WalkEntry> = inner
            .children(root)
            .into_iter()
            .filter_map(|(path, node)| {
                let relative = path.strip_prefix(root).ok()?.to_path_buf();
                Some(WalkEntry {
                    relative,
                    kind: match node {
                        Node::File(_) => EntryKind::File,
                        Node::Dir => EntryKind::Dir,
                    },
                })
            })
            .collect();
        sort_entries(&mut entries);
        Ok(entries)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut inner = self.inner.borrow_mut();
        match inner.nodes.get(path) {
            Some(Node::File(_)) => {
                inner.nodes.remove(path);
                Ok(())
            }
            Some(Node::Dir) => Err(io::Error::other(format!(
                "{} is a directory",
                path.display()
            ))),
            None => Err(not_found(path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        if self.is_file(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a file", path.display()),
            ));
        }
        self.add_dir(path);
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        let mut inner = self.inner.borrow_mut();
        if !inner.children(path).is_empty() {
            return Err(io::Error::other(format!(
                "{} is not empty",
                path.display()
            )));
        }
        match inner.nodes.remove(path) {
            Some(_) => Ok(()),
            None => Err(not_found(path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.nodes.remove(path).is_none() {
            return Err(not_found(path));
        }
        inner.nodes.retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut inner = self.inner.borrow_mut();
        if !inner.nodes.contains_key(from) {
            return Err(not_found(from));
        }
        inner.ensure_parent_dir(to)?;
        let moved: Vec<(PathBuf, Node)> = inner
            .nodes
            .iter()
            .filter(|(p, _)| p.starts_with(from))
            .map(|(p, n)| (p.clone(), n.clone()))
            .collect();
        inner.nodes.retain(|p, _| !p.starts_with(from));
        for (path, node) in moved {
            let suffix = path.strip_prefix(from).map_err(io::Error::other)?;
            let target = if suffix.as_os_str().is_empty() {
                to.to_path_buf()
            } else {
                to.join(suffix)
            };
            inner.nodes.insert(target, node);
        }
        Ok(())
    }

    fn copy_tree(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let entries = self.walk(src)?;
        self.create_dir_all(dst)?;
        for entry in entries {
            let target = dst.join(&entry.relative);
            match entry.kind {
                EntryKind::Dir => self.add_dir(&target),
                EntryKind::File => {
                    let bytes = self.read(&src.join(&entry.relative))?;
                    self.write_atomic(&target, &bytes)?;
                }
            }
        }
        Ok(())
    }

    fn create_artifact(&self, dir: &Path, file_name: &str) -> io::Result<Box<dyn ArtifactSink>> {
        if !self.is_dir(dir) {
            return Err(not_found(dir));
        }
        let temp = {
            let mut inner = self.inner.borrow_mut();
            inner.temp_counter += 1;
            let temp = dir.join(format!(".{file_name}.{}.tmp", inner.temp_counter));
            inner.nodes.insert(temp.clone(), Node::File(Vec::new()));
            temp
        };
        Ok(Box::new(MemoryArtifact {
            storage: self.clone(),
            buffer: Cursor::new(Vec::new()),
            temp,
            target: dir.join(file_name),
            committed: false,
        }))
    }

    fn lock(&self, _bundle_root: &Path) -> io::Result<BundleLock> {
        self.locks_taken.set(self.locks_taken.get() + 1);
        Ok(BundleLock::unlocked())
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        if self.exists(path) {
            Ok(path.to_path_buf())
        } else {
            Err(not_found(path))
        }
    }
}

/// Buffer that lands in the tree only on commit
struct MemoryArtifact {
    storage: MemoryStorage,
    buffer: Cursor<Vec<u8>>,
    temp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl Write for MemoryArtifact {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.storage.inner.borrow_mut().take_write(&self.temp)?;
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryArtifact {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.buffer.seek(pos)
    }
}

impl ArtifactSink for MemoryArtifact {
    fn commit(mut self: Box<Self>) -> io::Result<PathBuf> {
        let mut inner = self.storage.inner.borrow_mut();
        inner.take_write(&self.target)?;
        if inner.nodes.contains_key(&self.target) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", self.target.display()),
            ));
        }
        inner.nodes.remove(&self.temp);
        let bytes = std::mem::take(self.buffer.get_mut());
        inner.nodes.insert(self.target.clone(), Node::File(bytes));
        drop(inner);
        self.committed = true;
        Ok(self.target.clone())
    }
}

impl Drop for MemoryArtifact {
    fn drop(&mut self) {
        if !self.committed {
            self.storage.inner.borrow_mut().nodes.remove(&self.temp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_file_creates_parents() {
        let storage = MemoryStorage::new();
        storage.add_file("/skills/pdf/scripts/run.py", "print()");
        assert!(storage.is_dir(Path::new("/skills/pdf/scripts")));
        assert!(storage.is_file(Path::new("/skills/pdf/scripts/run.py")));
    }

    #[test]
    fn test_walk_relative_sorted() {
        let storage = MemoryStorage::new();
        storage.add_file("/s/pdf/SKILL.md", "x");
        storage.add_file("/s/pdf/scripts/a.py", "x");
        storage.add_file("/s/other/SKILL.md", "x");

        let keys: Vec<_> = storage
            .walk(Path::new("/s/pdf"))
            .unwrap()
            .iter()
            .map(WalkEntry::key)
            .collect();
        assert_eq!(keys, vec!["SKILL.md", "scripts", "scripts/a.py"]);
    }

    #[test]
    fn test_write_requires_parent() {
        let storage = MemoryStorage::new();
        assert!(storage.write_atomic(Path::new("/nope/file"), b"x").is_err());
    }

    #[test]
    fn test_rename_moves_subtree() {
        let storage = MemoryStorage::new();
        storage.add_file("/out/.stage/SKILL.md", "x");
        storage
            .rename(Path::new("/out/.stage"), Path::new("/out/pdf"))
            .unwrap();
        assert!(storage.is_file(Path::new("/out/pdf/SKILL.md")));
        assert!(!storage.exists(Path::new("/out/.stage")));
    }

    #[test]
    fn test_injected_write_failure() {
        let storage = MemoryStorage::new();
        storage.add_dir("/d");
        storage.fail_writes_after(1);
        assert!(storage.write_atomic(Path::new("/d/a"), b"1").is_ok());
        assert!(storage.write_atomic(Path::new("/d/b"), b"2").is_err());
        assert!(storage.write_atomic(Path::new("/d/b"), b"2").is_ok());

        storage.fail_writes_after(0);
        storage.clear_faults();
        assert!(storage.write_atomic(Path::new("/d/c"), b"3").is_ok());
    }

    #[test]
    fn test_artifact_temp_visible_until_commit() {
        let storage = MemoryStorage::new();
        storage.add_dir("/dist");
        let mut sink = storage.create_artifact(Path::new("/dist"), "a.zip").unwrap();
        sink.write_all(b"data").unwrap();
        assert_eq!(storage.walk(Path::new("/dist")).unwrap().len(), 1);

        let path = sink.commit().unwrap();
        assert_eq!(path, PathBuf::from("/dist/a.zip"));
        assert_eq!(storage.file_contents("/dist/a.zip").as_deref(), Some("data"));
        assert_eq!(storage.walk(Path::new("/dist")).unwrap().len(), 1);
    }

    #[test]
    fn test_dropped_artifact_is_discarded() {
        let storage = MemoryStorage::new();
        storage.add_dir("/dist");
        {
            let mut sink = storage.create_artifact(Path::new("/dist"), "a.zip").unwrap();
            sink.write_all(b"partial").unwrap();
        }
        assert!(storage.walk(Path::new("/dist")).unwrap().is_empty());
    }
}
