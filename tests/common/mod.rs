//! Common test utilities for skillfork integration tests

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// A scratch directory with its own config home
pub struct TestWorkspace {
    #[allow(dead_code)]
    pub temp: TempDir,
    pub path: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = dunce::canonicalize(temp.path()).expect("Failed to resolve temp directory");
        Self { temp, path }
    }

    /// Write a file, creating parent directories
    pub fn write_file(&self, path: &str, content: &str) {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
    }

    pub fn read_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.path.join(path)).expect("Failed to read file")
    }

    pub fn file_exists(&self, path: &str) -> bool {
        self.path.join(path).exists()
    }

    /// Sorted file names directly inside `dir`, empty if it does not exist
    #[allow(dead_code)]
    pub fn list_dir(&self, dir: &str) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.path.join(dir)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| {
                e.expect("Failed to read entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }

    /// A valid, unforked skill at `skills/<name>`
    pub fn create_skill(&self, name: &str) -> PathBuf {
        self.write_file(
            &format!("skills/{name}/SKILL.md"),
            &format!(
                "---\nname: {name}\ndescription: Extract tables and text from PDF files\nversion: 2.1\n---\n# {name}\n\nUse the scripts.\n"
            ),
        );
        self.write_file(&format!("skills/{name}/scripts/extract.py"), "print('extract')\n");
        self.write_file(&format!("skills/{name}/references/forms.md"), "# Forms\n");
        self.path.join("skills").join(name)
    }

    /// Command running the skillfork binary inside this workspace
    pub fn cmd(&self) -> Command {
        let mut cmd = skillfork_cmd();
        cmd.current_dir(&self.path)
            .env("HOME", self.path.join("home"))
            .env("XDG_CONFIG_HOME", self.path.join("home/.config"));
        cmd
    }

    /// Fork `skills/<source>` into `out/<new_name>`, asserting success
    #[allow(dead_code)]
    pub fn fork(&self, source: &str, new_name: &str) -> PathBuf {
        self.cmd()
            .args(["fork", &format!("skills/{source}"), new_name, "--path", "out"])
            .assert()
            .success();
        self.path.join("out").join(new_name)
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

// Temporary fix for deprecated cargo_bin - will be updated when build-dir issues are resolved
#[allow(deprecated)]
pub fn skillfork_cmd() -> Command {
    let mut cmd = Command::cargo_bin("skillfork").expect("skillfork binary");
    cmd.env_remove("SKILLFORK_CONFIG").env_remove("SKILLFORK_LOG");
    cmd
}

/// Names of all entries in the zip at `path`
#[allow(dead_code)]
pub fn zip_entries(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).expect("Failed to open archive");
    let archive = zip::ZipArchive::new(file).expect("Failed to read archive");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}
