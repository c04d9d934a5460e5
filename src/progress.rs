//! Progress reporting while packaging

use indicatif::{ProgressBar, ProgressStyle};

/// Receives packaging progress; every method defaults to doing nothing
pub trait Progress {
    fn start(&self, _total_files: u64) {}
    fn file(&self, _relative: &str) {}
    fn finish(&self) {}
    fn abandon(&self) {}
}

/// Progress sink that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// Terminal progress bar for archive writing
pub struct ProgressDisplay {
    file_pb: ProgressBar,
}

impl ProgressDisplay {
    pub fn new() -> Self {
        let file_style = ProgressStyle::default_bar()
            .template("  [{bar:40.green/yellow}] {pos}/{len} files {msg}")
            .map(|style| style.progress_chars("█▉▊▋▌▍▎▏  "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());

        let file_pb = ProgressBar::new(0);
        file_pb.set_style(file_style);
        Self { file_pb }
    }
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for ProgressDisplay {
    fn start(&self, total_files: u64) {
        self.file_pb.set_length(total_files);
    }

    fn file(&self, relative: &str) {
        // Truncate long paths for display
        let display_path = if relative.chars().count() > 50 {
            let tail: String = relative
                .chars()
                .rev()
                .take(47)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("...{tail}")
        } else {
            relative.to_string()
        };
        self.file_pb.set_message(display_path);
        self.file_pb.inc(1);
    }

    fn finish(&self) {
        self.file_pb.finish_and_clear();
    }

    fn abandon(&self) {
        self.file_pb.abandon();
    }
}
