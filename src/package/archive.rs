//! Zip serialization of a bundle tree
//!
//! Entries are written in the order given, under a top-level `<name>/` folder, with one
//! fixed modification time and normalized permissions, so identical trees and timestamps
//! give identical bytes.

use std::io::{Seek, Write};
use std::path::Path;

use chrono::{Datelike, NaiveDateTime, Timelike};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::{Result, SkillforkError, fs as fs_error};
use crate::progress::Progress;
use crate::storage::{EntryKind, Storage, WalkEntry};

const FILE_MODE: u32 = 0o644;
const EXECUTABLE_MODE: u32 = 0o755;
const DIR_MODE: u32 = 0o755;

/// Convert a timestamp into the zip's MS-DOS date/time
pub fn zip_timestamp(timestamp: NaiveDateTime) -> Result<DateTime> {
    let field = |value: u32| u8::try_from(value).unwrap_or(u8::MAX);
    let year = u16::try_from(timestamp.year()).unwrap_or(0);
    DateTime::from_date_and_time(
        year,
        field(timestamp.month()),
        field(timestamp.day()),
        field(timestamp.hour()),
        field(timestamp.minute()),
        field(timestamp.second()),
    )
    .map_err(|_| SkillforkError::IoError {
        message: format!(
            "Timestamp {timestamp} cannot be stored in a zip archive (years 1980-2107)"
        ),
    })
}

/// Write `entries` of the tree at `root` into `writer` and return the writer
///
/// `entries` must already be sorted; the archive keeps their order.
pub fn write_archive<W, S>(
    writer: W,
    storage: &S,
    root: &Path,
    prefix: &str,
    entries: &[WalkEntry],
    modified: DateTime,
    progress: &dyn Progress,
) -> Result<W>
where
    W: Write + Seek,
    S: Storage + ?Sized,
{
    let mut zip = ZipWriter::new(writer);
    let base: FileOptions<'_, ()> = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(modified);

    zip.add_directory(format!("{prefix}/"), base.unix_permissions(DIR_MODE))?;

    for entry in entries {
        let key = entry.key();
        let name = format!("{prefix}/{key}");
        let path = root.join(&entry.relative);
        match entry.kind {
            EntryKind::Dir => {
                zip.add_directory(format!("{name}/"), base.unix_permissions(DIR_MODE))?;
            }
            EntryKind::File => {
                let mode = if storage.is_executable(&path) {
                    EXECUTABLE_MODE
                } else {
                    FILE_MODE
                };
                let bytes = storage
                    .read(&path)
                    .map_err(|e| fs_error::read_failed(&path, &e))?;
                zip.start_file(name.as_str(), base.unix_permissions(mode))?;
                zip.write_all(&bytes).map_err(|e| {
                    fs_error::io_error("Failed to write archive entry for", &path, &e)
                })?;
                progress.file(&key);
            }
        }
    }

    Ok(zip.finish()?)
}
