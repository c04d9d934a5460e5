//! File system errors

use std::path::Path;

use super::SkillforkError;

/// Creates a file not found error
pub fn not_found(path: &Path) -> SkillforkError {
    SkillforkError::FileNotFound {
        path: path.display().to_string(),
    }
}

/// Creates a file read error, keeping not-found distinct
pub fn read_failed(path: &Path, err: &std::io::Error) -> SkillforkError {
    if err.kind() == std::io::ErrorKind::NotFound {
        return not_found(path);
    }
    SkillforkError::FileReadFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Creates a file write error
pub fn write_failed(path: &Path, err: &std::io::Error) -> SkillforkError {
    SkillforkError::FileWriteFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Creates a generic IO error with operation context
pub fn io_error(operation: &str, path: &Path, err: &std::io::Error) -> SkillforkError {
    SkillforkError::IoError {
        message: format!("{operation} {}: {err}", path.display()),
    }
}
