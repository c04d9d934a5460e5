//! Error types and handling for Skillfork
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`parse`]: metadata header parse errors
//! - [`fs`]: file system error constructors

pub mod fs;
pub mod parse;

pub use parse::ParseError;

use miette::Diagnostic;
use thiserror::Error;

use crate::validation::ValidationResult;

/// Exit code for validation, parse and lineage failures
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for I/O and environment failures
pub const EXIT_IO_FAILURE: i32 = 2;

/// Main error type for Skillfork operations
#[derive(Error, Diagnostic, Debug)]
pub enum SkillforkError {
    // Metadata errors
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    // Lineage errors
    #[error("Destination already exists: {path}")]
    #[diagnostic(
        code(skillfork::lineage::destination_exists),
        help("Forking never overwrites. Choose another name or remove the existing directory")
    )]
    DestinationExists { path: String },

    #[error("Source skill not found: {path}: {reason}")]
    #[diagnostic(
        code(skillfork::lineage::source_not_found),
        help("The source must be a directory containing SKILL.md with a metadata header")
    )]
    SourceNotFound { path: String, reason: String },

    #[error("Destination {path} lies inside the source skill")]
    #[diagnostic(
        code(skillfork::lineage::destination_inside_source),
        help("Fork into a directory outside the skill being copied")
    )]
    DestinationInsideSource { path: String },

    #[error("Version {requested} does not exceed current version {current}")]
    #[diagnostic(
        code(skillfork::lineage::non_monotonic_version),
        help("Customization versions must strictly increase (e.g. 1.0 -> 1.1)")
    )]
    NonMonotonicVersion { requested: String, current: String },

    #[error("Invalid version '{version}': {reason}")]
    #[diagnostic(
        code(skillfork::lineage::invalid_version),
        help("Versions are dotted numbers such as 1.0 or 2.3.1")
    )]
    InvalidVersion { version: String, reason: String },

    #[error("Invalid skill name '{name}': {reason}")]
    #[diagnostic(
        code(skillfork::lineage::invalid_name),
        help("Skill names are hyphen-case: lowercase letters, digits and single hyphens")
    )]
    InvalidName { name: String, reason: String },

    // Validation errors
    #[error("Validation failed: {errors} error(s) found")]
    #[diagnostic(
        code(skillfork::validation::failed),
        help("Fix the reported errors; warnings alone do not fail validation")
    )]
    ValidationFailed { errors: usize },

    // Packaging errors
    #[error("Packaging aborted: {} error(s) found during validation", result.error_count())]
    #[diagnostic(
        code(skillfork::package::aborted),
        help("Fix the reported errors and run the command again")
    )]
    PackagingAborted { result: ValidationResult },

    #[error("Output directory unavailable: {path}: {reason}")]
    #[diagnostic(code(skillfork::package::output_dir_unavailable))]
    OutputDirUnavailable { path: String, reason: String },

    #[error("Artifact already exists: {path}")]
    #[diagnostic(
        code(skillfork::package::artifact_exists),
        help("Another artifact was produced within the same second. Retry in a moment")
    )]
    ArtifactExists { path: String },

    // Configuration errors
    #[error("Failed to parse configuration file: {path}: {reason}")]
    #[diagnostic(code(skillfork::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(skillfork::config::invalid))]
    ConfigInvalid { message: String },

    // File system errors
    #[error("File not found: {path}")]
    #[diagnostic(code(skillfork::fs::not_found))]
    FileNotFound { path: String },

    #[error("Failed to read file: {path}: {reason}")]
    #[diagnostic(code(skillfork::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}: {reason}")]
    #[diagnostic(code(skillfork::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("Failed to lock bundle: {path}: {reason}")]
    #[diagnostic(code(skillfork::fs::lock_failed))]
    LockFailed { path: String, reason: String },

    #[error("Unknown shell: {shell}")]
    #[diagnostic(
        code(skillfork::cli::unknown_shell),
        help("Supported shells: bash, elvish, fish, powershell, zsh")
    )]
    UnknownShell { shell: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(skillfork::fs::io_error))]
    IoError { message: String },
}

impl SkillforkError {
    /// Process exit code for this error
    ///
    /// Content problems (parse, validation, lineage) exit with 1 so calling scripts can tell
    /// them apart from environmental failures, which exit with 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            SkillforkError::Parse(_)
            | SkillforkError::DestinationExists { .. }
            | SkillforkError::SourceNotFound { .. }
            | SkillforkError::DestinationInsideSource { .. }
            | SkillforkError::NonMonotonicVersion { .. }
            | SkillforkError::InvalidVersion { .. }
            | SkillforkError::InvalidName { .. }
            | SkillforkError::ValidationFailed { .. }
            | SkillforkError::PackagingAborted { .. } => EXIT_FAILURE,
            SkillforkError::OutputDirUnavailable { .. }
            | SkillforkError::ArtifactExists { .. }
            | SkillforkError::ConfigParseFailed { .. }
            | SkillforkError::ConfigInvalid { .. }
            | SkillforkError::FileNotFound { .. }
            | SkillforkError::FileReadFailed { .. }
            | SkillforkError::FileWriteFailed { .. }
            | SkillforkError::LockFailed { .. }
            | SkillforkError::UnknownShell { .. }
            | SkillforkError::IoError { .. } => EXIT_IO_FAILURE,
        }
    }
}

impl From<std::io::Error> for SkillforkError {
    fn from(err: std::io::Error) -> Self {
        SkillforkError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for SkillforkError {
    fn from(err: serde_yaml::Error) -> Self {
        SkillforkError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SkillforkError {
    fn from(err: serde_json::Error) -> Self {
        SkillforkError::IoError {
            message: format!("JSON serialization failed: {err}"),
        }
    }
}

impl From<zip::result::ZipError> for SkillforkError {
    fn from(err: zip::result::ZipError) -> Self {
        SkillforkError::IoError {
            message: format!("Archive write failed: {err}"),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, SkillforkError>;
