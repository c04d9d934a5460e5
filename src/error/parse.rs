//! Metadata header parse errors

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while reading the metadata header of a skill document
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Metadata header missing: document must start with a '---' line")]
    #[diagnostic(
        code(skillfork::parse::missing_start_marker),
        help("Add a header block such as:\n---\nname: my-skill\ndescription: ...\n---")
    )]
    MissingStartMarker,

    #[error("Metadata header not terminated: no closing '---' line before end of file")]
    #[diagnostic(code(skillfork::parse::unterminated_header))]
    UnterminatedHeader,

    #[error("Malformed header line {line}: expected 'key: value', found '{content}'")]
    #[diagnostic(code(skillfork::parse::malformed_line))]
    MalformedLine { line: usize, content: String },

    #[error("Duplicate header key '{key}' on line {line} (first defined on line {first_line})")]
    #[diagnostic(
        code(skillfork::parse::duplicate_key),
        help("Each header key may appear only once")
    )]
    DuplicateKey {
        key: String,
        line: usize,
        first_line: usize,
    },
}

impl ParseError {
    /// Whether this is the duplicate-key case
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, ParseError::DuplicateKey { .. })
    }
}
