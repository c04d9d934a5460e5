//! Parse the metadata header block out of a skill document.

use std::collections::HashMap;

use super::{Header, SkillDocument};
use crate::error::ParseError;

/// Line that opens and closes the header block
pub const HEADER_MARKER: &str = "---";

/// Split `content` into its metadata header and body.
///
/// The first line must be the marker; the header runs until the next marker line. Every
/// non-blank line in between must have the shape `key: value`. Values are trimmed and a
/// single pair of matching surrounding quotes is removed.
///
/// # Errors
///
/// Returns a [`ParseError`] when the opening marker is missing, the block is not closed,
/// a line is not `key: value`, or a key repeats.
pub fn parse_document(content: &str) -> Result<SkillDocument, ParseError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');

    match lines.next() {
        Some(first) if is_marker(first) => {}
        _ => return Err(ParseError::MissingStartMarker),
    }

    let mut offset = content.split_inclusive('\n').next().map_or(0, str::len);
    let mut header = Header::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (index, raw) in lines.enumerate() {
        // line 1 is the opening marker
        let line_no = index + 2;
        offset += raw.len();

        if is_marker(raw) {
            return Ok(SkillDocument {
                header,
                body: content[offset..].to_string(),
            });
        }

        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let (key, value) = split_pair(line).ok_or_else(|| ParseError::MalformedLine {
            line: line_no,
            content: line.to_string(),
        })?;

        if let Some(&first_line) = seen.get(key) {
            return Err(ParseError::DuplicateKey {
                key: key.to_string(),
                line: line_no,
                first_line,
            });
        }
        seen.insert(key.to_string(), line_no);
        header.set(key, unquote(value));
    }

    Err(ParseError::UnterminatedHeader)
}

fn is_marker(line: &str) -> bool {
    line.trim_end() == HEADER_MARKER
}

fn split_pair(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return None;
    }
    Some((key, value.trim()))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_header() {
        let doc = parse_document("---\nname: pdf\ndescription: Work with PDFs\n---\n# Body\n")
            .unwrap();
        assert_eq!(doc.header.name(), Some("pdf"));
        assert_eq!(doc.header.description(), Some("Work with PDFs"));
        assert_eq!(doc.body, "# Body\n");
    }

    #[test]
    fn test_values_are_trimmed_and_unquoted() {
        let doc = parse_document("---\nname:   \"pdf\"  \ndescription: 'a: b'\n---\n").unwrap();
        assert_eq!(doc.header.name(), Some("pdf"));
        assert_eq!(doc.header.description(), Some("a: b"));
    }

    #[test]
    fn test_value_keeps_inner_colons() {
        let doc = parse_document("---\nhomepage: https://example.com/x\n---\n").unwrap();
        assert_eq!(doc.header.get("homepage"), Some("https://example.com/x"));
    }

    #[test]
    fn test_blank_lines_inside_header_are_skipped() {
        let doc = parse_document("---\nname: pdf\n\n   \ndescription: d\n---\n").unwrap();
        assert_eq!(doc.header.len(), 2);
    }

    #[test]
    fn test_preserves_source_order() {
        let doc = parse_document("---\nzeta: 1\nalpha: 2\nname: x\n---\n").unwrap();
        let keys: Vec<_> = doc.header.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "name"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let doc = parse_document("---\r\nname: pdf\r\n---\r\nbody\r\n").unwrap();
        assert_eq!(doc.header.name(), Some("pdf"));
        assert_eq!(doc.body, "body\r\n");
    }

    #[test]
    fn test_missing_start_marker() {
        let err = parse_document("# Just a title\nname: pdf\n").unwrap_err();
        assert_eq!(err, ParseError::MissingStartMarker);
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(
            parse_document("").unwrap_err(),
            ParseError::MissingStartMarker
        );
    }

    #[test]
    fn test_unterminated_header() {
        let err = parse_document("---\nname: pdf\ndescription: d\n").unwrap_err();
        assert_eq!(err, ParseError::UnterminatedHeader);
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let err = parse_document("---\nname: pdf\nthis is not a pair\n---\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::MalformedLine {
                line: 3,
                content: "this is not a pair".to_string()
            }
        );
    }

    #[test]
    fn test_key_with_spaces_is_malformed() {
        let err = parse_document("---\nmy key: value\n---\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedLine { line: 2, .. }));
    }

    #[test]
    fn test_duplicate_key_is_an_error() {
        let err = parse_document("---\nname: a\ndescription: d\nname: b\n---\n").unwrap_err();
        assert!(err.is_duplicate_key());
        assert_eq!(
            err,
            ParseError::DuplicateKey {
                key: "name".to_string(),
                line: 4,
                first_line: 2
            }
        );
    }

    #[test]
    fn test_body_may_contain_markers() {
        let doc = parse_document("---\nname: pdf\n---\nintro\n---\nmore\n").unwrap();
        assert_eq!(doc.body, "intro\n---\nmore\n");
    }

    #[test]
    fn test_header_at_end_of_file_without_newline() {
        let doc = parse_document("---\nname: pdf\n---").unwrap();
        assert_eq!(doc.body, "");
    }
}
