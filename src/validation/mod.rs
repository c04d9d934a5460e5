//! Structural and metadata checks over a bundle
//!
//! Every rule runs independently and contributes findings to one [`ValidationResult`],
//! so a single run reports every problem. Only a header that cannot be parsed (or a
//! missing `SKILL.md`) stops the run early, as a single error finding.

use std::fmt;
use std::io;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::config::ValidationPolicy;
use crate::domain::{Bundle, CUSTOMIZATION_LOG, OPTIONAL_DIRS, PRIMARY_DOCUMENT, check_slug};
use crate::error::{Result, fs as fs_error};
use crate::lineage::log::CustomizationLog;
use crate::metadata::{
    Header, KEY_CUSTOMIZATION_VERSION, KEY_CUSTOMIZED_FROM, KEY_DESCRIPTION, KEY_LAST_SYNC_DATE,
    KEY_NAME, SkillDocument, Version, parse_document,
};
use crate::storage::{EntryKind, Storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Category of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FindingKind {
    MissingField,
    InvalidName,
    EmptyOrOversizedDescription,
    StructureViolation,
    NonMonotonicLog,
    MalformedHeader,
    InvalidLineage,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One problem found in a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub kind: FindingKind,
    /// Header field or bundle-relative path the finding is about
    pub location: String,
    pub message: String,
}

impl Finding {
    pub fn error(kind: FindingKind, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn warning(
        kind: FindingKind,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] {}: {}",
            self.severity, self.kind, self.location, self.message
        )
    }
}

/// Ordered findings from one validation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    findings: Vec<Finding>,
}

impl ValidationResult {
    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.findings.len() - self.error_count()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// A bundle may be packaged exactly when no finding is an error
    pub fn is_packageable(&self) -> bool {
        self.error_count() == 0
    }
}

/// Characters allowed in file and directory names inside a bundle
pub fn is_portable_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Applies naming and layout rules to a bundle
pub struct StructureValidator<'a, S: Storage + ?Sized> {
    storage: &'a S,
    policy: &'a ValidationPolicy,
}

impl<'a, S: Storage + ?Sized> StructureValidator<'a, S> {
    pub fn new(storage: &'a S, policy: &'a ValidationPolicy) -> Self {
        Self { storage, policy }
    }

    /// Validate `bundle` without modifying it
    ///
    /// # Errors
    ///
    /// Only filesystem failures are returned as errors; every content problem is a finding.
    pub fn validate(&self, bundle: &Bundle) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        let document = match self.load_document(bundle)? {
            Ok(document) => document,
            Err(finding) => {
                result.push(finding);
                return Ok(result);
            }
        };

        self.check_name(&document.header, bundle, &mut result);
        self.check_description(&document.header, &mut result);
        check_lineage(&document.header, &mut result);
        self.check_optional_dirs(bundle, &mut result)?;
        self.check_file_names(bundle, &mut result)?;
        self.check_log(bundle, &document.header, &mut result)?;

        debug!(
            bundle = %bundle.root().display(),
            errors = result.error_count(),
            warnings = result.warning_count(),
            "validation finished"
        );
        Ok(result)
    }

    /// Outer error: I/O failure. Inner error: the single finding that ends validation.
    fn load_document(&self, bundle: &Bundle) -> Result<std::result::Result<SkillDocument, Finding>> {
        let path = bundle.primary_document();
        if !self.storage.is_file(&path) {
            return Ok(Err(Finding::error(
                FindingKind::StructureViolation,
                PRIMARY_DOCUMENT,
                "primary document not found",
            )));
        }
        let content = match self.storage.read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Ok(Err(Finding::error(
                    FindingKind::MalformedHeader,
                    PRIMARY_DOCUMENT,
                    "document is not valid UTF-8",
                )));
            }
            Err(e) => return Err(fs_error::read_failed(&path, &e)),
        };
        Ok(parse_document(&content).map_err(|e| {
            Finding::error(FindingKind::MalformedHeader, PRIMARY_DOCUMENT, e.to_string())
        }))
    }

    fn check_name(&self, header: &Header, bundle: &Bundle, result: &mut ValidationResult) {
        let name = match header.name() {
            Some(name) if !name.is_empty() => name,
            _ => {
                result.push(Finding::error(
                    FindingKind::MissingField,
                    KEY_NAME,
                    "'name' is required",
                ));
                return;
            }
        };

        if let Err(reason) = check_slug(name, self.policy.max_name_length) {
            result.push(Finding::error(
                FindingKind::InvalidName,
                KEY_NAME,
                format!("'{name}' is not a valid skill name: {reason}"),
            ));
        }

        if name != bundle.dir_name() {
            result.push(Finding::error(
                FindingKind::InvalidName,
                KEY_NAME,
                format!(
                    "'{name}' does not match the bundle directory name '{}'",
                    bundle.dir_name()
                ),
            ));
        }
    }

    fn check_description(&self, header: &Header, result: &mut ValidationResult) {
        let Some(description) = header.description() else {
            result.push(Finding::error(
                FindingKind::MissingField,
                KEY_DESCRIPTION,
                "'description' is required",
            ));
            return;
        };

        let len = description.chars().count();
        if len == 0 {
            result.push(Finding::error(
                FindingKind::EmptyOrOversizedDescription,
                KEY_DESCRIPTION,
                "description is empty",
            ));
        } else if len > self.policy.max_description_length {
            result.push(Finding::error(
                FindingKind::EmptyOrOversizedDescription,
                KEY_DESCRIPTION,
                format!(
                    "description is {len} characters, maximum is {}",
                    self.policy.max_description_length
                ),
            ));
        } else if len > self.policy.description_warning_length {
            result.push(Finding::warning(
                FindingKind::EmptyOrOversizedDescription,
                KEY_DESCRIPTION,
                format!(
                    "description is {len} characters, close to the maximum of {}",
                    self.policy.max_description_length
                ),
            ));
        }
    }

    fn check_optional_dirs(&self, bundle: &Bundle, result: &mut ValidationResult) -> Result<()> {
        for dir in OPTIONAL_DIRS {
            let path = bundle.root().join(dir);
            match self.storage.kind(&path) {
                None => {}
                Some(EntryKind::File) => result.push(Finding::error(
                    FindingKind::StructureViolation,
                    dir,
                    format!("'{dir}' must be a directory"),
                )),
                Some(EntryKind::Dir) => {
                    let has_file = self
                        .storage
                        .walk(&path)
                        .map_err(|e| fs_error::io_error("Failed to list", &path, &e))?
                        .iter()
                        .any(|entry| entry.kind == EntryKind::File);
                    if !has_file {
                        result.push(Finding::warning(
                            FindingKind::StructureViolation,
                            format!("{dir}/"),
                            "directory contains no files",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_file_names(&self, bundle: &Bundle, result: &mut ValidationResult) -> Result<()> {
        let entries = self
            .storage
            .walk(bundle.root())
            .map_err(|e| fs_error::io_error("Failed to list", bundle.root(), &e))?;
        for entry in entries {
            let name = entry
                .relative
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !is_portable_name(&name) {
                result.push(Finding::error(
                    FindingKind::StructureViolation,
                    entry.key(),
                    format!(
                        "'{name}' contains characters outside A-Z, a-z, 0-9, '.', '_' and '-'"
                    ),
                ));
            }
        }
        Ok(())
    }

    fn check_log(
        &self,
        bundle: &Bundle,
        header: &Header,
        result: &mut ValidationResult,
    ) -> Result<()> {
        let path = bundle.customization_log();
        if !self.storage.is_file(&path) {
            return Ok(());
        }
        let content = match self.storage.read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                result.push(Finding::error(
                    FindingKind::StructureViolation,
                    CUSTOMIZATION_LOG,
                    "log is not valid UTF-8",
                ));
                return Ok(());
            }
            Err(e) => return Err(fs_error::read_failed(&path, &e)),
        };

        let log = CustomizationLog::parse(&content);
        for malformed in &log.malformed {
            result.push(Finding::warning(
                FindingKind::StructureViolation,
                format!("{CUSTOMIZATION_LOG}:{}", malformed.line),
                format!("unreadable entry heading: {}", malformed.reason),
            ));
        }
        for violation in log.ordering_violations() {
            result.push(Finding::error(
                FindingKind::NonMonotonicLog,
                format!("{CUSTOMIZATION_LOG}:{}", violation.line),
                violation.message,
            ));
        }

        let header_version = header
            .get(KEY_CUSTOMIZATION_VERSION)
            .and_then(|v| v.parse::<Version>().ok());
        if let (Some(logged), Some(current)) = (log.last_version(), header_version) {
            if *logged > current {
                result.push(Finding::warning(
                    FindingKind::InvalidLineage,
                    KEY_CUSTOMIZATION_VERSION,
                    format!("log records version {logged} but the header says {current}"),
                ));
            }
        }
        Ok(())
    }
}

fn check_lineage(header: &Header, result: &mut ValidationResult) {
    if let Some(date) = header.get(KEY_LAST_SYNC_DATE) {
        if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            result.push(Finding::warning(
                FindingKind::InvalidLineage,
                KEY_LAST_SYNC_DATE,
                format!("'{date}' is not a YYYY-MM-DD date"),
            ));
        }
    }

    let Some(source) = header.get(KEY_CUSTOMIZED_FROM) else {
        return;
    };
    if source.is_empty() {
        result.push(Finding::error(
            FindingKind::InvalidLineage,
            KEY_CUSTOMIZED_FROM,
            "'customized-from' is empty",
        ));
    }
    match header.get(KEY_CUSTOMIZATION_VERSION) {
        None => result.push(Finding::error(
            FindingKind::MissingField,
            KEY_CUSTOMIZATION_VERSION,
            "a forked skill must declare 'customization-version'",
        )),
        Some(version) => {
            if let Err(e) = version.parse::<Version>() {
                result.push(Finding::error(
                    FindingKind::InvalidLineage,
                    KEY_CUSTOMIZATION_VERSION,
                    e.to_string(),
                ));
            }
        }
    }
}

/// Validate the bundle at `path` with `policy`
pub fn validate_bundle<S: Storage + ?Sized>(
    storage: &S,
    path: &Path,
    policy: &ValidationPolicy,
) -> Result<(Bundle, ValidationResult)> {
    let bundle = Bundle::locate(storage, path)?;
    let result = StructureValidator::new(storage, policy).validate(&bundle)?;
    Ok((bundle, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    const ROOT: &str = "/skills/finance-pdf";

    fn valid_skill(storage: &MemoryStorage) {
        storage.add_file(
            format!("{ROOT}/SKILL.md"),
            "---\nname: finance-pdf\ndescription: PDF tools for finance\n---\n# Body\n",
        );
        storage.add_file(format!("{ROOT}/scripts/extract.py"), "print()");
    }

    fn run(storage: &MemoryStorage) -> ValidationResult {
        let policy = ValidationPolicy::default();
        validate_bundle(storage, Path::new(ROOT), &policy).unwrap().1
    }

    fn kinds(result: &ValidationResult) -> Vec<(Severity, FindingKind)> {
        result
            .findings()
            .iter()
            .map(|f| (f.severity, f.kind))
            .collect()
    }

    #[test]
    fn test_valid_bundle_has_no_findings() {
        let storage = MemoryStorage::new();
        valid_skill(&storage);
        let result = run(&storage);
        assert!(result.is_empty(), "{result:?}");
        assert!(result.is_packageable());
    }

    #[test]
    fn test_missing_description_is_single_error() {
        let storage = MemoryStorage::new();
        storage.add_file(format!("{ROOT}/SKILL.md"), "---\nname: finance-pdf\n---\n");
        let result = run(&storage);
        assert_eq!(
            kinds(&result),
            vec![(Severity::Error, FindingKind::MissingField)]
        );
        assert_eq!(result.findings()[0].location, "description");
    }

    #[test]
    fn test_name_mismatch_is_invalid_name() {
        let storage = MemoryStorage::new();
        storage.add_file(
            format!("{ROOT}/SKILL.md"),
            "---\nname: pdf\ndescription: d\n---\n",
        );
        let result = run(&storage);
        assert_eq!(
            kinds(&result),
            vec![(Severity::Error, FindingKind::InvalidName)]
        );
        assert!(result.findings()[0].message.contains("finance-pdf"));
    }

    #[test]
    fn test_bad_slug_and_mismatch_both_reported() {
        let storage = MemoryStorage::new();
        storage.add_file(
            format!("{ROOT}/SKILL.md"),
            "---\nname: Finance_PDF\ndescription: d\n---\n",
        );
        assert_eq!(run(&storage).error_count(), 2);
    }

    #[test]
    fn test_parse_error_is_single_finding() {
        let storage = MemoryStorage::new();
        storage.add_file(format!("{ROOT}/SKILL.md"), "# no header\n");
        storage.add_file(format!("{ROOT}/bad name.txt"), "x");
        assert_eq!(
            kinds(&run(&storage)),
            vec![(Severity::Error, FindingKind::MalformedHeader)]
        );
    }

    #[test]
    fn test_missing_primary_document() {
        let storage = MemoryStorage::new();
        storage.add_dir(ROOT);
        let result = run(&storage);
        assert_eq!(
            kinds(&result),
            vec![(Severity::Error, FindingKind::StructureViolation)]
        );
    }

    #[test]
    fn test_description_bounds() {
        let storage = MemoryStorage::new();
        let long = "x".repeat(1025);
        storage.add_file(
            format!("{ROOT}/SKILL.md"),
            format!("---\nname: finance-pdf\ndescription: {long}\n---\n"),
        );
        assert_eq!(
            kinds(&run(&storage)),
            vec![(Severity::Error, FindingKind::EmptyOrOversizedDescription)]
        );

        let near = "x".repeat(1000);
        storage.add_file(
            format!("{ROOT}/SKILL.md"),
            format!("---\nname: finance-pdf\ndescription: {near}\n---\n"),
        );
        let result = run(&storage);
        assert_eq!(
            kinds(&result),
            vec![(Severity::Warning, FindingKind::EmptyOrOversizedDescription)]
        );
        assert!(result.is_packageable());

        storage.add_file(
            format!("{ROOT}/SKILL.md"),
            "---\nname: finance-pdf\ndescription:\n---\n",
        );
        assert_eq!(
            kinds(&run(&storage)),
            vec![(Severity::Error, FindingKind::EmptyOrOversizedDescription)]
        );
    }

    #[test]
    fn test_fork_without_version() {
        let storage = MemoryStorage::new();
        storage.add_file(
            format!("{ROOT}/SKILL.md"),
            "---\nname: finance-pdf\ndescription: d\ncustomized-from: pdf\n---\n",
        );
        let result = run(&storage);
        assert_eq!(
            kinds(&result),
            vec![(Severity::Error, FindingKind::MissingField)]
        );
        assert_eq!(result.findings()[0].location, "customization-version");

        storage.add_file(
            format!("{ROOT}/SKILL.md"),
            "---\nname: finance-pdf\ndescription: d\ncustomized-from: pdf\ncustomization-version: one\n---\n",
        );
        assert_eq!(
            kinds(&run(&storage)),
            vec![(Severity::Error, FindingKind::InvalidLineage)]
        );
    }

    #[test]
    fn test_empty_optional_dir_is_warning() {
        let storage = MemoryStorage::new();
        valid_skill(&storage);
        storage.add_dir(format!("{ROOT}/references"));
        storage.add_dir(format!("{ROOT}/assets/empty"));
        let result = run(&storage);
        assert_eq!(
            kinds(&result),
            vec![
                (Severity::Warning, FindingKind::StructureViolation),
                (Severity::Warning, FindingKind::StructureViolation),
            ]
        );
        assert_eq!(result.findings()[0].location, "references/");
        assert_eq!(result.findings()[1].location, "assets/");
    }

    #[test]
    fn test_non_portable_names() {
        let storage = MemoryStorage::new();
        valid_skill(&storage);
        storage.add_file(format!("{ROOT}/references/tax notes.md"), "x");
        storage.add_file(format!("{ROOT}/assets/logo?.png"), "x");
        let result = run(&storage);
        let locations: Vec<_> = result.errors().map(|f| f.location.as_str()).collect();
        assert_eq!(locations, vec!["assets/logo?.png", "references/tax notes.md"]);
    }

    #[test]
    fn test_log_out_of_order() {
        let storage = MemoryStorage::new();
        valid_skill(&storage);
        storage.add_file(
            format!("{ROOT}/CUSTOMIZATION_LOG.md"),
            "# Customization Log: finance-pdf\n\n## Customization History\n\n\
             ### Version 1.1 - 2025-10-22 10:00:00\n- a\n\n\
             ### Version 1.2 - 2025-10-21 10:00:00\n- b\n",
        );
        let result = run(&storage);
        assert_eq!(
            kinds(&result),
            vec![(Severity::Error, FindingKind::NonMonotonicLog)]
        );
        assert_eq!(result.findings()[0].location, "CUSTOMIZATION_LOG.md:8");
    }

    #[test]
    fn test_feedback_file_is_ignored() {
        let storage = MemoryStorage::new();
        valid_skill(&storage);
        storage.add_file(format!("{ROOT}/FEEDBACK.md"), "## Feedback Entry #1 - ???\n");
        assert!(run(&storage).is_empty());
    }

    #[test]
    fn test_validation_is_idempotent_and_read_only() {
        let storage = MemoryStorage::new();
        valid_skill(&storage);
        storage.add_dir(format!("{ROOT}/assets"));
        storage.add_file(format!("{ROOT}/x y"), "");
        let before = storage.paths();

        let first = run(&storage);
        let second = run(&storage);
        assert_eq!(first, second);
        assert_eq!(storage.paths(), before);
    }

    #[test]
    fn test_finding_display() {
        let finding = Finding::error(FindingKind::MissingField, "description", "required");
        assert_eq!(
            finding.to_string(),
            "error[MissingField] description: required"
        );
    }

    #[test]
    fn test_portable_name() {
        assert!(is_portable_name("extract_v2.py"));
        assert!(!is_portable_name("résumé.md"));
        assert!(!is_portable_name(""));
    }
}
