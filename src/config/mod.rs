//! Configuration for Skillfork
//!
//! Policy bounds (name and description lengths, the fork base-version sentinel) are
//! configuration rather than constants. They are loaded from YAML:
//!
//! ```yaml
//! validation:
//!   max-name-length: 64
//!   max-description-length: 1024
//!   description-warning-length: 960
//! lineage:
//!   base-version-sentinel: unversioned
//! ```
//!
//! Lookup order: an explicit `--config` path (or `SKILLFORK_CONFIG`), then
//! `<config dir>/skillfork/config.yaml`, then built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SkillforkError};

/// Default upper bound for the skill name slug
pub const DEFAULT_MAX_NAME_LENGTH: usize = 64;
/// Default upper bound for the description
pub const DEFAULT_MAX_DESCRIPTION_LENGTH: usize = 1024;
/// Descriptions longer than this (but within the maximum) draw a warning
pub const DEFAULT_DESCRIPTION_WARNING_LENGTH: usize = 960;
/// Recorded as `base-skill-version` when the source declares no version
pub const DEFAULT_BASE_VERSION_SENTINEL: &str = "unversioned";

/// Bounds applied by the structure validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct ValidationPolicy {
    pub max_name_length: usize,
    pub max_description_length: usize,
    pub description_warning_length: usize,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            max_description_length: DEFAULT_MAX_DESCRIPTION_LENGTH,
            description_warning_length: DEFAULT_DESCRIPTION_WARNING_LENGTH,
        }
    }
}

/// Settings used when forking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct LineagePolicy {
    pub base_version_sentinel: String,
}

impl Default for LineagePolicy {
    fn default() -> Self {
        Self {
            base_version_sentinel: DEFAULT_BASE_VERSION_SENTINEL.to_string(),
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Config {
    pub validation: ValidationPolicy,
    pub lineage: LineagePolicy,
}

impl Config {
    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // an empty file means "all defaults"
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to the user config file and then defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => {
                debug!("no configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| crate::error::fs::read_failed(path, &e))?;
        debug!(path = %path.display(), "loading configuration");
        Self::from_yaml(&yaml).map_err(|e| match e {
            SkillforkError::ConfigParseFailed { reason, .. } => SkillforkError::ConfigParseFailed {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Check that the configured bounds are consistent
    pub fn validate(&self) -> Result<()> {
        let v = &self.validation;
        if v.max_name_length == 0 {
            return Err(SkillforkError::ConfigInvalid {
                message: "validation.max-name-length must be at least 1".to_string(),
            });
        }
        if v.max_description_length == 0 {
            return Err(SkillforkError::ConfigInvalid {
                message: "validation.max-description-length must be at least 1".to_string(),
            });
        }
        if v.description_warning_length > v.max_description_length {
            return Err(SkillforkError::ConfigInvalid {
                message: format!(
                    "validation.description-warning-length ({}) exceeds max-description-length ({})",
                    v.description_warning_length, v.max_description_length
                ),
            });
        }
        if self.lineage.base_version_sentinel.trim().is_empty() {
            return Err(SkillforkError::ConfigInvalid {
                message: "lineage.base-version-sentinel must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// `<config dir>/skillfork/config.yaml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("skillfork").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.validation.max_name_length, 64);
        assert_eq!(config.validation.max_description_length, 1024);
        assert_eq!(config.lineage.base_version_sentinel, "unversioned");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            "validation:\n  max-description-length: 200\n  description-warning-length: 150\n",
        )
        .unwrap();
        assert_eq!(config.validation.max_description_length, 200);
        assert_eq!(config.validation.max_name_length, 64);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = Config::from_yaml("validation:\n  max-lenght: 3\n").unwrap_err();
        assert!(matches!(err, SkillforkError::ConfigParseFailed { .. }));
    }

    #[test]
    fn test_warning_above_max_rejected() {
        let err = Config::from_yaml(
            "validation:\n  max-description-length: 100\n  description-warning-length: 200\n",
        )
        .unwrap_err();
        assert!(matches!(err, SkillforkError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "lineage:\n  base-version-sentinel: \"0.0\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.lineage.base_version_sentinel, "0.0");
    }

    #[test]
    fn test_load_explicit_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "validation: [").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let err = Config::load(Some(&temp.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, SkillforkError::FileNotFound { .. }));
    }
}
