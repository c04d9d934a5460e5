//! Skillfork - fork, validate and package skills
//!
//! A skill is a directory with a `SKILL.md` whose `---` delimited header carries its
//! name, description and fork lineage. The library exposes four operations over explicit
//! paths:
//!
//! - [`metadata::parse_document`] reads the header
//! - [`validation::StructureValidator`] checks a skill and reports every finding at once
//! - [`lineage::LineageTracker`] forks skills and records customizations
//! - [`package::PackageBuilder`] validates and writes a timestamped zip atomically
//!
//! All filesystem access goes through [`storage::Storage`].

pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod hash;
pub mod lineage;
pub mod logging;
pub mod metadata;
pub mod package;
pub mod progress;
pub mod storage;
pub mod transaction;
pub mod validation;
