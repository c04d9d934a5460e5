//! Domain models for Skillfork
//!
//! This module contains the skill bundle layout and its derived lifecycle state.

pub mod bundle;

pub use bundle::{
    Bundle, BundleState, CUSTOMIZATION_LOG, OPTIONAL_DIRS, PRIMARY_DOCUMENT,
    check_slug,
};
