//! Validate command implementation

use console::Style;
use skillfork::config::Config;
use skillfork::error::{Result, SkillforkError};
use skillfork::storage::FsStorage;
use skillfork::validation::validate_bundle;

use crate::cli::ValidateArgs;
use crate::commands::print_findings;

/// Run validate command
///
/// Prints every finding. Fails with [`SkillforkError::ValidationFailed`] when any finding
/// is an error.
pub fn run(config: &Config, args: ValidateArgs) -> Result<()> {
    let storage = FsStorage::new();
    let (bundle, result) = validate_bundle(&storage, &args.bundle, &config.validation)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.is_empty() {
        println!(
            "{} {} is valid",
            Style::new().green().bold().apply_to("OK"),
            bundle.dir_name()
        );
    } else {
        println!(
            "{}: {} error(s), {} warning(s)",
            Style::new().bold().apply_to(bundle.dir_name()),
            result.error_count(),
            result.warning_count()
        );
        print_findings(result.findings(), false);
    }

    if result.is_packageable() {
        Ok(())
    } else {
        Err(SkillforkError::ValidationFailed {
            errors: result.error_count(),
        })
    }
}
