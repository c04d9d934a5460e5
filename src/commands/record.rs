//! Record command implementation

use console::Style;
use skillfork::clock::SystemClock;
use skillfork::config::Config;
use skillfork::error::Result;
use skillfork::lineage::LineageTracker;
use skillfork::storage::FsStorage;

use crate::cli::RecordArgs;

/// Run record command
pub fn run(config: &Config, args: RecordArgs) -> Result<()> {
    let storage = FsStorage::new();
    let tracker = LineageTracker::new(&storage, &SystemClock, config);
    let outcome = tracker.record_customization(
        &args.bundle,
        &args.version,
        &args.description,
        args.verify.as_deref(),
    )?;

    let previous = outcome
        .previous
        .map(|v| v.to_string())
        .unwrap_or_else(|| "none".to_string());
    println!(
        "{} version {} (was {})",
        Style::new().green().bold().apply_to("Recorded"),
        Style::new().bold().apply_to(&outcome.version),
        previous
    );
    println!("  {}", outcome.log_path.display());
    Ok(())
}
