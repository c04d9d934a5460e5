//! Fork command implementation

use console::Style;
use skillfork::clock::SystemClock;
use skillfork::config::Config;
use skillfork::error::Result;
use skillfork::lineage::LineageTracker;
use skillfork::storage::FsStorage;

use crate::cli::ForkArgs;

/// Run fork command
pub fn run(config: &Config, args: ForkArgs) -> Result<()> {
    let storage = FsStorage::new();
    let tracker = LineageTracker::new(&storage, &SystemClock, config);
    let outcome = tracker.fork(&args.source, &args.new_name, &args.path)?;

    println!(
        "{} {} from {} (base version {})",
        Style::new().green().bold().apply_to("Forked"),
        Style::new().bold().apply_to(&args.new_name),
        outcome.source_name,
        outcome.base_version
    );
    println!("  {}", outcome.destination.display());
    println!();
    println!("Next steps:");
    println!("  Edit SKILL.md and the bundled resources");
    println!(
        "  skillfork record {} <version> \"<what changed>\"",
        outcome.destination.display()
    );
    Ok(())
}
