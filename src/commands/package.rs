//! Package command implementation

use std::io::IsTerminal;

use console::Style;
use skillfork::clock::SystemClock;
use skillfork::config::Config;
use skillfork::error::Result;
use skillfork::package::PackageBuilder;
use skillfork::progress::{NoProgress, Progress, ProgressDisplay};
use skillfork::storage::FsStorage;

use crate::cli::PackageArgs;
use crate::commands::print_findings;

/// Run package command
pub fn run(config: &Config, args: PackageArgs) -> Result<()> {
    let storage = FsStorage::new();
    let display;
    let progress: &dyn Progress = if args.no_progress || !std::io::stderr().is_terminal() {
        &NoProgress
    } else {
        display = ProgressDisplay::new();
        &display
    };

    let outcome = PackageBuilder::new(&storage, &SystemClock, &config.validation)
        .with_progress(progress)
        .package(&args.bundle, &args.output)?;

    if !outcome.validation.is_empty() {
        println!(
            "{} {} warning(s)",
            Style::new().yellow().bold().apply_to("Packaged with"),
            outcome.validation.warning_count()
        );
        print_findings(outcome.validation.findings(), false);
    }

    let artifact = &outcome.artifact;
    println!(
        "{} {}",
        Style::new().green().bold().apply_to("Packaged"),
        artifact.path.display()
    );
    println!("  {} {}", Style::new().bold().apply_to("Files:"), artifact.file_count);
    println!("  {} {}", Style::new().bold().apply_to("Size:"), artifact.formatted_size());
    println!("  {} {}", Style::new().bold().apply_to("Digest:"), artifact.digest);
    Ok(())
}
