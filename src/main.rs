//! Skillfork - fork, validate and package skills
//!
//! Command line front end over the `skillfork` library. Exit codes: 0 on success, 1 for
//! metadata, validation and lineage errors, 2 for I/O and environment errors.

use clap::Parser;
use console::Style;
use miette::Diagnostic;

mod cli;
mod commands;

use cli::{Cli, Commands};
use skillfork::config::Config;
use skillfork::error::{Result, SkillforkError};
use skillfork::logging;

fn run(cli: Cli) -> Result<()> {
    let config = match cli.command {
        Commands::Fork(_) | Commands::Validate(_) | Commands::Package(_) | Commands::Record(_) => {
            Config::load(cli.config.as_deref())?
        }
        Commands::Version | Commands::Completions(_) => Config::default(),
    };

    match cli.command {
        Commands::Fork(args) => commands::fork::run(&config, args),
        Commands::Validate(args) => commands::validate::run(&config, args),
        Commands::Package(args) => commands::package::run(&config, args),
        Commands::Record(args) => commands::record::run(&config, args),
        Commands::Version => commands::version::run(),
        Commands::Completions(args) => commands::completions::run(args),
    }
}

fn report(err: &SkillforkError) {
    if let SkillforkError::PackagingAborted { result } = err {
        commands::print_findings(result.findings(), true);
    }
    eprintln!("{} {}", Style::new().red().bold().apply_to("Error:"), err);
    if let Some(help) = err.help() {
        eprintln!("  {} {}", Style::new().cyan().apply_to("help:"), help);
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        report(&e);
        std::process::exit(e.exit_code());
    }
}
