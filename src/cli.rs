//! CLI definitions using clap derive API

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Skillfork - fork, validate and package skills
///
/// Derive customized skills from existing ones, track their lineage, and package them
/// into timestamped archives.
#[derive(Parser, Debug)]
#[command(
    name = "skillfork",
    author,
    version,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Fork, validate and package skills",
    long_about = "Skillfork derives customized skills from existing ones, records their \
                  lineage and customization history, validates their structure, and packages \
                  them into timestamped archives.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n    \
                  skillfork fork ./skills/pdf finance-pdf --path ./out\n    \
                  skillfork record ./out/finance-pdf 1.1 \"Use fiscal quarters\"\n    \
                  skillfork validate ./out/finance-pdf\n    \
                  skillfork package ./out/finance-pdf ./dist\n\n\
                  \x1b[1m\x1b[32mExit codes:\x1b[0m\n    \
                  0  success\n    \
                  1  validation, metadata or lineage error\n    \
                  2  I/O or environment error"
)]
pub struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, short = 'c', global = true, env = "SKILLFORK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a customized copy of a skill
    Fork(ForkArgs),

    /// Check a skill's metadata and layout
    Validate(ValidateArgs),

    /// Validate a skill and write a timestamped archive
    Package(PackageArgs),

    /// Record a customization in a skill's history
    Record(RecordArgs),

    /// Show version information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the fork command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Fork into the current directory:\n    skillfork fork ./skills/pdf finance-pdf\n\n\
                  Fork into another directory:\n    skillfork fork ./skills/pdf finance-pdf --path ./out")]
pub struct ForkArgs {
    /// Directory of the skill to fork
    pub source: PathBuf,

    /// Name of the new skill (lowercase letters, digits and hyphens)
    pub new_name: String,

    /// Directory to create the new skill in
    #[arg(long, short = 'p', default_value = ".")]
    pub path: PathBuf,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Directory of the skill to validate
    pub bundle: PathBuf,

    /// Print findings as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the package command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Package into the current directory:\n    skillfork package ./finance-pdf\n\n\
                  Package into a dist directory:\n    skillfork package ./finance-pdf ./dist")]
pub struct PackageArgs {
    /// Directory of the skill to package
    pub bundle: PathBuf,

    /// Directory to write the archive to
    #[arg(default_value = ".")]
    pub output: PathBuf,

    /// Do not show a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the record command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  skillfork record ./finance-pdf 1.1 \"Use fiscal quarters in summaries\"\n  \
                  skillfork record ./finance-pdf 1.2 \"Shorter output\" --verify \"Checked Q3 report\"")]
pub struct RecordArgs {
    /// Directory of the skill
    pub bundle: PathBuf,

    /// New customization version; must exceed the current one
    pub version: String,

    /// What changed
    pub description: String,

    /// How the change was verified
    #[arg(long)]
    pub verify: Option<String>,
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    skillfork completions --shell bash > ~/.bash_completion.d/skillfork\n\n\
                  Generate zsh completions:\n    skillfork completions --shell zsh > ~/.zfunc/_skillfork\n\n\
                  Generate fish completions:\n    skillfork completions --shell fish > ~/.config/fish/completions/skillfork.fish")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    #[arg(long)]
    pub shell: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_fork() {
        let cli = Cli::try_parse_from([
            "skillfork",
            "fork",
            "./skills/pdf",
            "finance-pdf",
            "--path",
            "./out",
        ])
        .unwrap();
        match cli.command {
            Commands::Fork(args) => {
                assert_eq!(args.source, PathBuf::from("./skills/pdf"));
                assert_eq!(args.new_name, "finance-pdf");
                assert_eq!(args.path, PathBuf::from("./out"));
            }
            _ => panic!("Expected Fork command"),
        }
    }

    #[test]
    fn test_cli_parsing_fork_default_path() {
        let cli = Cli::try_parse_from(["skillfork", "fork", "pdf", "finance-pdf"]).unwrap();
        match cli.command {
            Commands::Fork(args) => assert_eq!(args.path, PathBuf::from(".")),
            _ => panic!("Expected Fork command"),
        }
    }

    #[test]
    fn test_cli_parsing_validate_json() {
        let cli = Cli::try_parse_from(["skillfork", "validate", "finance-pdf", "--json"]).unwrap();
        match cli.command {
            Commands::Validate(args) => {
                assert_eq!(args.bundle, PathBuf::from("finance-pdf"));
                assert!(args.json);
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_cli_parsing_package() {
        let cli = Cli::try_parse_from(["skillfork", "package", "finance-pdf"]).unwrap();
        match cli.command {
            Commands::Package(args) => {
                assert_eq!(args.output, PathBuf::from("."));
                assert!(!args.no_progress);
            }
            _ => panic!("Expected Package command"),
        }

        let cli = Cli::try_parse_from(["skillfork", "package", "finance-pdf", "./dist"]).unwrap();
        match cli.command {
            Commands::Package(args) => assert_eq!(args.output, PathBuf::from("./dist")),
            _ => panic!("Expected Package command"),
        }
    }

    #[test]
    fn test_cli_parsing_record() {
        let cli = Cli::try_parse_from([
            "skillfork",
            "record",
            "finance-pdf",
            "1.1",
            "Use fiscal quarters",
            "--verify",
            "Checked Q3",
        ])
        .unwrap();
        match cli.command {
            Commands::Record(args) => {
                assert_eq!(args.version, "1.1");
                assert_eq!(args.description, "Use fiscal quarters");
                assert_eq!(args.verify.as_deref(), Some("Checked Q3"));
            }
            _ => panic!("Expected Record command"),
        }
    }

    #[test]
    fn test_cli_parsing_version() {
        let cli = Cli::try_parse_from(["skillfork", "version"]).unwrap();
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::try_parse_from([
            "skillfork",
            "validate",
            "x",
            "-v",
            "--config",
            "/tmp/skillfork.yaml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/skillfork.yaml")));
    }

    #[test]
    fn test_cli_parsing_completions() {
        let cli = Cli::try_parse_from(["skillfork", "completions", "--shell", "bash"]).unwrap();
        match cli.command {
            Commands::Completions(args) => {
                assert_eq!(args.shell, "bash");
            }
            _ => panic!("Expected Completions command"),
        }
    }
}
