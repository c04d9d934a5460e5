//! Version command implementation

use skillfork::config::default_config_path;
use skillfork::error::Result;

/// Run version command
pub fn run() -> Result<()> {
    println!("skillfork {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Build info:");
    println!("  Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    println!("  Profile: {}", build_profile());
    if let Some(path) = default_config_path() {
        println!("  Config: {}", path.display());
    }

    Ok(())
}

fn build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}
