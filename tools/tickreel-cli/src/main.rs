//! tickreel CLI - inspect and validate TASfiles
//!
//! # Commands
//!
//! - `tickreel inspect <file>` - Show flavor, header blocks, tick and command counts
//! - `tickreel validate <file>` - Load a file through the built-in extensions
//! - `tickreel config` - Show or change settings
//!
//! # Usage
//!
//! ```bash
//! # Summary of a recording
//! tickreel inspect saves/tasfiles/any_percent.tas
//!
//! # Same, as JSON
//! tickreel inspect any_percent.tas --json
//!
//! # Restore the default separator
//! tickreel config --reset tasfile.separator
//! ```

mod config;
mod inspect;
mod validate;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// tickreel CLI - TASfile tools
#[derive(Parser)]
#[command(name = "tickreel")]
#[command(about = "Inspect and validate TASfiles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what a TASfile contains
    Inspect(inspect::InspectArgs),

    /// Check that a TASfile loads cleanly
    Validate(validate::ValidateArgs),

    /// Show or change settings
    Config(config::ConfigArgs),
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect(args) => inspect::execute(args),
        Commands::Validate(args) => validate::execute(args),
        Commands::Config(args) => config::execute(args),
    }
}
