//! Validate command - load a TASfile through the built-in extensions

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tickreel_core::extension::builtin::{
    CreditsExtension, DesyncMonitorExtension, LabelExtension, Position, StartPositionExtension,
};
use tickreel_core::tasfile::DEFAULT_SEPARATOR;
use tickreel_core::{SessionSettings, TasSession};

/// Arguments for the validate command
#[derive(Args)]
pub struct ValidateArgs {
    /// TASfile to validate (.tas)
    pub file: PathBuf,

    /// Header key/value separator the file was written with
    #[arg(long, default_value_t = DEFAULT_SEPARATOR)]
    pub separator: char,
}

/// Session with every built-in extension registered.
fn validation_session(separator: char) -> Result<TasSession> {
    let mut session = TasSession::with_settings(SessionSettings {
        separator,
        tick_sync: false,
        ..SessionSettings::default()
    })?;

    // Nothing is simulated here, so every probe reads the origin
    let origin = Arc::new(Position::default);
    let extensions = session.extensions_mut();
    extensions
        .metadata
        .register(Box::new(CreditsExtension::default()));
    extensions
        .metadata
        .register(Box::new(StartPositionExtension::new()));
    extensions
        .file_commands
        .register(Box::new(LabelExtension::new()));
    extensions
        .file_commands
        .register(Box::new(DesyncMonitorExtension::new(origin)));
    Ok(session)
}

/// Load `text` and render it again.
///
/// Returns the tick count and whether the re-rendered file matches the
/// input byte for byte.
pub fn check(text: &str, separator: char) -> Result<(usize, bool)> {
    let mut session = validation_session(separator)?;
    session.load_from_str(text)?;
    let ticks = session.controller().log().len();
    let rendered = session
        .save_to_string()
        .context("Loaded file could not be written back")?;
    Ok((ticks, rendered == text))
}

/// Execute the validate command
pub fn execute(args: ValidateArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let (ticks, canonical) = check(&text, args.separator)
        .with_context(|| format!("{} is not a valid TASfile", args.file.display()))?;

    println!("{}: OK ({ticks} ticks)", args.file.display());
    if !canonical {
        // Unknown blocks, unknown commands and comments are dropped on load
        println!("  Note: saving this file again would change its contents");
    }
    Ok(())
}
