//! Config command - show or change settings

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use tickreel_core::ConfigStore;
use tickreel_core::config::ConfigKey;

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Config file to use instead of the platform default
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Restore a key to its default value
    #[arg(long, value_name = "KEY")]
    pub reset: Option<String>,

    /// Set a key, as `key=value`
    #[arg(long, value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Remove a key from the file
    #[arg(long, value_name = "KEY")]
    pub delete: Option<String>,
}

/// Execute the config command
pub fn execute(args: ConfigArgs) -> Result<()> {
    let mut store = match &args.file {
        Some(path) => {
            let mut store = ConfigStore::new(path);
            store.load()?;
            store
        }
        None => ConfigStore::open_default()?,
    };

    let changed = apply(&mut store, &args)?;
    if changed {
        store
            .save()
            .with_context(|| format!("Failed to write {}", store.path().display()))?;
    }

    println!("# {}", store.path().display());
    for (key, value) in store.iter() {
        let marker = match ConfigKey::lookup(key) {
            Some(known) if known.default != value => " (changed)",
            Some(_) => "",
            None => " (unknown key)",
        };
        println!("{key} = {value}{marker}");
    }
    Ok(())
}

/// Apply the requested edits. Returns whether anything changed.
fn apply(store: &mut ConfigStore, args: &ConfigArgs) -> Result<bool> {
    let mut changed = false;

    for assignment in &args.set {
        let Some((key, value)) = assignment.split_once('=') else {
            bail!("Expected key=value, got {assignment:?}");
        };
        store.set(key.trim(), value.trim());
        changed = true;
    }

    if let Some(key) = &args.reset {
        if !store.reset(key) {
            bail!("Unknown config key {key:?}");
        }
        tracing::info!(key = %key, "Reset config key");
        changed = true;
    }

    if let Some(key) = &args.delete {
        if store.delete(key) {
            changed = true;
        } else {
            tracing::warn!(key = %key, "Config key not set, nothing to delete");
        }
    }

    Ok(changed)
}
