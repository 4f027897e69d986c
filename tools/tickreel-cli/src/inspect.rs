//! Inspect command - summarize a TASfile without loading it into a session

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tickreel_core::tasfile::{DEFAULT_SEPARATOR, ParsedTasFile};
use tickreel_core::{ExtensionRegistry, SerialiserFlavor, TasFileCodec, V1Flavor};

/// Arguments for the inspect command
#[derive(Args)]
pub struct InspectArgs {
    /// TASfile to inspect (.tas)
    pub file: PathBuf,

    /// Header key/value separator the file was written with
    #[arg(long, default_value_t = DEFAULT_SEPARATOR)]
    pub separator: char,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub flavor: String,
    pub ticks: usize,
    pub blocks: Vec<BlockReport>,
    /// Command name to number of uses
    pub commands: BTreeMap<String, CommandCount>,
}

#[derive(Debug, Serialize)]
pub struct BlockReport {
    pub name: String,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Serialize)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandCount {
    pub inline: usize,
    pub endline: usize,
}

/// Every flavor this build can read.
pub fn flavors() -> ExtensionRegistry<dyn SerialiserFlavor> {
    let mut flavors: ExtensionRegistry<dyn SerialiserFlavor> = ExtensionRegistry::new("flavor");
    flavors.register(Box::new(V1Flavor));
    flavors
}

pub fn build_report(parsed: &ParsedTasFile) -> Report {
    let blocks = parsed
        .metadata
        .iter()
        .map(|block| BlockReport {
            name: block.extension_name().to_string(),
            entries: block
                .iter()
                .map(|(key, value)| Entry {
                    key: key.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        })
        .collect();

    let mut commands: BTreeMap<String, CommandCount> = BTreeMap::new();
    for tick in &parsed.ticks {
        for command in &tick.inline {
            commands.entry(command.name.clone()).or_default().inline += 1;
        }
        for command in &tick.endline {
            commands.entry(command.name.clone()).or_default().endline += 1;
        }
    }

    Report {
        flavor: parsed.flavor.clone(),
        ticks: parsed.tick_count(),
        blocks,
        commands,
    }
}

/// Execute the inspect command
pub fn execute(args: InspectArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let codec = TasFileCodec::new(args.separator, V1Flavor::NAME)?;
    let parsed = codec
        .parse(&text, &flavors())
        .with_context(|| format!("Failed to parse {}", args.file.display()))?;
    let report = build_report(&parsed);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("=== {} ===", args.file.display());
    println!("  Flavor: {}", report.flavor);
    println!("  Ticks:  {}", report.ticks);

    for block in &report.blocks {
        println!();
        println!("[{}]", block.name);
        for entry in &block.entries {
            println!("  {} = {}", entry.key, entry.value);
        }
    }

    if !report.commands.is_empty() {
        println!();
        println!("Commands:");
        for (name, count) in &report.commands {
            println!(
                "  ${name:<16} inline: {:<6} endline: {}",
                count.inline, count.endline
            );
        }
    }

    Ok(())
}
