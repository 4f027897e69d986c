//! TASfile writer

use std::fmt::Write as _;

use crate::extension::Extensions;
use crate::playback::TickLog;

use super::command::{FileCommand, format_composite, merge};
use super::flavor::SerialiserFlavor;
use super::{
    COMMENT_PREFIX, ENDLINE_MARKER, FLAVOR_PREFIX, FILE_MAGIC, START_DATA, SerializationError,
};

/// Render the whole file in memory. Nothing is returned unless every block,
/// command and input could be written.
pub(crate) fn write_tasfile(
    separator: char,
    flavor: &dyn SerialiserFlavor,
    extensions: &mut Extensions,
    log: &TickLog,
) -> Result<String, SerializationError> {
    let mut out = String::new();
    let _ = writeln!(out, "{FILE_MAGIC}");
    let _ = writeln!(out, "{FLAVOR_PREFIX}{}", flavor.name());

    for ext in extensions.metadata.enabled_mut() {
        let block_name = ext.name().to_string();
        validate_block_name(&block_name, separator)?;

        let metadata = ext.on_store()?;
        metadata.check_separator(separator)?;

        let _ = writeln!(out, "[{block_name}]");
        for (key, value) in metadata.iter() {
            let _ = writeln!(out, "{key}{separator}{value}");
        }
    }

    let _ = writeln!(out, "{START_DATA}");

    // Commands are routed back on load by name, so each one must belong to
    // its producer and to no earlier producer.
    let owners: Vec<&[&'static str]> = extensions
        .file_commands
        .enabled()
        .map(|ext| ext.command_names())
        .collect();

    for (tick, input) in log.iter() {
        let mut inline = Vec::new();
        let mut endline = Vec::new();
        for (i, ext) in extensions.file_commands.enabled().enumerate() {
            let (earlier, own) = (&owners[..i], owners[i]);
            inline.push(validated(ext.on_serialise_inline(tick), own, earlier)?);
            endline.push(validated(ext.on_serialise_endline(tick), own, earlier)?);
        }

        for line in merge(inline) {
            let _ = writeln!(out, "{}", format_composite(&line));
        }

        let encoded = flavor.encode_input(tick, input)?;
        let mut endline = merge(endline).into_iter();
        match endline.next() {
            Some(first) => {
                let _ = writeln!(out, "{tick}|{encoded}{ENDLINE_MARKER}{}", format_composite(&first));
            }
            None => {
                let _ = writeln!(out, "{tick}|{encoded}");
            }
        }
        for line in endline {
            let _ = writeln!(out, "{ENDLINE_MARKER}{}", format_composite(&line));
        }
    }

    Ok(out)
}

fn validated(
    commands: Vec<FileCommand>,
    own: &[&str],
    earlier: &[&[&str]],
) -> Result<Vec<FileCommand>, SerializationError> {
    for command in &commands {
        command.validate()?;

        let name = command.name.as_str();
        let reason = if !own.contains(&name) {
            "not among the producing extension's command names"
        } else if earlier.iter().any(|names| names.contains(&name)) {
            "already claimed by an earlier extension"
        } else {
            continue;
        };
        return Err(SerializationError::InvalidCommand {
            name: command.name.clone(),
            reason,
        });
    }
    Ok(commands)
}

fn validate_block_name(name: &str, separator: char) -> Result<(), SerializationError> {
    let bad = name.is_empty()
        || name.starts_with(COMMENT_PREFIX)
        || name.contains(['[', ']', '\n', '\r', separator]);
    if bad {
        return Err(SerializationError::InvalidBlockName(name.to_string()));
    }
    Ok(())
}
