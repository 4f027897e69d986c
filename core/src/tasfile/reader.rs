//! TASfile reader
//!
//! Parsing is pure: the text is turned into a [`ParsedTasFile`] without
//! touching any extension, so a corrupt file is rejected before any state
//! is replaced.

use tickreel_shared::TickIndex;

use crate::extension::ExtensionRegistry;
use crate::playback::TickInputContainer;

use super::command::{FileCommand, parse_composite};
use super::flavor::SerialiserFlavor;
use super::{
    COMMENT_PREFIX, ENDLINE_MARKER, FILE_MAGIC, FLAVOR_PREFIX, LoadError, PlaybackMetadata,
    START_DATA,
};

/// One tick as read from the body.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTick {
    pub input: TickInputContainer,
    /// Commands of every inline line before the tick line, in file order
    pub inline: Vec<FileCommand>,
    /// Commands appended to the tick line and its continuation lines
    pub endline: Vec<FileCommand>,
}

/// A TASfile that parsed cleanly but has not been applied yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTasFile {
    pub flavor: String,
    /// Header blocks in file order
    pub metadata: Vec<PlaybackMetadata>,
    /// Ticks, contiguous from 0
    pub ticks: Vec<ParsedTick>,
}

impl ParsedTasFile {
    pub fn tick_count(&self) -> usize {
        self.ticks.len()
    }
}

pub(crate) fn read_tasfile(
    text: &str,
    separator: char,
    flavors: &ExtensionRegistry<dyn SerialiserFlavor>,
) -> Result<ParsedTasFile, LoadError> {
    // 1-based line numbers for error messages
    let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));

    match lines.next() {
        Some((_, line)) if line.trim_end() == FILE_MAGIC => {}
        _ => return Err(LoadError::MissingHeader),
    }

    let flavor_name = match lines.next() {
        Some((n, line)) => match line.strip_prefix(FLAVOR_PREFIX) {
            Some(name) => name.trim().to_string(),
            None => return Err(LoadError::malformed(n, "expected `# Flavor: <name>`")),
        },
        None => return Err(LoadError::malformed(1, "missing flavor line")),
    };
    let flavor = flavors
        .enabled()
        .find(|f| f.name() == flavor_name)
        .ok_or_else(|| LoadError::UnknownFlavor(flavor_name.clone()))?;

    let metadata = read_header(&mut lines, separator)?;
    let ticks = read_body(&mut lines, flavor)?;

    Ok(ParsedTasFile {
        flavor: flavor_name,
        metadata,
        ticks,
    })
}

fn read_header<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    separator: char,
) -> Result<Vec<PlaybackMetadata>, LoadError> {
    let mut blocks: Vec<PlaybackMetadata> = Vec::new();
    let mut last_line = 2;

    for (n, line) in lines.by_ref() {
        last_line = n;
        if line.trim_end() == START_DATA {
            return Ok(blocks);
        }
        if line.trim().is_empty() || line.starts_with(COMMENT_PREFIX) {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            if blocks.iter().any(|b| b.extension_name() == name) {
                return Err(LoadError::malformed(n, format!("duplicate block [{name}]")));
            }
            blocks.push(PlaybackMetadata::with_separator(name, separator));
            continue;
        }

        let Some(block) = blocks.last_mut() else {
            return Err(LoadError::malformed(n, "key/value line outside of a block"));
        };
        let Some((key, value)) = line.split_once(separator) else {
            return Err(LoadError::malformed(
                n,
                format!("expected key{separator}value"),
            ));
        };
        block
            .set_value(key, value)
            .map_err(|e| LoadError::malformed(n, e.to_string()))?;
    }

    Err(LoadError::malformed(last_line, "missing `# Start Data`"))
}

fn read_body<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    flavor: &dyn SerialiserFlavor,
) -> Result<Vec<ParsedTick>, LoadError> {
    let mut ticks: Vec<ParsedTick> = Vec::new();
    let mut pending_inline: Vec<FileCommand> = Vec::new();
    let mut last_line = 0;

    for (n, line) in lines {
        last_line = n;

        if let Some(composite) = line.strip_prefix(ENDLINE_MARKER) {
            let Some(tick) = ticks.last_mut() else {
                return Err(LoadError::malformed(n, "endline commands before the first tick"));
            };
            if !pending_inline.is_empty() {
                return Err(LoadError::malformed(
                    n,
                    "endline commands after inline commands of the next tick",
                ));
            }
            let commands = parse_composite(composite).map_err(|e| LoadError::malformed(n, e))?;
            tick.endline.extend(commands);
            continue;
        }

        if line.trim().is_empty() || line.starts_with(COMMENT_PREFIX) {
            continue;
        }

        if line.starts_with('$') {
            let commands = parse_composite(line).map_err(|e| LoadError::malformed(n, e))?;
            pending_inline.extend(commands);
            continue;
        }

        let Some((index, rest)) = line.split_once('|') else {
            return Err(LoadError::malformed(n, "expected `<tick>|<input>`"));
        };
        let expected = TickIndex(ticks.len() as u64);
        match index.trim().parse::<u64>() {
            Ok(t) if TickIndex(t) == expected => {}
            Ok(t) => {
                return Err(LoadError::malformed(
                    n,
                    format!("expected tick {expected}, found {t}"),
                ));
            }
            Err(e) => return Err(LoadError::malformed(n, format!("bad tick {index:?}: {e}"))),
        }

        let (encoded, endline) = match rest.split_once(ENDLINE_MARKER) {
            Some((encoded, composite)) => (
                encoded,
                parse_composite(composite).map_err(|e| LoadError::malformed(n, e))?,
            ),
            None => (rest, Vec::new()),
        };
        let input = flavor
            .decode_input(encoded)
            .map_err(|e| LoadError::malformed(n, e))?;

        ticks.push(ParsedTick {
            input,
            inline: std::mem::take(&mut pending_inline),
            endline,
        });
    }

    if !pending_inline.is_empty() {
        return Err(LoadError::malformed(
            last_line,
            "inline commands after the last tick",
        ));
    }

    Ok(ticks)
}
