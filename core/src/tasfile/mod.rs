//! TASfile codec
//!
//! Text format for a recorded tick log plus the state of every extension
//! that took part in the recording.
//!
//! # File Format
//!
//! ```text
//! # TASfile
//! # Flavor: v1
//! [Credits]
//! Author:Alice
//! [StartPosition]
//! x:0.5
//! # Start Data
//! $label intro;
//! 0|W,LSHIFT;LC;12,-3,0;17.5,-90.0		// $desync 1,64,2;
//! 1|;;0,0,0;17.5,-90.0
//! ```
//!
//! The header holds one `[name]` block per enabled metadata extension. The
//! body holds, per tick, the merged inline commands of every file command
//! extension, then the tick line with the flavor-encoded input, then the
//! merged endline commands (first one on the tick line, the rest on
//! `\t\t// ` continuation lines). See [`command`] for the merge.

pub mod command;
mod error;
mod flavor;
mod metadata;
mod reader;
mod writer;

pub use command::FileCommand;
pub use error::{LoadError, SerializationError};
pub use flavor::{SerialiserFlavor, V1Flavor};
pub use metadata::{DEFAULT_SEPARATOR, PlaybackMetadata, validate_separator};
pub use reader::{ParsedTasFile, ParsedTick};

use tickreel_shared::TickIndex;

use crate::extension::{ExtensionRegistry, Extensions};
use crate::playback::TickLog;

pub(crate) const FILE_MAGIC: &str = "# TASfile";
pub(crate) const FLAVOR_PREFIX: &str = "# Flavor: ";
pub(crate) const START_DATA: &str = "# Start Data";
pub(crate) const ENDLINE_MARKER: &str = "\t\t// ";
pub(crate) const COMMENT_PREFIX: char = '#';

/// File extension used for TASfiles on disk.
pub const TASFILE_EXTENSION: &str = "tas";

/// Settings for reading and writing TASfiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TasFileCodec {
    separator: char,
    /// Flavor new files are written with
    flavor: String,
}

impl TasFileCodec {
    pub fn new(separator: char, flavor: impl Into<String>) -> Result<Self, SerializationError> {
        validate_separator(separator)?;
        Ok(Self {
            separator,
            flavor: flavor.into(),
        })
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn flavor(&self) -> &str {
        &self.flavor
    }

    /// Render the log and every enabled extension's state.
    pub fn save(
        &self,
        flavors: &ExtensionRegistry<dyn SerialiserFlavor>,
        extensions: &mut Extensions,
        log: &TickLog,
    ) -> Result<String, SerializationError> {
        let flavor = flavors
            .enabled()
            .find(|f| f.name() == self.flavor)
            .ok_or_else(|| SerializationError::UnknownFlavor(self.flavor.clone()))?;

        writer::write_tasfile(self.separator, flavor, extensions, log)
    }

    /// Parse a file without touching any extension.
    ///
    /// The flavor named in the header is used, whatever [`Self::flavor`] is.
    pub fn parse(
        &self,
        text: &str,
        flavors: &ExtensionRegistry<dyn SerialiserFlavor>,
    ) -> Result<ParsedTasFile, LoadError> {
        reader::read_tasfile(text, self.separator, flavors)
    }

    /// Hand a parsed file to the extensions and return the tick log.
    ///
    /// Header blocks go to the enabled metadata extension of the same name;
    /// blocks nobody claims are skipped. Commands are routed to the first
    /// enabled file command extension that claims their name; unclaimed
    /// commands are dropped. On error the extensions may be partially
    /// loaded and should be cleared.
    pub fn apply(
        &self,
        parsed: ParsedTasFile,
        extensions: &mut Extensions,
    ) -> Result<(TickLog, Vec<PlaybackMetadata>), LoadError> {
        for block in &parsed.metadata {
            match extensions.metadata.get_enabled_mut(block.extension_name()) {
                Some(ext) => ext.on_load(block)?,
                None => tracing::warn!(
                    extension = block.extension_name(),
                    "No enabled metadata extension for header block, skipping"
                ),
            }
        }

        let owners: Vec<Vec<&'static str>> = extensions
            .file_commands
            .enabled()
            .map(|ext| ext.command_names().to_vec())
            .collect();
        let owners: Vec<&[&str]> = owners.iter().map(Vec::as_slice).collect();

        let mut log = TickLog::new();
        for (i, tick) in parsed.ticks.into_iter().enumerate() {
            let index = TickIndex(i as u64);

            let inline = command::demux(tick.inline, &owners);
            warn_unclaimed(index, &inline.unclaimed);
            for (ext, queue) in extensions.file_commands.enabled_mut().zip(inline.queues) {
                if !queue.is_empty() {
                    ext.on_deserialise_inline(index, queue)?;
                }
            }

            let endline = command::demux(tick.endline, &owners);
            warn_unclaimed(index, &endline.unclaimed);
            for (ext, queue) in extensions.file_commands.enabled_mut().zip(endline.queues) {
                if !queue.is_empty() {
                    ext.on_deserialise_endline(index, queue)?;
                }
            }

            log.push(tick.input);
        }

        Ok((log, parsed.metadata))
    }
}

impl Default for TasFileCodec {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            flavor: V1Flavor::NAME.to_string(),
        }
    }
}

fn warn_unclaimed(tick: TickIndex, commands: &[command::FileCommand]) {
    for command in commands {
        tracing::warn!(
            tick = tick.0,
            command = %command.name,
            "No enabled extension handles file command, dropping"
        );
    }
}
