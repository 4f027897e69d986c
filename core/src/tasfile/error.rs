//! TASfile error types

use std::path::PathBuf;

use tickreel_shared::TickIndex;

/// Reasons a save is refused. Nothing is written when one occurs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializationError {
    #[error("metadata key {key:?} contains the separator {separator:?}")]
    KeyContainsSeparator { key: String, separator: char },

    #[error("invalid metadata key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("value of metadata key {key:?} contains a line break")]
    LineBreak { key: String },

    #[error("invalid header block name {0:?}")]
    InvalidBlockName(String),

    #[error("invalid file command {name:?}: {reason}")]
    InvalidCommand { name: String, reason: &'static str },

    #[error("cannot encode input of tick {tick}: {reason}")]
    InvalidInput { tick: TickIndex, reason: String },

    #[error("unknown flavor {0:?}")]
    UnknownFlavor(String),

    #[error("{0:?} cannot be used as a separator")]
    InvalidSeparator(char),
}

/// Reasons a load is refused.
///
/// Only [`LoadError::NotFound`] is recoverable; everything else means the
/// file content cannot be trusted and nothing from it is kept.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("TASfile not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read TASfile: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing `# TASfile` header")]
    MissingHeader,

    #[error("unknown flavor {0:?}")]
    UnknownFlavor(String),

    #[error("line {line}: {detail}")]
    Malformed { line: usize, detail: String },

    #[error("corrupt value for {key:?} in [{block}]: {detail}")]
    CorruptMetadata {
        block: String,
        key: String,
        detail: String,
    },

    #[error("corrupt {extension} command at tick {tick}: {detail}")]
    CorruptCommand {
        extension: String,
        tick: TickIndex,
        detail: String,
    },
}

impl LoadError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LoadError::NotFound(_))
    }

    pub(crate) fn malformed(line: usize, detail: impl Into<String>) -> Self {
        LoadError::Malformed {
            line,
            detail: detail.into(),
        }
    }
}
