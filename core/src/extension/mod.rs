//! Extension model
//!
//! Extensions are independently authored plugins that take part in
//! recording, playback and TASfile serialization without knowing about each
//! other. Each one implements only the capabilities it needs:
//!
//! - [`OnRecord`] / [`OnPlayback`] - per-tick hooks while recording or replaying
//! - [`OnClear`] - wipe derived state when the session resets
//! - [`OnStateChange`] - observe controller transitions
//! - [`MetadataExtension`] - contribute a header block (`on_store` / `on_load`)
//! - [`FileCommandExtension`] - contribute per-tick file commands
//!
//! The controller discovers the per-tick capabilities through the `as_on_*`
//! accessors on [`Extension`], so an extension that does not record simply
//! never returns a recorder.
//!
//! All registries are owned by the session root ([`crate::TasSession`]) and
//! handed to the controller and codec by reference.

pub mod builtin;
mod registry;

use std::any::TypeId;

use tickreel_shared::TickIndex;

use crate::playback::{PlaybackState, TickInputContainer};
use crate::tasfile::{FileCommand, LoadError, PlaybackMetadata, SerializationError};

pub use registry::ExtensionRegistry;

/// Base trait for everything that can live in an [`ExtensionRegistry`].
pub trait Extension: Send + 'static {
    /// Unique name within a registry. Also the header block name for
    /// metadata extensions.
    fn name(&self) -> &str;

    /// Identity of the concrete type. A registry keeps at most one instance
    /// per type.
    fn type_key(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    fn as_on_record(&mut self) -> Option<&mut dyn OnRecord> {
        None
    }

    fn as_on_playback(&mut self) -> Option<&mut dyn OnPlayback> {
        None
    }

    fn as_on_clear(&mut self) -> Option<&mut dyn OnClear> {
        None
    }

    fn as_on_state_change(&mut self) -> Option<&mut dyn OnStateChange> {
        None
    }
}

/// Called once per recorded tick, after the input was appended to the log.
pub trait OnRecord {
    fn on_record(&mut self, tick: TickIndex, input: &TickInputContainer);
}

/// Called once per replayed tick, before the input is applied.
pub trait OnPlayback {
    fn on_playback(&mut self, tick: TickIndex, input: &TickInputContainer);
}

/// Called on every registered extension when the session is cleared,
/// whether or not it is enabled.
pub trait OnClear {
    fn on_clear(&mut self);
}

/// A controller transition that is about to happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: PlaybackState,
    pub to: PlaybackState,
    /// Number of ticks in the log at the time of the transition
    pub log_len: usize,
}

/// Notified before the controller enters a new state.
pub trait OnStateChange {
    fn on_state_change(&mut self, change: StateChange);
}

/// Contributes one block of key/value pairs to the TASfile header.
pub trait MetadataExtension: Extension {
    /// Produce this extension's header block.
    fn on_store(&mut self) -> Result<PlaybackMetadata, SerializationError>;

    /// Restore state from a header block with this extension's name.
    ///
    /// Implementations must validate every value before changing any state,
    /// so a rejected block leaves the extension untouched.
    fn on_load(&mut self, metadata: &PlaybackMetadata) -> Result<(), LoadError>;
}

/// Contributes commands to the per-tick body of a TASfile.
///
/// Inline commands are written on their own lines before the tick line;
/// endline commands are appended to the tick line and its continuation
/// lines. Both queues of all extensions are merged in registration order.
pub trait FileCommandExtension: Extension {
    /// Command names owned by this extension. Used on load to route each
    /// command back to its producer.
    fn command_names(&self) -> &[&'static str];

    fn on_serialise_inline(&self, _tick: TickIndex) -> Vec<FileCommand> {
        Vec::new()
    }

    fn on_serialise_endline(&self, _tick: TickIndex) -> Vec<FileCommand> {
        Vec::new()
    }

    fn on_deserialise_inline(
        &mut self,
        _tick: TickIndex,
        _commands: Vec<FileCommand>,
    ) -> Result<(), LoadError> {
        Ok(())
    }

    fn on_deserialise_endline(
        &mut self,
        _tick: TickIndex,
        _commands: Vec<FileCommand>,
    ) -> Result<(), LoadError> {
        Ok(())
    }
}

/// The registries a session owns.
///
/// Hooks run over the enabled subset of each registry in registration order:
/// metadata extensions first, then file command extensions, then pure
/// playback extensions.
pub struct Extensions {
    pub metadata: ExtensionRegistry<dyn MetadataExtension>,
    pub file_commands: ExtensionRegistry<dyn FileCommandExtension>,
    pub playback: ExtensionRegistry<dyn Extension>,
}

macro_rules! for_each_extension {
    ($iter:ident, $self:ident, |$ext:ident| $body:block) => {
        for $ext in $self.metadata.$iter() $body
        for $ext in $self.file_commands.$iter() $body
        for $ext in $self.playback.$iter() $body
    };
}

impl Extensions {
    pub fn new() -> Self {
        Self {
            metadata: ExtensionRegistry::new("metadata"),
            file_commands: ExtensionRegistry::new("file command"),
            playback: ExtensionRegistry::new("playback"),
        }
    }

    pub fn on_record(&mut self, tick: TickIndex, input: &TickInputContainer) {
        for_each_extension!(enabled_mut, self, |ext| {
            if let Some(hook) = ext.as_on_record() {
                hook.on_record(tick, input);
            }
        });
    }

    pub fn on_playback(&mut self, tick: TickIndex, input: &TickInputContainer) {
        for_each_extension!(enabled_mut, self, |ext| {
            if let Some(hook) = ext.as_on_playback() {
                hook.on_playback(tick, input);
            }
        });
    }

    pub fn on_state_change(&mut self, change: StateChange) {
        for_each_extension!(enabled_mut, self, |ext| {
            if let Some(hook) = ext.as_on_state_change() {
                hook.on_state_change(change);
            }
        });
    }

    /// Clear every registered extension, enabled or not.
    pub fn on_clear(&mut self) {
        for_each_extension!(iter_mut, self, |ext| {
            if let Some(hook) = ext.as_on_clear() {
                hook.on_clear();
            }
        });
    }
}

impl Default for Extensions {
    fn default() -> Self {
        Self::new()
    }
}
