//! tickreel core - lockstep recording and playback
//!
//! This crate records per-tick input of a simulation, replays it, keeps
//! networked peers in lockstep, and stores recordings as TASfiles together
//! with the state of every extension that took part.
//!
//! # Architecture
//!
//! - [`TasSession`] - Session root owning everything below
//! - [`PlaybackController`] - Idle/recording/playback state machine over the tick log
//! - [`ExtensionRegistry`] - Ordered, individually enabled plugin instances
//! - [`TasFileCodec`] - TASfile text format
//! - [`PacketDispatcher`] - Per-side routing of incoming packets
//! - [`TickSyncServer`] - Barrier that advances the host only when every peer acked
//! - [`ConfigStore`] - TOML-backed settings

pub mod config;
pub mod extension;
#[cfg(test)]
mod integration;
pub mod net;
pub mod playback;
pub mod session;
pub mod tasfile;

// Re-export the session root
pub use session::{SessionError, SessionSettings, TasSession};

// Re-export configuration
pub use config::{ConfigError, ConfigKey, ConfigStore};

// Re-export extension model
pub use extension::{
    Extension, ExtensionRegistry, Extensions, FileCommandExtension, MetadataExtension, OnClear,
    OnPlayback, OnRecord, OnStateChange, StateChange,
};

// Re-export playback types
pub use playback::{
    InputSource, PlaybackController, PlaybackState, StateError, TickInputContainer, TickLog,
    TickOutcome,
};

// Re-export networking types
pub use net::{
    BarrierError, DispatchError, LocalHub, LocalPeer, PacketDispatcher, PacketHandler,
    PacketSink, RoutingError, TickSyncClient, TickSyncServer, TransportError,
};

// Re-export TASfile types
pub use tasfile::{
    FileCommand, LoadError, PlaybackMetadata, SerialiserFlavor, SerializationError, TasFileCodec,
    V1Flavor,
};

pub use tickreel_shared::{PacketId, PeerId, Side, TickIndex};
