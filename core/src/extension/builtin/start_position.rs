use std::str::FromStr;
use std::sync::Arc;

use crate::extension::{Extension, MetadataExtension, OnClear, OnStateChange, StateChange};
use crate::net::packets::{TELEPORT, Teleport, encode_packet};
use crate::net::transport::PacketSink;
use crate::playback::PlaybackState;
use crate::tasfile::{LoadError, PlaybackMetadata, SerializationError};

use super::{Position, PositionProbe};

/// Remembers where a recording started and puts every peer back there when
/// playback begins.
///
/// The position is captured when recording starts on an empty log. Without a
/// probe nothing is captured; without a sink nothing is sent.
pub struct StartPositionExtension {
    position: Option<Position>,
    probe: Option<Arc<dyn PositionProbe>>,
    sink: Option<Arc<dyn PacketSink>>,
}

impl StartPositionExtension {
    pub const NAME: &'static str = "StartPosition";

    pub fn new() -> Self {
        Self {
            position: None,
            probe: None,
            sink: None,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn PositionProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn PacketSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn set_position(&mut self, position: Option<Position>) {
        self.position = position;
    }

    fn teleport_peers(&self) {
        let (Some(position), Some(sink)) = (self.position, self.sink.as_ref()) else {
            return;
        };

        let frame = encode_packet(TELEPORT, &Teleport { position });
        match sink.broadcast(frame) {
            Ok(()) => tracing::debug!(?position, "Teleported peers to start position"),
            Err(e) => tracing::warn!(error = %e, "Failed to send start position"),
        }
    }
}

impl Default for StartPositionExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl Extension for StartPositionExtension {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn as_on_clear(&mut self) -> Option<&mut dyn OnClear> {
        Some(self)
    }

    fn as_on_state_change(&mut self) -> Option<&mut dyn OnStateChange> {
        Some(self)
    }
}

impl OnStateChange for StartPositionExtension {
    fn on_state_change(&mut self, change: StateChange) {
        match change.to {
            PlaybackState::Recording if change.log_len == 0 => {
                if let Some(probe) = &self.probe {
                    self.position = Some(probe.position());
                }
            }
            PlaybackState::Playback => self.teleport_peers(),
            _ => {}
        }
    }
}

impl OnClear for StartPositionExtension {
    fn on_clear(&mut self) {
        self.position = None;
    }
}

impl MetadataExtension for StartPositionExtension {
    fn on_store(&mut self) -> Result<PlaybackMetadata, SerializationError> {
        let mut metadata = PlaybackMetadata::new(Self::NAME);
        if let Some(p) = self.position {
            metadata.set_value("x", p.x.to_string())?;
            metadata.set_value("y", p.y.to_string())?;
            metadata.set_value("z", p.z.to_string())?;
            metadata.set_value("pitch", p.pitch.to_string())?;
            metadata.set_value("yaw", p.yaw.to_string())?;
        }
        Ok(metadata)
    }

    fn on_load(&mut self, metadata: &PlaybackMetadata) -> Result<(), LoadError> {
        if metadata.is_empty() {
            self.position = None;
            return Ok(());
        }

        let x = parse_value(metadata, "x")?;
        let y = parse_value(metadata, "y")?;
        let z = parse_value(metadata, "z")?;
        let pitch = parse_value(metadata, "pitch")?;
        let yaw = parse_value(metadata, "yaw")?;

        self.position = Some(Position {
            x,
            y,
            z,
            pitch,
            yaw,
        });
        Ok(())
    }
}

fn parse_value<T>(metadata: &PlaybackMetadata, key: &str) -> Result<T, LoadError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let corrupt = |detail: String| LoadError::CorruptMetadata {
        block: StartPositionExtension::NAME.to_string(),
        key: key.to_string(),
        detail,
    };
    let raw = metadata
        .get_value(key)
        .ok_or_else(|| corrupt("missing value".to_string()))?;
    raw.trim()
        .parse::<T>()
        .map_err(|e| corrupt(format!("{raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::packets::decode_payload;
    use crate::net::transport::LocalHub;
    use tickreel_shared::decode_frame;

    fn spawn_pos() -> Position {
        Position {
            x: 0.5,
            y: 64.0,
            z: -12.25,
            pitch: 17.5,
            yaw: -90.0,
        }
    }

    #[test]
    fn test_captures_on_fresh_recording_only() {
        let probe: Arc<dyn PositionProbe> = Arc::new(spawn_pos);
        let mut ext = StartPositionExtension::new().with_probe(probe);

        ext.on_state_change(StateChange {
            from: PlaybackState::Idle,
            to: PlaybackState::Recording,
            log_len: 3,
        });
        assert_eq!(ext.position(), None);

        ext.on_state_change(StateChange {
            from: PlaybackState::Idle,
            to: PlaybackState::Recording,
            log_len: 0,
        });
        assert_eq!(ext.position(), Some(spawn_pos()));
    }

    #[test]
    fn test_store_load_round_trip() {
        let mut ext = StartPositionExtension::new();
        ext.set_position(Some(spawn_pos()));
        let stored = ext.on_store().unwrap();
        assert_eq!(stored.get_value("x"), Some("0.5"));

        let mut restored = StartPositionExtension::new();
        restored.on_load(&stored).unwrap();
        assert_eq!(restored.position(), Some(spawn_pos()));

        let empty = StartPositionExtension::new().on_store().unwrap();
        restored.on_load(&empty).unwrap();
        assert_eq!(restored.position(), None);
    }

    #[test]
    fn test_bad_number_is_corrupt_and_keeps_position() {
        let mut ext = StartPositionExtension::new();
        ext.set_position(Some(spawn_pos()));

        let mut metadata = PlaybackMetadata::new(StartPositionExtension::NAME);
        for key in ["x", "y", "z", "pitch", "yaw"] {
            metadata.set_value(key, "1").unwrap();
        }
        metadata.set_value("yaw", "north").unwrap();

        let err = ext.on_load(&metadata).unwrap_err();
        assert!(matches!(err, LoadError::CorruptMetadata { ref key, .. } if key == "yaw"));
        assert_eq!(ext.position(), Some(spawn_pos()));
    }

    #[test]
    fn test_playback_start_teleports_peers() {
        let hub = LocalHub::new();
        let mut peer = hub.connect_peer();
        let mut ext = StartPositionExtension::new().with_sink(hub.sink());
        ext.set_position(Some(spawn_pos()));

        ext.on_state_change(StateChange {
            from: PlaybackState::Idle,
            to: PlaybackState::Playback,
            log_len: 10,
        });

        let frame = peer.try_recv().unwrap();
        let (id, payload, _) = decode_frame(&frame).unwrap();
        assert_eq!(id, TELEPORT.numeric_id);
        let teleport: Teleport = decode_payload(payload).unwrap();
        assert_eq!(teleport.position, spawn_pos());
    }
}
