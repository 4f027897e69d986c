//! Built-in packets
//!
//! Payloads are bitcode-encoded structs framed behind their numeric id
//! (see [`tickreel_shared::packet`]). The `side` of each id is the side that
//! handles it.

use bitcode::{Decode, Encode};
use tickreel_shared::{PacketId, Side, TickIndex, encode_frame};

use crate::extension::builtin::Position;
use crate::playback::PlaybackState;

/// Peer finished the current tick
pub const TICK_ACK: PacketId = PacketId::new(0, Side::Server, "tick_ack", false);
/// Host allows peers to run the next tick
pub const TICK_ADVANCE: PacketId = PacketId::new(1, Side::Client, "tick_advance", false);
/// Host changed playback state
pub const PLAYBACK_STATE: PacketId = PacketId::new(2, Side::Client, "playback_state", true);
/// Move the controlled entity
pub const TELEPORT: PacketId = PacketId::new(3, Side::Client, "teleport", true);

/// Every built-in packet, for registering with a dispatcher.
pub const BUILTIN_PACKETS: [PacketId; 4] = [TICK_ACK, TICK_ADVANCE, PLAYBACK_STATE, TELEPORT];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct TickAck {
    /// Tick the peer just finished
    pub tick: TickIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct TickAdvance {
    /// Tick peers may now run
    pub tick: TickIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct PlaybackStateChange {
    pub from: PlaybackState,
    pub to: PlaybackState,
}

#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct Teleport {
    pub position: Position,
}

/// Encode a payload and frame it behind `id`.
pub fn encode_packet<T: Encode>(id: PacketId, payload: &T) -> Vec<u8> {
    encode_frame(id.numeric_id, &bitcode::encode(payload))
}

/// Decode a payload handed to a packet handler.
pub fn decode_payload<'a, T: Decode<'a>>(payload: &'a [u8]) -> anyhow::Result<T> {
    bitcode::decode(payload).map_err(|e| anyhow::anyhow!("failed to decode payload: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickreel_shared::decode_frame;

    #[test]
    fn test_ids_are_unique() {
        for (i, a) in BUILTIN_PACKETS.iter().enumerate() {
            for b in &BUILTIN_PACKETS[i + 1..] {
                assert_ne!(a.numeric_id, b.numeric_id, "{a} and {b} share an id");
            }
        }
    }

    #[test]
    fn test_state_change_packet() {
        let frame = encode_packet(
            PLAYBACK_STATE,
            &PlaybackStateChange {
                from: PlaybackState::Idle,
                to: PlaybackState::Recording,
            },
        );
        let (id, payload, used) = decode_frame(&frame).unwrap();
        assert_eq!(id, PLAYBACK_STATE.numeric_id);
        assert_eq!(used, frame.len());

        let change: PlaybackStateChange = decode_payload(payload).unwrap();
        assert_eq!(change.to, PlaybackState::Recording);
    }

    #[test]
    fn test_garbage_payload_is_an_error() {
        assert!(decode_payload::<TickAck>(&[]).is_err());
    }
}
