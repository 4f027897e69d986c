//! Packet identities and frame layout.
//!
//! # Wire Format
//!
//! ```text
//! [length:u32][packet id:u32][payload...]
//! ```
//!
//! All integers are little-endian. `length` counts the id and the payload,
//! so a frame occupies `4 + length` bytes. The payload is opaque at this
//! layer; its meaning belongs to whoever handles the packet id.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Size of the length prefix plus the packet id.
pub const PACKET_HEADER_SIZE: usize = 8;

/// Upper bound for a single frame body (id + payload).
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Which end of the connection handles a packet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode, Serialize, Deserialize,
)]
pub enum Side {
    Client,
    Server,
}

impl Side {
    pub const fn opposite(self) -> Side {
        match self {
            Side::Client => Side::Server,
            Side::Server => Side::Client,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Client => write!(f, "client"),
            Side::Server => write!(f, "server"),
        }
    }
}

/// Identity of one packet kind.
///
/// `side` is the side expected to receive and handle the packet. `traceable`
/// packets are logged at debug level every time they are dispatched; chatty
/// per-tick packets leave it off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketId {
    pub numeric_id: u32,
    pub side: Side,
    pub name: &'static str,
    pub traceable: bool,
}

impl PacketId {
    pub const fn new(numeric_id: u32, side: Side, name: &'static str, traceable: bool) -> Self {
        Self {
            numeric_id,
            side,
            name,
            traceable,
        }
    }
}

impl std::fmt::Display for PacketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({}, {})", self.name, self.numeric_id, self.side)
    }
}

/// Errors that can occur when reading a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Not enough bytes for the header yet
    #[error("frame too short for header: {got} bytes")]
    TooShort { got: usize },
    /// Header announced more bytes than are available
    #[error("incomplete frame: expected {expected} bytes, got {got}")]
    Incomplete { expected: usize, got: usize },
    /// Announced length cannot even hold the packet id
    #[error("invalid frame length {0}")]
    InvalidLength(usize),
    /// Announced length exceeds `MAX_FRAME_LEN`
    #[error("frame of {0} bytes exceeds the maximum frame size")]
    TooLarge(usize),
}

impl WireError {
    /// Whether more bytes from the stream could turn this into a valid frame.
    pub fn needs_more_data(&self) -> bool {
        matches!(self, WireError::TooShort { .. } | WireError::Incomplete { .. })
    }
}

/// Frame a payload behind its numeric packet id.
pub fn encode_frame(numeric_id: u32, payload: &[u8]) -> Vec<u8> {
    let body_len = 4 + payload.len();
    let mut bytes = Vec::with_capacity(4 + body_len);
    bytes.extend_from_slice(&(body_len as u32).to_le_bytes());
    bytes.extend_from_slice(&numeric_id.to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

/// Read one frame from the front of `bytes`.
///
/// Returns the packet id, the payload, and the total number of bytes the
/// frame occupied so stream readers can advance past it.
pub fn decode_frame(bytes: &[u8]) -> Result<(u32, &[u8], usize), WireError> {
    if bytes.len() < PACKET_HEADER_SIZE {
        return Err(WireError::TooShort { got: bytes.len() });
    }

    let body_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if body_len < 4 {
        return Err(WireError::InvalidLength(body_len));
    }
    if body_len > MAX_FRAME_LEN {
        return Err(WireError::TooLarge(body_len));
    }

    let total = 4 + body_len;
    if bytes.len() < total {
        return Err(WireError::Incomplete {
            expected: total,
            got: bytes.len(),
        });
    }

    let numeric_id = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    Ok((numeric_id, &bytes[PACKET_HEADER_SIZE..total], total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let frame = encode_frame(7, &[0xAA, 0xBB]);
        assert_eq!(frame.len(), PACKET_HEADER_SIZE + 2);
        assert_eq!(&frame[0..4], &6u32.to_le_bytes());
        assert_eq!(&frame[4..8], &7u32.to_le_bytes());
        assert_eq!(&frame[8..], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_decode_two_frames_from_stream() {
        let mut stream = encode_frame(1, b"first");
        stream.extend(encode_frame(2, b""));

        let (id, payload, used) = decode_frame(&stream).unwrap();
        assert_eq!(id, 1);
        assert_eq!(payload, b"first");

        let (id, payload, rest) = decode_frame(&stream[used..]).unwrap();
        assert_eq!(id, 2);
        assert!(payload.is_empty());
        assert_eq!(used + rest, stream.len());
    }

    #[test]
    fn test_decode_partial() {
        let frame = encode_frame(3, b"payload");
        let err = decode_frame(&frame[..frame.len() - 1]).unwrap_err();
        assert!(err.needs_more_data());
        assert_eq!(
            decode_frame(&frame[..3]),
            Err(WireError::TooShort { got: 3 })
        );
    }

    #[test]
    fn test_decode_rejects_bad_length() {
        let mut frame = encode_frame(3, b"");
        frame[0..4].copy_from_slice(&2u32.to_le_bytes());
        assert_eq!(decode_frame(&frame), Err(WireError::InvalidLength(2)));

        frame[0..4].copy_from_slice(&(MAX_FRAME_LEN as u32 + 1).to_le_bytes());
        assert!(matches!(decode_frame(&frame), Err(WireError::TooLarge(_))));
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Client.opposite(), Side::Server);
        assert_eq!(Side::Server.opposite(), Side::Client);
    }
}
