//! Shared types for tickreel.
//!
//! Everything here is plain data used by both the host and its peers:
//! tick and peer identifiers, packet identities, and the framing that puts
//! a numeric packet id in front of an opaque payload.

pub mod ids;
pub mod packet;

pub use ids::{PeerId, TickIndex};
pub use packet::{PACKET_HEADER_SIZE, PacketId, Side, WireError, decode_frame, encode_frame};
