//! Packet dispatch
//!
//! Routes incoming frames to the handler registered for their packet id and
//! the receiving side. Routing failures are typed and only abort the one
//! dispatch; handler failures are passed through untouched.

use hashbrown::HashMap;
use tickreel_shared::{PacketId, PeerId, Side, WireError, decode_frame};

/// Handles one packet kind on one side.
pub trait PacketHandler: Send + Sync {
    fn handle(&self, payload: &[u8], sender: PeerId) -> anyhow::Result<()>;
}

impl<F> PacketHandler for F
where
    F: Fn(&[u8], PeerId) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, payload: &[u8], sender: PeerId) -> anyhow::Result<()> {
        self(payload, sender)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("unknown packet id {0}")]
    UnknownPacket(u32),
    #[error("{packet} is handled on the {expected} side, not the {actual} side")]
    WrongSide {
        packet: &'static str,
        expected: Side,
        actual: Side,
    },
    #[error("no {side} handler registered for {packet}")]
    NotImplemented { packet: &'static str, side: Side },
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error("{packet} handler failed: {source}")]
    Handler {
        packet: &'static str,
        source: anyhow::Error,
    },
    #[error("malformed frame: {0}")]
    Wire(#[from] WireError),
}

impl DispatchError {
    pub fn routing(&self) -> Option<&RoutingError> {
        match self {
            DispatchError::Routing(e) => Some(e),
            _ => None,
        }
    }
}

/// Packet table plus one handler per (packet, side).
///
/// Numeric ids are unique across both sides, not just within one side.
pub struct PacketDispatcher {
    packets: HashMap<u32, PacketId>,
    handlers: HashMap<(u32, Side), Box<dyn PacketHandler>>,
}

impl PacketDispatcher {
    pub fn new() -> Self {
        Self {
            packets: HashMap::new(),
            handlers: HashMap::new(),
        }
    }

    /// A dispatcher that already knows the built-in packets.
    pub fn with_builtin_packets() -> Self {
        let mut dispatcher = Self::new();
        for packet in super::packets::BUILTIN_PACKETS {
            dispatcher.register_packet(packet);
        }
        dispatcher
    }

    /// Add a packet to the table. Ids are unique; a clashing id is ignored.
    pub fn register_packet(&mut self, packet: PacketId) -> bool {
        match self.packets.get(&packet.numeric_id) {
            Some(existing) if *existing == packet => true,
            Some(existing) => {
                tracing::warn!(
                    packet = %packet,
                    existing = %existing,
                    "Packet id already taken, ignoring"
                );
                false
            }
            None => {
                self.packets.insert(packet.numeric_id, packet);
                true
            }
        }
    }

    pub fn packet(&self, numeric_id: u32) -> Option<&PacketId> {
        self.packets.get(&numeric_id)
    }

    /// Register the handler for `packet` on `side`.
    ///
    /// Ignored with a warning if `side` is not the packet's handling side or
    /// a handler is already registered. The packet is added to the table if
    /// it is not there yet.
    pub fn register_handler<H>(&mut self, packet: PacketId, side: Side, handler: H) -> bool
    where
        H: PacketHandler + 'static,
    {
        if packet.side != side {
            tracing::warn!(
                packet = %packet,
                %side,
                "Cannot register a handler on the side that sends this packet"
            );
            return false;
        }
        if !self.register_packet(packet) {
            return false;
        }

        let key = (packet.numeric_id, side);
        if self.handlers.contains_key(&key) {
            tracing::warn!(packet = %packet, %side, "Handler already registered, ignoring");
            return false;
        }
        self.handlers.insert(key, Box::new(handler));
        true
    }

    /// Route one payload to its handler.
    pub fn dispatch(
        &self,
        numeric_id: u32,
        side: Side,
        payload: &[u8],
        sender: PeerId,
    ) -> Result<(), DispatchError> {
        let packet = self
            .packets
            .get(&numeric_id)
            .ok_or(RoutingError::UnknownPacket(numeric_id))?;

        if packet.side != side {
            return Err(RoutingError::WrongSide {
                packet: packet.name,
                expected: packet.side,
                actual: side,
            }
            .into());
        }

        let handler = self
            .handlers
            .get(&(numeric_id, side))
            .ok_or(RoutingError::NotImplemented {
                packet: packet.name,
                side,
            })?;

        if packet.traceable {
            tracing::debug!(packet = %packet, peer = %sender, bytes = payload.len(), "Dispatching packet");
        } else {
            tracing::trace!(packet = %packet, peer = %sender, "Dispatching packet");
        }

        handler
            .handle(payload, sender)
            .map_err(|source| DispatchError::Handler {
                packet: packet.name,
                source,
            })
    }

    /// Decode one frame from the front of `bytes` and dispatch it.
    ///
    /// Returns the number of bytes consumed.
    pub fn dispatch_frame(
        &self,
        bytes: &[u8],
        side: Side,
        sender: PeerId,
    ) -> Result<usize, DispatchError> {
        let (numeric_id, payload, used) = decode_frame(bytes)?;
        self.dispatch(numeric_id, side, payload, sender)?;
        Ok(used)
    }
}

impl Default for PacketDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
