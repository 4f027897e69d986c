//! Peer side of tick synchronization

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tickreel_shared::{PeerId, TickIndex};

use crate::net::dispatch::PacketHandler;
use crate::net::packets::{TICK_ACK, TickAck, TickAdvance, decode_payload, encode_packet};
use crate::net::transport::{PacketSink, TransportError};

/// Tracks which tick the host allows this peer to run.
///
/// After finishing a tick the peer acks it and waits for the host's advance
/// before running the next one.
#[derive(Debug)]
pub struct TickSyncClient {
    tick: AtomicU64,
    may_tick: AtomicBool,
}

impl TickSyncClient {
    pub fn new() -> Self {
        Self {
            tick: AtomicU64::new(0),
            may_tick: AtomicBool::new(true),
        }
    }

    pub fn current_tick(&self) -> TickIndex {
        TickIndex(self.tick.load(Ordering::Acquire))
    }

    /// Whether the host allowed the current tick to run.
    pub fn may_tick(&self) -> bool {
        self.may_tick.load(Ordering::Acquire)
    }

    /// The host advanced to `tick`. Advances that do not move forward are
    /// ignored.
    pub fn on_advance(&self, tick: TickIndex) {
        let current = self.current_tick();
        if tick <= current {
            tracing::debug!(tick = tick.0, current = current.0, "Ignoring stale tick advance");
            return;
        }
        self.tick.store(tick.0, Ordering::Release);
        self.may_tick.store(true, Ordering::Release);
    }

    /// Acknowledge the current tick to the host and wait for the next advance.
    pub fn on_tick_complete(&self, sink: &dyn PacketSink) -> Result<(), TransportError> {
        self.may_tick.store(false, Ordering::Release);
        let ack = TickAck {
            tick: self.current_tick(),
        };
        sink.send_to(PeerId::HOST, encode_packet(TICK_ACK, &ack))
    }

    pub fn reset(&self) {
        self.tick.store(0, Ordering::Release);
        self.may_tick.store(true, Ordering::Release);
    }

    /// Handler for [`TICK_ADVANCE`](crate::net::packets::TICK_ADVANCE) packets.
    pub fn advance_handler(self: &Arc<Self>) -> impl PacketHandler + 'static {
        let client = Arc::clone(self);
        move |payload: &[u8], _sender: PeerId| -> anyhow::Result<()> {
            let advance: TickAdvance = decode_payload(payload)?;
            client.on_advance(advance.tick);
            Ok(())
        }
    }
}

impl Default for TickSyncClient {
    fn default() -> Self {
        Self::new()
    }
}
