//! Host side of tick synchronization

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashSet;
use tickreel_shared::{PeerId, TickIndex};

use crate::net::dispatch::PacketHandler;
use crate::net::packets::{TICK_ADVANCE, TickAck, TickAdvance, decode_payload, encode_packet};
use crate::net::transport::PacketSink;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BarrierError {
    #[error("{acked} of {connected} peers acknowledged tick {tick}")]
    NotReady {
        tick: TickIndex,
        acked: usize,
        connected: usize,
    },
}

#[derive(Debug, Default)]
struct BarrierState {
    connected: HashSet<PeerId>,
    /// Peers that acknowledged `tick`. Always a subset of `connected`.
    acks: HashSet<PeerId>,
    /// Tick peers are currently running
    tick: TickIndex,
}

impl BarrierState {
    fn ready(&self) -> bool {
        self.acks.len() >= self.connected.len()
    }
}

/// Arrival barrier: the host may only move to the next tick once every
/// connected peer has acknowledged the current one.
///
/// Acks arrive from network threads while the host thread polls
/// [`should_advance`](Self::should_advance); adding, checking and clearing
/// acks all happen under one lock.
#[derive(Debug, Default)]
pub struct TickSyncServer {
    state: Mutex<BarrierState>,
}

impl TickSyncServer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connect(&self, peer: PeerId) {
        if self.lock().connected.insert(peer) {
            tracing::debug!(%peer, "Peer joined tick sync");
        }
    }

    /// Forget a peer. Its ack, if any, no longer counts.
    pub fn disconnect(&self, peer: PeerId) {
        let mut state = self.lock();
        if state.connected.remove(&peer) {
            state.acks.remove(&peer);
            tracing::debug!(%peer, "Peer left tick sync");
        }
    }

    /// Record that `peer` finished the current tick. Repeated acks are
    /// ignored, as are acks from peers that are not connected.
    pub fn on_ack(&self, peer: PeerId) {
        let mut state = self.lock();
        if !state.connected.contains(&peer) {
            tracing::warn!(%peer, "Ack from unknown peer, dropping");
            return;
        }
        state.acks.insert(peer);
    }

    /// Like [`on_ack`](Self::on_ack), but drops acks for any tick other
    /// than the current one.
    pub fn on_ack_for(&self, peer: PeerId, tick: TickIndex) {
        let mut state = self.lock();
        if tick != state.tick {
            tracing::warn!(%peer, tick = tick.0, current = state.tick.0, "Stale ack, dropping");
            return;
        }
        if !state.connected.contains(&peer) {
            tracing::warn!(%peer, "Ack from unknown peer, dropping");
            return;
        }
        state.acks.insert(peer);
    }

    /// True once every connected peer acknowledged. Always true without
    /// peers.
    pub fn should_advance(&self) -> bool {
        self.lock().ready()
    }

    /// Move every peer to the next tick.
    ///
    /// The readiness check, the broadcast and the ack reset happen under the
    /// same lock, so an ack for the new tick can never be wiped.
    pub fn advance(&self, sink: &dyn PacketSink) -> Result<TickIndex, BarrierError> {
        let mut state = self.lock();
        if !state.ready() {
            return Err(BarrierError::NotReady {
                tick: state.tick,
                acked: state.acks.len(),
                connected: state.connected.len(),
            });
        }

        let next = state.tick.next();
        if let Err(e) = sink.broadcast(encode_packet(TICK_ADVANCE, &TickAdvance { tick: next })) {
            tracing::warn!(error = %e, tick = next.0, "Tick advance not delivered to every peer");
        }
        state.acks.clear();
        state.tick = next;
        tracing::trace!(tick = next.0, "Advanced tick");
        Ok(next)
    }

    /// Advance if ready, otherwise do nothing.
    pub fn try_advance(&self, sink: &dyn PacketSink) -> Option<TickIndex> {
        self.advance(sink).ok()
    }

    /// Drop every ack for the current tick.
    pub fn reset(&self) {
        self.lock().acks.clear();
    }

    pub fn current_tick(&self) -> TickIndex {
        self.lock().tick
    }

    pub fn connected_count(&self) -> usize {
        self.lock().connected.len()
    }

    pub fn ack_count(&self) -> usize {
        self.lock().acks.len()
    }

    /// Handler for [`TICK_ACK`](crate::net::packets::TICK_ACK) packets.
    pub fn ack_handler(self: &Arc<Self>) -> impl PacketHandler + 'static {
        let server = Arc::clone(self);
        move |payload: &[u8], sender: PeerId| -> anyhow::Result<()> {
            let ack: TickAck = decode_payload(payload)?;
            server.on_ack_for(sender, ack.tick);
            Ok(())
        }
    }
}
