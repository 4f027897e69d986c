//! Outbound packet delivery
//!
//! [`PacketSink`] is the only thing the rest of the crate needs from a
//! network transport: fire-and-forget delivery of already framed packets.
//! Sends are at-most-once; nothing is retried.
//!
//! [`LocalHub`] is an in-process transport built on unbounded tokio
//! channels, used for local peers and tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tickreel_shared::PeerId;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("{0} is not connected")]
    UnknownPeer(PeerId),
    #[error("{0} has disconnected")]
    Disconnected(PeerId),
}

/// Delivers framed packets.
pub trait PacketSink: Send + Sync {
    fn send_to(&self, peer: PeerId, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Send to every connected peer. Delivery continues past failed peers;
    /// the first failure is returned.
    fn broadcast(&self, frame: Vec<u8>) -> Result<(), TransportError>;
}

type Frame = (PeerId, Vec<u8>);

struct HubInner {
    peers: Mutex<BTreeMap<PeerId, UnboundedSender<Vec<u8>>>>,
    next_id: AtomicU32,
    to_host: UnboundedSender<Frame>,
}

impl HubInner {
    fn peers(&self) -> std::sync::MutexGuard<'_, BTreeMap<PeerId, UnboundedSender<Vec<u8>>>> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PacketSink for HubInner {
    fn send_to(&self, peer: PeerId, frame: Vec<u8>) -> Result<(), TransportError> {
        let peers = self.peers();
        let tx = peers.get(&peer).ok_or(TransportError::UnknownPeer(peer))?;
        tx.send(frame)
            .map_err(|_| TransportError::Disconnected(peer))
    }

    fn broadcast(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        let peers = self.peers();
        let mut result = Ok(());
        for (&peer, tx) in peers.iter() {
            if tx.send(frame.clone()).is_err() {
                tracing::warn!(%peer, "Dropped packet for disconnected peer");
                if result.is_ok() {
                    result = Err(TransportError::Disconnected(peer));
                }
            }
        }
        result
    }
}

/// Host end of the in-process transport.
pub struct LocalHub {
    inner: Arc<HubInner>,
    inbox: UnboundedReceiver<Frame>,
}

impl LocalHub {
    pub fn new() -> Self {
        let (to_host, inbox) = unbounded_channel();
        Self {
            inner: Arc::new(HubInner {
                peers: Mutex::new(BTreeMap::new()),
                next_id: AtomicU32::new(1),
                to_host,
            }),
            inbox,
        }
    }

    /// Create a new peer connected to this hub.
    pub fn connect_peer(&self) -> LocalPeer {
        let id = PeerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = unbounded_channel();
        self.inner.peers().insert(id, tx);
        tracing::debug!(peer = %id, "Local peer connected");

        LocalPeer {
            id,
            inbox: rx,
            sink: Arc::new(PeerSink {
                id,
                to_host: self.inner.to_host.clone(),
            }),
        }
    }

    pub fn disconnect_peer(&self, peer: PeerId) -> bool {
        let removed = self.inner.peers().remove(&peer).is_some();
        if removed {
            tracing::debug!(%peer, "Local peer disconnected");
        }
        removed
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.inner.peers().keys().copied().collect()
    }

    /// Sink that sends from the host to peers.
    pub fn sink(&self) -> Arc<dyn PacketSink> {
        self.inner.clone()
    }

    /// Next frame a peer sent to the host, if any.
    pub fn try_recv(&mut self) -> Option<(PeerId, Vec<u8>)> {
        self.inbox.try_recv().ok()
    }
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Peer end of the in-process transport.
pub struct LocalPeer {
    id: PeerId,
    inbox: UnboundedReceiver<Vec<u8>>,
    sink: Arc<PeerSink>,
}

impl LocalPeer {
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Sink that sends from this peer to the host.
    pub fn sink(&self) -> Arc<dyn PacketSink> {
        self.sink.clone()
    }

    /// Next frame the host sent, if any.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.inbox.try_recv().ok()
    }
}

/// Peers only talk to the host.
struct PeerSink {
    id: PeerId,
    to_host: UnboundedSender<Frame>,
}

impl PacketSink for PeerSink {
    fn send_to(&self, peer: PeerId, frame: Vec<u8>) -> Result<(), TransportError> {
        if !peer.is_host() {
            return Err(TransportError::UnknownPeer(peer));
        }
        self.to_host
            .send((self.id, frame))
            .map_err(|_| TransportError::Disconnected(PeerId::HOST))
    }

    fn broadcast(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.send_to(PeerId::HOST, frame)
    }
}
