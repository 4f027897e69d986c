use std::sync::Arc;
use std::thread;

use tickreel_shared::{PeerId, Side, TickIndex, decode_frame};

use super::*;
use crate::net::dispatch::PacketDispatcher;
use crate::net::packets::{TICK_ACK, TICK_ADVANCE, TickAdvance, decode_payload};
use crate::net::transport::{LocalHub, PacketSink, TransportError};

/// Sink that drops everything.
struct NullSink;

impl PacketSink for NullSink {
    fn send_to(&self, _peer: PeerId, _frame: Vec<u8>) -> Result<(), TransportError> {
        Ok(())
    }

    fn broadcast(&self, _frame: Vec<u8>) -> Result<(), TransportError> {
        Ok(())
    }
}

fn server_with_peers(n: u32) -> TickSyncServer {
    let server = TickSyncServer::new();
    for i in 1..=n {
        server.connect(PeerId(i));
    }
    server
}

#[test]
fn test_advance_after_all_peers_ack() {
    let server = server_with_peers(3);
    assert!(!server.should_advance());

    server.on_ack(PeerId(1));
    server.on_ack(PeerId(2));
    assert!(!server.should_advance());
    server.on_ack(PeerId(3));
    assert!(server.should_advance());

    assert_eq!(server.advance(&NullSink), Ok(TickIndex(1)));
    assert_eq!(server.ack_count(), 0);
    assert_eq!(server.current_tick(), TickIndex(1));

    // N - 1 acks are not enough for the next tick
    server.on_ack(PeerId(1));
    server.on_ack(PeerId(2));
    assert!(!server.should_advance());
    assert_eq!(
        server.advance(&NullSink),
        Err(BarrierError::NotReady {
            tick: TickIndex(1),
            acked: 2,
            connected: 3
        })
    );
}

#[test]
fn test_no_peers_is_vacuously_ready() {
    let server = TickSyncServer::new();
    assert!(server.should_advance());
    assert_eq!(server.try_advance(&NullSink), Some(TickIndex(1)));
    assert_eq!(server.try_advance(&NullSink), Some(TickIndex(2)));
}

#[test]
fn test_ack_is_idempotent() {
    let server = server_with_peers(2);
    server.on_ack(PeerId(1));
    server.on_ack(PeerId(1));
    server.on_ack(PeerId(1));
    assert_eq!(server.ack_count(), 1);
    assert!(!server.should_advance());
}

#[test]
fn test_unknown_and_stale_acks_dropped() {
    let server = server_with_peers(1);
    server.on_ack(PeerId(9));
    assert_eq!(server.ack_count(), 0);

    server.on_ack_for(PeerId(1), TickIndex(5));
    assert_eq!(server.ack_count(), 0);

    server.on_ack_for(PeerId(1), TickIndex(0));
    assert!(server.should_advance());
}

#[test]
fn test_disconnect_removes_ack() {
    let server = server_with_peers(2);
    server.on_ack(PeerId(1));
    server.disconnect(PeerId(1));
    assert_eq!(server.ack_count(), 0);
    assert_eq!(server.connected_count(), 1);
    assert!(!server.should_advance());

    // The remaining peer alone now gates the tick
    server.on_ack(PeerId(2));
    assert!(server.should_advance());
}

#[test]
fn test_disconnect_of_last_missing_peer_unblocks() {
    let server = server_with_peers(2);
    server.on_ack(PeerId(1));
    server.disconnect(PeerId(2));
    assert!(server.should_advance());
}

#[test]
fn test_reset_clears_acks() {
    let server = server_with_peers(1);
    server.on_ack(PeerId(1));
    server.reset();
    assert!(!server.should_advance());
    assert_eq!(server.current_tick(), TickIndex(0));
}

#[test]
fn test_concurrent_acks() {
    let server = Arc::new(server_with_peers(16));

    let handles: Vec<_> = (1..=16)
        .map(|i| {
            let server = Arc::clone(&server);
            thread::spawn(move || {
                for _ in 0..10 {
                    server.on_ack(PeerId(i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(server.ack_count(), 16);
    assert_eq!(server.advance(&NullSink), Ok(TickIndex(1)));
    assert_eq!(server.ack_count(), 0);
}

#[test]
fn test_advance_broadcasts_next_tick() {
    let hub = LocalHub::new();
    let mut peer = hub.connect_peer();
    let server = server_with_peers(0);
    server.connect(peer.id());
    server.on_ack(peer.id());

    server.advance(hub.sink().as_ref()).unwrap();

    let frame = peer.try_recv().unwrap();
    let (id, payload, _) = decode_frame(&frame).unwrap();
    assert_eq!(id, TICK_ADVANCE.numeric_id);
    let advance: TickAdvance = decode_payload(payload).unwrap();
    assert_eq!(advance.tick, TickIndex(1));
}

#[test]
fn test_client_waits_for_advance() {
    let client = TickSyncClient::new();
    assert!(client.may_tick());

    client.on_tick_complete(&NullSink).unwrap();
    assert!(!client.may_tick());

    // Old advances do not unblock
    client.on_advance(TickIndex(0));
    assert!(!client.may_tick());

    client.on_advance(TickIndex(1));
    assert!(client.may_tick());
    assert_eq!(client.current_tick(), TickIndex(1));

    client.on_tick_complete(&NullSink).unwrap();
    client.on_advance(TickIndex(1));
    assert!(!client.may_tick());
}

/// Host and two peers exchanging real frames through the local hub.
#[test]
fn test_lockstep_over_local_hub() {
    let mut hub = LocalHub::new();
    let server = Arc::new(TickSyncServer::new());
    let mut host_dispatch = PacketDispatcher::with_builtin_packets();
    host_dispatch.register_handler(TICK_ACK, Side::Server, server.ack_handler());

    let mut peers: Vec<_> = (0..2)
        .map(|_| {
            let link = hub.connect_peer();
            server.connect(link.id());
            let client = Arc::new(TickSyncClient::new());
            let mut dispatch = PacketDispatcher::with_builtin_packets();
            dispatch.register_handler(TICK_ADVANCE, Side::Client, client.advance_handler());
            (link, client, dispatch)
        })
        .collect();

    let host_sink = hub.sink();
    for expected in 1..=3u64 {
        for (link, client, _) in &peers {
            assert!(client.may_tick());
            client.on_tick_complete(link.sink().as_ref()).unwrap();
        }

        while let Some((sender, frame)) = hub.try_recv() {
            host_dispatch
                .dispatch_frame(&frame, Side::Server, sender)
                .unwrap();
        }
        assert!(server.should_advance());
        assert_eq!(
            server.advance(host_sink.as_ref()),
            Ok(TickIndex(expected))
        );

        for (link, client, dispatch) in &mut peers {
            assert!(!client.may_tick());
            let frame = link.try_recv().unwrap();
            dispatch
                .dispatch_frame(&frame, Side::Client, PeerId::HOST)
                .unwrap();
            assert_eq!(client.current_tick(), TickIndex(expected));
        }
    }
}
