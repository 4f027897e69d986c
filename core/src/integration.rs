//! End-to-end tests over a whole session

use std::sync::Arc;

use tickreel_shared::{TickIndex, decode_frame};

use crate::extension::builtin::{
    CreditsExtension, DesyncMonitorExtension, LabelExtension, Position, StartPositionExtension,
};
use crate::net::LocalHub;
use crate::net::packets::{
    PLAYBACK_STATE, PlaybackStateChange, TELEPORT, TICK_ADVANCE, Teleport, TickAdvance,
    decode_payload,
};
use crate::playback::{PlaybackState, TickInputContainer, TickOutcome};
use crate::session::{SessionSettings, TasSession};

fn live_input(tick: TickIndex) -> TickInputContainer {
    let keys: &[&str] = if tick.0 % 3 == 0 { &["W", "LSHIFT"] } else { &["A"] };
    TickInputContainer::default()
        .with_keys(keys.iter().copied())
        .with_camera(17.5, tick.0 as f32 * 2.0)
}

fn start() -> Position {
    Position {
        x: 0.5,
        y: 64.0,
        z: -3.25,
        pitch: 10.0,
        yaw: 90.0,
    }
}

fn settings_in(dir: &tempfile::TempDir) -> SessionSettings {
    SessionSettings {
        directory: dir.path().join("tasfiles"),
        tick_sync: false,
        ..SessionSettings::default()
    }
}

fn session_with_builtins(settings: SessionSettings) -> TasSession {
    let mut session = TasSession::with_settings(settings).unwrap();
    let extensions = session.extensions_mut();
    extensions
        .metadata
        .register(Box::new(CreditsExtension::new("Alice")));
    extensions
        .metadata
        .register(Box::new(StartPositionExtension::new().with_probe(Arc::new(start))));
    extensions
        .file_commands
        .register(Box::new(LabelExtension::new()));
    extensions
        .file_commands
        .register(Box::new(DesyncMonitorExtension::new(Arc::new(start))));
    session
}

fn record(session: &mut TasSession, ticks: usize) {
    session.set_state(PlaybackState::Recording).unwrap();
    let mut source = live_input;
    for _ in 0..ticks {
        assert!(matches!(session.tick(&mut source), TickOutcome::Recorded(_)));
    }
    session.set_state(PlaybackState::Idle).unwrap();
}

fn credit(session: &mut TasSession, key: &str) -> String {
    let metadata = session
        .extensions_mut()
        .metadata
        .get_enabled_mut(CreditsExtension::NAME)
        .unwrap()
        .on_store()
        .unwrap();
    metadata.get_value(key).unwrap().to_string()
}

#[test]
fn test_record_then_play_back_until_idle() {
    let mut session = TasSession::new();
    record(&mut session, 5);
    assert_eq!(session.controller().log().len(), 5);

    session.set_state(PlaybackState::Playback).unwrap();
    let mut source = |_tick: TickIndex| -> TickInputContainer {
        panic!("live input must not be sampled during playback")
    };
    for i in 0..5u64 {
        match session.tick(&mut source) {
            TickOutcome::Replayed(tick, input) => {
                assert_eq!(tick, TickIndex(i));
                assert_eq!(input, live_input(tick));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(session.tick(&mut source), TickOutcome::PlaybackFinished);
    assert_eq!(session.state(), PlaybackState::Idle);
    assert_eq!(session.tick(&mut source), TickOutcome::Idle);
}

#[test]
fn test_save_load_save_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_with_builtins(settings_in(&dir));
    record(&mut session, 4);
    // Resuming a non-empty recording counts as a rerecord
    record(&mut session, 2);

    let path = session.save("any_percent").unwrap();
    assert_eq!(path, dir.path().join("tasfiles").join("any_percent.tas"));
    let first = std::fs::read_to_string(&path).unwrap();
    assert!(first.contains("Rerecords:1"));
    assert!(first.contains("[StartPosition]\nx:0.5\n"));

    let mut restored = session_with_builtins(settings_in(&dir));
    restored.load("any_percent").unwrap();
    assert_eq!(restored.controller().log(), session.controller().log());
    assert_eq!(restored.controller().metadata().len(), 2);
    assert_eq!(restored.save_to_string().unwrap(), first);
}

#[test]
fn test_failed_load_leaves_clean_session() {
    let mut session = session_with_builtins(SessionSettings::default());
    record(&mut session, 3);
    session
        .extensions_mut()
        .metadata
        .get_enabled_mut(CreditsExtension::NAME)
        .unwrap()
        .on_load(&{
            let mut metadata = crate::tasfile::PlaybackMetadata::new(CreditsExtension::NAME);
            metadata.set_value("Author", "Bob").unwrap();
            metadata
        })
        .unwrap();

    let corrupt = "# TASfile\n\
                   # Flavor: v1\n\
                   [Credits]\n\
                   Author:Mallory\n\
                   # Start Data\n\
                   $label one,two;\n\
                   0|W;;0,0,0;0.0,0.0\n";
    let err = session.load_from_str(corrupt).unwrap_err();
    assert!(!err.is_recoverable());

    assert_eq!(session.state(), PlaybackState::Idle);
    assert!(session.controller().log().is_empty());
    assert!(session.controller().metadata().is_empty());
    assert_eq!(credit(&mut session, "Author"), "Alice");
    assert_eq!(credit(&mut session, "Playing Time"), "00:00:00.000");
}

#[test]
fn test_oversized_playing_time_is_rejected() {
    let mut session = session_with_builtins(SessionSettings::default());
    record(&mut session, 2);

    let text = "# TASfile\n\
                # Flavor: v1\n\
                [Credits]\n\
                Playing Time:99999999999999:00:00.000\n\
                # Start Data\n";
    let err = session.load_from_str(text).unwrap_err();
    assert!(matches!(
        err,
        crate::SessionError::Load(crate::LoadError::CorruptMetadata { .. })
    ));
    assert!(session.controller().log().is_empty());
    assert_eq!(credit(&mut session, "Playing Time"), "00:00:00.000");
}

#[test]
fn test_unparseable_file_keeps_session() {
    let mut session = session_with_builtins(SessionSettings::default());
    record(&mut session, 3);

    assert!(session.load_from_str("not a tasfile").is_err());
    assert_eq!(session.controller().log().len(), 3);
    assert_eq!(credit(&mut session, "Playing Time"), "00:00:00.150");
}

#[test]
fn test_missing_file_is_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_with_builtins(settings_in(&dir));
    record(&mut session, 2);

    let err = session.load("does_not_exist").unwrap_err();
    assert!(err.is_recoverable());
    assert_eq!(session.controller().log().len(), 2);
}

#[test]
fn test_playback_start_notifies_and_teleports_peers() {
    let hub = LocalHub::new();
    let mut peer = hub.connect_peer();

    let mut session = TasSession::with_settings(SessionSettings {
        tick_sync: false,
        ..SessionSettings::default()
    })
    .unwrap()
    .with_packet_sink(hub.sink());
    session.extensions_mut().metadata.register(Box::new(
        StartPositionExtension::new()
            .with_probe(Arc::new(start))
            .with_sink(hub.sink()),
    ));

    record(&mut session, 2);
    session.set_state(PlaybackState::Playback).unwrap();

    let frames: Vec<Vec<u8>> = std::iter::from_fn(|| peer.try_recv()).collect();
    assert_eq!(frames.len(), 4);

    let (id, payload, _) = decode_frame(&frames[2]).unwrap();
    assert_eq!(id, PLAYBACK_STATE.numeric_id);
    let change: PlaybackStateChange = decode_payload(payload).unwrap();
    assert_eq!(
        change,
        PlaybackStateChange {
            from: PlaybackState::Idle,
            to: PlaybackState::Playback
        }
    );

    let (id, payload, _) = decode_frame(&frames[3]).unwrap();
    assert_eq!(id, TELEPORT.numeric_id);
    let teleport: Teleport = decode_payload(payload).unwrap();
    assert_eq!(teleport.position, start());
}

#[test]
fn test_step_waits_for_every_peer() {
    let hub = LocalHub::new();
    let mut peer = hub.connect_peer();

    let mut session = TasSession::with_settings(SessionSettings {
        notify_state: false,
        ..SessionSettings::default()
    })
    .unwrap()
    .with_packet_sink(hub.sink());
    let barrier = Arc::clone(session.tick_sync().unwrap());
    barrier.connect(peer.id());

    session.set_state(PlaybackState::Recording).unwrap();
    let mut source = live_input;
    assert_eq!(session.step(&mut source), None);
    assert!(session.controller().log().is_empty());

    barrier.on_ack(peer.id());
    assert_eq!(
        session.step(&mut source),
        Some(TickOutcome::Recorded(TickIndex(0)))
    );

    let frame = peer.try_recv().unwrap();
    let (id, payload, _) = decode_frame(&frame).unwrap();
    assert_eq!(id, TICK_ADVANCE.numeric_id);
    let advance: TickAdvance = decode_payload(payload).unwrap();
    assert_eq!(advance.tick, TickIndex(1));

    // The ack was consumed by the advance
    assert_eq!(session.step(&mut source), None);
}
