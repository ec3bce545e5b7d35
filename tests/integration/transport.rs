//! Transport integration tests
//!
//! Requests from the control thread only land at the next block; MIDI
//! start/stop/continue and plugin host playheads drive the same transport.

use approx::assert_relative_eq;
use rondo::midi::SystemRealTimeMsg;
use rondo::prelude::*;

use crate::helpers::*;

#[test]
fn test_requests_are_deferred_to_the_next_block() {
    let engine = test_engine();
    let transport = engine.transport();

    transport.request_play_state(true);
    assert!(!transport.is_playing());

    render_block(&engine);
    assert!(transport.is_playing());
    assert_eq!(transport.position_frames(), TEST_BUFFER_SIZE as i64);

    render_blocks(&engine, 3);
    assert_eq!(transport.position_frames(), 4 * TEST_BUFFER_SIZE as i64);
}

#[test]
fn test_stopped_transport_holds_position() {
    let engine = test_engine();
    let transport = engine.transport();

    transport.request_audio_frame(48000);
    render_blocks(&engine, 2);
    assert!(!transport.is_playing());
    assert_eq!(transport.position_frames(), 48000);

    transport.request_play_pause();
    render_block(&engine);
    assert!(transport.is_playing());
    transport.request_play_pause();
    render_block(&engine);
    assert!(!transport.is_playing());
    assert_eq!(transport.position_frames(), 48000 + TEST_BUFFER_SIZE as i64);
}

#[test]
fn test_graph_sees_block_snapshot() {
    let engine = test_engine();
    let recorder = recording_graph("rec", 0.0);
    engine.add_graph(recorder.graph.clone()).unwrap();

    engine.transport().request_play_state(true);
    engine.transport().request_record_state(true);
    render_block(&engine);

    let first = recorder.last_transport().unwrap();
    assert!(first.playing);
    assert!(first.recording);
    assert_eq!(first.position_frames, 0);
    assert_eq!(first.sample_rate, TEST_SAMPLE_RATE);
    assert_eq!(first.tempo, 120.0);

    render_block(&engine);
    let second = recorder.last_transport().unwrap();
    assert_eq!(second.position_frames, TEST_BUFFER_SIZE as i64);
    assert_relative_eq!(
        second.position_beats(),
        TEST_BUFFER_SIZE as f64 / TEST_SAMPLE_RATE * 2.0,
        epsilon = 1e-9
    );
}

#[test]
fn test_tempo_and_meter_validation() {
    let engine = test_engine();
    let transport = engine.transport();

    assert!(matches!(
        transport.request_tempo(5.0),
        Err(rondo::core::Error::InvalidTempo(_))
    ));
    assert!(transport.request_meter(3, 6).is_err());
    assert!(transport.request_meter(0, 4).is_err());

    transport.request_tempo(96.0).unwrap();
    transport.request_meter(7, 8).unwrap();
    render_block(&engine);
    assert_eq!(transport.tempo(), 96.0);
    assert_eq!(transport.monitor().meter(), (7, 8));
}

#[test]
fn test_session_tempo() {
    let engine = test_engine();
    assert!(engine.set_session_tempo(1000.0).is_err());

    engine.set_session_tempo(90.0).unwrap();
    assert_eq!(engine.session_tempo(), 90.0);
    render_block(&engine);
    assert_eq!(engine.transport().tempo(), 90.0);
}

#[test]
fn test_midi_start_stop_continue() {
    let engine = test_engine_with_settings(EngineSettings {
        respond_to_start_stop_continue: true,
        ..Default::default()
    });
    let transport = engine.transport();

    transport.request_audio_frame(10_000);
    render_block(&engine);

    engine.handle_incoming_midi(MidiEvent::start(0), 0.0);
    render_block(&engine);
    assert!(transport.is_playing());
    assert_eq!(transport.position_frames(), TEST_BUFFER_SIZE as i64);

    engine.handle_incoming_midi(MidiEvent::stop(0), 0.1);
    render_block(&engine);
    assert!(!transport.is_playing());
    assert_eq!(transport.position_frames(), TEST_BUFFER_SIZE as i64);

    engine.handle_incoming_midi(MidiEvent::resume(0), 0.2);
    render_block(&engine);
    assert!(transport.is_playing());
    assert_eq!(transport.position_frames(), 2 * TEST_BUFFER_SIZE as i64);
}

#[test]
fn test_midi_start_ignored_by_default() {
    let engine = test_engine();
    let recorder = recording_graph("rec", 0.0);
    engine.add_graph(recorder.graph.clone()).unwrap();

    engine.handle_incoming_midi(MidiEvent::start(0), 0.0);
    render_block(&engine);
    assert!(!engine.transport().is_playing());

    // Still delivered to the graph as plain MIDI.
    assert_eq!(
        count_real_time(&recorder.last_midi(), SystemRealTimeMsg::Start),
        1
    );
}

#[test]
fn test_host_playhead_applies_immediately() {
    let engine = test_engine_with_settings(EngineSettings {
        run_mode: RunMode::Plugin,
        ..Default::default()
    });
    let transport = engine.transport();

    engine.sync_host_playhead(&HostPlayhead {
        tempo: Some(100.0),
        time_signature: Some((3, 4)),
        playing: true,
        recording: false,
        position_frames: Some(96_000),
    });

    assert!(transport.is_playing());
    assert!(!transport.is_recording());
    assert_eq!(transport.tempo(), 100.0);
    assert_eq!(transport.monitor().meter(), (3, 4));
    assert_eq!(transport.position_frames(), 96_000);

    // Host keeps the same position: no relocation, the block advances.
    render_block(&engine);
    engine.sync_host_playhead(&HostPlayhead {
        playing: true,
        position_frames: Some(96_000 + TEST_BUFFER_SIZE as i64),
        ..Default::default()
    });
    assert_eq!(transport.position_frames(), 96_000 + TEST_BUFFER_SIZE as i64);
    assert_eq!(transport.tempo(), 100.0);
}

#[test]
fn test_time_master_follows_run_mode() {
    let engine = test_engine();
    assert!(engine.is_time_master());
    assert!(!engine.is_using_external_clock());

    let plugin = test_engine_with_settings(EngineSettings {
        run_mode: RunMode::Plugin,
        ..Default::default()
    });
    assert!(plugin.is_time_master());
    plugin.set_session_external_sync(true);
    assert!(!plugin.is_time_master());
    assert!(plugin.is_using_external_clock());
}
