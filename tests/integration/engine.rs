//! Engine lifecycle integration tests
//!
//! Device preparation, silence before and after the device runs, channel
//! layout and graph registration.

use std::sync::{Arc, Mutex};

use rondo::prelude::*;

use crate::helpers::tolerances::FLOAT_EPSILON;
use crate::helpers::*;

/// Records lifecycle calls made by the engine.
struct LifecycleGraph {
    prepared: Arc<Mutex<Vec<(f64, usize)>>>,
    released: Arc<Mutex<usize>>,
}

impl RootGraph for LifecycleGraph {
    fn prepare(&mut self, sample_rate: f64, block_size: usize) {
        self.prepared.lock().unwrap().push((sample_rate, block_size));
    }

    fn release(&mut self) {
        *self.released.lock().unwrap() += 1;
    }

    fn render(&mut self, _ctx: &mut RenderContext<'_>) {}
}

#[test]
fn test_unprepared_engine_renders_silence() {
    let engine = AudioEngine::builder().build().unwrap();
    engine.add_graph(constant_graph("loud", 1.0)).unwrap();
    assert!(!engine.is_prepared());

    let mut left = vec![0.7f32; TEST_BUFFER_SIZE];
    let mut right = vec![0.7f32; TEST_BUFFER_SIZE];
    engine.process_block(
        &[],
        &mut [left.as_mut_slice(), right.as_mut_slice()],
        TEST_BUFFER_SIZE,
    );

    assert_silence(&left, 0.0);
    assert_silence(&right, 0.0);
}

#[test]
fn test_no_graphs_renders_silence() {
    let engine = test_engine();
    let input = vec![vec![0.5f32; TEST_BUFFER_SIZE]; TEST_CHANNELS];
    let output = render_block_with_input(&engine, &input);
    for channel in &output {
        assert_silence(channel, 0.0);
    }
}

#[test]
fn test_prepare_rejects_invalid_device() {
    let engine = AudioEngine::builder().build().unwrap();
    assert!(matches!(
        engine.prepare(1000.0, 512, 2, 2),
        Err(rondo::core::Error::InvalidConfig(_))
    ));
    assert!(engine.prepare(TEST_SAMPLE_RATE, 0, 2, 2).is_err());
    assert!(!engine.is_prepared());

    engine.prepare(TEST_SAMPLE_RATE, 256, 1, 4).unwrap();
    assert_eq!(engine.sample_rate(), Some(TEST_SAMPLE_RATE));
    assert_eq!(engine.block_size(), Some(256));
    assert_eq!(engine.num_channels(true), 1);
    assert_eq!(engine.num_channels(false), 4);
}

#[test]
fn test_builder_rejects_invalid_tempo() {
    assert!(AudioEngine::builder().tempo(5.0).build().is_err());
    assert!(AudioEngine::builder().tempo(1200.0).build().is_err());

    let engine = AudioEngine::builder().tempo(90.0).build().unwrap();
    engine
        .prepare(TEST_SAMPLE_RATE, TEST_BUFFER_SIZE, 2, 2)
        .unwrap();
    render_block(&engine);
    assert_eq!(engine.transport().tempo(), 90.0);
}

#[test]
fn test_single_graph_output() {
    let engine = test_engine();
    engine.add_graph(constant_graph("a", 0.25)).unwrap();

    let output = render_block(&engine);
    assert_constant(&output[0], 0.25, FLOAT_EPSILON);
    assert_constant(&output[1], 0.25, FLOAT_EPSILON);
}

#[test]
fn test_passthrough_graph_copies_input() {
    let engine = test_engine();
    engine
        .add_graph(GraphHandle::new("thru", PassthroughGraph))
        .unwrap();

    let sine = generate_sine(440.0, TEST_SAMPLE_RATE, TEST_BUFFER_SIZE);
    let input = vec![sine.clone(), generate_silence(TEST_BUFFER_SIZE)];
    let output = render_block_with_input(&engine, &input);

    assert_eq!(output[0], sine);
    assert_silence(&output[1], 0.0);
}

#[test]
fn test_extra_output_channels_are_zeroed() {
    let engine = test_engine();
    engine.add_graph(constant_graph("a", 0.5)).unwrap();

    let mut outs = vec![vec![0.9f32; TEST_BUFFER_SIZE]; 3];
    {
        let mut refs: Vec<&mut [f32]> = outs.iter_mut().map(Vec::as_mut_slice).collect();
        engine.process_block(&[], &mut refs, TEST_BUFFER_SIZE);
    }
    assert_constant(&outs[0], 0.5, FLOAT_EPSILON);
    assert_constant(&outs[1], 0.5, FLOAT_EPSILON);
    assert_silence(&outs[2], 0.0);
}

#[test]
fn test_short_block() {
    let engine = test_engine();
    engine.add_graph(constant_graph("a", 0.5)).unwrap();

    let mut left = vec![0.0f32; TEST_BUFFER_SIZE];
    let mut right = vec![0.0f32; TEST_BUFFER_SIZE];
    engine.process_block(&[], &mut [left.as_mut_slice(), right.as_mut_slice()], 100);

    assert_constant(&left[..100], 0.5, FLOAT_EPSILON);
    assert_silence(&left[100..], 0.0);
}

#[test]
fn test_stop_renders_silence() {
    let engine = test_engine();
    engine.add_graph(constant_graph("a", 0.5)).unwrap();
    render_block(&engine);

    engine.stop();
    assert!(!engine.is_prepared());
    let output = render_block(&engine);
    assert_silence(&output[0], 0.0);
}

#[test]
fn test_graph_lifecycle_follows_device() {
    let prepared = Arc::new(Mutex::new(Vec::new()));
    let released = Arc::new(Mutex::new(0));
    let graph = GraphHandle::new(
        "life",
        LifecycleGraph {
            prepared: Arc::clone(&prepared),
            released: Arc::clone(&released),
        },
    );

    let engine = AudioEngine::builder().build().unwrap();
    engine.add_graph(graph.clone()).unwrap();
    assert!(prepared.lock().unwrap().is_empty());

    engine.prepare(44100.0, 128, 2, 2).unwrap();
    assert_eq!(*prepared.lock().unwrap(), vec![(44100.0, 128)]);

    // Re-preparing releases first.
    engine.prepare(TEST_SAMPLE_RATE, 256, 2, 2).unwrap();
    assert_eq!(*released.lock().unwrap(), 1);
    assert_eq!(prepared.lock().unwrap().last(), Some(&(TEST_SAMPLE_RATE, 256)));

    engine.stop();
    assert_eq!(*released.lock().unwrap(), 2);
}

#[test]
fn test_graph_added_while_running_is_prepared() {
    let prepared = Arc::new(Mutex::new(Vec::new()));
    let released = Arc::new(Mutex::new(0));
    let graph = GraphHandle::new(
        "late",
        LifecycleGraph {
            prepared: Arc::clone(&prepared),
            released: Arc::clone(&released),
        },
    );

    let engine = test_engine();
    engine.add_graph(graph.clone()).unwrap();
    assert_eq!(
        *prepared.lock().unwrap(),
        vec![(TEST_SAMPLE_RATE, TEST_BUFFER_SIZE)]
    );

    engine.remove_graph(&graph).unwrap();
    assert_eq!(*released.lock().unwrap(), 1);
    assert_eq!(graph.engine_index(), -1);
}

#[test]
fn test_duplicate_and_unknown_graphs() {
    let engine = test_engine();
    let a = constant_graph("a", 1.0);
    engine.add_graph(a.clone()).unwrap();

    assert!(matches!(
        engine.add_graph(a.clone()),
        Err(rondo::core::Error::GraphAlreadyAdded(name)) if name == "a"
    ));
    assert!(matches!(
        engine.remove_graph(&constant_graph("ghost", 1.0)),
        Err(rondo::core::Error::GraphNotFound(_))
    ));
    assert_eq!(engine.num_graphs(), 1);
    assert!(engine.graph(0).unwrap() == a);
    assert!(engine.graph(1).is_none());
}

#[test]
fn test_latency_follows_current_graph() {
    let engine = test_engine();
    engine
        .add_graph(GraphHandle::new(
            "fast",
            ConstantGraph {
                value: 0.0,
                latency: 0,
            },
        ))
        .unwrap();
    engine
        .add_graph(GraphHandle::new(
            "slow",
            ConstantGraph {
                value: 0.0,
                latency: 64,
            },
        ))
        .unwrap();

    assert_eq!(engine.latency_samples(), 0);
    engine.request_current_graph(1);
    render_block(&engine);
    assert_eq!(engine.latency_samples(), 64);
}

#[test]
fn test_latency_change_is_cached_and_signalled() {
    let engine = test_engine();
    engine.add_graph(constant_graph("fast", 0.0)).unwrap();
    let slow = GraphHandle::new(
        "slow",
        ConstantGraph {
            value: 0.0,
            latency: 128,
        },
    );
    engine.add_graph(slow.clone()).unwrap();
    render_block(&engine);
    engine.poll_active_graph_changed();
    assert_eq!(engine.reported_latency_samples(), 0);
    assert_eq!(engine.poll_latency_changed(), None);

    engine.request_current_graph(1);
    render_block(&engine);
    // Cached value only moves once the switch is reported.
    assert_eq!(engine.reported_latency_samples(), 0);
    assert_eq!(engine.poll_active_graph_changed(), Some(1));
    assert_eq!(engine.reported_latency_samples(), 128);
    assert_eq!(engine.poll_latency_changed(), Some(128));
    assert_eq!(engine.poll_latency_changed(), None);

    engine.remove_graph(&slow).unwrap();
    assert_eq!(engine.poll_latency_changed(), Some(0));
}

#[test]
fn test_midi_activity_monitor() {
    let engine = test_engine();
    engine.add_graph(constant_graph("a", 0.0)).unwrap();
    let activity = engine.midi_activity();

    engine.handle_incoming_midi(MidiEvent::timing_clock(0), 0.0);
    assert!(!activity.take_received());

    engine.handle_incoming_midi(MidiEvent::note_on(0, 0, 60, 100), 0.0);
    assert!(activity.take_received());
    assert!(!activity.take_received());
    assert!(!activity.take_sent());

    render_block(&engine);
    assert!(activity.take_sent());

    render_block(&engine);
    assert!(!activity.take_sent());
}

#[test]
fn test_external_buffers_for_plugin_hosts() {
    let engine = test_engine_with_settings(EngineSettings {
        run_mode: RunMode::Plugin,
        ..Default::default()
    });
    let mut midi_out = engine.take_midi_output().unwrap();
    let recorder = recording_graph("rec", 0.5);
    engine.add_graph(recorder.graph.clone()).unwrap();
    engine.transport().request_play_state(true);

    let mut audio = AudioBuffer::new(TEST_CHANNELS, 256);
    let mut midi = MidiBuffer::new();
    midi.add_event(MidiEvent::note_on(10, 0, 60, 100));
    engine.process_external_buffers(&mut audio, &mut midi);

    for channel in 0..TEST_CHANNELS {
        assert_constant(audio.channel(channel), 0.5, FLOAT_EPSILON);
    }
    let heard = recorder.last_midi();
    assert_eq!(heard.len(), 1);
    assert_eq!(heard[0].frame_offset, 10);
    assert_eq!(midi.len(), 1);
    assert!(midi.events()[0].is_note_on());

    assert!(!midi_out.has_pending());
    assert_eq!(engine.transport().position_frames(), 256);
}

#[test]
fn test_raw_midi_bytes() {
    let engine = test_engine();
    let recorder = recording_graph("rec", 0.0);
    engine.add_graph(recorder.graph.clone()).unwrap();

    engine
        .handle_incoming_midi_bytes(&[0x90, 60, 100], 0.0)
        .unwrap();
    // SysEx is not a block event.
    assert!(engine
        .handle_incoming_midi_bytes(&[0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7], 0.0)
        .is_err());

    render_block(&engine);
    let midi = recorder.last_midi();
    assert_eq!(midi.len(), 1);
    assert!(midi[0].is_note_on());
    assert_eq!(midi[0].note(), Some(60));
}

#[test]
fn test_graph_midi_reaches_output_queue() {
    let engine = test_engine();
    engine.add_graph(constant_graph("a", 0.0)).unwrap();
    let mut midi_out = engine.take_midi_output().unwrap();
    assert!(engine.take_midi_output().is_none());

    render_block(&engine);
    engine.queue_midi(MidiEvent::note_on(10, 0, 64, 90));
    render_block(&engine);

    let sent = midi_out.drain_all();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].sample_time, TEST_BUFFER_SIZE as u64 + 10);
    assert_eq!(sent[0].event.note(), Some(64));
}

#[test]
fn test_settings_swap() {
    let engine = test_engine();
    assert_eq!(*engine.settings(), EngineSettings::default());

    let settings = EngineSettings {
        midi_out_latency_ms: 2000.0,
        ..Default::default()
    };
    assert!(engine.apply_settings(settings).is_err());
    assert_eq!(engine.settings().midi_out_latency_ms, 0.0);

    let settings = EngineSettings {
        midi_out_latency_ms: -12.0,
        ..Default::default()
    };
    engine.apply_settings(settings.clone()).unwrap();
    assert_eq!(*engine.settings(), settings);
}
