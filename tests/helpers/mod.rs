//! Test helpers and fixtures for rondo integration tests.
//!
//! Nothing here touches a real device: blocks are pushed through
//! [`AudioEngine::process_block`] by hand, one call per simulated callback.

#![allow(dead_code)]

pub mod tolerances;

use std::sync::{Arc, Mutex};

use rondo::prelude::*;

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Standard buffer size for deterministic testing
pub const TEST_BUFFER_SIZE: usize = 512;

/// Stereo in, stereo out.
pub const TEST_CHANNELS: usize = 2;

/// MIDI seen by a graph, one entry per rendered block.
pub type MidiLog = Arc<Mutex<Vec<Vec<MidiEvent>>>>;

/// Transport seen by a graph, one entry per rendered block.
pub type TransportLog = Arc<Mutex<Vec<TransportSnapshot>>>;

/// Writes a constant to every channel. Leaves MIDI untouched.
pub struct ConstantGraph {
    pub value: f32,
    pub latency: usize,
}

impl RootGraph for ConstantGraph {
    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        for channel in 0..ctx.audio.num_channels() {
            ctx.audio.channel_mut(channel).fill(self.value);
        }
    }

    fn latency_samples(&self) -> usize {
        self.latency
    }
}

/// Leaves audio and MIDI untouched.
pub struct PassthroughGraph;

impl RootGraph for PassthroughGraph {
    fn render(&mut self, _ctx: &mut RenderContext<'_>) {}
}

/// Constant output that logs its MIDI and transport every block.
pub struct RecordingGraph {
    value: f32,
    midi: MidiLog,
    transport: TransportLog,
}

impl RootGraph for RecordingGraph {
    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        self.midi.lock().unwrap().push(ctx.midi.events().to_vec());
        self.transport.lock().unwrap().push(ctx.transport);
        for channel in 0..ctx.audio.num_channels() {
            ctx.audio.channel_mut(channel).fill(self.value);
        }
    }
}

/// Handle plus the logs its processor writes to.
pub struct Recorder {
    pub graph: GraphHandle,
    pub midi: MidiLog,
    pub transport: TransportLog,
}

impl Recorder {
    pub fn last_midi(&self) -> Vec<MidiEvent> {
        self.midi.lock().unwrap().last().cloned().unwrap_or_default()
    }

    pub fn last_transport(&self) -> Option<TransportSnapshot> {
        self.transport.lock().unwrap().last().copied()
    }

    pub fn blocks_rendered(&self) -> usize {
        self.midi.lock().unwrap().len()
    }
}

pub fn constant_graph(name: &str, value: f32) -> GraphHandle {
    GraphHandle::new(name, ConstantGraph { value, latency: 0 })
}

pub fn recording_graph(name: &str, value: f32) -> Recorder {
    let midi = MidiLog::default();
    let transport = TransportLog::default();
    let graph = GraphHandle::new(
        name,
        RecordingGraph {
            value,
            midi: Arc::clone(&midi),
            transport: Arc::clone(&transport),
        },
    );
    Recorder {
        graph,
        midi,
        transport,
    }
}

/// Engine with default settings, prepared for the test device.
pub fn test_engine() -> AudioEngine {
    test_engine_with_settings(EngineSettings::default())
}

/// Route engine logs to the test harness output (first call wins).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn test_engine_with_settings(settings: EngineSettings) -> AudioEngine {
    init_tracing();
    let engine = AudioEngine::builder()
        .settings(settings)
        .build()
        .expect("Failed to create test engine");
    engine
        .prepare(TEST_SAMPLE_RATE, TEST_BUFFER_SIZE, TEST_CHANNELS, TEST_CHANNELS)
        .expect("Failed to prepare test engine");
    engine
}

/// Run one callback with silent input. Returns the output channels.
pub fn render_block(engine: &AudioEngine) -> Vec<Vec<f32>> {
    let input = vec![generate_silence(TEST_BUFFER_SIZE); TEST_CHANNELS];
    render_block_with_input(engine, &input)
}

/// Run one callback with the given input channels.
pub fn render_block_with_input(engine: &AudioEngine, input: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let inputs: Vec<&[f32]> = input.iter().map(Vec::as_slice).collect();
    let mut output = vec![vec![0.0f32; TEST_BUFFER_SIZE]; TEST_CHANNELS];
    {
        let mut outputs: Vec<&mut [f32]> = output.iter_mut().map(Vec::as_mut_slice).collect();
        engine.process_block(&inputs, &mut outputs, TEST_BUFFER_SIZE);
    }
    output
}

pub fn render_blocks(engine: &AudioEngine, count: usize) {
    for _ in 0..count {
        render_block(engine);
    }
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Generate silence (zero samples).
pub fn generate_silence(num_samples: usize) -> Vec<f32> {
    vec![0.0; num_samples]
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Assert that a signal is approximately silent (all values near zero).
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(
        max <= tolerance,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Assert every sample equals `value` within tolerance.
pub fn assert_constant(samples: &[f32], value: f32, tolerance: f32) {
    for (i, sample) in samples.iter().enumerate() {
        assert!(
            (sample - value).abs() <= tolerance,
            "sample {} was {}, expected {}",
            i,
            sample,
            value
        );
    }
}

/// Real-time messages of one kind in a MIDI log entry.
pub fn count_real_time(events: &[MidiEvent], msg: rondo::midi::SystemRealTimeMsg) -> usize {
    events
        .iter()
        .filter(|e| e.real_time_msg() == Some(msg))
        .count()
}

/// Sixteen-channel kill burst at offset 0.
pub fn is_kill_burst(events: &[MidiEvent]) -> bool {
    events.len() == rondo::midi::KILL_BURST_LEN
        && events.iter().all(|e| e.frame_offset == 0)
        && events.iter().filter(|e| e.is_all_notes_off()).count() == 16
}
