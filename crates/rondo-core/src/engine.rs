//! Audio engine facade: the device callback plus its control surface.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rondo_midi::{
    midi_input_queue, midi_output_queue, ClockSlaveEvent, MidiBuffer, MidiClockMaster,
    MidiClockSlave, MidiEvent, MidiInputConsumer, MidiInputProducer, MidiOutputConsumer,
    MidiOutputProducer, MidiPanic, OutgoingMidi, SystemRealTimeMsg, TransportEdge,
};

use crate::buffer::AudioBuffer;
use crate::config::{validate_device, EngineSettings, RunMode};
use crate::graph::GraphHandle;
use crate::metering::{LevelMeter, LevelMeterBank};
use crate::multiplexer::GraphMultiplexer;
use crate::notify::{ActiveGraphNotifier, LatencyNotifier, MidiActivityMonitor};
use crate::transport::{
    validate_tempo, HostPlayhead, Transport, TransportHandle, DEFAULT_TEMPO,
};
use crate::{AtomicFlag, AtomicFloat, AtomicIndex, Error, Result};

const DEFAULT_MIDI_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
struct DeviceSetup {
    sample_rate: f64,
    block_size: usize,
    num_inputs: usize,
    num_outputs: usize,
}

/// The part of a block that runs on any pair of audio and MIDI buffers.
struct Renderer {
    mux: GraphMultiplexer,
    transport: Transport,
    clock_master: MidiClockMaster,
    midi_in: MidiInputConsumer,
}

/// Everything the callback touches, behind the engine lock.
struct EngineState {
    renderer: Renderer,
    meters: LevelMeterBank,
    midi_out: MidiOutputProducer,
    block_midi: MidiBuffer,
    io: AudioBuffer,
    setup: Option<DeviceSetup>,
    sample_time: u64,
}

/// Real-time host engine.
///
/// `process_block` is the device callback. Every other method is for
/// control, UI or MIDI-input threads. The callback only ever `try_lock`s
/// the engine lock and renders silence when it is contended.
pub struct AudioEngine {
    state: Mutex<EngineState>,
    settings: ArcSwap<EngineSettings>,
    requested_graph: AtomicIndex,
    notifier: Arc<ActiveGraphNotifier>,
    latency: LatencyNotifier,
    midi_activity: Arc<MidiActivityMonitor>,
    transport: TransportHandle,
    midi_input: Mutex<MidiInputProducer>,
    midi_output: Mutex<Option<MidiOutputConsumer>>,
    clock_slave: Mutex<MidiClockSlave>,
    session_tempo: AtomicFloat,
    session_external_sync: AtomicFlag,
}

impl AudioEngine {
    pub fn builder() -> AudioEngineBuilder {
        AudioEngineBuilder::default()
    }

    // ------------------------------------------------------------------
    // Device lifecycle
    // ------------------------------------------------------------------

    /// Size buffers for the device and prepare every graph.
    pub fn prepare(
        &self,
        sample_rate: f64,
        block_size: usize,
        num_inputs: usize,
        num_outputs: usize,
    ) -> Result<()> {
        validate_device(sample_rate, block_size)?;

        let mut guard = self.state.lock();
        let state = &mut *guard;

        if state.setup.is_some() {
            for graph in state.renderer.mux.graphs() {
                graph.release();
            }
        }

        state.setup = Some(DeviceSetup {
            sample_rate,
            block_size,
            num_inputs,
            num_outputs,
        });
        state
            .renderer
            .mux
            .prepare_buffers(num_inputs, num_outputs, block_size);
        state.io.allocate(num_inputs.max(num_outputs), block_size);
        state.meters.grow(num_inputs, num_outputs);
        state.block_midi.clear();

        let renderer = &mut state.renderer;
        renderer.transport.set_sample_rate(sample_rate);
        renderer.clock_master.set_sample_rate(sample_rate);
        renderer
            .clock_master
            .set_tempo(renderer.transport.tempo() as f64);
        renderer.clock_master.reset();

        for graph in renderer.mux.graphs() {
            graph.prepare(sample_rate, block_size);
        }
        drop(guard);

        self.clock_slave.lock().reset();
        self.update_latency_samples();
        tracing::info!(
            sample_rate,
            block_size,
            num_inputs,
            num_outputs,
            "audio engine prepared"
        );
        Ok(())
    }

    /// Release graphs and scratch buffers after the device stopped.
    pub fn stop(&self) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.setup.take().is_some() {
            for graph in state.renderer.mux.graphs() {
                graph.release();
            }
        }
        state.renderer.mux.release_buffers();
        state.io.release();
        state.block_midi.clear();
        tracing::info!("audio engine stopped");
    }

    pub fn is_prepared(&self) -> bool {
        self.state.lock().setup.is_some()
    }

    pub fn sample_rate(&self) -> Option<f64> {
        self.state.lock().setup.map(|s| s.sample_rate)
    }

    pub fn block_size(&self) -> Option<usize> {
        self.state.lock().setup.map(|s| s.block_size)
    }

    /// Active device channels (0 when stopped).
    pub fn num_channels(&self, input: bool) -> usize {
        self.state
            .lock()
            .setup
            .map_or(0, |s| if input { s.num_inputs } else { s.num_outputs })
    }

    // ------------------------------------------------------------------
    // Device callback
    // ------------------------------------------------------------------

    /// Render one device block. Never blocks and never allocates.
    pub fn process_block(
        &self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        num_samples: usize,
    ) {
        let Some(mut guard) = self.state.try_lock() else {
            silence(outputs, num_samples);
            return;
        };
        let state = &mut *guard;
        let Some(setup) = state.setup else {
            silence(outputs, num_samples);
            return;
        };

        debug_assert!(num_samples <= setup.block_size);
        let device_samples = num_samples;
        let num_samples = num_samples.min(setup.block_size);
        let num_inputs = inputs.len().min(setup.num_inputs);
        let num_outputs = outputs.len().min(setup.num_outputs);

        state.meters.update(&inputs[..num_inputs], num_samples, true);

        state
            .io
            .set_size(setup.num_inputs.max(setup.num_outputs), num_samples);
        for channel in 0..state.io.num_channels() {
            match inputs.get(channel) {
                Some(input) if channel < num_inputs => state.io.copy_from_slice(channel, input),
                _ => state.io.clear_channel(channel),
            }
        }

        let settings = self.settings.load();
        state.block_midi.clear();
        self.process_current_graph(
            &mut state.renderer,
            &settings,
            &mut state.io,
            &mut state.block_midi,
            num_inputs,
        );

        for (channel, output) in outputs.iter_mut().enumerate() {
            let len = num_samples.min(output.len());
            if channel < num_outputs {
                output[..len].copy_from_slice(&state.io.channel(channel)[..len]);
            } else {
                output[..len].fill(0.0);
            }
            let end = device_samples.min(output.len());
            output[len..end].fill(0.0);
        }

        if !state.block_midi.is_empty() {
            self.midi_activity.sent();
        }
        let latency_ms = settings.midi_out_latency_ms;
        for event in state.block_midi.iter() {
            state.midi_out.push(OutgoingMidi {
                event: *event,
                sample_time: state.sample_time + event.frame_offset as u64,
                latency_ms,
            });
        }
        state.sample_time += num_samples as u64;

        state
            .meters
            .update(&outputs[..num_outputs], num_samples, false);
    }

    /// Render a plugin host's block in place.
    ///
    /// `midi` carries the host's input in and the graphs' MIDI out, merged
    /// with anything queued through [`Self::queue_midi`]. Nothing goes to the
    /// output queue and the device meters are left alone. Contention, a
    /// stopped engine or a block larger than prepared renders silence and
    /// clears `midi`.
    pub fn process_external_buffers(&self, audio: &mut AudioBuffer, midi: &mut MidiBuffer) {
        let Some(mut guard) = self.state.try_lock() else {
            audio.clear();
            midi.clear();
            return;
        };
        let state = &mut *guard;
        let Some(setup) = state.setup else {
            audio.clear();
            midi.clear();
            return;
        };

        let fits = audio.num_samples() <= setup.block_size
            && audio.num_channels() <= setup.num_inputs.max(setup.num_outputs);
        debug_assert!(fits, "host block exceeds the prepared size");
        if !fits {
            audio.clear();
            midi.clear();
            return;
        }

        let num_inputs = audio.num_channels().min(setup.num_inputs);
        let settings = self.settings.load();
        self.process_current_graph(&mut state.renderer, &settings, audio, midi, num_inputs);
        state.sample_time += audio.num_samples() as u64;
    }

    /// Collect MIDI, run transport and clock, and render the graphs into
    /// `audio` and `midi`.
    fn process_current_graph(
        &self,
        renderer: &mut Renderer,
        settings: &EngineSettings,
        audio: &mut AudioBuffer,
        midi: &mut MidiBuffer,
        num_inputs: usize,
    ) {
        let num_samples = audio.num_samples();
        renderer.midi_in.drain_into(midi, num_samples);
        MidiPanic::new(settings.panic).process(midi);

        let transport = &mut renderer.transport;
        let was_playing = transport.is_playing();
        transport.pre_process(num_samples);
        let edge = TransportEdge::detect(
            was_playing,
            transport.is_playing(),
            transport.position_frames(),
        );

        let generate_clock = settings.generates_midi_clock();
        let clock_to_input = settings.clock_to_input();
        if generate_clock {
            renderer.clock_master.set_tempo(transport.tempo() as f64);
        }
        if clock_to_input {
            renderer.clock_master.render(midi, num_samples, edge);
        }

        let requested = self.requested_graph.get();
        if requested != renderer.mux.current_graph() {
            renderer.mux.set_current_graph(requested);
        }

        let snapshot = renderer.transport.snapshot();
        renderer
            .mux
            .render_block(audio, midi, num_inputs, &snapshot);

        // A program change may have overridden the request.
        let effective = renderer.mux.current_graph();
        if effective != requested {
            self.requested_graph.compare_exchange(requested, effective);
        }

        if generate_clock && !clock_to_input {
            renderer.clock_master.render(midi, num_samples, edge);
        }

        renderer.transport.advance(num_samples);
        renderer.transport.post_process(num_samples);
    }

    // ------------------------------------------------------------------
    // MIDI input
    // ------------------------------------------------------------------

    /// MIDI input callback.
    ///
    /// Queues the event for the next block and, when external clock or
    /// start/stop/continue handling is enabled, drives the clock follower
    /// and the transport.
    pub fn handle_incoming_midi(&self, event: MidiEvent, timestamp: f64) {
        if !matches!(
            event.real_time_msg(),
            Some(SystemRealTimeMsg::TimingClock | SystemRealTimeMsg::ActiveSensing)
        ) {
            self.midi_activity.received();
        }
        self.queue_midi(event);

        let settings = self.settings.load();
        let clock_wanted = settings.follows_midi_clock() && self.session_external_sync.get();
        if !clock_wanted && !settings.respond_to_start_stop_continue {
            return;
        }

        match event.real_time_msg() {
            Some(SystemRealTimeMsg::TimingClock) => {
                let change = self.clock_slave.lock().process_clock(timestamp);
                if let Some(change) = change {
                    self.on_clock_change(change);
                }
            }
            Some(SystemRealTimeMsg::Start) => {
                self.transport.request_play_state(true);
                self.transport.request_audio_frame(0);
            }
            Some(SystemRealTimeMsg::Stop) => self.transport.request_play_state(false),
            Some(SystemRealTimeMsg::Continue) => self.transport.request_play_state(true),
            _ => {}
        }
    }

    /// Parse raw wire bytes and handle them like [`Self::handle_incoming_midi`].
    pub fn handle_incoming_midi_bytes(&self, bytes: &[u8], timestamp: f64) -> Result<()> {
        let event = MidiEvent::from_bytes(bytes)?;
        self.handle_incoming_midi(event, timestamp);
        Ok(())
    }

    /// Queue MIDI for the next block without device-side handling.
    ///
    /// Returns false if the input queue is full.
    pub fn queue_midi(&self, event: MidiEvent) -> bool {
        let queued = self.midi_input.lock().push(event);
        if !queued {
            tracing::warn!("MIDI input queue full, dropping event");
        }
        queued
    }

    /// Check the external clock for a dropout (call from a timer).
    pub fn poll_external_clock(&self, now: f64) {
        let change = self.clock_slave.lock().poll(now);
        if let Some(change) = change {
            self.on_clock_change(change);
        }
    }

    fn on_clock_change(&self, change: ClockSlaveEvent) {
        match change {
            ClockSlaveEvent::Acquired { bpm } | ClockSlaveEvent::TempoChanged { bpm } => {
                if !self.follows_external_clock() {
                    return;
                }
                if let Err(e) = self.transport.request_tempo(bpm as f32) {
                    tracing::warn!(bpm, error = %e, "ignoring external clock tempo");
                }
            }
            ClockSlaveEvent::Dropped => {
                tracing::debug!("external clock lost, holding last tempo");
            }
        }
    }

    /// Take the outgoing MIDI stream (once).
    pub fn take_midi_output(&self) -> Option<MidiOutputConsumer> {
        self.midi_output.lock().take()
    }

    // ------------------------------------------------------------------
    // Graphs
    // ------------------------------------------------------------------

    /// Register a graph, preparing it first if the device is running.
    pub fn add_graph(&self, graph: GraphHandle) -> Result<()> {
        let setup = {
            let state = self.state.lock();
            if state.renderer.mux.contains(&graph) {
                return Err(Error::GraphAlreadyAdded(graph.name().to_string()));
            }
            state.setup
        };

        if let Some(setup) = setup {
            graph.prepare(setup.sample_rate, setup.block_size);
        }

        {
            let mut state = self.state.lock();
            if !state.renderer.mux.add_graph(graph.clone()) {
                return Err(Error::GraphAlreadyAdded(graph.name().to_string()));
            }
            if graph.engine_index() == 0 {
                self.requested_graph.set(0);
            }
        }
        self.update_latency_samples();

        tracing::debug!(
            name = graph.name(),
            index = graph.engine_index(),
            "graph added"
        );
        Ok(())
    }

    /// Deregister a graph and release it. The caller keeps ownership.
    pub fn remove_graph(&self, graph: &GraphHandle) -> Result<()> {
        let prepared = {
            let mut state = self.state.lock();
            let mux = &mut state.renderer.mux;
            if !mux.remove_graph(graph) {
                return Err(Error::GraphNotFound(graph.name().to_string()));
            }
            if self.requested_graph.get() >= mux.len() as isize {
                self.requested_graph.set(mux.current_graph());
            }
            state.setup.is_some()
        };
        self.update_latency_samples();

        if prepared {
            graph.release();
        }
        tracing::debug!(name = graph.name(), "graph removed");
        Ok(())
    }

    pub fn graph(&self, index: isize) -> Option<GraphHandle> {
        self.state.lock().renderer.mux.graph(index).cloned()
    }

    pub fn num_graphs(&self) -> usize {
        self.state.lock().renderer.mux.len()
    }

    /// Ask for another graph; applied at the next block. Returns the
    /// previously requested index.
    pub fn request_current_graph(&self, index: isize) -> isize {
        self.requested_graph.swap(index)
    }

    /// Requested graph (may not be rendering yet).
    pub fn active_graph(&self) -> isize {
        self.requested_graph.get()
    }

    /// Graph the callback rendered last.
    pub fn current_graph_index(&self) -> isize {
        self.notifier.current()
    }

    /// Settled active-graph change since the last poll, if any.
    ///
    /// Changes still in flight (rendering index differs from the request)
    /// are held back until a later poll finds them settled. Reporting a
    /// change also refreshes the cached latency.
    pub fn poll_active_graph_changed(&self) -> Option<isize> {
        let requested = self.requested_graph.get();
        let index = self.notifier.take_if(|index| index == requested)?;
        self.update_latency_samples();
        Some(index)
    }

    /// Latency of what is currently audible, queried from the graphs.
    pub fn latency_samples(&self) -> usize {
        self.state.lock().renderer.mux.latency_samples()
    }

    /// Re-query the graphs and cache the result for
    /// [`Self::reported_latency_samples`].
    ///
    /// Runs after graph add/remove, prepare and every reported graph change;
    /// call it again when a graph's own latency changes.
    pub fn update_latency_samples(&self) -> usize {
        let samples = self.latency_samples();
        if self.latency.publish(samples) {
            tracing::debug!(samples, "latency changed");
        }
        samples
    }

    /// Last latency cached by [`Self::update_latency_samples`]. Lock-free.
    pub fn reported_latency_samples(&self) -> usize {
        self.latency.samples()
    }

    /// New latency if it changed since the last poll.
    pub fn poll_latency_changed(&self) -> Option<usize> {
        self.latency.take()
    }

    /// MIDI in/out activity flags for a UI indicator.
    pub fn midi_activity(&self) -> Arc<MidiActivityMonitor> {
        Arc::clone(&self.midi_activity)
    }

    pub fn level_meter(&self, channel: usize, input: bool) -> Option<Arc<LevelMeter>> {
        self.state.lock().meters.meter(channel, input)
    }

    // ------------------------------------------------------------------
    // Settings, tempo and transport
    // ------------------------------------------------------------------

    /// Swap in a new settings snapshot.
    ///
    /// Switching to MIDI clock starts the follower from scratch; switching
    /// back to the internal clock restores the session tempo.
    pub fn apply_settings(&self, settings: EngineSettings) -> Result<()> {
        settings.validate()?;
        tracing::info!(?settings, "applying engine settings");

        let follows = settings.follows_midi_clock();
        if follows {
            self.clock_slave.lock().reset();
        }
        let previous = self.settings.swap(Arc::new(settings));

        if previous.follows_midi_clock() && !follows {
            if let Err(e) = self.transport.request_tempo(self.session_tempo.get()) {
                tracing::warn!(error = %e, "could not restore session tempo");
            }
        }
        Ok(())
    }

    pub fn settings(&self) -> Arc<EngineSettings> {
        self.settings.load_full()
    }

    /// Tempo stored in the session. Ignored while following external clock.
    pub fn set_session_tempo(&self, bpm: f32) -> Result<()> {
        validate_tempo(bpm)?;
        self.session_tempo.set(bpm);
        if !self.follows_external_clock() {
            self.transport.request_tempo(bpm)?;
        }
        Ok(())
    }

    pub fn session_tempo(&self) -> f32 {
        self.session_tempo.get()
    }

    /// Whether the session wants to follow an external clock.
    pub fn set_session_external_sync(&self, wants_clock: bool) {
        if wants_clock {
            self.clock_slave.lock().reset();
        } else if let Err(e) = self.transport.request_tempo(self.session_tempo.get()) {
            tracing::warn!(error = %e, "could not restore session tempo");
        }
        self.session_external_sync.set(wants_clock);
    }

    pub fn is_using_external_clock(&self) -> bool {
        match self.settings.load().run_mode {
            RunMode::Plugin => self.session_external_sync.get(),
            RunMode::Standalone => self.follows_external_clock(),
        }
    }

    pub fn is_time_master(&self) -> bool {
        match self.settings.load().run_mode {
            RunMode::Plugin => !self.session_external_sync.get(),
            RunMode::Standalone => {
                !self.settings.load().follows_midi_clock() && !self.session_external_sync.get()
            }
        }
    }

    fn follows_external_clock(&self) -> bool {
        self.session_external_sync.get() && self.settings.load().follows_midi_clock()
    }

    pub fn transport(&self) -> TransportHandle {
        self.transport.clone()
    }

    /// Follow a plugin host's playhead. Applied immediately when the engine
    /// lock is free, otherwise at the next block.
    pub fn sync_host_playhead(&self, playhead: &HostPlayhead) {
        if let Some(bpm) = playhead.tempo {
            self.transport.request_tempo(bpm).ok();
        }
        if let Some((numerator, denominator)) = playhead.time_signature {
            self.transport.request_meter(numerator, denominator).ok();
        }
        self.transport.request_play_state(playhead.playing);
        self.transport.request_record_state(playhead.recording);

        let Some(mut state) = self.state.try_lock() else {
            if let Some(frame) = playhead.position_frames {
                self.transport.request_audio_frame(frame);
            }
            return;
        };
        if let Some(frame) = playhead.position_frames {
            if state.renderer.transport.position_frames() != frame {
                self.transport.request_audio_frame(frame);
            }
        }
        state.renderer.transport.pre_process(0);
        state.renderer.transport.post_process(0);
    }
}

#[inline]
fn silence(outputs: &mut [&mut [f32]], num_samples: usize) {
    for output in outputs.iter_mut() {
        let len = num_samples.min(output.len());
        output[..len].fill(0.0);
    }
}

/// Builder for [`AudioEngine`].
pub struct AudioEngineBuilder {
    settings: EngineSettings,
    tempo: f32,
    midi_input_capacity: usize,
    midi_output_capacity: usize,
}

impl Default for AudioEngineBuilder {
    fn default() -> Self {
        Self {
            settings: EngineSettings::default(),
            tempo: DEFAULT_TEMPO,
            midi_input_capacity: DEFAULT_MIDI_QUEUE_CAPACITY,
            midi_output_capacity: DEFAULT_MIDI_QUEUE_CAPACITY,
        }
    }
}

impl AudioEngineBuilder {
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Initial session tempo (default: 120 BPM).
    pub fn tempo(mut self, bpm: f32) -> Self {
        self.tempo = bpm;
        self
    }

    pub fn midi_input_capacity(mut self, capacity: usize) -> Self {
        self.midi_input_capacity = capacity;
        self
    }

    pub fn midi_output_capacity(mut self, capacity: usize) -> Self {
        self.midi_output_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<AudioEngine> {
        self.settings.validate()?;
        validate_tempo(self.tempo)?;

        let notifier = Arc::new(ActiveGraphNotifier::default());
        let transport = Transport::new();
        let transport_handle = transport.handle();
        transport_handle.request_tempo(self.tempo)?;

        let (midi_input, midi_in) = midi_input_queue(self.midi_input_capacity);
        let (midi_out, midi_output) = midi_output_queue(self.midi_output_capacity);

        let state = EngineState {
            renderer: Renderer {
                mux: GraphMultiplexer::new(Arc::clone(&notifier)),
                transport,
                clock_master: MidiClockMaster::new(0.0),
                midi_in,
            },
            meters: LevelMeterBank::new(),
            midi_out,
            block_midi: MidiBuffer::new(),
            io: AudioBuffer::default(),
            setup: None,
            sample_time: 0,
        };

        tracing::debug!(tempo = self.tempo, run_mode = ?self.settings.run_mode, "audio engine created");

        Ok(AudioEngine {
            state: Mutex::new(state),
            settings: ArcSwap::from_pointee(self.settings),
            requested_graph: AtomicIndex::default(),
            notifier,
            latency: LatencyNotifier::default(),
            midi_activity: Arc::new(MidiActivityMonitor::new()),
            transport: transport_handle,
            midi_input: Mutex::new(midi_input),
            midi_output: Mutex::new(Some(midi_output)),
            clock_slave: Mutex::new(MidiClockSlave::new()),
            session_tempo: AtomicFloat::new(self.tempo),
            session_external_sync: AtomicFlag::new(false),
        })
    }
}
