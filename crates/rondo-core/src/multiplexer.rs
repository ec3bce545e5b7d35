//! Root graph multiplexer.
//!
//! Renders every registered graph each block and mixes the audible ones.
//! When the current graph changes, the outgoing graph is faded out and
//! the incoming one faded in across exactly one block, and graphs that lose
//! live MIDI get a kill burst so no note or pedal is left hanging.

use std::sync::Arc;

use rondo_midi::{write_kill_burst, MidiBuffer};

use crate::buffer::AudioBuffer;
use crate::context::RenderContext;
use crate::graph::GraphHandle;
use crate::notify::ActiveGraphNotifier;
use crate::transport::TransportSnapshot;

/// Graph slots reserved up front.
pub const GRAPH_CAPACITY: usize = 32;

/// Program change seen on the input, resolved at the next block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramRequest {
    pub program: u8,
    /// Zero-based MIDI channel.
    pub channel: u8,
}

/// Owns the ordered graph set and the per-block scratch buffers.
///
/// All mutation except [`GraphMultiplexer::render_block`] happens on the
/// control thread while the engine lock is held.
pub struct GraphMultiplexer {
    graphs: Vec<GraphHandle>,
    current: isize,
    last: isize,
    pending_program: Option<ProgramRequest>,
    audio_out: AudioBuffer,
    audio_temp: AudioBuffer,
    control_temp: AudioBuffer,
    midi_out: MidiBuffer,
    midi_temp: MidiBuffer,
    notifier: Arc<ActiveGraphNotifier>,
}

impl GraphMultiplexer {
    pub fn new(notifier: Arc<ActiveGraphNotifier>) -> Self {
        Self {
            graphs: Vec::with_capacity(GRAPH_CAPACITY),
            current: -1,
            last: -1,
            pending_program: None,
            audio_out: AudioBuffer::default(),
            audio_temp: AudioBuffer::default(),
            control_temp: AudioBuffer::default(),
            midi_out: MidiBuffer::new(),
            midi_temp: MidiBuffer::new(),
            notifier,
        }
    }

    /// Register a graph at the end of the set. Not realtime safe.
    ///
    /// The first graph becomes current immediately. Returns false if the
    /// graph is already registered.
    pub fn add_graph(&mut self, graph: GraphHandle) -> bool {
        if self.contains(&graph) {
            return false;
        }
        self.graphs.push(graph.clone());
        let index = self.graphs.len() as isize - 1;
        graph.set_engine_index(index);

        if index == 0 {
            self.set_current_graph(0);
            self.last = 0;
        }
        true
    }

    /// Detach a graph and renumber the rest. Not realtime safe.
    pub fn remove_graph(&mut self, graph: &GraphHandle) -> bool {
        let Some(position) = self.graphs.iter().position(|g| g.ptr_eq(graph)) else {
            return false;
        };
        self.graphs.remove(position);
        graph.set_engine_index(-1);
        for (index, g) in self.graphs.iter().enumerate() {
            g.set_engine_index(index as isize);
        }

        let max_index = self.graphs.len() as isize - 1;
        if self.current > max_index {
            self.set_current_graph(max_index);
        }
        if self.last > max_index {
            self.last = max_index;
        }
        true
    }

    pub fn contains(&self, graph: &GraphHandle) -> bool {
        self.graphs.iter().any(|g| g.ptr_eq(graph))
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    pub fn graphs(&self) -> &[GraphHandle] {
        &self.graphs
    }

    #[inline]
    pub fn graph(&self, index: isize) -> Option<&GraphHandle> {
        usize::try_from(index).ok().and_then(|i| self.graphs.get(i))
    }

    /// Select the graph heard from the next rendered block on.
    ///
    /// Returns the previous index. Out-of-range indices are accepted and
    /// render silence.
    pub fn set_current_graph(&mut self, index: isize) -> isize {
        let previous = self.current;
        if index != previous {
            self.current = index;
            self.notifier.publish(index);
        }
        previous
    }

    #[inline]
    pub fn current_graph(&self) -> isize {
        self.current
    }

    #[inline]
    pub fn last_graph(&self) -> isize {
        self.last
    }

    pub fn current(&self) -> Option<&GraphHandle> {
        self.graph(self.current)
    }

    /// Program change waiting for the next block.
    pub fn pending_program(&self) -> Option<ProgramRequest> {
        self.pending_program
    }

    /// First graph (lowest index) mapped to the program on that channel.
    pub fn find_graph_for_program(&self, request: ProgramRequest) -> Option<isize> {
        if request.program >= 128 {
            return None;
        }
        self.graphs
            .iter()
            .find(|g| {
                g.midi_program() == Some(request.program)
                    && g.accepts_midi_channel(request.channel)
            })
            .map(GraphHandle::engine_index)
    }

    /// Size scratch storage for the device. Not realtime safe.
    pub fn prepare_buffers(&mut self, num_inputs: usize, num_outputs: usize, block_size: usize) {
        let channels = num_inputs.max(num_outputs);
        self.audio_out.allocate(channels, block_size);
        self.audio_temp.allocate(channels, block_size);
        self.control_temp.allocate(channels, block_size);
        self.midi_out.clear();
        self.midi_temp.clear();
    }

    pub fn release_buffers(&mut self) {
        self.audio_out.release();
        self.audio_temp.release();
        self.control_temp.release();
        self.midi_out.clear();
        self.midi_temp.clear();
    }

    /// Processing latency the host should compensate.
    pub fn latency_samples(&self) -> usize {
        let Some(current) = self.current() else {
            return 0;
        };
        if current.is_single() {
            return current.latency_samples();
        }
        self.graphs
            .iter()
            .filter(|g| !g.is_single())
            .map(GraphHandle::latency_samples)
            .max()
            .unwrap_or(0)
    }

    /// Render one block in place.
    ///
    /// `audio` carries `num_inputs` input channels in and the mix out.
    /// `midi` carries the live input in and the graphs' MIDI out.
    pub fn render_block(
        &mut self,
        audio: &mut AudioBuffer,
        midi: &mut MidiBuffer,
        num_inputs: usize,
        transport: &TransportSnapshot,
    ) {
        if let Some(request) = self.pending_program.take() {
            if let Some(index) = self.find_graph_for_program(request) {
                self.set_current_graph(index);
            }
        }

        let (Some(current), Some(last)) = (self.graph(self.current), self.graph(self.last)) else {
            audio.clear();
            midi.clear();
            return;
        };

        let current_index = self.current;
        let last_index = self.last;
        let current_single = current.is_single();
        let last_single = last.is_single();
        let graph_changed = current_index != last_index;
        let mode_changed = graph_changed && current.render_mode() != last.render_mode();

        let num_channels = audio.num_channels();
        let num_samples = audio.num_samples();
        let num_inputs = num_inputs.min(num_channels);
        debug_assert!(self.audio_temp.fits(num_channels, num_samples));

        self.audio_out.set_size(num_channels, num_samples);
        self.audio_out.clear();
        self.midi_out.clear();

        for (index, graph) in self.graphs.iter().enumerate() {
            let index = index as isize;
            let graph_single = graph.is_single();
            let is_current = index == current_index;
            let is_last = index == last_index;

            self.audio_temp.set_size(num_channels, num_samples);
            for channel in 0..num_channels {
                if channel < num_inputs {
                    self.audio_temp.copy_from_slice(channel, audio.channel(channel));
                } else {
                    self.audio_temp.clear_channel(channel);
                }
            }
            self.control_temp.set_size(num_channels, num_samples);
            self.control_temp.clear();

            self.midi_temp.clear();
            let kill = (is_last && graph_changed && last_single)
                || (graph_changed && current_single && !is_current);
            let audible = (is_current && graph_single) || (!graph_single && !current_single);
            if kill {
                write_kill_burst(&mut self.midi_temp);
            } else if audible {
                self.midi_temp.add_buffer(midi);
            }

            let mut ctx = RenderContext {
                audio: &mut self.audio_temp,
                control: &mut self.control_temp,
                midi: &mut self.midi_temp,
                num_samples,
                transport: *transport,
            };
            graph.render_block(&mut ctx);

            let fade_out = graph_changed
                && is_last
                && (current_single || (mode_changed && graph_single));
            if fade_out {
                self.audio_out.add_buffer_with_ramp(&self.audio_temp, 1.0, 0.0);
            } else if audible {
                let fade_in = graph_changed && (graph_single || mode_changed);
                if fade_in {
                    self.audio_out.add_buffer_with_ramp(&self.audio_temp, 0.0, 1.0);
                } else {
                    self.audio_out.add_buffer(&self.audio_temp);
                }
                self.midi_out.add_buffer(&self.midi_temp);
            }
        }

        audio.copy_from(&self.audio_out);

        let program = midi
            .iter()
            .filter(|e| e.frame_offset < num_samples)
            .filter_map(|e| Some((e.program()?, e.channel()?)))
            .last();
        if let Some((program, channel)) = program {
            self.pending_program = Some(ProgramRequest { program, channel });
        }

        midi.copy_from(&self.midi_out);
        self.last = self.current;
    }
}
