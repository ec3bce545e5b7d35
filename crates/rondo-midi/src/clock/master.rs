//! Sample-accurate MIDI clock generator.

use super::PULSES_PER_QUARTER;
use crate::buffer::MidiBuffer;
use crate::event::MidiEvent;

/// Play-state change seen across one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEdge {
    /// Stopped to playing from the top.
    Start,
    /// Stopped to playing from somewhere else.
    Continue,
    /// Playing to stopped.
    Stop,
}

impl TransportEdge {
    /// Compare play state before and after the transport consumed its requests.
    pub fn detect(was_playing: bool, is_playing: bool, position_frames: i64) -> Option<Self> {
        match (was_playing, is_playing) {
            (false, true) if position_frames <= 0 => Some(TransportEdge::Start),
            (false, true) => Some(TransportEdge::Continue),
            (true, false) => Some(TransportEdge::Stop),
            _ => None,
        }
    }

    #[inline]
    fn to_event(self) -> MidiEvent {
        match self {
            TransportEdge::Start => MidiEvent::start(0),
            TransportEdge::Continue => MidiEvent::resume(0),
            TransportEdge::Stop => MidiEvent::stop(0),
        }
    }
}

/// Generates Timing Clock pulses at the transport tempo.
#[derive(Debug, Clone)]
pub struct MidiClockMaster {
    sample_rate: f64,
    tempo: f64,
    /// Samples from the start of the next block to the next pulse.
    next_pulse: f64,
}

impl MidiClockMaster {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            tempo: 120.0,
            next_pulse: 0.0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn set_tempo(&mut self, bpm: f64) {
        self.tempo = bpm;
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Next block starts with a pulse.
    pub fn reset(&mut self) {
        self.next_pulse = 0.0;
    }

    /// `None` when tempo or sample rate cannot produce a pulse train.
    pub fn samples_per_pulse(&self) -> Option<f64> {
        if self.tempo <= 0.0 || self.sample_rate <= 0.0 {
            return None;
        }
        let spp = self.sample_rate * 60.0 / (self.tempo * PULSES_PER_QUARTER as f64);
        (spp >= 1.0).then_some(spp)
    }

    /// Render one block of clock into `midi`. Returns the number of pulses.
    ///
    /// A transport edge is written first at offset 0. Start and Continue
    /// re-align the pulse train so a pulse lands on the same sample.
    pub fn render(
        &mut self,
        midi: &mut MidiBuffer,
        num_samples: usize,
        edge: Option<TransportEdge>,
    ) -> usize {
        if let Some(edge) = edge {
            midi.add_event(edge.to_event());
            if edge != TransportEdge::Stop {
                self.next_pulse = 0.0;
            }
        }

        let Some(spp) = self.samples_per_pulse() else {
            return 0;
        };

        let block = num_samples as f64;
        let mut position = self.next_pulse;
        let mut pulses = 0;
        while position < block {
            midi.add_event(MidiEvent::timing_clock(position as usize));
            position += spp;
            pulses += 1;
        }
        self.next_pulse = position - block;
        pulses
    }
}
