//! Lock-free MIDI transfer between device threads and the audio callback.
//!
//! Input: device/UI threads push, the callback drains a whole block at once.
//! Output: the callback pushes stamped events, the MIDI driver drains them.

use crate::buffer::MidiBuffer;
use crate::event::MidiEvent;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

/// Default capacity for both queues.
const DEFAULT_CAPACITY: usize = 1024;

/// Producer side of the MIDI input queue (non-realtime threads).
pub struct MidiInputProducer {
    producer: HeapProd<MidiEvent>,
}

impl MidiInputProducer {
    /// Returns false if the queue is full and the event was dropped.
    #[inline]
    pub fn push(&mut self, event: MidiEvent) -> bool {
        self.producer.try_push(event).is_ok()
    }
}

/// Consumer side of the MIDI input queue (audio callback).
pub struct MidiInputConsumer {
    consumer: HeapCons<MidiEvent>,
}

impl MidiInputConsumer {
    /// Move every queued event into `midi`, clamping offsets into the block.
    ///
    /// Returns the number of events that did not fit into `midi`.
    #[inline]
    pub fn drain_into(&mut self, midi: &mut MidiBuffer, num_samples: usize) -> usize {
        let last_frame = num_samples.saturating_sub(1);
        let mut dropped = 0;
        while let Some(event) = self.consumer.try_pop() {
            let event = event.with_offset(event.frame_offset.min(last_frame));
            if !midi.add_event(event) {
                dropped += 1;
            }
        }
        dropped
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.consumer.occupied_len()
    }
}

/// Create the device-to-callback queue.
pub fn midi_input_queue(capacity: usize) -> (MidiInputProducer, MidiInputConsumer) {
    let (producer, consumer) = HeapRb::new(capacity.max(1)).split();
    (
        MidiInputProducer { producer },
        MidiInputConsumer { consumer },
    )
}

/// An event leaving the engine, stamped for the output driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutgoingMidi {
    pub event: MidiEvent,
    /// Absolute sample position (engine sample clock + block offset).
    pub sample_time: u64,
    /// Extra delay the driver should apply, in milliseconds.
    pub latency_ms: f64,
}

/// Producer for outgoing MIDI (audio callback).
pub struct MidiOutputProducer {
    producer: HeapProd<OutgoingMidi>,
}

impl MidiOutputProducer {
    /// Returns false if the driver fell behind and the event was dropped.
    #[inline]
    pub fn push(&mut self, message: OutgoingMidi) -> bool {
        self.producer.try_push(message).is_ok()
    }
}

/// Consumer for outgoing MIDI (output driver thread).
pub struct MidiOutputConsumer {
    consumer: HeapCons<OutgoingMidi>,
}

impl MidiOutputConsumer {
    #[inline]
    pub fn pop(&mut self) -> Option<OutgoingMidi> {
        self.consumer.try_pop()
    }

    /// Drain all pending events into a vector
    pub fn drain_all(&mut self) -> Vec<OutgoingMidi> {
        let mut events = Vec::with_capacity(self.consumer.occupied_len());
        while let Some(event) = self.consumer.try_pop() {
            events.push(event);
        }
        events
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.consumer.is_empty()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.consumer.occupied_len()
    }
}

/// Create the callback-to-driver queue.
pub fn midi_output_queue(capacity: usize) -> (MidiOutputProducer, MidiOutputConsumer) {
    let (producer, consumer) = HeapRb::new(capacity.max(1)).split();
    (
        MidiOutputProducer { producer },
        MidiOutputConsumer { consumer },
    )
}

/// Queue pair with the default capacity.
pub fn default_midi_input_queue() -> (MidiInputProducer, MidiInputConsumer) {
    midi_input_queue(DEFAULT_CAPACITY)
}

/// Queue pair with the default capacity.
pub fn default_midi_output_queue() -> (MidiOutputProducer, MidiOutputConsumer) {
    midi_output_queue(DEFAULT_CAPACITY)
}
