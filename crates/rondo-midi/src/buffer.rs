//! Fixed-capacity block MIDI buffer.

use crate::event::MidiEvent;

/// Default number of events a block buffer holds before dropping.
const DEFAULT_CAPACITY: usize = 1024;

/// Events for one render block, kept sorted by `frame_offset`.
///
/// Insertion is stable: events sharing an offset keep the order they were
/// added in. Capacity is reserved up front and never grows, so every
/// operation here is safe on the audio thread.
#[derive(Debug)]
pub struct MidiBuffer {
    events: Vec<MidiEvent>,
    capacity: usize,
}

impl MidiBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert an event in offset order.
    ///
    /// Returns false (and drops the event) when the buffer is full.
    #[inline]
    pub fn add_event(&mut self, event: MidiEvent) -> bool {
        if self.events.len() >= self.capacity {
            return false;
        }
        let index = self
            .events
            .partition_point(|e| e.frame_offset <= event.frame_offset);
        self.events.insert(index, event);
        true
    }

    /// Merge every event of `other` into this buffer.
    ///
    /// Returns the number of events that did not fit.
    pub fn add_buffer(&mut self, other: &MidiBuffer) -> usize {
        other
            .events
            .iter()
            .filter(|event| !self.add_event(**event))
            .count()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Replace the contents with `other`'s, keeping this buffer's capacity.
    ///
    /// Returns the number of events that did not fit.
    pub fn copy_from(&mut self, other: &MidiBuffer) -> usize {
        self.events.clear();
        let count = other.len().min(self.capacity);
        self.events.extend_from_slice(&other.events[..count]);
        other.len() - count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, MidiEvent> {
        self.events.iter()
    }
}

impl Clone for MidiBuffer {
    fn clone(&self) -> Self {
        let mut events = Vec::with_capacity(self.capacity);
        events.extend_from_slice(&self.events);
        Self {
            events,
            capacity: self.capacity,
        }
    }
}

impl Default for MidiBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a MidiBuffer {
    type Item = &'a MidiEvent;
    type IntoIter = core::slice::Iter<'a, MidiEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
