//! Coalescing change notifications from the render thread.
//!
//! Each cell is written without blocking or allocating and polled from a
//! control or UI timer. Any number of writes between two polls collapse
//! into one notification.

use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};

/// Single-slot cell the render thread writes and the control thread polls.
///
/// Any number of publishes between two polls collapse into one
/// notification carrying the latest index. Publishing never blocks or
/// allocates.
#[derive(Debug)]
pub struct ActiveGraphNotifier {
    index: AtomicIsize,
    pending: AtomicBool,
}

impl ActiveGraphNotifier {
    pub fn new(index: isize) -> Self {
        Self {
            index: AtomicIsize::new(index),
            pending: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn publish(&self, index: isize) {
        self.index.store(index, Ordering::Release);
        self.pending.store(true, Ordering::Release);
    }

    /// Index the render thread is currently using.
    #[inline]
    pub fn current(&self) -> isize {
        self.index.load(Ordering::Acquire)
    }

    /// Consume the pending notification only if `accept` agrees with the
    /// published index. A rejected notification stays pending.
    pub fn take_if(&self, accept: impl Fn(isize) -> bool) -> Option<isize> {
        if !self.has_pending() {
            return None;
        }
        let index = self.current();
        if !accept(index) {
            return None;
        }
        self.pending
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        // A publish that raced the exchange must not be lost.
        if self.current() != index {
            self.pending.store(true, Ordering::Release);
        }
        Some(index)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl Default for ActiveGraphNotifier {
    fn default() -> Self {
        Self::new(-1)
    }
}

/// Cached latency with a coalesced "changed" flag.
#[derive(Debug, Default)]
pub struct LatencyNotifier {
    samples: AtomicUsize,
    changed: AtomicBool,
}

impl LatencyNotifier {
    /// Store `samples`; flags a change only when the value differs.
    pub fn publish(&self, samples: usize) -> bool {
        let previous = self.samples.swap(samples, Ordering::AcqRel);
        if previous != samples {
            self.changed.store(true, Ordering::Release);
        }
        previous != samples
    }

    #[inline]
    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::Acquire)
    }

    /// Latest latency if it changed since the last poll.
    pub fn take(&self) -> Option<usize> {
        self.changed
            .swap(false, Ordering::AcqRel)
            .then(|| self.samples())
    }
}

/// MIDI traffic indicator for a UI activity light.
///
/// `received` is set by the MIDI input thread and `sent` by the callback;
/// a UI timer consumes both.
#[derive(Debug, Default)]
pub struct MidiActivityMonitor {
    received: AtomicBool,
    sent: AtomicBool,
}

impl MidiActivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn received(&self) {
        self.received.store(true, Ordering::Release);
    }

    #[inline]
    pub fn sent(&self) {
        self.sent.store(true, Ordering::Release);
    }

    /// Whether anything arrived since the last poll.
    pub fn take_received(&self) -> bool {
        self.received.swap(false, Ordering::AcqRel)
    }

    /// Whether anything went out since the last poll.
    pub fn take_sent(&self) -> bool {
        self.sent.swap(false, Ordering::AcqRel)
    }
}
