//! Tempo follower for incoming MIDI clock.

use super::PULSES_PER_QUARTER;

/// Intervals averaged for one estimate (one quarter note).
const WINDOW: usize = PULSES_PER_QUARTER as usize;

/// Intervals at or below this (seconds) are treated as duplicates.
const MIN_INTERVAL: f64 = 1.0e-4;

/// A gap longer than this (seconds) means the clock source went away.
const DROPOUT_INTERVAL: f64 = 0.5;

/// Smallest tempo movement (BPM) that is reported.
const TEMPO_THRESHOLD: f64 = 0.1;

/// Lock state changes reported by [`MidiClockSlave`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockSlaveEvent {
    Acquired { bpm: f64 },
    TempoChanged { bpm: f64 },
    Dropped,
}

/// Averages Timing Clock intervals into a tempo estimate.
///
/// Fed from the MIDI input thread, never from the audio callback.
#[derive(Debug, Clone)]
pub struct MidiClockSlave {
    intervals: [f64; WINDOW],
    count: usize,
    write: usize,
    last_pulse: Option<f64>,
    reported_bpm: f64,
    locked: bool,
}

impl MidiClockSlave {
    pub fn new() -> Self {
        Self {
            intervals: [0.0; WINDOW],
            count: 0,
            write: 0,
            last_pulse: None,
            reported_bpm: 0.0,
            locked: false,
        }
    }

    /// Feed one Timing Clock received at `timestamp` seconds.
    pub fn process_clock(&mut self, timestamp: f64) -> Option<ClockSlaveEvent> {
        let Some(last) = self.last_pulse else {
            self.last_pulse = Some(timestamp);
            return None;
        };

        let interval = timestamp - last;
        if interval <= MIN_INTERVAL {
            return None;
        }
        self.last_pulse = Some(timestamp);

        if interval > DROPOUT_INTERVAL {
            return self.drop_lock();
        }

        self.intervals[self.write] = interval;
        self.write = (self.write + 1) % WINDOW;
        self.count = (self.count + 1).min(WINDOW);
        if self.count < WINDOW {
            return None;
        }

        let average = self.intervals.iter().sum::<f64>() / WINDOW as f64;
        let bpm = 60.0 / (average * PULSES_PER_QUARTER as f64);

        if !self.locked {
            self.locked = true;
            self.reported_bpm = bpm;
            tracing::info!(bpm, "MIDI clock acquired");
            return Some(ClockSlaveEvent::Acquired { bpm });
        }

        if (bpm - self.reported_bpm).abs() >= TEMPO_THRESHOLD {
            self.reported_bpm = bpm;
            return Some(ClockSlaveEvent::TempoChanged { bpm });
        }
        None
    }

    /// Report a dropout when no pulse arrived for too long.
    pub fn poll(&mut self, now: f64) -> Option<ClockSlaveEvent> {
        match self.last_pulse {
            Some(last) if self.locked && now - last > DROPOUT_INTERVAL => self.drop_lock(),
            _ => None,
        }
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Last reported tempo while locked.
    pub fn tempo(&self) -> Option<f64> {
        self.locked.then_some(self.reported_bpm)
    }

    fn drop_lock(&mut self) -> Option<ClockSlaveEvent> {
        let was_locked = self.locked;
        self.count = 0;
        self.write = 0;
        self.locked = false;
        if was_locked {
            tracing::warn!("MIDI clock dropped");
        }
        was_locked.then_some(ClockSlaveEvent::Dropped)
    }
}

impl Default for MidiClockSlave {
    fn default() -> Self {
        Self::new()
    }
}
