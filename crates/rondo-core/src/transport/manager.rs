//! Transport state owned by the render thread.

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver};

use super::handle::{TransportHandle, TransportMonitor};
use super::TransportSnapshot;

/// Pending requests per block before senders start dropping.
const REQUEST_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum TransportRequest {
    PlayState(bool),
    TogglePlayPause,
    RecordState(bool),
    Tempo(f32),
    Meter { beats_per_bar: u32, beat_unit: u32 },
    AudioFrame(i64),
}

/// Transport state machine.
///
/// Requests arrive through a [`TransportHandle`] and only take effect in
/// [`Transport::pre_process`], so a block never sees a half-applied change.
pub struct Transport {
    requests: Receiver<TransportRequest>,
    handle: TransportHandle,
    monitor: Arc<TransportMonitor>,
    state: TransportSnapshot,
}

impl Transport {
    pub fn new() -> Self {
        let (tx, requests) = bounded(REQUEST_QUEUE_CAPACITY);
        let monitor = Arc::new(TransportMonitor::new());
        Self {
            requests,
            handle: TransportHandle::new(tx, Arc::clone(&monitor)),
            monitor,
            state: TransportSnapshot::default(),
        }
    }

    pub fn handle(&self) -> TransportHandle {
        self.handle.clone()
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.state.sample_rate = sample_rate;
        self.monitor.publish(&self.state);
    }

    /// Apply queued requests (call at the top of the block).
    pub fn pre_process(&mut self, _num_samples: usize) {
        while let Ok(request) = self.requests.try_recv() {
            self.apply(request);
        }
    }

    /// Move the playhead; no-op while stopped.
    pub fn advance(&mut self, num_samples: usize) {
        if self.state.playing {
            self.state.position_frames += num_samples as i64;
        }
    }

    /// Publish the block's final state to observers.
    pub fn post_process(&mut self, _num_samples: usize) {
        self.monitor.publish(&self.state);
    }

    fn apply(&mut self, request: TransportRequest) {
        match request {
            TransportRequest::PlayState(playing) => self.state.playing = playing,
            TransportRequest::TogglePlayPause => self.state.playing = !self.state.playing,
            TransportRequest::RecordState(recording) => self.state.recording = recording,
            TransportRequest::Tempo(bpm) => self.state.tempo = bpm,
            TransportRequest::Meter {
                beats_per_bar,
                beat_unit,
            } => {
                self.state.beats_per_bar = beats_per_bar;
                self.state.beat_unit = beat_unit;
            }
            TransportRequest::AudioFrame(frame) => self.state.position_frames = frame.max(0),
        }
    }

    #[inline]
    pub fn snapshot(&self) -> TransportSnapshot {
        self.state
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state.playing
    }

    #[inline]
    pub fn position_frames(&self) -> i64 {
        self.state.position_frames
    }

    #[inline]
    pub fn tempo(&self) -> f32 {
        self.state.tempo
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}
