//! Control-thread side of the transport.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};

use super::manager::TransportRequest;
use super::{validate_meter, validate_tempo, TransportSnapshot, DEFAULT_TEMPO};
use crate::{AtomicDouble, AtomicFlag, AtomicFloat, Result};

/// Transport state as of the last processed block.
#[derive(Debug)]
pub struct TransportMonitor {
    playing: AtomicFlag,
    recording: AtomicFlag,
    position_frames: AtomicI64,
    tempo: AtomicFloat,
    beats_per_bar: AtomicU32,
    beat_unit: AtomicU32,
    sample_rate: AtomicDouble,
}

impl TransportMonitor {
    pub(crate) fn new() -> Self {
        Self {
            playing: AtomicFlag::new(false),
            recording: AtomicFlag::new(false),
            position_frames: AtomicI64::new(0),
            tempo: AtomicFloat::new(DEFAULT_TEMPO),
            beats_per_bar: AtomicU32::new(4),
            beat_unit: AtomicU32::new(4),
            sample_rate: AtomicDouble::new(44100.0),
        }
    }

    pub(crate) fn publish(&self, state: &TransportSnapshot) {
        self.playing.set(state.playing);
        self.recording.set(state.recording);
        self.position_frames
            .store(state.position_frames, Ordering::Release);
        self.tempo.set(state.tempo);
        self.beats_per_bar
            .store(state.beats_per_bar, Ordering::Release);
        self.beat_unit.store(state.beat_unit, Ordering::Release);
        self.sample_rate.set(state.sample_rate);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.get()
    }

    pub fn is_recording(&self) -> bool {
        self.recording.get()
    }

    pub fn position_frames(&self) -> i64 {
        self.position_frames.load(Ordering::Acquire)
    }

    pub fn tempo(&self) -> f32 {
        self.tempo.get()
    }

    /// `(beats per bar, beat unit)`.
    pub fn meter(&self) -> (u32, u32) {
        (
            self.beats_per_bar.load(Ordering::Acquire),
            self.beat_unit.load(Ordering::Acquire),
        )
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate.get()
    }

    /// Rebuild a snapshot from the published values.
    pub fn snapshot(&self) -> TransportSnapshot {
        let (beats_per_bar, beat_unit) = self.meter();
        TransportSnapshot {
            playing: self.is_playing(),
            recording: self.is_recording(),
            position_frames: self.position_frames(),
            tempo: self.tempo(),
            beats_per_bar,
            beat_unit,
            sample_rate: self.sample_rate(),
        }
    }
}

/// Cloneable handle for requesting transport changes.
///
/// Requests are queued and applied at the start of the next block.
#[derive(Clone)]
pub struct TransportHandle {
    requests: Sender<TransportRequest>,
    monitor: Arc<TransportMonitor>,
}

impl TransportHandle {
    pub(crate) fn new(requests: Sender<TransportRequest>, monitor: Arc<TransportMonitor>) -> Self {
        Self { requests, monitor }
    }

    fn send(&self, request: TransportRequest) {
        match self.requests.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(request)) => {
                tracing::warn!(?request, "transport request queue full, dropping request");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    pub fn request_play_state(&self, playing: bool) {
        self.send(TransportRequest::PlayState(playing));
    }

    /// Toggle between playing and stopped.
    pub fn request_play_pause(&self) {
        self.send(TransportRequest::TogglePlayPause);
    }

    pub fn request_record_state(&self, recording: bool) {
        self.send(TransportRequest::RecordState(recording));
    }

    pub fn request_tempo(&self, bpm: f32) -> Result<()> {
        validate_tempo(bpm)?;
        self.send(TransportRequest::Tempo(bpm));
        Ok(())
    }

    pub fn request_meter(&self, beats_per_bar: u32, beat_unit: u32) -> Result<()> {
        validate_meter(beats_per_bar, beat_unit)?;
        self.send(TransportRequest::Meter {
            beats_per_bar,
            beat_unit,
        });
        Ok(())
    }

    /// Relocate; negative frames clamp to 0.
    pub fn request_audio_frame(&self, frame: i64) {
        self.send(TransportRequest::AudioFrame(frame));
    }

    pub fn monitor(&self) -> &Arc<TransportMonitor> {
        &self.monitor
    }

    pub fn is_playing(&self) -> bool {
        self.monitor.is_playing()
    }

    pub fn is_recording(&self) -> bool {
        self.monitor.is_recording()
    }

    pub fn position_frames(&self) -> i64 {
        self.monitor.position_frames()
    }

    pub fn tempo(&self) -> f32 {
        self.monitor.tempo()
    }
}
