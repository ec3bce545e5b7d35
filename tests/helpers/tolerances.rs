//! Tolerance constants for audio testing.

/// Floating point rounding errors (passthrough, unity gain).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Crossfade ramps accumulate one rounding step per sample.
pub const RAMP_EPSILON: f32 = 1e-4;

/// Silence threshold (~-80dB).
pub const SILENCE_THRESHOLD: f32 = 0.0001;
