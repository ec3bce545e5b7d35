//! Lock-free peak level meter.

use std::sync::Arc;

use crate::AtomicFloat;

/// Per-sample decay applied while the signal is below the held level.
const DECAY_FACTOR: f32 = 0.99992;

/// Levels below this snap to zero.
const FLOOR: f32 = 0.001;

/// Peak-hold meter with exponential release.
///
/// The engine keeps one reference; the meter only does work while someone
/// else (a UI) holds a clone. With no observer the level reads zero.
#[derive(Debug, Default)]
pub struct LevelMeter {
    level: AtomicFloat,
}

impl LevelMeter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[inline]
    pub fn level(&self) -> f32 {
        self.level.get()
    }

    /// Feed one block of a single channel (audio thread).
    #[inline]
    pub fn update_level(self: &Arc<Self>, samples: &[f32]) {
        if Arc::strong_count(self) <= 1 {
            self.level.set(0.0);
            return;
        }

        let mut level = self.level.get();
        for sample in samples {
            let s = sample.abs();
            if s > level {
                level = s;
            } else if level > FLOOR {
                level *= DECAY_FACTOR;
            } else {
                level = 0.0;
            }
        }
        self.level.set(level);
    }
}
