//! Input/output meter collection.

use std::sync::Arc;

use super::LevelMeter;

/// Meters for every device channel.
///
/// Grown (never shrunk) on prepare, so handles given to a UI stay valid
/// across device restarts.
#[derive(Debug, Default)]
pub struct LevelMeterBank {
    inputs: Vec<Arc<LevelMeter>>,
    outputs: Vec<Arc<LevelMeter>>,
}

impl LevelMeterBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure there is a meter for every channel. Not realtime safe.
    pub fn grow(&mut self, num_inputs: usize, num_outputs: usize) {
        while self.inputs.len() < num_inputs {
            self.inputs.push(LevelMeter::new());
        }
        while self.outputs.len() < num_outputs {
            self.outputs.push(LevelMeter::new());
        }
    }

    pub fn meter(&self, channel: usize, input: bool) -> Option<Arc<LevelMeter>> {
        let meters = if input { &self.inputs } else { &self.outputs };
        meters.get(channel).cloned()
    }

    /// Feed device channels to the matching meters (audio thread).
    #[inline]
    pub fn update<C: AsRef<[f32]>>(&self, channels: &[C], num_samples: usize, input: bool) {
        let meters = if input { &self.inputs } else { &self.outputs };
        for (meter, channel) in meters.iter().zip(channels) {
            let channel = channel.as_ref();
            let len = num_samples.min(channel.len());
            meter.update_level(&channel[..len]);
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }
}
