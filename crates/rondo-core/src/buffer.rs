//! Multichannel audio scratch buffer.

/// Channel-major audio buffer with a fixed allocation.
///
/// Storage is allocated by [`AudioBuffer::allocate`] (control thread) and
/// only re-viewed by [`AudioBuffer::set_size`] (audio thread), which never
/// allocates.
#[derive(Debug, Clone, Default)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channel_capacity: usize,
    sample_capacity: usize,
    num_channels: usize,
    num_samples: usize,
}

impl AudioBuffer {
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        let mut buffer = Self::default();
        buffer.allocate(num_channels, num_samples);
        buffer
    }

    /// (Re)allocate storage and set the active size. Not realtime safe.
    pub fn allocate(&mut self, num_channels: usize, num_samples: usize) {
        self.data.clear();
        self.data.resize(num_channels * num_samples, 0.0);
        self.channel_capacity = num_channels;
        self.sample_capacity = num_samples;
        self.num_channels = num_channels;
        self.num_samples = num_samples;
    }

    /// Drop storage.
    pub fn release(&mut self) {
        self.data = Vec::new();
        self.channel_capacity = 0;
        self.sample_capacity = 0;
        self.num_channels = 0;
        self.num_samples = 0;
    }

    /// Change the active size within the allocated capacity.
    ///
    /// Requests past capacity are clamped (and flagged in debug builds).
    #[inline]
    pub fn set_size(&mut self, num_channels: usize, num_samples: usize) {
        debug_assert!(
            self.fits(num_channels, num_samples),
            "audio buffer {}x{} exceeds capacity {}x{}",
            num_channels,
            num_samples,
            self.channel_capacity,
            self.sample_capacity
        );
        self.num_channels = num_channels.min(self.channel_capacity);
        self.num_samples = num_samples.min(self.sample_capacity);
    }

    #[inline]
    pub fn fits(&self, num_channels: usize, num_samples: usize) -> bool {
        num_channels <= self.channel_capacity && num_samples <= self.sample_capacity
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    #[inline]
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    #[inline]
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    #[inline]
    pub fn sample_capacity(&self) -> usize {
        self.sample_capacity
    }

    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * self.sample_capacity;
        &self.data[start..start + self.num_samples]
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let start = channel * self.sample_capacity;
        &mut self.data[start..start + self.num_samples]
    }

    /// Zero the active region.
    #[inline]
    pub fn clear(&mut self) {
        for channel in 0..self.num_channels {
            self.clear_channel(channel);
        }
    }

    #[inline]
    pub fn clear_channel(&mut self, channel: usize) {
        self.channel_mut(channel).fill(0.0);
    }

    /// Copy `source` into the start of a channel.
    #[inline]
    pub fn copy_from_slice(&mut self, channel: usize, source: &[f32]) {
        let dest = self.channel_mut(channel);
        let len = dest.len().min(source.len());
        dest[..len].copy_from_slice(&source[..len]);
    }

    /// Copy the overlapping region of another buffer.
    #[inline]
    pub fn copy_from(&mut self, other: &AudioBuffer) {
        let channels = self.num_channels.min(other.num_channels);
        for channel in 0..channels {
            self.copy_from_slice(channel, other.channel(channel));
        }
    }

    /// Mix `source` into a channel at unity gain.
    #[inline]
    pub fn add_from(&mut self, channel: usize, source: &[f32]) {
        for (dest, sample) in self.channel_mut(channel).iter_mut().zip(source) {
            *dest += *sample;
        }
    }

    /// Mix `source` into a channel with a linear gain ramp.
    ///
    /// Gain at sample `i` is `start + (end - start) * i / n`, so the ramp
    /// approaches `end` without reaching it inside the block.
    #[inline]
    pub fn add_from_with_ramp(&mut self, channel: usize, source: &[f32], start: f32, end: f32) {
        let dest = self.channel_mut(channel);
        let n = dest.len().min(source.len());
        if n == 0 {
            return;
        }
        let step = (end - start) / n as f32;
        let mut gain = start;
        for (dest, sample) in dest[..n].iter_mut().zip(&source[..n]) {
            *dest += *sample * gain;
            gain += step;
        }
    }

    /// Mix every channel of `other` into this buffer.
    #[inline]
    pub fn add_buffer(&mut self, other: &AudioBuffer) {
        let channels = self.num_channels.min(other.num_channels);
        for channel in 0..channels {
            self.add_from(channel, other.channel(channel));
        }
    }

    /// Mix every channel of `other` into this buffer with a gain ramp.
    #[inline]
    pub fn add_buffer_with_ramp(&mut self, other: &AudioBuffer, start: f32, end: f32) {
        let channels = self.num_channels.min(other.num_channels);
        for channel in 0..channels {
            self.add_from_with_ramp(channel, other.channel(channel), start, end);
        }
    }
}
