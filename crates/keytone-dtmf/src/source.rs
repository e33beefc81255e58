/// Anything that can supply successive blocks of interleaved samples.
///
/// Samples are channel-minor: within one frame, channel 0 comes first.
pub trait SampleSource {
    /// Number of interleaved channels per frame.
    fn channels(&self) -> usize;

    /// Sampling rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Write up to `block.len()` samples from the front of the stream into
    /// `block` and return how many were written. Writing fewer than
    /// `block.len()` samples, including zero, signals exhaustion.
    fn fill_block(&mut self, block: &mut [f32]) -> usize;
}

/// In-memory sample source over interleaved samples, for batch analysis.
pub struct SliceSource {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
    position: usize,
}

impl SliceSource {
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            position: 0,
        }
    }
}

impl SampleSource for SliceSource {
    fn channels(&self) -> usize {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn fill_block(&mut self, block: &mut [f32]) -> usize {
        let remaining = self.samples.len() - self.position;
        let count = remaining.min(block.len());
        block[..count].copy_from_slice(&self.samples[self.position..self.position + count]);
        self.position += count;
        count
    }
}
