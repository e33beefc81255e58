use std::f32::consts::TAU;

/// Second-order recursive accumulator for a single frequency bin.
///
/// A plain value: [`add`](Goertzel::add) returns the advanced state and
/// leaves the old one usable, so a detector can keep one tuned initial state
/// per frequency and stamp out fresh copies for every block it inspects.
#[derive(Clone, Copy, Debug)]
pub struct Goertzel {
    coeff: f32,
    norm: f32,
    s1: f32,
    s2: f32,
}

impl Goertzel {
    /// Tune a zeroed resonator to the DFT bin nearest `frequency_hz` for the
    /// given sample rate and block size.
    pub fn new(frequency_hz: f32, sample_rate: u32, block_size: usize) -> Self {
        let bin = (block_size as f32 * frequency_hz / sample_rate as f32).round();
        let omega = TAU * bin / block_size as f32;

        Self {
            coeff: 2.0 * omega.cos(),
            norm: block_size as f32 * block_size as f32,
            s1: 0.0,
            s2: 0.0,
        }
    }

    /// Advance the filter by one sample.
    ///
    /// Samples must arrive in stream order; skipping or reordering changes
    /// the result.
    #[inline]
    pub fn add(self, sample: f32) -> Self {
        let s0 = self.coeff * self.s1 - self.s2 + sample;
        Self {
            s1: s0,
            s2: self.s1,
            ..self
        }
    }

    /// Squared magnitude of the tuned frequency bin.
    pub fn response(&self) -> f32 {
        self.s1 * self.s1 + self.s2 * self.s2 - self.coeff * self.s1 * self.s2
    }

    /// [`response`](Goertzel::response) divided by the squared block size.
    ///
    /// A full block of a pure tone with amplitude A reads roughly (A/2)^2
    /// here regardless of block size, so thresholds on this metric carry
    /// over between block sizes.
    pub fn norm_response(&self) -> f32 {
        self.response() / self.norm
    }
}
