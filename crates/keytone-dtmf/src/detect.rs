pub mod goertzel;

use crate::config::Config;
use crate::key::{PhoneKey, HIGH_TONES, KEYPAD, LOW_TONES};
use goertzel::Goertzel;

const BANK_SIZE: usize = 8;

/// Per-block DTMF detector over one or more interleaved channels.
///
/// The detector carries no state between calls: every [`detect`](Detector::detect)
/// seeds fresh resonator banks from the initial states computed at
/// construction, so two calls never influence each other.
pub struct Detector {
    channels: usize,
    config: Config,
    seeds: [Goertzel; BANK_SIZE],
}

impl Detector {
    /// Build a detector for `channels` interleaved channels.
    ///
    /// Resonator coefficients are derived from the config once, here.
    pub fn new(channels: usize, config: Config) -> Self {
        let seeds = std::array::from_fn(|i| {
            let frequency_hz = if i < 4 { LOW_TONES[i] } else { HIGH_TONES[i - 4] };
            Goertzel::new(frequency_hz, config.sample_rate(), config.block_size())
        });

        Self {
            channels,
            config,
            seeds,
        }
    }

    /// Number of interleaved channels this detector expects.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// The detection parameters this detector was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve which key, if any, sounds on each channel of `samples`.
    ///
    /// `samples` is channel-minor interleaved: `samples[i]` belongs to channel
    /// `i % channels`. A full block holds `block_size * channels` samples;
    /// the final block of a stream may be passed shorter, without padding.
    pub fn detect(&self, samples: &[f32]) -> Vec<Option<PhoneKey>> {
        if self.channels == 0 {
            return Vec::new();
        }

        let mut banks = vec![self.seeds; self.channels];
        for (i, &sample) in samples.iter().enumerate() {
            for resonator in banks[i % self.channels].iter_mut() {
                *resonator = resonator.add(sample);
            }
        }

        banks.iter().map(|bank| self.judge(bank)).collect()
    }

    fn judge(&self, bank: &[Goertzel; BANK_SIZE]) -> Option<PhoneKey> {
        let responses: [f32; BANK_SIZE] = std::array::from_fn(|i| {
            if self.config.normalize_response() {
                bank[i].norm_response()
            } else {
                bank[i].response()
            }
        });

        let (low, fst_low, snd_low) = top_two(&responses[..4]);
        let (high, fst_high, snd_high) = top_two(&responses[4..]);

        let threshold = self.config.threshold();
        if fst_low < threshold || fst_high < threshold {
            // One of the two tone groups is missing.
            return None;
        }
        if snd_low > threshold || snd_high > threshold {
            // Two tones of the same group compete; ambiguous.
            return None;
        }
        if fst_low.is_nan() || fst_high.is_nan() {
            return None;
        }

        Some(KEYPAD[low][high])
    }
}

/// Leader index, leader value, and runner-up value of a tone group.
///
/// A later index displaces the leader only on a strictly greater response, so
/// the lower tone index wins exact ties.
fn top_two(responses: &[f32]) -> (usize, f32, f32) {
    let mut leader = 0;
    let mut fst = responses[0];
    let mut snd = f32::NEG_INFINITY;

    for (i, &value) in responses.iter().enumerate().skip(1) {
        if value > fst {
            leader = i;
            snd = fst;
            fst = value;
        } else if value > snd {
            snd = value;
        }
    }

    (leader, fst, snd)
}
