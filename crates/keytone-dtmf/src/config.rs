use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Classic telephony sampling rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 8_000;

/// 205 samples at 8 kHz lines the DTMF tones up closely with DFT bins.
pub const DEFAULT_BLOCK_SIZE: usize = 205;

/// Default minimum raw resonator response for a tone to count as present.
pub const DEFAULT_THRESHOLD: f32 = 35.0;

/// Errors from building a [`Config`] or wiring a detector to a sample source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sample rate must be positive")]
    InvalidSampleRate,

    #[error("sample block size must be positive")]
    InvalidBlockSize,

    #[error("threshold must be positive and finite, got {0}")]
    InvalidThreshold(f32),

    #[error("sample rate mismatch: source delivers {source} Hz, detector expects {detector} Hz")]
    SampleRateMismatch { r#source: u32, detector: u32 },

    #[error("channel count mismatch: source delivers {source}, detector expects {detector}")]
    ChannelCountMismatch { r#source: usize, detector: usize },
}

/// Immutable detection parameters.
///
/// Deriving a variant (`with_*`) always produces a new validated value.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    sample_rate: u32,
    block_size: usize,
    threshold: f32,
    normalize_response: bool,
}

impl Config {
    /// Validate and build a config.
    ///
    /// With `normalize_response` set, the threshold is compared against the
    /// block-size-normalized resonator response, so thresholds stay
    /// comparable across block sizes; a useful starting point is around
    /// 1e-3 instead of the raw-response default of 35.
    pub fn new(
        sample_rate: u32,
        block_size: usize,
        threshold: f32,
        normalize_response: bool,
    ) -> Result<Self, ConfigError> {
        if sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        if block_size == 0 {
            return Err(ConfigError::InvalidBlockSize);
        }
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }

        Ok(Self {
            sample_rate,
            block_size,
            threshold,
            normalize_response,
        })
    }

    /// Sampling rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per channel per detection block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Minimum response magnitude for a tone to count as present.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Whether the normalized response metric is compared against the threshold.
    pub fn normalize_response(&self) -> bool {
        self.normalize_response
    }

    /// A copy of this config with a different sample rate.
    pub fn with_sample_rate(self, sample_rate: u32) -> Result<Self, ConfigError> {
        Self::new(
            sample_rate,
            self.block_size,
            self.threshold,
            self.normalize_response,
        )
    }

    /// A copy of this config with a different block size.
    pub fn with_block_size(self, block_size: usize) -> Result<Self, ConfigError> {
        Self::new(
            self.sample_rate,
            block_size,
            self.threshold,
            self.normalize_response,
        )
    }

    /// A copy of this config with a different threshold.
    pub fn with_threshold(self, threshold: f32) -> Result<Self, ConfigError> {
        Self::new(
            self.sample_rate,
            self.block_size,
            threshold,
            self.normalize_response,
        )
    }

    /// A copy of this config selecting the raw or normalized response metric.
    pub fn with_normalized_response(self, normalize_response: bool) -> Self {
        Self {
            normalize_response,
            ..self
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            threshold: DEFAULT_THRESHOLD,
            normalize_response: false,
        }
    }
}
