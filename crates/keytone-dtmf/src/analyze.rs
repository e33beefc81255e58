use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError};
use crate::detect::Detector;
use crate::key::PhoneKey;
use crate::source::SampleSource;

/// A key starting or stopping on one channel of the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DtmfChange {
    pub key: PhoneKey,
    /// Offset from the start of the stream.
    pub position: Duration,
    pub channel: usize,
    pub is_start: bool,
}

impl DtmfChange {
    fn start(key: PhoneKey, position: Duration, channel: usize) -> Self {
        Self {
            key,
            position,
            channel,
            is_start: true,
        }
    }

    fn stop(key: PhoneKey, position: Duration, channel: usize) -> Self {
        Self {
            key,
            position,
            channel,
            is_start: false,
        }
    }

    pub fn is_stop(&self) -> bool {
        !self.is_start
    }
}

impl fmt::Display for DtmfChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "key {} {} at {:.3}s on channel {}",
            self.key,
            if self.is_start { "started" } else { "stopped" },
            self.position.as_secs_f64(),
            self.channel,
        )
    }
}

/// A complete key press: a paired start and stop on one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DtmfTone {
    pub key: PhoneKey,
    pub channel: usize,
    /// Offset of the start from the beginning of the stream.
    pub position: Duration,
    pub duration: Duration,
}

impl DtmfTone {
    /// Pair start events with their matching stops, in chronological order.
    ///
    /// A start without a matching stop (or vice versa) is dropped; analyzer
    /// output never contains those, since tones still sounding at the end of
    /// the stream are force-stopped.
    pub fn from_changes(changes: &[DtmfChange]) -> Vec<DtmfTone> {
        let mut open: HashMap<usize, DtmfChange> = HashMap::new();
        let mut tones = Vec::new();

        for &change in changes {
            if change.is_start {
                open.insert(change.channel, change);
            } else if let Some(start) = open.remove(&change.channel) {
                if start.key == change.key {
                    tones.push(DtmfTone {
                        key: start.key,
                        channel: start.channel,
                        position: start.position,
                        duration: change.position.saturating_sub(start.position),
                    });
                }
            }
        }

        tones.sort_by_key(|tone| (tone.position, tone.channel));
        tones
    }
}

impl fmt::Display for DtmfTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "key {} at {:.3}s for {:.3}s on channel {}",
            self.key,
            self.position.as_secs_f64(),
            self.duration.as_secs_f64(),
            self.channel,
        )
    }
}

/// Streams blocks from a sample source through a [`Detector`] and reports
/// per-channel key transitions with stream-relative timestamps.
///
/// Transitions are stamped at the starting sample position of the block that
/// revealed them; forced end-of-stream stops are stamped at the end of the
/// processed samples. Block length is the time resolution.
pub struct Analyzer<S> {
    source: S,
    detector: Detector,
    last_keys: Vec<Option<PhoneKey>>,
    frames_consumed: u64,
    more_samples: bool,
    block: Vec<f32>,
}

impl<S: SampleSource> Analyzer<S> {
    /// Build an analyzer with a detector sized for the source's channels.
    ///
    /// The config must agree with the source on the sample rate.
    pub fn new(source: S, config: Config) -> Result<Self, ConfigError> {
        if source.sample_rate() != config.sample_rate() {
            return Err(ConfigError::SampleRateMismatch {
                source: source.sample_rate(),
                detector: config.sample_rate(),
            });
        }

        let detector = Detector::new(source.channels(), config);
        Ok(Self::assemble(source, detector))
    }

    /// Build an analyzer around an existing detector.
    ///
    /// The detector must agree with the source on sample rate and channel
    /// count; disagreement is rejected here, never deferred to processing.
    pub fn with_detector(source: S, detector: Detector) -> Result<Self, ConfigError> {
        if source.sample_rate() != detector.config().sample_rate() {
            return Err(ConfigError::SampleRateMismatch {
                source: source.sample_rate(),
                detector: detector.config().sample_rate(),
            });
        }
        if source.channels() != detector.channels() {
            return Err(ConfigError::ChannelCountMismatch {
                source: source.channels(),
                detector: detector.channels(),
            });
        }

        Ok(Self::assemble(source, detector))
    }

    fn assemble(source: S, detector: Detector) -> Self {
        debug!(
            channels = detector.channels(),
            sample_rate = detector.config().sample_rate(),
            block_size = detector.config().block_size(),
            "analyzer ready"
        );

        Self {
            last_keys: vec![None; detector.channels()],
            frames_consumed: 0,
            more_samples: true,
            block: Vec::new(),
            source,
            detector,
        }
    }

    /// Whether another [`analyze_next_block`](Analyzer::analyze_next_block)
    /// call can still make progress.
    pub fn more_samples_available(&self) -> bool {
        self.more_samples
    }

    /// Pull one block from the source and report the transitions in it.
    ///
    /// Within one batch, events are ordered channel-major with a channel's
    /// stop before its start. Once the source is exhausted every still-active
    /// key is force-stopped, and later calls return an empty batch.
    pub fn analyze_next_block(&mut self) -> Vec<DtmfChange> {
        let mut changes = Vec::new();
        if !self.more_samples {
            return changes;
        }

        let channels = self.detector.channels();
        let wanted = self.detector.config().block_size() * channels;
        self.block.resize(wanted, 0.0);
        let got = self.source.fill_block(&mut self.block).min(wanted);

        let keys = self.detector.detect(&self.block[..got]);
        let block_start = self.position();
        for (channel, (&current, last)) in
            keys.iter().zip(self.last_keys.iter_mut()).enumerate()
        {
            if current == *last {
                continue;
            }
            if let Some(key) = *last {
                changes.push(DtmfChange::stop(key, block_start, channel));
            }
            if let Some(key) = current {
                changes.push(DtmfChange::start(key, block_start, channel));
            }
            *last = current;
        }

        if channels > 0 {
            self.frames_consumed += (got / channels) as u64;
        }

        if got < wanted || wanted == 0 {
            self.more_samples = false;
            let stream_end = self.position();
            for (channel, last) in self.last_keys.iter_mut().enumerate() {
                if let Some(key) = last.take() {
                    changes.push(DtmfChange::stop(key, stream_end, channel));
                }
            }
            debug!(frames = self.frames_consumed, "source exhausted");
        }

        for change in &changes {
            trace!(%change, "transition");
        }
        changes
    }

    /// Drain the source and return every transition in stream order.
    pub fn analyze_all(&mut self) -> Vec<DtmfChange> {
        let mut changes = Vec::new();
        while self.more_samples {
            changes.append(&mut self.analyze_next_block());
        }
        changes
    }

    fn position(&self) -> Duration {
        let sample_rate = f64::from(self.detector.config().sample_rate());
        Duration::from_secs_f64(self.frames_consumed as f64 / sample_rate)
    }
}

/// Detect every transition in an in-memory run of interleaved samples.
pub fn analyze_samples(samples: &[f32], channels: usize, config: Config) -> Vec<DtmfChange> {
    let source = crate::source::SliceSource::new(samples.to_vec(), channels, config.sample_rate());
    let mut analyzer = Analyzer::assemble(source, Detector::new(channels, config));
    analyzer.analyze_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{HIGH_TONES, LOW_TONES};
    use crate::source::SliceSource;
    use std::f32::consts::TAU;

    const RATE: u32 = 8_000;
    const BLOCK: usize = 205;

    fn key_frames(row: usize, col: usize, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|n| {
                let t = n as f32 / RATE as f32;
                0.25 * (TAU * LOW_TONES[row] * t).sin()
                    + 0.25 * (TAU * HIGH_TONES[col] * t).sin()
            })
            .collect()
    }

    fn silence(frames: usize) -> Vec<f32> {
        vec![0.0; frames]
    }

    fn interleave(channels: &[Vec<f32>]) -> Vec<f32> {
        let frames = channels[0].len();
        let mut out = Vec::with_capacity(frames * channels.len());
        for frame in 0..frames {
            for channel in channels {
                out.push(channel[frame]);
            }
        }
        out
    }

    fn at(frames: u64) -> Duration {
        Duration::from_secs_f64(frames as f64 / f64::from(RATE))
    }

    fn analyzer_over(samples: Vec<f32>, channels: usize) -> Analyzer<SliceSource> {
        let source = SliceSource::new(samples, channels, RATE);
        Analyzer::new(source, Config::default()).unwrap()
    }

    #[test]
    fn sustained_tone_yields_one_start_and_one_stop() {
        let mut samples = key_frames(1, 1, 3 * BLOCK);
        samples.extend(silence(2 * BLOCK));

        let changes = analyzer_over(samples, 1).analyze_all();

        assert_eq!(
            changes,
            vec![
                DtmfChange::start(PhoneKey::Five, at(0), 0),
                DtmfChange::stop(PhoneKey::Five, at(3 * BLOCK as u64), 0),
            ]
        );
    }

    #[test]
    fn truncated_tone_is_stopped_at_stream_end() {
        // A tone cut off mid-block by the end of the stream.
        let samples = key_frames(0, 1, BLOCK + BLOCK / 2);

        let changes = analyzer_over(samples, 1).analyze_all();

        assert_eq!(
            changes,
            vec![
                DtmfChange::start(PhoneKey::Two, at(0), 0),
                DtmfChange::stop(PhoneKey::Two, at(BLOCK as u64 + (BLOCK / 2) as u64), 0),
            ]
        );
    }

    #[test]
    fn gapped_sequence_yields_alternating_pairs() {
        let mut samples = key_frames(0, 0, BLOCK);
        samples.extend(silence(BLOCK));
        samples.extend(key_frames(0, 1, BLOCK));

        let changes = analyzer_over(samples, 1).analyze_all();

        assert_eq!(
            changes,
            vec![
                DtmfChange::start(PhoneKey::One, at(0), 0),
                DtmfChange::stop(PhoneKey::One, at(BLOCK as u64), 0),
                DtmfChange::start(PhoneKey::Two, at(2 * BLOCK as u64), 0),
                DtmfChange::stop(PhoneKey::Two, at(3 * BLOCK as u64), 0),
            ]
        );
    }

    #[test]
    fn adjacent_tones_stop_before_starting() {
        let mut samples = key_frames(0, 0, BLOCK);
        samples.extend(key_frames(0, 1, BLOCK));

        let changes = analyzer_over(samples, 1).analyze_all();

        assert_eq!(
            changes,
            vec![
                DtmfChange::start(PhoneKey::One, at(0), 0),
                DtmfChange::stop(PhoneKey::One, at(BLOCK as u64), 0),
                DtmfChange::start(PhoneKey::Two, at(BLOCK as u64), 0),
                DtmfChange::stop(PhoneKey::Two, at(2 * BLOCK as u64), 0),
            ]
        );
    }

    #[test]
    fn overlapping_channels_stay_independent() {
        // Channel 0 sounds "1" in blocks 0-1, channel 1 sounds "D" in blocks 1-2.
        let left = [key_frames(0, 0, 2 * BLOCK), silence(BLOCK)].concat();
        let right = [silence(BLOCK), key_frames(3, 3, 2 * BLOCK)].concat();
        let samples = interleave(&[left, right]);

        let changes = analyzer_over(samples, 2).analyze_all();

        assert_eq!(
            changes,
            vec![
                DtmfChange::start(PhoneKey::One, at(0), 0),
                DtmfChange::start(PhoneKey::D, at(BLOCK as u64), 1),
                DtmfChange::stop(PhoneKey::One, at(2 * BLOCK as u64), 0),
                DtmfChange::stop(PhoneKey::D, at(3 * BLOCK as u64), 1),
            ]
        );
    }

    #[test]
    fn exhaustion_latches_exactly_once() {
        let mut analyzer = analyzer_over(key_frames(2, 2, BLOCK), 1);
        assert!(analyzer.more_samples_available());

        let first = analyzer.analyze_next_block();
        assert_eq!(first.len(), 1);
        assert!(analyzer.more_samples_available());

        // The source is an exact block multiple, so the next pull comes up
        // empty and flushes the active key at the stream-end position.
        let second = analyzer.analyze_next_block();
        assert_eq!(
            second,
            vec![DtmfChange::stop(PhoneKey::Nine, at(BLOCK as u64), 0)]
        );
        assert!(!analyzer.more_samples_available());

        assert!(analyzer.analyze_next_block().is_empty());
        assert!(!analyzer.more_samples_available());
    }

    #[test]
    fn empty_source_yields_nothing() {
        let mut analyzer = analyzer_over(Vec::new(), 1);
        assert!(analyzer.more_samples_available());
        assert!(analyzer.analyze_next_block().is_empty());
        assert!(!analyzer.more_samples_available());
    }

    #[test]
    fn construction_rejects_sample_rate_mismatch() {
        let source = SliceSource::new(Vec::new(), 1, 44_100);
        let result = Analyzer::new(source, Config::default());
        assert_eq!(
            result.err(),
            Some(ConfigError::SampleRateMismatch {
                source: 44_100,
                detector: 8_000,
            })
        );

        let source = SliceSource::new(Vec::new(), 1, 44_100);
        let detector = Detector::new(1, Config::default());
        assert!(Analyzer::with_detector(source, detector).is_err());
    }

    #[test]
    fn construction_rejects_channel_mismatch() {
        let source = SliceSource::new(Vec::new(), 2, RATE);
        let detector = Detector::new(1, Config::default());
        let result = Analyzer::with_detector(source, detector);
        assert_eq!(
            result.err(),
            Some(ConfigError::ChannelCountMismatch {
                source: 2,
                detector: 1,
            })
        );
    }

    #[test]
    fn changes_merge_into_tones() {
        let mut samples = key_frames(0, 0, BLOCK);
        samples.extend(silence(BLOCK));
        samples.extend(key_frames(0, 1, 2 * BLOCK));

        let changes = analyzer_over(samples, 1).analyze_all();
        let tones = DtmfTone::from_changes(&changes);

        assert_eq!(
            tones,
            vec![
                DtmfTone {
                    key: PhoneKey::One,
                    channel: 0,
                    position: at(0),
                    duration: at(BLOCK as u64),
                },
                DtmfTone {
                    key: PhoneKey::Two,
                    channel: 0,
                    position: at(2 * BLOCK as u64),
                    duration: at(2 * BLOCK as u64),
                },
            ]
        );
    }

    #[test]
    fn analyze_samples_covers_the_whole_run() {
        let samples = key_frames(3, 2, 2 * BLOCK);
        let changes = analyze_samples(&samples, 1, Config::default());

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].key, PhoneKey::Hash);
        assert!(changes[0].is_start);
        assert!(changes[1].is_stop());
    }
}
