//! DTMF (dual-tone multi-frequency) keypad tone detection.
//!
//! A bank of Goertzel resonators resolves which key, if any, sounds in each
//! fixed-size block of a multi-channel sample stream, and a streaming
//! [`Analyzer`] turns the per-block decisions into timestamped start/stop
//! [`DtmfChange`] events, one state machine per channel.
//!
//! ```
//! use keytone_dtmf::{analyze_samples, Config, PhoneKey};
//!
//! // 0.1 s of key "5" at 8 kHz: 770 Hz + 1336 Hz.
//! let samples: Vec<f32> = (0..800)
//!     .map(|n| {
//!         let t = n as f32 / 8_000.0;
//!         0.25 * (std::f32::consts::TAU * 770.0 * t).sin()
//!             + 0.25 * (std::f32::consts::TAU * 1336.0 * t).sin()
//!     })
//!     .collect();
//!
//! let changes = analyze_samples(&samples, 1, Config::default());
//! assert_eq!(changes.len(), 2);
//! assert!(changes[0].is_start && changes[0].key == PhoneKey::Five);
//! ```

pub mod analyze;
pub mod config;
pub mod detect;
pub mod key;
pub mod source;

pub use analyze::{analyze_samples, Analyzer, DtmfChange, DtmfTone};
pub use config::{Config, ConfigError};
pub use detect::goertzel::Goertzel;
pub use detect::Detector;
pub use key::PhoneKey;
pub use source::{SampleSource, SliceSource};
