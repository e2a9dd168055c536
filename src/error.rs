// src/error.rs
//
// Configuration errors raised at the engine boundary.

use thiserror::Error;

/// A configuration value the engine refuses to run with.
///
/// These are only produced by setters and validation. Nothing on the
/// per-sample path returns an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("subdivision must be greater than zero (got {0})")]
    InvalidSubdivision(i64),

    #[error("tempo must lie in [1, 1000] bpm (got {0})")]
    InvalidTempo(f64),

    #[error("sample rate must lie in [1000, 768000] Hz (got {0})")]
    InvalidSampleRate(f64),

    #[error("invalid time signature {numerator}/{denominator}, both must lie in [1, 64]")]
    InvalidTimeSignature { numerator: f64, denominator: f64 },

    #[error("invalid phrase length range {min}..={max} bars")]
    InvalidPhraseRange { min: i64, max: i64 },

    #[error("invalid repeat range {min}..={max}")]
    InvalidRepeatRange { min: i64, max: i64 },

    #[error("fade must be non-negative (got {0} ms)")]
    InvalidFade(f32),

    #[error("stutter area must lie in [0, 1] bars (got {0})")]
    InvalidStutterArea(f32),

    #[error("accel must lie in [0.5, 1) (got {0})")]
    InvalidAccel(f32),

    #[error("parameter `{0}` is not a finite number")]
    NonFinite(&'static str),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
