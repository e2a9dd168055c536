// src/config.rs
//
// Every tunable of the cutter in one place.

use std::ops::RangeInclusive;

use crate::error::{ConfigError, ConfigResult};
use crate::strategy::{StrategyKind, ACCEL_MIN};

/// Subdivisions offered to users. Any positive value is accepted.
pub const SUBDIV_OPTIONS: [i64; 7] = [6, 8, 12, 16, 18, 24, 32];

/// Host tempos the scheduler accepts, in bpm.
pub const TEMPO_RANGE: RangeInclusive<f64> = 1.0..=1000.0;

/// Host sample rates the scheduler accepts, in Hz.
pub const SAMPLE_RATE_RANGE: RangeInclusive<f64> = 1_000.0..=768_000.0;

/// Accepted time signature numerators and denominators.
pub const SIGNATURE_RANGE: RangeInclusive<f64> = 1.0..=64.0;

/// Stutter area, in bars before the phrase end.
pub const STUTTER_AREA_RANGE: RangeInclusive<f32> = 0.0..=1.0;

/// Full cutter configuration.
///
/// Applied in one go through `PhraseScheduler::apply_config`, which
/// validates before touching any state.
#[derive(Debug, Clone, PartialEq)]
pub struct CutterConfig {
    pub strategy: StrategyKind,

    /// Units per bar.
    pub subdiv: i64,

    /// Fade at each cut edge, in milliseconds.
    pub fade_ms: f32,

    pub min_amp: f32,
    pub max_amp: f32,
    pub min_pan: f32,
    pub max_pan: f32,
    pub min_detune: f32,
    pub max_detune: f32,
    pub duty_cycle: f32,
    pub fill_duty_cycle: f32,

    /// Bars.
    pub min_phrase_length: i64,
    pub max_phrase_length: i64,

    // RegularRepeat
    pub min_repeats: i64,
    pub max_repeats: i64,
    pub stutter_chance: f32,
    pub stutter_area: f32,

    // TempoWarp
    pub straight_chance: f32,
    pub regular_chance: f32,
    pub ritard_chance: f32,
    pub accel: f32,

    // FillSequencer
    pub activity: f32,

    pub seed: u64,
}

impl Default for CutterConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::RegularRepeat,
            subdiv: 8,
            fade_ms: 0.01,
            min_amp: 1.0,
            max_amp: 1.0,
            min_pan: -0.2,
            max_pan: 0.2,
            min_detune: 0.0,
            max_detune: 0.0,
            duty_cycle: 1.0,
            fill_duty_cycle: 1.0,
            min_phrase_length: 1,
            max_phrase_length: 4,
            min_repeats: 0,
            max_repeats: 1,
            stutter_chance: 0.8,
            stutter_area: 0.5,
            straight_chance: 0.3,
            regular_chance: 0.5,
            ritard_chance: 0.5,
            accel: 0.9,
            activity: 0.5,
            seed: 1,
        }
    }
}

impl CutterConfig {
    /// Check every range. The first problem found is returned.
    pub fn validate(&self) -> ConfigResult<()> {
        let floats = [
            ("fade_ms", self.fade_ms),
            ("min_amp", self.min_amp),
            ("max_amp", self.max_amp),
            ("min_pan", self.min_pan),
            ("max_pan", self.max_pan),
            ("min_detune", self.min_detune),
            ("max_detune", self.max_detune),
            ("duty_cycle", self.duty_cycle),
            ("fill_duty_cycle", self.fill_duty_cycle),
            ("stutter_chance", self.stutter_chance),
            ("stutter_area", self.stutter_area),
            ("straight_chance", self.straight_chance),
            ("regular_chance", self.regular_chance),
            ("ritard_chance", self.ritard_chance),
            ("accel", self.accel),
            ("activity", self.activity),
        ];
        if let Some(&(name, _)) = floats.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::NonFinite(name));
        }

        if self.subdiv <= 0 {
            return Err(ConfigError::InvalidSubdivision(self.subdiv));
        }

        if self.min_phrase_length < 1 || self.max_phrase_length < self.min_phrase_length {
            return Err(ConfigError::InvalidPhraseRange {
                min: self.min_phrase_length,
                max: self.max_phrase_length,
            });
        }

        if self.min_repeats < 0 || self.max_repeats < self.min_repeats {
            return Err(ConfigError::InvalidRepeatRange {
                min: self.min_repeats,
                max: self.max_repeats,
            });
        }

        if self.fade_ms < 0.0 {
            return Err(ConfigError::InvalidFade(self.fade_ms));
        }

        if !STUTTER_AREA_RANGE.contains(&self.stutter_area) {
            return Err(ConfigError::InvalidStutterArea(self.stutter_area));
        }

        if !(ACCEL_MIN..1.0).contains(&self.accel) {
            return Err(ConfigError::InvalidAccel(self.accel));
        }

        Ok(())
    }
}
