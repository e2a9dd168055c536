// src/strategy/mod.rs
//
// Cut strategies.
//
// A strategy is asked twice per musical cycle:
// - once per phrase, for the phrase length in bars
// - once per block, for the cuts covering the next few units
//
// Strategies:
// - do NOT know about audio
// - do NOT allocate beyond refilling the plan they are given
// - draw every random decision from their own injected source

mod fill_sequencer;
mod regular_repeat;
mod tempo_warp;

pub use fill_sequencer::{FillSequencerStrategy, FILL_PATTERNS};
pub use regular_repeat::RegularRepeatStrategy;
pub use tempo_warp::{TempoWarpStrategy, ACCEL_MAX, ACCEL_MIN};

use crate::cut::CutPlan;
use crate::random::RandomSource;

// ═══════════════════════════════════════════════════════════════════
// Strategy selection
// ═══════════════════════════════════════════════════════════════════

/// The three interchangeable cutting strategies, in selector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// Odd-length repeats with end-of-phrase stutters.
    #[default]
    RegularRepeat,
    /// Tempo-synced repeats with acceleration or ritardando.
    TempoWarp,
    /// Semiquaver pusher with hand-authored fills.
    FillSequencer,
}

impl StrategyKind {
    pub const COUNT: usize = 3;

    pub const ALL: [StrategyKind; Self::COUNT] = [
        StrategyKind::RegularRepeat,
        StrategyKind::TempoWarp,
        StrategyKind::FillSequencer,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::RegularRepeat => "RegularRepeat",
            StrategyKind::TempoWarp => "TempoWarp",
            StrategyKind::FillSequencer => "FillSequencer",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Shared parameters
// ═══════════════════════════════════════════════════════════════════

/// Ranges every strategy draws from.
///
/// Read once at the start of each `choose_cuts` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutParams {
    pub min_amp: f32,
    pub max_amp: f32,
    pub min_pan: f32,
    pub max_pan: f32,
    /// Cents.
    pub min_detune: f32,
    /// Cents.
    pub max_detune: f32,
    /// Audible fraction of regular cuts.
    pub duty_cycle: f32,
    /// Audible fraction of repeated, stuttered and fill cuts.
    pub fill_duty_cycle: f32,
    /// Bars.
    pub min_phrase_length: i64,
    /// Bars.
    pub max_phrase_length: i64,
}

impl Default for CutParams {
    fn default() -> Self {
        Self {
            min_amp: 1.0,
            max_amp: 1.0,
            min_pan: 0.0,
            max_pan: 0.0,
            min_detune: 0.0,
            max_detune: 0.0,
            duty_cycle: 1.0,
            fill_duty_cycle: 1.0,
            min_phrase_length: 1,
            max_phrase_length: 4,
        }
    }
}

impl CutParams {
    #[inline]
    pub(crate) fn amp(&self, rng: &mut dyn RandomSource) -> f32 {
        rng.uniform(self.min_amp as f64, self.max_amp as f64) as f32
    }

    #[inline]
    pub(crate) fn pan(&self, rng: &mut dyn RandomSource) -> f32 {
        rng.uniform(self.min_pan as f64, self.max_pan as f64) as f32
    }

    #[inline]
    pub(crate) fn detune(&self, rng: &mut dyn RandomSource) -> f32 {
        rng.uniform(self.min_detune as f64, self.max_detune as f64) as f32
    }
}

/// Start and end values for cuts whose pan, amp and detune glide across
/// a block.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Glide {
    start_pan: f32,
    end_pan: f32,
    start_amp: f32,
    end_amp: f32,
    end_detune: f32,
}

impl Glide {
    /// Draw order: start pan, end pan, start amp, end amp, end detune.
    /// Detune always starts at zero.
    pub(crate) fn draw(params: &CutParams, rng: &mut dyn RandomSource) -> Self {
        Self {
            start_pan: params.pan(rng),
            end_pan: params.pan(rng),
            start_amp: params.amp(rng),
            end_amp: params.amp(rng),
            end_detune: params.detune(rng),
        }
    }

    /// `(pan, amp, cents)` at `phase` in `[0, 1)`.
    #[inline]
    pub(crate) fn at(&self, phase: f32) -> (f32, f32, f32) {
        (
            self.start_pan + (self.end_pan - self.start_pan) * phase,
            self.start_amp + (self.end_amp - self.start_amp) * phase,
            self.end_detune * phase,
        )
    }
}

// ═══════════════════════════════════════════════════════════════════
// Block request
// ═══════════════════════════════════════════════════════════════════

/// Scheduler state handed to a strategy at a block boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockRequest {
    /// Units elapsed in the current phrase.
    pub units_done: i64,
    /// Phrase length in units.
    pub total_units: i64,
    /// Units per bar. Always > 0.
    pub subdiv: i64,
    /// Samples per unit at the current tempo.
    pub samples_per_unit: f64,
}

impl BlockRequest {
    /// Units remaining in the phrase, never less than one.
    #[inline]
    pub fn units_left(&self) -> i64 {
        (self.total_units - self.units_done).max(1)
    }

    /// Samples per beat (quarter of a bar of `subdiv` units).
    #[inline]
    pub fn samples_per_beat(&self) -> f64 {
        self.samples_per_unit * self.subdiv as f64 / 4.0
    }
}

// ═══════════════════════════════════════════════════════════════════
// Strategy trait
// ═══════════════════════════════════════════════════════════════════

/// A cut-selection strategy.
pub trait CutStrategy: Send {
    fn kind(&self) -> StrategyKind;

    fn params(&self) -> &CutParams;

    fn params_mut(&mut self) -> &mut CutParams;

    /// The injected random source.
    fn random(&mut self) -> &mut dyn RandomSource;

    /// Bars in the next phrase, uniform in `[min_phrase_length, max_phrase_length]`.
    fn choose_phrase_length(&mut self) -> i64 {
        let (min, max) = {
            let p = self.params();
            (p.min_phrase_length, p.max_phrase_length)
        };
        self.random().integer(min, max)
    }

    /// Refill `plan` with the cuts for the next block and return the
    /// number of units the block spans.
    ///
    /// The caller clears `plan` beforehand. Implementations must leave it
    /// non-empty and return at most `request.units_left()` units.
    fn choose_cuts(&mut self, request: &BlockRequest, plan: &mut CutPlan) -> i64;
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;

    #[test]
    fn test_kind_index_roundtrip() {
        for kind in StrategyKind::ALL {
            assert_eq!(StrategyKind::from_index(kind.index()), Some(kind));
        }
        assert_eq!(StrategyKind::from_index(3), None);
    }

    #[test]
    fn test_glide_interpolates() {
        let params = CutParams {
            min_pan: -1.0,
            max_pan: 1.0,
            min_amp: 0.0,
            max_amp: 1.0,
            min_detune: 0.0,
            max_detune: 1200.0,
            ..CutParams::default()
        };
        // start pan -1, end pan 1, start amp 0, end amp 1, end detune 1200
        let mut rng = ScriptedRandom::new(vec![0.0, 0.9999, 0.0, 0.9999, 0.9999]);
        let glide = Glide::draw(&params, &mut rng);

        let (pan, amp, cents) = glide.at(0.0);
        assert_eq!(pan, -1.0);
        assert_eq!(amp, 0.0);
        assert_eq!(cents, 0.0);

        let (pan, amp, cents) = glide.at(0.5);
        assert!(pan.abs() < 1e-3);
        assert!((amp - 0.5).abs() < 1e-3);
        assert!((cents - 600.0).abs() < 1.0);
    }

    #[test]
    fn test_units_left_never_below_one() {
        let req = BlockRequest {
            units_done: 9,
            total_units: 8,
            subdiv: 8,
            samples_per_unit: 100.0,
        };
        assert_eq!(req.units_left(), 1);
    }
}
