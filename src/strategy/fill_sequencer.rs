// src/strategy/fill_sequencer.rs
//
// Fill sequencer strategy.
//
// Works one bar at a time. Most blocks are quavers or pairs of
// semiquavers, with semiquavers more likely on the off-beats. The last
// bar of every phrase plays one of the hand-authored fills, one row per
// block.

use crate::cut::{samples, CutInfo, CutPlan};
use crate::random::RandomSource;

use super::{BlockRequest, CutParams, CutStrategy, StrategyKind};

/// Fill patterns. Each row is a list of cut durations in beats and is
/// played as one block.
pub const FILL_PATTERNS: [&[&[f64]]; 13] = [
    &[&[0.75, 0.75, 0.75, 0.75], &[1.0]],
    &[&[0.5, 1.0], &[1.0], &[1.0, 0.5]],
    &[&[0.5], &[1.0, 1.0, 1.0], &[0.5]],
    &[
        &[0.571429],
        &[0.571429, 0.571429],
        &[0.571429, 0.571429],
        &[0.571429],
        &[0.285714, 0.285716],
    ],
    &[&[1.0, 0.5], &[1.0, 0.5], &[0.5, 0.5]],
    &[&[0.5, 0.5], &[0.66, 0.67, 0.67], &[1.0]],
    &[&[0.34], &[0.33, 0.33, 2.33], &[0.34, 0.33]],
    &[&[1.4], &[0.4, 0.4], &[0.6, 0.2], &[1.0]],
    &[&[0.167, 0.167, 0.166, 1.0, 1.0, 0.5], &[1.0]],
    &[&[1.5, 0.5, 1.0], &[0.25, 0.25, 0.25, 0.25]],
    &[&[0.2, 0.2], &[0.4, 0.4], &[0.4, 0.4], &[2.0]],
    &[&[0.75, 0.75, 1.0], &[0.25, 0.25, 0.25, 0.25, 0.25, 0.25]],
    &[
        &[0.5, 1.0],
        &[0.5],
        &[0.125, 0.125, 0.125, 0.125],
        &[1.0],
        &[0.167, 0.167, 0.166],
    ],
];

/// Chance of semiquavers at each quaver of the bar, before scaling by activity.
const SEMIQUAVER_WEIGHTS: [f64; 8] = [0.0, 0.3, 0.0, 0.5, 0.7, 0.8, 0.9, 0.6];

pub struct FillSequencerStrategy {
    params: CutParams,
    rng: Box<dyn RandomSource>,

    /// Scales the semiquaver chance.
    activity: f64,

    fill: bool,
    fill_number: usize,
    fill_pos: usize,
}

impl FillSequencerStrategy {
    pub fn new(rng: Box<dyn RandomSource>) -> Self {
        Self {
            params: CutParams::default(),
            rng,
            activity: 0.1,
            fill: false,
            fill_number: 0,
            fill_pos: 0,
        }
    }

    pub fn set_activity(&mut self, v: f32) {
        self.activity = v as f64;
    }

    /// Whether the last block came from a fill pattern.
    pub fn in_fill(&self) -> bool {
        self.fill
    }

    /// Index into [`FILL_PATTERNS`] of the current or last fill.
    pub fn fill_number(&self) -> usize {
        self.fill_number
    }

    /// Emit the next row of the active fill. Returns `None` once the
    /// pattern is exhausted.
    ///
    /// The row is rounded to whole units and its durations are stretched
    /// to fill exactly that many units, keeping their ratios.
    fn fill_row(&mut self, request: &BlockRequest, units_left: i64, plan: &mut CutPlan) -> Option<i64> {
        let row = FILL_PATTERNS[self.fill_number].get(self.fill_pos)?;
        let fill_duty = self.params.fill_duty_cycle as f64;

        let beats: f64 = row.iter().sum();
        let units = ((request.subdiv as f64 * beats / 4.0).round() as i64)
            .max(1)
            .min(units_left);
        let samples_per_row_beat = units as f64 * request.samples_per_unit / beats;

        for &duration in row.iter() {
            let pan = self.params.pan(self.rng.as_mut());
            let amp = self.params.amp(self.rng.as_mut());
            let cents = self.params.detune(self.rng.as_mut());
            let size = samples_per_row_beat * duration;
            plan.push(
                CutInfo::new(samples(size), samples(size * fill_duty))
                    .with_pan(pan)
                    .with_amp(amp)
                    .with_cents(cents),
            );
        }
        self.fill_pos += 1;

        Some(units)
    }

    /// Quavers or semiquavers, split evenly across the block.
    fn groove(&mut self, request: &BlockRequest, units_left: i64, plan: &mut CutPlan) -> i64 {
        let subdiv = request.subdiv;
        let bars_done = request.units_done as f64 / subdiv as f64;
        let semiquaver_in_beat = (bars_done * 16.0) as i64 % 4;
        let quaver_in_bar = ((bars_done * 8.0) as i64).rem_euclid(8) as usize;
        let semiquaver_chance = SEMIQUAVER_WEIGHTS[quaver_in_bar] * self.activity;
        let duty = self.params.duty_cycle as f64;

        let mut quavers = 1 + 2 * self.rng.integer(0, 1);
        if semiquaver_in_beat == 2 {
            quavers = 1;
        }

        let units = ((quavers as f64 * subdiv as f64 / 8.0).round() as i64)
            .max(1)
            .min(units_left);
        let block = units as f64 * request.samples_per_unit;

        if self.rng.chance(semiquaver_chance) {
            let count = quavers * 2;
            let size = block / count as f64;
            for _ in 0..count {
                let pan = self.params.pan(self.rng.as_mut());
                let amp = self.params.amp(self.rng.as_mut());
                let cents = self.params.detune(self.rng.as_mut());
                plan.push(
                    CutInfo::new(samples(size), samples(size * duty))
                        .with_pan(pan)
                        .with_amp(amp)
                        .with_cents(cents),
                );
            }
        } else {
            let size = block / quavers as f64;
            for _ in 0..quavers {
                let amp = self.params.amp(self.rng.as_mut());
                let cents = self.params.detune(self.rng.as_mut());
                plan.push(
                    CutInfo::new(samples(size), samples(size * duty))
                        .with_amp(amp)
                        .with_cents(cents),
                );
            }
        }

        units
    }
}

impl CutStrategy for FillSequencerStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FillSequencer
    }

    fn params(&self) -> &CutParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut CutParams {
        &mut self.params
    }

    fn random(&mut self) -> &mut dyn RandomSource {
        self.rng.as_mut()
    }

    fn choose_phrase_length(&mut self) -> i64 {
        self.fill = false;
        let (min, max) = (self.params.min_phrase_length, self.params.max_phrase_length);
        self.rng.integer(min, max)
    }

    fn choose_cuts(&mut self, request: &BlockRequest, plan: &mut CutPlan) -> i64 {
        let subdiv = request.subdiv.max(1);
        let request = BlockRequest { subdiv, ..*request };
        // one bar at a time
        let units_left = (subdiv - request.units_done.rem_euclid(subdiv)).min(request.units_left());

        if request.total_units - request.units_done == subdiv {
            self.fill = true;
            self.fill_number = self.rng.integer(0, FILL_PATTERNS.len() as i64 - 1) as usize;
            self.fill_pos = 0;
        }

        if self.fill {
            if let Some(units) = self.fill_row(&request, units_left, plan) {
                return units;
            }
            self.fill = false;
            self.fill_pos = 0;
        }

        self.groove(&request, units_left, plan)
    }
}
