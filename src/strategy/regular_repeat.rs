// src/strategy/regular_repeat.rs
//
// Regular repeat strategy.
//
// Picks an odd number of units and plays it a few times in a row. Near
// the end of a phrase it may instead stutter: the remaining units are
// chopped into equal fractions with gliding pan, amp and pitch.

use crate::cut::{samples, CutInfo, CutPlan, PLAN_CAPACITY};
use crate::random::RandomSource;

use super::{BlockRequest, CutParams, CutStrategy, Glide, StrategyKind};

/// Stutter subdivisions of one unit, and how likely each is.
const STUTTER_MULTIPLIERS: [i64; 6] = [1, 2, 3, 4, 6, 8];
const STUTTER_WEIGHTS: [f64; 6] = [0.4, 0.3, 0.1, 0.1, 0.05, 0.05];

pub struct RegularRepeatStrategy {
    params: CutParams,
    rng: Box<dyn RandomSource>,

    /// Probability of stuttering once inside the stutter area.
    stutter_chance: f32,

    /// Fraction of a bar before the phrase end where stutters may happen.
    stutter_area: f32,

    /// Occurrences, not repeats: the public value plus one.
    min_repeats: i64,
    max_repeats: i64,
}

impl RegularRepeatStrategy {
    pub fn new(rng: Box<dyn RandomSource>) -> Self {
        Self {
            params: CutParams::default(),
            rng,
            stutter_chance: 1.0,
            stutter_area: 0.5,
            min_repeats: 1,
            max_repeats: 2,
        }
    }

    pub fn set_stutter_chance(&mut self, v: f32) {
        self.stutter_chance = v;
    }

    /// Bars before the phrase end, clamped to `[0, 1]`.
    pub fn set_stutter_area(&mut self, v: f32) {
        self.stutter_area = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
    }

    pub fn stutter_area(&self) -> f32 {
        self.stutter_area
    }

    /// Extra plays after the first, so 0 means "play once".
    pub fn set_min_repeats(&mut self, v: i64) {
        self.min_repeats = v + 1;
    }

    /// Extra plays after the first.
    pub fn set_max_repeats(&mut self, v: i64) {
        self.max_repeats = v + 1;
    }

    /// `(min, max)` occurrences per block.
    pub fn occurrences(&self) -> (i64, i64) {
        (self.min_repeats, self.max_repeats)
    }

    /// Odd unit count `2k + 1` with `k` uniform in `[0, subdiv / 4]`.
    fn choose_units_in_cut(&mut self, subdiv: i64) -> i64 {
        2 * self.rng.integer(0, subdiv / 4) + 1
    }

    /// Every remaining unit, repeated at `multiplier` times the rate.
    ///
    /// The multiplier is lowered when the cuts would not fit in a plan.
    fn stutter(&mut self, units_left: i64, spu: f64, plan: &mut CutPlan) -> i64 {
        let drawn = STUTTER_MULTIPLIERS[self.rng.weighted_index(&STUTTER_WEIGHTS)];
        let multiplier = drawn.min(PLAN_CAPACITY as i64 / units_left.max(1)).max(1);
        let repeats = units_left * multiplier;
        let size = samples(spu / multiplier as f64);
        let length = samples(size as f64 * self.params.fill_duty_cycle as f64);
        let glide = Glide::draw(&self.params, self.rng.as_mut());

        for i in 0..repeats {
            let (pan, amp, cents) = glide.at(i as f32 / repeats as f32);
            plan.push(
                CutInfo::new(size, length)
                    .with_pan(pan)
                    .with_amp(amp)
                    .with_cents(cents),
            );
        }

        units_left
    }

    fn repeat(&mut self, units_left: i64, subdiv: i64, spu: f64, plan: &mut CutPlan) -> i64 {
        let mut units_in_cut = self.choose_units_in_cut(subdiv);
        let mut repeats = self.rng.integer(self.min_repeats, self.max_repeats).max(1);

        while units_in_cut > units_left {
            units_in_cut -= 2;
        }
        units_in_cut = units_in_cut.max(1);

        while repeats * units_in_cut > units_left {
            if repeats > 1 {
                repeats -= 1;
            } else if units_left <= subdiv / 2 + 1 {
                units_in_cut = units_left;
                repeats = 1;
            } else {
                units_in_cut = 1;
                repeats = 1;
            }
        }

        let cut_samples = units_in_cut as f64 * spu;
        let size = samples(cut_samples);
        let length = samples(self.params.duty_cycle as f64 * cut_samples);

        for _ in 0..repeats {
            let amp = self.params.amp(self.rng.as_mut());
            plan.push(CutInfo::new(size, length).with_amp(amp));
        }

        repeats * units_in_cut
    }
}

impl CutStrategy for RegularRepeatStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RegularRepeat
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

    fn choose_cuts(&mut self, request: &BlockRequest, plan: &mut CutPlan) -> i64 {
        let units_left = request.units_left();
        let subdiv = request.subdiv.max(1);
        let spu = request.samples_per_unit;

        if (units_left as f32 / subdiv as f32) < self.stutter_area
            && self.rng.chance(self.stutter_chance as f64)
        {
            self.stutter(units_left, spu, plan)
        } else {
            self.repeat(units_left, subdiv, spu, plan)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{ScriptedRandom, SeededRandom};
    use crate::strategy::test_support::{assert_plan_fills_block, assert_plan_valid, request};

    fn seeded(seed: u64) -> RegularRepeatStrategy {
        RegularRepeatStrategy::new(Box::new(SeededRandom::new(seed)))
    }

    #[test]
    fn test_plans_satisfy_invariants() {
        for seed in 0..20 {
            let mut strategy = seeded(seed);
            strategy.set_min_repeats(0);
            strategy.set_max_repeats(3);
            strategy.params_mut().duty_cycle = 0.6;
            strategy.params_mut().fill_duty_cycle = 0.8;

            for subdiv in [6, 8, 12, 16, 32] {
                let total = subdiv * 2;
                let mut done = 0;
                while done < total {
                    let req = request(done, total, subdiv);
                    let mut plan = CutPlan::new();
                    let units = strategy.choose_cuts(&req, &mut plan);
                    assert_plan_valid(&plan, units, &req);

                    let expected = units as f64 * req.samples_per_unit;
                    let diff = (plan.total_size() as f64 - expected).abs();
                    assert!(diff <= plan.len() as f64, "sizes drift by {}", diff);
                    done += units;
                }
                assert_eq!(done, total);
            }
        }
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let req = request(0, 16, 8);
        let mut a = seeded(5);
        let mut b = seeded(5);
        a.set_stutter_chance(0.0);
        b.set_stutter_chance(0.0);

        let mut plan_a = CutPlan::new();
        let mut plan_b = CutPlan::new();
        let units_a = a.choose_cuts(&req, &mut plan_a);
        let units_b = b.choose_cuts(&req, &mut plan_b);

        assert_eq!(units_a, units_b);
        assert_eq!(plan_a, plan_b);
    }

    #[test]
    fn test_single_unit_left_degrades_to_one_cut() {
        let mut strategy = seeded(9);
        strategy.set_stutter_chance(0.0);
        strategy.set_max_repeats(4);
        strategy.params_mut().min_phrase_length = 1;
        strategy.params_mut().max_phrase_length = 1;

        for _ in 0..50 {
            let req = request(7, 8, 8);
            let mut plan = CutPlan::new();
            let units = strategy.choose_cuts(&req, &mut plan);
            assert_eq!(units, 1);
            assert_eq!(plan.len(), 1);
            assert_eq!(plan.cuts()[0].size, req.samples_per_unit as usize);
        }
    }

    #[test]
    fn test_stutter_splits_remaining_units() {
        // chance draw, multiplier draw (0.45 -> x2), then five glide draws
        let rng = ScriptedRandom::new(vec![0.0, 0.45, 0.5, 0.5, 0.5, 0.5, 0.5]);
        let mut strategy = RegularRepeatStrategy::new(Box::new(rng));
        strategy.set_stutter_chance(1.0);
        strategy.set_stutter_area(1.0);

        let req = request(6, 8, 8);
        let mut plan = CutPlan::new();
        let units = strategy.choose_cuts(&req, &mut plan);

        assert_eq!(units, 2);
        assert_eq!(plan.len(), 4);
        for cut in &plan {
            assert_eq!(cut.size, (req.samples_per_unit / 2.0) as usize);
        }
    }

    #[test]
    fn test_stutter_area_is_clamped() {
        let mut strategy = seeded(1);
        strategy.set_stutter_area(40.0);
        assert_eq!(strategy.stutter_area(), 1.0);
        strategy.set_stutter_area(-2.0);
        assert_eq!(strategy.stutter_area(), 0.0);
        strategy.set_stutter_area(f32::NAN);
        assert_eq!(strategy.stutter_area(), 0.0);
    }

    #[test]
    fn test_stutter_fits_plan_capacity() {
        // chance draw, then the top multiplier (x8)
        let rng = ScriptedRandom::new(vec![0.0, 0.99]);
        let mut strategy = RegularRepeatStrategy::new(Box::new(rng));
        strategy.set_stutter_chance(1.0);
        strategy.set_stutter_area(1.0);

        // 63 units left of a 64-unit bar
        let req = request(1, 64, 64);
        let mut plan = CutPlan::new();
        let units = strategy.choose_cuts(&req, &mut plan);

        assert_eq!(units, 63);
        assert!(plan.len() <= PLAN_CAPACITY);
        assert_eq!(plan.len(), 63 * 4);
        assert_plan_fills_block(&plan, units, &req);
    }

    #[test]
    fn test_stutter_glides_detune_from_zero() {
        let mut strategy = seeded(2);
        strategy.set_stutter_chance(1.0);
        strategy.set_stutter_area(1.0);
        strategy.params_mut().min_detune = 300.0;
        strategy.params_mut().max_detune = 600.0;

        let req = request(7, 8, 8);
        let mut plan = CutPlan::new();
        strategy.choose_cuts(&req, &mut plan);
        assert_eq!(plan.cuts()[0].cents, 0.0);
        if plan.len() > 1 {
            assert!(plan.cuts()[plan.len() - 1].cents > 0.0);
        }
    }

    #[test]
    fn test_repeat_setters_store_occurrences() {
        let mut strategy = seeded(1);
        strategy.set_min_repeats(0);
        strategy.set_max_repeats(0);
        assert_eq!(strategy.occurrences(), (1, 1));
        strategy.set_stutter_chance(0.0);

        let req = request(0, 32, 8);
        let mut plan = CutPlan::new();
        let units = strategy.choose_cuts(&req, &mut plan);
        assert_eq!(plan.len(), 1);
        assert_eq!(units % 2, 1);
    }

    #[test]
    fn test_phrase_length_in_bounds() {
        let mut strategy = seeded(4);
        strategy.params_mut().min_phrase_length = 2;
        strategy.params_mut().max_phrase_length = 5;
        for _ in 0..200 {
            let bars = strategy.choose_phrase_length();
            assert!((2..=5).contains(&bars));
        }
    }
}
