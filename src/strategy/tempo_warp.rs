// src/strategy/tempo_warp.rs
//
// Tempo warp strategy.
//
// Blocks of one, two or four units are either played straight or
// chopped into many short repeats. Repeats are evenly spaced, or follow
// a geometric series so the cuts speed up (or, reversed, slow down).

use crate::cut::{samples, CutInfo, CutPlan};
use crate::random::RandomSource;

use super::{BlockRequest, CutParams, CutStrategy, Glide, StrategyKind};

const BLOCK_SIZES: [i64; 3] = [1, 2, 4];
const BLOCK_WEIGHTS: [f64; 3] = [0.5, 0.4, 0.1];

const REPEAT_COUNTS: [i64; 4] = [4, 8, 16, 32];

/// Accepted range of the acceleration ratio.
pub const ACCEL_MIN: f32 = 0.5;
pub const ACCEL_MAX: f32 = 0.999;

pub struct TempoWarpStrategy {
    params: CutParams,
    rng: Box<dyn RandomSource>,

    straight_chance: f32,
    regular_chance: f32,
    ritard_chance: f32,

    /// Ratio between consecutive accelerating cuts.
    accel: f32,
}

impl TempoWarpStrategy {
    pub fn new(rng: Box<dyn RandomSource>) -> Self {
        Self {
            params: CutParams::default(),
            rng,
            straight_chance: 0.5,
            regular_chance: 0.7,
            ritard_chance: 0.6,
            accel: 0.9,
        }
    }

    pub fn set_straight_chance(&mut self, chance: f32) {
        self.straight_chance = chance;
    }

    pub fn set_regular_chance(&mut self, chance: f32) {
        self.regular_chance = chance;
    }

    pub fn set_ritard_chance(&mut self, chance: f32) {
        self.ritard_chance = chance;
    }

    /// Clamped to `[ACCEL_MIN, ACCEL_MAX]`; a ratio of 1 would make the
    /// geometric series degenerate.
    pub fn set_accel(&mut self, v: f32) {
        self.accel = v.clamp(ACCEL_MIN, ACCEL_MAX);
    }

    pub fn accel(&self) -> f32 {
        self.accel
    }

    fn choose_block_size(&mut self) -> i64 {
        BLOCK_SIZES[self.rng.weighted_index(&BLOCK_WEIGHTS)]
    }

    /// 4, 8 or 16 repeats for blocks shorter than a bar, 8, 16 or 32 otherwise.
    fn choose_repeats(&mut self, bar_fraction: f32) -> i64 {
        let index = if bar_fraction < 1.0 {
            self.rng.integer(0, 2)
        } else {
            self.rng.integer(1, 3)
        };
        REPEAT_COUNTS[index as usize]
    }

    fn straight(&mut self, units: i64, spu: f64, plan: &mut CutPlan) {
        let size = samples((spu * units as f64).round());
        let gated_units = ((self.params.duty_cycle as f64 * units as f64) as i64).max(1);
        let length = samples(gated_units as f64 * spu);
        let amp = self.params.amp(self.rng.as_mut());
        plan.push(CutInfo::new(size, length).with_amp(amp));
    }

    fn regular(&mut self, units: i64, repeats: i64, spu: f64, glide: &Glide, plan: &mut CutPlan) {
        let size = samples(spu * units as f64 / repeats as f64 + 0.5);
        let length = samples(size as f64 * self.params.fill_duty_cycle as f64);

        for i in 0..repeats {
            let (pan, amp, cents) = glide.at(i as f32 / repeats as f32);
            plan.push(
                CutInfo::new(size, length)
                    .with_pan(pan)
                    .with_amp(amp)
                    .with_cents(cents),
            );
        }
    }

    /// Cut `i` lasts `first * accel^i`, with `first` chosen so the series
    /// sums to the whole block.
    fn accelerate(&mut self, units: i64, repeats: i64, spu: f64, glide: &Glide, plan: &mut CutPlan) {
        let accel = self.accel as f64;
        let first = units as f64 * (1.0 - accel) / (1.0 - accel.powi(repeats as i32));

        for i in 0..repeats {
            let size = samples(spu * first * accel.powi(i as i32));
            let length = samples(size as f64 * self.params.fill_duty_cycle as f64);
            let (pan, amp, cents) = glide.at(i as f32 / repeats as f32);
            plan.push(
                CutInfo::new(size, length)
                    .with_pan(pan)
                    .with_amp(amp)
                    .with_cents(cents),
            );
        }

        if self.rng.chance(self.ritard_chance as f64) {
            plan.reverse();
        }
    }
}

impl CutStrategy for TempoWarpStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TempoWarp
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
        let spu = request.samples_per_unit;
        let units = self.choose_block_size().min(request.units_left());

        if self.rng.chance(self.straight_chance as f64) {
            self.straight(units, spu, plan);
            return units;
        }

        let repeats = self.choose_repeats(units as f32 / request.subdiv.max(1) as f32);
        let glide = Glide::draw(&self.params, self.rng.as_mut());

        if self.rng.chance(self.regular_chance as f64) {
            self.regular(units, repeats, spu, &glide, plan);
        } else {
            self.accelerate(units, repeats, spu, &glide, plan);
        }

        units
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;
    use crate::strategy::test_support::{assert_plan_valid, request};

    fn seeded(seed: u64) -> TempoWarpStrategy {
        TempoWarpStrategy::new(Box::new(SeededRandom::new(seed)))
    }

    #[test]
    fn test_straight_is_single_cut() {
        let mut strategy = seeded(1);
        strategy.set_straight_chance(1.0);

        for done in 0..16 {
            let req = request(done, 16, 8);
            let mut plan = CutPlan::new();
            let units = strategy.choose_cuts(&req, &mut plan);
            assert_eq!(plan.len(), 1);
            assert_eq!(
                plan.cuts()[0].size,
                (req.samples_per_unit * units as f64).round() as usize
            );
        }
    }

    #[test]
    fn test_regular_repeats_are_even() {
        let mut strategy = seeded(2);
        strategy.set_straight_chance(0.0);
        strategy.set_regular_chance(1.0);

        for _ in 0..20 {
            let req = request(0, 32, 8);
            let mut plan = CutPlan::new();
            strategy.choose_cuts(&req, &mut plan);
            assert!(REPEAT_COUNTS.contains(&(plan.len() as i64)));
            let first = plan.cuts()[0].size;
            assert!(plan.iter().all(|c| c.size == first));
        }
    }

    #[test]
    fn test_accelerating_cuts_shrink() {
        let mut strategy = seeded(3);
        strategy.set_straight_chance(0.0);
        strategy.set_regular_chance(0.0);
        strategy.set_ritard_chance(0.0);
        strategy.set_accel(0.8);

        let req = request(0, 32, 8);
        let mut plan = CutPlan::new();
        let units = strategy.choose_cuts(&req, &mut plan);

        let sizes: Vec<usize> = plan.iter().map(|c| c.size).collect();
        assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
        let expected = units as f64 * req.samples_per_unit;
        assert!((plan.total_size() as f64 - expected).abs() <= plan.len() as f64);
    }

    #[test]
    fn test_ritardando_reverses() {
        let mut strategy = seeded(3);
        strategy.set_straight_chance(0.0);
        strategy.set_regular_chance(0.0);
        strategy.set_ritard_chance(1.0);

        let req = request(0, 32, 8);
        let mut plan = CutPlan::new();
        strategy.choose_cuts(&req, &mut plan);

        let sizes: Vec<usize> = plan.iter().map(|c| c.size).collect();
        assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_accel_is_clamped() {
        let mut strategy = seeded(0);
        strategy.set_accel(1.0);
        assert_eq!(strategy.accel(), ACCEL_MAX);
        strategy.set_accel(0.1);
        assert_eq!(strategy.accel(), ACCEL_MIN);
    }

    #[test]
    fn test_block_never_overruns_phrase() {
        for seed in 0..30 {
            let mut strategy = seeded(seed);
            strategy.params_mut().fill_duty_cycle = 0.5;
            strategy.params_mut().duty_cycle = 0.3;
            let mut done = 0;
            while done < 8 {
                let req = request(done, 8, 8);
                let mut plan = CutPlan::new();
                let units = strategy.choose_cuts(&req, &mut plan);
                assert_plan_valid(&plan, units, &req);
                done += units;
            }
            assert_eq!(done, 8);
        }
    }
}
