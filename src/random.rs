// src/random.rs
//
// Random decisions shared by every cut strategy.
//
// Strategies never touch a process-wide generator. Each one owns a
// boxed `RandomSource` handed to it at construction, so a fixed seed
// (or a scripted sequence of draws) reproduces the exact same cuts.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Source of uniform draws in `[0, 1)` plus the derived helpers the
/// strategies need.
pub trait RandomSource: Send {
    /// Next uniform draw in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Restart the sequence from `seed`.
    fn reseed(&mut self, seed: u64);

    /// Uniform float between `min` and `max`.
    ///
    /// The bounds may be given in either order.
    #[inline]
    fn uniform(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_unit()
    }

    /// Uniform integer in `[min, max]`, both ends inclusive.
    fn integer(&mut self, min: i64, max: i64) -> i64 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        if lo == hi {
            return lo;
        }
        let span = (hi - lo + 1) as f64;
        (lo + (self.next_unit() * span) as i64).min(hi)
    }

    /// `true` with probability `p`.
    #[inline]
    fn chance(&mut self, p: f64) -> bool {
        self.next_unit() < p
    }

    /// Pick an index with probability proportional to `weights[i]`.
    ///
    /// Builds the cumulative sum, draws in `[0, total)` and returns the
    /// first bucket whose running sum exceeds the draw.
    fn weighted_index(&mut self, weights: &[f64]) -> usize {
        debug_assert!(!weights.is_empty());
        let total: f64 = weights.iter().sum();
        let draw = self.uniform(0.0, total);

        let mut cumsum = 0.0;
        for (index, weight) in weights.iter().enumerate() {
            cumsum += weight;
            if draw < cumsum {
                return index;
            }
        }
        weights.len().saturating_sub(1)
    }
}

/// Deterministic generator backed by `SmallRng`.
pub struct SeededRandom {
    rng: SmallRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RandomSource for SeededRandom {
    #[inline]
    fn next_unit(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }

    fn reseed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }
}

/// Replays a fixed sequence of draws, wrapping around at the end.
///
/// Lets a caller force a specific decision path through a strategy.
pub struct ScriptedRandom {
    draws: Vec<f64>,
    cursor: usize,
}

impl ScriptedRandom {
    /// Every draw is clamped into `[0, 1)`. An empty script always yields 0.
    pub fn new(draws: Vec<f64>) -> Self {
        let draws = draws
            .into_iter()
            .map(|d| d.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        Self { draws, cursor: 0 }
    }

    /// Number of draws consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let value = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        value
    }

    fn reseed(&mut self, _seed: u64) {
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_is_deterministic() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_unit(), b.next_unit());
        }
    }

    #[test]
    fn test_reseed_restarts_sequence() {
        let mut rng = SeededRandom::new(7);
        let first: Vec<f64> = (0..8).map(|_| rng.next_unit()).collect();
        rng.reseed(7);
        let second: Vec<f64> = (0..8).map(|_| rng.next_unit()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_integer_covers_inclusive_range() {
        let mut rng = SeededRandom::new(3);
        let mut seen = [false; 5];
        for _ in 0..1000 {
            let v = rng.integer(2, 6);
            assert!((2..=6).contains(&v));
            seen[(v - 2) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_integer_swapped_bounds() {
        let mut rng = SeededRandom::new(3);
        for _ in 0..100 {
            let v = rng.integer(4, 1);
            assert!((1..=4).contains(&v));
        }
        assert_eq!(rng.integer(5, 5), 5);
    }

    #[test]
    fn test_weighted_index_follows_cumsum() {
        let weights = [0.4, 0.3, 0.1, 0.1, 0.05, 0.05];
        // total is 1.0, so the draw is the scripted value itself
        let mut rng = ScriptedRandom::new(vec![0.0, 0.39, 0.41, 0.75, 0.86, 0.92, 0.99]);
        let picks: Vec<usize> = (0..7).map(|_| rng.weighted_index(&weights)).collect();
        assert_eq!(picks, vec![0, 0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_weighted_index_distribution() {
        let mut rng = SeededRandom::new(11);
        let weights = [0.5, 0.4, 0.1];
        let mut counts = [0usize; 3];
        for _ in 0..10_000 {
            counts[rng.weighted_index(&weights)] += 1;
        }
        assert!(counts[0] > counts[1]);
        assert!(counts[1] > counts[2]);
        assert!(counts[2] > 500);
    }

    #[test]
    fn test_scripted_wraps() {
        let mut rng = ScriptedRandom::new(vec![0.25, 0.5]);
        assert_eq!(rng.next_unit(), 0.25);
        assert_eq!(rng.next_unit(), 0.5);
        assert_eq!(rng.next_unit(), 0.25);
        assert_eq!(rng.consumed(), 3);
    }
}
