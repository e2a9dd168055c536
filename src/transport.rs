// src/transport.rs
//
// Host clock and rhythmic position tracking.

//
// ===============================
// MARK: Host time snapshot
// ===============================
//

/// Timing reported by the host at the start of an audio block.
///
/// This struct:
/// - is copyable
/// - is immutable for the duration of one block
/// - carries the quarter-note position, not a sample counter
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HostTime {
    pub bpm: f64,

    /// Beats per bar.
    pub numerator: f64,

    /// Note value of one beat (4 = quarter note).
    pub denominator: f64,

    /// Sample rate (Hz)
    pub sample_rate: f64,

    /// Position in quarter notes at the first sample of the block.
    pub ppq_position: f64,
}

impl Default for HostTime {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            numerator: 4.0,
            denominator: 4.0,
            sample_rate: 44_100.0,
            ppq_position: 0.0,
        }
    }
}

impl HostTime {
    /// Quarter notes per sample.
    #[inline]
    pub fn quarters_per_sample(&self) -> f64 {
        (self.bpm / 60.0) / self.sample_rate
    }

    /// The same clock `frames` samples later.
    ///
    /// Lets a free-running caller produce the next block's snapshot.
    pub fn advanced(&self, frames: usize) -> Self {
        Self {
            ppq_position: self.ppq_position + frames as f64 * self.quarters_per_sample(),
            ..*self
        }
    }
}

//
// ===================================
// MARK: Per-sample rhythmic position
// ===================================
//

/// Bar and unit-in-bar of one sample.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UnitPosition {
    pub bar: i64,
    pub unit: i64,
}

/// Turns a host clock into unit boundaries.
///
/// This struct:
/// - is re-anchored to the host at every block start
/// - advances a fractional unit position once per sample
/// - reports a position only when the unit changes
///
/// The first sample after construction or `reset` always reports.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    /// Position in units since the host origin.
    position: f64,

    /// Units per sample.
    increment: f64,

    subdiv: i64,

    last: Option<UnitPosition>,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor to the host position at the first sample of a block.
    ///
    /// `subdiv` is the number of units per bar and must be positive.
    pub fn begin_block(&mut self, time: &HostTime, subdiv: i64) {
        debug_assert!(subdiv > 0);
        self.subdiv = subdiv.max(1);

        let units_per_quarter = self.subdiv as f64 / time.numerator * time.denominator / 4.0;
        self.position = units_per_quarter * time.ppq_position;
        self.increment = units_per_quarter * time.quarters_per_sample();
    }

    /// Position of the current sample, if it starts a new unit. Then
    /// moves on to the next sample.
    #[inline]
    pub fn advance(&mut self) -> Option<UnitPosition> {
        let subdiv = self.subdiv.max(1) as f64;
        let current = UnitPosition {
            bar: (self.position / subdiv).floor() as i64,
            unit: self.position.rem_euclid(subdiv).floor() as i64,
        };
        self.position += self.increment;

        if self.last == Some(current) {
            return None;
        }
        self.last = Some(current);
        Some(current)
    }

    /// Forget the last reported position.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Fractional unit position of the next sample.
    pub fn position(&self) -> f64 {
        self.position
    }
}
