// src/scheduler.rs
//
// Phrase / block / unit state machine.
//
// Driven once per elapsed unit. Decides when a new phrase starts, asks
// the active strategy for the next block of cuts, and hands that plan
// to the player.

use log::{debug, trace, warn};

use crate::config::{CutterConfig, SAMPLE_RATE_RANGE, SIGNATURE_RANGE, TEMPO_RANGE};
use crate::cut::{CutPlan, PLAN_CAPACITY};
use crate::error::{ConfigError, ConfigResult};
use crate::listener::{CutListener, ListenerHub};
use crate::player::{LiveCutPlayer, PlayerOutput};
use crate::random::{RandomSource, SeededRandom};
use crate::strategy::{
    BlockRequest, CutParams, CutStrategy, FillSequencerStrategy, RegularRepeatStrategy,
    StrategyKind, TempoWarpStrategy,
};

/// Nested phrase / block / unit scheduler.
///
/// Owns the three strategies, the player and the listener hub.
///
/// Invariants:
/// - `subdiv > 0`, tempo and sample rate positive
/// - `0 <= units_inside_block <= units_in_block` and
///   `0 <= units_done <= total_units`, except right after `set_position`
///   when an out-of-range value forces the next transition
/// - strategy switches only affect the next block
pub struct PhraseScheduler {
    regular_repeat: RegularRepeatStrategy,
    tempo_warp: TempoWarpStrategy,
    fill_sequencer: FillSequencerStrategy,
    active: StrategyKind,

    player: LiveCutPlayer,
    hub: ListenerHub,

    /// Reused for every block so block decisions do not allocate.
    plan: CutPlan,

    // Timing
    tempo: f64,
    sample_rate: f64,
    numerator: f64,
    denominator: f64,
    subdiv: i64,
    samples_per_unit: f64,
    fade_ms: f32,

    /// Last seed handed to the strategies.
    seed: u64,

    // Counters
    units_done: i64,
    total_units: i64,
    units_in_block: i64,
    units_inside_block: i64,
}

impl Default for PhraseScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PhraseScheduler {
    /// 120 bpm, 4/4, 44.1 kHz, eight units per bar, seed 1.
    pub fn new() -> Self {
        Self::with_random_sources(
            Box::new(SeededRandom::new(1)),
            Box::new(SeededRandom::new(2)),
            Box::new(SeededRandom::new(3)),
        )
    }

    /// Build with explicit random sources for the RegularRepeat,
    /// TempoWarp and FillSequencer strategies, in that order.
    pub fn with_random_sources(
        regular_repeat: Box<dyn RandomSource>,
        tempo_warp: Box<dyn RandomSource>,
        fill_sequencer: Box<dyn RandomSource>,
    ) -> Self {
        let mut scheduler = Self {
            regular_repeat: RegularRepeatStrategy::new(regular_repeat),
            tempo_warp: TempoWarpStrategy::new(tempo_warp),
            fill_sequencer: FillSequencerStrategy::new(fill_sequencer),
            active: StrategyKind::RegularRepeat,
            player: LiveCutPlayer::new(),
            hub: ListenerHub::new(),
            plan: CutPlan::with_capacity(PLAN_CAPACITY),
            tempo: 120.0,
            sample_rate: 44_100.0,
            numerator: 4.0,
            denominator: 4.0,
            subdiv: 8,
            samples_per_unit: 0.0,
            fade_ms: 0.0,
            seed: 1,
            units_done: 0,
            total_units: 0,
            units_in_block: 0,
            units_inside_block: 0,
        };
        scheduler.update_rates();
        scheduler
    }

    pub fn with_config(config: &CutterConfig) -> ConfigResult<Self> {
        let mut scheduler = Self::new();
        scheduler.apply_config(config)?;
        Ok(scheduler)
    }

    /// Validate `config`, then push every value through its setter.
    ///
    /// Nothing is changed when validation fails. The strategies are only
    /// reseeded when `config.seed` differs from the last seed, so
    /// re-applying a config keeps the random sequences running.
    pub fn apply_config(&mut self, config: &CutterConfig) -> ConfigResult<()> {
        if let Err(e) = config.validate() {
            warn!("rejected cutter config: {}", e);
            return Err(e);
        }

        if config.seed != self.seed {
            self.set_seed(config.seed);
        }
        self.set_strategy(config.strategy);
        self.set_subdiv(config.subdiv)?;
        self.set_fade(config.fade_ms);

        self.set_min_amp(config.min_amp);
        self.set_max_amp(config.max_amp);
        self.set_min_pan(config.min_pan);
        self.set_max_pan(config.max_pan);
        self.set_min_detune(config.min_detune);
        self.set_max_detune(config.max_detune);
        self.set_duty_cycle(config.duty_cycle);
        self.set_fill_duty_cycle(config.fill_duty_cycle);
        self.set_min_phrase_length(config.min_phrase_length);
        self.set_max_phrase_length(config.max_phrase_length);

        self.set_min_repeats(config.min_repeats);
        self.set_max_repeats(config.max_repeats);
        self.set_stutter_chance(config.stutter_chance);
        self.set_stutter_area(config.stutter_area);

        self.set_straight_chance(config.straight_chance);
        self.set_regular_chance(config.regular_chance);
        self.set_ritard_chance(config.ritard_chance);
        self.set_accel(config.accel);

        self.set_activity(config.activity);

        Ok(())
    }

    pub fn register_listener(&mut self, listener: Box<dyn CutListener>) {
        self.hub.register(listener);
    }

    // -------------------------------
    // MARK: Strategy selection
    // -------------------------------

    /// Select the strategy by index. Out-of-range indices are a
    /// programming error and are ignored in release builds.
    pub fn set_cut_proc(&mut self, index: usize) {
        debug_assert!(index < StrategyKind::COUNT, "strategy index {} out of range", index);
        if let Some(kind) = StrategyKind::from_index(index) {
            self.set_strategy(kind);
        }
    }

    pub fn set_strategy(&mut self, kind: StrategyKind) {
        if kind != self.active {
            debug!("strategy {} -> {}", self.active.name(), kind.name());
        }
        self.active = kind;
    }

    pub fn strategy(&self) -> StrategyKind {
        self.active
    }

    /// Reseed all three strategies from one value.
    pub fn set_seed(&mut self, seed: u64) {
        debug!("reseeding strategies from {}", seed);
        self.seed = seed;
        self.regular_repeat.random().reseed(seed);
        self.tempo_warp.random().reseed(seed.wrapping_add(1));
        self.fill_sequencer.random().reseed(seed.wrapping_add(2));
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn active_strategy(&mut self) -> &mut dyn CutStrategy {
        match self.active {
            StrategyKind::RegularRepeat => &mut self.regular_repeat,
            StrategyKind::TempoWarp => &mut self.tempo_warp,
            StrategyKind::FillSequencer => &mut self.fill_sequencer,
        }
    }

    // -------------------------------
    // MARK: Timing
    // -------------------------------

    pub fn set_subdiv(&mut self, subdiv: i64) -> ConfigResult<()> {
        if subdiv <= 0 {
            warn!("rejected subdivision {}", subdiv);
            return Err(ConfigError::InvalidSubdivision(subdiv));
        }
        self.subdiv = subdiv;
        self.update_rates();
        Ok(())
    }

    /// Host timing, called at least once per audio block. Rates are only
    /// recomputed when something changed.
    pub fn set_time_infos(
        &mut self,
        bpm: f64,
        numerator: f64,
        denominator: f64,
        sample_rate: f64,
    ) -> ConfigResult<()> {
        // NaN fails every range check
        if !TEMPO_RANGE.contains(&bpm) {
            warn!("rejected tempo {}", bpm);
            return Err(ConfigError::InvalidTempo(bpm));
        }
        if !SAMPLE_RATE_RANGE.contains(&sample_rate) {
            warn!("rejected sample rate {}", sample_rate);
            return Err(ConfigError::InvalidSampleRate(sample_rate));
        }
        if !SIGNATURE_RANGE.contains(&numerator) || !SIGNATURE_RANGE.contains(&denominator) {
            warn!("rejected time signature {}/{}", numerator, denominator);
            return Err(ConfigError::InvalidTimeSignature {
                numerator,
                denominator,
            });
        }

        let changed = self.tempo != bpm
            || self.numerator != numerator
            || self.denominator != denominator
            || self.sample_rate != sample_rate;

        if changed {
            self.tempo = bpm;
            self.numerator = numerator;
            self.denominator = denominator;
            self.sample_rate = sample_rate;
            self.update_rates();
        }
        Ok(())
    }

    /// Fade at each cut edge, in milliseconds.
    pub fn set_fade(&mut self, ms: f32) {
        self.fade_ms = ms;
        self.player.set_fade(self.fade_samples());
    }

    #[inline]
    fn fade_samples(&self) -> f32 {
        self.fade_ms * 0.001 * self.sample_rate as f32
    }

    #[inline]
    fn beats_per_bar(&self) -> f64 {
        4.0 * self.numerator / self.denominator
    }

    #[inline]
    fn samples_per_beat(&self) -> f64 {
        self.sample_rate / (self.tempo / 60.0)
    }

    fn update_rates(&mut self) {
        let samples_per_bar = self.samples_per_beat() * self.beats_per_bar();
        self.samples_per_unit = samples_per_bar / self.subdiv as f64;

        self.player.set_fade(self.fade_samples());

        // Longest cut any strategy can produce: a bar of regular
        // repeats, a long fill cut, or a straight four-unit warp block.
        let longest = samples_per_bar
            .max(3.0 * self.samples_per_beat())
            .max(4.0 * self.samples_per_unit);
        let reserve = longest.ceil() as usize + 1;
        self.player.reserve(reserve);

        debug!(
            "rates: {} bpm, {}/{}, {} Hz, {} units/bar -> {:.2} samples/unit, reserved {} samples",
            self.tempo,
            self.numerator,
            self.denominator,
            self.sample_rate,
            self.subdiv,
            self.samples_per_unit,
            reserve
        );
    }

    // -------------------------------
    // MARK: Parameters
    // -------------------------------

    fn broadcast(&mut self, apply: impl Fn(&mut CutParams)) {
        apply(self.regular_repeat.params_mut());
        apply(self.tempo_warp.params_mut());
        apply(self.fill_sequencer.params_mut());
    }

    pub fn set_min_amp(&mut self, v: f32) {
        self.broadcast(|p| p.min_amp = v);
    }

    pub fn set_max_amp(&mut self, v: f32) {
        self.broadcast(|p| p.max_amp = v);
    }

    pub fn set_min_pan(&mut self, v: f32) {
        self.broadcast(|p| p.min_pan = v);
    }

    pub fn set_max_pan(&mut self, v: f32) {
        self.broadcast(|p| p.max_pan = v);
    }

    /// Cents.
    pub fn set_min_detune(&mut self, v: f32) {
        self.broadcast(|p| p.min_detune = v);
    }

    /// Cents.
    pub fn set_max_detune(&mut self, v: f32) {
        self.broadcast(|p| p.max_detune = v);
    }

    pub fn set_duty_cycle(&mut self, v: f32) {
        self.broadcast(|p| p.duty_cycle = v);
    }

    pub fn set_fill_duty_cycle(&mut self, v: f32) {
        self.broadcast(|p| p.fill_duty_cycle = v);
    }

    /// Bars.
    pub fn set_min_phrase_length(&mut self, v: i64) {
        self.broadcast(|p| p.min_phrase_length = v);
    }

    /// Bars.
    pub fn set_max_phrase_length(&mut self, v: i64) {
        self.broadcast(|p| p.max_phrase_length = v);
    }

    pub fn set_stutter_chance(&mut self, v: f32) {
        self.regular_repeat.set_stutter_chance(v);
    }

    pub fn set_stutter_area(&mut self, v: f32) {
        self.regular_repeat.set_stutter_area(v);
    }

    pub fn set_min_repeats(&mut self, v: i64) {
        self.regular_repeat.set_min_repeats(v);
    }

    pub fn set_max_repeats(&mut self, v: i64) {
        self.regular_repeat.set_max_repeats(v);
    }

    pub fn set_straight_chance(&mut self, v: f32) {
        self.tempo_warp.set_straight_chance(v);
    }

    pub fn set_regular_chance(&mut self, v: f32) {
        self.tempo_warp.set_regular_chance(v);
    }

    pub fn set_ritard_chance(&mut self, v: f32) {
        self.tempo_warp.set_ritard_chance(v);
    }

    pub fn set_accel(&mut self, v: f32) {
        self.tempo_warp.set_accel(v);
    }

    pub fn set_activity(&mut self, v: f32) {
        self.fill_sequencer.set_activity(v);
    }

    // -------------------------------
    // MARK: State machine
    // -------------------------------

    fn phrase(&mut self, bar: i64, unit: i64) {
        let bars = self.active_strategy().choose_phrase_length().max(1);
        self.total_units = bars * self.subdiv;
        self.units_done = 0;

        trace!("phrase at {}:{}, {} bars", bar, unit, bars);
        self.hub.on_phrase(bar, unit);
    }

    fn block(&mut self, bar: i64, unit: i64) {
        self.units_inside_block = 0;

        let request = BlockRequest {
            units_done: self.units_done,
            total_units: self.total_units,
            subdiv: self.subdiv,
            samples_per_unit: self.samples_per_unit,
        };

        // Moved out and back so the strategy can borrow self. Keeps its storage.
        let mut plan = std::mem::take(&mut self.plan);
        plan.clear();
        let units = self.active_strategy().choose_cuts(&request, &mut plan);
        self.plan = plan;

        debug_assert!(!self.plan.is_empty(), "{} produced an empty plan", self.active.name());
        debug_assert!(
            (1..=request.units_left()).contains(&units),
            "{} returned {} units with {} left",
            self.active.name(),
            units,
            request.units_left()
        );
        self.units_in_block = units.clamp(1, request.units_left());

        trace!(
            "block at {}:{}, {} units, {} cuts",
            bar,
            unit,
            self.units_in_block,
            self.plan.len()
        );

        self.player.on_block(&self.plan, &mut self.hub);
        self.hub.on_block(bar, unit);
    }

    /// One unit elapsed at `bar`, `unit` units into the bar.
    ///
    /// Outside a phrase nothing happens until the next bar line.
    pub fn unit(&mut self, bar: i64, unit: i64) {
        if self.total_units <= 0 || self.units_done >= self.total_units || self.units_done < 0 {
            if unit != 0 {
                return;
            }
            self.phrase(bar, unit);
        }

        if self.units_inside_block >= self.units_in_block || self.units_inside_block < 0 {
            self.block(bar, unit);
        }

        self.units_inside_block += 1;
        self.units_done += 1;

        self.hub.on_unit(bar, unit);
    }

    /// Resynchronise the counters with the host position, then run
    /// [`Self::unit`].
    ///
    /// A jump moves both counters by the same amount, which may push them
    /// out of range and force a new phrase or block.
    pub fn set_position(&mut self, bar: i64, unit: i64) {
        let delta = unit - self.units_done % self.subdiv;
        self.units_inside_block += delta;
        self.units_done += delta;
        self.unit(bar, unit);
    }

    /// Forget the current phrase and plan. The next bar line starts over.
    pub fn reset(&mut self) {
        self.units_done = 0;
        self.total_units = 0;
        self.units_in_block = 0;
        self.units_inside_block = 0;
        self.player.reset();
    }

    /// Process one stereo frame through the player.
    #[inline]
    pub fn tick(&mut self, in_l: f32, in_r: f32) -> PlayerOutput {
        self.player.tick(&mut self.hub, in_l, in_r)
    }

    // -------------------------------
    // MARK: Accessors
    // -------------------------------

    /// Units elapsed in the current phrase.
    pub fn unit_position(&self) -> i64 {
        self.units_done
    }

    pub fn total_units(&self) -> i64 {
        self.total_units
    }

    pub fn units_in_block(&self) -> i64 {
        self.units_in_block
    }

    pub fn units_inside_block(&self) -> i64 {
        self.units_inside_block
    }

    pub fn subdiv(&self) -> i64 {
        self.subdiv
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn samples_per_unit(&self) -> f64 {
        self.samples_per_unit
    }

    pub fn player(&self) -> &LiveCutPlayer {
        &self.player
    }

    pub fn regular_repeat(&self) -> &RegularRepeatStrategy {
        &self.regular_repeat
    }

    pub fn tempo_warp(&self) -> &TempoWarpStrategy {
        &self.tempo_warp
    }

    pub fn fill_sequencer(&self) -> &FillSequencerStrategy {
        &self.fill_sequencer
    }
}
