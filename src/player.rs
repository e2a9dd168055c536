// src/player.rs
//
// Live cut player.
//
// Plays a cut plan against the incoming stream, one sample at a time.
// Input is captured into a block-long buffer as it arrives, and every cut
// of the block reads back from the start of that buffer. The first cut
// therefore hears the live input, later cuts hear what was captured
// while the earlier ones played.

use std::f32::consts::FRAC_PI_2;

use crate::cut::{CutInfo, CutPlan, PLAN_CAPACITY};
use crate::listener::ListenerHub;

/// Pitch offsets smaller than this are treated as no offset.
const CENTS_EPSILON: f32 = 1e-10;

/// Upper bound on the capture and pitch buffers, per channel. Cuts
/// longer than this read silence past the end.
pub const MAX_CAPTURE_SAMPLES: usize = 1 << 22;

//
// ===============================
// MARK: Stereo rotation
// ===============================
//

/// 2x2 gain matrix applied to each stereo frame.
///
/// ```text
/// [ll lr]
/// [rl rr]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PanMatrix {
    pub ll: f32,
    pub lr: f32,
    pub rl: f32,
    pub rr: f32,
}

impl PanMatrix {
    /// Panning left folds the right channel into the left, and vice versa.
    pub fn new(pan: f32, amp: f32) -> Self {
        let (sin, cos) = (pan * FRAC_PI_2).sin_cos();
        Self {
            ll: amp * if pan < 0.0 { 1.0 } else { cos },
            lr: amp * if pan < 0.0 { 0.0 } else { sin },
            rl: amp * if pan > 0.0 { 0.0 } else { -sin },
            rr: amp * if pan > 0.0 { 1.0 } else { cos },
        }
    }

    #[inline]
    pub fn apply(&self, l: f32, r: f32) -> (f32, f32) {
        (self.ll * l + self.rl * r, self.lr * l + self.rr * r)
    }
}

/// Exponential fade in and out over `fade` samples at each end of a
/// cut `end` samples long.
#[inline]
pub fn exp_envelope(i: f32, fade: f32, end: f32) -> f32 {
    (1.0 - (-5.0 * i / fade).exp()) * (1.0 - (5.0 * (i - end) / fade).exp())
}

//
// ===============================
// MARK: Player
// ===============================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadSource {
    Capture,
    Pitched,
}

/// One output frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerOutput {
    pub left: f32,
    pub right: f32,

    /// A new cut started on this sample.
    pub cut_started: bool,
}

impl PlayerOutput {
    #[inline]
    fn silence() -> Self {
        Self::default()
    }
}

/// Sample-accurate executor of cut plans.
///
/// Invariants:
/// - capture and pitch buffers are resized only in `on_block`, and
///   never past [`MAX_CAPTURE_SAMPLES`]
/// - `read_index < cuts[current_cut].size` between ticks
/// - no allocation in `tick`
pub struct LiveCutPlayer {
    cuts: Vec<CutInfo>,
    current_cut: usize,

    /// Write cursor into the capture buffers. Monotonic across the block.
    input_index: usize,

    /// Read cursor inside the current cut.
    read_index: usize,

    matrix: PanMatrix,

    /// Fade length in samples, at least one.
    fade: f32,

    capture_l: Vec<f32>,
    capture_r: Vec<f32>,
    pitched_l: Vec<f32>,
    pitched_r: Vec<f32>,
    source: ReadSource,
}

impl Default for LiveCutPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveCutPlayer {
    pub fn new() -> Self {
        Self {
            cuts: Vec::with_capacity(PLAN_CAPACITY),
            current_cut: 0,
            input_index: 0,
            read_index: 0,
            matrix: PanMatrix::default(),
            fade: 1.0,
            capture_l: Vec::new(),
            capture_r: Vec::new(),
            pitched_l: Vec::new(),
            pitched_r: Vec::new(),
            source: ReadSource::Capture,
        }
    }

    /// Fade length in samples. Values below one sample are raised to one.
    pub fn set_fade(&mut self, samples: f32) {
        self.fade = if samples.is_finite() { samples.max(1.0) } else { 1.0 };
    }

    pub fn fade(&self) -> f32 {
        self.fade
    }

    /// Make sure no cut up to `max_cut_samples` long makes `on_block` allocate.
    ///
    /// Requests above [`MAX_CAPTURE_SAMPLES`] are capped.
    pub fn reserve(&mut self, max_cut_samples: usize) {
        let max_cut_samples = max_cut_samples.min(MAX_CAPTURE_SAMPLES);
        for buffer in [
            &mut self.capture_l,
            &mut self.capture_r,
            &mut self.pitched_l,
            &mut self.pitched_r,
        ] {
            if buffer.capacity() < max_cut_samples {
                buffer.reserve(max_cut_samples - buffer.len());
            }
        }
    }

    /// Install a new plan. Empty plans are ignored and the current one
    /// keeps playing.
    pub fn on_block(&mut self, plan: &CutPlan, hub: &mut ListenerHub) {
        if plan.is_empty() {
            return;
        }

        self.cuts.clear();
        self.cuts.extend_from_slice(plan.cuts());

        let first = self.cuts[0];
        self.matrix = PanMatrix::new(first.pan, first.amp);
        self.input_index = 0;
        self.read_index = 0;
        self.current_cut = 0;

        hub.on_cut(0, self.cuts.len());

        let max_cut = plan.max_size().min(MAX_CAPTURE_SAMPLES);
        for buffer in [
            &mut self.capture_l,
            &mut self.capture_r,
            &mut self.pitched_l,
            &mut self.pitched_r,
        ] {
            buffer.clear();
            buffer.resize(max_cut, 0.0);
        }
        self.source = ReadSource::Capture;
    }

    /// Process one input frame.
    ///
    /// `cut_started` is false when no cut boundary was crossed, including
    /// once the plan is exhausted (the output is then silence).
    pub fn tick(&mut self, hub: &mut ListenerHub, in_l: f32, in_r: f32) -> PlayerOutput {
        let Some(&cut) = self.cuts.get(self.current_cut) else {
            return PlayerOutput::silence();
        };

        if self.input_index < self.capture_l.len() {
            self.capture_l[self.input_index] = in_l;
            self.capture_r[self.input_index] = in_r;
            self.input_index += 1;
        }

        let mut out = PlayerOutput::silence();
        if self.read_index < cut.length {
            let (l, r) = self.read(self.read_index);
            let env = exp_envelope(self.read_index as f32, self.fade, cut.length.max(1) as f32);
            let (ol, or) = self.matrix.apply(l, r);
            out.left = env * ol;
            out.right = env * or;
        }
        self.read_index += 1;

        if self.read_index >= cut.size {
            self.current_cut += 1;
            self.read_index = 0;

            let Some(&next) = self.cuts.get(self.current_cut) else {
                return PlayerOutput::silence();
            };

            self.matrix = PanMatrix::new(next.pan, next.amp);
            if next.cents.abs() > CENTS_EPSILON {
                self.pitch_shift(next.cents);
            }

            hub.on_cut(self.current_cut, self.cuts.len());
            out.cut_started = true;
        }

        out
    }

    /// Forget the current plan. Output is silent until the next block.
    pub fn reset(&mut self) {
        self.cuts.clear();
        self.current_cut = 0;
        self.input_index = 0;
        self.read_index = 0;
        self.source = ReadSource::Capture;
    }

    /// Whether a cut is playing.
    pub fn is_active(&self) -> bool {
        self.current_cut < self.cuts.len()
    }

    pub fn current_cut(&self) -> usize {
        self.current_cut
    }

    pub fn num_cuts(&self) -> usize {
        self.cuts.len()
    }

    /// Length of the capture buffers for the current block.
    pub fn capture_len(&self) -> usize {
        self.capture_l.len()
    }

    #[inline]
    fn read(&self, index: usize) -> (f32, f32) {
        let (l, r) = match self.source {
            ReadSource::Capture => (&self.capture_l, &self.capture_r),
            ReadSource::Pitched => (&self.pitched_l, &self.pitched_r),
        };
        (
            l.get(index).copied().unwrap_or(0.0),
            r.get(index).copied().unwrap_or(0.0),
        )
    }

    /// Resample the whole capture buffer by `2^(cents/1200)` into the
    /// pitch buffers and read from those from now on.
    ///
    /// The output length is capped so interpolation never reads past
    /// the end of the capture buffer.
    fn pitch_shift(&mut self, cents: f32) {
        let ratio = 2.0_f64.powf(cents as f64 / 1200.0);
        let capture_len = self.capture_l.len();
        let limit = ((capture_len as f64 / ratio) as i64 - 1).max(0) as usize;
        let count = self.pitched_l.len().min(limit);

        for i in 0..count {
            let x = i as f64 * ratio;
            let pos = x as usize;
            let next = (pos + 1).min(capture_len - 1);
            let frac = (x - pos as f64) as f32;
            self.pitched_l[i] = self.capture_l[pos] * (1.0 - frac) + self.capture_l[next] * frac;
            self.pitched_r[i] = self.capture_r[pos] * (1.0 - frac) + self.capture_r[next] * frac;
        }

        self.source = ReadSource::Pitched;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CutEvent, EventRecorder};
    use approx::assert_abs_diff_eq;

    fn plan(cuts: &[CutInfo]) -> CutPlan {
        CutPlan::from(cuts.to_vec())
    }

    #[test]
    fn test_empty_plan_outputs_silence() {
        let mut player = LiveCutPlayer::new();
        let mut hub = ListenerHub::new();
        player.on_block(&CutPlan::new(), &mut hub);

        for _ in 0..64 {
            let out = player.tick(&mut hub, 0.7, -0.3);
            assert!(!out.cut_started);
            assert_eq!(out.left, 0.0);
            assert_eq!(out.right, 0.0);
        }
    }

    #[test]
    fn test_pan_matrix() {
        let centre = PanMatrix::new(0.0, 1.0);
        assert_abs_diff_eq!(centre.ll, 1.0);
        assert_abs_diff_eq!(centre.rr, 1.0);
        assert_abs_diff_eq!(centre.lr, 0.0);
        assert_abs_diff_eq!(centre.rl, 0.0);

        let (l, r) = PanMatrix::new(1.0, 1.0).apply(0.5, 0.25);
        assert_abs_diff_eq!(l, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(r, 0.75, epsilon = 1e-6);

        let (l, r) = PanMatrix::new(-1.0, 0.5).apply(0.5, 0.25);
        assert_abs_diff_eq!(l, 0.375, epsilon = 1e-6);
        assert_abs_diff_eq!(r, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_envelope_shape() {
        assert_eq!(exp_envelope(0.0, 10.0, 100.0), 0.0);
        assert_abs_diff_eq!(exp_envelope(50.0, 10.0, 100.0), 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(exp_envelope(100.0, 10.0, 100.0), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_fade_clamped_to_one_sample() {
        let mut player = LiveCutPlayer::new();
        player.set_fade(0.0);
        assert_eq!(player.fade(), 1.0);
        player.set_fade(f32::NAN);
        assert_eq!(player.fade(), 1.0);
        player.set_fade(32.0);
        assert_eq!(player.fade(), 32.0);
    }

    #[test]
    fn test_first_cut_passes_input_through() {
        let mut player = LiveCutPlayer::new();
        let mut hub = ListenerHub::new();
        player.on_block(&plan(&[CutInfo::new(200, 200)]), &mut hub);

        let mut outputs = Vec::new();
        for _ in 0..200 {
            outputs.push(player.tick(&mut hub, 0.5, -0.5));
        }
        assert_abs_diff_eq!(outputs[100].left, 0.5, epsilon = 1e-3);
        assert_abs_diff_eq!(outputs[100].right, -0.5, epsilon = 1e-3);
        assert!(!player.is_active());
    }

    #[test]
    fn test_second_cut_replays_capture() {
        let mut player = LiveCutPlayer::new();
        let mut hub = ListenerHub::new();
        player.on_block(&plan(&[CutInfo::new(100, 100), CutInfo::new(100, 100)]), &mut hub);
        assert_eq!(player.capture_len(), 100);

        for n in 0..100 {
            player.tick(&mut hub, n as f32, 0.0);
        }
        // fresh input is ignored once the capture buffer is full
        let mut replay = Vec::new();
        for _ in 0..100 {
            replay.push(player.tick(&mut hub, -99.0, 0.0).left);
        }
        assert_abs_diff_eq!(replay[50], 50.0, epsilon = 0.01);
        assert_abs_diff_eq!(replay[20], 20.0, epsilon = 0.01);
    }

    #[test]
    fn test_duty_cycle_gates_tail() {
        let mut player = LiveCutPlayer::new();
        let mut hub = ListenerHub::new();
        player.on_block(&plan(&[CutInfo::new(100, 40)]), &mut hub);

        for i in 0..100 {
            let out = player.tick(&mut hub, 1.0, 1.0);
            if i >= 40 {
                assert_eq!(out.left, 0.0);
            }
        }
    }

    #[test]
    fn test_cut_events() {
        let (recorder, log) = EventRecorder::new(64);
        let mut hub = ListenerHub::new();
        hub.register(Box::new(recorder));

        let mut player = LiveCutPlayer::new();
        player.on_block(
            &plan(&[CutInfo::new(10, 10), CutInfo::new(5, 5), CutInfo::new(8, 8)]),
            &mut hub,
        );

        let mut boundaries = 0;
        for _ in 0..40 {
            if player.tick(&mut hub, 0.0, 0.0).cut_started {
                boundaries += 1;
            }
        }

        assert_eq!(boundaries, 2);
        assert_eq!(
            log.snapshot(),
            vec![
                CutEvent::Cut { cut: 0, num_cuts: 3 },
                CutEvent::Cut { cut: 1, num_cuts: 3 },
                CutEvent::Cut { cut: 2, num_cuts: 3 },
            ]
        );
    }

    #[test]
    fn test_octave_up_halves_zero_crossing_spacing() {
        const N: usize = 1000;
        const PERIOD: f32 = 100.0;

        let mut player = LiveCutPlayer::new();
        let mut hub = ListenerHub::new();
        player.set_fade(1.0);
        player.on_block(
            &plan(&[CutInfo::new(N, N), CutInfo::new(N, N).with_cents(1200.0)]),
            &mut hub,
        );

        let sine = |n: usize| (2.0 * std::f32::consts::PI * n as f32 / PERIOD + 0.3).sin();
        for n in 0..N {
            player.tick(&mut hub, sine(n), sine(n));
        }

        let shifted: Vec<f32> = (0..N / 2 - 1).map(|_| player.tick(&mut hub, 0.0, 0.0).left).collect();
        let crossings: Vec<usize> = (2..shifted.len())
            .filter(|&i| shifted[i - 1] * shifted[i] < 0.0)
            .collect();

        assert!(crossings.len() >= 15);
        for pair in crossings.windows(2) {
            let spacing = pair[1] - pair[0];
            assert!((24..=26).contains(&spacing), "spacing {}", spacing);
        }
    }

    #[test]
    fn test_extreme_pitch_stays_in_bounds() {
        for cents in [2400.0, -2400.0, 4800.0] {
            for size in [1, 2, 3, 17] {
                let mut player = LiveCutPlayer::new();
                let mut hub = ListenerHub::new();
                player.on_block(
                    &plan(&[
                        CutInfo::new(size, size),
                        CutInfo::new(size, size).with_cents(cents),
                        CutInfo::new(size, size).with_cents(cents),
                    ]),
                    &mut hub,
                );
                for n in 0..size * 4 {
                    let out = player.tick(&mut hub, n as f32, 1.0);
                    assert!(out.left.is_finite());
                }
            }
        }
    }

    #[test]
    fn test_reserve_then_block_keeps_capacity() {
        let mut player = LiveCutPlayer::new();
        let mut hub = ListenerHub::new();
        player.reserve(4096);
        let before = player.capture_l.capacity();
        player.on_block(&plan(&[CutInfo::new(4000, 4000)]), &mut hub);
        assert_eq!(player.capture_l.capacity(), before);
        assert_eq!(player.capture_len(), 4000);
    }

    #[test]
    fn test_oversized_cut_is_capped() {
        let mut player = LiveCutPlayer::new();
        let mut hub = ListenerHub::new();
        player.reserve(usize::MAX);
        assert!(player.capture_l.capacity() <= 2 * MAX_CAPTURE_SAMPLES);

        player.on_block(&plan(&[CutInfo::new(usize::MAX, usize::MAX)]), &mut hub);
        assert_eq!(player.capture_len(), MAX_CAPTURE_SAMPLES);
        for _ in 0..256 {
            let out = player.tick(&mut hub, 0.5, 0.5);
            assert!(out.left.is_finite() && out.right.is_finite());
        }
    }
}
