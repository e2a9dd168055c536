// src/engine.rs

use crate::config::CutterConfig;
use crate::error::ConfigResult;
use crate::listener::CutListener;
use crate::scheduler::PhraseScheduler;
use crate::transport::{HostTime, PositionTracker};

/// Real-time beat-slicing engine.
///
/// This struct runs exclusively on the audio thread.
/// Each block it takes the host clock, detects unit boundaries sample
/// by sample, drives the scheduler and renders the player's output.
pub struct Engine {
    /// Phrase/block/unit state machine, owning the player
    scheduler: PhraseScheduler,

    /// Host clock to unit boundaries
    tracker: PositionTracker,
}

impl Engine {
    pub fn new(config: &CutterConfig) -> ConfigResult<Self> {
        Ok(Self {
            scheduler: PhraseScheduler::with_config(config)?,
            tracker: PositionTracker::new(),
        })
    }

    /// Process one block of planar stereo audio.
    ///
    /// Frames beyond the shortest input are written as silence. Fails
    /// only when the host timing is unusable, in which case the output is
    /// left untouched.
    pub fn process(
        &mut self,
        time: &HostTime,
        in_l: &[f32],
        in_r: &[f32],
        out_l: &mut [f32],
        out_r: &mut [f32],
    ) -> ConfigResult<()> {
        self.scheduler
            .set_time_infos(time.bpm, time.numerator, time.denominator, time.sample_rate)?;
        self.tracker.begin_block(time, self.scheduler.subdiv());

        let frames = in_l.len().min(in_r.len()).min(out_l.len()).min(out_r.len());

        for i in 0..frames {
            if let Some(position) = self.tracker.advance() {
                self.scheduler.set_position(position.bar, position.unit);
            }

            let out = self.scheduler.tick(in_l[i], in_r[i]);
            out_l[i] = out.left;
            out_r[i] = out.right;
        }

        out_l[frames..].fill(0.0);
        out_r[frames..].fill(0.0);

        Ok(())
    }

    pub fn register_listener(&mut self, listener: Box<dyn CutListener>) {
        self.scheduler.register_listener(listener);
    }

    /// Apply a new configuration between blocks.
    pub fn apply_config(&mut self, config: &CutterConfig) -> ConfigResult<()> {
        self.scheduler.apply_config(config)
    }

    /// Reset the engine (on transport stop/seek)
    pub fn reset(&mut self) {
        self.scheduler.reset();
        self.tracker.reset();
    }

    pub fn scheduler(&self) -> &PhraseScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut PhraseScheduler {
        &mut self.scheduler
    }
}
