// src/lib.rs
//
// Library entry point.
//
// Real-time beat slicing: a phrase scheduler picks rhythmic cuts with one
// of three strategies, and a live player replays them against the
// incoming stream.

pub mod config;
pub mod cut;
pub mod delay_line;
pub mod engine;
pub mod error;
pub mod event;
pub mod listener;
pub mod player;
pub mod random;
pub mod scheduler;
pub mod strategy;
pub mod transport;

// Re-export key types for Rust consumers
pub use config::{CutterConfig, SAMPLE_RATE_RANGE, SIGNATURE_RANGE, SUBDIV_OPTIONS, TEMPO_RANGE};
pub use cut::{CutInfo, CutPlan};
pub use delay_line::CircularDelayBuffer;
pub use engine::Engine;
pub use error::{ConfigError, ConfigResult};
pub use event::{CutEvent, EventLog, EventRecorder};
pub use listener::{CutListener, ListenerHub};
pub use player::{LiveCutPlayer, PlayerOutput, MAX_CAPTURE_SAMPLES};
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
pub use scheduler::PhraseScheduler;
pub use strategy::{
    CutStrategy, FillSequencerStrategy, RegularRepeatStrategy, StrategyKind, TempoWarpStrategy,
};
pub use transport::{HostTime, PositionTracker, UnitPosition};
