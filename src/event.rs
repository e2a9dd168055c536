// src/event.rs
//
// Recorded musical-time events, for diagnostics and tests.

use std::sync::{Arc, Mutex};

use crate::listener::CutListener;

/// One notification delivered through the listener hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutEvent {
    Phrase { bar: i64, unit: i64 },

    Block { bar: i64, unit: i64 },

    Unit { bar: i64, unit: i64 },

    Cut { cut: usize, num_cuts: usize },
}

impl CutEvent {
    pub fn is_phrase(&self) -> bool {
        matches!(self, CutEvent::Phrase { .. })
    }

    pub fn is_block(&self) -> bool {
        matches!(self, CutEvent::Block { .. })
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, CutEvent::Unit { .. })
    }

    pub fn is_cut(&self) -> bool {
        matches!(self, CutEvent::Cut { .. })
    }
}

/// Shared view of what an [`EventRecorder`] has captured.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<CutEvent>>>,
}

impl EventLog {
    /// Copy of every event recorded so far.
    pub fn snapshot(&self) -> Vec<CutEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Remove and return every event recorded so far.
    pub fn drain(&self) -> Vec<CutEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }

    pub fn count(&self, predicate: impl Fn(&CutEvent) -> bool) -> usize {
        self.events
            .lock()
            .map(|e| e.iter().filter(|ev| predicate(ev)).count())
            .unwrap_or(0)
    }
}

/// Listener that appends every event to an [`EventLog`].
///
/// Stops recording once `capacity` events are held, so a forgotten
/// recorder cannot grow without bound. Takes a lock per event: meant for
/// offline rendering and tests, not a live audio thread.
pub struct EventRecorder {
    log: EventLog,
    capacity: usize,
}

impl EventRecorder {
    pub fn new(capacity: usize) -> (Self, EventLog) {
        let log = EventLog {
            events: Arc::new(Mutex::new(Vec::with_capacity(capacity.min(4096)))),
        };
        (
            Self {
                log: log.clone(),
                capacity,
            },
            log,
        )
    }

    fn record(&mut self, event: CutEvent) {
        if let Ok(mut events) = self.log.events.lock() {
            if events.len() < self.capacity {
                events.push(event);
            }
        }
    }
}

impl CutListener for EventRecorder {
    fn on_phrase(&mut self, bar: i64, unit: i64) {
        self.record(CutEvent::Phrase { bar, unit });
    }

    fn on_block(&mut self, bar: i64, unit: i64) {
        self.record(CutEvent::Block { bar, unit });
    }

    fn on_unit(&mut self, bar: i64, unit: i64) {
        self.record(CutEvent::Unit { bar, unit });
    }

    fn on_cut(&mut self, cut: usize, num_cuts: usize) {
        self.record(CutEvent::Cut { cut, num_cuts });
    }
}
