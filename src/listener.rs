// src/listener.rs
//
// Musical-time notifications.
//
// The scheduler announces phrases, blocks and units. The player
// announces cuts. Anything that wants to follow the cutting (bit
// crushers, comb filters, meters) registers a listener with the hub.

/// Observer of the four musical-time events.
///
/// Every method has an empty default so listeners only implement what
/// they care about. Called on the audio thread: implementations must not
/// block or allocate.
pub trait CutListener: Send {
    /// A new phrase starts at `bar`, `unit` units into the bar.
    fn on_phrase(&mut self, _bar: i64, _unit: i64) {}

    /// A new block of cuts was scheduled.
    fn on_block(&mut self, _bar: i64, _unit: i64) {}

    /// One unit elapsed.
    fn on_unit(&mut self, _bar: i64, _unit: i64) {}

    /// Cut `cut` of `num_cuts` starts playing.
    fn on_cut(&mut self, _cut: usize, _num_cuts: usize) {}
}

/// Broadcasts events to every registered listener, in registration order.
#[derive(Default)]
pub struct ListenerHub {
    listeners: Vec<Box<dyn CutListener>>,
}

impl ListenerHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Box<dyn CutListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn on_phrase(&mut self, bar: i64, unit: i64) {
        for listener in &mut self.listeners {
            listener.on_phrase(bar, unit);
        }
    }

    pub fn on_block(&mut self, bar: i64, unit: i64) {
        for listener in &mut self.listeners {
            listener.on_block(bar, unit);
        }
    }

    pub fn on_unit(&mut self, bar: i64, unit: i64) {
        for listener in &mut self.listeners {
            listener.on_unit(bar, unit);
        }
    }

    pub fn on_cut(&mut self, cut: usize, num_cuts: usize) {
        for listener in &mut self.listeners {
            listener.on_cut(cut, num_cuts);
        }
    }
}
