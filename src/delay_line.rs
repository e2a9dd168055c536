// src/delay_line.rs
//
// Power-of-two circular delay buffer.

/// Mono delay line with a power-of-two capacity.
///
/// Every index is wrapped with `capacity - 1`, so reads and writes never
/// branch on the buffer end.
///
/// Invariants:
/// - `buffer.len()` is a power of two and `mask == buffer.len() - 1`
/// - `write_index` points at the slot the next sample goes into
/// - `0 <= delay <= capacity - 2`
pub struct CircularDelayBuffer {
    buffer: Vec<f32>,
    mask: usize,
    write_index: usize,

    /// Delay in samples, possibly fractional.
    delay: f32,

    last_out: f32,
}

/// `2^(round(log2 size) + 1)`, so the buffer always holds at least `size`
/// samples.
fn capacity_for(size: usize) -> usize {
    let bits = (size.max(1) as f64).log2().round() as u32 + 1;
    1usize << bits
}

impl CircularDelayBuffer {
    pub fn new(delay: f32, size: usize) -> Self {
        let capacity = capacity_for(size);
        let mut line = Self {
            buffer: vec![0.0; capacity],
            mask: capacity - 1,
            write_index: 0,
            delay: 0.0,
            last_out: 0.0,
        };
        line.set_delay(delay);
        line
    }

    /// Reallocate for `size` samples. Clears the contents.
    pub fn resize(&mut self, size: usize) {
        let capacity = capacity_for(size);
        self.buffer.clear();
        self.buffer.resize(capacity, 0.0);
        self.mask = capacity - 1;
        self.write_index = 0;
        self.last_out = 0.0;
        self.set_delay(self.delay);
    }

    /// Clamped to what the buffer can hold.
    pub fn set_delay(&mut self, samples: f32) {
        let max = (self.buffer.len() - 2) as f32;
        self.delay = if samples.is_finite() { samples.clamp(0.0, max) } else { 0.0 };
    }

    pub fn delay(&self) -> f32 {
        self.delay
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn last_out(&self) -> f32 {
        self.last_out
    }

    /// Push one sample.
    #[inline]
    pub fn write(&mut self, x: f32) {
        self.buffer[self.write_index] = x;
        self.write_index = (self.write_index + 1) & self.mask;
    }

    /// Sample written `samples` writes ago. `tap(0)` is the newest.
    #[inline]
    pub fn tap(&self, samples: usize) -> f32 {
        self.buffer[self.write_index.wrapping_sub(1).wrapping_sub(samples) & self.mask]
    }

    /// Linear interpolation between the two neighbouring taps.
    #[inline]
    pub fn tap_fractional(&self, samples: f32) -> f32 {
        let whole = samples.max(0.0).floor();
        let frac = samples.max(0.0) - whole;
        let a = self.tap(whole as usize);
        let b = self.tap(whole as usize + 1);
        a + (b - a) * frac
    }

    /// Read at the configured delay.
    #[inline]
    pub fn read(&mut self) -> f32 {
        self.last_out = self.tap_fractional(self.delay);
        self.last_out
    }

    /// Read at the configured (whole) delay and zero that slot, so a
    /// sample is only ever heard once.
    #[inline]
    pub fn read_erase(&mut self) -> f32 {
        let index = self
            .write_index
            .wrapping_sub(1)
            .wrapping_sub(self.delay as usize)
            & self.mask;
        self.last_out = self.buffer[index];
        self.buffer[index] = 0.0;
        self.last_out
    }

    /// Write then read.
    #[inline]
    pub fn tick(&mut self, x: f32) -> f32 {
        self.write(x);
        self.read()
    }

    /// Mix `x` into the buffer starting `pos` samples after the write index.
    pub fn add_block(&mut self, x: &[f32], pos: usize) {
        for (i, &v) in x.iter().enumerate() {
            let index = (self.write_index + pos + i) & self.mask;
            self.buffer[index] += v;
        }
    }

    /// Overwrite the buffer with `x` starting `pos` samples after the
    /// write index.
    pub fn replace_block(&mut self, x: &[f32], pos: usize) {
        for (i, &v) in x.iter().enumerate() {
            let index = (self.write_index + pos + i) & self.mask;
            self.buffer[index] = v;
        }
    }

    /// Copy `dest.len()` samples starting `pos` samples after the write index.
    pub fn read_block(&self, dest: &mut [f32], pos: usize) {
        for (i, out) in dest.iter_mut().enumerate() {
            *out = self.buffer[(self.write_index + pos + i) & self.mask];
        }
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.last_out = 0.0;
    }
}
