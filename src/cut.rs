// src/cut.rs
//
// Cut descriptors and the per-block plan a strategy produces.

//
// ===============================
// MARK: Cut descriptor
// ===============================
//

/// One fragment of a block.
///
/// Invariants:
/// - `length <= size`
/// - `size` is the number of samples the cut occupies
/// - `length` is the audible part, the rest is silence (duty cycle)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutInfo {
    /// Total samples occupied by the cut.
    pub size: usize,

    /// Samples actually played before gating to silence.
    pub length: usize,

    /// Stereo position, -1 (left) to +1 (right).
    pub pan: f32,

    /// Gain multiplier.
    pub amp: f32,

    /// Pitch offset in cents.
    pub cents: f32,
}

impl Default for CutInfo {
    fn default() -> Self {
        Self {
            size: 0,
            length: 0,
            pan: 0.0,
            amp: 1.0,
            cents: 0.0,
        }
    }
}

impl CutInfo {
    /// A cut of `size` samples, audible for `length` of them.
    ///
    /// `length` is clamped to `size`.
    #[inline]
    pub fn new(size: usize, length: usize) -> Self {
        Self {
            size,
            length: length.min(size),
            ..Self::default()
        }
    }

    #[inline]
    pub fn with_pan(mut self, pan: f32) -> Self {
        self.pan = pan;
        self
    }

    #[inline]
    pub fn with_amp(mut self, amp: f32) -> Self {
        self.amp = amp;
        self
    }

    #[inline]
    pub fn with_cents(mut self, cents: f32) -> Self {
        self.cents = cents;
        self
    }
}

/// Cuts a plan may hold without growing its storage.
pub const PLAN_CAPACITY: usize = 256;

/// Convert a fractional sample count to a cut size, truncating toward zero.
#[inline]
pub(crate) fn samples(value: f64) -> usize {
    if value.is_finite() && value > 0.0 {
        value as usize
    } else {
        0
    }
}

//
// ===============================
// MARK: Cut plan
// ===============================
//

/// Ordered cuts covering one block. Insertion order is playback order.
///
/// The scheduler keeps one plan around and refills it every block, so
/// the backing storage is reused rather than reallocated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CutPlan {
    cuts: Vec<CutInfo>,
}

impl CutPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cuts: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.cuts.clear();
    }

    #[inline]
    pub fn push(&mut self, cut: CutInfo) {
        self.cuts.push(cut);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    #[inline]
    pub fn cuts(&self) -> &[CutInfo] {
        &self.cuts
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&CutInfo> {
        self.cuts.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CutInfo> {
        self.cuts.iter()
    }

    /// Reverse playback order in place.
    pub fn reverse(&mut self) {
        self.cuts.reverse();
    }

    /// Sum of all cut sizes, in samples.
    pub fn total_size(&self) -> usize {
        self.cuts.iter().map(|c| c.size).sum()
    }

    /// Size of the longest single cut, in samples.
    pub fn max_size(&self) -> usize {
        self.cuts.iter().map(|c| c.size).max().unwrap_or(0)
    }
}

impl From<Vec<CutInfo>> for CutPlan {
    fn from(cuts: Vec<CutInfo>) -> Self {
        Self { cuts }
    }
}

impl<'a> IntoIterator for &'a CutPlan {
    type Item = &'a CutInfo;
    type IntoIter = std::slice::Iter<'a, CutInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.cuts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_clamped_to_size() {
        let cut = CutInfo::new(100, 250);
        assert_eq!(cut.length, 100);
    }

    #[test]
    fn test_plan_sizes() {
        let plan = CutPlan::from(vec![
            CutInfo::new(100, 100),
            CutInfo::new(300, 150),
            CutInfo::new(50, 0),
        ]);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.total_size(), 450);
        assert_eq!(plan.max_size(), 300);
        assert_eq!(CutPlan::new().max_size(), 0);
    }

    #[test]
    fn test_samples_truncates_and_rejects_garbage() {
        assert_eq!(samples(10.9), 10);
        assert_eq!(samples(-3.0), 0);
        assert_eq!(samples(f64::NAN), 0);
    }
}
