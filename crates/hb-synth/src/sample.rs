//! Clamped additive mixing of 16-bit samples.

/// Outcome of mixing a waveform into a region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MixReport {
    /// Number of samples whose sum left the i16 range and was clamped.
    pub clamped: usize,
}

impl MixReport {
    /// Fold another report into this one.
    pub fn merge(&mut self, other: MixReport) {
        self.clamped += other.clamped;
    }
}

/// Add `value` to `dst`, clamping to the i16 range.
///
/// Returns `true` when the sum had to be clamped.
#[inline]
pub fn mix_into(dst: &mut i16, value: i64) -> bool {
    // Widen to i64 so any scaled i32 volume fits, then clamp
    let sum = *dst as i64 + value;
    let clamped = sum.clamp(i16::MIN as i64, i16::MAX as i64);
    *dst = clamped as i16;
    clamped != sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_within_range() {
        let mut s = 100i16;
        assert!(!mix_into(&mut s, -250));
        assert_eq!(s, -150);
    }

    #[test]
    fn clamps_positive_overflow() {
        let mut s = 30_000i16;
        assert!(mix_into(&mut s, 16_000));
        assert_eq!(s, i16::MAX);
    }

    #[test]
    fn clamps_negative_overflow() {
        let mut s = -30_000i16;
        assert!(mix_into(&mut s, -16_000));
        assert_eq!(s, i16::MIN);
    }

    #[test]
    fn extreme_values_saturate() {
        let mut s = -100i16;
        assert!(mix_into(&mut s, i32::MAX as i64 * 2));
        assert_eq!(s, i16::MAX);
        assert!(mix_into(&mut s, i32::MIN as i64 * 2));
        assert_eq!(s, i16::MIN);
    }

    #[test]
    fn merge_sums_counts() {
        let mut a = MixReport { clamped: 2 };
        a.merge(MixReport { clamped: 3 });
        assert_eq!(a.clamped, 5);
    }
}
