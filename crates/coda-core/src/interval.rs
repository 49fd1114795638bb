//! Millisecond time ranges.

use serde::{Deserialize, Serialize};

/// A closed time range `[onset, offset]` in milliseconds.
///
/// Construction never validates. Inverted or negative intervals are
/// representable so that malformed input can be detected rather than
/// silently repaired; see [`Interval::is_valid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Interval {
    pub onset: i64,
    pub offset: i64,
}

impl Interval {
    pub const fn new(onset: i64, offset: i64) -> Self {
        Self { onset, offset }
    }

    /// `offset - onset`. Negative for inverted intervals.
    pub const fn duration(&self) -> i64 {
        self.offset.saturating_sub(self.onset)
    }

    pub const fn is_inverted(&self) -> bool {
        self.onset > self.offset
    }

    /// Non-inverted and non-negative.
    pub const fn is_valid(&self) -> bool {
        !self.is_inverted() && self.onset >= 0
    }

    pub const fn is_point(&self) -> bool {
        self.onset == self.offset
    }

    /// True iff `onset <= t <= offset`.
    pub const fn spans(&self, t: i64) -> bool {
        self.onset <= t && t <= self.offset
    }

    /// True iff either interval spans an endpoint of the other.
    ///
    /// Touching boundaries count: `[0, 50]` overlaps `[50, 100]`.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.spans(other.onset)
            || self.spans(other.offset)
            || other.spans(self.onset)
            || other.spans(self.offset)
    }

    /// True iff `other` is non-inverted and lies entirely inside `self`.
    pub const fn contains(&self, other: &Self) -> bool {
        !other.is_inverted() && self.onset <= other.onset && other.offset <= self.offset
    }

    /// Mirror of [`Interval::contains`].
    pub const fn within(&self, outer: &Self) -> bool {
        outer.contains(self)
    }

    /// `(max(onsets), min(offsets))`.
    ///
    /// Only meaningful when the intervals overlap; for disjoint inputs the
    /// result is inverted.
    pub fn overlap_region(&self, other: &Self) -> Self {
        Self {
            onset: self.onset.max(other.onset),
            offset: self.offset.min(other.offset),
        }
    }

    /// Number of milliseconds shared by both closed intervals, 0 if disjoint.
    pub fn overlap_ms(&self, other: &Self) -> i64 {
        let region = self.overlap_region(other);
        if region.is_inverted() {
            0
        } else {
            region.duration().saturating_add(1)
        }
    }

    /// Clamps `self` to `outer`. The result is inverted when they are disjoint.
    pub fn clamp_to(&self, outer: &Self) -> Self {
        self.overlap_region(outer)
    }
}

/// Total length covered by the union of `intervals`.
///
/// Inverted intervals are ignored; touching or overlapping ranges are merged
/// before summing.
pub fn union_duration(intervals: &[Interval]) -> i64 {
    let mut sorted: Vec<Interval> = intervals
        .iter()
        .filter(|i| !i.is_inverted())
        .copied()
        .collect();
    if sorted.is_empty() {
        return 0;
    }
    sorted.sort_by_key(|i| i.onset);

    let mut merged: Vec<Interval> = Vec::new();
    for interval in sorted {
        if let Some(last) = merged.last_mut() {
            if interval.onset <= last.offset {
                last.offset = last.offset.max(interval.offset);
            } else {
                merged.push(interval);
            }
        } else {
            merged.push(interval);
        }
    }

    merged.iter().map(Interval::duration).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(onset: i64, offset: i64) -> Interval {
        Interval::new(onset, offset)
    }

    #[test]
    fn test_spans_is_inclusive() {
        let a = iv(10, 20);
        assert!(a.spans(10));
        assert!(a.spans(20));
        assert!(!a.spans(9));
        assert!(!a.spans(21));
    }

    #[test]
    fn test_overlaps_is_symmetric() {
        let cases = [
            (iv(0, 10), iv(5, 15)),
            (iv(0, 10), iv(10, 20)),
            (iv(0, 10), iv(11, 20)),
            (iv(0, 100), iv(20, 30)),
            (iv(5, 5), iv(0, 10)),
            (iv(5, 5), iv(6, 6)),
        ];
        for (a, b) in cases {
            assert_eq!(a.overlaps(&b), b.overlaps(&a), "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn test_touching_boundaries_overlap() {
        assert!(iv(0, 50).overlaps(&iv(50, 100)));
        assert!(!iv(0, 49).overlaps(&iv(50, 100)));
    }

    #[test]
    fn test_nested_interval_overlaps() {
        assert!(iv(0, 100).overlaps(&iv(20, 30)));
        assert!(iv(20, 30).overlaps(&iv(0, 100)));
    }

    #[test]
    fn test_contains_is_reflexive() {
        for a in [iv(0, 0), iv(0, 10), iv(100, 5000)] {
            assert!(a.contains(&a));
        }
    }

    #[test]
    fn test_contains_rejects_inverted_inner() {
        assert!(iv(0, 100).contains(&iv(10, 20)));
        assert!(!iv(0, 100).contains(&iv(20, 10)));
        assert!(!iv(0, 100).contains(&iv(50, 150)));
    }

    #[test]
    fn test_within_mirrors_contains() {
        let outer = iv(0, 100);
        let inner = iv(10, 90);
        assert!(inner.within(&outer));
        assert!(!outer.within(&inner));
    }

    #[test]
    fn test_overlap_region_and_length() {
        let a = iv(0, 100);
        let b = iv(50, 150);
        assert_eq!(a.overlap_region(&b), iv(50, 100));
        assert_eq!(a.overlap_ms(&b), 51);
        assert_eq!(a.overlap_ms(&iv(200, 300)), 0);
        assert_eq!(iv(5, 5).overlap_ms(&iv(0, 10)), 1);
    }

    #[test]
    fn test_validity_checks() {
        assert!(iv(0, 10).is_valid());
        assert!(!iv(10, 0).is_valid());
        assert!(!iv(-5, 10).is_valid());
        assert!(iv(3, 3).is_point());
    }

    #[test]
    fn test_union_duration_merges_overlaps() {
        let intervals = [iv(0, 100), iv(50, 150), iv(200, 250), iv(300, 200)];
        assert_eq!(union_duration(&intervals), 150 + 50);
        assert_eq!(union_duration(&[]), 0);
    }
}
