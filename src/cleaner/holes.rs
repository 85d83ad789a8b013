//! Hole maps: the unused sub-ranges of a resource's duration.
//!
//! A resource's hole map starts as one hole spanning the whole payload and
//! shrinks as retained clips are subtracted. Coverage is a set union, so the
//! final map is independent of the order clips are applied in; remainders
//! shorter than the tolerance are discarded at split time.

use std::time::Duration;

/// A half-open `[begin, end)` interval of a resource's duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Start of the interval.
    pub begin: Duration,
    /// End of the interval (exclusive).
    pub end: Duration,
}

impl Span {
    /// Create a span.
    #[must_use]
    pub const fn new(begin: Duration, end: Duration) -> Self {
        Self { begin, end }
    }

    /// The interval's length.
    #[must_use]
    pub fn len(&self) -> Duration {
        self.end.saturating_sub(self.begin)
    }

    /// Whether the interval is degenerate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }
}

/// Ordered set of non-overlapping holes over one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoleMap {
    holes: Vec<Span>,
}

impl HoleMap {
    /// Start with the entire `[0, total)` payload unaccounted for.
    #[must_use]
    pub fn new(total: Duration) -> Self {
        let holes = if total.is_zero() {
            Vec::new()
        } else {
            vec![Span::new(Duration::ZERO, total)]
        };
        Self { holes }
    }

    /// Subtract one clip's coverage.
    ///
    /// A hole fully covered by the clip is dropped; a clip edge strictly
    /// inside a hole splits it, keeping each remainder only if it is at least
    /// `tolerance` long; disjoint holes are untouched. Holes stay sorted and
    /// non-overlapping.
    pub fn subtract(&mut self, begin: Duration, end: Duration, tolerance: Duration) {
        if end <= begin {
            return;
        }
        let mut next = Vec::with_capacity(self.holes.len() + 1);
        for hole in self.holes.drain(..) {
            if end <= hole.begin || begin >= hole.end {
                next.push(hole);
                continue;
            }
            let left = Span::new(hole.begin, begin.min(hole.end));
            if !left.is_empty() && left.len() >= tolerance {
                next.push(left);
            }
            let right = Span::new(end.max(hole.begin), hole.end);
            if !right.is_empty() && right.len() >= tolerance {
                next.push(right);
            }
        }
        self.holes = next;
    }

    /// The remaining holes, in ascending order.
    #[must_use]
    pub fn holes(&self) -> &[Span] {
        &self.holes
    }

    /// Whether every byte of the payload is covered by retained clips.
    #[must_use]
    pub fn is_fully_used(&self) -> bool {
        self.holes.is_empty()
    }

    /// Total unused duration.
    #[must_use]
    pub fn unused(&self) -> Duration {
        self.holes.iter().map(Span::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: Duration = Duration::from_millis(5);

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn spans(pairs: &[(f64, f64)]) -> Vec<Span> {
        pairs.iter().map(|&(b, e)| Span::new(secs(b), secs(e))).collect()
    }

    #[test]
    fn untouched_map_is_one_hole() {
        let map = HoleMap::new(secs(10.0));
        assert_eq!(map.holes(), spans(&[(0.0, 10.0)]).as_slice());
        assert!(!map.is_fully_used());
    }

    #[test]
    fn zero_duration_resource_has_no_holes() {
        let map = HoleMap::new(Duration::ZERO);
        assert!(map.is_fully_used());
    }

    #[test]
    fn interior_clip_splits_hole() {
        let mut map = HoleMap::new(secs(10.0));
        map.subtract(secs(1.0), secs(4.0), TOLERANCE);
        assert_eq!(map.holes(), spans(&[(0.0, 1.0), (4.0, 10.0)]).as_slice());
    }

    #[test]
    fn spec_example_three_holes() {
        // Resource P, 10 s; clip A = [1, 4), clip B = [6, 9).
        let mut map = HoleMap::new(secs(10.0));
        map.subtract(secs(1.0), secs(4.0), TOLERANCE);
        map.subtract(secs(6.0), secs(9.0), TOLERANCE);
        assert_eq!(
            map.holes(),
            spans(&[(0.0, 1.0), (4.0, 6.0), (9.0, 10.0)]).as_slice()
        );
        assert_eq!(map.unused(), secs(4.0));
    }

    #[test]
    fn covering_clip_drops_hole() {
        let mut map = HoleMap::new(secs(10.0));
        map.subtract(Duration::ZERO, secs(10.0), TOLERANCE);
        assert!(map.is_fully_used());
    }

    #[test]
    fn disjoint_clip_leaves_holes_unchanged() {
        let mut map = HoleMap::new(secs(10.0));
        map.subtract(secs(2.0), secs(3.0), TOLERANCE);
        let before = map.holes().to_vec();
        map.subtract(secs(2.0), secs(3.0), TOLERANCE);
        assert_eq!(map.holes(), before.as_slice());
    }

    #[test]
    fn overlapping_clips_union_coverage() {
        let mut map = HoleMap::new(secs(10.0));
        map.subtract(secs(1.0), secs(5.0), TOLERANCE);
        map.subtract(secs(3.0), secs(8.0), TOLERANCE);
        assert_eq!(map.holes(), spans(&[(0.0, 1.0), (8.0, 10.0)]).as_slice());
    }

    #[test]
    fn sub_tolerance_remainder_is_discarded() {
        let mut map = HoleMap::new(secs(10.0));
        // Leaves a 3 ms sliver before the clip start.
        map.subtract(Duration::from_millis(3), secs(10.0), TOLERANCE);
        assert!(map.is_fully_used());
    }

    #[test]
    fn exactly_tolerance_remainder_is_kept() {
        let mut map = HoleMap::new(secs(10.0));
        map.subtract(Duration::from_millis(5), secs(10.0), TOLERANCE);
        assert_eq!(
            map.holes(),
            &[Span::new(Duration::ZERO, Duration::from_millis(5))]
        );
    }

    #[test]
    fn empty_clip_is_ignored() {
        let mut map = HoleMap::new(secs(10.0));
        map.subtract(secs(3.0), secs(3.0), TOLERANCE);
        map.subtract(secs(4.0), secs(2.0), TOLERANCE);
        assert_eq!(map.holes(), spans(&[(0.0, 10.0)]).as_slice());
    }

    /// All permutations of `items` (test sizes are tiny).
    fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head.clone());
                out.push(tail);
            }
        }
        out
    }

    fn apply_all(total: f64, clips: &[(f64, f64)]) -> Vec<Span> {
        let mut map = HoleMap::new(secs(total));
        for &(b, e) in clips {
            map.subtract(secs(b), secs(e), TOLERANCE);
        }
        map.holes().to_vec()
    }

    #[test]
    fn order_independence_disjoint_clips() {
        let clips = [(1.0, 4.0), (6.0, 9.0), (9.5, 10.0)];
        let expected = apply_all(10.0, &clips);
        for perm in permutations(&clips) {
            assert_eq!(apply_all(10.0, &perm), expected, "perm {perm:?}");
        }
    }

    #[test]
    fn order_independence_overlapping_clips() {
        let clips = [(0.0, 3.0), (2.0, 6.0), (5.5, 7.0), (6.9, 8.0)];
        let expected = apply_all(10.0, &clips);
        for perm in permutations(&clips) {
            assert_eq!(apply_all(10.0, &perm), expected, "perm {perm:?}");
        }
    }

    #[test]
    fn order_independence_with_sub_tolerance_gaps() {
        // Clip edges 1 ms apart: the sliver between them must vanish in
        // every processing order.
        let clips = [(0.0, 4.997), (4.998, 10.0), (2.0, 3.0)];
        let expected = apply_all(10.0, &clips);
        assert!(expected.is_empty());
        for perm in permutations(&clips) {
            assert_eq!(apply_all(10.0, &perm), expected, "perm {perm:?}");
        }
    }

    #[test]
    fn order_independence_nested_and_duplicate_clips() {
        let clips = [(1.0, 9.0), (2.0, 3.0), (1.0, 9.0), (0.5, 1.5)];
        let expected = apply_all(10.0, &clips);
        for perm in permutations(&clips) {
            assert_eq!(apply_all(10.0, &perm), expected, "perm {perm:?}");
        }
    }
}
