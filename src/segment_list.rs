//! Normalized half-open interval lists on a single contig.
//!
//! A [`SegmentList`] holds a set of `[start, end)` intervals on one contig
//! that is kept sorted, non-overlapping and non-adjacent ("normalized") on
//! every read. Mutation is deferred: `add` may leave the list unnormalized,
//! and the next read re-sorts and merges. This matches the dirty-on-write,
//! clean-on-read discipline described for C1.

use rand::Rng;
use std::cmp::Ordering;

/// A single half-open interval `[start, end)` with `start < end`.
pub type Span = (u64, u64);

#[derive(Debug, Clone, Default)]
pub struct SegmentList {
    spans: Vec<Span>,
    dirty: bool,
}

impl SegmentList {
    pub fn new() -> Self {
        Self {
            spans: Vec::new(),
            dirty: false,
        }
    }

    pub fn from_spans(spans: Vec<Span>) -> Self {
        let mut s = Self { spans, dirty: true };
        s.normalize();
        s
    }

    /// Append an interval. Normalization is deferred.
    pub fn add(&mut self, start: u64, end: u64) {
        if start >= end {
            return;
        }
        self.spans.push((start, end));
        self.dirty = true;
    }

    /// Sort, merge overlapping/adjacent intervals, drop empties. Idempotent.
    pub fn normalize(&mut self) {
        if !self.dirty {
            return;
        }
        self.spans.retain(|&(s, e)| s < e);
        self.spans
            .sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut merged: Vec<Span> = Vec::with_capacity(self.spans.len());
        for &(start, end) in &self.spans {
            match merged.last_mut() {
                Some(last) if start <= last.1 => {
                    last.1 = last.1.max(end);
                }
                _ => merged.push((start, end)),
            }
        }
        self.spans = merged;
        self.dirty = false;
    }

    /// Ensure normalization before a read, without requiring `&mut self` at
    /// every call site upstream; intended for internal use only.
    fn ensure_normalized(&mut self) {
        self.normalize();
    }

    /// Component intervals, normalized.
    pub fn spans(&mut self) -> &[Span] {
        self.ensure_normalized();
        &self.spans
    }

    pub fn into_spans(mut self) -> Vec<Span> {
        self.ensure_normalized();
        self.spans
    }

    #[inline]
    pub fn counts(&mut self) -> usize {
        self.spans().len()
    }

    #[inline]
    pub fn sum(&mut self) -> u64 {
        self.spans().iter().map(|(s, e)| e - s).sum()
    }

    #[inline]
    pub fn is_empty(&mut self) -> bool {
        self.counts() == 0
    }

    /// The length multiset of all component intervals.
    pub fn as_lengths(&mut self) -> Vec<u64> {
        self.spans().iter().map(|(s, e)| e - s).collect()
    }

    /// Classical sorted-merge intersection of two normalized lists.
    pub fn intersect(&mut self, other: &mut SegmentList) -> SegmentList {
        let a = self.spans();
        let b = other.spans();
        let mut result = Vec::new();
        let (mut i, mut j) = (0usize, 0usize);
        while i < a.len() && j < b.len() {
            let (a_s, a_e) = a[i];
            let (b_s, b_e) = b[j];
            let lo = a_s.max(b_s);
            let hi = a_e.min(b_e);
            if lo < hi {
                result.push((lo, hi));
            }
            if a_e < b_e {
                i += 1;
            } else {
                j += 1;
            }
        }
        SegmentList::from_spans(result)
    }

    /// Remove all positions covered by `other` from `self`.
    pub fn subtract(&mut self, other: &mut SegmentList) -> SegmentList {
        let a = self.spans().to_vec();
        let b = other.spans();
        let mut result = Vec::with_capacity(a.len());
        let mut j = 0usize;
        for (mut start, end) in a {
            while j < b.len() && b[j].1 <= start {
                j += 1;
            }
            let mut k = j;
            while k < b.len() && b[k].0 < end {
                let (b_s, b_e) = b[k];
                if b_s > start {
                    result.push((start, b_s.min(end)));
                }
                start = start.max(b_e);
                if start >= end {
                    break;
                }
                k += 1;
            }
            if start < end {
                result.push((start, end));
            }
        }
        SegmentList::from_spans(result)
    }

    /// Union of two normalized lists.
    pub fn union(&mut self, other: &mut SegmentList) -> SegmentList {
        let mut spans = self.spans().to_vec();
        spans.extend_from_slice(other.spans());
        SegmentList::from_spans(spans)
    }

    /// Total base-pair overlap with `other`.
    pub fn overlap_with(&mut self, other: &mut SegmentList) -> u64 {
        let a = self.spans();
        let b = other.spans();
        let mut total = 0u64;
        let (mut i, mut j) = (0usize, 0usize);
        while i < a.len() && j < b.len() {
            let (a_s, a_e) = a[i];
            let (b_s, b_e) = b[j];
            let lo = a_s.max(b_s);
            let hi = a_e.min(b_e);
            if lo < hi {
                total += hi - lo;
            }
            if a_e < b_e {
                i += 1;
            } else {
                j += 1;
            }
        }
        total
    }

    /// Number of intervals in `self` touching at least one interval of `other`.
    pub fn segments_touching(&mut self, other: &mut SegmentList) -> usize {
        let a = self.spans().to_vec();
        let b = other.spans();
        let mut count = 0usize;
        let mut j = 0usize;
        for (a_s, a_e) in a {
            while j < b.len() && b[j].1 <= a_s {
                j += 1;
            }
            if j < b.len() && b[j].0 < a_e {
                count += 1;
            }
        }
        count
    }

    pub fn shift(&mut self, offset: i64) {
        let spans = self.spans().to_vec();
        self.spans = spans
            .into_iter()
            .map(|(s, e)| {
                (
                    (s as i64 + offset).max(0) as u64,
                    (e as i64 + offset).max(0) as u64,
                )
            })
            .collect();
        self.dirty = true;
        self.normalize();
    }

    pub fn extend(&mut self, left: u64, right: u64) {
        let spans = self.spans().to_vec();
        self.spans = spans
            .into_iter()
            .map(|(s, e)| (s.saturating_sub(left), e + right))
            .collect();
        self.dirty = true;
        self.normalize();
    }

    pub fn filter(&mut self, min_len: Option<u64>, max_len: Option<u64>) {
        let spans = self.spans().to_vec();
        self.spans = spans
            .into_iter()
            .filter(|(s, e)| {
                let len = e - s;
                min_len.map_or(true, |m| len >= m) && max_len.map_or(true, |m| len <= m)
            })
            .collect();
        self.dirty = false;
    }

    /// Draw a uniformly random start such that `[start, start+length)` lies
    /// entirely within some component interval. Preconditions: non-empty,
    /// and `length` is at most the length of some component interval.
    pub fn sample_uniform_position_within<R: Rng + ?Sized>(
        &mut self,
        length: u64,
        rng: &mut R,
    ) -> Option<u64> {
        let spans = self.spans();
        // admissible start range per component: [a, b - length + 1)
        let mut weights: Vec<u64> = Vec::with_capacity(spans.len());
        let mut total = 0u64;
        for &(a, b) in spans {
            let width = if b - a >= length { (b - a) - length + 1 } else { 0 };
            weights.push(width);
            total += width;
        }
        if total == 0 {
            return None;
        }
        let mut pick = rng.gen_range(0..total);
        for (idx, &(a, _)) in spans.iter().enumerate() {
            if pick < weights[idx] {
                return Some(a + pick);
            }
            pick -= weights[idx];
        }
        unreachable!("admissible weight accounting is exhaustive")
    }

    pub fn clone_normalized(&mut self) -> SegmentList {
        SegmentList::from_spans(self.spans().to_vec())
    }
}

impl PartialEq for SegmentList {
    fn eq(&self, other: &Self) -> bool {
        let mut a = self.clone();
        let mut b = other.clone();
        a.spans() == b.spans()
    }
}

impl Eq for SegmentList {}

impl Ord for SegmentList {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut a = self.clone();
        let mut b = other.clone();
        a.spans().cmp(b.spans())
    }
}

impl PartialOrd for SegmentList {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn normalize_is_idempotent_and_merges_adjacent() {
        let mut s = SegmentList::new();
        s.add(10, 20);
        s.add(20, 30);
        s.add(5, 8);
        s.add(15, 17); // contained, should merge away
        s.normalize();
        let first = s.spans().to_vec();
        s.normalize();
        let second = s.spans().to_vec();
        assert_eq!(first, second);
        assert_eq!(first, vec![(5, 8), (10, 30)]);
    }

    #[test]
    fn drops_zero_length_intervals() {
        let mut s = SegmentList::new();
        s.add(5, 5);
        s.add(10, 12);
        assert_eq!(s.spans(), &[(10, 12)]);
    }

    #[test]
    fn intersect_and_subtract_partition_sum() {
        let mut a = SegmentList::from_spans(vec![(0, 100), (200, 300)]);
        let mut b = SegmentList::from_spans(vec![(50, 250)]);
        let mut inter = a.intersect(&mut b);
        let mut diff = a.clone().subtract(&mut b);
        assert_eq!(inter.sum() + diff.sum(), a.sum());
    }

    #[test]
    fn overlap_with_matches_intersect_sum() {
        let mut a = SegmentList::from_spans(vec![(0, 100), (200, 300)]);
        let mut b = SegmentList::from_spans(vec![(50, 250)]);
        let overlap = a.clone().overlap_with(&mut b);
        let mut inter = a.intersect(&mut b);
        assert_eq!(overlap, inter.sum());
    }

    #[test]
    fn sample_uniform_position_is_contained() {
        let mut ws = SegmentList::from_spans(vec![(0, 10)]);
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..200 {
            let start = ws.sample_uniform_position_within(4, &mut rng).unwrap();
            assert!(start + 4 <= 10);
        }
    }

    #[test]
    fn sample_uniform_position_none_when_too_large() {
        let mut ws = SegmentList::from_spans(vec![(0, 3)]);
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(ws.sample_uniform_position_within(5, &mut rng), None);
    }

    #[test]
    fn empty_list_has_zero_measures() {
        let mut s = SegmentList::new();
        assert!(s.is_empty());
        assert_eq!(s.sum(), 0);
        assert_eq!(s.counts(), 0);
    }
}
