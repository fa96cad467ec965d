use core::cmp::Ordering;

pub type CodePoint = u32;

/// The maximum (inclusive) code point.
pub const CODE_POINT_MAX: CodePoint = 0x10FFFF;

/// An inclusive range of code points.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub(crate) first: CodePoint,
    pub(crate) last: CodePoint,
}

impl Interval {
    pub(crate) const fn new(first: CodePoint, last: CodePoint) -> Interval {
        debug_assert!(first <= last);
        Interval { first, last }
    }

    /// Compare the interval against a code point, for binary search.
    #[inline(always)]
    pub fn compare(self, cp: CodePoint) -> Ordering {
        if self.first > cp {
            Ordering::Greater
        } else if self.last < cp {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }

    #[inline]
    pub fn contains(self, cp: CodePoint) -> bool {
        self.first <= cp && cp <= self.last
    }

    /// Return whether the intervals share at least one code point.
    pub fn overlaps(self, other: Interval) -> bool {
        self.first <= other.last && other.first <= self.last
    }

    /// Return whether the intervals overlap or abut, so their union is an
    /// interval.
    fn touches(self, other: Interval) -> bool {
        self.first <= other.last.saturating_add(1) && other.first <= self.last.saturating_add(1)
    }

    pub fn count_codepoints(self) -> usize {
        (self.last - self.first) as usize + 1
    }
}

/// A set of code points stored as sorted intervals which neither overlap nor
/// abut.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CodePointSet {
    ivs: Vec<Interval>,
}

impl CodePointSet {
    pub fn new() -> CodePointSet {
        CodePointSet { ivs: Vec::new() }
    }

    /// Construct from arbitrary intervals.
    pub fn from_intervals<I: IntoIterator<Item = Interval>>(ivs: I) -> CodePointSet {
        let mut res = CodePointSet::new();
        for iv in ivs {
            res.add(iv);
        }
        res
    }

    pub fn is_empty(&self) -> bool {
        self.ivs.is_empty()
    }

    /// Return whether every code point up to \p max is in the set.
    pub fn contains_all_up_to(&self, max: CodePoint) -> bool {
        matches!(self.ivs.first(), Some(iv) if iv.first == 0 && iv.last >= max)
    }

    #[inline]
    pub fn contains(&self, cp: CodePoint) -> bool {
        self.ivs.binary_search_by(|iv| iv.compare(cp)).is_ok()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.ivs
    }

    /// \return the number of code points in the set.
    pub fn count_codepoints(&self) -> usize {
        self.ivs.iter().map(|iv| iv.count_codepoints()).sum()
    }

    /// \return the sole code point if the set has exactly one.
    pub fn single_codepoint(&self) -> Option<CodePoint> {
        match self.ivs.as_slice() {
            [iv] if iv.first == iv.last => Some(iv.first),
            _ => None,
        }
    }

    pub fn add(&mut self, new_iv: Interval) {
        // Intervals entirely to the left of new_iv, not even abutting.
        let lo = self
            .ivs
            .partition_point(|iv| iv.last.saturating_add(1) < new_iv.first);
        let mut hi = lo;
        let mut merged = new_iv;
        while hi < self.ivs.len() && self.ivs[hi].touches(new_iv) {
            merged.first = merged.first.min(self.ivs[hi].first);
            merged.last = merged.last.max(self.ivs[hi].last);
            hi += 1;
        }
        self.ivs.splice(lo..hi, core::iter::once(merged));
        self.debug_check();
    }

    #[inline]
    pub fn add_one(&mut self, cp: CodePoint) {
        self.add(Interval::new(cp, cp))
    }

    pub fn add_set(&mut self, rhs: &CodePointSet) {
        for &iv in rhs.intervals() {
            self.add(iv)
        }
    }

    /// \return every code point not in the receiver.
    pub fn inverted(&self) -> CodePointSet {
        let mut ivs = Vec::with_capacity(self.ivs.len() + 1);
        let mut next: CodePoint = 0;
        for iv in &self.ivs {
            if next < iv.first {
                ivs.push(Interval::new(next, iv.first - 1));
            }
            next = iv.last + 1;
        }
        if next <= CODE_POINT_MAX {
            ivs.push(Interval::new(next, CODE_POINT_MAX));
        }
        let res = CodePointSet { ivs };
        res.debug_check();
        res
    }

    /// \return the code points in both sets.
    pub fn intersection(&self, rhs: &CodePointSet) -> CodePointSet {
        let mut ivs = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ivs.len() && j < rhs.ivs.len() {
            let (a, b) = (self.ivs[i], rhs.ivs[j]);
            if a.overlaps(b) {
                ivs.push(Interval::new(a.first.max(b.first), a.last.min(b.last)));
            }
            if a.last < b.last {
                i += 1;
            } else {
                j += 1;
            }
        }
        CodePointSet { ivs }
    }

    /// Return whether the sets share no code point.
    pub fn is_disjoint(&self, rhs: &CodePointSet) -> bool {
        self.intersection(rhs).is_empty()
    }

    fn debug_check(&self) {
        if cfg!(debug_assertions) {
            for w in self.ivs.windows(2) {
                debug_assert!(w[0].last.saturating_add(1) < w[1].first, "Intervals not normalized");
            }
            if let Some(iv) = self.ivs.last() {
                debug_assert!(iv.last <= CODE_POINT_MAX);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(first: u32, last: u32) -> Interval {
        Interval::new(first, last)
    }

    #[test]
    fn add_merges_overlapping_and_abutting() {
        let mut set = CodePointSet::new();
        set.add(iv(10, 20));
        set.add(iv(30, 40));
        assert_eq!(set.intervals(), &[iv(10, 20), iv(30, 40)]);
        set.add(iv(21, 29));
        assert_eq!(set.intervals(), &[iv(10, 40)]);
        set.add_one(42);
        set.add_one(5);
        assert_eq!(set.intervals(), &[iv(5, 5), iv(10, 40), iv(42, 42)]);
        set.add(iv(0, CODE_POINT_MAX));
        assert_eq!(set.intervals(), &[iv(0, CODE_POINT_MAX)]);
        assert!(set.contains_all_up_to(CODE_POINT_MAX));
    }

    #[test]
    fn inversion() {
        let set = CodePointSet::from_intervals([iv(30, 40), iv(10, 20)]);
        let inv = set.inverted();
        assert_eq!(
            inv.intervals(),
            &[iv(0, 9), iv(21, 29), iv(41, CODE_POINT_MAX)]
        );
        assert_eq!(inv.inverted(), set);
        assert!(CodePointSet::new().inverted().contains_all_up_to(CODE_POINT_MAX));
    }

    #[test]
    fn intersection_and_membership() {
        let a = CodePointSet::from_intervals([iv(0, 10), iv(20, 30)]);
        let b = CodePointSet::from_intervals([iv(5, 25)]);
        assert_eq!(a.intersection(&b).intervals(), &[iv(5, 10), iv(20, 25)]);
        assert!(a.contains(25) && !a.contains(15));
        assert!(a.is_disjoint(&CodePointSet::from_intervals([iv(11, 19)])));
        assert_eq!(a.count_codepoints(), 22);
        assert_eq!(CodePointSet::from_intervals([iv(7, 7)]).single_codepoint(), Some(7));
    }
}
