use std::cmp::Ordering::*;
use std::iter::FromIterator;
use std::ops::Index;
use std::slice::SliceIndex;

use crate::lvrange::LVRange;
use crate::rle::{HasLength, HasRleKey, MergableSpan, RleSpanHelpers, Searchable, SplitableSpan};

/// A vector of run-length encoded entries, ordered and searched by each
/// entry's key.
///
/// Most collections in this crate are dense (every key in `0..end()` is
/// covered by exactly one entry), but per-agent seq indexes can be sparse
/// when an agent's operations arrive out of order.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RleVec<V: HasLength + MergableSpan>(pub Vec<V>);

impl<V: HasLength + MergableSpan> RleVec<V> {
    pub fn new() -> Self { Self(Vec::new()) }

    /// Append a new entry to the end of the list, extending the last entry
    /// in place when possible. O(1). Returns true if the entry merged.
    pub fn push(&mut self, val: V) -> bool {
        if let Some(last) = self.0.last_mut() {
            if last.can_append(&val) {
                last.append(val);
                return true;
            }
        }
        self.0.push(val);
        false
    }

    pub fn last_entry(&self) -> Option<&V> { self.0.last() }

    pub fn num_entries(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, V> { self.0.iter() }

    /// One past the last key covered by the list. 0 if the list is empty.
    pub fn end(&self) -> usize where V: HasRleKey {
        self.last_entry().map_or(0, |v| v.end())
    }
}

impl<V: HasLength + MergableSpan + HasRleKey> RleVec<V> {
    /// Binary search for the entry containing `needle`. On a miss, returns
    /// the index at which an entry containing `needle` would be inserted.
    pub fn find_index(&self, needle: usize) -> Result<usize, usize> {
        self.0.binary_search_by(|entry| {
            let key = entry.rle_key();
            if needle < key { Greater }
            else if needle >= key + entry.len() { Less }
            else { Equal }
        })
    }

    pub fn find(&self, needle: usize) -> Option<&V> {
        self.find_index(needle).ok().map(|idx| &self.0[idx])
    }

    /// Find for lists with no gaps. Panics if the needle is out of range.
    pub fn find_packed(&self, needle: usize) -> &V {
        self.find(needle).unwrap()
    }

    pub fn find_with_offset(&self, needle: usize) -> Option<(&V, usize)> {
        self.find_index(needle).ok().map(|idx| {
            let entry = &self.0[idx];
            (entry, needle - entry.rle_key())
        })
    }

    pub fn find_packed_with_offset(&self, needle: usize) -> (&V, usize) {
        self.find_with_offset(needle).unwrap()
    }

    /// Like find, but misses report the containing empty range instead.
    ///
    /// Returns `(Ok(entry), offset)` on a hit, and `(Err(gap), offset into
    /// gap)` otherwise. Gaps at the end run to `usize::MAX`.
    pub fn find_sparse(&self, needle: usize) -> (Result<&V, LVRange>, usize) {
        match self.find_index(needle) {
            Ok(idx) => {
                let entry = &self.0[idx];
                (Ok(entry), needle - entry.rle_key())
            }
            Err(idx) => {
                let next_key = self.0.get(idx).map_or(usize::MAX, |e| e.rle_key());

                if idx == 0 {
                    (Err(LVRange::new(0, next_key)), needle)
                } else {
                    let end = self.0[idx - 1].end();
                    (Err(LVRange::new(end, next_key)), needle - end)
                }
            }
        }
    }

    pub fn contains_needle(&self, needle: usize) -> bool {
        !self.is_empty() && self.find_index(needle).is_ok()
    }

    /// Insert an entry, keeping the list ordered by key. O(n) in the worst
    /// case, though data almost always lands at the end.
    pub fn insert(&mut self, val: V) {
        if self.last_entry().map_or(true, |last| last.end() <= val.rle_key()) {
            self.push(val);
            return;
        }

        let idx = self.find_index(val.rle_key()).expect_err("Item already exists");

        // Extend a neighbour instead of splicing, when we can.
        if idx >= 1 {
            let prev = &mut self.0[idx - 1];
            if prev.can_append(&val) {
                prev.append(val);
                return;
            }
        }

        if idx < self.0.len() {
            let next = &mut self.0[idx];
            debug_assert!(val.end() <= next.rle_key(), "Items overlap");

            if val.can_append(next) {
                next.prepend(val);
                return;
            }
        }

        self.0.insert(idx, val);
    }

    /// Iterate entries covering `range`, clipped to the range and mapped
    /// through `map_fn`. The clipping happens on the mapped value.
    pub fn iter_range_map<I, F>(&self, range: LVRange, map_fn: F) -> RleVecRangeIter<'_, V, I, F>
        where I: SplitableSpan, F: Fn(&V) -> I
    {
        let start_idx = self.find_index(range.start).unwrap_or_else(|i| i);

        RleVecRangeIter {
            inner: self.0[start_idx..].iter(),
            range,
            map_fn,
        }
    }

    pub fn iter_range(&self, range: LVRange) -> RleVecRangeIter<'_, V, V, impl Fn(&V) -> V>
        where V: SplitableSpan + Clone
    {
        self.iter_range_map(range, V::clone)
    }

    /// Panic unless the list is gapless from key 0.
    pub fn check_packed(&self) {
        let mut expect_next = 0;
        for entry in self.0.iter() {
            assert_eq!(entry.rle_key(), expect_next);
            expect_next = entry.end();
        }
    }

    /// Panic if any adjacent pair of entries could have been merged.
    pub fn check_fully_merged(&self) {
        for i in 1..self.0.len() {
            assert!(!self.0[i - 1].can_append(&self.0[i]));
        }
    }
}

impl<V: HasLength + MergableSpan + HasRleKey + Searchable> RleVec<V> {
    /// Read the single item at the passed key. The list must cover the key.
    pub fn get(&self, key: usize) -> V::Item {
        let (v, offset) = self.find_packed_with_offset(key);
        v.at_offset(offset)
    }
}

impl<V: HasLength + MergableSpan> FromIterator<V> for RleVec<V> {
    fn from_iter<T: IntoIterator<Item=V>>(iter: T) -> Self {
        let mut rle = Self::new();
        for item in iter {
            rle.push(item);
        }
        rle
    }
}

impl<V: HasLength + MergableSpan> Default for RleVec<V> {
    fn default() -> Self { Self(Vec::new()) }
}

impl<V: HasLength + MergableSpan, I: SliceIndex<[V]>> Index<I> for RleVec<V> {
    type Output = I::Output;

    #[inline]
    fn index(&self, index: I) -> &Self::Output {
        self.0.index(index)
    }
}

#[derive(Debug, Clone)]
pub struct RleVecRangeIter<'a, V, I: SplitableSpan, F: Fn(&V) -> I> {
    inner: std::slice::Iter<'a, V>,
    range: LVRange,
    map_fn: F,
}

impl<'a, V: HasRleKey + HasLength, I: SplitableSpan, F: Fn(&V) -> I> Iterator
    for RleVecRangeIter<'a, V, I, F>
{
    type Item = I;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        debug_assert!(item.end() >= self.range.start);

        let item_range = item.span();
        if item_range.start >= self.range.end { return None; }

        let mut item = (self.map_fn)(item);
        if item_range.end > self.range.end {
            item.truncate(self.range.end - item_range.start);
        }
        if item_range.start < self.range.start {
            item.truncate_keeping_right(self.range.start - item_range.start);
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rle::KVPair;

    #[test]
    fn finds_at_offset() {
        let mut rle: RleVec<KVPair<LVRange>> = RleVec::new();

        rle.push(KVPair(1, LVRange::new(1000, 1002)));
        assert_eq!(rle.find_with_offset(1), Some((&KVPair(1, LVRange::new(1000, 1002)), 0)));
        assert_eq!(rle.find_with_offset(2), Some((&KVPair(1, LVRange::new(1000, 1002)), 1)));
        assert_eq!(rle.find_with_offset(3), None);

        // This should get appended.
        rle.push(KVPair(3, LVRange::new(1002, 1003)));
        assert_eq!(rle.find_with_offset(3), Some((&KVPair(1, LVRange::new(1000, 1003)), 2)));
        assert_eq!(rle.num_entries(), 1);
    }

    #[test]
    fn insert_inside() {
        let mut rle: RleVec<KVPair<LVRange>> = RleVec::new();

        rle.insert(KVPair(5, LVRange::new(1000, 1002)));
        // Prepend.
        rle.insert(KVPair(3, LVRange::new(998, 1000)));
        assert_eq!(rle.num_entries(), 1);

        // Append.
        rle.insert(KVPair(7, LVRange::new(1002, 1007)));
        assert_eq!(rle.num_entries(), 1);

        // Out of order, can't merge.
        rle.insert(KVPair(1, LVRange::new(1, 2)));
        assert_eq!(rle.num_entries(), 2);

        rle.insert(KVPair(100, LVRange::new(40, 41)));
        assert_eq!(rle.num_entries(), 3);
    }

    #[test]
    fn find_sparse_gaps() {
        let mut rle: RleVec<KVPair<LVRange>> = RleVec::new();

        assert_eq!(rle.find_sparse(0), (Err(LVRange::new(0, usize::MAX)), 0));
        assert_eq!(rle.find_sparse(10), (Err(LVRange::new(0, usize::MAX)), 10));

        rle.insert(KVPair(15, LVRange::new(40, 42)));
        assert_eq!(rle.find_sparse(10), (Err(LVRange::new(0, 15)), 10));
        assert_eq!(rle.find_sparse(15), (Ok(&rle.0[0]), 0));
        assert_eq!(rle.find_sparse(16), (Ok(&rle.0[0]), 1));
        assert_eq!(rle.find_sparse(17), (Err(LVRange::new(17, usize::MAX)), 0));
        assert_eq!(rle.find_sparse(20), (Err(LVRange::new(17, usize::MAX)), 3));
    }

    #[test]
    fn iter_range_clips() {
        let mut rle: RleVec<LVRange> = RleVec::new();
        rle.push(LVRange::new(0, 10));
        rle.push(LVRange::new(12, 18));
        rle.push(LVRange::new(20, 30));

        let items: Vec<_> = rle.iter_range(LVRange::new(5, 25)).collect();
        assert_eq!(items, vec![
            LVRange::new(5, 10),
            LVRange::new(12, 18),
            LVRange::new(20, 25),
        ]);
    }

    #[test]
    fn iter_range_empty() {
        let rle: RleVec<LVRange> = RleVec::new();
        assert!(rle.iter_range(LVRange::new(0, 0)).next().is_none());
    }
}
