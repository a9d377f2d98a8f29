use std::fmt::{Debug, Formatter};
use std::ops::Range;

use crate::LV;
use crate::rle::{HasLength, HasRleKey, MergableSpan, Searchable, SplitableSpan};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` range of local versions.
///
/// This is a stand-in for `std::ops::Range<usize>`, which regrettably doesn't
/// implement `Copy`. Converts to and from `Range` with `.into()`.
#[derive(Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LVRange {
    pub start: LV,
    pub end: LV,
}

impl LVRange {
    #[inline]
    pub fn new(start: LV, end: LV) -> Self {
        LVRange { start, end }
    }

    #[inline]
    pub fn new_from_len(start: LV, len: usize) -> Self {
        LVRange { start, end: start + len }
    }

    pub fn last(&self) -> LV {
        debug_assert!(!self.is_empty());
        self.end - 1
    }

    pub fn contains(&self, item: LV) -> bool {
        self.start <= item && item < self.end
    }

    pub fn is_empty(&self) -> bool {
        debug_assert!(self.start <= self.end);
        self.start == self.end
    }

    pub fn intersect(&self, other: &Self) -> Option<LVRange> {
        let result = LVRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        };
        if result.start <= result.end { Some(result) } else { None }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item=LV> {
        Range::<usize>::from(*self)
    }
}

impl From<LV> for LVRange {
    fn from(start: LV) -> Self {
        LVRange { start, end: start + 1 }
    }
}

impl From<Range<usize>> for LVRange {
    fn from(range: Range<usize>) -> Self {
        LVRange { start: range.start, end: range.end }
    }
}

impl From<LVRange> for Range<usize> {
    fn from(span: LVRange) -> Self {
        span.start..span.end
    }
}

impl HasLength for LVRange {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

impl SplitableSpan for LVRange {
    fn truncate(&mut self, at: usize) -> Self {
        let split = self.start + at;
        let other = LVRange { start: split, end: self.end };
        self.end = split;
        other
    }

    #[inline]
    fn truncate_keeping_right(&mut self, at: usize) -> Self {
        let split = self.start + at;
        let other = LVRange { start: self.start, end: split };
        self.start = split;
        other
    }
}

impl MergableSpan for LVRange {
    fn can_append(&self, other: &Self) -> bool {
        other.start == self.end
    }

    fn append(&mut self, other: Self) {
        self.end = other.end;
    }

    fn prepend(&mut self, other: Self) {
        self.start = other.start;
    }
}

impl Searchable for LVRange {
    type Item = LV;

    fn get_offset(&self, item: LV) -> Option<usize> {
        if item >= self.start && item < self.end {
            Some(item - self.start)
        } else {
            None
        }
    }

    fn at_offset(&self, offset: usize) -> LV {
        self.start + offset
    }
}

impl HasRleKey for LVRange {
    fn rle_key(&self) -> usize {
        self.start
    }
}

/// Fabricated placeholder items (used while merging into a branch) get local
/// versions from up here, far away from anything a real oplog could assign.
pub(crate) const PLACEHOLDER_START: usize = usize::MAX / 4;

struct Placeholder(usize);

impl Debug for Placeholder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("Placeholder({})", self.0))
    }
}

pub(crate) fn debug_lv_raw<F: FnOnce(&dyn Debug) -> R, R>(val: LV, f: F) -> R {
    match val {
        start @ (PLACEHOLDER_START..) => f(&Placeholder(start - PLACEHOLDER_START)),
        start => f(&start),
    }
}

impl Debug for LVRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "V ")?;
        debug_lv_raw(self.start, |v| v.fmt(f))?;
        write!(f, "..")?;
        debug_lv_raw(self.end, |v| v.fmt(f))?;
        Ok(())
    }
}
