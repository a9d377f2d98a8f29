//! Parent storage for the causal graph, and the graph query toolbox.
//!
//! Each run of operations stores the parents of its first version. Within a
//! run, every subsequent version's sole parent is its predecessor - that's
//! what lets runs be stored as single entries.

pub(crate) mod tools;

use crate::{Frontier, LV};
use crate::lvrange::LVRange;
use crate::rle::{HasLength, HasRleKey, MergableSpan, RleVec, SplitableSpan};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A run of versions and the parents of the run's first version.
///
/// `shadow` is derived data: every version in `span` is a direct descendant
/// of everything from `span.start` down to `shadow`. Several of the graph
/// walks use it to stop early.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TxnSpan {
    pub span: LVRange,

    shadow: LV,

    /// Parents of span.start. Empty when the run starts at root; one item
    /// for a plain sequential change; two or more when the run starts with a
    /// merge.
    pub parents: Frontier,
}

impl TxnSpan {
    pub(crate) fn contains(&self, v: LV) -> bool {
        self.span.contains(v)
    }

    pub(crate) fn last(&self) -> LV {
        self.span.last()
    }

    /// The parents of any version within this run.
    pub(crate) fn clone_parents_at(&self, v: LV) -> Frontier {
        if v > self.span.start {
            Frontier::new_1(v - 1)
        } else {
            self.parents.clone()
        }
    }

    pub(crate) fn shadow_contains(&self, v: LV) -> bool {
        debug_assert!(v <= self.last());
        v >= self.shadow
    }
}

impl HasLength for TxnSpan {
    fn len(&self) -> usize {
        self.span.len()
    }
}

impl MergableSpan for TxnSpan {
    fn can_append(&self, other: &Self) -> bool {
        self.span.can_append(&other.span)
            && other.parents.len() == 1
            && other.parents[0] == self.last()
            && other.shadow == self.shadow
    }

    fn append(&mut self, other: Self) {
        self.span.append(other.span);
    }

    fn prepend(&mut self, other: Self) {
        self.span.prepend(other.span);
        self.parents = other.parents;
        debug_assert_eq!(self.shadow, other.shadow);
    }
}

impl HasRleKey for TxnSpan {
    fn rle_key(&self) -> usize {
        self.span.start
    }
}

/// A clipped view of a graph run: just the versions and their parents. This
/// is what the graph walks and the wire format consume.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GraphRun {
    pub span: LVRange,
    pub parents: Frontier,
}

impl HasLength for GraphRun {
    fn len(&self) -> usize { self.span.len() }
}

impl HasRleKey for GraphRun {
    fn rle_key(&self) -> usize { self.span.start }
}

impl MergableSpan for GraphRun {
    fn can_append(&self, other: &Self) -> bool {
        self.span.can_append(&other.span)
            && other.parents.len() == 1
            && other.parents[0] == self.span.last()
    }

    fn append(&mut self, other: Self) {
        self.span.append(other.span);
    }

    fn prepend(&mut self, other: Self) {
        self.span.prepend(other.span);
        self.parents = other.parents;
    }
}

impl SplitableSpan for GraphRun {
    fn truncate(&mut self, at: usize) -> Self {
        debug_assert!(at >= 1);
        GraphRun {
            span: self.span.truncate(at),
            // The clipped tail's first version follows the version before it.
            parents: Frontier::new_1(self.span.start + at - 1),
        }
    }
}

impl From<&TxnSpan> for GraphRun {
    fn from(entry: &TxnSpan) -> Self {
        Self {
            span: entry.span,
            parents: entry.parents.clone(),
        }
    }
}

/// The parents of every known version, stored run-length encoded and packed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Graph {
    pub(crate) entries: RleVec<TxnSpan>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn num_entries(&self) -> usize {
        self.entries.num_entries()
    }

    /// One past the last known version.
    pub fn next_lv(&self) -> usize {
        self.entries.end()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn parents_at(&self, v: LV) -> Frontier {
        self.entries.find_packed(v).clone_parents_at(v)
    }

    /// Record a new run of versions with the given parents. The range must
    /// start at the current end of the graph.
    pub(crate) fn push(&mut self, parents: &[LV], range: LVRange) {
        debug_assert_eq!(range.start, self.next_lv());

        // Fast path: almost all runs just extend the last entry.
        if let Some(last) = self.entries.0.last_mut() {
            if parents.len() == 1
                && parents[0] == last.last()
                && last.span.can_append(&range)
            {
                last.span.append(range);
                return;
            }
        }

        let mut shadow = range.start;
        while shadow >= 1 && parents.contains(&(shadow - 1)) {
            shadow = self.entries.find_packed(shadow - 1).shadow;
        }

        // The fast path above means this entry can never RLE-merge.
        let did_merge = self.entries.push(TxnSpan {
            span: range,
            shadow,
            parents: Frontier::from_sorted(parents),
        });
        debug_assert!(!did_merge);
    }

    /// Iterate the runs covering `range` in ascending order, clipped at both
    /// ends. A run clipped from its interior synthesizes its predecessor as
    /// its sole parent.
    pub(crate) fn iter_range(&self, range: LVRange) -> impl Iterator<Item=GraphRun> + '_ {
        self.entries.iter_range_map(range, |e| e.into())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item=GraphRun> + '_ {
        self.entries.iter().map(|e| e.into())
    }

    /// Rebuild the current frontier from first principles. Slow; for checks
    /// and tests.
    pub(crate) fn dbg_get_frontier_inefficiently(&self) -> Frontier {
        // Only the last version of an entry can be a tip, and it is one
        // unless some other entry names it as a parent.
        let mut tips: Vec<LV> = self.entries.iter().map(|e| e.last()).collect();
        for e in self.entries.iter() {
            tips.retain(|v| !e.parents.as_ref().contains(v));
        }
        tips.sort_unstable();
        Frontier::from_sorted(&tips)
    }

    pub(crate) fn dbg_check(&self) {
        self.entries.check_packed();
        self.entries.check_fully_merged();

        for (idx, e) in self.entries.iter().enumerate() {
            e.parents.debug_check_sorted();
            assert!(!e.span.is_empty());

            // Parents must strictly precede the entry.
            for &p in e.parents.iter() {
                assert!(p < e.span.start);
                assert!(self.entries.contains_needle(p));
            }

            // And check the shadow is right by recomputing it.
            let mut expect_shadow = e.span.start;
            while expect_shadow >= 1 && e.parents.as_ref().contains(&(expect_shadow - 1)) {
                expect_shadow = self.entries.find_packed(expect_shadow - 1).shadow;
            }
            assert_eq!(e.shadow, expect_shadow, "Bad shadow at entry {}", idx);
        }
    }

    #[cfg(test)]
    pub(crate) fn from_simple_runs(runs: &[(std::ops::Range<usize>, &[LV])]) -> Self {
        let mut graph = Self::new();
        for (span, parents) in runs {
            graph.push(parents, span.clone().into());
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rle::test_splitable_methods_valid;

    #[test]
    fn graph_run_splits() {
        test_splitable_methods_valid(GraphRun {
            span: (10..20).into(),
            parents: Frontier::new_1(0),
        });
    }

    #[test]
    fn push_extends_trailing_entry() {
        let mut g = Graph::new();
        g.push(&[], (0..3).into());
        g.push(&[2], (3..6).into());
        assert_eq!(g.num_entries(), 1);
        assert_eq!(g.next_lv(), 6);

        // A concurrent run can't merge.
        g.push(&[], (6..8).into());
        assert_eq!(g.num_entries(), 2);

        // Neither can a merge entry.
        g.push(&[5, 7], (8..9).into());
        assert_eq!(g.num_entries(), 3);
        assert_eq!(g.parents_at(8).as_ref(), &[5, 7]);
        assert_eq!(g.parents_at(4).as_ref(), &[3]);
    }

    #[test]
    fn iter_range_clips_parents() {
        let mut g = Graph::new();
        g.push(&[], (0..5).into());

        let runs: Vec<_> = g.iter_range((2..4).into()).collect();
        assert_eq!(runs, vec![GraphRun {
            span: (2..4).into(),
            parents: Frontier::new_1(1),
        }]);
    }

    #[test]
    fn frontier_from_scratch() {
        let g = Graph::from_simple_runs(&[
            (0..3, &[]),
            (3..6, &[]),
            (6..9, &[1, 4]),
        ]);
        g.dbg_check();

        // 2 and 5 are tips (only 1 and 4 were merged), plus the merge itself.
        assert_eq!(g.dbg_get_frontier_inefficiently().as_ref(), &[2, 5, 8]);
    }
}
