//! Tools for querying the causal graph: ancestry checks, diffs between
//! versions, conflict walks and dominator sets.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use smallvec::{SmallVec, smallvec};

use crate::{Frontier, LV};
use crate::causalgraph::graph::Graph;
use crate::causalgraph::graph::tools::DiffFlag::*;
use crate::lvrange::LVRange;
use crate::rle::{AppendRle, SplitableSpan};

#[cfg(feature = "serde")]
use serde::Serialize;

/// The diff and conflict walks tag each version by which side of the walk it
/// was reached from. Tags are promoted to `Shared` when the sides meet.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum DiffFlag { OnlyA, OnlyB, Shared }

impl Graph {
    fn shadow_of(&self, v: LV) -> LV {
        self.entries.find_packed(v).shadow
    }

    /// Does `a` contain `b` as a direct (same entry chain) ancestor, going by
    /// the entry's shadow?
    fn txn_shadow_contains(&self, a: LV, b: LV) -> bool {
        a == b || (a > b && self.shadow_of(a) <= b)
    }

    /// A more strict check than `txn_shadow_contains`: `a`'s entry must
    /// actually span `b`, so `a` has no other ancestors outside `b`'s
    /// history.
    pub(crate) fn is_direct_descendant_coarse(&self, a: LV, b: LV) -> bool {
        a == b || (a > b && self.entries.find_packed(a).contains(b))
    }

    /// Compare two versions in causal order. Returns None when they're
    /// concurrent.
    pub fn version_cmp(&self, v1: LV, v2: LV) -> Option<Ordering> {
        match v1.cmp(&v2) {
            Ordering::Equal => Some(Ordering::Equal),
            Ordering::Less => {
                if self.version_contains(&[v2], v1) {
                    Some(Ordering::Less)
                } else {
                    None
                }
            },
            Ordering::Greater => {
                if self.version_contains(&[v1], v2) {
                    Some(Ordering::Greater)
                } else {
                    None
                }
            },
        }
    }

    /// Does the frontier dominate (transitively contain) the target version?
    pub fn version_contains(&self, frontier: &[LV], target: LV) -> bool {
        if frontier.contains(&target) { return true; }
        if frontier.is_empty() { return false; }

        // Fast path, and it hits a lot: a frontier member's entry chain
        // often reaches under the target directly.
        for &v in frontier {
            if v > target {
                let e = self.entries.find_packed(v);
                if e.shadow_contains(target) { return true; }
            }
        }

        let mut queue: BinaryHeap<LV> = BinaryHeap::new();
        for &v in frontier {
            debug_assert_ne!(v, target);
            if v > target { queue.push(v); }
        }

        while let Some(v) = queue.pop() {
            debug_assert!(v > target);

            let e = self.entries.find_packed(v);
            if e.shadow_contains(target) { return true; }

            // Collapse any queued versions inside the same entry.
            while let Some(&next) = queue.peek() {
                if next >= e.span.start {
                    queue.pop();
                } else { break; }
            }

            for &p in e.parents.iter() {
                #[allow(clippy::comparison_chain)]
                if p == target { return true; }
                else if p > target { queue.push(p); }
                // p < target can't be a descendant of target. Discard.
            }
        }

        false
    }
}

pub(crate) type DiffResult = (SmallVec<[LVRange; 4]>, SmallVec<[LVRange; 4]>);

impl Graph {
    /// Compute the versions reachable from `a` but not `b`, and vice versa.
    /// Shared history is skipped entirely. Both outputs are run-length
    /// merged and ascending.
    pub fn diff(&self, a: &[LV], b: &[LV]) -> DiffResult {
        // The common cases - equal versions, or one side directly dominating
        // the other - short circuit the heap walk below.
        if a == b { return (smallvec![], smallvec![]); }

        if a.len() == 1 && b.len() == 1 {
            let a = a[0];
            let b = b[0];

            if self.is_direct_descendant_coarse(a, b) {
                return (smallvec![(b + 1..a + 1).into()], smallvec![]);
            }
            if self.is_direct_descendant_coarse(b, a) {
                return (smallvec![], smallvec![(a + 1..b + 1).into()]);
            }
        }

        self.diff_slow(a, b)
    }

    fn diff_slow(&self, a: &[LV], b: &[LV]) -> DiffResult {
        let mut only_a: SmallVec<[LVRange; 4]> = smallvec![];
        let mut only_b: SmallVec<[LVRange; 4]> = smallvec![];

        // Marks versions [start..=end] with the given flag.
        let mark_run = |start: LV, end: LV, flag: DiffFlag| {
            let target = match flag {
                OnlyA => &mut only_a,
                OnlyB => &mut only_b,
                Shared => { return; }
            };
            target.push_reversed_rle(LVRange::new(start, end + 1));
        };

        self.diff_slow_internal(a, b, mark_run);

        only_a.reverse();
        only_b.reverse();
        (only_a, only_b)
    }

    fn diff_slow_internal<F>(&self, a: &[LV], b: &[LV], mut mark_run: F)
        where F: FnMut(LV, LV, DiffFlag)
    {
        // Sorted so we pop the highest version first.
        let mut queue: BinaryHeap<(LV, DiffFlag)> = BinaryHeap::new();
        for &v in a { queue.push((v, OnlyA)); }
        for &v in b { queue.push((v, OnlyB)); }

        let mut num_shared_entries = 0;

        while let Some((mut v, mut flag)) = queue.pop() {
            if flag == Shared { num_shared_entries -= 1; }

            // Merge duplicate queue entries, promoting the flag when the
            // sides disagree.
            while let Some((peek_v, peek_flag)) = queue.peek() {
                if *peek_v != v { break; }
                if *peek_flag != flag { flag = Shared; }
                if *peek_flag == Shared { num_shared_entries -= 1; }
                queue.pop();
            }

            let e = self.entries.find_packed(v);

            // Consume any other queued versions within this entry, marking
            // the partial runs between them.
            while let Some((peek_v, peek_flag)) = queue.peek() {
                if *peek_v < e.span.start { break; }

                if *peek_flag != flag {
                    mark_run(*peek_v + 1, v, flag);
                    v = *peek_v;
                    flag = Shared;
                }
                if *peek_flag == Shared { num_shared_entries -= 1; }
                queue.pop();
            }

            mark_run(e.span.start, v, flag);

            for &p in e.parents.iter() {
                queue.push((p, flag));
                if flag == Shared { num_shared_entries += 1; }
            }

            // Once everything left is shared, the diff is complete.
            if queue.len() == num_shared_entries { break; }
        }
    }
}

// In the conflict walk, frontiers move through the queue whole. The walk
// stops when the queue collapses to a single (possibly merged) point.
#[derive(Debug, PartialEq, Eq, Clone)]
struct WalkPoint {
    /// For merged frontiers this is the highest member.
    last: LV,
    /// The rest of the frontier, sorted. Usually empty.
    merged_with: SmallVec<[LV; 1]>,
}

/// Root sorts below everything else.
const ROOT_POINT: LV = usize::MAX;

impl Ord for WalkPoint {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> Ordering {
        // wrapping_add(1) maps the root marker to 0.
        self.last.wrapping_add(1).cmp(&other.last.wrapping_add(1))
            .then_with(|| other.merged_with.is_empty().cmp(&self.merged_with.is_empty()))
    }
}

impl PartialOrd for WalkPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<LV> for WalkPoint {
    fn from(v: LV) -> Self {
        Self { last: v, merged_with: Default::default() }
    }
}

impl From<&[LV]> for WalkPoint {
    fn from(frontier: &[LV]) -> Self {
        Self {
            last: *frontier.last().unwrap_or(&ROOT_POINT),
            merged_with: if frontier.len() > 1 {
                SmallVec::from_slice(&frontier[..frontier.len() - 1])
            } else {
                smallvec![]
            },
        }
    }
}

impl Graph {
    /// Walk backwards from both frontiers at once, visiting every version
    /// until the walks converge. Ranges are emitted in descending order,
    /// tagged by which side reached them. Returns the frontier of the
    /// greatest common ancestor.
    pub(crate) fn find_conflicting<V>(&self, a: &[LV], b: &[LV], mut visit: V) -> Frontier
        where V: FnMut(LVRange, DiffFlag)
    {
        if a == b {
            return Frontier::from_sorted(a);
        }

        if a.len() == 1 && b.len() == 1 {
            let a = a[0];
            let b = b[0];

            if self.is_direct_descendant_coarse(a, b) {
                visit((b + 1..a + 1).into(), OnlyA);
                return Frontier::new_1(b);
            }
            if self.is_direct_descendant_coarse(b, a) {
                visit((a + 1..b + 1).into(), OnlyB);
                return Frontier::new_1(a);
            }
        }

        self.find_conflicting_slow(a, b, visit)
    }

    fn find_conflicting_slow<V>(&self, a: &[LV], b: &[LV], mut visit: V) -> Frontier
        where V: FnMut(LVRange, DiffFlag)
    {
        // The heap pulls the highest versions first.
        let mut queue: BinaryHeap<(WalkPoint, DiffFlag)> = BinaryHeap::new();
        queue.push((a.into(), OnlyA));
        queue.push((b.into(), OnlyB));

        'outer: loop {
            let (point, mut flag) = queue.pop().unwrap();
            let v = point.last;

            if v == ROOT_POINT { break Frontier::root(); }

            // Discard duplicate entries, merging flags.
            while let Some((peek_point, peek_flag)) = queue.peek() {
                if *peek_point != point { break; }
                if *peek_flag != flag { flag = Shared; }
                queue.pop();
            }

            if queue.is_empty() {
                // The queue has collapsed: this point is the common
                // ancestor.
                let mut f = Frontier::from_sorted(point.merged_with.as_slice());
                f.0.push(v);
                f.debug_check_sorted();
                break f;
            }

            // Merge points shatter into their members; `last` is handled
            // directly this iteration.
            if !point.merged_with.is_empty() {
                for m in point.merged_with {
                    queue.push((m.into(), flag));
                }
            }

            let e = self.entries.find_packed(v);
            let mut range = LVRange { start: e.span.start, end: v + 1 };

            // Consume all other queued versions which fall inside this entry.
            loop {
                if let Some((peek_point, _)) = queue.peek() {
                    if peek_point.last != ROOT_POINT && peek_point.last >= e.span.start {
                        let (point, next_flag) = queue.pop().unwrap();

                        // Only emit the run above the queued version; it will
                        // handle everything below itself.
                        if point.last + 1 < range.end {
                            let offset = point.last + 1 - e.span.start;
                            debug_assert!(offset > 0);
                            let rem = range.truncate(offset);
                            visit(rem, flag);
                        }

                        if next_flag != flag { flag = Shared; }

                        if !point.merged_with.is_empty() {
                            // A merge point which lands inside this entry.
                            // Shatter it and let the loop deal with it.
                            for m in point.merged_with {
                                queue.push((m.into(), next_flag));
                            }
                        }
                    } else {
                        visit(range, flag);
                        // Requeue this entry's parents as a single point, so
                        // the walk can stop exactly at a merge.
                        queue.push((e.parents.as_ref().into(), flag));
                        break;
                    }
                } else {
                    break 'outer Frontier::new_1(range.last());
                }
            }
        }
    }
}

impl Graph {
    /// Find the dominators of a sorted set of versions: the subset which no
    /// other member is an ancestor of. Duplicates collapse.
    pub fn find_dominators(&self, versions: &[LV]) -> Frontier {
        let mut result = self.find_dominators_rev(versions);
        result.reverse();
        Frontier(result)
    }

    /// As find_dominators, but the result comes out descending.
    pub(crate) fn find_dominators_rev(&self, versions: &[LV]) -> SmallVec<[LV; 2]> {
        if versions.len() <= 1 { return versions.into(); }

        debug_assert!(crate::frontier::frontier_is_sorted(versions));

        let first_v = versions[0];
        let last_v = versions[versions.len() - 1];

        // Everything below the last entry's shadow is under its shadow, so
        // the last version dominates the whole set. The common case.
        let last_entry = self.entries.find_packed(last_v);
        if last_entry.shadow_contains(first_v) { return smallvec![last_v]; }

        let mut result_rev = smallvec![];
        self.find_dominators_full_internal(versions.iter().copied(), first_v, |v, dom| {
            if dom {
                result_rev.push(v);
            }
        });

        result_rev
    }

    /// Visit every input version, in descending order, with a flag saying
    /// whether it's a dominator of the set. Inputs don't need to be sorted.
    pub(crate) fn find_dominators_full<F, I>(&self, versions_iter: I, visit: F)
        where F: FnMut(LV, bool), I: Iterator<Item=LV>
    {
        self.find_dominators_full_internal(versions_iter, usize::MAX, visit);
    }

    fn find_dominators_full_internal<F, I>(&self, versions_iter: I, stop_at_shadow: usize, mut visit: F)
        where F: FnMut(LV, bool), I: Iterator<Item=LV>
    {
        if let Some(max_size) = versions_iter.size_hint().1 {
            if max_size <= 1 {
                // A single version dominates itself.
                for v in versions_iter {
                    visit(v, true);
                }
                return;
            }
        }

        // The LSB marks whether this version was one of the inputs. The
        // ancestry expansion of other versions reaches an input *before* the
        // input itself pops, which is exactly the dominator test.
        fn enc_input(v: LV) -> usize { v << 1 }
        fn enc_expanded(v: LV) -> usize { (v << 1) + 1 }
        fn dec(v_enc: usize) -> (bool, LV) {
            (v_enc % 2 == 0, v_enc >> 1)
        }

        let mut queue: BinaryHeap<usize> = versions_iter.map(|v| {
            assert!(v < usize::MAX / 2, "Version too large for packed encoding");
            enc_input(v)
        }).collect();
        let mut inputs_remaining = queue.len();

        let mut last_emitted = usize::MAX;

        while let Some(v_enc) = queue.pop() {
            let (is_input, v) = dec(v_enc);

            if is_input {
                visit(v, true);
                last_emitted = v;
                inputs_remaining -= 1;
            }

            let e = self.entries.find_packed(v);

            if stop_at_shadow != usize::MAX && e.shadow <= stop_at_shadow {
                break;
            }

            // Anything else inside this entry is dominated.
            while let Some(&v2_enc) = queue.peek() {
                let (is_input2, v2) = dec(v2_enc);
                if v2 < e.span.start { break; }
                queue.pop();

                if is_input2 {
                    // Collapse duplicate inputs to a single "true" visit.
                    if last_emitted != v2 {
                        visit(v2, false);
                        last_emitted = v2;
                    }
                    inputs_remaining -= 1;
                }
            }
            if inputs_remaining == 0 { break; }

            for &p in e.parents.iter() {
                queue.push(enc_expanded(p));
            }
        }
    }

    /// Find dominators of versions in arbitrary order, with duplicates.
    pub fn find_dominators_unsorted(&self, versions: &[LV]) -> Frontier {
        if versions.len() <= 1 {
            return Frontier::from_sorted(versions);
        }

        let mut result: SmallVec<[LV; 2]> = smallvec![];
        self.find_dominators_full(versions.iter().copied(), |v, is_dom| {
            if is_dom {
                result.push(v);
            }
        });

        result.reverse();
        Frontier(result)
    }

    /// The version containing all operations from both input versions.
    pub fn version_union(&self, a: &[LV], b: &[LV]) -> Frontier {
        let mut result: SmallVec<[LV; 2]> = smallvec![];
        self.find_dominators_full(
            a.iter().copied().chain(b.iter().copied()),
            |v, is_dom| {
                if is_dom {
                    result.push(v);
                }
            }
        );
        result.reverse();
        Frontier(result)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::ops::Range;

    use super::*;
    use crate::rle::{HasLength, MergableSpan};

    // The conflict finder doubles as an (inefficient) diff. Reusing the diff
    // tests on it shakes out bugs in both.
    fn diff_via_conflicting(graph: &Graph, a: &[LV], b: &[LV]) -> DiffResult {
        let mut only_a: SmallVec<[LVRange; 4]> = smallvec![];
        let mut only_b: SmallVec<[LVRange; 4]> = smallvec![];

        graph.find_conflicting(a, b, |span, flag| {
            let target = match flag {
                OnlyA => &mut only_a,
                OnlyB => &mut only_b,
                Shared => { return; }
            };
            target.push_reversed_rle(span);
        });

        only_a.reverse();
        only_b.reverse();
        (only_a, only_b)
    }

    fn push_rev_rle(list: &mut Vec<(LVRange, DiffFlag)>, span: LVRange, flag: DiffFlag) {
        if let Some((last_span, last_flag)) = list.last_mut() {
            if span.can_append(last_span) && flag == *last_flag {
                last_span.prepend(span);
                return;
            }
        }
        list.push((span, flag));
    }

    fn assert_conflicting(graph: &Graph, a: &[LV], b: &[LV],
                          expect_spans: &[(Range<usize>, DiffFlag)], expect_common: &[LV]) {
        let expect: Vec<(LVRange, DiffFlag)> = expect_spans
            .iter()
            .rev()
            .map(|(r, flag)| (r.clone().into(), *flag))
            .collect();

        let mut actual = Vec::new();
        let common = graph.find_conflicting(a, b, |span, flag| {
            assert!(!span.is_empty());
            push_rev_rle(&mut actual, span, flag);
        });
        assert_eq!(common.as_ref(), expect_common);
        assert_eq!(actual, expect);
    }

    fn assert_diff_eq(graph: &Graph, a: &[LV], b: &[LV],
                      expect_a: &[LVRange], expect_b: &[LVRange]) {
        let slow_result = graph.diff_slow(a, b);
        let fast_result = graph.diff(a, b);
        let c_result = diff_via_conflicting(graph, a, b);

        assert_eq!(slow_result.0.as_slice(), expect_a);
        assert_eq!(slow_result.1.as_slice(), expect_b);
        assert_eq!(slow_result, fast_result);
        assert_eq!(slow_result, c_result);

        for (frontier, spans, other) in [(a, expect_a, b), (b, expect_b, a)] {
            for span in spans {
                assert!(graph.version_contains(frontier, span.start));
                if span.len() > 1 {
                    assert!(graph.version_contains(frontier, span.last()));
                }
            }

            if frontier.len() == 1 {
                let expect = spans.is_empty();
                assert_eq!(graph.version_contains(other, frontier[0]), expect);
            }
        }
    }

    //  0 1 2    3 4 5
    //   \   \  /   /
    //    \   6 7 8
    //     \  /  |
    //      9 10 |
    //       (merges 2 & 8)
    fn fancy_graph() -> Graph {
        let g = Graph::from_simple_runs(&[
            (0..3, &[]),
            (3..6, &[]),
            (6..9, &[1, 4]),
            (9..11, &[2, 8]),
        ]);
        g.dbg_check();
        g
    }

    #[test]
    fn common_ancestor_smoke_test() {
        let graph = fancy_graph();

        for v in 0..=9 {
            // No version conflicts with itself.
            assert_conflicting(&graph, &[v], &[v], &[], &[v]);
        }
        assert_conflicting(&graph, &[5, 6], &[5, 6], &[], &[5, 6]);

        assert_conflicting(&graph, &[1], &[2], &[(2..3, OnlyB)], &[1]);
        assert_conflicting(&graph, &[0], &[2], &[(1..3, OnlyB)], &[0]);
        assert_conflicting(&graph, &[], &[], &[], &[]);
        assert_conflicting(&graph, &[], &[2], &[(0..3, OnlyB)], &[]);

        assert_conflicting(&graph, &[2], &[3], &[(0..3, OnlyA), (3..4, OnlyB)], &[]);
        assert_conflicting(&graph, &[1, 4], &[4], &[(0..2, OnlyA), (3..5, Shared)], &[]);
        assert_conflicting(&graph, &[6], &[2], &[(0..2, Shared), (2..3, OnlyB), (3..5, OnlyA), (6..7, OnlyA)], &[]);
        assert_conflicting(&graph, &[6], &[5], &[(0..2, OnlyA), (3..5, Shared), (5..6, OnlyB), (6..7, OnlyA)], &[]);
        assert_conflicting(&graph, &[5, 6], &[5], &[(0..2, OnlyA), (3..6, Shared), (6..7, OnlyA)], &[]);
        assert_conflicting(&graph, &[5, 6], &[2], &[(0..2, Shared), (2..3, OnlyB), (3..7, OnlyA)], &[]);
        assert_conflicting(&graph, &[2, 6], &[5], &[(0..3, OnlyA), (3..5, Shared), (5..6, OnlyB), (6..7, OnlyA)], &[]);
        assert_conflicting(&graph, &[9], &[10], &[(10..11, OnlyB)], &[9]);
        assert_conflicting(&graph, &[6], &[7], &[(7..8, OnlyB)], &[6]);

        // Looks weird, but 9's parents are [2, 8] exactly.
        assert_conflicting(&graph, &[9], &[2, 8], &[(9..10, OnlyA)], &[2, 8]);

        // Walks all the way down; we can't represent "rebase 8 over 7"
        // without basically all of time.
        assert_conflicting(&graph, &[9], &[2, 7], &[(0..5, Shared), (6..8, Shared), (8..10, OnlyA)], &[]);
    }

    #[test]
    fn version_contains_smoke_test() {
        let graph = fancy_graph();

        assert!(!graph.version_contains(&[], 0));
        assert!(graph.version_contains(&[0], 0));

        assert!(graph.version_contains(&[2], 0));
        assert!(graph.version_contains(&[2], 1));
        assert!(graph.version_contains(&[2], 2));

        assert!(!graph.version_contains(&[0], 1));
        assert!(!graph.version_contains(&[1], 2));

        assert!(graph.version_contains(&[8], 0));
        assert!(graph.version_contains(&[8], 1));
        assert!(!graph.version_contains(&[8], 2));
        assert!(!graph.version_contains(&[8], 5));

        assert!(graph.version_contains(&[1, 4], 0));
        assert!(graph.version_contains(&[1, 4], 1));
        assert!(!graph.version_contains(&[1, 4], 2));
        assert!(!graph.version_contains(&[1, 4], 5));

        assert!(graph.version_contains(&[9], 2));
        assert!(graph.version_contains(&[9], 1));
        assert!(graph.version_contains(&[9], 0));
    }

    #[test]
    fn version_cmp_orders_ancestors() {
        let graph = fancy_graph();
        assert_eq!(graph.version_cmp(0, 2), Some(Ordering::Less));
        assert_eq!(graph.version_cmp(2, 0), Some(Ordering::Greater));
        assert_eq!(graph.version_cmp(4, 4), Some(Ordering::Equal));
        assert_eq!(graph.version_cmp(2, 8), None); // Concurrent.
        assert_eq!(graph.version_cmp(1, 6), Some(Ordering::Less));
    }

    fn check_dominators(graph: &Graph, input: &[LV], expected_yes: &[LV]) {
        let expected_no: Vec<_> = input.iter()
            .filter(|v| !expected_yes.contains(v)).copied().collect();
        assert_eq!(input.len(), expected_yes.len() + expected_no.len());

        assert_eq!(graph.find_dominators(input).as_ref(), expected_yes);

        let mut actual_yes = vec![];
        let mut actual_no = vec![];
        graph.find_dominators_full(input.iter().copied(), |v, dom| {
            if dom { actual_yes.push(v); }
            else { actual_no.push(v); }
        });
        actual_yes.reverse();
        actual_no.reverse();

        assert_eq!(actual_yes, expected_yes);
        assert_eq!(actual_no, expected_no);
    }

    #[test]
    fn dominator_smoke_test() {
        let graph = fancy_graph();

        check_dominators(&graph, &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10], &[5, 10]);
        check_dominators(&graph, &[10], &[10]);

        check_dominators(&graph, &[5, 6], &[5, 6]);
        check_dominators(&graph, &[5, 9], &[5, 9]);
        check_dominators(&graph, &[4, 9], &[9]);
        check_dominators(&graph, &[1, 2], &[2]);
        check_dominators(&graph, &[0, 2], &[2]);
        check_dominators(&graph, &[0, 10], &[10]);
        check_dominators(&graph, &[], &[]);
        check_dominators(&graph, &[2], &[2]);
        check_dominators(&graph, &[1, 4], &[1, 4]);
        check_dominators(&graph, &[9, 10], &[10]);
        check_dominators(&graph, &[2, 8, 9], &[9]);
        check_dominators(&graph, &[2, 7, 9], &[9]);
        check_dominators(&graph, &[6, 7], &[7]);
        check_dominators(&graph, &[0], &[0]);
    }

    #[test]
    fn dominator_duplicates() {
        let graph = fancy_graph();
        assert_eq!(graph.find_dominators_unsorted(&[1, 1, 1]).as_ref(), &[1]);
        assert_eq!(graph.version_union(&[1], &[1]).as_ref(), &[1]);

        let mut seen_1 = false;
        graph.find_dominators_full([1, 1, 1].iter().copied(), |_v, _d| {
            assert!(!seen_1, "Duplicate version visited");
            seen_1 = true;
        });
    }

    #[test]
    fn version_union_spans_branches() {
        let graph = fancy_graph();
        assert_eq!(graph.version_union(&[2], &[8]).as_ref(), &[2, 8]);
        assert_eq!(graph.version_union(&[2], &[9]).as_ref(), &[9]);
        assert_eq!(graph.version_union(&[], &[4]).as_ref(), &[4]);
    }

    #[test]
    fn diff_for_flat_txns() {
        // 0 |
        // | 1
        // 2
        let graph = Graph::from_simple_runs(&[
            (0..1, &[]),
            (1..2, &[]),
            (2..3, &[0]),
        ]);
        graph.dbg_check();

        assert_diff_eq(&graph, &[2], &[], &[(0..1).into(), (2..3).into()], &[]);
        assert_diff_eq(&graph, &[2], &[1], &[(0..1).into(), (2..3).into()], &[(1..2).into()]);
    }

    #[test]
    fn diff_three_root_txns() {
        // 0 | |
        //   1 |
        //     2
        let graph = Graph::from_simple_runs(&[
            (0..1, &[]),
            (1..2, &[]),
            (2..3, &[]),
        ]);
        graph.dbg_check();

        assert_diff_eq(&graph, &[0], &[0, 1], &[], &[(1..2).into()]);

        for v in 0..3 {
            assert_diff_eq(&graph, &[v], &[], &[(v..v + 1).into()], &[]);
            assert_diff_eq(&graph, &[], &[v], &[], &[(v..v + 1).into()]);
        }

        assert_diff_eq(&graph, &[], &[0, 1], &[], &[(0..2).into()]);
        assert_diff_eq(&graph, &[0], &[1], &[(0..1).into()], &[(1..2).into()]);
    }

    #[test]
    fn diff_shadow_bubble() {
        // 0,1,2   |
        //      \ 3,4
        //       \ /
        //        5,6
        let graph = Graph::from_simple_runs(&[
            (0..3, &[]),
            (3..5, &[]),
            (5..7, &[2, 4]),
        ]);
        graph.dbg_check();

        assert_diff_eq(&graph, &[4], &[5], &[], &[(0..3).into(), (5..6).into()]);
        assert_diff_eq(&graph, &[4], &[], &[(3..5).into()], &[]);
    }

    #[test]
    fn diff_common_branch_is_ordered() {
        // 0 1
        // |x|
        // 2 3
        let graph = Graph::from_simple_runs(&[
            (0..1, &[]),
            (1..2, &[]),
            (2..3, &[0, 1]),
            (3..4, &[0, 1]),
        ]);
        graph.dbg_check();

        assert!(!graph.version_contains(&[2], 3));
        assert!(!graph.version_contains(&[3], 2));
        assert_diff_eq(&graph, &[2], &[3], &[(2..3).into()], &[(3..4).into()]);
    }
}
