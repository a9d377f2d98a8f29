use std::fmt::{Debug, Formatter};
use std::ops::Index;

use smallvec::{SmallVec, smallvec};

use crate::LV;
use crate::lvrange::LVRange;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A frontier names a causal state: the set of maximal local versions an
/// observer has seen. Members form an antichain (no member is an ancestor of
/// another member), and the list is always sorted ascending.
///
/// The empty frontier is "root" - the state before any operations at all.
///
/// Almost every frontier in practice has exactly 1 item in it. It only grows
/// past that while concurrent operations from different peers sit unmerged.
#[derive(Clone, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frontier(pub SmallVec<[LV; 2]>);

impl Debug for Frontier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frontier")?;
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl Frontier {
    /// The state at the start of time, before any operations.
    pub fn root() -> Self {
        Self(smallvec![])
    }

    pub fn new_1(v: LV) -> Self {
        Self(smallvec![v])
    }

    pub fn from_sorted(items: &[LV]) -> Self {
        debug_assert!(frontier_is_sorted(items));
        Self(items.into())
    }

    pub fn from_unsorted(items: &[LV]) -> Self {
        let mut items: SmallVec<[LV; 2]> = items.into();
        items.sort_unstable();
        items.dedup();
        Self(items)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_ref(&self) -> &[LV] {
        self.0.as_slice()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LV> {
        self.0.iter()
    }

    /// Get the only member of this frontier. Panics if the frontier is root
    /// or merging concurrent branches.
    pub fn unwrap_single(&self) -> LV {
        assert_eq!(self.0.len(), 1, "expected a single-element frontier");
        self.0[0]
    }

    pub fn debug_check_sorted(&self) {
        debug_assert!(frontier_is_sorted(self.as_ref()));
    }

    /// Insert a new version, keeping the list sorted. The new version must
    /// not already be present.
    pub(crate) fn insert_sorted(&mut self, new_item: LV) {
        // A linear scan would likely beat binary search here given how short
        // these lists are, but this matches what the lookup tables do.
        let idx = self.0.binary_search(&new_item).expect_err("Frontier already contains item");
        self.0.insert(idx, new_item);
        self.debug_check_sorted();
    }

    /// Advance this frontier across an operation run with the named parents.
    ///
    /// All of `parents` are removed from the frontier (when present) and the
    /// run's last version takes their place. Non-parent members are kept -
    /// they're concurrent with the new operations.
    pub(crate) fn advance_by_known_run(&mut self, parents: &[LV], span: LVRange) {
        // Short circuit the common case of time advancing linearly.
        if parents.len() == 1 && self.0.len() == 1 && parents[0] == self.0[0] {
            self.0[0] = span.last();
            return;
        }

        self.debug_check_sorted();
        debug_assert!(!self.0.contains(&span.start));

        self.0.retain(|v| !parents.contains(v)); // Usually empties the list.
        self.insert_sorted(span.last());
    }
}

impl From<&[LV]> for Frontier {
    fn from(f: &[LV]) -> Self {
        Self::from_unsorted(f)
    }
}

impl FromIterator<LV> for Frontier {
    fn from_iter<I: IntoIterator<Item=LV>>(iter: I) -> Self {
        let mut items: SmallVec<[LV; 2]> = iter.into_iter().collect();
        items.sort_unstable();
        items.dedup();
        Self(items)
    }
}

impl Index<usize> for Frontier {
    type Output = LV;

    fn index(&self, index: usize) -> &LV {
        &self.0[index]
    }
}

pub(crate) fn frontier_is_sorted(f: &[LV]) -> bool {
    if f.len() >= 2 {
        let mut last = f[0];
        for &v in &f[1..] {
            if v <= last { return false; }
            last = v;
        }
    }
    true
}
