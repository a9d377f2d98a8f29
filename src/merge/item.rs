use std::fmt::{Debug, Formatter};

use crate::{LV, OpLogError, Result};
use crate::lvrange::debug_lv_raw;

/// Marks "no item": the document boundary for origin_left, and "no right
/// parent" for right_parent.
pub(crate) const NO_LV: LV = usize::MAX;

/// The state of a CRDT item at the point in time the replay cursor is
/// currently looking at.
///
/// 0 = not inserted yet,
/// 1 = inserted,
/// 2+ = deleted n-1 times.
///
/// Double deletes only show up when two peers concurrently delete the same
/// item and the branches merge. A u32 takes ~4 billion concurrent deletes of
/// one item to overflow, which doesn't happen outside malice.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub(crate) struct ItemState(u32);

pub(crate) const NOT_INSERTED_YET: ItemState = ItemState(0);
pub(crate) const INSERTED: ItemState = ItemState(1);
pub(crate) const DELETED_ONCE: ItemState = ItemState(2);

#[cfg(test)]
pub(crate) fn deleted_n_state(n: u32) -> ItemState {
    ItemState(1 + n)
}

impl ItemState {
    pub(crate) fn is_inserted(&self) -> bool {
        *self == INSERTED
    }

    /// Insert -> Deleted, Deleted -> double deleted, and so on.
    pub(crate) fn delete(&mut self) -> Result<()> {
        if *self == NOT_INSERTED_YET {
            return Err(OpLogError::CorruptState);
        }
        self.0 = self.0.checked_add(1).ok_or(OpLogError::CorruptState)?;
        Ok(())
    }

    pub(crate) fn undelete(&mut self) -> Result<()> {
        if self.0 < DELETED_ONCE.0 {
            return Err(OpLogError::CorruptState);
        }
        self.0 -= 1;
        Ok(())
    }

    pub(crate) fn mark_inserted(&mut self) -> Result<()> {
        if *self != NOT_INSERTED_YET {
            return Err(OpLogError::CorruptState);
        }
        *self = INSERTED;
        Ok(())
    }

    pub(crate) fn mark_not_inserted_yet(&mut self) -> Result<()> {
        if *self != INSERTED {
            return Err(OpLogError::CorruptState);
        }
        *self = NOT_INSERTED_YET;
        Ok(())
    }
}

/// One item of the CRDT list.
///
/// Items reference each other by LV, never by pointer - the item list is a
/// flat arena with integer references into it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct CrdtItem {
    pub lv: LV,

    /// The item which was immediately to our left when this item was
    /// inserted, or NO_LV for the document start.
    pub origin_left: LV,

    /// Set when the item to our right at insertion time shared our
    /// origin_left; NO_LV otherwise. This is the Fugue formulation of the
    /// right origin.
    pub right_parent: LV,

    /// Where this item is in the state the replay cursor is looking at.
    pub cur_state: ItemState,

    /// Whether the item has been deleted in the final document. Items with
    /// ever_deleted set contribute nothing to the output.
    pub ever_deleted: bool,
}

impl CrdtItem {
    /// The width this item contributes to current-state positions.
    pub fn cur_width(&self) -> usize {
        if self.cur_state.is_inserted() { 1 } else { 0 }
    }

    /// The width this item contributes to end-state (document) positions.
    pub fn end_width(&self) -> usize {
        if self.ever_deleted { 0 } else { 1 }
    }
}

impl Debug for CrdtItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn origin(f: &mut std::fmt::DebugStruct<'_, '_>, name: &str, v: LV) {
            if v == NO_LV {
                f.field(name, &"(none)");
            } else {
                debug_lv_raw(v, |d| { f.field(name, d); });
            }
        }

        let mut s = f.debug_struct("CrdtItem");
        debug_lv_raw(self.lv, |d| { s.field("lv", d); });
        origin(&mut s, "origin_left", self.origin_left);
        origin(&mut s, "right_parent", self.right_parent);
        s.field("cur_state", &self.cur_state);
        s.field("ever_deleted", &self.ever_deleted);
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_transitions() {
        let mut s = NOT_INSERTED_YET;
        assert_eq!(s.delete(), Err(OpLogError::CorruptState));
        assert_eq!(s.undelete(), Err(OpLogError::CorruptState));

        s.mark_inserted().unwrap();
        assert_eq!(s, INSERTED);
        assert_eq!(s.mark_inserted(), Err(OpLogError::CorruptState));

        s.delete().unwrap();
        assert_eq!(s, DELETED_ONCE);
        s.delete().unwrap();
        assert_eq!(s, deleted_n_state(2));

        s.undelete().unwrap();
        s.undelete().unwrap();
        assert_eq!(s, INSERTED);
        assert_eq!(s.undelete(), Err(OpLogError::CorruptState));

        s.mark_not_inserted_yet().unwrap();
        assert_eq!(s, NOT_INSERTED_YET);
        assert_eq!(s.mark_not_inserted_yet(), Err(OpLogError::CorruptState));
    }
}
