use std::collections::HashMap;

use crate::{CausalGraph, Frontier, LV, OpLogError, Result};
use crate::list::operation::ListOp;
use crate::lvrange::{LVRange, PLACEHOLDER_START};
use crate::merge::item::{CrdtItem, INSERTED, NO_LV, NOT_INSERTED_YET};

/// Replays operations from the causal graph against a CRDT list.
///
/// The tracker holds the CRDT items in document order, plus a notion of
/// "current version" - the point in the graph whose document the item
/// states currently describe. Moving the current version around (retreating
/// and advancing operations we've already seen) is what lets a single
/// linear pass apply operations from all over the graph.
#[derive(Debug)]
pub(crate) struct ReplayTracker {
    /// Item storage. Stable - items are never removed or moved.
    arena: Vec<CrdtItem>,

    /// Document order, as indexes into the arena.
    order: Vec<usize>,

    /// LV -> arena index, for state toggling without a scan.
    index: HashMap<LV, usize>,

    /// For each delete operation we've applied, the LV of the item it
    /// deleted.
    del_targets: HashMap<LV, LV>,

    /// Where in the graph the current item states are valid.
    cur_version: Frontier,
}

impl ReplayTracker {
    pub(crate) fn new() -> Self {
        Self::new_at(Frontier::root(), 0)
    }

    /// Start a tracker at some version, with a run of placeholder items
    /// standing in for the document as it existed there.
    ///
    /// We don't know (or care) how that prefix breaks into actual items;
    /// there just have to be at least as many placeholders as the document
    /// had items, and operations must never reach past them. Any LV below
    /// `max(start_at) + 1` could name an item, so that many placeholders is
    /// always enough.
    pub(crate) fn new_at(start_at: Frontier, placeholder_len: usize) -> Self {
        let mut tracker = Self {
            arena: Vec::new(),
            order: Vec::new(),
            index: HashMap::new(),
            del_targets: HashMap::new(),
            cur_version: start_at,
        };

        for i in 0..placeholder_len {
            let lv = PLACEHOLDER_START + i;
            let item = CrdtItem {
                lv,
                origin_left: NO_LV,
                right_parent: NO_LV,
                // Placeholders are never in the not-inserted-yet state.
                cur_state: INSERTED,
                ever_deleted: false,
            };
            let arena_idx = tracker.arena.len();
            tracker.arena.push(item);
            tracker.order.push(arena_idx);
            tracker.index.insert(lv, arena_idx);
        }

        tracker
    }

    fn item_at(&self, order_idx: usize) -> &CrdtItem {
        &self.arena[self.order[order_idx]]
    }

    /// Find an item's position in the document order. O(n).
    fn find_order_idx(&self, lv: LV) -> Result<usize> {
        let arena_idx = *self.index.get(&lv).ok_or(OpLogError::CorruptState)?;
        self.order.iter().position(|&i| i == arena_idx)
            .ok_or(OpLogError::CorruptState)
    }

    /// Walk forward to the item at the target current-state position,
    /// accumulating the end-state position as we go.
    ///
    /// Returns (document order index, end-state position).
    fn find_by_cur_pos(&self, target_pos: usize) -> Result<(usize, usize)> {
        let mut cur_pos = 0;
        let mut end_pos = 0;
        let mut idx = 0;

        while cur_pos < target_pos {
            let item = self.order.get(idx)
                .map(|&i| &self.arena[i])
                .ok_or(OpLogError::CorruptState)?; // Op position past the end.

            cur_pos += item.cur_width();
            end_pos += item.end_width();
            idx += 1;
        }

        Ok((idx, end_pos))
    }

    /// For an operation we've applied before, which item does it touch?
    /// Deletes touch their recorded target; inserts touch themselves.
    fn target_of<T>(&self, lv: LV, op: &ListOp<T>) -> Result<usize> {
        let target_lv = match op {
            ListOp::Del { .. } => *self.del_targets.get(&lv).ok_or(OpLogError::CorruptState)?,
            ListOp::Ins { .. } => lv,
        };
        self.index.get(&target_lv).copied().ok_or(OpLogError::CorruptState)
    }

    /// Wind already-applied operations back out of the current state.
    /// Ranges must be retreated newest-first, so a delete of an item comes
    /// back out before the item's insert.
    pub(crate) fn retreat_by_range<T>(&mut self, ops: &[ListOp<T>], range: LVRange) -> Result<()> {
        for lv in range.iter().rev() {
            let arena_idx = self.target_of(lv, &ops[lv])?;
            let item = &mut self.arena[arena_idx];

            match &ops[lv] {
                ListOp::Del { .. } => item.cur_state.undelete()?,
                ListOp::Ins { .. } => item.cur_state.mark_not_inserted_yet()?,
            }
        }
        Ok(())
    }

    /// Replay already-applied operations into the current state.
    pub(crate) fn advance_by_range<T>(&mut self, ops: &[ListOp<T>], range: LVRange) -> Result<()> {
        for lv in range.iter() {
            let arena_idx = self.target_of(lv, &ops[lv])?;
            let item = &mut self.arena[arena_idx];

            match &ops[lv] {
                ListOp::Del { .. } => item.cur_state.delete()?,
                ListOp::Ins { .. } => item.cur_state.mark_inserted()?,
            }
        }
        Ok(())
    }

    /// Apply one operation for the first time, optionally mirroring its
    /// effect into a document snapshot.
    fn apply1<T: Clone>(&mut self, cg: &CausalGraph, ops: &[ListOp<T>], lv: LV,
                        snapshot: Option<&mut Vec<T>>) -> Result<()> {
        match &ops[lv] {
            ListOp::Del { pos } => {
                let (mut idx, mut end_pos) = self.find_by_cur_pos(*pos)?;

                // find_by_cur_pos lands just past pos-1 current items; skip
                // to the next item which is actually visible right now.
                loop {
                    let item = self.order.get(idx)
                        .map(|&i| &self.arena[i])
                        .ok_or(OpLogError::CorruptState)?;
                    if item.cur_state.is_inserted() { break; }

                    end_pos += item.end_width();
                    idx += 1;
                }

                let item = &mut self.arena[self.order[idx]];

                if !item.ever_deleted {
                    if let Some(snapshot) = snapshot {
                        snapshot.remove(end_pos);
                    }
                }
                item.cur_state.delete()?;
                item.ever_deleted = true;

                self.del_targets.insert(lv, item.lv);
            }

            ListOp::Ins { pos, content } => {
                let (idx, end_pos) = self.find_by_cur_pos(*pos)?;

                let origin_left = if idx == 0 {
                    NO_LV
                } else {
                    self.item_at(idx - 1).lv
                };

                // The right parent is the next item which isn't
                // not-inserted-yet - but only when it hangs off the same
                // left origin we do. (The Fugue "right parent" rule.)
                let mut right_parent = NO_LV;
                for i in idx..self.order.len() {
                    let next = self.item_at(i);
                    if next.cur_state != NOT_INSERTED_YET {
                        right_parent = if next.origin_left == origin_left {
                            next.lv
                        } else {
                            NO_LV
                        };
                        break;
                    }
                }

                let new_item = CrdtItem {
                    lv,
                    origin_left,
                    right_parent,
                    cur_state: INSERTED,
                    ever_deleted: false,
                };

                let (idx, end_pos) = self.integrate(cg, &new_item, idx, end_pos)?;

                let arena_idx = self.arena.len();
                self.arena.push(new_item);
                self.order.insert(idx, arena_idx);
                self.index.insert(lv, arena_idx);

                if let Some(snapshot) = snapshot {
                    snapshot.insert(end_pos, content.clone());
                }
            }
        }

        Ok(())
    }

    /// Choose the final position for a newly inserted item among any
    /// concurrent (not-inserted-yet) items sitting at the insertion point.
    ///
    /// This is the Fugue / Sync9 integration rule. The relative order of
    /// concurrent items depends only on their (origin_left, right_parent,
    /// (agent, seq)) tuples, which is what makes the replay deterministic
    /// across peers.
    fn integrate(&self, cg: &CausalGraph, new_item: &CrdtItem,
                 mut idx: usize, mut end_pos: usize) -> Result<(usize, usize)> {
        // No concurrent items here; insert at the cursor.
        if idx >= self.order.len() || self.item_at(idx).cur_state != NOT_INSERTED_YET {
            return Ok((idx, end_pos));
        }

        // While scanning, we keep a candidate position (idx/end_pos) and
        // only commit it when we decide against scanning further.
        let mut scanning = false;
        let mut scan_idx = idx;
        let mut scan_end_pos = end_pos;

        let left_idx = idx as isize - 1;
        let right_idx = if new_item.right_parent == NO_LV {
            self.order.len()
        } else {
            self.find_order_idx(new_item.right_parent)?
        };

        while scan_idx < self.order.len() {
            let other = self.item_at(scan_idx);

            // Only concurrent items are candidates to pass.
            if other.cur_state != NOT_INSERTED_YET { break; }
            if other.lv == new_item.right_parent {
                return Err(OpLogError::CorruptState);
            }

            let other_left_idx = if other.origin_left == NO_LV {
                -1
            } else {
                self.find_order_idx(other.origin_left)? as isize
            };

            if other_left_idx < left_idx {
                break;
            } else if other_left_idx == left_idx {
                let other_right_idx = if other.right_parent == NO_LV {
                    self.order.len()
                } else {
                    self.find_order_idx(other.right_parent)?
                };

                if other_right_idx == right_idx
                    && cg.agent_assignment.tie_break_versions(new_item.lv, other.lv)?.is_lt()
                {
                    break;
                } else {
                    scanning = other_right_idx < right_idx;
                }
            }
            // other_left_idx > left_idx: keep moving in whatever mode we're
            // in.

            scan_end_pos += other.end_width();
            scan_idx += 1;

            if !scanning {
                idx = scan_idx;
                end_pos = scan_end_pos;
            }
        }

        Ok((idx, end_pos))
    }

    /// Apply a run of brand new operations.
    pub(crate) fn apply_range<T: Clone>(&mut self, cg: &CausalGraph, ops: &[ListOp<T>],
                                        range: LVRange,
                                        mut snapshot: Option<&mut Vec<T>>) -> Result<()> {
        for lv in range.iter() {
            self.apply1(cg, ops, lv, snapshot.as_deref_mut())?;
        }
        Ok(())
    }

    /// Walk a set of (ascending, non-overlapping) ranges of the graph,
    /// applying each operation exactly once. Between runs, the tracker
    /// retreats and advances previously seen operations so each run is
    /// applied against the document its author saw.
    pub(crate) fn walk<T: Clone>(&mut self, cg: &CausalGraph, ops: &[ListOp<T>],
                                 ranges: &[LVRange],
                                 mut snapshot: Option<&mut Vec<T>>) -> Result<()> {
        for &range in ranges {
            for run in cg.graph.iter_range(range) {
                let (only_ours, only_theirs) =
                    cg.graph.diff(self.cur_version.as_ref(), run.parents.as_ref());

                // Retreat in reverse so deletes unwind before the inserts
                // they deleted.
                for r in only_ours.iter().rev() {
                    self.retreat_by_range(ops, *r)?;
                }
                for r in only_theirs.iter() {
                    self.advance_by_range(ops, *r)?;
                }

                self.apply_range(cg, ops, run.span, snapshot.as_deref_mut())?;

                self.cur_version = Frontier::new_1(run.span.last());
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn dbg_items(&self) -> Vec<CrdtItem> {
        self.order.iter().map(|&i| self.arena[i]).collect()
    }
}
