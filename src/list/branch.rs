use smallvec::SmallVec;

use crate::{Frontier, LV, OpLogError, Result};
use crate::causalgraph::graph::tools::DiffFlag;
use crate::list::{ListBranch, ListOpLog};
use crate::lvrange::LVRange;
use crate::merge::ReplayTracker;
use crate::rle::AppendRle;

impl<T> Default for ListBranch<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ListBranch<T> {
    /// An empty document at the root version.
    pub fn new() -> Self {
        Self {
            content: Vec::new(),
            version: Frontier::root(),
        }
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl<T: Clone> ListBranch<T> {
    /// Bring this branch up to `merge_version` (or the oplog's current
    /// version), replaying only what's needed.
    ///
    /// History the branch has already incorporated isn't replayed from
    /// genesis. Instead the tracker starts at the common ancestor with a
    /// placeholder prefix standing in for the existing document, replays
    /// the branch's own conflicting operations to rebuild the CRDT state,
    /// and only then applies the new operations to the content.
    pub fn merge_from(&mut self, oplog: &ListOpLog<T>, merge_version: Option<&[LV]>) -> Result<()> {
        let merge_version = match merge_version {
            Some(v) => v,
            None => oplog.local_version(),
        };

        for &v in merge_version {
            if v >= oplog.len() { return Err(OpLogError::UnknownVersion); }
        }

        // Split the history around the common ancestor: ranges the branch
        // already represents (but which might conflict with the new
        // operations), and ranges which are genuinely new.
        let mut conflict_ops: SmallVec<[LVRange; 4]> = SmallVec::new();
        let mut new_ops: SmallVec<[LVRange; 4]> = SmallVec::new();

        let common_ancestor = oplog.cg.graph.find_conflicting(
            self.version.as_ref(), merge_version,
            |span, flag| {
                // The visitor runs in reverse order.
                let target = match flag {
                    DiffFlag::OnlyB => &mut new_ops,
                    _ => &mut conflict_ops,
                };
                target.push_reversed_rle(span);
            });

        if new_ops.is_empty() {
            // The branch already contains everything. Don't touch the
            // content; just absorb the version.
            self.version = oplog.cg.graph
                .version_union(self.version.as_ref(), merge_version);
            return Ok(());
        }

        conflict_ops.reverse();
        new_ops.reverse();

        // Anything the conflicting operations can refer to was inserted at
        // or below the branch version, so this many placeholders always
        // covers the existing document.
        let placeholder_len = self.version.iter().max().map_or(0, |&v| v + 1);
        let mut tracker = ReplayTracker::new_at(common_ancestor, placeholder_len);

        // Phase 1: rebuild CRDT state for history the content already
        // reflects. No snapshot - the document must not change.
        tracker.walk(&oplog.cg, &oplog.ops, &conflict_ops, None)?;

        // Phase 2: apply the new operations for real.
        tracker.walk(&oplog.cg, &oplog.ops, &new_ops, Some(&mut self.content))?;

        self.version = oplog.cg.graph
            .version_union(self.version.as_ref(), merge_version);
        Ok(())
    }
}
