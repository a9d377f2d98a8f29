use smallvec::SmallVec;

use crate::{AgentId, LV, OpLogError, RemoteVersion, Result};
use crate::causalgraph::agent_span::AgentSpan;
use crate::causalgraph::remote_ids::RemoteFrontier;
use crate::list::{ListBranch, ListOpLog};
use crate::list::operation::ListOp;
use crate::lvrange::LVRange;
use crate::rle::HasLength;

impl<T> Default for ListOpLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ListOpLog<T> {
    pub fn new() -> Self {
        Self {
            cg: Default::default(),
            ops: Vec::new(),
        }
    }

    pub fn get_or_create_agent_id(&mut self, name: &str) -> AgentId {
        self.cg.get_or_create_agent_id(name)
    }

    /// The number of operations in the log.
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.ops.len(), self.cg.len());
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The current version, in local terms. Also known as the heads or the
    /// frontier of the log.
    pub fn local_version(&self) -> &[LV] {
        self.cg.version.as_ref()
    }

    /// The current version in (agent, seq) terms, suitable for sharing.
    pub fn remote_version(&self) -> RemoteFrontier {
        // The frontier always refers to versions we have, so this can't
        // fail.
        self.cg.local_to_remote_frontier(self.local_version()).unwrap()
    }

    /// Append an insert made by a local agent at the log's current version.
    /// Returns the operation's local version.
    pub fn local_insert(&mut self, agent: AgentId, pos: usize, content: T) -> LV {
        let span = self.cg.assign_local_op(agent, 1);
        self.ops.push(ListOp::Ins { pos, content });
        span.start
    }

    /// Insert a run of items starting at `pos`. Each item gets its own
    /// operation, positioned after its predecessor.
    pub fn local_insert_all(&mut self, agent: AgentId, pos: usize, content: &[T]) -> Result<LVRange>
        where T: Clone
    {
        if content.is_empty() { return Err(OpLogError::InvalidLength); }

        let span = self.cg.assign_local_op(agent, content.len());
        for (i, c) in content.iter().enumerate() {
            self.ops.push(ListOp::Ins { pos: pos + i, content: c.clone() });
        }
        Ok(span)
    }

    /// Append a delete of `len` items at `pos`, made by a local agent.
    ///
    /// This records `len` single-item deletes, all at the same position:
    /// when the first item at `pos` goes away, the next one slides into its
    /// place.
    pub fn local_delete(&mut self, agent: AgentId, pos: usize, len: usize) -> Result<LVRange> {
        if len == 0 { return Err(OpLogError::InvalidLength); }

        let span = self.cg.assign_local_op(agent, len);
        for _ in 0..len {
            self.ops.push(ListOp::Del { pos });
        }
        Ok(span)
    }

    /// Ingest one operation from a remote peer.
    ///
    /// Returns how many operations were actually added: 1, or 0 when we
    /// already had this one. Fails with MissingParents if the op's parents
    /// haven't arrived yet - the caller is responsible for retransmission
    /// order.
    pub fn push_remote_op(&mut self, id: RemoteVersion, parents: &[RemoteVersion],
                          op: ListOp<T>) -> Result<usize> {
        let mut parent_lvs = SmallVec::<[LV; 2]>::new();
        for p in parents {
            parent_lvs.push(
                self.cg.try_remote_to_local_version(p)
                    .ok_or(OpLogError::MissingParents)?
            );
        }
        parent_lvs.sort_unstable();

        let agent = self.cg.get_or_create_agent_id(id.agent());
        let merged = self.cg.merge_and_assign(&parent_lvs, AgentSpan {
            agent,
            seq_range: id.seq().into(),
        });

        if !merged.is_empty() {
            debug_assert_eq!(merged.len(), 1);
            self.ops.push(op);
        }

        Ok(merged.len())
    }

    /// Checkout the log at its current version, producing a fresh document.
    pub fn checkout(&self) -> Result<ListBranch<T>> where T: Clone {
        let mut branch = ListBranch::new();
        branch.merge_from(self, None)?;
        Ok(branch)
    }

    /// Checkout and throw the version information away.
    pub fn checkout_simple(&self) -> Result<Vec<T>> where T: Clone {
        Ok(self.checkout()?.content)
    }

    /// Pull every operation `src` has that we don't.
    ///
    /// This is a whole sync round in one call: summarize ourselves,
    /// intersect with src to find the common baseline, diff src's graph
    /// from there, then merge the diff and copy the operations across.
    /// Either the whole diff applies or nothing does.
    pub fn merge_from(&mut self, src: &ListOpLog<T>) -> Result<()> where T: Clone {
        let summary = self.cg.summarize();
        let common = src.cg.intersect_with_summary(&summary);

        // Everything in src above the common baseline is news to us.
        let (only_common, only_src) = src.cg.graph.diff(common.as_ref(), src.local_version());
        debug_assert!(only_common.is_empty());

        let entries = src.cg.serialize_diff(&only_src)?;
        let merged = self.cg.merge_partial_versions(&entries)?;

        // The diff was computed against our own summary, so nothing in it
        // can be a duplicate; the new LVs line up 1:1 with src's ranges.
        debug_assert_eq!(merged.len(), only_src.iter().map(|r| r.len()).sum::<usize>());

        for range in &only_src {
            self.ops.extend(range.iter().map(|lv| src.ops[lv].clone()));
        }

        debug_assert_eq!(self.ops.len(), self.cg.len());
        Ok(())
    }

    /// Validate the oplog's internal invariants. Test / debug only.
    #[allow(unused)]
    pub fn dbg_check(&self, deep: bool) {
        assert_eq!(self.ops.len(), self.cg.len());
        self.cg.dbg_check(deep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_edits_smoke_test() {
        let mut oplog: ListOpLog<char> = ListOpLog::new();
        let seph = oplog.get_or_create_agent_id("seph");

        oplog.local_insert(seph, 0, 'h');
        oplog.local_insert(seph, 1, 'i');
        assert_eq!(oplog.checkout_simple().unwrap(), vec!['h', 'i']);
        assert_eq!(oplog.local_version(), &[1]);

        oplog.local_delete(seph, 0, 2).unwrap();
        assert_eq!(oplog.checkout_simple().unwrap(), vec![]);
        assert_eq!(oplog.local_version(), &[3]);

        assert_eq!(oplog.local_delete(seph, 0, 0), Err(OpLogError::InvalidLength));

        oplog.dbg_check(true);
    }

    #[test]
    fn insert_runs() {
        let mut oplog: ListOpLog<char> = ListOpLog::new();
        let seph = oplog.get_or_create_agent_id("seph");

        oplog.local_insert_all(seph, 0, &['a', 'c']).unwrap();
        oplog.local_insert_all(seph, 1, &['b']).unwrap();
        assert_eq!(oplog.checkout_simple().unwrap(), vec!['a', 'b', 'c']);

        assert_eq!(oplog.local_insert_all(seph, 0, &[]), Err(OpLogError::InvalidLength));
    }

    #[test]
    fn remote_version_round_trips() {
        let mut oplog: ListOpLog<char> = ListOpLog::new();
        let seph = oplog.get_or_create_agent_id("seph");
        oplog.local_insert(seph, 0, 'x');

        let rv = oplog.remote_version();
        assert_eq!(rv.as_slice(), &[("seph", 0).into()]);
    }

    #[test]
    fn push_remote_op_dedups() {
        let mut oplog: ListOpLog<char> = ListOpLog::new();

        let n = oplog.push_remote_op(("u1", 0).into(), &[], ListOp::new_insert(0, 'a')).unwrap();
        assert_eq!(n, 1);

        // Same op again: silently dropped.
        let n = oplog.push_remote_op(("u1", 0).into(), &[], ListOp::new_insert(0, 'a')).unwrap();
        assert_eq!(n, 0);
        assert_eq!(oplog.len(), 1);

        // An op with unknown parents is rejected.
        assert_eq!(
            oplog.push_remote_op(("u2", 0).into(), &[("u3", 0).into()],
                                 ListOp::new_insert(0, 'b')),
            Err(OpLogError::MissingParents)
        );

        let n = oplog.push_remote_op(("u1", 1).into(), &[("u1", 0).into()],
                                     ListOp::new_insert(1, 'b')).unwrap();
        assert_eq!(n, 1);
        assert_eq!(oplog.checkout_simple().unwrap(), vec!['a', 'b']);

        oplog.dbg_check(true);
    }

    #[test]
    fn concurrent_remote_inserts_converge() {
        // Scenario: two peers concurrently insert at position 0.
        let make = |first: &[(&str, char)]| {
            let mut oplog: ListOpLog<char> = ListOpLog::new();
            for (agent, c) in first {
                oplog.push_remote_op((*agent, 0).into(), &[], ListOp::new_insert(0, *c)).unwrap();
            }
            oplog
        };

        // Received in either order, the result is the same.
        let ab = make(&[("u1", 'A'), ("u2", 'B')]);
        let ba = make(&[("u2", 'B'), ("u1", 'A')]);

        assert_eq!(ab.checkout_simple().unwrap(), vec!['A', 'B']);
        assert_eq!(ba.checkout_simple().unwrap(), vec!['A', 'B']);
    }

    #[test]
    fn merge_from_pulls_missing_ops() {
        let mut a: ListOpLog<char> = ListOpLog::new();
        let seph = a.get_or_create_agent_id("seph");
        a.local_insert(seph, 0, 'a');
        a.local_insert(seph, 1, 'b');

        let mut b = a.clone();
        let mike = b.get_or_create_agent_id("mike");

        // Diverge.
        b.local_insert(mike, 2, 'c');
        let seph_a = seph; // Same interned id on both sides here.
        a.local_insert(seph_a, 0, 'z');

        // Merge both ways; both must converge on the same document.
        let mut a2 = a.clone();
        a2.merge_from(&b).unwrap();
        b.merge_from(&a).unwrap();

        a2.dbg_check(true);
        b.dbg_check(true);

        assert_eq!(a2.checkout_simple().unwrap(), b.checkout_simple().unwrap());
        assert_eq!(a2.checkout_simple().unwrap(), vec!['z', 'a', 'b', 'c']);

        // Merging again changes nothing.
        let before = a2.len();
        a2.merge_from(&b).unwrap();
        assert_eq!(a2.len(), before);
    }

    #[test]
    fn merge_from_is_idempotent_and_commutative() {
        let mut a: ListOpLog<char> = ListOpLog::new();
        let u1 = a.get_or_create_agent_id("u1");
        a.local_insert(u1, 0, 'x');

        let mut b: ListOpLog<char> = ListOpLog::new();
        let u2 = b.get_or_create_agent_id("u2");
        b.local_insert(u2, 0, 'y');

        let mut ab = a.clone();
        ab.merge_from(&b).unwrap();
        let mut ba = b.clone();
        ba.merge_from(&a).unwrap();

        assert_eq!(ab.checkout_simple().unwrap(), ba.checkout_simple().unwrap());

        ab.merge_from(&b).unwrap();
        ab.merge_from(&a).unwrap();
        assert_eq!(ab.len(), 2);
    }
}
