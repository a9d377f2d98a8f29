//! The causal graph: a run-length encoded join-semilattice of operation
//! identifiers.
//!
//! Each known operation has a local version, an (agent, seq) identity and a
//! set of parent versions. The graph tracks all three, plus the current
//! frontier ("heads"). It knows nothing about what the operations *do* -
//! that's the oplog's business.

pub mod agent_span;
pub mod agent_assignment;
pub mod graph;
pub mod entry;
pub mod remote_ids;
pub mod summary;
pub mod partial;
mod check;

use smallvec::SmallVec;
use smartstring::alias::String as SmartString;

use crate::{AgentId, Frontier, LV, OpLogError, Result};
use crate::causalgraph::agent_assignment::AgentAssignment;
use crate::causalgraph::agent_span::{AgentSpan, AgentVersion};
use crate::causalgraph::entry::CGEntry;
use crate::causalgraph::graph::Graph;
use crate::lvrange::LVRange;
use crate::rle::{HasLength, KVPair, MergableSpan, RleSpanHelpers};

#[derive(Clone, Debug, Default)]
pub struct CausalGraph {
    /// Maps local versions to (agent, seq) pairs and back.
    pub agent_assignment: AgentAssignment,

    /// Parents of every operation. This is what diff / ancestry queries
    /// consult when merging remote changes.
    pub graph: Graph,

    /// The version you get when you've seen every operation in the graph.
    pub version: Frontier,
}

impl CausalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_agent_id(&self, name: &str) -> Option<AgentId> {
        self.agent_assignment.get_agent_id(name)
    }

    pub fn get_or_create_agent_id(&mut self, name: &str) -> AgentId {
        self.agent_assignment.get_or_create_agent_id(name)
    }

    pub fn agent_name(&self, agent: AgentId) -> &str {
        self.agent_assignment.agent_name(agent)
    }

    /// The number of operations this graph knows about. Also the next local
    /// version to be assigned.
    pub fn len(&self) -> usize {
        let len = self.agent_assignment.len();
        debug_assert_eq!(len, self.graph.next_lv());
        len
    }

    pub fn is_empty(&self) -> bool {
        self.agent_assignment.is_empty()
    }

    pub fn lv_to_agent_version(&self, v: LV) -> Result<AgentVersion> {
        self.agent_assignment.lv_to_agent_version(v)
    }

    pub fn try_agent_version_to_lv(&self, v: AgentVersion) -> Option<LV> {
        self.agent_assignment.try_agent_version_to_lv(v)
    }

    /// Assign a run of operations from a local agent, parented at the
    /// current frontier.
    pub fn assign_local_op(&mut self, agent: AgentId, num: usize) -> LVRange {
        let parents = self.version.clone();
        self.assign_span(parents.as_ref(), agent, num)
    }

    /// Assign a run of operations from a local agent with explicit parents.
    /// The parents must already be known.
    pub fn assign_local_op_with_parents(&mut self, parents: &[LV], agent: AgentId, num: usize) -> LVRange {
        self.assign_span(parents, agent, num)
    }

    /// As assign_local_op_with_parents, but the caller states which seq the
    /// run starts at. Fails with InvalidSeq unless it's exactly the agent's
    /// next unused seq.
    pub fn assign_local_op_with_seq(&mut self, parents: &[LV], agent: AgentId,
                                    seq_start: usize, num: usize) -> Result<LVRange> {
        let next_seq = self.agent_assignment.next_seq_for_agent(agent);
        if seq_start != next_seq {
            return Err(OpLogError::InvalidSeq);
        }
        Ok(self.assign_span(parents, agent, num))
    }

    fn assign_span(&mut self, parents: &[LV], agent: AgentId, num: usize) -> LVRange {
        debug_assert!(num > 0);
        let start = self.len();
        let span = LVRange::new_from_len(start, num);

        self.agent_assignment.assign_next_lv_span(agent, span);
        self.graph.push(parents, span);
        self.version.advance_by_known_run(parents, span);

        span
    }

    /// Merge a run of operations which might already (partially) be known.
    ///
    /// Returns the range of local versions actually inserted. An empty
    /// range means the whole run was a duplicate.
    ///
    /// Three cases:
    /// 1. The run is entirely known: nothing happens.
    /// 2. The run is entirely new (the common case): append all of it.
    /// 3. The runs overlap. The overlap must be a prefix of the incoming
    ///    run, since every operation's parents must precede it. Trim the
    ///    known prefix and append the rest, parented at the prefix's end.
    pub fn merge_and_assign(&mut self, parents: &[LV], span: AgentSpan) -> LVRange {
        let lv_start = self.len();

        let client_data = &mut self.agent_assignment.client_data[span.agent as usize];

        match client_data.lv_for_seq.find_index(span.seq_range.last()) {
            Ok(_idx) => {
                // We already have the final seq, so we have the whole run.
                LVRange::new(lv_start, lv_start)
            }
            Err(idx) => {
                if idx >= 1 {
                    let prev_entry = &mut client_data.lv_for_seq.0[idx - 1];
                    let previous_end = prev_entry.end();

                    if previous_end >= span.seq_range.start {
                        // Case 3. Trim the known prefix off the incoming
                        // run. When there's a real overlap, the tail's
                        // parent is the prefix's last op.
                        let actual_len = span.seq_range.end - previous_end;
                        let lv_span = LVRange::new_from_len(lv_start, actual_len);
                        let new_entry = KVPair(previous_end, lv_span);

                        let parents_override = if previous_end > span.seq_range.start {
                            Some(prev_entry.1.last())
                        } else {
                            None
                        };

                        self.agent_assignment.client_with_lv.push(KVPair(lv_start, AgentSpan {
                            agent: span.agent,
                            seq_range: LVRange::new(previous_end, span.seq_range.end),
                        }));

                        let client_data = &mut self.agent_assignment.client_data[span.agent as usize];
                        let prev_entry = &mut client_data.lv_for_seq.0[idx - 1];
                        if prev_entry.can_append(&new_entry) {
                            prev_entry.append(new_entry);
                        } else {
                            client_data.lv_for_seq.0.insert(idx, new_entry);
                        }

                        let parents: &[LV] = match &parents_override {
                            Some(p) => std::slice::from_ref(p),
                            None => parents,
                        };
                        self.graph.push(parents, lv_span);
                        self.version.advance_by_known_run(parents, lv_span);
                        return lv_span;
                    }
                }

                // Case 2; nothing to trim.
                let lv_span = LVRange::new_from_len(lv_start, span.len());
                client_data.lv_for_seq.0.insert(idx, KVPair(span.seq_range.start, lv_span));
                self.agent_assignment.client_with_lv.push(KVPair(lv_start, span));
                self.graph.push(parents, lv_span);
                self.version.advance_by_known_run(parents, lv_span);
                lv_span
            }
        }
    }

    /// Iterate full causal graph entries (agent assignment + parents)
    /// covering the requested range, in ascending order.
    pub fn iter_range(&self, range: LVRange) -> impl Iterator<Item=CGEntry> + '_ {
        self.graph.iter_range(range).flat_map(move |run| {
            // A graph run can span several agent assignment runs. Emit one
            // entry per assignment chunk; chunks after the first follow
            // sequentially from their predecessor.
            let mut entries: SmallVec<[CGEntry; 2]> = SmallVec::new();
            let mut parents = Some(run.parents);

            for KVPair(start, span) in self.agent_assignment.client_with_lv.iter_range(run.span) {
                let parents = parents.take()
                    .unwrap_or_else(|| Frontier::new_1(start - 1));
                entries.push(CGEntry { start, parents, span });
            }

            debug_assert_eq!(
                entries.iter().map(|e| e.len()).sum::<usize>(),
                run.span.len()
            );
            entries
        })
    }

    pub fn iter(&self) -> impl Iterator<Item=CGEntry> + '_ {
        self.iter_range(LVRange::new(0, self.len()))
    }
}

impl PartialEq for CausalGraph {
    /// Graph equality compares *contents*, not local version assignment:
    /// two graphs are equal if they contain the same operations with the
    /// same identities and (remote) parents. Local versions can legally be
    /// assigned in a different order on each peer.
    ///
    /// This is O(n log n) per version; only suitable for tests and checks.
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() { return false; }

        let remote_parents = |cg: &Self, v: LV| -> Vec<(SmartString, usize)> {
            let mut ps: Vec<_> = cg.graph.parents_at(v).iter()
                .map(|&p| {
                    let (agent, seq) = cg.agent_assignment.lv_to_agent_version(p).unwrap();
                    (SmartString::from(cg.agent_name(agent)), seq)
                })
                .collect();
            ps.sort_unstable();
            ps
        };

        for v in 0..self.len() {
            let (agent, seq) = self.agent_assignment.lv_to_agent_version(v).unwrap();
            let name = self.agent_name(agent);

            let Some(other_agent) = other.get_agent_id(name) else { return false; };
            let Some(other_v) = other.try_agent_version_to_lv((other_agent, seq)) else {
                return false;
            };

            if remote_parents(self, v) != remote_parents(other, other_v) {
                return false;
            }
        }

        true
    }
}

impl Eq for CausalGraph {}
