//! The bidirectional mapping between (agent, seq) pairs and local versions.

use std::cmp::Ordering;

use smartstring::alias::String as SmartString;

use crate::{AgentId, LV, OpLogError, Result};
use crate::causalgraph::agent_span::{AgentSpan, AgentVersion};
use crate::lvrange::LVRange;
use crate::rle::{HasLength, KVPair, RleVec, Searchable};

/// Everything we know about one agent.
#[derive(Clone, Debug, Default)]
pub(crate) struct ClientData {
    pub(crate) name: SmartString,

    /// The agent's operations, keyed by seq, mapping to spans of local
    /// versions.
    ///
    /// An agent's changes will *almost* always land in monotonically
    /// increasing LV order, but not quite always: the same agent can commit
    /// to two concurrent branches, and those branches can arrive here in
    /// either order. So this list is sorted by seq, and seq-adjacent entries
    /// only merge when their LV spans are adjacent too.
    pub(crate) lv_for_seq: RleVec<KVPair<LVRange>>,
}

impl ClientData {
    /// The smallest seq this agent hasn't used yet.
    pub fn next_seq(&self) -> usize {
        self.lv_for_seq.end()
    }

    pub fn is_empty(&self) -> bool {
        self.lv_for_seq.is_empty()
    }

    #[inline]
    pub(crate) fn try_seq_to_lv(&self, seq: usize) -> Option<LV> {
        let (entry, offset) = self.lv_for_seq.find_with_offset(seq)?;
        Some(entry.1.start + offset)
    }

    /// Note the returned span may be shorter than the seq range requested.
    pub(crate) fn try_seq_to_lv_span(&self, seq_range: LVRange) -> Option<LVRange> {
        let (KVPair(_, entry), offset) = self.lv_for_seq.find_with_offset(seq_range.start)?;

        let start = entry.start + offset;
        let end = usize::min(entry.end, start + seq_range.len());
        Some(LVRange { start, end })
    }
}

/// The assignment of local versions to (agent, seq) pairs, in both
/// directions.
#[derive(Debug, Clone, Default)]
pub struct AgentAssignment {
    /// Packed spans of (LV range -> agent span). Maps local versions to
    /// agent versions.
    pub(crate) client_with_lv: RleVec<KVPair<AgentSpan>>,

    /// Per-agent data, indexed by AgentId. Maps agent versions back to local
    /// versions.
    pub(crate) client_data: Vec<ClientData>,
}

impl AgentAssignment {
    pub fn new() -> Self { Self::default() }

    pub fn get_agent_id(&self, name: &str) -> Option<AgentId> {
        self.client_data.iter()
            .position(|client_data| client_data.name == name)
            .map(|id| id as AgentId)
    }

    pub fn get_or_create_agent_id(&mut self, name: &str) -> AgentId {
        if let Some(id) = self.get_agent_id(name) {
            id
        } else {
            self.client_data.push(ClientData {
                name: SmartString::from(name),
                lv_for_seq: RleVec::new(),
            });
            (self.client_data.len() - 1) as AgentId
        }
    }

    pub fn agent_name(&self, agent: AgentId) -> &str {
        self.client_data[agent as usize].name.as_str()
    }

    /// The number of local versions assigned so far.
    pub fn len(&self) -> usize {
        self.client_with_lv.end()
    }

    pub fn is_empty(&self) -> bool {
        self.client_with_lv.is_empty()
    }

    /// The next seq which is valid for this agent. 0 for unseen agents.
    pub fn next_seq_for_agent(&self, agent: AgentId) -> usize {
        self.client_data.get(agent as usize)
            .map_or(0, |c| c.next_seq())
    }

    pub fn lv_to_agent_version(&self, v: LV) -> Result<AgentVersion> {
        let (entry, offset) = self.client_with_lv.find_with_offset(v)
            .ok_or(OpLogError::UnknownVersion)?;
        Ok(entry.1.at_offset(offset))
    }

    /// Map a span of local versions to an agent span. The result may be
    /// shorter than the input if the input crosses an assignment boundary.
    pub(crate) fn lv_span_to_agent_span(&self, v: LVRange) -> AgentSpan {
        let (entry, offset) = self.client_with_lv.find_packed_with_offset(v.start);
        let start = entry.1.seq_range.start + offset;
        let end = usize::min(entry.1.seq_range.end, start + v.len());
        AgentSpan {
            agent: entry.1.agent,
            seq_range: LVRange { start, end },
        }
    }

    pub fn try_agent_version_to_lv(&self, (agent, seq): AgentVersion) -> Option<LV> {
        self.client_data.get(agent as usize)
            .and_then(|c| c.try_seq_to_lv(seq))
    }

    pub fn agent_version_to_lv(&self, v: AgentVersion) -> Result<LV> {
        self.try_agent_version_to_lv(v).ok_or(OpLogError::UnknownId)
    }

    /// Assign the next run of local versions to the named agent. The span
    /// must start at the current end of the assignment.
    pub(crate) fn assign_next_lv_span(&mut self, agent: AgentId, span: LVRange) {
        debug_assert_eq!(span.start, self.len());

        let client_data = &mut self.client_data[agent as usize];

        let next_seq = client_data.next_seq();
        client_data.lv_for_seq.push(KVPair(next_seq, span));

        self.client_with_lv.push(KVPair(span.start, AgentSpan {
            agent,
            seq_range: LVRange { start: next_seq, end: next_seq + span.len() },
        }));
    }

    /// Concurrent items are ordered by (agent name, seq). The ordering must
    /// not depend on local versions, since those differ between peers.
    pub(crate) fn tie_break_agent_versions(&self, v1: AgentVersion, v2: AgentVersion) -> Ordering {
        if v1 == v2 { Ordering::Equal }
        else {
            let c1 = &self.client_data[v1.0 as usize];
            let c2 = &self.client_data[v2.0 as usize];

            c1.name.cmp(&c2.name)
                .then(v1.1.cmp(&v2.1))
        }
    }

    pub(crate) fn tie_break_versions(&self, v1: LV, v2: LV) -> Result<Ordering> {
        if v1 == v2 { Ok(Ordering::Equal) }
        else {
            Ok(self.tie_break_agent_versions(
                self.lv_to_agent_version(v1)?,
                self.lv_to_agent_version(v2)?,
            ))
        }
    }
}
