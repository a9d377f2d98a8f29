//! Conversion between remote (agent, seq) identifiers and local versions.
//!
//! Local versions are compact but process-local. Anything leaving the
//! process - sync messages, persisted diffs, version stamps - speaks in
//! remote versions instead.

use smallvec::SmallVec;
use smartstring::alias::String as SmartString;

use crate::{CausalGraph, Frontier, LV, OpLogError, Result};
use crate::lvrange::LVRange;
use crate::rle::{HasLength, MergableSpan, SplitableSpan};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An (agent, seq) pair, as shared with other peers.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RemoteVersion(pub SmartString, pub usize);

impl<S: Into<SmartString>> From<(S, usize)> for RemoteVersion {
    fn from((agent, seq): (S, usize)) -> Self {
        Self(agent.into(), seq)
    }
}

impl RemoteVersion {
    pub fn agent(&self) -> &str {
        self.0.as_str()
    }

    pub fn seq(&self) -> usize {
        self.1
    }
}

/// A run of sequential seqs from one agent, as shared with other peers.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RemoteVersionSpan(pub SmartString, pub LVRange);

impl HasLength for RemoteVersionSpan {
    fn len(&self) -> usize {
        self.1.len()
    }
}

impl SplitableSpan for RemoteVersionSpan {
    fn truncate(&mut self, at: usize) -> Self {
        Self(self.0.clone(), self.1.truncate(at))
    }
}

impl MergableSpan for RemoteVersionSpan {
    fn can_append(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1.can_append(&other.1)
    }

    fn append(&mut self, other: Self) {
        self.1.append(other.1)
    }
}

/// A frontier expressed in remote versions.
pub type RemoteFrontier = SmallVec<[RemoteVersion; 2]>;

impl CausalGraph {
    pub fn try_remote_to_local_version(&self, rv: &RemoteVersion) -> Option<LV> {
        let agent = self.get_agent_id(rv.agent())?;
        self.agent_assignment.client_data[agent as usize].try_seq_to_lv(rv.seq())
    }

    pub fn remote_to_local_version(&self, rv: &RemoteVersion) -> Result<LV> {
        self.try_remote_to_local_version(rv).ok_or(OpLogError::UnknownId)
    }

    pub fn local_to_remote_version(&self, v: LV) -> Result<RemoteVersion> {
        let (agent, seq) = self.agent_assignment.lv_to_agent_version(v)?;
        Ok(RemoteVersion(self.agent_name(agent).into(), seq))
    }

    /// Note the returned span will be truncated at assignment boundaries,
    /// so it might be shorter than the input.
    pub fn local_to_remote_version_span(&self, v: LVRange) -> Result<RemoteVersionSpan> {
        if v.start >= self.len() { return Err(OpLogError::UnknownVersion); }
        let span = self.agent_assignment.lv_span_to_agent_span(v);
        Ok(RemoteVersionSpan(self.agent_name(span.agent).into(), span.seq_range))
    }

    pub fn remote_to_local_frontier<'a, I>(&self, rvs: I) -> Result<Frontier>
        where I: Iterator<Item=&'a RemoteVersion>
    {
        let mut frontier = Frontier::root();
        for rv in rvs {
            // from_unsorted semantics: remote frontiers arrive in arbitrary
            // order.
            let v = self.remote_to_local_version(rv)?;
            if !frontier.0.contains(&v) {
                frontier.0.push(v);
            }
        }
        frontier.0.sort_unstable();
        Ok(frontier)
    }

    pub fn local_to_remote_frontier(&self, local_frontier: &[LV]) -> Result<RemoteFrontier> {
        local_frontier
            .iter()
            .map(|&v| self.local_to_remote_version(v))
            .collect()
    }
}
