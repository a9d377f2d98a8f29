//! Version summaries: the compact "what have you got?" half of a sync
//! handshake.
//!
//! A summary lists, per agent, which seq ranges a peer knows about. A peer
//! receiving a summary intersects it with its own causal graph to find the
//! most recent common version, then sends a diff from there.

use smallvec::SmallVec;
use smartstring::alias::String as SmartString;

use crate::{CausalGraph, Frontier, LV};
use crate::lvrange::LVRange;
use crate::rle::{HasLength, MergeableIterator};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VSEntry {
    pub name: SmartString,
    /// Seq ranges known for this agent, run-length merged, ascending.
    pub seq_ranges: SmallVec<[LVRange; 2]>,
}

/// For each known agent, the seq ranges a peer has observed.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VersionSummary(pub Vec<VSEntry>);

impl CausalGraph {
    pub fn summarize(&self) -> VersionSummary {
        VersionSummary(self.agent_assignment.client_data.iter()
            .filter(|c| !c.is_empty())
            .map(|c| {
                VSEntry {
                    name: c.name.clone(),
                    seq_ranges: c.lv_for_seq
                        .iter()
                        .map(|e| LVRange::new_from_len(e.0, e.1.len()))
                        .merge_spans()
                        .collect(),
                }
            })
            .collect())
    }

    /// Find the frontier of the operations both this graph and the
    /// summarized peer know about.
    ///
    /// Returns the root frontier when there's no overlap at all.
    pub fn intersect_with_summary(&self, summary: &VersionSummary) -> Frontier {
        let mut common_tips: Vec<LV> = vec![];

        for entry in &summary.0 {
            let Some(agent) = self.get_agent_id(&entry.name) else { continue; };
            let client = &self.agent_assignment.client_data[agent as usize];

            for &seq_range in &entry.seq_ranges {
                // Each locally-known chunk of this seq range contributes its
                // versions to the common set. Split chunks at graph entry
                // boundaries so each tip dominates its whole chunk.
                for pair in client.lv_for_seq.iter_range(seq_range) {
                    for run in self.graph.iter_range(pair.1) {
                        common_tips.push(run.span.last());
                    }
                }
            }
        }

        self.graph.find_dominators_unsorted(&common_tips)
    }
}
