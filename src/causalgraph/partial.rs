//! The wire form of a causal graph diff.
//!
//! A diff is an ordered list of entries, one per run of operations. Parents
//! are named by remote version so the receiving peer can resolve them into
//! its own local versions. Within one diff, every parent refers either to an
//! entry earlier in the same diff or to something the receiver already has.
//!
//! Applying a diff is idempotent: entries which are already (partially)
//! known get trimmed down to their new suffix, or dropped entirely.

use smallvec::SmallVec;
use smartstring::alias::String as SmartString;

use crate::{CausalGraph, LV, OpLogError, RemoteVersion, Result};
use crate::causalgraph::agent_span::AgentSpan;
use crate::lvrange::LVRange;
use crate::rle::HasLength;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One record of a serialized causal graph diff.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PartialCGEntry {
    pub agent: SmartString,
    pub seq: usize,
    pub len: usize,
    pub parents: SmallVec<[RemoteVersion; 2]>,
}

impl PartialCGEntry {
    fn seq_range(&self) -> LVRange {
        LVRange::new_from_len(self.seq, self.len)
    }
}

impl CausalGraph {
    /// Serialize the named ranges of this graph for transmission. Ranges
    /// must be ascending and refer to known versions.
    pub fn serialize_diff(&self, ranges: &[LVRange]) -> Result<Vec<PartialCGEntry>> {
        let mut entries = Vec::new();

        for &range in ranges {
            if range.end > self.len() { return Err(OpLogError::UnknownVersion); }

            for e in self.iter_range(range) {
                let parents = e.parents.iter()
                    .map(|&p| self.local_to_remote_version(p))
                    .collect::<Result<_>>()?;

                entries.push(PartialCGEntry {
                    agent: self.agent_name(e.span.agent).into(),
                    seq: e.span.seq_range.start,
                    len: e.span.len(),
                    parents,
                });
            }
        }

        Ok(entries)
    }

    /// Serialize the entire graph. Replaying this into an empty graph (via
    /// merge_partial_versions) reproduces it - that's how callers persist.
    pub fn serialize_everything(&self) -> Result<Vec<PartialCGEntry>> {
        self.serialize_diff(&[LVRange::new(0, self.len())])
    }

    /// Apply a serialized diff. Returns the range of local versions
    /// assigned; empty if everything was already known.
    ///
    /// Fails with MissingParents (without modifying the graph) if any entry
    /// names a parent which is neither known locally nor introduced earlier
    /// in the diff.
    pub fn merge_partial_versions(&mut self, entries: &[PartialCGEntry]) -> Result<LVRange> {
        self.check_partial_entries(entries)?;

        let start = self.len();

        for e in entries {
            let agent = self.get_or_create_agent_id(&e.agent);

            let mut parents = SmallVec::<[LV; 2]>::new();
            for p in &e.parents {
                // Resolvable thanks to the check above; earlier entries in
                // this diff have been merged by now.
                parents.push(self.remote_to_local_version(p)?);
            }
            parents.sort_unstable();

            self.merge_and_assign(&parents, AgentSpan {
                agent,
                seq_range: e.seq_range(),
            });
        }

        Ok(LVRange::new(start, self.len()))
    }

    /// The validation half of merge_partial_versions. Nothing is mutated,
    /// so a failing diff leaves the graph untouched.
    fn check_partial_entries(&self, entries: &[PartialCGEntry]) -> Result<()> {
        let known_in_diff = |upto: usize, rv: &RemoteVersion| -> bool {
            entries[..upto].iter().any(|e| {
                e.agent == rv.0 && e.seq_range().contains(rv.1)
            })
        };

        for (i, e) in entries.iter().enumerate() {
            if e.len == 0 { return Err(OpLogError::InvalidLength); }

            for p in &e.parents {
                if self.try_remote_to_local_version(p).is_none() && !known_in_diff(i, p) {
                    return Err(OpLogError::MissingParents);
                }
            }
        }

        Ok(())
    }
}
