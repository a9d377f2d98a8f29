use crate::{Frontier, LV};
use crate::causalgraph::agent_span::AgentSpan;
use crate::lvrange::LVRange;
use crate::rle::{HasLength, MergableSpan};

/// One run of the causal graph with everything a peer needs to mirror it:
/// the agent assignment for the run plus the parents of its first version.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CGEntry {
    pub start: LV,
    pub parents: Frontier,
    pub span: AgentSpan,
}

impl Default for CGEntry {
    fn default() -> Self {
        CGEntry {
            start: 0,
            parents: Frontier::root(),
            span: AgentSpan { agent: 0, seq_range: (0..0).into() },
        }
    }
}

impl HasLength for CGEntry {
    fn len(&self) -> usize {
        self.span.len()
    }
}

impl MergableSpan for CGEntry {
    fn can_append(&self, other: &Self) -> bool {
        let end = self.start + self.len();
        end == other.start
            && other.parents_are_trivial()
            && self.span.can_append(&other.span)
    }

    fn append(&mut self, other: Self) {
        // The other entry's parents are implied by adjacency.
        self.span.append(other.span);
    }
}

impl CGEntry {
    pub fn parents_are_trivial(&self) -> bool {
        self.parents.len() == 1
            && self.parents[0] == self.start - 1
    }

    pub fn time_span(&self) -> LVRange {
        LVRange::new_from_len(self.start, self.len())
    }

    pub fn last(&self) -> LV {
        self.time_span().last()
    }
}
