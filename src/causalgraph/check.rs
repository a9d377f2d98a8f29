use crate::CausalGraph;
use crate::rle::RleSpanHelpers;

impl CausalGraph {
    /// Validate every internal invariant. Panics on the first violation.
    /// Used liberally by tests and the fuzzers; too slow for real use.
    #[allow(unused)]
    pub fn dbg_check(&self, deep: bool) {
        if deep {
            self.graph.dbg_check();
        }

        assert_eq!(self.agent_assignment.len(), self.graph.next_lv());

        // The lv -> agent mapping must agree with each agent's seq index.
        self.agent_assignment.client_with_lv.check_packed();

        for pair in self.agent_assignment.client_with_lv.iter() {
            let span = pair.1;
            let client = &self.agent_assignment.client_data[span.agent as usize];
            let (entry, offset) = client.lv_for_seq
                .find_with_offset(span.seq_range.start)
                .unwrap();
            assert_eq!(entry.1.start + offset, pair.0);

            // The whole span must be covered contiguously.
            let covered = client.try_seq_to_lv_span(span.seq_range).unwrap();
            assert_eq!(covered, pair.span());
        }

        if deep {
            // And the other way around.
            for (agent, client) in self.agent_assignment.client_data.iter().enumerate() {
                for entry in client.lv_for_seq.iter() {
                    let (found, offset) = self.agent_assignment.client_with_lv
                        .find_with_offset(entry.1.start)
                        .unwrap();
                    assert_eq!(found.1.agent as usize, agent);
                    assert_eq!(found.1.seq_range.start + offset, entry.0);
                }
            }
        }

        assert_eq!(self.version, self.graph.dbg_get_frontier_inefficiently());
    }
}
