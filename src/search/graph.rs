use fst::{Automaton, IntoStreamer, Map, MapBuilder, Streamer};
use levenshtein_automata::{DFA, Distance, SINK_STATE};

use crate::core::error::Result;

/// FST over the terms of one field, mapping term -> document frequency.
/// Backs the fast `terms_within` path on segment readers.
pub struct WordGraph {
    fst: Map<Vec<u8>>,
}

impl WordGraph {
    /// Build from terms. FST construction requires sorted input.
    pub fn build<I>(terms: I) -> Result<Self>
    where
        I: Iterator<Item = (String, u32)>,
    {
        let mut sorted: Vec<(String, u32)> = terms.collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut builder = MapBuilder::memory();
        for (term, doc_freq) in sorted {
            builder.insert(term.as_bytes(), doc_freq as u64)?;
        }
        Ok(WordGraph { fst: builder.into_map() })
    }

    pub fn len(&self) -> usize {
        self.fst.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fst.is_empty()
    }

    /// Terms accepted by the DFA, in lexicographic order.
    pub fn terms_matching(&self, dfa: &DFA) -> Vec<String> {
        let mut results = Vec::new();
        let mut stream = self.fst.search(DfaAutomaton(dfa)).into_stream();
        while let Some((term, _doc_freq)) = stream.next() {
            results.push(String::from_utf8_lossy(term).into_owned());
        }
        results
    }
}

/// Adapter running a Levenshtein DFA over FST transitions.
struct DfaAutomaton<'a>(&'a DFA);

impl Automaton for DfaAutomaton<'_> {
    type State = u32;

    fn start(&self) -> u32 {
        self.0.initial_state()
    }

    fn is_match(&self, state: &u32) -> bool {
        matches!(self.0.distance(*state), Distance::Exact(_))
    }

    fn can_match(&self, state: &u32) -> bool {
        *state != SINK_STATE
    }

    fn accept(&self, state: &u32, byte: u8) -> u32 {
        self.0.transition(*state, byte)
    }
}
