use std::collections::HashMap;

use roaring::RoaringBitmap;
use tracing::debug;

use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::{InvertedIndex, TermInfo};
use crate::matcher::{BoxMatcher, FilterMatcher, PostingMatcher};
use crate::reader::{IndexReader, scan_terms_within};
use crate::search::fuzzy::FuzzyAutomaton;
use crate::search::graph::WordGraph;

/// Reader over a single in-memory index snapshot plus a set of deleted
/// documents. Owns a per-field word graph built at construction for the
/// fast fuzzy-expansion path.
pub struct SegmentReader {
    index: InvertedIndex,
    deleted: RoaringBitmap,
    graphs: HashMap<String, WordGraph>,
}

impl SegmentReader {
    pub fn new(index: InvertedIndex) -> Self {
        Self::with_deletions(index, RoaringBitmap::new())
    }

    pub fn with_deletions(index: InvertedIndex, deleted: RoaringBitmap) -> Self {
        let mut field_terms: HashMap<String, Vec<(String, u32)>> = HashMap::new();
        for (field, term) in index.all_terms() {
            let doc_freq = index
                .term_info(field, term)
                .map(|info| info.doc_frequency())
                .unwrap_or(0);
            field_terms
                .entry(field.to_string())
                .or_default()
                .push((term.to_string(), doc_freq));
        }

        let mut graphs = HashMap::new();
        for (field, terms) in field_terms {
            match WordGraph::build(terms.into_iter()) {
                Ok(graph) => {
                    graphs.insert(field, graph);
                }
                Err(err) => {
                    debug!(field, %err, "skipping word graph for field");
                }
            }
        }

        SegmentReader { index, deleted, graphs }
    }

    /// Fast `terms_within` through the field's word graph; `NoWordGraph`
    /// when the field has none, recovered by the caller.
    fn graph_terms_within(
        &self,
        field: &str,
        text: &str,
        max_dist: u32,
        prefix: usize,
    ) -> Result<Vec<String>> {
        if max_dist > FuzzyAutomaton::MAX_DFA_DISTANCE as u32 {
            return Err(Error::query(format!(
                "edit distance {} beyond automaton support",
                max_dist
            )));
        }
        let graph = self
            .graphs
            .get(field)
            .ok_or_else(|| Error::no_word_graph(field))?;
        let automaton = FuzzyAutomaton::build(text, max_dist as u8);
        let prefix_str: String = text.chars().take(prefix).collect();
        Ok(graph
            .terms_matching(automaton.dfa())
            .into_iter()
            .filter(|word| word.starts_with(&prefix_str))
            .collect())
    }
}

impl IndexReader for SegmentReader {
    fn contains_term(&self, field: &str, text: &str) -> bool {
        self.index.contains(field, text)
    }

    fn all_terms(&self) -> Box<dyn Iterator<Item = (String, String)> + '_> {
        Box::new(
            self.index
                .all_terms()
                .map(|(f, t)| (f.to_string(), t.to_string())),
        )
    }

    fn terms_from(&self, field: &str, prefix: &str) -> Box<dyn Iterator<Item = (String, String)> + '_> {
        Box::new(
            self.index
                .terms_from(field, prefix)
                .map(|(f, t)| (f.to_string(), t.to_string())),
        )
    }

    fn iter_from(
        &self,
        field: &str,
        text: &str,
    ) -> Box<dyn Iterator<Item = ((String, String), TermInfo)> + '_> {
        Box::new(
            self.index
                .iter_from(field, text)
                .map(|((f, t), info)| ((f.to_string(), t.to_string()), info.clone())),
        )
    }

    fn term_info(&self, field: &str, text: &str) -> Result<TermInfo> {
        self.index
            .term_info(field, text)
            .cloned()
            .ok_or_else(|| Error::term_not_found(field, text))
    }

    fn postings(&self, field: &str, text: &str) -> Result<BoxMatcher<'_>> {
        let list = self
            .index
            .postings(field, text)
            .ok_or_else(|| Error::term_not_found(field, text))?;
        let matcher: BoxMatcher<'_> = Box::new(PostingMatcher::new(&list.postings));
        if self.deleted.is_empty() {
            Ok(matcher)
        } else {
            Ok(Box::new(FilterMatcher::new(matcher, self.deleted.clone(), true)))
        }
    }

    fn vector(&self, doc_id: DocId, field: &str) -> Result<Vec<(String, Vec<u32>)>> {
        self.index
            .vector(doc_id, field)
            .map(|v| v.to_vec())
            .ok_or_else(|| {
                Error::query(format!("no term vector for document {} in field {}", doc_id, field))
            })
    }

    fn has_vector(&self, doc_id: DocId, field: &str) -> bool {
        self.index.vector(doc_id, field).is_some()
    }

    fn stores_positions(&self, field: &str) -> bool {
        self.index
            .field_options(field)
            .map(|options| options.positions)
            .unwrap_or(false)
    }

    fn stores_vectors(&self, field: &str) -> bool {
        self.index
            .field_options(field)
            .map(|options| options.vectors)
            .unwrap_or(false)
    }

    fn doc_count_all(&self) -> u32 {
        self.index.doc_count()
    }

    fn doc_count(&self) -> u32 {
        self.index.doc_count() - self.deleted.len() as u32
    }

    fn has_deletions(&self) -> bool {
        !self.deleted.is_empty()
    }

    fn is_deleted(&self, doc_id: DocId) -> bool {
        self.deleted.contains(doc_id.0)
    }

    fn deleted_docs(&self) -> RoaringBitmap {
        self.deleted.clone()
    }

    fn field_length(&self, field: &str) -> u64 {
        self.index.field_length(field)
    }

    fn min_field_length(&self, field: &str) -> u32 {
        self.index.min_field_length(field)
    }

    fn max_field_length(&self, field: &str) -> u32 {
        self.index.max_field_length(field)
    }

    fn doc_field_length(&self, doc_id: DocId, field: &str) -> u32 {
        self.index.doc_field_length(doc_id, field)
    }

    fn first_id(&self, field: &str, text: &str) -> Result<DocId> {
        let list = self
            .index
            .postings(field, text)
            .ok_or_else(|| Error::term_not_found(field, text))?;
        for posting in &list.postings {
            if !self.deleted.contains(posting.doc_id.0) {
                return Ok(posting.doc_id);
            }
        }
        Err(Error::term_not_found(field, text))
    }

    fn has_word_graph(&self, field: &str) -> bool {
        self.graphs.contains_key(field)
    }

    fn terms_within(&self, field: &str, text: &str, max_dist: u32, prefix: usize) -> Vec<String> {
        match self.graph_terms_within(field, text, max_dist, prefix) {
            Ok(words) => words,
            Err(err) => {
                debug!(field, %err, "word graph unavailable, scanning lexicon");
                scan_terms_within(self, field, text, max_dist, prefix)
            }
        }
    }
}

/// The reader for an empty index.
pub struct EmptyReader;

impl IndexReader for EmptyReader {
    fn contains_term(&self, _field: &str, _text: &str) -> bool {
        false
    }

    fn all_terms(&self) -> Box<dyn Iterator<Item = (String, String)> + '_> {
        Box::new(std::iter::empty())
    }

    fn term_info(&self, field: &str, text: &str) -> Result<TermInfo> {
        Err(Error::term_not_found(field, text))
    }

    fn postings(&self, field: &str, text: &str) -> Result<BoxMatcher<'_>> {
        Err(Error::term_not_found(field, text))
    }

    fn vector(&self, doc_id: DocId, field: &str) -> Result<Vec<(String, Vec<u32>)>> {
        Err(Error::query(format!("no term vector for document {} in field {}", doc_id, field)))
    }

    fn has_vector(&self, _doc_id: DocId, _field: &str) -> bool {
        false
    }

    fn stores_positions(&self, _field: &str) -> bool {
        false
    }

    fn stores_vectors(&self, _field: &str) -> bool {
        false
    }

    fn doc_count_all(&self) -> u32 {
        0
    }

    fn doc_count(&self) -> u32 {
        0
    }

    fn has_deletions(&self) -> bool {
        false
    }

    fn is_deleted(&self, _doc_id: DocId) -> bool {
        false
    }

    fn deleted_docs(&self) -> RoaringBitmap {
        RoaringBitmap::new()
    }

    fn field_length(&self, _field: &str) -> u64 {
        0
    }

    fn min_field_length(&self, _field: &str) -> u32 {
        0
    }

    fn max_field_length(&self, _field: &str) -> u32 {
        0
    }

    fn doc_field_length(&self, _doc_id: DocId, _field: &str) -> u32 {
        0
    }
}
