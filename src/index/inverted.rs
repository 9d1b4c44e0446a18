use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use crate::core::types::DocId;

/// Per-field indexing options. Phrase matching needs positions from one of
/// the two sources; which one is available decides the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOptions {
    /// Store token positions inside postings.
    pub positions: bool,
    /// Store a per-document term vector (term -> positions).
    pub vectors: bool,
}

impl Default for FieldOptions {
    fn default() -> Self {
        FieldOptions { positions: true, vectors: false }
    }
}

/// A single entry in a posting list.
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub doc_id: DocId,
    /// Term frequency in the document.
    pub weight: f32,
    /// Token positions, present when the field stores positions.
    pub positions: Vec<u32>,
}

/// Statistics about a term, accumulated posting by posting. Useful for
/// size estimation and scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct TermInfo {
    weight: f64,
    doc_freq: u32,
    min_length: u32,
    max_length: u32,
    max_weight: f32,
    min_id: DocId,
    max_id: DocId,
}

impl TermInfo {
    pub fn new() -> Self {
        TermInfo {
            weight: 0.0,
            doc_freq: 0,
            min_length: u32::MAX,
            max_length: 0,
            max_weight: 0.0,
            min_id: DocId(u32::MAX),
            max_id: DocId(0),
        }
    }

    pub fn add_posting(&mut self, doc_id: DocId, weight: f32, length: u32) {
        if self.doc_freq == 0 {
            self.min_id = doc_id;
        }
        self.max_id = doc_id;
        self.weight += weight as f64;
        self.doc_freq += 1;
        self.max_weight = self.max_weight.max(weight);
        self.min_length = self.min_length.min(length);
        self.max_length = self.max_length.max(length);
    }

    /// Total frequency of the term across all documents.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Number of documents the term appears in.
    pub fn doc_frequency(&self) -> u32 {
        self.doc_freq
    }

    /// Length of the shortest field value the term appears in.
    pub fn min_length(&self) -> u32 {
        self.min_length
    }

    /// Length of the longest field value the term appears in.
    pub fn max_length(&self) -> u32 {
        self.max_length
    }

    /// Frequency of the term in the document where it appears the most.
    pub fn max_weight(&self) -> f32 {
        self.max_weight
    }

    /// Lowest document id the term appears in.
    pub fn min_id(&self) -> DocId {
        self.min_id
    }

    /// Highest document id the term appears in.
    pub fn max_id(&self) -> DocId {
        self.max_id
    }

    /// The same statistics with document ids shifted by a segment base.
    pub fn offset(mut self, base: u32) -> TermInfo {
        self.min_id = DocId(self.min_id.0 + base);
        self.max_id = DocId(self.max_id.0 + base);
        self
    }

    /// Fold another (already offset) segment's statistics into this one.
    pub fn combine(&mut self, other: &TermInfo) {
        self.weight += other.weight;
        self.doc_freq += other.doc_freq;
        self.min_length = self.min_length.min(other.min_length);
        self.max_length = self.max_length.max(other.max_length);
        self.max_weight = self.max_weight.max(other.max_weight);
        self.min_id = self.min_id.min(other.min_id);
        self.max_id = self.max_id.max(other.max_id);
    }
}

impl Default for TermInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// Posting list for a term.
/// Note: sorted by doc_id, which `add_document`'s monotonic id assignment
/// guarantees.
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    pub postings: Vec<Posting>,
    pub info: TermInfo,
}

impl PostingList {
    pub fn doc_freq(&self) -> u32 {
        self.postings.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }
}

/// In-memory inverted index over fielded documents. This is the snapshot
/// state a `SegmentReader` serves from; segment formats on disk live
/// elsewhere.
pub struct InvertedIndex {
    /// Sorted (field, term) dictionary, backing lexicographic iteration.
    terms: BTreeMap<(String, String), PostingList>,
    fields: HashMap<String, FieldOptions>,
    field_lengths: HashMap<String, u64>,
    field_length_bounds: HashMap<String, (u32, u32)>,
    doc_field_lengths: HashMap<(u32, String), u32>,
    /// Per-document term vectors for fields with `vectors: true`,
    /// sorted by term.
    vectors: HashMap<(u32, String), Vec<(String, Vec<u32>)>>,
    doc_count: u32,
}

impl InvertedIndex {
    pub fn new() -> Self {
        InvertedIndex {
            terms: BTreeMap::new(),
            fields: HashMap::new(),
            field_lengths: HashMap::new(),
            field_length_bounds: HashMap::new(),
            doc_field_lengths: HashMap::new(),
            vectors: HashMap::new(),
            doc_count: 0,
        }
    }

    /// Register a field with explicit options. Fields seen first in
    /// `add_document` default to positions-in-postings.
    pub fn define_field(&mut self, name: &str, options: FieldOptions) {
        self.fields.insert(name.to_string(), options);
    }

    pub fn field_options(&self, field: &str) -> Option<FieldOptions> {
        self.fields.get(field).copied()
    }

    /// Index one document; token order defines positions. Returns the
    /// assigned document id.
    pub fn add_document(&mut self, doc: &[(&str, &[&str])]) -> DocId {
        let doc_id = DocId(self.doc_count);
        self.doc_count += 1;

        for (field, tokens) in doc {
            let options = *self
                .fields
                .entry(field.to_string())
                .or_insert_with(FieldOptions::default);
            let length = tokens.len() as u32;

            let mut term_positions: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
            for (position, &token) in tokens.iter().enumerate() {
                term_positions.entry(token).or_default().push(position as u32);
            }

            *self.field_lengths.entry(field.to_string()).or_insert(0) += length as u64;
            self.doc_field_lengths.insert((doc_id.0, field.to_string()), length);
            let bounds = self
                .field_length_bounds
                .entry(field.to_string())
                .or_insert((u32::MAX, 0));
            bounds.0 = bounds.0.min(length);
            bounds.1 = bounds.1.max(length);

            if options.vectors {
                let vector: Vec<(String, Vec<u32>)> = term_positions
                    .iter()
                    .map(|(term, positions)| (term.to_string(), positions.clone()))
                    .collect();
                self.vectors.insert((doc_id.0, field.to_string()), vector);
            }

            for (term, positions) in term_positions {
                let weight = positions.len() as f32;
                let list = self
                    .terms
                    .entry((field.to_string(), term.to_string()))
                    .or_default();
                list.info.add_posting(doc_id, weight, length);
                list.postings.push(Posting {
                    doc_id,
                    weight,
                    positions: if options.positions { positions } else { Vec::new() },
                });
            }
        }

        doc_id
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    pub fn contains(&self, field: &str, text: &str) -> bool {
        self.terms
            .contains_key(&(field.to_string(), text.to_string()))
    }

    pub fn postings(&self, field: &str, text: &str) -> Option<&PostingList> {
        self.terms.get(&(field.to_string(), text.to_string()))
    }

    pub fn term_info(&self, field: &str, text: &str) -> Option<&TermInfo> {
        self.postings(field, text).map(|list| &list.info)
    }

    /// All (field, term) pairs in lexicographic order.
    pub fn all_terms(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.terms.keys().map(|(f, t)| (f.as_str(), t.as_str()))
    }

    /// (field, term) pairs starting at the given key, inclusive.
    pub fn terms_from<'a>(
        &'a self,
        field: &str,
        prefix: &str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        let start = (field.to_string(), prefix.to_string());
        self.terms
            .range((Bound::Included(start), Bound::Unbounded))
            .map(|((f, t), _)| (f.as_str(), t.as_str()))
    }

    /// ((field, term), info) pairs starting at the given key, inclusive.
    pub fn iter_from<'a>(
        &'a self,
        field: &str,
        text: &str,
    ) -> impl Iterator<Item = ((&'a str, &'a str), &'a TermInfo)> + 'a {
        let start = (field.to_string(), text.to_string());
        self.terms
            .range((Bound::Included(start), Bound::Unbounded))
            .map(|((f, t), list)| ((f.as_str(), t.as_str()), &list.info))
    }

    pub fn vector(&self, doc_id: DocId, field: &str) -> Option<&[(String, Vec<u32>)]> {
        self.vectors
            .get(&(doc_id.0, field.to_string()))
            .map(|v| v.as_slice())
    }

    pub fn field_length(&self, field: &str) -> u64 {
        self.field_lengths.get(field).copied().unwrap_or(0)
    }

    pub fn min_field_length(&self, field: &str) -> u32 {
        match self.field_length_bounds.get(field) {
            Some((min, _)) => *min,
            None => 0,
        }
    }

    pub fn max_field_length(&self, field: &str) -> u32 {
        match self.field_length_bounds.get(field) {
            Some((_, max)) => *max,
            None => 0,
        }
    }

    pub fn doc_field_length(&self, doc_id: DocId, field: &str) -> u32 {
        self.doc_field_lengths
            .get(&(doc_id.0, field.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

impl Default for InvertedIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InvertedIndex {
        let mut index = InvertedIndex::new();
        index.add_document(&[("c", &["render", "shade"])]);
        index.add_document(&[("c", &["render", "texture"])]);
        index.add_document(&[("c", &["shade", "texture"])]);
        index
    }

    #[test]
    fn postings_are_sorted_by_doc_id() {
        let index = sample();
        let list = index.postings("c", "render").unwrap();
        let ids: Vec<u32> = list.postings.iter().map(|p| p.doc_id.0).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(list.doc_freq(), 2);
    }

    #[test]
    fn term_info_tracks_bounds() {
        let mut index = InvertedIndex::new();
        index.add_document(&[("c", &["a", "a", "b"])]);
        index.add_document(&[("c", &["a"])]);
        let info = index.term_info("c", "a").unwrap();
        assert_eq!(info.doc_frequency(), 2);
        assert_eq!(info.weight(), 3.0);
        assert_eq!(info.max_weight(), 2.0);
        assert_eq!(info.min_length(), 1);
        assert_eq!(info.max_length(), 3);
        assert_eq!(info.min_id(), DocId(0));
        assert_eq!(info.max_id(), DocId(1));
    }

    #[test]
    fn dictionary_order_is_lexicographic() {
        let mut index = InvertedIndex::new();
        index.add_document(&[("b", &["z"]), ("a", &["m"])]);
        let terms: Vec<(String, String)> = index
            .all_terms()
            .map(|(f, t)| (f.to_string(), t.to_string()))
            .collect();
        assert_eq!(
            terms,
            vec![("a".into(), "m".into()), ("b".into(), "z".into())]
        );
    }

    #[test]
    fn vectors_stored_on_request() {
        let mut index = InvertedIndex::new();
        index.define_field("c", FieldOptions { positions: false, vectors: true });
        let doc = index.add_document(&[("c", &["x", "y", "x"])]);
        let vector = index.vector(doc, "c").unwrap();
        assert_eq!(
            vector,
            &[("x".to_string(), vec![0, 2]), ("y".to_string(), vec![1])]
        );
        // Postings carry no positions for this field.
        let list = index.postings("c", "x").unwrap();
        assert!(list.postings[0].positions.is_empty());
    }

    #[test]
    fn positions_follow_token_order() {
        let index = sample();
        let list = index.postings("c", "shade").unwrap();
        assert_eq!(list.postings[0].positions, vec![1]);
        assert_eq!(list.postings[1].positions, vec![0]);
    }
}
