pub mod multi;
pub mod segment;

pub use multi::MultiReader;
pub use segment::{EmptyReader, SegmentReader};

use std::cmp::Ordering;

use roaring::RoaringBitmap;

use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::TermInfo;
use crate::matcher::BoxMatcher;
use crate::search::fuzzy::damerau_levenshtein;

/// Read-only snapshot of an index consumed by the query core: term
/// dictionary traversal, postings, vectors, deletions. Readers must
/// outlive all matchers derived from them; they are never mutated by a
/// search.
pub trait IndexReader {
    /// True if the (field, term) pair is in this reader.
    fn contains_term(&self, field: &str, text: &str) -> bool;

    /// Every (field, term) pair, in lexicographic order by the pair.
    fn all_terms(&self) -> Box<dyn Iterator<Item = (String, String)> + '_>;

    /// (field, term) pairs starting at the given pair, inclusive.
    fn terms_from(&self, field: &str, prefix: &str) -> Box<dyn Iterator<Item = (String, String)> + '_> {
        let start = (field.to_string(), prefix.to_string());
        Box::new(self.all_terms().skip_while(move |pair| *pair < start))
    }

    /// Terms in the field starting with the prefix; stops at the first
    /// entry past the prefix.
    fn expand_prefix(&self, field: &str, prefix: &str) -> Box<dyn Iterator<Item = String> + '_> {
        let field = field.to_string();
        let prefix = prefix.to_string();
        let terms = self.terms_from(&field, &prefix);
        Box::new(
            terms
                .take_while(move |(f, t)| *f == field && t.starts_with(&prefix))
                .map(|(_, t)| t),
        )
    }

    /// Every term in the given field.
    fn lexicon(&self, field: &str) -> Box<dyn Iterator<Item = String> + '_> {
        let field = field.to_string();
        let terms = self.terms_from(&field, "");
        Box::new(terms.take_while(move |(f, _)| *f == field).map(|(_, t)| t))
    }

    /// ((field, term), info) pairs for all terms starting at the given
    /// term.
    fn iter_from(
        &self,
        field: &str,
        text: &str,
    ) -> Box<dyn Iterator<Item = ((String, String), TermInfo)> + '_> {
        Box::new(
            self.terms_from(field, text)
                .filter_map(move |(f, t)| match self.term_info(&f, &t) {
                    Ok(info) => Some(((f, t), info)),
                    Err(_) => None,
                }),
        )
    }

    /// (term, info) pairs for the field's terms under a prefix.
    fn iter_prefix(
        &self,
        field: &str,
        prefix: &str,
    ) -> Box<dyn Iterator<Item = (String, TermInfo)> + '_> {
        let field = field.to_string();
        let prefix = prefix.to_string();
        let entries = self.iter_from(&field, &prefix);
        Box::new(
            entries
                .take_while(move |((f, t), _)| *f == field && t.starts_with(&prefix))
                .map(|((_, t), info)| (t, info)),
        )
    }

    /// Statistics about the given term, or `TermNotFound`.
    fn term_info(&self, field: &str, text: &str) -> Result<TermInfo>;

    /// A matcher over the postings of the given term, with deleted
    /// documents filtered out. `TermNotFound` for unknown terms.
    fn postings(&self, field: &str, text: &str) -> Result<BoxMatcher<'_>>;

    /// The (term, positions) vector stored for the given document, sorted
    /// by term.
    fn vector(&self, doc_id: DocId, field: &str) -> Result<Vec<(String, Vec<u32>)>>;

    fn has_vector(&self, doc_id: DocId, field: &str) -> bool;

    /// Whether postings of the field carry token positions.
    fn stores_positions(&self, field: &str) -> bool;

    /// Whether documents of the field carry term vectors.
    fn stores_vectors(&self, field: &str) -> bool;

    /// Total number of documents, deleted or not.
    fn doc_count_all(&self) -> u32;

    /// Number of undeleted documents.
    fn doc_count(&self) -> u32;

    fn has_deletions(&self) -> bool;

    fn is_deleted(&self, doc_id: DocId) -> bool;

    /// The deleted documents as a bitmap of local doc ids.
    fn deleted_docs(&self) -> RoaringBitmap;

    /// Every undeleted document id.
    fn all_doc_ids(&self) -> Box<dyn Iterator<Item = DocId> + '_> {
        Box::new(
            (0..self.doc_count_all())
                .map(DocId)
                .filter(move |&doc_id| !self.is_deleted(doc_id)),
        )
    }

    /// Total number of terms in the field.
    fn field_length(&self, field: &str) -> u64;

    fn min_field_length(&self, field: &str) -> u32;

    fn max_field_length(&self, field: &str) -> u32;

    fn doc_field_length(&self, doc_id: DocId, field: &str) -> u32;

    /// Total occurrences of the term in the collection.
    fn frequency(&self, field: &str, text: &str) -> u64 {
        self.term_info(field, text)
            .map(|info| info.weight() as u64)
            .unwrap_or(0)
    }

    /// Number of documents the term appears in.
    fn doc_frequency(&self, field: &str, text: &str) -> u32 {
        self.term_info(field, text)
            .map(|info| info.doc_frequency())
            .unwrap_or(0)
    }

    /// The lowest doc id in the term's posting list.
    fn first_id(&self, field: &str, text: &str) -> Result<DocId> {
        let matcher = self.postings(field, text)?;
        if matcher.is_active() {
            Ok(matcher.doc_id())
        } else {
            Err(Error::term_not_found(field, text))
        }
    }

    /// True if the field has a word graph for fast fuzzy expansion.
    fn has_word_graph(&self, _field: &str) -> bool {
        false
    }

    /// Terms in the field within `max_dist` Damerau-Levenshtein edits of
    /// the text, sharing its first `prefix` characters. No particular
    /// order is guaranteed.
    fn terms_within(&self, field: &str, text: &str, max_dist: u32, prefix: usize) -> Vec<String> {
        scan_terms_within(self, field, text, max_dist, prefix)
    }

    /// The `number` most frequent terms under a prefix, as
    /// (weight, term), heaviest first.
    fn most_frequent_terms(&self, field: &str, number: usize, prefix: &str) -> Vec<(f64, String)> {
        let mut ranked: Vec<(f64, String)> = self
            .iter_prefix(field, prefix)
            .map(|(term, info)| (info.weight(), term))
            .collect();
        rank_descending(&mut ranked, number);
        ranked
    }

    /// The `number` terms with the highest tf-idf scores under a prefix,
    /// as (score, term).
    fn most_distinctive_terms(&self, field: &str, number: usize, prefix: &str) -> Vec<(f64, String)> {
        let total = self.doc_count() as f64;
        let mut ranked: Vec<(f64, String)> = self
            .iter_prefix(field, prefix)
            .map(|(term, info)| {
                let idf = (total / info.doc_frequency() as f64).ln();
                (info.weight() * idf, term)
            })
            .collect();
        rank_descending(&mut ranked, number);
        ranked
    }
}

/// Linear `terms_within`: expand the prefix, filter by edit distance.
/// The fallback when a reader has no word graph for the field.
pub fn scan_terms_within(
    reader: &(impl IndexReader + ?Sized),
    field: &str,
    text: &str,
    max_dist: u32,
    prefix: usize,
) -> Vec<String> {
    let prefix_str: String = text.chars().take(prefix).collect();
    reader
        .expand_prefix(field, &prefix_str)
        .filter(|word| damerau_levenshtein(word, text) <= max_dist as usize)
        .collect()
}

fn rank_descending(ranked: &mut Vec<(f64, String)>, number: usize) {
    ranked.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
    });
    ranked.truncate(number);
}
