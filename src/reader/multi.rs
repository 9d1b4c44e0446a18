use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use roaring::RoaringBitmap;

use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::TermInfo;
use crate::matcher::{BoxMatcher, MultiMatcher};
use crate::reader::IndexReader;

/// Composite reader over segment readers with ascending doc-id bases.
/// Term iteration is a streaming heap merge with duplicates collapsed;
/// postings offset segment-local ids by the segment base.
pub struct MultiReader {
    readers: Vec<Box<dyn IndexReader>>,
    doc_offsets: Vec<u32>,
    base: u32,
}

impl MultiReader {
    pub fn new(readers: Vec<Box<dyn IndexReader>>) -> Self {
        let mut multi = MultiReader { readers: Vec::new(), doc_offsets: Vec::new(), base: 0 };
        for reader in readers {
            multi.add_reader(reader);
        }
        multi
    }

    /// Append a reader. Administrative: not safe to call concurrently
    /// with searches.
    pub fn add_reader(&mut self, reader: Box<dyn IndexReader>) {
        self.doc_offsets.push(self.base);
        self.base += reader.doc_count_all();
        self.readers.push(reader);
    }

    /// The child readers with their doc-id bases.
    pub fn leaf_readers(&self) -> impl Iterator<Item = (&dyn IndexReader, u32)> {
        self.readers
            .iter()
            .zip(&self.doc_offsets)
            .map(|(reader, &offset)| (reader.as_ref(), offset))
    }

    /// Locate the segment holding a global doc id and its local id.
    fn locate(&self, doc_id: DocId) -> Option<(usize, DocId)> {
        if self.readers.is_empty() {
            return None;
        }
        let segment = self
            .doc_offsets
            .partition_point(|&offset| offset <= doc_id.0)
            .saturating_sub(1);
        Some((segment, DocId(doc_id.0 - self.doc_offsets[segment])))
    }

    fn merge_terms<'a>(
        &self,
        iters: Vec<Box<dyn Iterator<Item = (String, String)> + 'a>>,
    ) -> Box<dyn Iterator<Item = (String, String)> + 'a> {
        Box::new(TermMerge::new(iters))
    }
}

/// Streaming heap merge of sorted term iterators, collapsing duplicates.
struct TermMerge<'a> {
    iters: Vec<Box<dyn Iterator<Item = (String, String)> + 'a>>,
    heap: BinaryHeap<Reverse<((String, String), usize)>>,
    last: Option<(String, String)>,
}

impl<'a> TermMerge<'a> {
    fn new(mut iters: Vec<Box<dyn Iterator<Item = (String, String)> + 'a>>) -> Self {
        let mut heap = BinaryHeap::new();
        for (at, iter) in iters.iter_mut().enumerate() {
            if let Some(term) = iter.next() {
                heap.push(Reverse((term, at)));
            }
        }
        TermMerge { iters, heap, last: None }
    }
}

impl Iterator for TermMerge<'_> {
    type Item = (String, String);

    fn next(&mut self) -> Option<(String, String)> {
        loop {
            let Reverse((term, at)) = self.heap.pop()?;
            if let Some(following) = self.iters[at].next() {
                self.heap.push(Reverse((following, at)));
            }
            if self.last.as_ref() != Some(&term) {
                self.last = Some(term.clone());
                return Some(term);
            }
        }
    }
}

impl IndexReader for MultiReader {
    fn contains_term(&self, field: &str, text: &str) -> bool {
        self.readers.iter().any(|r| r.contains_term(field, text))
    }

    fn all_terms(&self) -> Box<dyn Iterator<Item = (String, String)> + '_> {
        self.merge_terms(self.readers.iter().map(|r| r.all_terms()).collect())
    }

    fn terms_from(&self, field: &str, prefix: &str) -> Box<dyn Iterator<Item = (String, String)> + '_> {
        self.merge_terms(
            self.readers
                .iter()
                .map(|r| r.terms_from(field, prefix))
                .collect(),
        )
    }

    fn term_info(&self, field: &str, text: &str) -> Result<TermInfo> {
        let mut combined: Option<TermInfo> = None;
        for (reader, offset) in self.leaf_readers() {
            if !reader.contains_term(field, text) {
                continue;
            }
            let info = reader.term_info(field, text)?.offset(offset);
            match &mut combined {
                None => combined = Some(info),
                Some(total) => total.combine(&info),
            }
        }
        combined.ok_or_else(|| Error::term_not_found(field, text))
    }

    fn postings(&self, field: &str, text: &str) -> Result<BoxMatcher<'_>> {
        let mut matchers = Vec::new();
        let mut offsets = Vec::new();
        for (reader, offset) in self.leaf_readers() {
            if reader.contains_term(field, text) {
                matchers.push(reader.postings(field, text)?);
                offsets.push(offset);
            }
        }
        if matchers.is_empty() {
            return Err(Error::term_not_found(field, text));
        }
        Ok(Box::new(MultiMatcher::new(matchers, offsets)))
    }

    fn vector(&self, doc_id: DocId, field: &str) -> Result<Vec<(String, Vec<u32>)>> {
        let (segment, local) = self
            .locate(doc_id)
            .ok_or_else(|| Error::query(format!("no document {}", doc_id)))?;
        self.readers[segment].vector(local, field)
    }

    fn has_vector(&self, doc_id: DocId, field: &str) -> bool {
        match self.locate(doc_id) {
            Some((segment, local)) => self.readers[segment].has_vector(local, field),
            None => false,
        }
    }

    fn stores_positions(&self, field: &str) -> bool {
        self.readers.iter().any(|r| r.stores_positions(field))
    }

    fn stores_vectors(&self, field: &str) -> bool {
        self.readers.iter().any(|r| r.stores_vectors(field))
    }

    fn doc_count_all(&self) -> u32 {
        self.base
    }

    fn doc_count(&self) -> u32 {
        self.readers.iter().map(|r| r.doc_count()).sum()
    }

    fn has_deletions(&self) -> bool {
        self.readers.iter().any(|r| r.has_deletions())
    }

    fn is_deleted(&self, doc_id: DocId) -> bool {
        match self.locate(doc_id) {
            Some((segment, local)) => self.readers[segment].is_deleted(local),
            None => false,
        }
    }

    fn deleted_docs(&self) -> RoaringBitmap {
        let mut all = RoaringBitmap::new();
        for (reader, offset) in self.leaf_readers() {
            for local in reader.deleted_docs() {
                all.insert(local + offset);
            }
        }
        all
    }

    fn field_length(&self, field: &str) -> u64 {
        self.readers.iter().map(|r| r.field_length(field)).sum()
    }

    fn min_field_length(&self, field: &str) -> u32 {
        self.readers
            .iter()
            .map(|r| r.min_field_length(field))
            .min()
            .unwrap_or(0)
    }

    fn max_field_length(&self, field: &str) -> u32 {
        self.readers
            .iter()
            .map(|r| r.max_field_length(field))
            .max()
            .unwrap_or(0)
    }

    fn doc_field_length(&self, doc_id: DocId, field: &str) -> u32 {
        match self.locate(doc_id) {
            Some((segment, local)) => self.readers[segment].doc_field_length(local, field),
            None => 0,
        }
    }

    fn frequency(&self, field: &str, text: &str) -> u64 {
        self.readers.iter().map(|r| r.frequency(field, text)).sum()
    }

    fn doc_frequency(&self, field: &str, text: &str) -> u32 {
        self.readers
            .iter()
            .map(|r| r.doc_frequency(field, text))
            .sum()
    }

    fn first_id(&self, field: &str, text: &str) -> Result<DocId> {
        for (reader, offset) in self.leaf_readers() {
            match reader.first_id(field, text) {
                Ok(id) => return Ok(DocId(id.0 + offset)),
                Err(err) if err.is_term_not_found() => continue,
                Err(err) => return Err(err),
            }
        }
        Err(Error::term_not_found(field, text))
    }

    fn has_word_graph(&self, field: &str) -> bool {
        self.readers.iter().any(|r| r.has_word_graph(field))
    }

    fn terms_within(&self, field: &str, text: &str, max_dist: u32, prefix: usize) -> Vec<String> {
        let mut merged = BTreeSet::new();
        for reader in &self.readers {
            merged.extend(reader.terms_within(field, text, max_dist, prefix));
        }
        merged.into_iter().collect()
    }
}
