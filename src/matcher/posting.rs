use crate::core::types::DocId;
use crate::index::Posting;
use crate::matcher::Matcher;

/// Cursor over one term's posting list, borrowed from the reader.
pub struct PostingMatcher<'a> {
    postings: &'a [Posting],
    index: usize,
}

impl<'a> PostingMatcher<'a> {
    pub fn new(postings: &'a [Posting]) -> Self {
        PostingMatcher { postings, index: 0 }
    }
}

impl Matcher for PostingMatcher<'_> {
    fn is_active(&self) -> bool {
        self.index < self.postings.len()
    }

    fn doc_id(&self) -> DocId {
        self.postings[self.index].doc_id
    }

    fn weight(&self) -> f32 {
        self.postings[self.index].weight
    }

    fn positions(&self) -> Vec<u32> {
        self.postings[self.index].positions.clone()
    }

    fn advance(&mut self) -> bool {
        self.index += 1;
        self.is_active()
    }

    fn skip_to(&mut self, target: DocId) -> bool {
        // Binary search over the remaining postings.
        self.index += self.postings[self.index..].partition_point(|p| p.doc_id < target);
        self.is_active()
    }
}
