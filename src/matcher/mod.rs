pub mod combinators;
pub mod multi;
pub mod phrase;
pub mod posting;

pub use combinators::{
    AndMaybeMatcher, DisMaxMatcher, FilterMatcher, IntersectionMatcher, InverseMatcher,
    RequireMatcher, UnionMatcher, WrappingMatcher, make_tree,
};
pub use multi::MultiMatcher;
pub use phrase::{PhraseMatcher, VectorPhraseMatcher};
pub use posting::PostingMatcher;

use roaring::RoaringBitmap;

use crate::core::types::DocId;

/// A lazy, forward-only cursor over an ascending, duplicate-free sequence
/// of document ids, each carrying a weight and optional positions.
///
/// `doc_id`, `weight` and `positions` are defined only while `is_active`
/// returns true.
pub trait Matcher {
    fn is_active(&self) -> bool;

    fn doc_id(&self) -> DocId;

    /// Posting payload weight at the current document.
    fn weight(&self) -> f32;

    /// Posting payload positions at the current document; empty unless the
    /// underlying posting stores them.
    fn positions(&self) -> Vec<u32> {
        Vec::new()
    }

    /// Advance to the next posting; returns the new `is_active`.
    fn advance(&mut self) -> bool;

    /// Advance past all doc ids below `target`; may land on `target` or
    /// the first id greater. No effect when already at or past `target`.
    /// Returns the new `is_active`.
    fn skip_to(&mut self, target: DocId) -> bool;

    /// Score at the current document. Leaves score their weight;
    /// combinators sum their children unless they define otherwise.
    fn score(&self) -> f32 {
        self.weight()
    }
}

pub type BoxMatcher<'a> = Box<dyn Matcher + 'a>;

/// Draining iterator over a matcher's remaining doc ids.
pub struct AllIds<'m> {
    matcher: &'m mut dyn Matcher,
}

impl Iterator for AllIds<'_> {
    type Item = DocId;

    fn next(&mut self) -> Option<DocId> {
        if !self.matcher.is_active() {
            return None;
        }
        let id = self.matcher.doc_id();
        self.matcher.advance();
        Some(id)
    }
}

/// Drain the matcher, yielding every remaining doc id in ascending order.
pub fn all_ids(matcher: &mut dyn Matcher) -> AllIds<'_> {
    AllIds { matcher }
}

/// The empty stream.
pub struct NullMatcher;

impl Matcher for NullMatcher {
    fn is_active(&self) -> bool {
        false
    }

    fn doc_id(&self) -> DocId {
        DocId(0)
    }

    fn weight(&self) -> f32 {
        0.0
    }

    fn advance(&mut self) -> bool {
        false
    }

    fn skip_to(&mut self, _target: DocId) -> bool {
        false
    }
}

/// Walks `[0, limit)`, skipping an excluded set.
pub struct EveryMatcher {
    limit: u32,
    current: u32,
    exclude: RoaringBitmap,
}

impl EveryMatcher {
    pub fn new(limit: u32, exclude: RoaringBitmap) -> Self {
        let mut matcher = EveryMatcher { limit, current: 0, exclude };
        matcher.seek();
        matcher
    }

    fn seek(&mut self) {
        while self.current < self.limit && self.exclude.contains(self.current) {
            self.current += 1;
        }
    }
}

impl Matcher for EveryMatcher {
    fn is_active(&self) -> bool {
        self.current < self.limit
    }

    fn doc_id(&self) -> DocId {
        DocId(self.current)
    }

    fn weight(&self) -> f32 {
        1.0
    }

    fn advance(&mut self) -> bool {
        self.current += 1;
        self.seek();
        self.is_active()
    }

    fn skip_to(&mut self, target: DocId) -> bool {
        if target.0 > self.current {
            self.current = target.0;
        }
        self.seek();
        self.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_matcher_is_inactive() {
        let mut matcher = NullMatcher;
        assert!(!matcher.is_active());
        assert!(!matcher.advance());
        assert!(!matcher.skip_to(DocId(5)));
        assert_eq!(all_ids(&mut matcher).count(), 0);
    }

    #[test]
    fn every_matcher_skips_excluded() {
        let mut exclude = RoaringBitmap::new();
        exclude.insert(0);
        exclude.insert(2);
        let mut matcher = EveryMatcher::new(5, exclude);
        let ids: Vec<u32> = all_ids(&mut matcher).map(|d| d.0).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn every_matcher_skip_to() {
        let mut matcher = EveryMatcher::new(10, RoaringBitmap::new());
        assert!(matcher.skip_to(DocId(7)));
        assert_eq!(matcher.doc_id(), DocId(7));
        // Skipping backwards has no effect.
        assert!(matcher.skip_to(DocId(3)));
        assert_eq!(matcher.doc_id(), DocId(7));
    }
}
