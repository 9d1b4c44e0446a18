use std::cmp::Ordering;

use roaring::RoaringBitmap;

use crate::core::types::DocId;
use crate::matcher::{BoxMatcher, Matcher, NullMatcher};

/// Build a left-leaning balanced binary tree of 2-ary combinators.
/// Empty input gives the null matcher; a singleton is returned as-is.
/// Keeps composition depth at ceil(log2 n).
pub fn make_tree<'a, F>(combine: &F, mut matchers: Vec<BoxMatcher<'a>>) -> BoxMatcher<'a>
where
    F: Fn(BoxMatcher<'a>, BoxMatcher<'a>) -> BoxMatcher<'a>,
{
    if matchers.is_empty() {
        return Box::new(NullMatcher);
    }
    if matchers.len() == 1 {
        return matchers.remove(0);
    }
    let right = matchers.split_off(matchers.len() / 2);
    combine(make_tree(combine, matchers), make_tree(combine, right))
}

/// Documents present in both children; weight and score are summed.
pub struct IntersectionMatcher<'a> {
    left: BoxMatcher<'a>,
    right: BoxMatcher<'a>,
}

impl<'a> IntersectionMatcher<'a> {
    pub fn new(left: BoxMatcher<'a>, right: BoxMatcher<'a>) -> Self {
        let mut matcher = IntersectionMatcher { left, right };
        matcher.align();
        matcher
    }

    /// Advance the lagging side until both cursors agree or either ends.
    fn align(&mut self) {
        while self.left.is_active() && self.right.is_active() {
            match self.left.doc_id().cmp(&self.right.doc_id()) {
                Ordering::Less => {
                    self.left.skip_to(self.right.doc_id());
                }
                Ordering::Greater => {
                    self.right.skip_to(self.left.doc_id());
                }
                Ordering::Equal => return,
            }
        }
    }
}

impl Matcher for IntersectionMatcher<'_> {
    fn is_active(&self) -> bool {
        self.left.is_active() && self.right.is_active()
    }

    fn doc_id(&self) -> DocId {
        self.left.doc_id()
    }

    fn weight(&self) -> f32 {
        self.left.weight() + self.right.weight()
    }

    fn advance(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.left.advance();
        self.right.advance();
        self.align();
        self.is_active()
    }

    fn skip_to(&mut self, target: DocId) -> bool {
        if !self.is_active() {
            return false;
        }
        if self.doc_id() >= target {
            return true;
        }
        self.left.skip_to(target);
        self.right.skip_to(target);
        self.align();
        self.is_active()
    }

    fn score(&self) -> f32 {
        self.left.score() + self.right.score()
    }
}

/// Documents present in either child; on a shared document the weights
/// are summed and both sides advance together.
pub struct UnionMatcher<'a> {
    left: BoxMatcher<'a>,
    right: BoxMatcher<'a>,
}

impl<'a> UnionMatcher<'a> {
    pub fn new(left: BoxMatcher<'a>, right: BoxMatcher<'a>) -> Self {
        UnionMatcher { left, right }
    }

    fn sides_at_current(&self) -> (bool, bool) {
        let current = self.doc_id();
        (
            self.left.is_active() && self.left.doc_id() == current,
            self.right.is_active() && self.right.doc_id() == current,
        )
    }
}

impl Matcher for UnionMatcher<'_> {
    fn is_active(&self) -> bool {
        self.left.is_active() || self.right.is_active()
    }

    fn doc_id(&self) -> DocId {
        match (self.left.is_active(), self.right.is_active()) {
            (true, true) => self.left.doc_id().min(self.right.doc_id()),
            (true, false) => self.left.doc_id(),
            (false, true) => self.right.doc_id(),
            (false, false) => DocId(0),
        }
    }

    fn weight(&self) -> f32 {
        let (on_left, on_right) = self.sides_at_current();
        let mut weight = 0.0;
        if on_left {
            weight += self.left.weight();
        }
        if on_right {
            weight += self.right.weight();
        }
        weight
    }

    fn advance(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        let (on_left, on_right) = self.sides_at_current();
        if on_left {
            self.left.advance();
        }
        if on_right {
            self.right.advance();
        }
        self.is_active()
    }

    fn skip_to(&mut self, target: DocId) -> bool {
        if !self.is_active() {
            return false;
        }
        if self.doc_id() >= target {
            return true;
        }
        if self.left.is_active() {
            self.left.skip_to(target);
        }
        if self.right.is_active() {
            self.right.skip_to(target);
        }
        self.is_active()
    }

    fn score(&self) -> f32 {
        let (on_left, on_right) = self.sides_at_current();
        let mut score = 0.0;
        if on_left {
            score += self.left.score();
        }
        if on_right {
            score += self.right.score();
        }
        score
    }
}

/// Union whose score at a shared document is the maximum child score plus
/// `tiebreak` times the others.
pub struct DisMaxMatcher<'a> {
    union: UnionMatcher<'a>,
    tiebreak: f32,
}

impl<'a> DisMaxMatcher<'a> {
    pub fn new(left: BoxMatcher<'a>, right: BoxMatcher<'a>, tiebreak: f32) -> Self {
        DisMaxMatcher { union: UnionMatcher::new(left, right), tiebreak }
    }
}

impl Matcher for DisMaxMatcher<'_> {
    fn is_active(&self) -> bool {
        self.union.is_active()
    }

    fn doc_id(&self) -> DocId {
        self.union.doc_id()
    }

    fn weight(&self) -> f32 {
        self.union.weight()
    }

    fn advance(&mut self) -> bool {
        self.union.advance()
    }

    fn skip_to(&mut self, target: DocId) -> bool {
        self.union.skip_to(target)
    }

    fn score(&self) -> f32 {
        let (on_left, on_right) = self.union.sides_at_current();
        match (on_left, on_right) {
            (true, true) => {
                let left = self.union.left.score();
                let right = self.union.right.score();
                left.max(right) + self.tiebreak * left.min(right)
            }
            (true, false) => self.union.left.score(),
            (false, true) => self.union.right.score(),
            (false, false) => 0.0,
        }
    }
}

/// Intersection for membership, but weight, positions and score come from
/// the scored child only.
pub struct RequireMatcher<'a> {
    scored: BoxMatcher<'a>,
    required: BoxMatcher<'a>,
}

impl<'a> RequireMatcher<'a> {
    pub fn new(scored: BoxMatcher<'a>, required: BoxMatcher<'a>) -> Self {
        let mut matcher = RequireMatcher { scored, required };
        matcher.align();
        matcher
    }

    fn align(&mut self) {
        while self.scored.is_active() && self.required.is_active() {
            match self.scored.doc_id().cmp(&self.required.doc_id()) {
                Ordering::Less => {
                    self.scored.skip_to(self.required.doc_id());
                }
                Ordering::Greater => {
                    self.required.skip_to(self.scored.doc_id());
                }
                Ordering::Equal => return,
            }
        }
    }
}

impl Matcher for RequireMatcher<'_> {
    fn is_active(&self) -> bool {
        self.scored.is_active() && self.required.is_active()
    }

    fn doc_id(&self) -> DocId {
        self.scored.doc_id()
    }

    fn weight(&self) -> f32 {
        self.scored.weight()
    }

    fn positions(&self) -> Vec<u32> {
        self.scored.positions()
    }

    fn advance(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.scored.advance();
        self.required.advance();
        self.align();
        self.is_active()
    }

    fn skip_to(&mut self, target: DocId) -> bool {
        if !self.is_active() {
            return false;
        }
        if self.doc_id() >= target {
            return true;
        }
        self.scored.skip_to(target);
        self.required.skip_to(target);
        self.align();
        self.is_active()
    }

    fn score(&self) -> f32 {
        self.scored.score()
    }
}

/// Streams the required child; the optional child is probed with
/// `skip_to` and contributes its weight when it lands on the same
/// document.
pub struct AndMaybeMatcher<'a> {
    required: BoxMatcher<'a>,
    optional: BoxMatcher<'a>,
}

impl<'a> AndMaybeMatcher<'a> {
    pub fn new(required: BoxMatcher<'a>, optional: BoxMatcher<'a>) -> Self {
        let mut matcher = AndMaybeMatcher { required, optional };
        matcher.probe();
        matcher
    }

    fn probe(&mut self) {
        if self.required.is_active() && self.optional.is_active() {
            self.optional.skip_to(self.required.doc_id());
        }
    }

    fn optional_coincides(&self) -> bool {
        self.required.is_active()
            && self.optional.is_active()
            && self.optional.doc_id() == self.required.doc_id()
    }
}

impl Matcher for AndMaybeMatcher<'_> {
    fn is_active(&self) -> bool {
        self.required.is_active()
    }

    fn doc_id(&self) -> DocId {
        self.required.doc_id()
    }

    fn weight(&self) -> f32 {
        let mut weight = self.required.weight();
        if self.optional_coincides() {
            weight += self.optional.weight();
        }
        weight
    }

    fn positions(&self) -> Vec<u32> {
        self.required.positions()
    }

    fn advance(&mut self) -> bool {
        self.required.advance();
        self.probe();
        self.is_active()
    }

    fn skip_to(&mut self, target: DocId) -> bool {
        self.required.skip_to(target);
        self.probe();
        self.is_active()
    }

    fn score(&self) -> f32 {
        let mut score = self.required.score();
        if self.optional_coincides() {
            score += self.optional.score();
        }
        score
    }
}

/// The complement of the child stream over `[0, limit)`, additionally
/// skipping documents marked missing (deleted or excluded).
pub struct InverseMatcher<'a> {
    child: BoxMatcher<'a>,
    limit: u32,
    current: u32,
    missing: RoaringBitmap,
}

impl<'a> InverseMatcher<'a> {
    pub fn new(child: BoxMatcher<'a>, limit: u32, missing: RoaringBitmap) -> Self {
        let mut matcher = InverseMatcher { child, limit, current: 0, missing };
        matcher.seek();
        matcher
    }

    fn seek(&mut self) {
        while self.current < self.limit {
            if self.missing.contains(self.current) {
                self.current += 1;
                continue;
            }
            if self.child.is_active() {
                let id = self.child.doc_id();
                if id.0 < self.current {
                    self.child.skip_to(DocId(self.current));
                    continue;
                }
                if id.0 == self.current {
                    self.current += 1;
                    continue;
                }
            }
            break;
        }
    }
}

impl Matcher for InverseMatcher<'_> {
    fn is_active(&self) -> bool {
        self.current < self.limit
    }

    fn doc_id(&self) -> DocId {
        DocId(self.current)
    }

    fn weight(&self) -> f32 {
        0.0
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

/// Discards child documents that are in (or, with `exclude` false, not
/// in) the given set.
pub struct FilterMatcher<'a> {
    child: BoxMatcher<'a>,
    ids: RoaringBitmap,
    exclude: bool,
}

impl<'a> FilterMatcher<'a> {
    pub fn new(child: BoxMatcher<'a>, ids: RoaringBitmap, exclude: bool) -> Self {
        let mut matcher = FilterMatcher { child, ids, exclude };
        matcher.seek();
        matcher
    }

    fn allows(&self, doc_id: DocId) -> bool {
        self.ids.contains(doc_id.0) != self.exclude
    }

    fn seek(&mut self) {
        while self.child.is_active() && !self.allows(self.child.doc_id()) {
            self.child.advance();
        }
    }
}

impl Matcher for FilterMatcher<'_> {
    fn is_active(&self) -> bool {
        self.child.is_active()
    }

    fn doc_id(&self) -> DocId {
        self.child.doc_id()
    }

    fn weight(&self) -> f32 {
        self.child.weight()
    }

    fn positions(&self) -> Vec<u32> {
        self.child.positions()
    }

    fn advance(&mut self) -> bool {
        self.child.advance();
        self.seek();
        self.is_active()
    }

    fn skip_to(&mut self, target: DocId) -> bool {
        self.child.skip_to(target);
        self.seek();
        self.is_active()
    }

    fn score(&self) -> f32 {
        self.child.score()
    }
}

/// Multiplies the child's weight and score by a constant boost.
pub struct WrappingMatcher<'a> {
    child: BoxMatcher<'a>,
    boost: f32,
}

impl<'a> WrappingMatcher<'a> {
    pub fn new(child: BoxMatcher<'a>, boost: f32) -> Self {
        WrappingMatcher { child, boost }
    }
}

impl Matcher for WrappingMatcher<'_> {
    fn is_active(&self) -> bool {
        self.child.is_active()
    }

    fn doc_id(&self) -> DocId {
        self.child.doc_id()
    }

    fn weight(&self) -> f32 {
        self.child.weight() * self.boost
    }

    fn positions(&self) -> Vec<u32> {
        self.child.positions()
    }

    fn advance(&mut self) -> bool {
        self.child.advance()
    }

    fn skip_to(&mut self, target: DocId) -> bool {
        self.child.skip_to(target)
    }

    fn score(&self) -> f32 {
        self.child.score() * self.boost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Posting;
    use crate::matcher::all_ids;
    use crate::matcher::posting::PostingMatcher;

    fn postings(ids: &[u32]) -> Vec<Posting> {
        ids.iter()
            .map(|&id| Posting { doc_id: DocId(id), weight: 1.0, positions: Vec::new() })
            .collect()
    }

    fn ids_of(matcher: &mut dyn Matcher) -> Vec<u32> {
        all_ids(matcher).map(|d| d.0).collect()
    }

    #[test]
    fn intersection_is_set_intersection() {
        let a = postings(&[1, 2, 5, 8, 13]);
        let b = postings(&[2, 3, 5, 13, 21]);
        let mut matcher = IntersectionMatcher::new(
            Box::new(PostingMatcher::new(&a)),
            Box::new(PostingMatcher::new(&b)),
        );
        assert_eq!(ids_of(&mut matcher), vec![2, 5, 13]);
    }

    #[test]
    fn intersection_of_disjoint_is_empty() {
        let a = postings(&[1, 3]);
        let b = postings(&[2, 4]);
        let mut matcher = IntersectionMatcher::new(
            Box::new(PostingMatcher::new(&a)),
            Box::new(PostingMatcher::new(&b)),
        );
        assert!(!matcher.is_active());
        assert!(ids_of(&mut matcher).is_empty());
    }

    #[test]
    fn union_deduplicates_shared_documents() {
        let a = postings(&[1, 2, 5]);
        let b = postings(&[2, 3, 5, 8]);
        let mut matcher = UnionMatcher::new(
            Box::new(PostingMatcher::new(&a)),
            Box::new(PostingMatcher::new(&b)),
        );
        assert_eq!(ids_of(&mut matcher), vec![1, 2, 3, 5, 8]);
    }

    #[test]
    fn union_sums_weights_on_shared_documents() {
        let a = postings(&[2]);
        let b = postings(&[2]);
        let matcher = UnionMatcher::new(
            Box::new(PostingMatcher::new(&a)),
            Box::new(PostingMatcher::new(&b)),
        );
        assert_eq!(matcher.weight(), 2.0);
    }

    #[test]
    fn dis_max_scores_max_plus_tiebreak() {
        let a = vec![Posting { doc_id: DocId(1), weight: 3.0, positions: Vec::new() }];
        let b = vec![Posting { doc_id: DocId(1), weight: 2.0, positions: Vec::new() }];
        let matcher = DisMaxMatcher::new(
            Box::new(PostingMatcher::new(&a)),
            Box::new(PostingMatcher::new(&b)),
            0.5,
        );
        assert_eq!(matcher.score(), 3.0 + 0.5 * 2.0);
    }

    #[test]
    fn require_scores_only_the_scored_child() {
        let scored = vec![
            Posting { doc_id: DocId(1), weight: 4.0, positions: Vec::new() },
            Posting { doc_id: DocId(3), weight: 5.0, positions: Vec::new() },
        ];
        let required = postings(&[3, 7]);
        let mut matcher = RequireMatcher::new(
            Box::new(PostingMatcher::new(&scored)),
            Box::new(PostingMatcher::new(&required)),
        );
        assert!(matcher.is_active());
        assert_eq!(matcher.doc_id(), DocId(3));
        assert_eq!(matcher.score(), 5.0);
        assert!(!matcher.advance());
    }

    #[test]
    fn and_maybe_keeps_required_stream() {
        let required = postings(&[1, 4, 6]);
        let optional = vec![Posting { doc_id: DocId(4), weight: 2.5, positions: Vec::new() }];
        let mut matcher = AndMaybeMatcher::new(
            Box::new(PostingMatcher::new(&required)),
            Box::new(PostingMatcher::new(&optional)),
        );
        let mut scored = Vec::new();
        while matcher.is_active() {
            scored.push((matcher.doc_id().0, matcher.score()));
            matcher.advance();
        }
        assert_eq!(scored, vec![(1, 1.0), (4, 3.5), (6, 1.0)]);
    }

    #[test]
    fn inverse_is_complement_over_live_docs() {
        let child = postings(&[1, 3]);
        let mut missing = RoaringBitmap::new();
        missing.insert(4);
        let mut matcher =
            InverseMatcher::new(Box::new(PostingMatcher::new(&child)), 6, missing);
        assert_eq!(ids_of(&mut matcher), vec![0, 2, 5]);
    }

    #[test]
    fn filter_excludes_and_includes() {
        let child = postings(&[1, 2, 3, 4]);
        let mut set = RoaringBitmap::new();
        set.insert(2);
        set.insert(4);

        let mut excluded =
            FilterMatcher::new(Box::new(PostingMatcher::new(&child)), set.clone(), true);
        assert_eq!(ids_of(&mut excluded), vec![1, 3]);

        let mut included =
            FilterMatcher::new(Box::new(PostingMatcher::new(&child)), set, false);
        assert_eq!(ids_of(&mut included), vec![2, 4]);
    }

    #[test]
    fn wrapping_multiplies_weight() {
        let child = postings(&[1]);
        let matcher = WrappingMatcher::new(Box::new(PostingMatcher::new(&child)), 3.0);
        assert_eq!(matcher.weight(), 3.0);
        assert_eq!(matcher.score(), 3.0);
    }

    #[test]
    fn tree_over_many_streams() {
        let lists: Vec<Vec<Posting>> = vec![
            postings(&[1, 2, 3, 4, 5]),
            postings(&[2, 3, 4, 5, 6]),
            postings(&[3, 4, 5, 6, 7]),
            postings(&[1, 3, 5, 7, 9]),
        ];
        let matchers: Vec<BoxMatcher<'_>> = lists
            .iter()
            .map(|l| Box::new(PostingMatcher::new(l)) as BoxMatcher<'_>)
            .collect();
        let mut tree = make_tree(
            &|a, b| Box::new(IntersectionMatcher::new(a, b)) as BoxMatcher<'_>,
            matchers,
        );
        assert_eq!(ids_of(tree.as_mut()), vec![3, 5]);
    }

    #[test]
    fn empty_tree_is_null() {
        let tree = make_tree(
            &|a, b| Box::new(UnionMatcher::new(a, b)) as BoxMatcher<'static>,
            Vec::new(),
        );
        assert!(!tree.is_active());
    }

    #[test]
    fn skip_preserves_ascending_invariant() {
        let a = postings(&[1, 5, 9, 14]);
        let b = postings(&[1, 2, 9, 14, 20]);
        let mut matcher = UnionMatcher::new(
            Box::new(PostingMatcher::new(&a)),
            Box::new(PostingMatcher::new(&b)),
        );
        assert!(matcher.skip_to(DocId(8)));
        assert!(matcher.doc_id() >= DocId(8));
        assert_eq!(matcher.doc_id(), DocId(9));
    }
}
