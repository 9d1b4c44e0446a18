use crate::core::types::DocId;
use crate::matcher::{BoxMatcher, Matcher};

/// Adapts per-segment matchers to one global stream: segment-local doc
/// ids are reported offset by the segment's base. Segments arrive in
/// ascending base order, so the streams concatenate.
pub struct MultiMatcher<'a> {
    matchers: Vec<BoxMatcher<'a>>,
    offsets: Vec<u32>,
    current: usize,
}

impl<'a> MultiMatcher<'a> {
    pub fn new(matchers: Vec<BoxMatcher<'a>>, offsets: Vec<u32>) -> Self {
        debug_assert_eq!(matchers.len(), offsets.len());
        let mut matcher = MultiMatcher { matchers, offsets, current: 0 };
        matcher.seek();
        matcher
    }

    fn seek(&mut self) {
        while self.current < self.matchers.len() && !self.matchers[self.current].is_active() {
            self.current += 1;
        }
    }
}

impl Matcher for MultiMatcher<'_> {
    fn is_active(&self) -> bool {
        self.current < self.matchers.len()
    }

    fn doc_id(&self) -> DocId {
        DocId(self.matchers[self.current].doc_id().0 + self.offsets[self.current])
    }

    fn weight(&self) -> f32 {
        self.matchers[self.current].weight()
    }

    fn positions(&self) -> Vec<u32> {
        self.matchers[self.current].positions()
    }

    fn advance(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.matchers[self.current].advance();
        self.seek();
        self.is_active()
    }

    fn skip_to(&mut self, target: DocId) -> bool {
        loop {
            if !self.is_active() {
                return false;
            }
            if self.doc_id() >= target {
                return true;
            }
            let local = target.0.saturating_sub(self.offsets[self.current]);
            self.matchers[self.current].skip_to(DocId(local));
            self.seek();
        }
    }

    fn score(&self) -> f32 {
        self.matchers[self.current].score()
    }
}
