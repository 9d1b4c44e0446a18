use crate::core::types::DocId;
use crate::matcher::{BoxMatcher, Matcher};
use crate::reader::IndexReader;

/// True if the position lists admit a strictly increasing selection with
/// every adjacent gap at most `slop`. A slop of 1 means adjacent tokens.
pub fn window_exists(lists: &[Vec<u32>], slop: u32) -> bool {
    if lists.is_empty() || lists.iter().any(|l| l.is_empty()) {
        return false;
    }
    // Walk the lists keeping the set of viable anchors for the next word.
    let mut anchors: Vec<u32> = lists[0].clone();
    for list in &lists[1..] {
        let mut next_anchors = Vec::new();
        for &pos in list {
            for &anchor in &anchors {
                if pos > anchor && pos - anchor <= slop {
                    next_anchors.push(pos);
                    break;
                }
            }
        }
        if next_anchors.is_empty() {
            return false;
        }
        anchors = next_anchors;
    }
    true
}

/// Positional phrase matcher over per-word posting cursors that carry
/// positions. Documents stream from the n-way intersection of the word
/// cursors; each candidate is verified against the slop window.
pub struct PhraseMatcher<'a> {
    words: Vec<BoxMatcher<'a>>,
    slop: u32,
    active: bool,
}

impl<'a> PhraseMatcher<'a> {
    pub fn new(words: Vec<BoxMatcher<'a>>, slop: u32) -> Self {
        let mut matcher = PhraseMatcher { words, slop, active: true };
        if matcher.words.is_empty() {
            matcher.active = false;
            return matcher;
        }
        matcher.search(false);
        matcher
    }

    /// Align all word cursors on a common doc id. False when any ends.
    fn align(&mut self) -> bool {
        loop {
            if self.words.iter().any(|w| !w.is_active()) {
                return false;
            }
            let target = self
                .words
                .iter()
                .map(|w| w.doc_id())
                .max()
                .unwrap_or(DocId(0));
            let mut aligned = true;
            for word in &mut self.words {
                if word.doc_id() < target {
                    word.skip_to(target);
                    aligned = false;
                }
            }
            if aligned {
                return true;
            }
        }
    }

    fn positions_match(&self) -> bool {
        let lists: Vec<Vec<u32>> = self.words.iter().map(|w| w.positions()).collect();
        window_exists(&lists, self.slop)
    }

    fn search(&mut self, mut advance_first: bool) {
        loop {
            if advance_first && !self.words[0].advance() {
                self.active = false;
                return;
            }
            advance_first = true;
            if !self.align() {
                self.active = false;
                return;
            }
            if self.positions_match() {
                self.active = true;
                return;
            }
        }
    }
}

impl Matcher for PhraseMatcher<'_> {
    fn is_active(&self) -> bool {
        self.active
    }

    fn doc_id(&self) -> DocId {
        self.words[0].doc_id()
    }

    fn weight(&self) -> f32 {
        self.words.iter().map(|w| w.weight()).sum()
    }

    fn advance(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.search(true);
        self.active
    }

    fn skip_to(&mut self, target: DocId) -> bool {
        if !self.active {
            return false;
        }
        if self.doc_id() >= target {
            return true;
        }
        for word in &mut self.words {
            word.skip_to(target);
        }
        self.search(false);
        self.active
    }

    fn score(&self) -> f32 {
        self.words.iter().map(|w| w.score()).sum()
    }
}

/// Positional phrase matcher for fields whose postings lack positions but
/// whose documents store term vectors. Candidate documents come from the
/// word cursors; positions come from the candidate's vector.
pub struct VectorPhraseMatcher<'a> {
    inner: PhraseShell<'a>,
}

struct PhraseShell<'a> {
    words: Vec<BoxMatcher<'a>>,
    word_texts: Vec<String>,
    reader: &'a dyn IndexReader,
    field: String,
    slop: u32,
    active: bool,
}

impl<'a> VectorPhraseMatcher<'a> {
    pub fn new(
        words: Vec<BoxMatcher<'a>>,
        word_texts: Vec<String>,
        reader: &'a dyn IndexReader,
        field: &str,
        slop: u32,
    ) -> Self {
        let mut inner = PhraseShell {
            words,
            word_texts,
            reader,
            field: field.to_string(),
            slop,
            active: true,
        };
        if inner.words.is_empty() {
            inner.active = false;
        } else {
            inner.search(false);
        }
        VectorPhraseMatcher { inner }
    }
}

impl PhraseShell<'_> {
    fn align(&mut self) -> bool {
        loop {
            if self.words.iter().any(|w| !w.is_active()) {
                return false;
            }
            let target = self
                .words
                .iter()
                .map(|w| w.doc_id())
                .max()
                .unwrap_or(DocId(0));
            let mut aligned = true;
            for word in &mut self.words {
                if word.doc_id() < target {
                    word.skip_to(target);
                    aligned = false;
                }
            }
            if aligned {
                return true;
            }
        }
    }

    fn positions_match(&self) -> bool {
        let doc_id = self.words[0].doc_id();
        let Ok(vector) = self.reader.vector(doc_id, &self.field) else {
            return false;
        };
        let mut lists = Vec::with_capacity(self.word_texts.len());
        for text in &self.word_texts {
            match vector.binary_search_by(|(term, _)| term.as_str().cmp(text)) {
                Ok(at) => lists.push(vector[at].1.clone()),
                Err(_) => return false,
            }
        }
        window_exists(&lists, self.slop)
    }

    fn search(&mut self, mut advance_first: bool) {
        loop {
            if advance_first && !self.words[0].advance() {
                self.active = false;
                return;
            }
            advance_first = true;
            if !self.align() {
                self.active = false;
                return;
            }
            if self.positions_match() {
                self.active = true;
                return;
            }
        }
    }
}

impl Matcher for VectorPhraseMatcher<'_> {
    fn is_active(&self) -> bool {
        self.inner.active
    }

    fn doc_id(&self) -> DocId {
        self.inner.words[0].doc_id()
    }

    fn weight(&self) -> f32 {
        self.inner.words.iter().map(|w| w.weight()).sum()
    }

    fn advance(&mut self) -> bool {
        if !self.inner.active {
            return false;
        }
        self.inner.search(true);
        self.inner.active
    }

    fn skip_to(&mut self, target: DocId) -> bool {
        if !self.inner.active {
            return false;
        }
        if self.doc_id() >= target {
            return true;
        }
        for word in &mut self.inner.words {
            word.skip_to(target);
        }
        self.inner.search(false);
        self.inner.active
    }

    fn score(&self) -> f32 {
        self.inner.words.iter().map(|w| w.score()).sum()
    }
}
