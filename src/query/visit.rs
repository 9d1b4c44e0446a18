use std::collections::HashSet;

use roaring::RoaringBitmap;

use crate::core::error::Result;
use crate::core::types::DocId;
use crate::query::ast::{
    AndMaybeQuery, AndNotQuery, AndQuery, DisMaxQuery, NotQuery, OrQuery, Query, RequireQuery,
};
use crate::reader::IndexReader;

impl Query {
    /// Deep-copy traversal applying the visitor bottom-up: children are
    /// rebuilt first, then the visitor maps the rebuilt node.
    pub fn accept<F>(&self, visitor: &mut F) -> Query
    where
        F: FnMut(Query) -> Query,
    {
        let rebuilt = match self {
            Query::And(q) => Query::And(AndQuery {
                children: q.children.iter().map(|c| c.accept(visitor)).collect(),
                boost: q.boost,
            }),
            Query::Or(q) => Query::Or(OrQuery {
                children: q.children.iter().map(|c| c.accept(visitor)).collect(),
                boost: q.boost,
                min_match: q.min_match,
            }),
            Query::DisMax(q) => Query::DisMax(DisMaxQuery {
                children: q.children.iter().map(|c| c.accept(visitor)).collect(),
                boost: q.boost,
                tiebreak: q.tiebreak,
            }),
            Query::Not(q) => Query::Not(NotQuery {
                child: Box::new(q.child.accept(visitor)),
                boost: q.boost,
            }),
            Query::Require(q) => Query::Require(RequireQuery {
                scored: Box::new(q.scored.accept(visitor)),
                required: Box::new(q.required.accept(visitor)),
                boost: q.boost,
            }),
            Query::AndMaybe(q) => Query::AndMaybe(AndMaybeQuery {
                required: Box::new(q.required.accept(visitor)),
                optional: Box::new(q.optional.accept(visitor)),
                boost: q.boost,
            }),
            Query::AndNot(q) => Query::AndNot(AndNotQuery {
                positive: Box::new(q.positive.accept(visitor)),
                negative: Box::new(q.negative.accept(visitor)),
                boost: q.boost,
            }),
            leaf => leaf.clone(),
        };
        visitor(rebuilt)
    }

    /// Structural substitution of leaf text: every leaf whose text equals
    /// `old_text` is rewritten with `new_text`. Returns a new tree.
    pub fn replace(&self, old_text: &str, new_text: &str) -> Query {
        self.accept(&mut |node| match node {
            Query::Term(mut q) => {
                if q.text == old_text {
                    q.text = new_text.to_string();
                }
                Query::Term(q)
            }
            Query::Prefix(mut q) => {
                if q.text == old_text {
                    q.text = new_text.to_string();
                }
                Query::Prefix(q)
            }
            Query::Wildcard(mut q) => {
                if q.text == old_text {
                    q.text = new_text.to_string();
                }
                Query::Wildcard(q)
            }
            Query::FuzzyTerm(mut q) => {
                if q.text == old_text {
                    q.text = new_text.to_string();
                }
                Query::FuzzyTerm(q)
            }
            Query::Variations(q) => {
                if q.text == old_text {
                    // Variant forms are a function of the text; recompute.
                    Query::variations(&q.field, new_text).with_boost(q.boost)
                } else {
                    Query::Variations(q)
                }
            }
            Query::Phrase(mut q) => {
                for word in &mut q.words {
                    if word == old_text {
                        *word = new_text.to_string();
                    }
                }
                Query::Phrase(q)
            }
            other => other,
        })
    }

    /// Union of the (field, text) pairs referenced by leaves. Phrase
    /// words contribute only when `phrases` is true; multi-term leaves
    /// contribute nothing except `Variations`, which contributes the
    /// user-supplied text.
    pub fn all_terms(&self, terms: &mut HashSet<(String, String)>, phrases: bool) {
        match self {
            Query::Term(q) => {
                terms.insert((q.field.clone(), q.text.clone()));
            }
            Query::Variations(q) => {
                terms.insert((q.field.clone(), q.text.clone()));
            }
            Query::Phrase(q) => {
                if phrases {
                    for word in &q.words {
                        terms.insert((q.field.clone(), word.clone()));
                    }
                }
            }
            Query::And(q) => {
                for child in &q.children {
                    child.all_terms(terms, phrases);
                }
            }
            Query::Or(q) => {
                for child in &q.children {
                    child.all_terms(terms, phrases);
                }
            }
            Query::DisMax(q) => {
                for child in &q.children {
                    child.all_terms(terms, phrases);
                }
            }
            Query::Not(q) => q.child.all_terms(terms, phrases),
            Query::Require(q) => {
                q.scored.all_terms(terms, phrases);
                q.required.all_terms(terms, phrases);
            }
            Query::AndMaybe(q) => {
                q.required.all_terms(terms, phrases);
                q.optional.all_terms(terms, phrases);
            }
            Query::AndNot(q) => {
                q.positive.all_terms(terms, phrases);
                q.negative.all_terms(terms, phrases);
            }
            Query::Prefix(_)
            | Query::Wildcard(_)
            | Query::FuzzyTerm(_)
            | Query::TermRange(_)
            | Query::Every(_)
            | Query::Null => {}
        }
    }

    /// Like `all_terms` but filtered by presence in the reader;
    /// multi-term leaves expand against the reader and test each word.
    /// `reverse` inverts the predicate, collecting missing terms.
    pub fn existing_terms(
        &self,
        reader: &dyn IndexReader,
        terms: &mut HashSet<(String, String)>,
        reverse: bool,
        phrases: bool,
    ) -> Result<()> {
        let mut check = |field: &str, text: &str, terms: &mut HashSet<(String, String)>| {
            if reader.contains_term(field, text) != reverse {
                terms.insert((field.to_string(), text.to_string()));
            }
        };

        match self {
            Query::Term(q) => check(&q.field, &q.text, terms),
            Query::Phrase(q) => {
                if phrases {
                    for word in &q.words {
                        check(&q.field, word, terms);
                    }
                }
            }
            Query::Prefix(_)
            | Query::Wildcard(_)
            | Query::FuzzyTerm(_)
            | Query::TermRange(_)
            | Query::Variations(_) => {
                let field = match self.field() {
                    Some(field) => field.to_string(),
                    None => return Ok(()),
                };
                for word in self.expanded_words(reader)? {
                    check(&field, &word, terms);
                }
            }
            Query::And(q) => {
                for child in &q.children {
                    child.existing_terms(reader, terms, reverse, phrases)?;
                }
            }
            Query::Or(q) => {
                for child in &q.children {
                    child.existing_terms(reader, terms, reverse, phrases)?;
                }
            }
            Query::DisMax(q) => {
                for child in &q.children {
                    child.existing_terms(reader, terms, reverse, phrases)?;
                }
            }
            Query::Not(q) => q.child.existing_terms(reader, terms, reverse, phrases)?,
            Query::Require(q) => {
                q.scored.existing_terms(reader, terms, reverse, phrases)?;
                q.required.existing_terms(reader, terms, reverse, phrases)?;
            }
            Query::AndMaybe(q) => {
                q.required.existing_terms(reader, terms, reverse, phrases)?;
                q.optional.existing_terms(reader, terms, reverse, phrases)?;
            }
            Query::AndNot(q) => {
                q.positive.existing_terms(reader, terms, reverse, phrases)?;
                q.negative.existing_terms(reader, terms, reverse, phrases)?;
            }
            Query::Every(_) | Query::Null => {}
        }
        Ok(())
    }

    /// The query's doc ids against the reader. A term missing from the
    /// dictionary yields the empty result rather than an error.
    pub fn docs(&self, reader: &dyn IndexReader) -> Result<Vec<DocId>> {
        match self.matcher(reader, None) {
            Ok(mut matcher) => Ok(crate::matcher::all_ids(matcher.as_mut()).collect()),
            Err(err) if err.is_term_not_found() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    /// The query's doc ids as a bitmap; used to fold `Not` children into
    /// an exclusion set.
    pub(crate) fn doc_set(&self, reader: &dyn IndexReader) -> Result<RoaringBitmap> {
        let mut set = RoaringBitmap::new();
        for doc_id in self.docs(reader)? {
            set.insert(doc_id.0);
        }
        Ok(set)
    }
}
