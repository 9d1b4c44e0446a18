use roaring::RoaringBitmap;
use tracing::{debug, trace};

use crate::core::error::{Error, Result};
use crate::matcher::{
    AndMaybeMatcher, BoxMatcher, DisMaxMatcher, EveryMatcher, FilterMatcher, IntersectionMatcher,
    InverseMatcher, NullMatcher, PhraseMatcher, RequireMatcher, UnionMatcher, VectorPhraseMatcher,
    WrappingMatcher, make_tree,
};
use crate::query::ast::{PhraseQuery, Query};
use crate::reader::IndexReader;

/// How a compound's positive children are combined.
#[derive(Clone, Copy)]
enum Combine {
    Intersection,
    Union,
    DisMax { tiebreak: f32 },
}

impl Query {
    /// Build the streaming matcher for this query against a reader.
    /// `exclude` is a set of doc ids that must not appear in the result;
    /// `Not` children of compounds are folded into it on the way down.
    pub fn matcher<'a>(
        &self,
        reader: &'a dyn IndexReader,
        exclude: Option<&RoaringBitmap>,
    ) -> Result<BoxMatcher<'a>> {
        match self {
            Query::Null => Ok(Box::new(NullMatcher)),
            Query::Term(q) => {
                let matcher: BoxMatcher<'a> = match reader.postings(&q.field, &q.text) {
                    Ok(matcher) => filter_excluded(matcher, exclude),
                    Err(err) if err.is_term_not_found() => Box::new(NullMatcher),
                    Err(err) => return Err(err),
                };
                Ok(wrap_boost(matcher, q.boost))
            }
            Query::Every(q) => {
                let mut missing = reader.deleted_docs();
                if let Some(exclude) = exclude {
                    missing |= exclude;
                }
                let matcher = Box::new(EveryMatcher::new(reader.doc_count_all(), missing));
                Ok(wrap_boost(matcher, q.boost))
            }
            Query::Not(q) => {
                let mut missing = reader.deleted_docs();
                if let Some(exclude) = exclude {
                    missing |= exclude;
                }
                let child = q.child.matcher(reader, None)?;
                Ok(Box::new(InverseMatcher::new(
                    child,
                    reader.doc_count_all(),
                    missing,
                )))
            }
            Query::And(q) => {
                compound_matcher(&q.children, reader, exclude, Combine::Intersection, q.boost)
            }
            Query::Or(q) => {
                compound_matcher(&q.children, reader, exclude, Combine::Union, q.boost)
            }
            Query::DisMax(q) => compound_matcher(
                &q.children,
                reader,
                exclude,
                Combine::DisMax { tiebreak: q.tiebreak },
                q.boost,
            ),
            Query::Prefix(_)
            | Query::Wildcard(_)
            | Query::FuzzyTerm(_)
            | Query::TermRange(_)
            | Query::Variations(_) => multi_term_matcher(self, reader, exclude),
            Query::Phrase(q) => phrase_matcher(q, reader, exclude),
            Query::Require(q) => {
                let scored = q.scored.matcher(reader, exclude)?;
                let required = q.required.matcher(reader, exclude)?;
                Ok(wrap_boost(
                    Box::new(RequireMatcher::new(scored, required)),
                    q.boost,
                ))
            }
            Query::AndMaybe(q) => {
                let required = q.required.matcher(reader, exclude)?;
                let optional = q.optional.matcher(reader, exclude)?;
                Ok(wrap_boost(
                    Box::new(AndMaybeMatcher::new(required, optional)),
                    q.boost,
                ))
            }
            Query::AndNot(q) => {
                let mut excluded = q.negative.doc_set(reader)?;
                if let Some(exclude) = exclude {
                    excluded |= exclude;
                }
                let positive = q.positive.matcher(reader, Some(&excluded))?;
                Ok(wrap_boost(positive, q.boost))
            }
        }
    }

    /// Rough upper bound on the number of documents this query could
    /// match; used to order subqueries so the cheapest streams drive
    /// intersections.
    pub fn estimate_size(&self, reader: &dyn IndexReader) -> u64 {
        match self {
            Query::Null => 0,
            Query::Term(q) => reader.doc_frequency(&q.field, &q.text) as u64,
            Query::Every(_) | Query::Not(_) => reader.doc_count() as u64,
            Query::And(q) => q
                .children
                .iter()
                .map(|c| c.estimate_size(reader))
                .min()
                .unwrap_or(0),
            Query::Or(q) => sum_clamped(&q.children, reader),
            Query::DisMax(q) => sum_clamped(&q.children, reader),
            Query::Phrase(q) => q
                .words
                .iter()
                .map(|word| reader.doc_frequency(&q.field, word) as u64)
                .min()
                .unwrap_or(0),
            Query::Prefix(_)
            | Query::Wildcard(_)
            | Query::FuzzyTerm(_)
            | Query::TermRange(_)
            | Query::Variations(_) => {
                let field = match self.field() {
                    Some(field) => field,
                    None => return 0,
                };
                match self.expanded_words(reader) {
                    Ok(words) => words
                        .iter()
                        .map(|word| reader.doc_frequency(field, word) as u64)
                        .sum::<u64>()
                        .min(reader.doc_count_all() as u64),
                    Err(_) => 0,
                }
            }
            Query::Require(q) => q.scored.estimate_size(reader),
            Query::AndMaybe(q) => q.required.estimate_size(reader),
            Query::AndNot(q) => q.positive.estimate_size(reader),
        }
    }
}

fn sum_clamped(children: &[Query], reader: &dyn IndexReader) -> u64 {
    children
        .iter()
        .map(|c| c.estimate_size(reader))
        .sum::<u64>()
        .min(reader.doc_count_all() as u64)
}

fn wrap_boost(matcher: BoxMatcher<'_>, boost: f32) -> BoxMatcher<'_> {
    if boost != 1.0 {
        Box::new(WrappingMatcher::new(matcher, boost))
    } else {
        matcher
    }
}

fn filter_excluded<'a>(
    matcher: BoxMatcher<'a>,
    exclude: Option<&RoaringBitmap>,
) -> BoxMatcher<'a> {
    match exclude {
        Some(exclude) if !exclude.is_empty() => {
            Box::new(FilterMatcher::new(matcher, exclude.clone(), true))
        }
        _ => matcher,
    }
}

/// Matchers for a compound's positive children, ordered by estimated
/// size and composed as a balanced binary tree. `Not` children are
/// folded into the exclusion set first.
fn compound_matcher<'a>(
    children: &[Query],
    reader: &'a dyn IndexReader,
    exclude: Option<&RoaringBitmap>,
    combine: Combine,
    boost: f32,
) -> Result<BoxMatcher<'a>> {
    let mut positives: Vec<&Query> = Vec::with_capacity(children.len());
    let mut excluded = exclude.cloned().unwrap_or_default();
    for child in children {
        match child {
            Query::Not(not) => {
                excluded |= not.child.doc_set(reader)?;
            }
            positive => positives.push(positive),
        }
    }
    if positives.is_empty() {
        return Ok(Box::new(NullMatcher));
    }

    let mut sized: Vec<(u64, &Query)> = positives
        .into_iter()
        .map(|q| (q.estimate_size(reader), q))
        .collect();
    sized.sort_by_key(|(size, _)| *size);
    trace!(
        order = ?sized.iter().map(|(size, q)| (*size, q.to_string())).collect::<Vec<_>>(),
        "ordered subqueries by estimated size"
    );

    let exclude = if excluded.is_empty() { None } else { Some(&excluded) };
    let matchers = sized
        .into_iter()
        .map(|(_, q)| q.matcher(reader, exclude))
        .collect::<Result<Vec<_>>>()?;

    let tree = match combine {
        Combine::Intersection => make_tree(
            &|a, b| Box::new(IntersectionMatcher::new(a, b)) as BoxMatcher<'a>,
            matchers,
        ),
        Combine::Union => make_tree(
            &|a, b| Box::new(UnionMatcher::new(a, b)) as BoxMatcher<'a>,
            matchers,
        ),
        Combine::DisMax { tiebreak } => make_tree(
            &|a, b| Box::new(DisMaxMatcher::new(a, b, tiebreak)) as BoxMatcher<'a>,
            matchers,
        ),
    };
    Ok(wrap_boost(tree, boost))
}

/// Union matcher over a multi-term leaf's expansion. Words that vanished
/// from the dictionary between expansion and matching are skipped; the
/// remaining words are still combined.
fn multi_term_matcher<'a>(
    query: &Query,
    reader: &'a dyn IndexReader,
    exclude: Option<&RoaringBitmap>,
) -> Result<BoxMatcher<'a>> {
    let field = match query.field() {
        Some(field) => field.to_string(),
        None => return Ok(Box::new(NullMatcher)),
    };
    let mut matchers: Vec<BoxMatcher<'a>> = Vec::new();
    for word in query.expanded_words(reader)? {
        match reader.postings(&field, &word) {
            Ok(matcher) => matchers.push(matcher),
            Err(err) if err.is_term_not_found() => continue,
            Err(err) => return Err(err),
        }
    }
    let tree = make_tree(
        &|a, b| Box::new(UnionMatcher::new(a, b)) as BoxMatcher<'a>,
        matchers,
    );
    Ok(wrap_boost(filter_excluded(tree, exclude), query.boost()))
}

/// Choose the phrase strategy: positions stored in postings first, then
/// per-document term vectors.
fn phrase_matcher<'a>(
    query: &PhraseQuery,
    reader: &'a dyn IndexReader,
    exclude: Option<&RoaringBitmap>,
) -> Result<BoxMatcher<'a>> {
    if query.words.is_empty() {
        return Ok(Box::new(NullMatcher));
    }
    // A phrase with any word absent cannot match at all.
    if query
        .words
        .iter()
        .any(|word| !reader.contains_term(&query.field, word))
    {
        return Ok(Box::new(NullMatcher));
    }

    let mut words: Vec<BoxMatcher<'a>> = Vec::with_capacity(query.words.len());
    for word in &query.words {
        words.push(reader.postings(&query.field, word)?);
    }

    let matcher: BoxMatcher<'a> = if reader.stores_positions(&query.field) {
        debug!(field = %query.field, "phrase matching over posting positions");
        Box::new(PhraseMatcher::new(words, query.slop))
    } else if reader.stores_vectors(&query.field) {
        debug!(field = %query.field, "phrase matching over term vectors");
        Box::new(VectorPhraseMatcher::new(
            words,
            query.words.clone(),
            reader,
            &query.field,
            query.slop,
        ))
    } else {
        return Err(Error::query(format!(
            "field {} stores neither positions nor term vectors; cannot match a phrase",
            query.field
        )));
    };
    Ok(wrap_boost(filter_excluded(matcher, exclude), query.boost))
}
