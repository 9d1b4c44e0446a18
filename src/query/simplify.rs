use tracing::debug;

use crate::core::error::{Error, Result};
use crate::query::ast::{
    AndQuery, DisMaxQuery, OrQuery, Query,
};
use crate::reader::IndexReader;
use crate::search::fuzzy::similarity;
use crate::search::wildcard::{glob_to_regex, literal_prefix};

impl Query {
    /// Rewrite multi-term leaves into disjunctions of primitive terms by
    /// expanding against the reader, and split `Not` children out of
    /// compounds: `X ∧ ¬Y₁ ∧ … ∧ ¬Yₙ ⇒ AndNot(X, Or(Y₁,…,Yₙ))`.
    pub fn simplify(&self, reader: &dyn IndexReader) -> Result<Query> {
        match self {
            Query::Prefix(_)
            | Query::Wildcard(_)
            | Query::FuzzyTerm(_)
            | Query::TermRange(_)
            | Query::Variations(_) => self.expand(reader),
            Query::And(q) => simplify_compound(
                &q.children,
                reader,
                |children| Query::And(AndQuery { children, boost: q.boost }),
            ),
            Query::Or(q) => simplify_compound(
                &q.children,
                reader,
                |children| Query::Or(OrQuery {
                    children,
                    boost: q.boost,
                    min_match: q.min_match,
                }),
            ),
            Query::DisMax(q) => simplify_compound(
                &q.children,
                reader,
                |children| Query::DisMax(DisMaxQuery {
                    children,
                    boost: q.boost,
                    tiebreak: q.tiebreak,
                }),
            ),
            Query::Not(q) => Ok(Query::not(q.child.simplify(reader)?)
                .with_boost(q.boost)
                .normalize()),
            Query::Require(q) => Ok(Query::require(
                q.scored.simplify(reader)?,
                q.required.simplify(reader)?,
            )
            .with_boost(q.boost)
            .normalize()),
            Query::AndMaybe(q) => Ok(Query::and_maybe(
                q.required.simplify(reader)?,
                q.optional.simplify(reader)?,
            )
            .with_boost(q.boost)
            .normalize()),
            Query::AndNot(q) => Ok(Query::and_not(
                q.positive.simplify(reader)?,
                q.negative.simplify(reader)?,
            )
            .with_boost(q.boost)
            .normalize()),
            other => Ok(other.clone()),
        }
    }

    /// Replace a multi-term leaf by the disjunction of its expansion.
    fn expand(&self, reader: &dyn IndexReader) -> Result<Query> {
        let words = self.expanded_words(reader)?;
        debug!(query = %self, count = words.len(), "expanded multi-term query");
        if words.is_empty() {
            return Ok(Query::Null);
        }
        let field = match self.field() {
            Some(field) => field.to_string(),
            None => return Ok(Query::Null),
        };
        let boost = self.boost();
        let children = words
            .into_iter()
            .map(|word| Query::term(&field, &word).with_boost(boost))
            .collect();
        Ok(Query::or(children).normalize())
    }

    /// The terms a multi-term leaf covers in the reader, in dictionary
    /// order where the underlying iteration provides it.
    pub fn expanded_words(&self, reader: &dyn IndexReader) -> Result<Vec<String>> {
        match self {
            Query::Prefix(q) => Ok(reader.expand_prefix(&q.field, &q.text).collect()),
            Query::Wildcard(q) => {
                let pattern = glob_to_regex(&q.text)?;
                let prefix = literal_prefix(&q.text);
                Ok(reader
                    .expand_prefix(&q.field, prefix)
                    .filter(|word| pattern.is_match(word))
                    .collect())
            }
            Query::FuzzyTerm(q) => {
                if q.text.is_empty() {
                    return Err(Error::query("fuzzy term text is empty"));
                }
                let length = q.text.chars().count();
                let max_dist = ((1.0 - q.min_similarity) * length as f32).ceil() as u32;
                Ok(reader
                    .terms_within(&q.field, &q.text, max_dist, q.prefix_len)
                    .into_iter()
                    .filter(|word| similarity(word, &q.text) > q.min_similarity)
                    .collect())
            }
            Query::TermRange(q) => {
                let mut words = Vec::new();
                for (field, term) in reader.terms_from(&q.field, &q.start) {
                    if field != q.field || term > q.end || (q.end_excl && term == q.end) {
                        break;
                    }
                    if q.start_excl && term == q.start {
                        continue;
                    }
                    words.push(term);
                }
                Ok(words)
            }
            Query::Variations(q) => Ok(q
                .forms
                .iter()
                .filter(|form| reader.contains_term(&q.field, form))
                .cloned()
                .collect()),
            _ => Ok(Vec::new()),
        }
    }
}

/// Compound simplification: positives are simplified recursively, `Not`
/// children split out and folded into one negative disjunction.
fn simplify_compound(
    children: &[Query],
    reader: &dyn IndexReader,
    rebuild: impl FnOnce(Vec<Query>) -> Query,
) -> Result<Query> {
    let mut positives = Vec::new();
    let mut negatives = Vec::new();
    for child in children {
        match child {
            Query::Not(not) => negatives.push((*not.child).clone()),
            other => positives.push(other.simplify(reader)?),
        }
    }

    if positives.is_empty() {
        return Ok(Query::Null);
    }
    let positive = rebuild(positives).normalize();
    if negatives.is_empty() {
        return Ok(positive);
    }
    let negative = Query::or(negatives).normalize().simplify(reader)?;
    Ok(Query::and_not(positive, negative).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InvertedIndex;
    use crate::reader::SegmentReader;

    fn reader_with(terms: &[&str]) -> SegmentReader {
        let mut index = InvertedIndex::new();
        index.add_document(&[("f", terms)]);
        SegmentReader::new(index)
    }

    #[test]
    fn prefix_expands_to_or_of_terms() {
        let reader = reader_with(&["walk", "walked", "walrus"]);
        let simplified = Query::prefix("f", "walk").simplify(&reader).unwrap();
        assert_eq!(
            simplified,
            Query::or(vec![Query::term("f", "walk"), Query::term("f", "walked")])
        );
    }

    #[test]
    fn expansion_carries_boost_onto_terms() {
        let reader = reader_with(&["walk", "walked"]);
        let simplified = Query::prefix("f", "walk")
            .with_boost(2.0)
            .simplify(&reader)
            .unwrap();
        assert_eq!(
            simplified,
            Query::or(vec![
                Query::term("f", "walk").with_boost(2.0),
                Query::term("f", "walked").with_boost(2.0),
            ])
        );
    }

    #[test]
    fn empty_expansion_is_null() {
        let reader = reader_with(&["other"]);
        assert_eq!(
            Query::prefix("f", "walk").simplify(&reader).unwrap(),
            Query::Null
        );
    }

    #[test]
    fn wildcard_expansion_respects_glob() {
        let reader = reader_with(&["shade", "shame", "shape", "shed"]);
        let simplified = Query::wildcard("f", "sha?e").simplify(&reader).unwrap();
        assert_eq!(
            simplified,
            Query::or(vec![
                Query::term("f", "shade"),
                Query::term("f", "shame"),
                Query::term("f", "shape"),
            ])
        );
    }

    #[test]
    fn term_range_expansion_honors_exclusions() {
        let reader = reader_with(&["apple", "banana", "pear", "quince"]);
        let query = Query::term_range("f", "apple", "pear", true, false);
        let words = query.expanded_words(&reader).unwrap();
        assert_eq!(words, vec!["banana", "pear"]);

        let closed = Query::term_range("f", "apple", "pear", false, true);
        let words = closed.expanded_words(&reader).unwrap();
        assert_eq!(words, vec!["apple", "banana"]);
    }

    #[test]
    fn fuzzy_expansion_filters_by_similarity() {
        let reader = reader_with(&["render", "rendre", "rending", "shade"]);
        let query = Query::fuzzy("f", "render", 0.7, 1);
        let mut words = query.expanded_words(&reader).unwrap();
        words.sort();
        assert_eq!(words, vec!["render", "rendre"]);
    }

    #[test]
    fn empty_fuzzy_term_is_a_query_error() {
        let reader = reader_with(&["x"]);
        let err = Query::fuzzy("f", "", 0.5, 0).simplify(&reader).unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::Query);
    }

    #[test]
    fn variations_expansion_checks_membership() {
        let reader = reader_with(&["walk", "walking", "unrelated"]);
        let simplified = Query::variations("f", "walk").simplify(&reader).unwrap();
        assert_eq!(
            simplified,
            Query::or(vec![Query::term("f", "walk"), Query::term("f", "walking")])
        );
    }

    #[test]
    fn nots_split_out_of_conjunction() {
        let reader = reader_with(&["a", "b", "c"]);
        let query = Query::and(vec![
            Query::term("f", "a"),
            Query::not(Query::term("f", "b")),
            Query::not(Query::term("f", "c")),
        ]);
        let simplified = query.simplify(&reader).unwrap();
        assert_eq!(
            simplified,
            Query::and_not(
                Query::term("f", "a"),
                Query::or(vec![Query::term("f", "b"), Query::term("f", "c")]),
            )
        );
    }

    #[test]
    fn compound_of_only_nots_is_null() {
        let reader = reader_with(&["a"]);
        let query = Query::and(vec![Query::not(Query::term("f", "a"))]);
        assert_eq!(query.simplify(&reader).unwrap(), Query::Null);
    }

    #[test]
    fn nested_multi_terms_simplify_in_place() {
        let reader = reader_with(&["walk", "walked", "talk"]);
        let query = Query::and(vec![
            Query::term("f", "talk"),
            Query::prefix("f", "walk"),
        ]);
        let simplified = query.simplify(&reader).unwrap();
        assert_eq!(
            simplified,
            Query::and(vec![
                Query::term("f", "talk"),
                Query::or(vec![Query::term("f", "walk"), Query::term("f", "walked")]),
            ])
        );
    }
}
