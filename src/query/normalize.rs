use std::collections::HashSet;

use crate::query::ast::{
    AndMaybeQuery, AndNotQuery, AndQuery, DisMaxQuery, NotQuery, OrQuery, Query, RequireQuery,
};
use crate::search::wildcard::{has_metachars, literal_prefix};

/// Which compound variant is being rebuilt, with its parameters carried
/// through the rewrite.
enum CompoundShape {
    And { boost: f32 },
    Or { boost: f32, min_match: u32 },
    DisMax { boost: f32, tiebreak: f32 },
}

impl CompoundShape {
    fn rebuild(&self, children: Vec<Query>) -> Query {
        match *self {
            CompoundShape::And { boost } => Query::And(AndQuery { children, boost }),
            CompoundShape::Or { boost, min_match } => {
                Query::Or(OrQuery { children, boost, min_match })
            }
            CompoundShape::DisMax { boost, tiebreak } => {
                Query::DisMax(DisMaxQuery { children, boost, tiebreak })
            }
        }
    }

    fn boost(&self) -> f32 {
        match *self {
            CompoundShape::And { boost } => boost,
            CompoundShape::Or { boost, .. } => boost,
            CompoundShape::DisMax { boost, .. } => boost,
        }
    }

    /// True when the child is the same compound variant, so associativity
    /// lets its children be hoisted.
    fn same_variant(&self, child: &Query) -> bool {
        matches!(
            (self, child),
            (CompoundShape::And { .. }, Query::And(_))
                | (CompoundShape::Or { .. }, Query::Or(_))
                | (CompoundShape::DisMax { .. }, Query::DisMax(_))
        )
    }
}

impl Query {
    /// Purely syntactic rewrite into canonical form: null absorption,
    /// associativity flattening, direct duplicate-term coalescing,
    /// degenerate-variant downgrades. Idempotent; never consults a
    /// reader.
    pub fn normalize(&self) -> Query {
        match self {
            Query::And(q) => normalize_compound(
                &q.children,
                CompoundShape::And { boost: q.boost },
            ),
            Query::Or(q) => normalize_compound(
                &q.children,
                CompoundShape::Or { boost: q.boost, min_match: q.min_match },
            ),
            Query::DisMax(q) => normalize_compound(
                &q.children,
                CompoundShape::DisMax { boost: q.boost, tiebreak: q.tiebreak },
            ),
            Query::Not(q) => match q.child.normalize() {
                Query::Null => Query::Null,
                child => Query::Not(NotQuery { child: Box::new(child), boost: q.boost }),
            },
            Query::Require(q) => {
                let scored = q.scored.normalize();
                let required = q.required.normalize();
                if scored.is_null() || required.is_null() {
                    Query::Null
                } else {
                    Query::Require(RequireQuery {
                        scored: Box::new(scored),
                        required: Box::new(required),
                        boost: q.boost,
                    })
                }
            }
            Query::AndMaybe(q) => {
                let required = q.required.normalize();
                let optional = q.optional.normalize();
                match (required, optional) {
                    (Query::Null, _) => Query::Null,
                    (required, Query::Null) => required,
                    (required, optional) => Query::AndMaybe(AndMaybeQuery {
                        required: Box::new(required),
                        optional: Box::new(optional),
                        boost: q.boost,
                    }),
                }
            }
            Query::AndNot(q) => {
                let positive = q.positive.normalize();
                let negative = q.negative.normalize();
                match (positive, negative) {
                    (Query::Null, _) => Query::Null,
                    (positive, Query::Null) => positive,
                    (positive, negative) => Query::AndNot(AndNotQuery {
                        positive: Box::new(positive),
                        negative: Box::new(negative),
                        boost: q.boost,
                    }),
                }
            }
            Query::Wildcard(q) => {
                if q.text == "*" {
                    Query::every().with_boost(q.boost)
                } else if !has_metachars(&q.text) {
                    Query::term(&q.field, &q.text).with_boost(q.boost)
                } else if let Some(prefix) = trailing_star_prefix(&q.text) {
                    Query::prefix(&q.field, prefix).with_boost(q.boost)
                } else {
                    Query::Wildcard(q.clone())
                }
            }
            Query::TermRange(q) => {
                if q.start == q.end {
                    Query::term(&q.field, &q.start).with_boost(q.boost)
                } else {
                    Query::TermRange(q.clone())
                }
            }
            Query::Phrase(q) => match q.words.as_slice() {
                [] => Query::Null,
                [word] => Query::term(&q.field, word).with_boost(q.boost),
                _ => Query::Phrase(q.clone()),
            },
            other => other.clone(),
        }
    }
}

/// The prefix of a glob whose only metacharacter is a single trailing
/// `*`, if it has that shape.
fn trailing_star_prefix(pattern: &str) -> Option<&str> {
    let prefix = pattern.strip_suffix('*')?;
    if has_metachars(prefix) {
        return None;
    }
    debug_assert_eq!(literal_prefix(pattern), prefix);
    Some(prefix)
}

fn normalize_compound(children: &[Query], shape: CompoundShape) -> Query {
    // Normalize children first, hoist same-variant compounds (their boost
    // multiplies into the hoisted children), and drop nulls.
    let mut flattened: Vec<Query> = Vec::with_capacity(children.len());
    for child in children {
        match child.normalize() {
            Query::Null => {}
            normalized if shape.same_variant(&normalized) => {
                let (inner_children, inner_boost) = match normalized {
                    Query::And(inner) => (inner.children, inner.boost),
                    Query::Or(inner) => (inner.children, inner.boost),
                    Query::DisMax(inner) => (inner.children, inner.boost),
                    _ => unreachable!("same_variant only matches compounds"),
                };
                for hoisted in inner_children {
                    if inner_boost != 1.0 {
                        let boost = hoisted.boost() * inner_boost;
                        flattened.push(hoisted.with_boost(boost));
                    } else {
                        flattened.push(hoisted);
                    }
                }
            }
            normalized => flattened.push(normalized),
        }
    }

    // Coalesce duplicate direct Term children by (field, text), keeping
    // the first. Applies only at this level, never to nested subtrees.
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut deduped: Vec<Query> = Vec::with_capacity(flattened.len());
    for child in flattened {
        if let Query::Term(term) = &child {
            if !seen.insert((term.field.clone(), term.text.clone())) {
                continue;
            }
        }
        deduped.push(child);
    }

    match deduped.len() {
        0 => Query::Null,
        1 => {
            let only = deduped.remove(0);
            if shape.boost() != 1.0 {
                let boost = only.boost() * shape.boost();
                only.with_boost(boost)
            } else {
                only
            }
        }
        _ => shape.rebuild(deduped),
    }
}
