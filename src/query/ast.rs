use std::fmt;
use std::ops::{BitAnd, BitOr, Sub};

use serde::{Deserialize, Serialize};

use crate::search::variations::variations;

/// Main query enum representing all query tree node variants. Queries are
/// immutable after construction; rewrites return new trees. The tree
/// itself is the executable representation; `Display` renders an
/// advisory debug form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Term(TermQuery),
    And(AndQuery),
    Or(OrQuery),
    DisMax(DisMaxQuery),
    Not(NotQuery),
    Prefix(PrefixQuery),
    Wildcard(WildcardQuery),
    FuzzyTerm(FuzzyTermQuery),
    TermRange(TermRangeQuery),
    Variations(VariationsQuery),
    Phrase(PhraseQuery),
    Require(RequireQuery),
    AndMaybe(AndMaybeQuery),
    AndNot(AndNotQuery),
    Every(EveryQuery),
    /// The empty set.
    Null,
}

/// Leaf matching a single indexed term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub text: String,
    pub boost: f32,
}

/// Conjunction: matches iff every child matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AndQuery {
    pub children: Vec<Query>,
    pub boost: f32,
}

/// Disjunction, with an optional minimum number of children that must
/// match per document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrQuery {
    pub children: Vec<Query>,
    pub boost: f32,
    pub min_match: u32,
}

/// Disjunction scored by the maximum child score plus `tiebreak` times
/// the sum of the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisMaxQuery {
    pub children: Vec<Query>,
    pub boost: f32,
    pub tiebreak: f32,
}

/// Set complement over the universe of live doc ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotQuery {
    pub child: Box<Query>,
    pub boost: f32,
}

/// Multi-term: all terms of the field beginning with the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixQuery {
    pub field: String,
    pub text: String,
    pub boost: f32,
}

/// Multi-term: all terms matching a glob with `?` (single char) and `*`
/// (any run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WildcardQuery {
    pub field: String,
    pub text: String,
    pub boost: f32,
}

/// Multi-term: terms sharing `prefix_len` initial characters whose
/// Damerau-Levenshtein similarity to the text exceeds `min_similarity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyTermQuery {
    pub field: String,
    pub text: String,
    pub boost: f32,
    pub min_similarity: f32,
    pub prefix_len: usize,
}

/// Multi-term: all terms in a half or fully closed interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermRangeQuery {
    pub field: String,
    pub start: String,
    pub end: String,
    pub start_excl: bool,
    pub end_excl: bool,
    pub boost: f32,
}

/// Multi-term: morphological variants of the text that exist in the
/// index. Variant forms are precomputed at construction; the index is
/// only consulted when expanding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationsQuery {
    pub field: String,
    pub text: String,
    pub boost: f32,
    pub forms: Vec<String>,
}

/// Positional match with intra-word gap tolerance `slop`; slop 1 means
/// adjacent words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseQuery {
    pub field: String,
    pub words: Vec<String>,
    pub slop: u32,
    pub boost: f32,
}

/// Doc ids from `scored` intersected with `required`; scores come only
/// from `scored`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequireQuery {
    pub scored: Box<Query>,
    pub required: Box<Query>,
    pub boost: f32,
}

/// Doc ids from `required`; scores added from `optional` when it also
/// matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AndMaybeQuery {
    pub required: Box<Query>,
    pub optional: Box<Query>,
    pub boost: f32,
}

/// Doc ids of `positive` minus those of `negative`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AndNotQuery {
    pub positive: Box<Query>,
    pub negative: Box<Query>,
    pub boost: f32,
}

/// The universal set minus deletions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EveryQuery {
    pub boost: f32,
}

impl Query {
    pub fn term(field: &str, text: &str) -> Query {
        Query::Term(TermQuery { field: field.to_string(), text: text.to_string(), boost: 1.0 })
    }

    pub fn and(children: Vec<Query>) -> Query {
        Query::And(AndQuery { children, boost: 1.0 })
    }

    pub fn or(children: Vec<Query>) -> Query {
        Query::Or(OrQuery { children, boost: 1.0, min_match: 0 })
    }

    pub fn dis_max(children: Vec<Query>, tiebreak: f32) -> Query {
        Query::DisMax(DisMaxQuery { children, boost: 1.0, tiebreak })
    }

    pub fn not(child: Query) -> Query {
        Query::Not(NotQuery { child: Box::new(child), boost: 1.0 })
    }

    pub fn prefix(field: &str, text: &str) -> Query {
        Query::Prefix(PrefixQuery { field: field.to_string(), text: text.to_string(), boost: 1.0 })
    }

    pub fn wildcard(field: &str, text: &str) -> Query {
        Query::Wildcard(WildcardQuery {
            field: field.to_string(),
            text: text.to_string(),
            boost: 1.0,
        })
    }

    pub fn fuzzy(field: &str, text: &str, min_similarity: f32, prefix_len: usize) -> Query {
        Query::FuzzyTerm(FuzzyTermQuery {
            field: field.to_string(),
            text: text.to_string(),
            boost: 1.0,
            min_similarity,
            prefix_len,
        })
    }

    pub fn term_range(
        field: &str,
        start: &str,
        end: &str,
        start_excl: bool,
        end_excl: bool,
    ) -> Query {
        Query::TermRange(TermRangeQuery {
            field: field.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            start_excl,
            end_excl,
            boost: 1.0,
        })
    }

    pub fn variations(field: &str, text: &str) -> Query {
        Query::Variations(VariationsQuery {
            field: field.to_string(),
            text: text.to_string(),
            boost: 1.0,
            forms: variations(text),
        })
    }

    pub fn phrase(field: &str, words: &[&str], slop: u32) -> Query {
        Query::Phrase(PhraseQuery {
            field: field.to_string(),
            words: words.iter().map(|w| w.to_string()).collect(),
            slop,
            boost: 1.0,
        })
    }

    pub fn require(scored: Query, required: Query) -> Query {
        Query::Require(RequireQuery {
            scored: Box::new(scored),
            required: Box::new(required),
            boost: 1.0,
        })
    }

    pub fn and_maybe(required: Query, optional: Query) -> Query {
        Query::AndMaybe(AndMaybeQuery {
            required: Box::new(required),
            optional: Box::new(optional),
            boost: 1.0,
        })
    }

    pub fn and_not(positive: Query, negative: Query) -> Query {
        Query::AndNot(AndNotQuery {
            positive: Box::new(positive),
            negative: Box::new(negative),
            boost: 1.0,
        })
    }

    pub fn every() -> Query {
        Query::Every(EveryQuery { boost: 1.0 })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Query::Null)
    }

    pub fn boost(&self) -> f32 {
        match self {
            Query::Term(q) => q.boost,
            Query::And(q) => q.boost,
            Query::Or(q) => q.boost,
            Query::DisMax(q) => q.boost,
            Query::Not(q) => q.boost,
            Query::Prefix(q) => q.boost,
            Query::Wildcard(q) => q.boost,
            Query::FuzzyTerm(q) => q.boost,
            Query::TermRange(q) => q.boost,
            Query::Variations(q) => q.boost,
            Query::Phrase(q) => q.boost,
            Query::Require(q) => q.boost,
            Query::AndMaybe(q) => q.boost,
            Query::AndNot(q) => q.boost,
            Query::Every(q) => q.boost,
            Query::Null => 1.0,
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Query {
        match &mut self {
            Query::Term(q) => q.boost = boost,
            Query::And(q) => q.boost = boost,
            Query::Or(q) => q.boost = boost,
            Query::DisMax(q) => q.boost = boost,
            Query::Not(q) => q.boost = boost,
            Query::Prefix(q) => q.boost = boost,
            Query::Wildcard(q) => q.boost = boost,
            Query::FuzzyTerm(q) => q.boost = boost,
            Query::TermRange(q) => q.boost = boost,
            Query::Variations(q) => q.boost = boost,
            Query::Phrase(q) => q.boost = boost,
            Query::Require(q) => q.boost = boost,
            Query::AndMaybe(q) => q.boost = boost,
            Query::AndNot(q) => q.boost = boost,
            Query::Every(q) => q.boost = boost,
            Query::Null => {}
        }
        self
    }

    /// The field a leaf is bound to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Query::Term(q) => Some(&q.field),
            Query::Prefix(q) => Some(&q.field),
            Query::Wildcard(q) => Some(&q.field),
            Query::FuzzyTerm(q) => Some(&q.field),
            Query::TermRange(q) => Some(&q.field),
            Query::Variations(q) => Some(&q.field),
            Query::Phrase(q) => Some(&q.field),
            _ => None,
        }
    }
}

impl BitAnd for Query {
    type Output = Query;

    fn bitand(self, rhs: Query) -> Query {
        Query::and(vec![self, rhs])
    }
}

impl BitOr for Query {
    type Output = Query;

    fn bitor(self, rhs: Query) -> Query {
        Query::or(vec![self, rhs])
    }
}

impl Sub for Query {
    type Output = Query;

    fn sub(self, rhs: Query) -> Query {
        Query::and_not(self, rhs)
    }
}

fn join(children: &[Query], separator: &str) -> String {
    children
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Query::Term(q) => {
                write!(f, "{}:{}", q.field, q.text)?;
                if q.boost != 1.0 {
                    write!(f, "^{}", q.boost)?;
                }
                Ok(())
            }
            Query::And(q) => write!(f, "({})", join(&q.children, " AND ")),
            Query::Or(q) => {
                write!(f, "({})", join(&q.children, " OR "))?;
                if q.min_match > 0 {
                    write!(f, ">{}", q.min_match)?;
                }
                Ok(())
            }
            Query::DisMax(q) => {
                write!(f, "DisMax({})", join(&q.children, " "))?;
                if q.tiebreak != 0.0 {
                    write!(f, "~{}", q.tiebreak)?;
                }
                Ok(())
            }
            Query::Not(q) => write!(f, "NOT {}", q.child),
            Query::Prefix(q) => write!(f, "{}:{}*", q.field, q.text),
            Query::Wildcard(q) => write!(f, "{}:{}", q.field, q.text),
            Query::FuzzyTerm(q) => write!(f, "{}:{}~", q.field, q.text),
            Query::TermRange(q) => write!(
                f,
                "{}:{}{} TO {}{}",
                q.field,
                if q.start_excl { '{' } else { '[' },
                q.start,
                q.end,
                if q.end_excl { '}' } else { ']' },
            ),
            Query::Variations(q) => write!(f, "{}:<{}>", q.field, q.text),
            Query::Phrase(q) => write!(f, "{}:\"{}\"", q.field, q.words.join(" ")),
            Query::Require(q) => write!(f, "({} REQUIRE {})", q.scored, q.required),
            Query::AndMaybe(q) => write!(f, "({} ANDMAYBE {})", q.required, q.optional),
            Query::AndNot(q) => write!(f, "({} ANDNOT {})", q.positive, q.negative),
            Query::Every(_) => write!(f, "*"),
            Query::Null => write!(f, "<Null>"),
        }
    }
}
