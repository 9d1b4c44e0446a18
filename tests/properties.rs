use proptest::prelude::*;

use querent::core::types::DocId;
use querent::index::Posting;
use querent::matcher::{
    all_ids, BoxMatcher, IntersectionMatcher, Matcher, PostingMatcher, UnionMatcher,
};
use querent::query::Query;

fn postings(ids: &[u32]) -> Vec<Posting> {
    ids.iter()
        .map(|&id| Posting { doc_id: DocId(id), weight: 1.0, positions: Vec::new() })
        .collect()
}

fn sorted_ids() -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::btree_set(0u32..500, 0..60)
        .prop_map(|set| set.into_iter().collect())
}

/// A small recursive query tree over a fixed vocabulary.
fn query_tree() -> impl Strategy<Value = Query> {
    let leaf = prop_oneof![
        "[a-d]{1,3}".prop_map(|t| Query::term("f", &t)),
        "[a-d]{1,3}".prop_map(|t| Query::prefix("f", &t)),
        Just(Query::Null),
        Just(Query::every()),
        proptest::collection::vec("[a-d]{1,2}", 0..3)
            .prop_map(|ws| {
                let words: Vec<&str> = ws.iter().map(|w| w.as_str()).collect();
                Query::phrase("f", &words, 1)
            }),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Query::and),
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Query::or),
            inner.clone().prop_map(Query::not),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Query::and_not(a, b)),
            (inner.clone(), inner).prop_map(|(a, b)| Query::and_maybe(a, b)),
        ]
    })
}

proptest! {
    #[test]
    fn normalize_is_idempotent(query in query_tree()) {
        let once = query.normalize();
        prop_assert_eq!(once.normalize(), once);
    }

    #[test]
    fn intersection_matches_set_semantics(a in sorted_ids(), b in sorted_ids()) {
        let list_a = postings(&a);
        let list_b = postings(&b);
        let mut matcher = IntersectionMatcher::new(
            Box::new(PostingMatcher::new(&list_a)),
            Box::new(PostingMatcher::new(&list_b)),
        );
        let got: Vec<u32> = all_ids(&mut matcher).map(|d| d.0).collect();
        let expected: Vec<u32> = a.iter().filter(|id| b.contains(id)).copied().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn union_matches_set_semantics(a in sorted_ids(), b in sorted_ids()) {
        let list_a = postings(&a);
        let list_b = postings(&b);
        let mut matcher = UnionMatcher::new(
            Box::new(PostingMatcher::new(&list_a)),
            Box::new(PostingMatcher::new(&list_b)),
        );
        let got: Vec<u32> = all_ids(&mut matcher).map(|d| d.0).collect();
        let mut expected: Vec<u32> = a.iter().chain(b.iter()).copied().collect();
        expected.sort_unstable();
        expected.dedup();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn combinator_ids_are_strictly_ascending(a in sorted_ids(), b in sorted_ids()) {
        let list_a = postings(&a);
        let list_b = postings(&b);
        let mut matcher = UnionMatcher::new(
            Box::new(PostingMatcher::new(&list_a)),
            Box::new(PostingMatcher::new(&list_b)),
        );
        let got: Vec<u32> = all_ids(&mut matcher).map(|d| d.0).collect();
        for window in got.windows(2) {
            prop_assert!(window[0] < window[1]);
        }
    }

    #[test]
    fn skip_to_lands_at_or_past_target(a in sorted_ids(), b in sorted_ids(), target in 0u32..500) {
        let list_a = postings(&a);
        let list_b = postings(&b);
        let mut matcher: BoxMatcher<'_> = Box::new(UnionMatcher::new(
            Box::new(PostingMatcher::new(&list_a)),
            Box::new(PostingMatcher::new(&list_b)),
        ));
        if matcher.skip_to(DocId(target)) {
            prop_assert!(matcher.doc_id() >= DocId(target));
        } else {
            prop_assert!(!matcher.is_active());
        }
    }
}
