use std::collections::HashSet;

use querent::core::types::DocId;
use querent::index::{FieldOptions, InvertedIndex};
use querent::matcher::{Matcher, all_ids};
use querent::query::Query;
use querent::reader::{IndexReader, MultiReader, SegmentReader};
use roaring::RoaringBitmap;

fn ids(query: &Query, reader: &dyn IndexReader) -> Vec<u32> {
    let simplified = query.normalize().simplify(reader).unwrap();
    let mut matcher = simplified.matcher(reader, None).unwrap();
    all_ids(matcher.as_mut()).map(|d| d.0).collect()
}

/// Index docs 0:"render shade", 1:"render texture", 2:"shade texture".
fn render_reader() -> SegmentReader {
    let mut index = InvertedIndex::new();
    index.add_document(&[("c", &["render", "shade"])]);
    index.add_document(&[("c", &["render", "texture"])]);
    index.add_document(&[("c", &["shade", "texture"])]);
    SegmentReader::new(index)
}

#[test]
fn conjunction_of_terms() {
    let reader = render_reader();
    let query = Query::term("c", "render") & Query::term("c", "shade");
    assert_eq!(ids(&query, &reader), vec![0]);
}

#[test]
fn disjunction_of_terms() {
    let reader = render_reader();
    let query = Query::term("c", "render") | Query::term("c", "shade");
    assert_eq!(ids(&query, &reader), vec![0, 1, 2]);
}

#[test]
fn subtraction_of_terms() {
    let reader = render_reader();
    let query = Query::term("c", "render") - Query::term("c", "texture");
    assert_eq!(ids(&query, &reader), vec![0]);
}

#[test]
fn prefix_expands_against_reader() {
    let mut index = InvertedIndex::new();
    index.add_document(&[("path", &["/a/b"])]);
    index.add_document(&[("path", &["/a/c"])]);
    index.add_document(&[("path", &["/b/a"])]);
    let reader = SegmentReader::new(index);

    let simplified = Query::prefix("path", "/a/").simplify(&reader).unwrap();
    assert_eq!(
        simplified,
        Query::or(vec![Query::term("path", "/a/b"), Query::term("path", "/a/c")])
    );
    assert_eq!(ids(&Query::prefix("path", "/a/"), &reader), vec![0, 1]);
}

#[test]
fn phrase_with_slop_one_finds_adjacent_pair() {
    // Positions: "a" at {0, 5}, "b" at {1, 7}; the pair (0, 1) matches.
    let mut index = InvertedIndex::new();
    index.add_document(&[("c", &["a", "b", "x", "x", "x", "a", "x", "b"])]);
    let reader = SegmentReader::new(index);
    let query = Query::phrase("c", &["a", "b"], 1);
    assert_eq!(ids(&query, &reader), vec![0]);
}

#[test]
fn term_range_with_mixed_exclusivity() {
    let mut index = InvertedIndex::new();
    index.add_document(&[("id", &["apple"])]);
    index.add_document(&[("id", &["banana"])]);
    index.add_document(&[("id", &["pear"])]);
    index.add_document(&[("id", &["quince"])]);
    let reader = SegmentReader::new(index);

    let query = Query::term_range("id", "apple", "pear", true, false);
    let words = query.expanded_words(&reader).unwrap();
    assert_eq!(words, vec!["banana", "pear"]);
    assert_eq!(ids(&query, &reader), vec![1, 2]);
}

#[test]
fn intersection_equals_set_intersection() {
    let reader = render_reader();
    let a = Query::term("c", "render");
    let b = Query::term("c", "texture");
    let expected: HashSet<u32> = ids(&a, &reader)
        .into_iter()
        .collect::<HashSet<_>>()
        .intersection(&ids(&b, &reader).into_iter().collect())
        .copied()
        .collect();
    let got: HashSet<u32> = ids(&(a & b), &reader).into_iter().collect();
    assert_eq!(got, expected);
}

#[test]
fn union_equals_set_union() {
    let reader = render_reader();
    let a = Query::term("c", "shade");
    let b = Query::term("c", "texture");
    let expected: HashSet<u32> = ids(&a, &reader)
        .into_iter()
        .chain(ids(&b, &reader))
        .collect();
    let union_ids = ids(&(a | b), &reader);
    let got: HashSet<u32> = union_ids.iter().copied().collect();
    assert_eq!(got, expected);
    // Deduplicated: as many ids as distinct members.
    assert_eq!(union_ids.len(), got.len());
}

#[test]
fn not_is_complement_over_live_docs() {
    let mut index = InvertedIndex::new();
    index.add_document(&[("c", &["keep"])]);
    index.add_document(&[("c", &["drop"])]);
    index.add_document(&[("c", &["keep"])]);
    index.add_document(&[("c", &["other"])]);
    let mut deleted = RoaringBitmap::new();
    deleted.insert(3);
    let reader = SegmentReader::with_deletions(index, deleted);

    let query = Query::not(Query::term("c", "keep"));
    assert_eq!(ids(&query, &reader), vec![1]);
}

#[test]
fn require_matches_like_and_but_scores_like_scored() {
    let mut index = InvertedIndex::new();
    index.add_document(&[("c", &["x", "x", "y"])]);
    index.add_document(&[("c", &["x"])]);
    index.add_document(&[("c", &["y"])]);
    let reader = SegmentReader::new(index);

    let require = Query::require(Query::term("c", "x"), Query::term("c", "y"));
    let and = Query::term("c", "x") & Query::term("c", "y");
    assert_eq!(ids(&require, &reader), ids(&and, &reader));

    let matcher = require.matcher(&reader, None).unwrap();
    // Score comes from the scored child alone: "x" has weight 2 in doc 0.
    assert_eq!(matcher.score(), 2.0);
}

#[test]
fn dis_max_scoring_formula() {
    let mut index = InvertedIndex::new();
    index.add_document(&[("c", &["x", "x", "x", "y", "y"])]);
    let reader = SegmentReader::new(index);

    let query = Query::dis_max(vec![Query::term("c", "x"), Query::term("c", "y")], 0.3);
    let matcher = query.matcher(&reader, None).unwrap();
    let (max, other) = (3.0_f32, 2.0_f32);
    assert_eq!(matcher.score(), max + 0.3 * other);
}

#[test]
fn wildcard_normalization_cases() {
    assert_eq!(Query::wildcard("f", "*").normalize(), Query::every());
    assert_eq!(
        Query::wildcard("f", "abc").normalize(),
        Query::term("f", "abc")
    );
    assert_eq!(
        Query::wildcard("f", "abc*").normalize(),
        Query::prefix("f", "abc")
    );
    let stays = Query::wildcard("f", "a*b");
    assert_eq!(stays.normalize(), stays);
}

#[test]
fn phrase_term_extraction_modes() {
    let query = Query::phrase("f", &["a", "b"], 1);
    let mut without = HashSet::new();
    query.all_terms(&mut without, false);
    assert!(without.is_empty());

    let mut with = HashSet::new();
    query.all_terms(&mut with, true);
    assert_eq!(
        with,
        HashSet::from([
            ("f".to_string(), "a".to_string()),
            ("f".to_string(), "b".to_string()),
        ])
    );
}

#[test]
fn matcher_ids_are_strictly_increasing() {
    let reader = render_reader();
    let queries = vec![
        Query::term("c", "render"),
        Query::term("c", "render") | Query::term("c", "texture"),
        Query::term("c", "shade") & Query::term("c", "texture"),
        Query::not(Query::term("c", "render")),
        Query::every(),
    ];
    for query in queries {
        let sequence = ids(&query, &reader);
        for window in sequence.windows(2) {
            assert!(window[0] < window[1], "not ascending for {}", query);
        }
    }
}

#[test]
fn skip_to_lands_at_or_past_target() {
    let mut index = InvertedIndex::new();
    for _ in 0..20 {
        index.add_document(&[("c", &["x"])]);
    }
    let reader = SegmentReader::new(index);
    let query = Query::term("c", "x");
    let mut matcher = query.matcher(&reader, None).unwrap();
    assert!(matcher.skip_to(DocId(13)));
    assert!(matcher.doc_id() >= DocId(13));
}

#[test]
fn fuzzy_query_end_to_end() {
    let mut index = InvertedIndex::new();
    index.add_document(&[("c", &["render"])]);
    index.add_document(&[("c", &["rendor"])]);
    index.add_document(&[("c", &["shade"])]);
    let reader = SegmentReader::new(index);

    let query = Query::fuzzy("c", "render", 0.7, 1);
    assert_eq!(ids(&query, &reader), vec![0, 1]);
}

#[test]
fn variations_query_end_to_end() {
    let mut index = InvertedIndex::new();
    index.add_document(&[("c", &["walk"])]);
    index.add_document(&[("c", &["walking"])]);
    index.add_document(&[("c", &["jog"])]);
    let reader = SegmentReader::new(index);

    let query = Query::variations("c", "walk");
    assert_eq!(ids(&query, &reader), vec![0, 1]);
}

#[test]
fn multi_segment_search_offsets_ids() {
    let mut first = InvertedIndex::new();
    first.add_document(&[("c", &["render", "shade"])]);
    first.add_document(&[("c", &["texture"])]);
    let mut second = InvertedIndex::new();
    second.add_document(&[("c", &["shade"])]);
    second.add_document(&[("c", &["render"])]);

    let multi = MultiReader::new(vec![
        Box::new(SegmentReader::new(first)),
        Box::new(SegmentReader::new(second)),
    ]);

    assert_eq!(ids(&Query::term("c", "render"), &multi), vec![0, 3]);
    assert_eq!(ids(&Query::term("c", "shade"), &multi), vec![0, 2]);
    let query = Query::term("c", "render") | Query::term("c", "shade");
    assert_eq!(ids(&query, &multi), vec![0, 2, 3]);
}

#[test]
fn phrase_across_vector_field_in_multi_reader() {
    let mut first = InvertedIndex::new();
    first.define_field("c", FieldOptions { positions: false, vectors: true });
    first.add_document(&[("c", &["deep", "blue", "sea"])]);
    let mut second = InvertedIndex::new();
    second.define_field("c", FieldOptions { positions: false, vectors: true });
    second.add_document(&[("c", &["blue", "deep", "sea"])]);
    second.add_document(&[("c", &["deep", "blue", "sky"])]);

    let multi = MultiReader::new(vec![
        Box::new(SegmentReader::new(first)),
        Box::new(SegmentReader::new(second)),
    ]);
    let query = Query::phrase("c", &["deep", "blue"], 1);
    assert_eq!(ids(&query, &multi), vec![0, 2]);
}

#[test]
fn boolean_helper_end_to_end() {
    let mut index = InvertedIndex::new();
    index.add_document(&[("c", &["rust", "search", "engine"])]);
    index.add_document(&[("c", &["rust", "game"])]);
    index.add_document(&[("c", &["search", "engine"])]);
    let reader = SegmentReader::new(index);

    let query = querent::query::BooleanQuery::default()
        .with_required(Query::term("c", "rust"))
        .with_should(Query::term("c", "engine"))
        .with_prohibited(Query::term("c", "game"))
        .build();
    assert_eq!(ids(&query, &reader), vec![0]);
}

#[test]
fn normalization_idempotence_over_assorted_trees() {
    let queries = vec![
        Query::term("f", "a") & (Query::term("f", "b") | Query::term("f", "c")),
        Query::and(vec![
            Query::and(vec![Query::term("f", "a"), Query::term("f", "a")]),
            Query::Null,
        ]),
        Query::wildcard("f", "load*"),
        Query::phrase("f", &["just", "one", "word"], 2),
        Query::require(Query::term("f", "a"), Query::prefix("f", "b")),
        Query::Null,
    ];
    for query in queries {
        let once = query.normalize();
        assert_eq!(once.normalize(), once, "not idempotent for {}", query);
    }
}

#[test]
fn excluded_docs_parameter_filters_everywhere() {
    let reader = render_reader();
    let mut exclude = RoaringBitmap::new();
    exclude.insert(0);

    let query = Query::term("c", "render");
    let mut matcher = query.matcher(&reader, Some(&exclude)).unwrap();
    let got: Vec<u32> = all_ids(matcher.as_mut()).map(|d| d.0).collect();
    assert_eq!(got, vec![1]);

    let mut matcher = Query::every().matcher(&reader, Some(&exclude)).unwrap();
    let got: Vec<u32> = all_ids(matcher.as_mut()).map(|d| d.0).collect();
    assert_eq!(got, vec![1, 2]);
}
