use rust_stemmers::{Algorithm, Stemmer};

/// Morphological variant forms of a word: the word itself, its stem, and
/// common inflections of the stem. Pure function of the input; callers
/// filter the forms against an index.
pub fn variations(word: &str) -> Vec<String> {
    let stemmer = Stemmer::create(Algorithm::English);
    let stem = stemmer.stem(word).into_owned();

    let mut forms = Vec::new();
    let mut push = |form: String| {
        if !form.is_empty() && !forms.contains(&form) {
            forms.push(form);
        }
    };

    push(word.to_string());
    push(stem.clone());
    for suffix in ["s", "es", "ed", "ing", "er"] {
        push(format!("{}{}", stem, suffix));
    }
    // Stems ending in a dropped silent 'e' ("render" -> "render", but
    // "shade" -> "shade"/"shad"): re-derive from the word too.
    if word != stem {
        for suffix in ["s", "ed", "ing"] {
            push(format!("{}{}", word, suffix));
        }
    }
    forms
}
