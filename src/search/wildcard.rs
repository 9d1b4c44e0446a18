use regex::Regex;

use crate::core::error::{Error, ErrorKind, Result};

/// Compile a glob pattern (`?` one char, `*` any run) into an anchored
/// regex. Literal segments are escaped.
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 2);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            _ => expr.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');
    Regex::new(&expr)
        .map_err(|e| Error::new(ErrorKind::InvalidInput, format!("invalid wildcard pattern: {}", e)))
}

/// The literal run before the first metacharacter; bounds the dictionary
/// scan for wildcard expansion.
pub fn literal_prefix(pattern: &str) -> &str {
    match pattern.find(['*', '?']) {
        Some(at) => &pattern[..at],
        None => pattern,
    }
}

pub fn has_metachars(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}
