//! Token-set similarity helpers used by the identity resolver.

use std::collections::BTreeSet;

const AFFILIATION_STOPWORDS: &[&str] = &[
    "the", "of", "and", "for", "at", "a", "an", "de", "du", "des", "la", "le", "les", "et", "d",
    "l", "inc", "ltd", "llc",
];

/// Jaccard index of two token sets; `0.0` when either set is empty.
pub fn jaccard(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(right).count();
    let union = left.len() + right.len() - intersection;
    intersection as f64 / union as f64
}

/// Lowercased alphanumeric tokens of an affiliation, stopwords removed.
pub fn affiliation_tokens(value: &str) -> BTreeSet<String> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|token| !token.is_empty() && !AFFILIATION_STOPWORDS.contains(&token.as_str()))
        .collect()
}

/// Token set of an already-normalized name (space separated).
pub fn normalized_name_tokens(normalized_name: &str) -> BTreeSet<String> {
    normalized_name
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Best pairwise similarity between two groups of token sets.
pub fn best_jaccard<'a>(
    left: impl IntoIterator<Item = &'a BTreeSet<String>> + Clone,
    right: impl IntoIterator<Item = &'a BTreeSet<String>>,
) -> f64 {
    let mut best = 0.0_f64;
    for candidate in right {
        for own in left.clone() {
            best = best.max(jaccard(own, candidate));
        }
    }
    best
}
