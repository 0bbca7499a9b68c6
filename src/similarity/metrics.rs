//! Lexical similarity metrics over normalized titles
//!
//! Every function here is symmetric in its arguments and returns a value
//! in [0,1]. Empty input scores 0.

use std::collections::HashSet;

/// Edit-distance ratio: `1 - levenshtein / max(len)`, measured in chars.
pub fn edit_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(a, b)
}

fn char_ngrams(s: &str, n: usize) -> HashSet<String> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < n {
        return std::iter::once(s.to_string()).collect();
    }
    chars.windows(n).map(|w| w.iter().collect()).collect()
}

/// Jaccard index over character bigrams.
pub fn bigram_jaccard(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let na = char_ngrams(a, 2);
    let nb = char_ngrams(b, 2);
    let inter = na.intersection(&nb).count();
    let union = na.union(&nb).count();
    if union == 0 {
        0.0
    } else {
        inter as f64 / union as f64
    }
}

/// Token-set ratio in the style of fuzzy string matchers.
///
/// Shared tokens are compared against each side's shared-plus-remaining
/// tokens; the best pairwise edit ratio wins. A title whose tokens are all
/// contained in the other scores 1.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let ta: HashSet<&str> = a.split_whitespace().collect();
    let tb: HashSet<&str> = b.split_whitespace().collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let mut inter: Vec<&str> = ta.intersection(&tb).copied().collect();
    let mut only_a: Vec<&str> = ta.difference(&tb).copied().collect();
    let mut only_b: Vec<&str> = tb.difference(&ta).copied().collect();
    inter.sort_unstable();
    only_a.sort_unstable();
    only_b.sort_unstable();

    if !inter.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 1.0;
    }

    let sect = inter.join(" ");
    let combined_a = inter.iter().chain(only_a.iter()).copied().collect::<Vec<_>>().join(" ");
    let combined_b = inter.iter().chain(only_b.iter()).copied().collect::<Vec<_>>().join(" ");

    edit_ratio(&sect, &combined_a)
        .max(edit_ratio(&sect, &combined_b))
        .max(edit_ratio(&combined_a, &combined_b))
}

/// Cosine similarity of two vectors; `None` for mismatched or zero vectors.
pub fn cosine(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}
