//! Fuzzy-matching primitives, all returning a similarity in `[0, 1]`.
//!
//! Grounded on `original_source/src/utils/matching_utils.py`'s trimmed set
//! of eight kept functions (Levenshtein, Jaccard, token-sort, ensemble,
//! exact/substring match) and on `ner-core/src/features.rs`'s
//! `FeatureVector::dot` for the "weighted linear combination" shape of
//! [`ensemble_fuzzy`]. Every primitive is memoized through [`crate::cache`].

use crate::cache;
use crate::config::{EnsembleWeights, FuzzyLogLevel};
use std::collections::HashSet;
use tracing::trace;

/// Levenshtein edit distance, in characters.
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    if n == 0 {
        return m;
    }
    if m == 0 {
        return n;
    }

    let mut prev: Vec<usize> = (0..=m).collect();
    let mut curr = vec![0usize; m + 1];

    for i in 1..=n {
        curr[0] = i;
        for j in 1..=m {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[m]
}

/// `1 - distance / max(len_a, len_b)`; `1.0` when both strings are empty.
pub fn levenshtein_normalized(a: &str, b: &str) -> f64 {
    cache::memo_levenshtein(a, b, || {
        let max_len = a.chars().count().max(b.chars().count());
        if max_len == 0 {
            return 1.0;
        }
        1.0 - levenshtein_distance(a, b) as f64 / max_len as f64
    })
}

/// Jaccard similarity over whitespace-separated token sets.
pub fn jaccard(a: &str, b: &str) -> f64 {
    cache::memo_jaccard(a, b, || {
        let sa: HashSet<&str> = a.split_whitespace().collect();
        let sb: HashSet<&str> = b.split_whitespace().collect();
        if sa.is_empty() && sb.is_empty() {
            return 1.0;
        }
        let intersection = sa.intersection(&sb).count();
        let union = sa.union(&sb).count();
        if union == 0 {
            0.0
        } else {
            intersection as f64 / union as f64
        }
    })
}

/// Similarity between the space-joined, token-sorted forms of `a` and `b` —
/// catches word-order differences a plain Levenshtein misses.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    cache::memo_token_sort(a, b, || {
        let sort = |s: &str| {
            let mut tokens: Vec<&str> = s.split_whitespace().collect();
            tokens.sort_unstable();
            tokens.join(" ")
        };
        levenshtein_normalized(&sort(a), &sort(b))
    })
}

/// Weighted combination of token-sort, Levenshtein, and Jaccard similarity.
/// `fuzzy_log` gates a per-comparison trace at [`FuzzyLogLevel::Full`]; the
/// coarser `Winners`/`Top3` levels are logged by callers that see the whole
/// candidate set for a query, not here (spec.md §A.2).
pub fn ensemble_fuzzy(a: &str, b: &str, weights: EnsembleWeights, fuzzy_log: FuzzyLogLevel) -> f64 {
    if a == b {
        return 1.0;
    }
    let key_a = format!(
        "{a}\u{0}{:.3}\u{0}{:.3}\u{0}{:.3}",
        weights.token_sort, weights.levenshtein, weights.jaccard
    );
    let score = cache::memo_ensemble(&key_a, b, || {
        weights.token_sort * token_sort_ratio(a, b)
            + weights.levenshtein * levenshtein_normalized(a, b)
            + weights.jaccard * jaccard(a, b)
    });
    if fuzzy_log == FuzzyLogLevel::Full {
        trace!(a, b, score, "ensemble fuzzy comparison");
    }
    score
}

/// Return `text` itself if it's present verbatim in `set`, else `None`.
pub fn exact_match<'a>(text: &str, set: &'a HashSet<String>) -> Option<&'a str> {
    set.get(text).map(|s| s.as_str())
}

/// True when either string contains the other as a substring.
pub fn substring_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(b) || b.contains(a)
}
