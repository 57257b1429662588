//! N-gram enumeration and explicit administrative-pattern detection
//! (spec.md §4.6.1, §4.6.2).
//!
//! The n-gram enumerator mirrors `ner-core/src/rule_based.rs`'s gazetteer
//! scan (`'outer_org` loop trying progressively shorter windows at each
//! start position) but inverted to emit the windows themselves rather than
//! immediately matching them against a fixed gazetteer — potentials
//! extraction in `extractor.rs` does that matching step. Keyword/noise-word
//! vocabularies are carried verbatim from
//! `original_source/src/utils/extraction_utils.py`'s `ADMIN_KEYWORDS` and
//! `ADMIN_NOISE_WORDS`.

use crate::text::normalize_admin_number;
use crate::token::{Token, TokenRange};
use std::collections::HashSet;

/// A contiguous token slice carrying its range and whether it's immediately
/// preceded by an administrative keyword (spec.md §3 "N-gram").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ngram {
    pub text: String,
    pub range: TokenRange,
    pub has_keyword: bool,
}

/// Single-token admin keywords used for the n-gram `has_keyword` flag
/// (spec.md §3): includes the halves of two-word prefixes ("thi xa" →
/// `thi`, `xa`; "thanh pho" → `thanh`, `pho`) as independent tokens.
const KEYWORD_TOKENS: &[&str] = &[
    "phuong", "xa", "quan", "huyen", "thi", "tran", "thanh", "pho", "tp", "tx", "p", "q", "h", "x",
];

fn is_keyword(token: &str) -> bool {
    KEYWORD_TOKENS.contains(&token)
}

/// Enumerate all contiguous slices of length `1..=min(max_len, n)`, longer
/// first, each carrying its range and keyword-preceded flag.
pub fn enumerate_ngrams(tokens: &[Token], max_len: usize) -> Vec<Ngram> {
    let n = tokens.len();
    let max_len = max_len.min(n).max(0);
    let mut ngrams = Vec::new();
    for len in (1..=max_len).rev() {
        for start in 0..=(n - len) {
            let end = start + len;
            let text = tokens[start..end]
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let has_keyword = start > 0 && is_keyword(&tokens[start - 1].text);
            ngrams.push(Ngram {
                text,
                range: TokenRange::new(start, end),
                has_keyword,
            });
        }
    }
    ngrams
}

/// Administrative level a forced explicit-pattern candidate targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplicitLevel {
    District,
    Ward,
}

/// A forced candidate produced by explicit-pattern detection; score is
/// always 1.0 and these are never dropped by the fuzzy threshold (spec.md
/// §4.6.2) — only the noise-word filter can discard one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitMatch {
    pub level: ExplicitLevel,
    pub name: String,
    pub range: TokenRange,
}

/// Institutional-vocabulary noise words that disqualify an otherwise
/// keyword-triggered span (e.g. `huyen ubnd xxx` is not a district named
/// "ubnd xxx"). Carried verbatim from `ADMIN_NOISE_WORDS`; multi-word
/// entries are matched against the joined span text, not per-token.
const NOISE_WORDS: &[&str] = &[
    "ubnd",
    "phong",
    "ban",
    "cong ty",
    "chi nhanh",
    "van phong",
    "so",
    "khach san",
    "nha hang",
    "truong",
    "benh vien",
    "cong an",
    "vien",
    "ngan hang",
    "ngai hang",
    "buu dien",
    "bo",
    "to chuc",
    "don vi",
    "dai hoc",
    "hoc vien",
    "toa nha",
    "cua hang",
    "sieu thi",
    "trung tam",
];

/// True if the given span's joined text contains any noise-word token or
/// phrase (spec.md §4.6.2's noise-word filter).
pub fn has_noise_word(span_tokens: &[&str]) -> bool {
    let joined = span_tokens.join(" ");
    NOISE_WORDS.iter().any(|noise| {
        if noise.contains(' ') {
            joined.contains(noise)
        } else {
            span_tokens.iter().any(|t| *t == *noise)
        }
    })
}

/// Keyword consumed at position `i`, naming the forced level and how many
/// tokens the keyword itself occupies (1, or 2 for "thi xa"/"thanh pho").
struct KeywordHit {
    level: ExplicitLevel,
    consumed: usize,
}

fn detect_keyword(tokens: &[Token], i: usize) -> Option<KeywordHit> {
    let t = tokens[i].text.as_str();
    // Two-token compounds first.
    if t == "thi" {
        if let Some(next) = tokens.get(i + 1) {
            if next.text == "xa" {
                return Some(KeywordHit {
                    level: ExplicitLevel::District,
                    consumed: 2,
                });
            }
        }
        return None;
    }
    if t == "thanh" {
        if let Some(next) = tokens.get(i + 1) {
            if next.text == "pho" {
                return Some(KeywordHit {
                    level: ExplicitLevel::District,
                    consumed: 2,
                });
            }
        }
        return None;
    }
    match t {
        "quan" | "huyen" | "tp" | "tx" | "q" | "h" => Some(KeywordHit {
            level: ExplicitLevel::District,
            consumed: 1,
        }),
        "phuong" | "xa" | "p" | "x" => Some(KeywordHit {
            level: ExplicitLevel::Ward,
            consumed: 1,
        }),
        _ => None,
    }
}

/// Scan tokens left-to-right consuming keyword+name patterns into forced
/// candidates (spec.md §4.6.2). Noisy spans are discarded silently.
pub fn extract_explicit_patterns(tokens: &[Token]) -> Vec<ExplicitMatch> {
    let keyword_set: HashSet<&str> = KEYWORD_TOKENS.iter().copied().collect();
    let mut matches = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let Some(hit) = detect_keyword(tokens, i) else {
            i += 1;
            continue;
        };
        let start = i + hit.consumed;
        let mut end = start;
        while end < tokens.len() && end < start + 3 {
            if keyword_set.contains(tokens[end].text.as_str()) {
                break;
            }
            end += 1;
        }

        if end > start {
            let span_tokens: Vec<&str> = tokens[start..end].iter().map(|t| t.text.as_str()).collect();
            if !has_noise_word(&span_tokens) {
                let joined = span_tokens.join(" ");
                let name = normalize_admin_number(&joined);
                matches.push(ExplicitMatch {
                    level: hit.level,
                    name,
                    range: TokenRange::new(start, end),
                });
            }
            i = end;
        } else {
            i += hit.consumed;
        }
    }
    matches
}
