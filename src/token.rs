//! Tokens and token ranges — the atomic units the rest of the pipeline
//! operates over.
//!
//! Shape borrowed from `ner-core`'s `tokenizer::Token` (byte-offset
//! tracking so later phases can recover original-text spans without
//! re-scanning), rewritten for whitespace-delimited administrative text
//! instead of Portuguese prose.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A maximal whitespace-delimited substring of normalized text, after
/// trailing punctuation has been trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub index: usize,
}

/// A half-open `[start, end)` interval over token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRange {
    pub start: usize,
    pub end: usize,
}

impl TokenRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True when this range immediately precedes `other` with no gap —
    /// the adjacency signal spec.md §4.6.6 weighs most heavily.
    pub fn immediately_precedes(&self, other: &TokenRange) -> bool {
        self.end == other.start
    }
}

/// A contiguous run of tokens delimited by `,`/`-`/`_`/`/` boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start_token: usize,
    pub end_token: usize,
}

/// Delimiter structure discovered before delimiters are stripped (spec.md §4.4 step 4).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelimiterInfo {
    pub positions: Vec<(usize, char)>,
    pub segments: Vec<Segment>,
    pub number_token_indices: HashSet<usize>,
    pub has_delimiters: bool,
}

const DELIMITER_CHARS: [char; 4] = [',', '-', '_', '/'];

static NUMBER_SLASH_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+/\d+").unwrap());
static TRAILING_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.,;:!?]+$").unwrap());

/// Tokenize already-normalized text into whitespace-delimited [`Token`]s,
/// trimming trailing punctuation from each.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut index = 0;
    for (start, raw) in word_spans(text) {
        let trimmed = TRAILING_PUNCT.replace(raw, "");
        if trimmed.is_empty() {
            continue;
        }
        tokens.push(Token {
            text: trimmed.to_string(),
            start,
            end: start + raw.len(),
            index,
        });
        index += 1;
    }
    tokens
}

fn word_spans(text: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    let bytes = text.as_bytes();
    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s, &text[s..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push((s, &text[s..bytes.len()]));
    }
    spans
}

/// Tokenize while recording delimiter positions, segments, and which
/// tokens carry a protected `digit/digit` house-number pattern — needed
/// before delimiters are stripped for good (spec.md §4.4 step 4).
///
/// `text` should already be diacritic-free and lowercased but must still
/// contain its original delimiter characters.
pub fn tokenize_with_delimiters(text: &str) -> (Vec<Token>, DelimiterInfo) {
    if text.trim().is_empty() {
        return (Vec::new(), DelimiterInfo::default());
    }

    let mut protected: Vec<(String, String)> = Vec::new();
    let mut placeholder_text = String::with_capacity(text.len());
    let mut last_end = 0;
    for mat in NUMBER_SLASH_PATTERN.find_iter(text) {
        placeholder_text.push_str(&text[last_end..mat.start()]);
        let placeholder = format!("\u{0}NUMSLASH{}\u{0}", protected.len());
        protected.push((placeholder.clone(), mat.as_str().to_string()));
        placeholder_text.push_str(&placeholder);
        last_end = mat.end();
    }
    placeholder_text.push_str(&text[last_end..]);

    let positions: Vec<(usize, char)> = text
        .char_indices()
        .filter(|(_, c)| DELIMITER_CHARS.contains(c))
        .filter(|(i, _)| {
            !protected
                .iter()
                .any(|(_, orig)| orig.contains('/') && {
                    if let Some(orig_start) = text.find(orig.as_str()) {
                        *i >= orig_start && *i < orig_start + orig.len()
                    } else {
                        false
                    }
                })
        })
        .collect();
    let has_delimiters = !positions.is_empty();

    // Captured before delimiter chars are blanked out below, in the same
    // coordinate space as `placeholder_text`/`normalized_text` (and hence
    // `Token::start`) rather than `text`'s. Every delimiter char surviving
    // into `placeholder_text` is real: protected slashes were already
    // replaced wholesale by a `/`-free placeholder, so no filtering against
    // `protected` is needed here the way `positions` above needs it.
    let placeholder_positions: Vec<usize> = placeholder_text
        .char_indices()
        .filter(|(_, c)| DELIMITER_CHARS.contains(c))
        .map(|(i, _)| i)
        .collect();

    let mut normalized_text = placeholder_text;
    for d in DELIMITER_CHARS {
        normalized_text = normalized_text.replace(d, " ");
    }

    let mut tokens = Vec::new();
    let mut number_token_indices = HashSet::new();
    let mut index = 0;
    for (start, raw) in word_spans(&normalized_text) {
        let trimmed = TRAILING_PUNCT.replace(raw, "");
        if trimmed.is_empty() {
            continue;
        }
        let resolved = protected
            .iter()
            .find(|(ph, _)| trimmed == ph.as_str())
            .map(|(_, orig)| orig.clone())
            .unwrap_or_else(|| trimmed.to_string());
        if resolved != trimmed {
            number_token_indices.insert(index);
        }
        tokens.push(Token {
            text: resolved,
            start,
            end: start + raw.len(),
            index,
        });
        index += 1;
    }

    let segments = build_segments(&placeholder_positions, &tokens);

    (
        tokens,
        DelimiterInfo {
            positions,
            segments,
            number_token_indices,
            has_delimiters,
        },
    )
}

fn build_segments(placeholder_positions: &[usize], tokens: &[Token]) -> Vec<Segment> {
    if placeholder_positions.is_empty() || tokens.is_empty() {
        return vec![Segment {
            start_token: 0,
            end_token: tokens.len(),
        }];
    }

    let mut boundaries: Vec<usize> = Vec::new();
    for &pos in placeholder_positions {
        let mut token_idx = tokens.len();
        for t in tokens {
            if t.start >= pos {
                token_idx = t.index;
                break;
            }
        }
        boundaries.push(token_idx);
    }

    let mut segments = Vec::new();
    let mut start_token = 0;
    for b in boundaries {
        if b > start_token {
            segments.push(Segment {
                start_token,
                end_token: b,
            });
        }
        start_token = b;
    }
    if start_token < tokens.len() {
        segments.push(Segment {
            start_token,
            end_token: tokens.len(),
        });
    }
    segments
}
