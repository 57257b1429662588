//! Phase 6 — Postprocessor: capitalize, extract the remainder by
//! token-range subtraction, chunk it, and assign a quality flag
//! (spec.md §4.10).
//!
//! Remainder extraction (mask-then-keep over token positions rather than
//! string search) is grounded on
//! `original_source/src/processors/phase6_postprocessing.py`'s
//! `extract_remaining_address`.

use crate::candidate::{Candidate, MatchLevel};
use crate::config::Config;
use crate::text::remove_diacritics;
use crate::token::TokenRange;
use serde::{Deserialize, Serialize};

/// Output completeness/confidence tag (spec.md §4.10, §GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    FullAddress,
    PartialAddress,
    ProvinceOnly,
    Failed,
}

impl QualityFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityFlag::FullAddress => "full_address",
            QualityFlag::PartialAddress => "partial_address",
            QualityFlag::ProvinceOnly => "province_only",
            QualityFlag::Failed => "failed",
        }
    }
}

/// The caller-facing best-match output (spec.md §6 `FormattedOutput`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedOutput {
    pub province: String,
    pub district: String,
    pub ward: String,
    pub state_code: Option<String>,
    pub county_code: Option<String>,
    pub remaining_1: String,
    pub remaining_2: String,
    pub remaining_3: String,
    /// Deepest level matched: 0 none, 1 province, 2 +district, 3 +ward.
    pub at_rule: u8,
    pub confidence: f64,
    pub match_type: String,
}

impl FormattedOutput {
    fn empty() -> Self {
        Self {
            province: String::new(),
            district: String::new(),
            ward: String::new(),
            state_code: None,
            county_code: None,
            remaining_1: String::new(),
            remaining_2: String::new(),
            remaining_3: String::new(),
            at_rule: 0,
            confidence: 0.0,
            match_type: String::new(),
        }
    }
}

/// Capitalize a full administrative name while preserving the
/// already-capitalized prefix ("THÀNH PHỐ HÀ NỘI" → "Thành Phố Hà Nội").
pub fn capitalize_full_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>()
                        + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove `range` from the set of kept token indices.
fn mask_range(mask: &mut [bool], range: Option<TokenRange>) {
    if let Some(range) = range {
        for i in range.start..range.end.min(mask.len()) {
            if i < mask.len() {
                mask[i] = false;
            }
        }
    }
}

/// Extract the remainder by token-range subtraction (spec.md §4.10): mark
/// each resolved level's token range for removal, then concatenate the
/// unmarked tokens in order. Avoids collateral removal of homonym tokens
/// a string search would catch.
pub fn extract_remainder(candidate: &Candidate) -> String {
    let tokens = &candidate.normalized_tokens;
    if tokens.is_empty() {
        return String::new();
    }
    let mut mask = vec![true; tokens.len()];
    mask_range(&mut mask, candidate.province_tokens);
    mask_range(&mut mask, candidate.district_tokens);
    mask_range(&mut mask, candidate.ward_tokens);

    tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| mask[*i])
        .map(|(_, t)| t.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split the remainder (already diacritic-stripped and uppercased) into
/// three fixed-width chunks (spec.md §4.10).
fn split_remainder(remainder: &str, chunk_size: usize) -> (String, String, String) {
    let chars: Vec<char> = remainder.chars().collect();
    let chunk_at = |from: usize| -> String {
        chars
            .iter()
            .skip(from)
            .take(chunk_size)
            .collect::<String>()
    };
    (
        chunk_at(0),
        chunk_at(chunk_size),
        chunk_at(chunk_size * 2),
    )
}

fn quality_flag(level: MatchLevel, confidence: f64) -> QualityFlag {
    match level {
        MatchLevel::Ward if confidence >= 0.8 => QualityFlag::FullAddress,
        MatchLevel::District if confidence >= 0.6 => QualityFlag::PartialAddress,
        MatchLevel::Province if confidence >= 0.6 => QualityFlag::ProvinceOnly,
        _ => QualityFlag::Failed,
    }
}

/// Run Phase 6 over the best (first, already-sorted) candidate. Returns
/// an all-null formatted output and `Failed` when there is none.
pub fn postprocess(
    best: Option<&Candidate>,
    config: &Config,
) -> (FormattedOutput, QualityFlag) {
    let _span = tracing::debug_span!("postprocess").entered();

    let Some(candidate) = best else {
        return (FormattedOutput::empty(), QualityFlag::Failed);
    };

    let confidence = candidate.final_confidence.unwrap_or(candidate.confidence);
    let flag = quality_flag(candidate.match_level, confidence);

    let remainder = extract_remainder(candidate);
    let remainder_upper = remove_diacritics(&remainder).to_uppercase();
    let (r1, r2, r3) = split_remainder(&remainder_upper, config.remainder_chunk_size);

    let output = FormattedOutput {
        province: capitalize_full_name(&candidate.province_full),
        district: capitalize_full_name(&candidate.district_full),
        ward: capitalize_full_name(&candidate.ward_full),
        state_code: candidate.state_code.clone(),
        county_code: candidate.county_code.clone(),
        remaining_1: r1,
        remaining_2: r2,
        remaining_3: r3,
        at_rule: candidate.match_level as u8,
        confidence,
        match_type: format!("{:?}", candidate.source),
    };

    (output, flag)
}
