//! Phase 1 — Preprocessor: normalization, abbreviation expansion, and
//! delimiter extraction (spec.md §4.4).
//!
//! Grounded on `original_source/src/processors/phase1_preprocessing.py`'s
//! four-step pipeline and `src/utils/iterative_preprocessing.py`'s
//! province-context discovery loop. Logging shape (span-per-step, entered
//! at `debug` level) follows `ner-core/src/pipeline.rs`'s per-phase
//! `tracing::debug_span!` usage.

use crate::config::Config;
use crate::reference::ReferenceStore;
use crate::text;
use crate::token::{tokenize_with_delimiters, DelimiterInfo, Token};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Output of Phase 1: the normalized text plus the delimiter structure
/// recovered before delimiters were stripped (spec.md §4.4's carried
/// fields).
#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    pub original: String,
    pub normalized: String,
    /// Normalized text without database abbreviation expansion applied —
    /// used by the Extractor's direct-match bonus (spec.md §4.6.6 step 10)
    /// so an invented expansion can't manufacture a substring match.
    pub pre_abbreviation_normalized: String,
    /// Tokens produced alongside `delimiter_info`, before `finalize_normalization`
    /// collapses delimiter punctuation — this is the token stream later phases
    /// must use, since `normalized` alone has already lost the `/` of a
    /// protected `digit/digit` house-number pattern like "55/2" (spec.md
    /// §4.4 step 4 requires that protection to survive into extraction).
    pub tokens: Vec<Token>,
    pub delimiter_info: DelimiterInfo,
    pub province_context: Option<String>,
    pub district_context: Option<String>,
}

/// Province names/aliases recognized by the quick regex scan used to
/// discover context between iterative passes (spec.md §4.4's "iterative
/// mode"), carried from `iterative_preprocessing.py`'s `province_patterns`.
const PROVINCE_ALIASES: &[(&str, &str)] = &[
    ("ha noi", "ha noi"),
    ("hanoi", "ha noi"),
    ("ho chi minh", "ho chi minh"),
    ("hochiminh", "ho chi minh"),
    ("sai gon", "ho chi minh"),
    ("saigon", "ho chi minh"),
    ("da nang", "da nang"),
    ("danang", "da nang"),
    ("hai phong", "hai phong"),
    ("haiphong", "hai phong"),
    ("can tho", "can tho"),
    ("cantho", "can tho"),
    ("ba ria vung tau", "ba ria vung tau"),
    ("brvt", "ba ria vung tau"),
    ("dong nai", "dong nai"),
    ("dongnai", "dong nai"),
    ("binh duong", "binh duong"),
    ("binhduong", "binh duong"),
];

static LIKELY_ABBREVIATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{2,4}\b").unwrap());

fn quick_extract_province(normalized_text: &str) -> Option<String> {
    PROVINCE_ALIASES
        .iter()
        .find(|(alias, _)| {
            let pattern = format!(r"\b{}\b", regex::escape(alias));
            Regex::new(&pattern).map(|re| re.is_match(normalized_text)).unwrap_or(false)
        })
        .map(|(_, canonical)| canonical.to_string())
}

fn single_pass(
    raw: &str,
    province_ctx: Option<&str>,
    district_ctx: Option<&str>,
    store: &dyn ReferenceStore,
) -> (String, String, Vec<Token>, DelimiterInfo) {
    let abbreviations = store.abbreviations(province_ctx, district_ctx);
    let nfc = text::nfc_normalize(raw);

    let pre_abbreviation_no_accent = text::remove_diacritics(&nfc);
    let pre_abbreviation_normalized = text::finalize_normalization(&pre_abbreviation_no_accent);

    let mut expanded = text::apply_pattern_abbreviations(&nfc);
    if !abbreviations.is_empty() {
        expanded = text::apply_db_abbreviations(&expanded, &abbreviations);
    }
    let no_accent = text::remove_diacritics(&expanded);
    let (tokens, delimiter_info) = tokenize_with_delimiters(&no_accent);
    let normalized = text::finalize_normalization(&no_accent);
    (normalized, pre_abbreviation_normalized, tokens, delimiter_info)
}

/// Run Phase 1 (spec.md §4.4). Empty/invalid input returns an empty
/// normalized string with no exception (spec.md §7).
pub fn preprocess(
    raw: &str,
    province_hint: Option<&str>,
    district_hint: Option<&str>,
    store: &dyn ReferenceStore,
    config: &Config,
) -> PreprocessOutput {
    let _span = tracing::debug_span!("preprocess").entered();

    if raw.trim().is_empty() {
        debug!("empty input, returning empty normalized string");
        return PreprocessOutput {
            original: raw.to_string(),
            normalized: String::new(),
            pre_abbreviation_normalized: String::new(),
            tokens: Vec::new(),
            delimiter_info: DelimiterInfo::default(),
            province_context: None,
            district_context: None,
        };
    }

    let mut province_context = province_hint.map(text::normalize_hint);
    let mut district_context = district_hint.map(text::normalize_hint);

    let has_hint = province_context.is_some();
    let looks_abbreviated = LIKELY_ABBREVIATION.is_match(raw);

    let mut normalized = String::new();
    let mut pre_abbreviation_normalized = String::new();
    let mut tokens = Vec::new();
    let mut delimiter_info = DelimiterInfo::default();

    let passes = if has_hint || !looks_abbreviated {
        1
    } else {
        config.iterative_preprocessing_passes.max(1)
    };

    for pass in 0..passes {
        let (pass_normalized, pass_pre_abbreviation, pass_tokens, pass_delims) = single_pass(
            raw,
            province_context.as_deref(),
            district_context.as_deref(),
            store,
        );
        normalized = pass_normalized;
        pre_abbreviation_normalized = pass_pre_abbreviation;
        tokens = pass_tokens;
        delimiter_info = pass_delims;

        let discovered_province = quick_extract_province(&normalized);
        let improved = match (&discovered_province, &province_context) {
            (Some(new), Some(old)) => new != old,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if let Some(p) = discovered_province {
            province_context = Some(p);
        }
        debug!(pass, improved, "iterative preprocessing pass");
        if !improved {
            break;
        }
    }

    PreprocessOutput {
        original: raw.to_string(),
        normalized,
        pre_abbreviation_normalized,
        tokens,
        delimiter_info,
        province_context,
        district_context,
    }
}
