//! Text normalization primitives: Unicode NFC, diacritic stripping,
//! abbreviation expansion, administrative-prefix stripping, and numeric
//! normalization.
//!
//! Grounded on `original_source/src/utils/text_utils.py`: the Vietnamese
//! accent map, the hardcoded abbreviation-pattern table, and the admin
//! prefix list are carried over as-is; everything is re-expressed as plain
//! functions over `&str` rather than `lru_cache`-decorated Python
//! functions — memoization lives in [`crate::cache`] instead.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

/// Unicode NFC normalization (spec.md §4.3, §4.4 step 1).
pub fn nfc_normalize(text: &str) -> String {
    text.nfc().collect()
}

/// Strip Vietnamese diacritics via explicit character mapping.
pub fn remove_diacritics(text: &str) -> String {
    text.chars().map(map_diacritic).collect()
}

fn map_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'ả' | 'ã' | 'ạ' | 'ă' | 'ằ' | 'ắ' | 'ẳ' | 'ẵ' | 'ặ' | 'â' | 'ầ' | 'ấ' | 'ẩ'
        | 'ẫ' | 'ậ' => 'a',
        'À' | 'Á' | 'Ả' | 'Ã' | 'Ạ' | 'Ă' | 'Ằ' | 'Ắ' | 'Ẳ' | 'Ẵ' | 'Ặ' | 'Â' | 'Ầ' | 'Ấ' | 'Ẩ'
        | 'Ẫ' | 'Ậ' => 'A',
        'è' | 'é' | 'ẻ' | 'ẽ' | 'ẹ' | 'ê' | 'ề' | 'ế' | 'ể' | 'ễ' | 'ệ' => 'e',
        'È' | 'É' | 'Ẻ' | 'Ẽ' | 'Ẹ' | 'Ê' | 'Ề' | 'Ế' | 'Ể' | 'Ễ' | 'Ệ' => 'E',
        'ì' | 'í' | 'ỉ' | 'ĩ' | 'ị' => 'i',
        'Ì' | 'Í' | 'Ỉ' | 'Ĩ' | 'Ị' => 'I',
        'ò' | 'ó' | 'ỏ' | 'õ' | 'ọ' | 'ô' | 'ồ' | 'ố' | 'ổ' | 'ỗ' | 'ộ' | 'ơ' | 'ờ' | 'ớ' | 'ở'
        | 'ỡ' | 'ợ' => 'o',
        'Ò' | 'Ó' | 'Ỏ' | 'Õ' | 'Ọ' | 'Ô' | 'Ồ' | 'Ố' | 'Ổ' | 'Ỗ' | 'Ộ' | 'Ơ' | 'Ờ' | 'Ớ' | 'Ở'
        | 'Ỡ' | 'Ợ' => 'O',
        'ù' | 'ú' | 'ủ' | 'ũ' | 'ụ' | 'ư' | 'ừ' | 'ứ' | 'ử' | 'ữ' | 'ự' => 'u',
        'Ù' | 'Ú' | 'Ủ' | 'Ũ' | 'Ụ' | 'Ư' | 'Ừ' | 'Ứ' | 'Ử' | 'Ữ' | 'Ự' => 'U',
        'ỳ' | 'ý' | 'ỷ' | 'ỹ' | 'ỵ' => 'y',
        'Ỳ' | 'Ý' | 'Ỷ' | 'Ỹ' | 'Ỵ' => 'Y',
        'đ' => 'd',
        'Đ' => 'D',
        other => other,
    }
}

struct AbbrPattern {
    re: &'static Lazy<Regex>,
    replacement: &'static str,
}

static PAT_F_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bf\s*\.?\s*(?=\d)").unwrap());
static PAT_P_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bp\s*\.?\s*(?=\d)").unwrap());
static PAT_Q_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bq\s*\.?\s*(?=\d)").unwrap());
static PAT_TP_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\btp\.?\s+").unwrap());
static PAT_T_P_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bt\.?p\.?\s+").unwrap());

/// Fixed pattern rewrites applied before database abbreviation lookup
/// (spec.md §4.3, carried from `COMMON_ABBREVIATION_PATTERNS`).
fn pattern_rewrites() -> [AbbrPattern; 5] {
    [
        AbbrPattern {
            re: &PAT_F_DIGIT,
            replacement: "phuong ",
        },
        AbbrPattern {
            re: &PAT_P_DIGIT,
            replacement: "phuong ",
        },
        AbbrPattern {
            re: &PAT_Q_DIGIT,
            replacement: "quan ",
        },
        AbbrPattern {
            re: &PAT_TP_SPACE,
            replacement: "thanh pho ",
        },
        AbbrPattern {
            re: &PAT_T_P_SPACE,
            replacement: "thanh pho ",
        },
    ]
}

/// Apply the hardcoded pattern rewrites (`P.3` → `phuong 3`, `TP ` → `thanh pho `, ...).
pub fn apply_pattern_abbreviations(text: &str) -> String {
    let mut result = text.to_lowercase();
    for p in pattern_rewrites() {
        result = p.re.replace_all(&result, p.replacement).to_string();
    }
    result
}

/// Expand database-sourced abbreviations against an already lowercase
/// string. Multi-word keys are tried longest-first via word-boundary
/// regex; single-word keys are matched by splitting on whitespace.
pub fn apply_db_abbreviations(text: &str, abbreviations: &HashMap<String, String>) -> String {
    if abbreviations.is_empty() {
        return text.to_string();
    }

    let mut multi_word: Vec<(&String, &String)> = abbreviations
        .iter()
        .filter(|(k, _)| k.contains(' '))
        .collect();
    multi_word.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut result = text.to_string();
    for (key, word) in multi_word {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(key));
        if let Ok(re) = Regex::new(&pattern) {
            result = re.replace_all(&result, word.as_str()).to_string();
        }
    }

    let single_word: HashMap<&str, &str> = abbreviations
        .iter()
        .filter(|(k, _)| !k.contains(' '))
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let expanded: Vec<String> = result
        .split_whitespace()
        .map(|word| {
            let clean = word.trim_matches(|c: char| ".,;:!?".contains(c));
            single_word
                .get(clean)
                .map(|w| w.to_string())
                .unwrap_or_else(|| word.to_string())
        })
        .collect();

    expanded.join(" ")
}

static SPECIAL_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,\-_]").unwrap());

/// Final normalization step: replace `,`/`-`/`_` with space, drop
/// remaining non-word/space characters, lowercase, collapse whitespace.
pub fn finalize_normalization(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    let replaced = SEPARATORS.replace_all(text, " ");
    let stripped = SPECIAL_CHAR.replace_all(&replaced, "");
    let collapsed = WHITESPACE.replace_all(&stripped, " ");
    collapsed.trim().to_lowercase()
}

/// Administrative prefixes recognized at the start of a normalized
/// string, longest first (spec.md §4.3).
const ADMIN_PREFIXES: [&str; 8] = [
    "thanh pho",
    "tinh",
    "thi xa",
    "thi tran",
    "quan",
    "huyen",
    "phuong",
    "xa",
];

/// Strip a single leading administrative prefix, if present.
pub fn strip_admin_prefixes(text: &str) -> String {
    let trimmed = text.trim();
    for prefix in ADMIN_PREFIXES {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            if rest.is_empty() {
                return String::new();
            }
            if let Some(stripped) = rest.strip_prefix(' ') {
                return stripped.trim().to_string();
            }
        }
    }
    trimmed.to_string()
}

/// Drop leading zeros from a pure 1–2 digit numeric name ("06" → "6"); any
/// other string (including longer numbers) is returned unchanged.
pub fn normalize_admin_number(text: &str) -> String {
    if (1..=2).contains(&text.len()) && text.chars().all(|c| c.is_ascii_digit()) {
        let n: u32 = text.parse().unwrap_or(0);
        return n.to_string();
    }
    text.to_string()
}

/// Full normalization pipeline: NFC → abbreviation expansion (pattern +
/// optional DB context) → diacritic removal → finalize.
pub fn normalize_address(text: &str, abbreviations: Option<&HashMap<String, String>>) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    let nfc = nfc_normalize(text);
    let mut expanded = apply_pattern_abbreviations(&nfc);
    if let Some(abbr) = abbreviations {
        expanded = apply_db_abbreviations(&expanded, abbr);
    }
    let no_accent = remove_diacritics(&expanded);
    finalize_normalization(&no_accent)
}

/// Normalize a caller-supplied province/district hint: full normalization
/// (no abbreviation context — hints arrive already mostly-clean) then
/// admin-prefix stripping (spec.md §4.3, §4.6.5).
pub fn normalize_hint(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    let normalized = normalize_address(text, None);
    strip_admin_prefixes(&normalized)
}
