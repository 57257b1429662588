//! Explicit, immutable process-wide configuration.
//!
//! Every knob has a default matching the values observed in the reference
//! implementation; no environment variables or CLI flags are read here —
//! callers construct a [`Config`] (or use [`Config::default`]) and pass it
//! through the pipeline explicitly.

use serde::{Deserialize, Serialize};

/// Minimum ensemble-fuzzy score required to accept an n-gram match at a
/// given administrative level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuzzyThresholds {
    pub province: f64,
    pub district: f64,
    pub ward: f64,
}

impl Default for FuzzyThresholds {
    fn default() -> Self {
        Self {
            province: 0.85,
            district: 0.80,
            ward: 0.75,
        }
    }
}

/// Component weights for [`crate::matching::ensemble_fuzzy`]. Must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights {
    pub token_sort: f64,
    pub levenshtein: f64,
    pub jaccard: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            token_sort: 0.5,
            levenshtein: 0.3,
            jaccard: 0.2,
        }
    }
}

/// Combined-score weights used when assembling a candidate in the Extractor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub proximity: f64,
    pub base_fuzzy: f64,
    pub completeness: f64,
    pub hierarchy: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            proximity: 0.5,
            base_fuzzy: 0.3,
            completeness: 0.15,
            hierarchy: 0.05,
        }
    }
}

/// Graduated fuzzy-match log verbosity, matching the original's
/// `DEBUG_FUZZY` levels (`OFF`/`WINNERS`/`TOP3`/`FULL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuzzyLogLevel {
    Off,
    Winners,
    Top3,
    Full,
}

impl Default for FuzzyLogLevel {
    fn default() -> Self {
        FuzzyLogLevel::Winners
    }
}

/// Per-phase trace logging switches (spec §6: `debug.{sql,fuzzy,ngrams,extraction}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugFlags {
    pub sql: bool,
    pub fuzzy: FuzzyLogLevel,
    pub ngrams: bool,
    pub extraction: bool,
}

impl Default for DebugFlags {
    fn default() -> Self {
        Self {
            sql: false,
            fuzzy: FuzzyLogLevel::default(),
            ngrams: false,
            extraction: false,
        }
    }
}

/// Full process-wide configuration for a `parse()` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub fuzzy_threshold: FuzzyThresholds,
    pub ensemble_weights: EnsembleWeights,
    pub scoring_weights: ScoringWeights,
    pub order_bonus: f64,
    pub adjacency_bonus: f64,
    pub direct_match_bonus_district: f64,
    pub direct_match_bonus_ward: f64,
    pub max_candidates: usize,
    pub max_ngram: usize,
    pub iterative_preprocessing_passes: usize,
    pub remainder_chunk_size: usize,
    pub debug: DebugFlags,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fuzzy_threshold: FuzzyThresholds::default(),
            ensemble_weights: EnsembleWeights::default(),
            scoring_weights: ScoringWeights::default(),
            order_bonus: 1.1,
            adjacency_bonus: 1.15,
            direct_match_bonus_district: 1.15,
            direct_match_bonus_ward: 1.10,
            max_candidates: 5,
            max_ngram: 4,
            iterative_preprocessing_passes: 2,
            remainder_chunk_size: 40,
            debug: DebugFlags::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensemble_weights_sum_to_one() {
        let w = EnsembleWeights::default();
        assert!((w.token_sort + w.levenshtein + w.jaccard - 1.0).abs() < 1e-9);
    }

    #[test]
    fn default_config_matches_spec_values() {
        let c = Config::default();
        assert_eq!(c.max_candidates, 5);
        assert_eq!(c.max_ngram, 4);
        assert_eq!(c.remainder_chunk_size, 40);
        assert_eq!(c.iterative_preprocessing_passes, 2);
    }
}
