//! The candidate hierarchy hypothesis and its source taxonomy (spec.md §3,
//! §4.7).
//!
//! Field shape grounded on `ner-core/src/tagger.rs`'s `EntitySpan`/`Tag` —
//! a scored span with a category and diagnostics carried alongside it —
//! generalized from a single tagged span to a three-level hierarchy
//! hypothesis with per-level scores and token ranges.

use crate::token::TokenRange;
use serde::{Deserialize, Serialize};

/// Where a candidate's components came from; doubles as a reliability
/// signal the Validator uses as a multiplier (spec.md §4.7, §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    DbExactMatch,
    StructuralTier1,
    StructuralTier2,
    StreetBased,
    DisambiguationAsDistrict,
    DisambiguationAsWard,
    OsmNominatimBbox,
    OsmNominatimQuery,
    GoongGeocode,
    ProvinceOnlyNoDb,
    MultiCandidateInferredDistrict,
    MultiCandidateInferredDistrictMismatch,
}

impl Source {
    /// Reliability multiplier applied by the Validator (spec.md §4.9).
    /// `multi_candidate_inferred_district*` and `disambiguation_as_*`
    /// values fill gaps spec.md §4.9 leaves unspecified, sourced from
    /// `original_source/src/processors/phase3_candidates.py`'s
    /// `SOURCE_WEIGHTS` (see SPEC_FULL.md §B.4).
    pub fn weight(self) -> f64 {
        match self {
            Source::DbExactMatch => 1.0,
            Source::DisambiguationAsWard => 0.95,
            Source::DisambiguationAsDistrict => 0.90,
            Source::OsmNominatimBbox => 0.90,
            Source::OsmNominatimQuery => 0.85,
            Source::StreetBased => 0.70,
            Source::MultiCandidateInferredDistrict => 0.65,
            Source::MultiCandidateInferredDistrictMismatch => 0.65,
            Source::ProvinceOnlyNoDb => 0.50,
            Source::StructuralTier1 | Source::StructuralTier2 | Source::GoongGeocode => 0.80,
        }
    }

    /// True for external geocoders, which bypass hierarchy validation
    /// (spec.md §4.9, §9).
    pub fn is_external(self) -> bool {
        matches!(
            self,
            Source::OsmNominatimBbox | Source::OsmNominatimQuery | Source::GoongGeocode
        )
    }

    /// True when a candidate was built directly from a Structural Parser
    /// short-circuit (P2) rather than carrying the Extractor's own (P3)
    /// `combined_score`/`proximity_score` diagnostics (spec.md §4.9's
    /// "produced in P3" qualifier) — the Validator falls back to its
    /// 4-component recompute for these instead of trusting the fields at
    /// face value.
    pub fn is_structural(self) -> bool {
        matches!(self, Source::StructuralTier1 | Source::StructuralTier2)
    }
}

/// Deepest administrative level a candidate resolves (spec.md §3, §GLOSSARY
/// "At-rule"): 1=province only, 2=+district, 3=+ward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchLevel {
    Province = 1,
    District = 2,
    Ward = 3,
}

/// A hierarchy hypothesis produced by the Extractor, enriched by the
/// Enricher, and re-scored by the Validator (spec.md §3 "Candidate").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub province: Option<String>,
    pub district: Option<String>,
    pub ward: Option<String>,

    pub province_full: String,
    pub district_full: String,
    pub ward_full: String,

    pub province_score: f64,
    pub district_score: f64,
    pub ward_score: f64,

    pub province_tokens: Option<TokenRange>,
    pub district_tokens: Option<TokenRange>,
    pub ward_tokens: Option<TokenRange>,

    /// Uncapped; position bonuses may push it above 1.0 (spec.md §3).
    pub combined_score: f64,
    pub proximity_score: f64,
    pub order_bonus: f64,
    pub adjacency_bonus: f64,
    pub direct_match_bonus: f64,

    pub match_level: MatchLevel,
    pub hierarchy_valid: bool,
    pub source: Source,

    /// County/state admin codes carried by the resolved district row, when
    /// the reference store's schema provides them (spec.md §6's
    /// `admin_divisions.state_code?`/`county_code?`). Populated by the
    /// Enricher alongside `district_full`; `None` when the district row has
    /// none or no district is resolved yet.
    pub state_code: Option<String>,
    pub county_code: Option<String>,

    /// Snapshot of the input tokens the candidate was extracted from, used
    /// by the Postprocessor for remainder extraction.
    pub normalized_tokens: Vec<String>,

    /// Alias of `combined_score` pre-validation; replaced by
    /// `final_confidence` once the Validator has run.
    pub confidence: f64,
    pub final_confidence: Option<f64>,

    /// Set by the Validator when a candidate's district contradicts a
    /// more-trusted signal (spec.md §4.9's −70% penalty condition).
    pub district_mismatch: bool,
}

impl Candidate {
    /// `(province, district, ward)` deduplication key (spec.md §4.8).
    pub fn dedup_key(&self) -> (Option<String>, Option<String>, Option<String>) {
        (self.province.clone(), self.district.clone(), self.ward.clone())
    }

    /// `confidence × source_weight`, the ranking signal used to pick a
    /// winner among duplicate-key candidates (spec.md §4.8).
    pub fn weighted_score(&self) -> f64 {
        self.confidence * self.source.weight()
    }

    /// Match-type priority used as a sort tiebreaker (spec.md §4.9):
    /// exact > fuzzy > hierarchical_fallback.
    pub fn match_type_priority(&self) -> u8 {
        match self.source {
            Source::DbExactMatch => 2,
            Source::StreetBased
            | Source::MultiCandidateInferredDistrict
            | Source::MultiCandidateInferredDistrictMismatch
            | Source::ProvinceOnlyNoDb => 0,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_candidate() -> Candidate {
        Candidate {
            province: Some("ha noi".into()),
            district: Some("ba dinh".into()),
            ward: Some("dien bien".into()),
            province_full: String::new(),
            district_full: String::new(),
            ward_full: String::new(),
            province_score: 1.0,
            district_score: 1.0,
            ward_score: 1.0,
            province_tokens: None,
            district_tokens: None,
            ward_tokens: None,
            combined_score: 0.9,
            proximity_score: 1.0,
            order_bonus: 1.0,
            adjacency_bonus: 1.0,
            direct_match_bonus: 1.0,
            match_level: MatchLevel::Ward,
            hierarchy_valid: true,
            source: Source::DbExactMatch,
            normalized_tokens: vec![],
            confidence: 0.9,
            final_confidence: None,
            state_code: None,
            county_code: None,
            district_mismatch: false,
        }
    }

    #[test]
    fn weighted_score_applies_source_weight() {
        let mut c = base_candidate();
        c.source = Source::StreetBased;
        c.confidence = 0.8;
        assert!((c.weighted_score() - 0.56).abs() < 1e-9);
    }

    #[test]
    fn external_sources_bypass_hierarchy_validation() {
        assert!(Source::OsmNominatimBbox.is_external());
        assert!(!Source::DbExactMatch.is_external());
    }

    #[test]
    fn dedup_key_matches_triple() {
        let c = base_candidate();
        assert_eq!(
            c.dedup_key(),
            (
                Some("ha noi".to_string()),
                Some("ba dinh".to_string()),
                Some("dien bien".to_string())
            )
        );
    }

    #[test]
    fn exact_match_outranks_fuzzy_in_type_priority() {
        let mut exact = base_candidate();
        exact.source = Source::DbExactMatch;
        let mut fuzzy = base_candidate();
        fuzzy.source = Source::StructuralTier2;
        assert!(exact.match_type_priority() > fuzzy.match_type_priority());
    }

    #[test]
    fn only_structural_tiers_are_structural() {
        assert!(Source::StructuralTier1.is_structural());
        assert!(Source::StructuralTier2.is_structural());
        assert!(!Source::DbExactMatch.is_structural());
        assert!(!Source::OsmNominatimBbox.is_structural());
    }
}
