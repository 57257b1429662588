//! Phase 5 — Validator & Ranker: final confidence, hierarchy
//! re-validation, and sort (spec.md §4.9).
//!
//! `original_source/src/processors/phase5_validation.py` survived
//! distillation as interface notes only; the scoring formulas here follow
//! spec.md §4.9 directly. The disambiguation-aware re-check (trusting a
//! candidate's own component scores unless a stronger signal disagrees)
//! is grounded in shape on `ner-core/src/ned.rs`'s "prefer context, fall
//! back to prior" disambiguation pass.

use crate::candidate::{Candidate, MatchLevel};
use crate::config::Config;
use crate::reference::ReferenceStore;
use tracing::debug;

fn completeness(level: MatchLevel) -> f64 {
    match level {
        MatchLevel::Ward => 1.0,
        MatchLevel::District => 0.7,
        MatchLevel::Province => 0.4,
    }
}

fn proximity_heuristic(level: MatchLevel) -> f64 {
    match level {
        MatchLevel::Ward => 0.9,
        MatchLevel::District => 0.7,
        MatchLevel::Province => 0.5,
    }
}

/// Recompute a candidate's final confidence (spec.md §4.9): prefer the
/// Extractor's own `combined_score × source_multiplier` for candidates
/// actually produced in P3; structural short-circuit candidates never ran
/// through the Extractor's combination step, so they fall back to the
/// 4-component recompute formula instead (its own fixed weights, distinct
/// from the Extractor's configurable `scoring_weights`).
fn score_candidate(candidate: &Candidate, has_extractor_diagnostics: bool) -> f64 {
    let base = if has_extractor_diagnostics {
        candidate.combined_score * candidate.source.weight()
    } else {
        let base_fuzzy = {
            let scores = [
                candidate.province_score,
                candidate.district_score,
                candidate.ward_score,
            ];
            let nonzero: Vec<f64> = scores.into_iter().filter(|s| *s > 0.0).collect();
            if nonzero.is_empty() {
                0.0
            } else {
                nonzero.iter().sum::<f64>() / nonzero.len() as f64
            }
        };
        let hierarchy_indicator = if candidate.hierarchy_valid { 1.0 } else { 0.0 };
        0.4 * base_fuzzy
            + 0.3 * proximity_heuristic(candidate.match_level)
            + 0.2 * completeness(candidate.match_level)
            + 0.1 * hierarchy_indicator
    };

    if candidate.district_mismatch {
        base * 0.3
    } else {
        base
    }
}

/// Run Phase 5 over the enriched candidate list: recompute confidence,
/// re-validate hierarchy, sort best-first.
pub fn validate(
    mut candidates: Vec<Candidate>,
    store: &dyn ReferenceStore,
    config: &Config,
) -> Vec<Candidate> {
    let _span = tracing::debug_span!("validate").entered();

    for candidate in &mut candidates {
        let has_extractor_diagnostics = !candidate.source.is_structural();
        let final_confidence = score_candidate(candidate, has_extractor_diagnostics);
        candidate.final_confidence = Some(final_confidence);

        if !candidate.source.is_external() {
            candidate.hierarchy_valid = match &candidate.province {
                Some(province) => {
                    store.hierarchy_valid(province, candidate.district.as_deref(), candidate.ward.as_deref())
                }
                None => false,
            };
        }
        if config.debug.sql {
            debug!(
                province = candidate.province.as_deref().unwrap_or(""),
                final_confidence,
                hierarchy_valid = candidate.hierarchy_valid,
                "validated candidate"
            );
        }
    }

    candidates.retain(|c| c.source.is_external() || c.hierarchy_valid);

    candidates.sort_by(|a, b| {
        let fa = a.final_confidence.unwrap_or(0.0);
        let fb = b.final_confidence.unwrap_or(0.0);
        fb.partial_cmp(&fa)
            .unwrap()
            .then_with(|| b.match_type_priority().cmp(&a.match_type_priority()))
            .then_with(|| b.match_level.cmp(&a.match_level))
    });

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Source;
    use crate::reference::{DistrictRecord, InMemoryReferenceStore, ProvinceRecord};

    fn sample_store() -> InMemoryReferenceStore {
        let ba_dinh = DistrictRecord {
            normalized: "ba dinh".into(),
            full: "Quận Ba Đình".into(),
            prefix: "quan".into(),
            state_code: None,
            county_code: None,
            wards: vec![],
            streets: vec![],
        };
        let ha_noi = ProvinceRecord {
            normalized: "ha noi".into(),
            full: "Thành phố Hà Nội".into(),
            prefix: "thanh pho".into(),
            districts: vec![ba_dinh],
        };
        InMemoryReferenceStore::new(vec![ha_noi], vec![])
    }

    fn candidate(province: &str, district: Option<&str>, combined: f64, source: Source) -> Candidate {
        Candidate {
            province: Some(province.to_string()),
            district: district.map(|s| s.to_string()),
            ward: None,
            province_full: String::new(),
            district_full: String::new(),
            ward_full: String::new(),
            province_score: 1.0,
            district_score: if district.is_some() { 1.0 } else { 0.0 },
            ward_score: 0.0,
            province_tokens: None,
            district_tokens: None,
            ward_tokens: None,
            combined_score: combined,
            proximity_score: 1.0,
            order_bonus: 1.0,
            adjacency_bonus: 1.0,
            direct_match_bonus: 1.0,
            match_level: if district.is_some() {
                MatchLevel::District
            } else {
                MatchLevel::Province
            },
            hierarchy_valid: true,
            source,
            normalized_tokens: vec![],
            confidence: combined,
            final_confidence: None,
            state_code: None,
            county_code: None,
            district_mismatch: false,
        }
    }

    #[test]
    fn applies_source_multiplier() {
        let store = sample_store();
        let config = Config::default();
        let candidates = validate(
            vec![candidate("ha noi", Some("ba dinh"), 0.9, Source::StreetBased)],
            &store,
            &config,
        );
        assert!((candidates[0].final_confidence.unwrap() - 0.63).abs() < 1e-9);
    }

    #[test]
    fn invalid_hierarchy_is_dropped() {
        let store = sample_store();
        let config = Config::default();
        let candidates = validate(
            vec![candidate(
                "ha noi",
                Some("nonexistent"),
                0.9,
                Source::DbExactMatch,
            )],
            &store,
            &config,
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn district_mismatch_applies_penalty() {
        let store = sample_store();
        let config = Config::default();
        let mut c = candidate("ha noi", Some("ba dinh"), 0.9, Source::DbExactMatch);
        c.district_mismatch = true;
        let candidates = validate(vec![c], &store, &config);
        assert!((candidates[0].final_confidence.unwrap() - 0.27).abs() < 1e-9);
    }

    #[test]
    fn sorts_by_confidence_descending() {
        let store = sample_store();
        let config = Config::default();
        let candidates = validate(
            vec![
                candidate("ha noi", Some("ba dinh"), 0.5, Source::DbExactMatch),
                candidate("ha noi", None, 1.0, Source::DbExactMatch),
            ],
            &store,
            &config,
        );
        assert!(candidates[0].final_confidence.unwrap() >= candidates[1].final_confidence.unwrap());
    }

    #[test]
    fn external_source_bypasses_hierarchy_check() {
        let store = sample_store();
        let config = Config::default();
        let candidates = validate(
            vec![candidate(
                "nonexistent",
                Some("nowhere"),
                0.8,
                Source::OsmNominatimBbox,
            )],
            &store,
            &config,
        );
        assert_eq!(candidates.len(), 1);
    }
}
