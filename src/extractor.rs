//! Phase 3 — Extractor: the centerpiece. Builds candidate hierarchy
//! hypotheses via scoped n-gram search over the full normalized token
//! list, then combines per-level potentials into scored candidates
//! (spec.md §4.6).
//!
//! Tiered-matching shape (exact-or-fuzzy per level, token-index
//! pre-filtered) is grounded on
//! `original_source/src/processors/phase3_candidates.py`'s
//! `CandidateGenerator.tier1_exact_match`/`tier2_fuzzy_match`; the
//! cartesian-combination and bonus-scoring steps follow spec.md §4.6.6–7
//! directly since the distilled module kept only the tiering shape, not
//! the combination formulas.

use crate::candidate::{Candidate, MatchLevel, Source};
use crate::config::{Config, FuzzyLogLevel};
use crate::index::{adaptive_min_overlap, IndexedName, TokenIndex};
use crate::matching::{ensemble_fuzzy, substring_match};
use crate::ngram::{enumerate_ngrams, extract_explicit_patterns, ExplicitLevel, Ngram};
use crate::reference::ReferenceStore;
use crate::token::{Token, TokenRange};
use tracing::debug;

/// A scored, positioned reading of some span of the input as an
/// administrative name at one level (spec.md §4.6.3's "potential").
#[derive(Debug, Clone)]
struct Potential {
    normalized: String,
    score: f64,
    range: Option<TokenRange>,
    /// Set when this name also resolves at the other of
    /// province/district (spec.md §4.6.4).
    collision: bool,
}

impl Potential {
    fn hinted(name: &str) -> Self {
        Self {
            normalized: name.to_string(),
            score: 1.0,
            range: None,
            collision: false,
        }
    }

    fn forced(name: String, range: TokenRange) -> Self {
        Self {
            normalized: name,
            score: 1.0,
            range: Some(range),
            collision: false,
        }
    }
}

/// Score every n-gram against the index-filtered reference candidates a
/// `fetch` closure returns, keep only the top-scoring ties (spec.md
/// §4.6.3), and dedup by name (first occurrence wins — n-grams are fed
/// longest-first, so the longest matching span is kept).
fn level_potentials<'a>(
    ngrams: &[Ngram],
    fetch: impl Fn(&str, usize) -> Vec<&'a IndexedName>,
    threshold: f64,
    config: &Config,
) -> Vec<Potential> {
    let mut scored: Vec<(String, f64, TokenRange)> = Vec::new();
    let mut best_score = 0.0f64;

    for ngram in ngrams {
        let overlap = adaptive_min_overlap(&ngram.text);
        for name in fetch(&ngram.text, overlap) {
            let score = if ngram.text == name.normalized {
                1.0
            } else {
                ensemble_fuzzy(&ngram.text, &name.normalized, config.ensemble_weights, config.debug.fuzzy)
            };
            if score < threshold {
                continue;
            }
            best_score = best_score.max(score);
            scored.push((name.normalized.clone(), score, ngram.range));
        }
    }

    match config.debug.fuzzy {
        FuzzyLogLevel::Off | FuzzyLogLevel::Full => {}
        FuzzyLogLevel::Winners => {
            if best_score > 0.0 {
                debug!(best_score, candidates = scored.len(), "fuzzy match winners");
            }
        }
        FuzzyLogLevel::Top3 => {
            let mut ranked = scored.clone();
            ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
            for (name, score, _) in ranked.iter().take(3) {
                debug!(name = %name, score, "fuzzy candidate (top3)");
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    scored
        .into_iter()
        .filter(|(_, score, _)| (*score - best_score).abs() < 1e-9)
        .filter(|(name, _, _)| seen.insert(name.clone()))
        .map(|(normalized, score, range)| Potential {
            normalized,
            score,
            range: Some(range),
            collision: false,
        })
        .collect()
}

/// Cross-mark province/district potentials that collide (spec.md
/// §4.6.4), adding the counterpart district reading when a province
/// potential also resolves as a district.
fn apply_collisions(
    provinces: &mut [Potential],
    districts: &mut Vec<Potential>,
    store: &dyn ReferenceStore,
) {
    let mut to_add = Vec::new();
    for p in provinces.iter_mut() {
        let collision = store.province_district_collision(&p.normalized);
        if collision.is_collision() {
            p.collision = true;
            if let Some((district_norm, _)) = &collision.as_district {
                to_add.push(Potential {
                    normalized: district_norm.clone(),
                    score: p.score,
                    range: p.range,
                    collision: true,
                });
            }
        }
    }
    for d in districts.iter_mut() {
        if store.province_district_collision(&d.normalized).is_collision() {
            d.collision = true;
        }
    }
    for candidate in to_add {
        if !districts.iter().any(|d| d.normalized == candidate.normalized) {
            districts.push(candidate);
        }
    }
}

fn sort_desc(potentials: &mut [Potential]) {
    potentials.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
}

/// Order-agnostic token gap between two ranges; 0 when adjacent or
/// overlapping.
fn gap_between(a: TokenRange, b: TokenRange) -> i64 {
    if a.end <= b.start {
        (b.start - a.end) as i64
    } else if b.end <= a.start {
        (a.start - b.end) as i64
    } else {
        0
    }
}

fn gap_score(gap: i64) -> f64 {
    if gap <= 1 {
        1.0
    } else if gap <= 3 {
        0.6
    } else if gap <= 5 {
        0.3
    } else {
        0.1
    }
}

/// Proximity score (spec.md §4.6.7): average gap-bucket score over
/// whichever adjacent-level pairs are present.
fn proximity_score(
    province: Option<TokenRange>,
    district: Option<TokenRange>,
    ward: Option<TokenRange>,
) -> f64 {
    let mut pairs = Vec::new();
    if let (Some(w), Some(d)) = (ward, district) {
        pairs.push(gap_between(w, d));
    }
    if let (Some(d), Some(p)) = (district, province) {
        pairs.push(gap_between(d, p));
    }
    if district.is_none() {
        if let (Some(w), Some(p)) = (ward, province) {
            pairs.push(gap_between(w, p));
        }
    }
    if pairs.is_empty() {
        return 0.5;
    }
    pairs.iter().map(|g| gap_score(*g)).sum::<f64>() / pairs.len() as f64
}

/// Order bonus (spec.md §4.6.6 step 5): present levels read left-to-right
/// as ward, then district, then province.
fn order_bonus(
    province: Option<TokenRange>,
    district: Option<TokenRange>,
    ward: Option<TokenRange>,
    config: &Config,
) -> f64 {
    let mut positions = Vec::new();
    if let Some(w) = ward {
        positions.push(w.start);
    }
    if let Some(d) = district {
        positions.push(d.start);
    }
    if let Some(p) = province {
        positions.push(p.start);
    }
    if positions.len() < 2 {
        return 1.0;
    }
    if positions.windows(2).all(|pair| pair[0] < pair[1]) {
        config.order_bonus
    } else {
        1.0
    }
}

/// Adjacency bonus (spec.md §4.6.6 step 6): ward immediately precedes
/// district with no gap.
fn adjacency_bonus(district: Option<TokenRange>, ward: Option<TokenRange>, config: &Config) -> f64 {
    match (ward, district) {
        (Some(w), Some(d)) if w.immediately_precedes(&d) => config.adjacency_bonus,
        _ => 1.0,
    }
}

/// Build a single candidate for one (province, district?, ward?)
/// combination, or `None` when hierarchy validation rejects it (spec.md
/// §4.6.6).
fn build_combination(
    province: &Potential,
    district_opt: Option<&Potential>,
    ward_opt: Option<&Potential>,
    tokens: &[Token],
    pre_abbreviation_text: &str,
    store: &dyn ReferenceStore,
    config: &Config,
) -> Option<Candidate> {
    let mut district = district_opt.cloned();
    let mut district_inferred = false;
    let mut district_mismatch = false;

    // When the ward's own district doesn't agree with whatever district
    // this combination currently carries (explicit extraction, hint, or
    // none at all), prefer the ward's real district over silently
    // dropping the combination (spec.md §4.7/§4.9,
    // `original_source/src/processors/phase3_candidates.py`'s
    // `district_mismatch` strategy) — but only once the current reading
    // actually fails hierarchy validation; an already-valid explicit
    // district is left alone.
    if let Some(ward) = ward_opt {
        let current_valid = district
            .as_ref()
            .map(|d| store.hierarchy_valid(&province.normalized, Some(&d.normalized), Some(&ward.normalized)))
            .unwrap_or(false);
        if !current_valid {
            if let Some(inferred) = store.infer_district_from_ward(&province.normalized, &ward.normalized) {
                let mismatch = district.as_ref().map(|d| d.normalized != inferred).unwrap_or(false);
                district = Some(Potential {
                    normalized: inferred,
                    score: if mismatch { 0.5 } else { 1.0 },
                    range: None,
                    collision: false,
                });
                district_inferred = true;
                district_mismatch = mismatch;
            }
        }
    }

    let district_name = district.as_ref().map(|d| d.normalized.as_str());
    let ward_name = ward_opt.map(|w| w.normalized.as_str());

    if config.debug.sql {
        debug!(
            province = %province.normalized,
            district = district_name.unwrap_or(""),
            ward = ward_name.unwrap_or(""),
            "hierarchy_valid query"
        );
    }
    if (district_name.is_some() || ward_name.is_some())
        && !store.hierarchy_valid(&province.normalized, district_name, ward_name)
    {
        return None;
    }

    let match_level = if ward_name.is_some() {
        MatchLevel::Ward
    } else if district_name.is_some() {
        MatchLevel::District
    } else {
        MatchLevel::Province
    };

    let district_range = district.as_ref().and_then(|d| d.range);
    let ward_range = ward_opt.and_then(|w| w.range);

    let proximity = proximity_score(province.range, district_range, ward_range);
    let order = order_bonus(province.range, district_range, ward_range, config);
    let adjacency = adjacency_bonus(district_range, ward_range, config);
    let completeness = match match_level {
        MatchLevel::Ward => 1.0,
        MatchLevel::District => 0.7,
        MatchLevel::Province => 0.4,
    };

    let district_score = district.as_ref().map(|d| d.score).unwrap_or(0.0);
    let ward_score = ward_opt.map(|w| w.score).unwrap_or(0.0);
    let nonzero: Vec<f64> = [province.score, district_score, ward_score]
        .into_iter()
        .filter(|s| *s > 0.0)
        .collect();
    let base_fuzzy = if nonzero.is_empty() {
        0.0
    } else {
        nonzero.iter().sum::<f64>() / nonzero.len() as f64
    };

    let w = config.scoring_weights;
    let mut combined = (w.proximity * proximity
        + w.base_fuzzy * base_fuzzy
        + w.completeness * completeness
        + w.hierarchy)
        * order
        * adjacency;

    let mut direct_match_bonus = 1.0;
    if let Some(d) = &district {
        if substring_match(pre_abbreviation_text, &d.normalized) {
            direct_match_bonus *= config.direct_match_bonus_district;
        }
    }
    if let Some(ward) = ward_opt {
        if substring_match(pre_abbreviation_text, &ward.normalized) {
            direct_match_bonus *= config.direct_match_bonus_ward;
        }
    }
    combined *= direct_match_bonus;

    let source = if district.is_none() {
        Source::ProvinceOnlyNoDb
    } else if district_mismatch {
        Source::MultiCandidateInferredDistrictMismatch
    } else if district_inferred {
        Source::MultiCandidateInferredDistrict
    } else if district.as_ref().map(|d| d.collision).unwrap_or(false) {
        Source::DisambiguationAsDistrict
    } else {
        Source::DbExactMatch
    };

    if config.debug.extraction {
        debug!(
            province = %province.normalized,
            district = district_name.unwrap_or(""),
            ward = ward_name.unwrap_or(""),
            combined,
            "built candidate combination"
        );
    }

    Some(Candidate {
        province: Some(province.normalized.clone()),
        district: district.as_ref().map(|d| d.normalized.clone()),
        ward: ward_opt.map(|w| w.normalized.clone()),
        province_full: String::new(),
        district_full: String::new(),
        ward_full: String::new(),
        province_score: province.score,
        district_score,
        ward_score,
        province_tokens: province.range,
        district_tokens: district_range,
        ward_tokens: ward_range,
        combined_score: combined,
        proximity_score: proximity,
        order_bonus: order,
        adjacency_bonus: adjacency,
        direct_match_bonus,
        match_level,
        hierarchy_valid: true,
        source,
        normalized_tokens: tokens.iter().map(|t| t.text.clone()).collect(),
        confidence: combined,
        final_confidence: None,
        state_code: None,
        county_code: None,
        district_mismatch,
    })
}

/// Cartesian-combine the (capped) per-level potentials, with a sentinel
/// "absent" reading on both the district and ward axes so province-only
/// and province+district-only candidates are reachable too (spec.md
/// §4.6.6 names the ward sentinel explicitly; extending it to district is
/// this crate's Open Question resolution — see DESIGN.md).
fn combine(
    provinces: &[Potential],
    districts: &[Potential],
    wards: &[Potential],
    tokens: &[Token],
    pre_abbreviation_text: &str,
    store: &dyn ReferenceStore,
    config: &Config,
) -> Vec<Candidate> {
    let district_axis: Vec<Option<&Potential>> =
        std::iter::once(None).chain(districts.iter().map(Some)).collect();
    let ward_axis: Vec<Option<&Potential>> =
        std::iter::once(None).chain(wards.iter().map(Some)).collect();

    let mut out = Vec::new();
    for province in provinces {
        for &district_opt in &district_axis {
            for &ward_opt in &ward_axis {
                if let Some(candidate) = build_combination(
                    province,
                    district_opt,
                    ward_opt,
                    tokens,
                    pre_abbreviation_text,
                    store,
                    config,
                ) {
                    out.push(candidate);
                }
            }
        }
    }
    out
}

/// Street-based fallback (spec.md §4.6.6's final paragraph): when no ward
/// potential exists at all, look for a street match within the
/// province's districts and emit a district-level candidate anchored on
/// it.
fn street_fallback(
    provinces: &[Potential],
    wards: &[Potential],
    ngrams: &[Ngram],
    tokens: &[Token],
    store: &dyn ReferenceStore,
    config: &Config,
) -> Vec<Candidate> {
    if !wards.is_empty() {
        return Vec::new();
    }

    let joined_text = tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ");
    let mut out = Vec::new();

    for province in provinces {
        for district in store.districts_of(&province.normalized) {
            let mut best: Option<f64> = None;
            for street in &district.streets {
                for ngram in ngrams {
                    let score = if ngram.text == street.normalized {
                        1.0
                    } else {
                        ensemble_fuzzy(&ngram.text, &street.normalized, config.ensemble_weights, config.debug.fuzzy)
                    };
                    if score >= config.fuzzy_threshold.ward && best.map(|b| score > b).unwrap_or(true) {
                        best = Some(score);
                    }
                }
            }
            let Some(street_score) = best else { continue };

            let district_present = substring_match(&joined_text, &district.normalized);
            let mut combined = street_score * 0.75;
            if !district_present {
                combined *= 0.3;
            }

            if config.debug.extraction {
                debug!(
                    province = %province.normalized,
                    district = %district.normalized,
                    combined,
                    "street-based fallback candidate"
                );
            }

            out.push(Candidate {
                province: Some(province.normalized.clone()),
                district: Some(district.normalized.clone()),
                ward: None,
                province_full: String::new(),
                district_full: String::new(),
                ward_full: String::new(),
                province_score: province.score,
                district_score: street_score,
                ward_score: 0.0,
                province_tokens: province.range,
                district_tokens: None,
                ward_tokens: None,
                combined_score: combined,
                proximity_score: 0.0,
                order_bonus: 1.0,
                adjacency_bonus: 1.0,
                direct_match_bonus: 1.0,
                match_level: MatchLevel::District,
                hierarchy_valid: true,
                source: Source::StreetBased,
                normalized_tokens: tokens.iter().map(|t| t.text.clone()).collect(),
                confidence: combined,
                final_confidence: None,
                state_code: None,
                county_code: None,
                district_mismatch: false,
            });
        }
    }
    out
}

/// Run Phase 3 over the preprocessed token stream, returning up to
/// `config.max_candidates` scored candidates, best-first.
#[allow(clippy::too_many_arguments)]
pub fn extract(
    tokens: &[Token],
    pre_abbreviation_normalized: &str,
    province_hint: Option<&str>,
    district_hint: Option<&str>,
    index: &TokenIndex,
    store: &dyn ReferenceStore,
    config: &Config,
) -> Vec<Candidate> {
    let _span = tracing::debug_span!("extract").entered();
    if tokens.is_empty() {
        return Vec::new();
    }

    let ngrams = enumerate_ngrams(tokens, config.max_ngram);
    if config.debug.ngrams {
        debug!(count = ngrams.len(), max_len = config.max_ngram, "enumerated ngrams");
    }
    let explicit = extract_explicit_patterns(tokens);

    let mut province_potentials = match province_hint {
        Some(hint) => vec![Potential::hinted(hint)],
        None => level_potentials(
            &ngrams,
            |text, overlap| index.province_candidates(text, overlap),
            config.fuzzy_threshold.province,
            config,
        ),
    };

    let mut district_potentials = match district_hint {
        Some(hint) => vec![Potential::hinted(hint)],
        None => {
            let mut pots = level_potentials(
                &ngrams,
                |text, overlap| index.district_candidates(text, province_hint, overlap),
                config.fuzzy_threshold.district,
                config,
            );
            for m in explicit.iter().filter(|m| m.level == ExplicitLevel::District) {
                pots.push(Potential::forced(m.name.clone(), m.range));
            }
            pots
        }
    };

    let mut ward_potentials = {
        let mut pots = level_potentials(
            &ngrams,
            |text, overlap| index.ward_candidates(text, province_hint, district_hint, overlap),
            config.fuzzy_threshold.ward,
            config,
        );
        for m in explicit.iter().filter(|m| m.level == ExplicitLevel::Ward) {
            pots.push(Potential::forced(m.name.clone(), m.range));
        }
        pots
    };

    if province_hint.is_none() {
        apply_collisions(&mut province_potentials, &mut district_potentials, store);
    }

    sort_desc(&mut province_potentials);
    sort_desc(&mut district_potentials);
    sort_desc(&mut ward_potentials);
    province_potentials.truncate(3);
    district_potentials.truncate(5);
    ward_potentials.truncate(3);

    if config.debug.extraction {
        debug!(
            provinces = province_potentials.len(),
            districts = district_potentials.len(),
            wards = ward_potentials.len(),
            "extractor potentials"
        );
    }

    let mut candidates = combine(
        &province_potentials,
        &district_potentials,
        &ward_potentials,
        tokens,
        pre_abbreviation_normalized,
        store,
        config,
    );

    candidates.extend(street_fallback(
        &province_potentials,
        &ward_potentials,
        &ngrams,
        tokens,
        store,
        config,
    ));

    candidates.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap()
            .then_with(|| b.match_level.cmp(&a.match_level))
    });
    candidates.truncate(config.max_candidates);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{DistrictRecord, InMemoryReferenceStore, ProvinceRecord, StreetRecord, WardRecord};
    use crate::token::tokenize_with_delimiters;

    fn sample_store() -> InMemoryReferenceStore {
        let ba_dinh = DistrictRecord {
            normalized: "ba dinh".into(),
            full: "Quận Ba Đình".into(),
            prefix: "quan".into(),
            state_code: None,
            county_code: None,
            wards: vec![WardRecord {
                normalized: "dien bien".into(),
                full: "Phường Điện Biên".into(),
                prefix: "phuong".into(),
            }],
            streets: vec![StreetRecord {
                normalized: "hoang dieu".into(),
                full: "Hoàng Diệu".into(),
            }],
        };
        let ha_noi = ProvinceRecord {
            normalized: "ha noi".into(),
            full: "Thành phố Hà Nội".into(),
            prefix: "thanh pho".into(),
            districts: vec![ba_dinh],
        };
        InMemoryReferenceStore::new(vec![ha_noi], vec![])
    }

    fn extract_for(text: &str, store: &InMemoryReferenceStore, config: &Config) -> Vec<Candidate> {
        let (tokens, _) = tokenize_with_delimiters(text);
        let index = TokenIndex::build_from_store(store);
        extract(&tokens, text, None, None, &index, store, config)
    }

    #[test]
    fn full_hierarchy_combination_scores_highest_at_ward_level() {
        let store = sample_store();
        let config = Config::default();
        let candidates = extract_for("phuong dien bien quan ba dinh ha noi", &store, &config);
        assert!(!candidates.is_empty());
        let best = &candidates[0];
        assert_eq!(best.match_level, MatchLevel::Ward);
        assert_eq!(best.province.as_deref(), Some("ha noi"));
        assert_eq!(best.district.as_deref(), Some("ba dinh"));
        assert_eq!(best.ward.as_deref(), Some("dien bien"));
    }

    #[test]
    fn keywordless_adjacent_span_earns_adjacency_bonus() {
        let store = sample_store();
        let config = Config::default();
        // No "phuong"/"quan" keywords between the two names: their n-gram
        // ranges abut directly, which is what the adjacency bonus rewards.
        let candidates = extract_for("dien bien ba dinh ha noi", &store, &config);
        let best = candidates
            .iter()
            .find(|c| c.ward.is_some() && c.district.is_some())
            .unwrap();
        assert!((best.adjacency_bonus - config.adjacency_bonus).abs() < 1e-9);
    }

    #[test]
    fn province_only_candidate_tagged_province_only_no_db() {
        let store = sample_store();
        let config = Config::default();
        let candidates = extract_for("ha noi", &store, &config);
        let province_only = candidates
            .iter()
            .find(|c| c.match_level == MatchLevel::Province)
            .unwrap();
        assert_eq!(province_only.source, Source::ProvinceOnlyNoDb);
        assert!(province_only.district.is_none());
    }

    fn store_with_two_districts() -> InMemoryReferenceStore {
        let ba_dinh = DistrictRecord {
            normalized: "ba dinh".into(),
            full: "Quận Ba Đình".into(),
            prefix: "quan".into(),
            state_code: None,
            county_code: None,
            wards: vec![WardRecord {
                normalized: "dien bien".into(),
                full: "Phường Điện Biên".into(),
                prefix: "phuong".into(),
            }],
            streets: vec![],
        };
        let dong_da = DistrictRecord {
            normalized: "dong da".into(),
            full: "Quận Đống Đa".into(),
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
            districts: vec![ba_dinh, dong_da],
        };
        InMemoryReferenceStore::new(vec![ha_noi], vec![])
    }

    #[test]
    fn ward_district_conflict_with_explicit_district_produces_mismatch_candidate() {
        // "dien bien" only belongs to "ba dinh", not the explicitly-stated
        // "dong da" — instead of silently dropping the combination, the
        // ward's real district wins and the candidate is flagged.
        let store = store_with_two_districts();
        let config = Config::default();
        let candidates = extract_for("ha noi quan dong da phuong dien bien", &store, &config);
        let mismatch = candidates
            .iter()
            .find(|c| c.source == Source::MultiCandidateInferredDistrictMismatch)
            .expect("expected a district-mismatch candidate");
        assert!(mismatch.district_mismatch);
        assert_eq!(mismatch.district.as_deref(), Some("ba dinh"));
        assert_eq!(mismatch.ward.as_deref(), Some("dien bien"));
        assert_eq!(mismatch.district_score, 0.5);
    }

    #[test]
    fn district_inferred_from_ward_when_district_missing() {
        let store = sample_store();
        let config = Config::default();
        let candidates = extract_for("ha noi phuong dien bien", &store, &config);
        let inferred = candidates
            .iter()
            .find(|c| c.source == Source::MultiCandidateInferredDistrict);
        assert!(inferred.is_some());
        assert_eq!(inferred.unwrap().district.as_deref(), Some("ba dinh"));
    }

    #[test]
    fn known_hint_replaces_province_search() {
        let (tokens, _) = tokenize_with_delimiters("quan ba dinh");
        let store = sample_store();
        let config = Config::default();
        let index = TokenIndex::build_from_store(&store);
        let candidates = extract(&tokens, "quan ba dinh", Some("ha noi"), None, &index, &store, &config);
        assert!(candidates.iter().any(|c| c.province.as_deref() == Some("ha noi")));
    }

    #[test]
    fn street_fallback_used_when_no_ward_found() {
        let store = sample_store();
        let config = Config::default();
        let candidates = extract_for("hoang dieu ba dinh ha noi", &store, &config);
        assert!(candidates.iter().any(|c| c.source == Source::StreetBased));
    }

    #[test]
    fn invalid_hierarchy_combination_is_discarded() {
        let store = sample_store();
        let config = Config::default();
        // "ba dinh" only exists under "ha noi"; a hinted mismatching
        // province must drop every district/ward combination.
        let (tokens, _) = tokenize_with_delimiters("quan ba dinh phuong dien bien");
        let index = TokenIndex::build_from_store(&store);
        let candidates = extract(
            &tokens,
            "quan ba dinh phuong dien bien",
            Some("ho chi minh"),
            None,
            &index,
            &store,
            &config,
        );
        assert!(candidates.iter().all(|c| c.district.is_none() && c.ward.is_none()));
    }

    #[test]
    fn empty_tokens_yield_no_candidates() {
        let store = sample_store();
        let config = Config::default();
        assert!(extract(&[], "", None, None, &TokenIndex::build_from_store(&store), &store, &config).is_empty());
    }
}
