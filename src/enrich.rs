//! Phase 4 — Candidate Enricher: dedup by hierarchy triple, then populate
//! full/original-case names from the reference store (spec.md §4.8).
//!
//! Pass-through shape grounded on
//! `original_source/src/processors/phase3_candidates.py`'s dedup loop
//! (`seen` map keyed by triple, kept candidate chosen by
//! `confidence * source_weight`) and `extraction_utils.py`'s
//! `lookup_full_names`, generalized here into three independent per-level
//! lookups so a province-only candidate never borrows a stray
//! district/ward string — the province lookup goes through a dedicated
//! `ReferenceStore::province_full` accessor rather than `find_admin`, which
//! requires at least two components and would otherwise return `None` for
//! exactly that candidate shape.

use crate::candidate::Candidate;
use crate::reference::ReferenceStore;
use std::collections::HashMap;

/// Deduplicate by `(province, district, ward)`, keeping the
/// highest-weighted candidate per key (spec.md §4.8). Per spec.md §9's
/// Open Question resolution, every source is treated uniformly here —
/// `structural_tier1` gets no special-casing.
pub fn dedup(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut best: HashMap<(Option<String>, Option<String>, Option<String>), Candidate> =
        HashMap::new();
    for candidate in candidates {
        let key = candidate.dedup_key();
        match best.get(&key) {
            Some(existing) if existing.weighted_score() >= candidate.weighted_score() => {}
            _ => {
                best.insert(key, candidate);
            }
        }
    }
    best.into_values().collect()
}

/// Populate `province_full`/`district_full`/`ward_full` from the
/// reference store when missing (spec.md §4.8). Missing rows leave the
/// field an empty string rather than erroring (spec.md §7).
pub fn populate_full_names(mut candidate: Candidate, store: &dyn ReferenceStore) -> Candidate {
    if let Some(province) = &candidate.province {
        if candidate.province_full.is_empty() {
            if let Some(full) = store.province_full(province) {
                candidate.province_full = full;
            }
        }
    }
    if let (Some(province), Some(district)) = (&candidate.province, &candidate.district) {
        if candidate.district_full.is_empty() {
            if let Some(admin) = store.find_admin(province, Some(district), None) {
                candidate.district_full = admin.district_full;
                candidate.state_code = admin.state_code;
                candidate.county_code = admin.county_code;
            }
        }
    }
    if let (Some(province), Some(district), Some(ward)) =
        (&candidate.province, &candidate.district, &candidate.ward)
    {
        if candidate.ward_full.is_empty() {
            if let Some(admin) = store.find_admin(province, Some(district), Some(ward)) {
                candidate.ward_full = admin.ward_full;
            }
        }
    }
    candidate
}

/// Run Phase 4 over a full candidate list.
pub fn enrich(candidates: Vec<Candidate>, store: &dyn ReferenceStore) -> Vec<Candidate> {
    let deduped = dedup(candidates);
    deduped
        .into_iter()
        .map(|c| populate_full_names(c, store))
        .collect()
}
