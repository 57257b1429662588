//! Inverted token index over the administrative reference set, bounding
//! fuzzy-match search from O(|level|) to O(|level matching ≥k tokens|)
//! (spec.md §4.2).
//!
//! Shape grounded on `maikereis-lfas/src/postings.rs` and `src/index.rs` —
//! a term → posting-set map built once and queried by token overlap — but
//! without that crate's `roaring::RoaringBitmap` backing: the admin-division
//! reference set tops out around 10,000 rows (spec.md §5), far below where
//! a compressed bitmap earns its keep over a plain `HashSet<usize>`.

use crate::reference::ReferenceStore;
use std::collections::{HashMap, HashSet};

/// A single indexed name at some administrative level, with enough scoping
/// context to filter by ancestor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedName {
    pub normalized: String,
    pub province: Option<String>,
    pub district: Option<String>,
}

struct Postings {
    names: Vec<IndexedName>,
    by_token: HashMap<String, HashSet<usize>>,
}

impl Postings {
    fn build(names: Vec<IndexedName>) -> Self {
        let mut by_token: HashMap<String, HashSet<usize>> = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            for token in name.normalized.split_whitespace() {
                by_token.entry(token.to_string()).or_default().insert(i);
            }
        }
        Self { names, by_token }
    }

    fn candidates(&self, query: &str, min_overlap: usize) -> Vec<&IndexedName> {
        let mut overlap_counts: HashMap<usize, usize> = HashMap::new();
        for token in query.split_whitespace() {
            if let Some(ids) = self.by_token.get(token) {
                for &id in ids {
                    *overlap_counts.entry(id).or_insert(0) += 1;
                }
            }
        }
        let min_overlap = min_overlap.max(1);
        let mut result: Vec<&IndexedName> = overlap_counts
            .into_iter()
            .filter(|(_, count)| *count >= min_overlap)
            .map(|(id, _)| &self.names[id])
            .collect();
        result.sort_by(|a, b| a.normalized.cmp(&b.normalized));
        result
    }
}

/// The three per-level inverted indices, built once at startup from the
/// reference store (spec.md §4.2, §5 — lazy single-flighted init).
pub struct TokenIndex {
    provinces: Postings,
    districts: Postings,
    wards: Postings,
}

impl TokenIndex {
    /// Walk the reference store's accessors to build all three postings
    /// lists. O(|admin divisions|) one-time cost.
    pub fn build_from_store(store: &dyn ReferenceStore) -> Self {
        let mut province_names = Vec::new();
        let mut district_names = Vec::new();
        let mut ward_names = Vec::new();

        for province in store.province_set() {
            province_names.push(IndexedName {
                normalized: province.clone(),
                province: None,
                district: None,
            });
            for district in store.districts_of(&province) {
                district_names.push(IndexedName {
                    normalized: district.normalized.clone(),
                    province: Some(province.clone()),
                    district: None,
                });
                for ward in store.wards_of(&province, &district.normalized) {
                    ward_names.push(IndexedName {
                        normalized: ward.normalized.clone(),
                        province: Some(province.clone()),
                        district: Some(district.normalized.clone()),
                    });
                }
            }
        }

        Self {
            provinces: Postings::build(province_names),
            districts: Postings::build(district_names),
            wards: Postings::build(ward_names),
        }
    }

    pub fn province_candidates(&self, query: &str, min_overlap: usize) -> Vec<&IndexedName> {
        self.provinces.candidates(query, min_overlap)
    }

    pub fn district_candidates(
        &self,
        query: &str,
        province_filter: Option<&str>,
        min_overlap: usize,
    ) -> Vec<&IndexedName> {
        self.districts
            .candidates(query, min_overlap)
            .into_iter()
            .filter(|n| match province_filter {
                Some(p) => n.province.as_deref() == Some(p),
                None => true,
            })
            .collect()
    }

    pub fn ward_candidates(
        &self,
        query: &str,
        province_filter: Option<&str>,
        district_filter: Option<&str>,
        min_overlap: usize,
    ) -> Vec<&IndexedName> {
        self.wards
            .candidates(query, min_overlap)
            .into_iter()
            .filter(|n| match province_filter {
                Some(p) => n.province.as_deref() == Some(p),
                None => true,
            })
            .filter(|n| match district_filter {
                Some(d) => n.district.as_deref() == Some(d),
                None => true,
            })
            .collect()
    }
}

/// Adaptive `min_overlap` policy (spec.md §4.2): 2 tokens required when the
/// query itself has ≥2 tokens, else 1.
pub fn adaptive_min_overlap(query: &str) -> usize {
    if query.split_whitespace().count() >= 2 {
        2
    } else {
        1
    }
}
