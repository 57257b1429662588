//! The administrative reference store: provinces, districts, wards,
//! streets, and abbreviations, plus the read-only accessors every later
//! phase queries.
//!
//! Record shapes are grounded on `holg-geodb-rs`'s nested `Country` →
//! `State` → `City` model (`crates/geodb-core/src/model/nested.rs`), swapped
//! from country/state/city to province/district/ward and stripped of the
//! geocoding-specific fields (lat/lng/population) this domain doesn't need.
//! The owned-name-set accessor style (`province_set`, `district_set`, ...)
//! is grounded on `ner-core/src/features.rs`'s `Gazetteers`, which exposes
//! the same "derive once from nested data, cache until invalidated" shape
//! over its own nested name lists.

use crate::error::AddressError;
use once_cell::sync::OnceCell;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock as StdRwLock;

/// A ward: the innermost administrative level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WardRecord {
    pub normalized: String,
    pub full: String,
    pub prefix: String,
}

/// A street, scoped to a district (the same street name may recur across
/// districts of the same province).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreetRecord {
    pub normalized: String,
    pub full: String,
}

/// A district, owning the wards and streets within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistrictRecord {
    pub normalized: String,
    pub full: String,
    pub prefix: String,
    pub state_code: Option<String>,
    pub county_code: Option<String>,
    pub wards: Vec<WardRecord>,
    pub streets: Vec<StreetRecord>,
}

/// A province, owning its districts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvinceRecord {
    pub normalized: String,
    pub full: String,
    pub prefix: String,
    pub districts: Vec<DistrictRecord>,
}

/// A single abbreviation mapping, optionally scoped to a province and/or
/// district context (spec.md §3 "Abbreviation").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbbreviationRecord {
    pub key: String,
    pub word: String,
    pub province_context: Option<String>,
    pub district_context: Option<String>,
}

/// Result of `find_admin`: canonical originals and prefixes for whichever
/// levels were resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminRecord {
    pub province_full: String,
    pub province_prefix: String,
    pub district_full: String,
    pub district_prefix: String,
    pub ward_full: String,
    pub ward_prefix: String,
    pub state_code: Option<String>,
    pub county_code: Option<String>,
}

/// Outcome of a province/district name collision lookup (spec.md §4.6.4).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionInfo {
    pub as_province: Option<String>,
    pub as_district: Option<(String, String)>,
}

impl CollisionInfo {
    pub fn is_collision(&self) -> bool {
        self.as_province.is_some() && self.as_district.is_some()
    }
}

/// Read-only accessors over the administrative reference data (spec.md §4.1).
///
/// Every method is idempotent and side-effect-free. Implementations are
/// expected to cache derived views (name sets, inverted lookups) until an
/// explicit [`ReferenceStore::invalidate`] call.
pub trait ReferenceStore: Send + Sync {
    fn province_set(&self) -> HashSet<String>;
    fn district_set(&self) -> HashSet<String>;
    fn ward_set(&self) -> HashSet<String>;
    fn street_set(&self) -> HashSet<String>;

    fn districts_of(&self, province_norm: &str) -> Vec<DistrictRecord>;
    fn wards_of(&self, province_norm: &str, district_norm: &str) -> Vec<WardRecord>;
    fn streets_of(&self, province_norm: &str, district_norm: Option<&str>) -> Vec<StreetRecord>;

    fn find_admin(
        &self,
        province_norm: &str,
        district_norm: Option<&str>,
        ward_norm: Option<&str>,
    ) -> Option<AdminRecord>;

    /// Canonical original-case, prefixed name of a province alone, bypassing
    /// `find_admin`'s two-component minimum — needed so a province-only
    /// candidate (spec.md §4.8) never leaves `province_full` empty.
    fn province_full(&self, province_norm: &str) -> Option<String>;

    fn hierarchy_valid(
        &self,
        province_norm: &str,
        district_norm: Option<&str>,
        ward_norm: Option<&str>,
    ) -> bool;

    fn infer_district_from_ward(&self, province_norm: &str, ward_norm: &str) -> Option<String>;
    fn infer_province_from_district(&self, district_norm: &str) -> Option<String>;
    fn province_district_collision(&self, name_norm: &str) -> CollisionInfo;

    fn abbreviations(
        &self,
        province_ctx: Option<&str>,
        district_ctx: Option<&str>,
    ) -> HashMap<String, String>;
    fn expand_abbreviation(
        &self,
        abbr: &str,
        province_ctx: Option<&str>,
        district_ctx: Option<&str>,
    ) -> Option<String>;

    /// Drop every cached derived view. Safe to call at any time.
    fn invalidate(&self);
}

#[derive(Default)]
struct DerivedCaches {
    province_set: StdRwLock<Option<HashSet<String>>>,
    district_set: StdRwLock<Option<HashSet<String>>>,
    ward_set: StdRwLock<Option<HashSet<String>>>,
    street_set: StdRwLock<Option<HashSet<String>>>,
}

impl DerivedCaches {
    fn clear(&self) {
        *self.province_set.write().unwrap() = None;
        *self.district_set.write().unwrap() = None;
        *self.ward_set.write().unwrap() = None;
        *self.street_set.write().unwrap() = None;
    }
}

/// In-memory [`ReferenceStore`] built once at startup from the loaded
/// admin-division/street/abbreviation data (spec.md §6's relational
/// schema — out of scope to load from a real database here; callers
/// populate it via [`InMemoryReferenceStore::new`]).
pub struct InMemoryReferenceStore {
    provinces: Vec<ProvinceRecord>,
    abbreviations: Vec<AbbreviationRecord>,
    caches: DerivedCaches,
}

impl InMemoryReferenceStore {
    pub fn new(provinces: Vec<ProvinceRecord>, abbreviations: Vec<AbbreviationRecord>) -> Self {
        Self {
            provinces,
            abbreviations,
            caches: DerivedCaches::default(),
        }
    }

    fn province(&self, province_norm: &str) -> Option<&ProvinceRecord> {
        self.provinces.iter().find(|p| p.normalized == province_norm)
    }

    fn district<'a>(
        &'a self,
        province: &'a ProvinceRecord,
        district_norm: &str,
    ) -> Option<&'a DistrictRecord> {
        province.districts.iter().find(|d| d.normalized == district_norm)
    }

    fn find_district_anywhere(&self, district_norm: &str) -> Option<(&ProvinceRecord, &DistrictRecord)> {
        for p in &self.provinces {
            if let Some(d) = self.district(p, district_norm) {
                return Some((p, d));
            }
        }
        None
    }
}

impl ReferenceStore for InMemoryReferenceStore {
    fn province_set(&self) -> HashSet<String> {
        if let Some(cached) = self.caches.province_set.read().unwrap().as_ref() {
            return cached.clone();
        }
        let set: HashSet<String> = self.provinces.iter().map(|p| p.normalized.clone()).collect();
        *self.caches.province_set.write().unwrap() = Some(set.clone());
        set
    }

    fn district_set(&self) -> HashSet<String> {
        if let Some(cached) = self.caches.district_set.read().unwrap().as_ref() {
            return cached.clone();
        }
        let set: HashSet<String> = self
            .provinces
            .iter()
            .flat_map(|p| p.districts.iter().map(|d| d.normalized.clone()))
            .collect();
        *self.caches.district_set.write().unwrap() = Some(set.clone());
        set
    }

    fn ward_set(&self) -> HashSet<String> {
        if let Some(cached) = self.caches.ward_set.read().unwrap().as_ref() {
            return cached.clone();
        }
        let set: HashSet<String> = self
            .provinces
            .iter()
            .flat_map(|p| p.districts.iter())
            .flat_map(|d| d.wards.iter().map(|w| w.normalized.clone()))
            .collect();
        *self.caches.ward_set.write().unwrap() = Some(set.clone());
        set
    }

    fn street_set(&self) -> HashSet<String> {
        if let Some(cached) = self.caches.street_set.read().unwrap().as_ref() {
            return cached.clone();
        }
        let set: HashSet<String> = self
            .provinces
            .iter()
            .flat_map(|p| p.districts.iter())
            .flat_map(|d| d.streets.iter().map(|s| s.normalized.clone()))
            .collect();
        *self.caches.street_set.write().unwrap() = Some(set.clone());
        set
    }

    fn districts_of(&self, province_norm: &str) -> Vec<DistrictRecord> {
        self.province(province_norm)
            .map(|p| p.districts.clone())
            .unwrap_or_default()
    }

    fn wards_of(&self, province_norm: &str, district_norm: &str) -> Vec<WardRecord> {
        self.province(province_norm)
            .and_then(|p| self.district(p, district_norm))
            .map(|d| d.wards.clone())
            .unwrap_or_default()
    }

    fn streets_of(&self, province_norm: &str, district_norm: Option<&str>) -> Vec<StreetRecord> {
        let Some(province) = self.province(province_norm) else {
            return Vec::new();
        };
        match district_norm {
            Some(d) => self
                .district(province, d)
                .map(|d| d.streets.clone())
                .unwrap_or_default(),
            None => province
                .districts
                .iter()
                .flat_map(|d| d.streets.iter().cloned())
                .collect(),
        }
    }

    fn find_admin(
        &self,
        province_norm: &str,
        district_norm: Option<&str>,
        ward_norm: Option<&str>,
    ) -> Option<AdminRecord> {
        let components_given = 1
            + district_norm.is_some() as usize
            + ward_norm.is_some() as usize;
        if components_given < 2 {
            return None;
        }

        let province = self.province(province_norm)?;
        let mut record = AdminRecord {
            province_full: province.full.clone(),
            province_prefix: province.prefix.clone(),
            ..Default::default()
        };

        let district = match district_norm {
            Some(d) => {
                let district = self.district(province, d)?;
                record.district_full = district.full.clone();
                record.district_prefix = district.prefix.clone();
                record.state_code = district.state_code.clone();
                record.county_code = district.county_code.clone();
                Some(district)
            }
            None => None,
        };

        if let Some(ward_norm) = ward_norm {
            let district = district?;
            let ward = district.wards.iter().find(|w| w.normalized == ward_norm)?;
            record.ward_full = ward.full.clone();
            record.ward_prefix = ward.prefix.clone();
        }

        Some(record)
    }

    fn province_full(&self, province_norm: &str) -> Option<String> {
        self.province(province_norm).map(|p| p.full.clone())
    }

    fn hierarchy_valid(
        &self,
        province_norm: &str,
        district_norm: Option<&str>,
        ward_norm: Option<&str>,
    ) -> bool {
        let Some(province) = self.province(province_norm) else {
            return false;
        };
        let district = match district_norm {
            Some(d) => match self.district(province, d) {
                Some(d) => Some(d),
                None => return false,
            },
            None => None,
        };
        if let Some(ward_norm) = ward_norm {
            return match district {
                Some(d) => d.wards.iter().any(|w| w.normalized == ward_norm),
                None => false,
            };
        }
        true
    }

    fn infer_district_from_ward(&self, province_norm: &str, ward_norm: &str) -> Option<String> {
        let province = self.province(province_norm)?;
        province
            .districts
            .iter()
            .find(|d| d.wards.iter().any(|w| w.normalized == ward_norm))
            .map(|d| d.normalized.clone())
    }

    fn infer_province_from_district(&self, district_norm: &str) -> Option<String> {
        self.find_district_anywhere(district_norm)
            .map(|(p, _)| p.normalized.clone())
    }

    fn province_district_collision(&self, name_norm: &str) -> CollisionInfo {
        let as_province = self
            .province(name_norm)
            .map(|p| p.normalized.clone());
        let as_district = self
            .find_district_anywhere(name_norm)
            .map(|(p, d)| (d.normalized.clone(), p.normalized.clone()));
        CollisionInfo {
            as_province,
            as_district,
        }
    }

    fn abbreviations(
        &self,
        province_ctx: Option<&str>,
        district_ctx: Option<&str>,
    ) -> HashMap<String, String> {
        let mut merged = HashMap::new();
        // Precedence low-to-high: global, then province, then district.
        for a in self.abbreviations.iter().filter(|a| {
            a.province_context.is_none() && a.district_context.is_none()
        }) {
            merged.insert(a.key.clone(), a.word.clone());
        }
        if let Some(p) = province_ctx {
            for a in self.abbreviations.iter().filter(|a| {
                a.district_context.is_none() && a.province_context.as_deref() == Some(p)
            }) {
                merged.insert(a.key.clone(), a.word.clone());
            }
        }
        if let Some(d) = district_ctx {
            for a in self
                .abbreviations
                .iter()
                .filter(|a| a.district_context.as_deref() == Some(d))
            {
                merged.insert(a.key.clone(), a.word.clone());
            }
        }
        merged
    }

    fn expand_abbreviation(
        &self,
        abbr: &str,
        province_ctx: Option<&str>,
        district_ctx: Option<&str>,
    ) -> Option<String> {
        if let Some(d) = district_ctx {
            if let Some(a) = self
                .abbreviations
                .iter()
                .find(|a| a.key == abbr && a.district_context.as_deref() == Some(d))
            {
                return Some(a.word.clone());
            }
        }
        if let Some(p) = province_ctx {
            if let Some(a) = self.abbreviations.iter().find(|a| {
                a.key == abbr && a.district_context.is_none() && a.province_context.as_deref() == Some(p)
            }) {
                return Some(a.word.clone());
            }
        }
        self.abbreviations
            .iter()
            .find(|a| a.key == abbr && a.province_context.is_none() && a.district_context.is_none())
            .map(|a| a.word.clone())
    }

    fn invalidate(&self) {
        self.caches.clear();
    }
}

/// Lazily initialize a process-wide [`InMemoryReferenceStore`], single-
/// flighted via [`OnceCell`] per spec.md §5 (one builder wins, others wait).
pub fn get_or_init(
    cell: &OnceCell<InMemoryReferenceStore>,
    build: impl FnOnce() -> Result<InMemoryReferenceStore, AddressError>,
) -> Result<&InMemoryReferenceStore, AddressError> {
    cell.get_or_try_init(build)
}

#[cfg(test)]
mod tests {
    use super::*;

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
            streets: vec![],
        };
        let ha_noi = ProvinceRecord {
            normalized: "ha noi".into(),
            full: "Thành phố Hà Nội".into(),
            prefix: "thanh pho".into(),
            districts: vec![ba_dinh],
        };
        let ben_tre_city = DistrictRecord {
            normalized: "ben tre".into(),
            full: "Thành phố Bến Tre".into(),
            prefix: "thanh pho".into(),
            state_code: None,
            county_code: None,
            wards: vec![],
            streets: vec![],
        };
        let ben_tre_province = ProvinceRecord {
            normalized: "ben tre".into(),
            full: "Tỉnh Bến Tre".into(),
            prefix: "tinh".into(),
            districts: vec![ben_tre_city],
        };
        InMemoryReferenceStore::new(vec![ha_noi, ben_tre_province], vec![])
    }

    #[test]
    fn hierarchy_valid_checks_full_chain() {
        let store = sample_store();
        assert!(store.hierarchy_valid("ha noi", Some("ba dinh"), Some("dien bien")));
        assert!(!store.hierarchy_valid("ha noi", Some("ba dinh"), Some("nonexistent")));
        assert!(!store.hierarchy_valid("nonexistent", None, None));
    }

    #[test]
    fn find_admin_requires_two_components() {
        let store = sample_store();
        assert!(store.find_admin("ha noi", None, None).is_none());
        assert!(store.find_admin("ha noi", Some("ba dinh"), None).is_some());
    }

    #[test]
    fn province_full_resolves_with_a_single_component() {
        let store = sample_store();
        assert_eq!(
            store.province_full("ha noi"),
            Some("Thành phố Hà Nội".to_string())
        );
        assert_eq!(store.province_full("nonexistent"), None);
    }

    #[test]
    fn infer_district_from_ward_resolves() {
        let store = sample_store();
        assert_eq!(
            store.infer_district_from_ward("ha noi", "dien bien"),
            Some("ba dinh".to_string())
        );
        assert_eq!(store.infer_district_from_ward("ha noi", "nope"), None);
    }

    #[test]
    fn infer_province_from_district_resolves() {
        let store = sample_store();
        assert_eq!(
            store.infer_province_from_district("ba dinh"),
            Some("ha noi".to_string())
        );
    }

    #[test]
    fn detects_province_district_collision() {
        let store = sample_store();
        let collision = store.province_district_collision("ben tre");
        assert!(collision.is_collision());
        assert_eq!(collision.as_province, Some("ben tre".to_string()));
        assert_eq!(
            collision.as_district,
            Some(("ben tre".to_string(), "ben tre".to_string()))
        );
    }

    #[test]
    fn abbreviation_precedence_district_over_province_over_global() {
        let store = InMemoryReferenceStore::new(
            vec![],
            vec![
                AbbreviationRecord {
                    key: "tx".into(),
                    word: "thi xa".into(),
                    province_context: None,
                    district_context: None,
                },
                AbbreviationRecord {
                    key: "tx".into(),
                    word: "thanh xuan".into(),
                    province_context: Some("ha noi".into()),
                    district_context: None,
                },
                AbbreviationRecord {
                    key: "tx".into(),
                    word: "tay ho".into(),
                    province_context: Some("ha noi".into()),
                    district_context: Some("ba dinh".into()),
                },
            ],
        );
        assert_eq!(
            store.expand_abbreviation("tx", None, None),
            Some("thi xa".to_string())
        );
        assert_eq!(
            store.expand_abbreviation("tx", Some("ha noi"), None),
            Some("thanh xuan".to_string())
        );
        assert_eq!(
            store.expand_abbreviation("tx", Some("ha noi"), Some("ba dinh")),
            Some("tay ho".to_string())
        );
    }

    #[test]
    fn derived_sets_cache_until_invalidated() {
        let store = sample_store();
        let first = store.province_set();
        assert!(first.contains("ha noi"));
        store.invalidate();
        let second = store.province_set();
        assert_eq!(first, second);
    }
}
