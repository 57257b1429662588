//! Process-wide memoization for the matching primitives.
//!
//! Mirrors `original_source/src/utils/text_utils.py`'s `lru_cache`
//! decorators and its `clear_cache`/`get_cache_stats` pair, but as an
//! explicit `RwLock`-guarded table behind a `once_cell::sync::Lazy`
//! (pattern borrowed from `examples/maikereis-lfas`, which uses the same
//! crate for its own process-wide lookup tables). Last-writer-wins on
//! concurrent insertion is fine — every entry is the pure result of its
//! key, so two threads racing to insert always agree on the value.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::RwLock;

type Key = (String, String);

#[derive(Default)]
struct Table(RwLock<HashMap<Key, f64>>);

impl Table {
    fn get_or_insert_with(&self, a: &str, b: &str, f: impl FnOnce() -> f64) -> f64 {
        let key = (a.to_string(), b.to_string());
        if let Some(v) = self.0.read().unwrap().get(&key) {
            return *v;
        }
        let value = f();
        self.0.write().unwrap().insert(key, value);
        value
    }

    fn len(&self) -> usize {
        self.0.read().unwrap().len()
    }

    fn clear(&self) {
        self.0.write().unwrap().clear();
    }
}

struct Cache {
    levenshtein: Table,
    jaccard: Table,
    token_sort: Table,
    ensemble: Table,
}

static CACHE: Lazy<Cache> = Lazy::new(|| Cache {
    levenshtein: Table::default(),
    jaccard: Table::default(),
    token_sort: Table::default(),
    ensemble: Table::default(),
});

pub(crate) fn memo_levenshtein(a: &str, b: &str, f: impl FnOnce() -> f64) -> f64 {
    CACHE.levenshtein.get_or_insert_with(a, b, f)
}

pub(crate) fn memo_jaccard(a: &str, b: &str, f: impl FnOnce() -> f64) -> f64 {
    CACHE.jaccard.get_or_insert_with(a, b, f)
}

pub(crate) fn memo_token_sort(a: &str, b: &str, f: impl FnOnce() -> f64) -> f64 {
    CACHE.token_sort.get_or_insert_with(a, b, f)
}

pub(crate) fn memo_ensemble(a: &str, b: &str, f: impl FnOnce() -> f64) -> f64 {
    CACHE.ensemble.get_or_insert_with(a, b, f)
}

/// Snapshot of how many distinct `(a, b)` pairs each primitive has memoized.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub levenshtein: usize,
    pub jaccard: usize,
    pub token_sort: usize,
    pub ensemble: usize,
}

/// Read current memoization table sizes.
pub fn stats() -> CacheStats {
    CacheStats {
        levenshtein: CACHE.levenshtein.len(),
        jaccard: CACHE.jaccard.len(),
        token_sort: CACHE.token_sort.len(),
        ensemble: CACHE.ensemble.len(),
    }
}

/// Drop every memoized entry. Safe to call at any time; a pure re-derivation
/// simply happens on next lookup. Useful for long-running host processes
/// that want to bound memory between batches.
pub fn clear() {
    CACHE.levenshtein.clear();
    CACHE.jaccard.clear();
    CACHE.token_sort.clear();
    CACHE.ensemble.clear();
}
