//! The orchestrating pipeline (spec.md §5, §6): wires P1–P6 together and
//! owns the lazily-built, single-flighted Reference Store and Token
//! Index.
//!
//! `AddressParser`'s lazy-resource-behind-`OnceCell` shape is grounded on
//! `ner-core/src/pipeline.rs`'s `NerPipeline`, which drives its own
//! phase sequence (tokenize → features → rules/CRF → Viterbi) through
//! one struct with per-phase `tracing` spans; here the phases are
//! P1–P6 instead.

use crate::candidate::{Candidate, MatchLevel, Source};
use crate::config::Config;
use crate::enrich;
use crate::error::AddressError;
use crate::extractor;
use crate::index::TokenIndex;
use crate::postprocess::{self, FormattedOutput, QualityFlag};
use crate::preprocess;
use crate::reference::{self, InMemoryReferenceStore, ReferenceStore};
use crate::structural::{self, StructuralResult, Tier};
use crate::token::Token;
use crate::validator;
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

/// Per-phase wall-clock timing, in microseconds (spec.md §6 `phase_timings`).
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PhaseTimings {
    pub preprocess_us: u64,
    pub structural_us: u64,
    pub extract_us: u64,
    pub enrich_us: u64,
    pub validate_us: u64,
    pub postprocess_us: u64,
}

/// Full output of a `parse()` call (spec.md §6).
#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
    pub candidates: Vec<Candidate>,
    pub best: FormattedOutput,
    pub quality_flag: QualityFlag,
    pub phase_timings: PhaseTimings,
    /// Non-fatal per-phase problems (spec.md §7 "Propagation"): `parse()`
    /// never raises on bad input, but notes what degraded here instead of
    /// silently returning an empty result with no explanation.
    pub errors: Vec<String>,
}

impl ParseResult {
    /// Serialize to JSON, the wire format a batch driver or API layer
    /// (out of scope here, per spec.md §1) would forward to callers —
    /// mirrors `ner-web`'s `serde_json` response encoding, moved down into
    /// the core crate since `ParseResult` already derives `Serialize`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn elapsed_us(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX)
}

type StoreBuilder = Box<dyn Fn() -> Result<InMemoryReferenceStore, AddressError> + Send + Sync>;

/// Owns the process-wide Reference Store and Token Index, built once on
/// first use and single-flighted via `OnceCell` (spec.md §5). `parse()`
/// is otherwise pure and safe to call concurrently from multiple threads
/// once both resources exist.
pub struct AddressParser {
    store_cell: once_cell::sync::OnceCell<InMemoryReferenceStore>,
    index_cell: once_cell::sync::OnceCell<TokenIndex>,
    build_store: StoreBuilder,
    config: Config,
}

impl AddressParser {
    /// `build_store` runs at most once, the first time the Reference
    /// Store is needed; its result is cached for the parser's lifetime.
    pub fn new(
        build_store: impl Fn() -> Result<InMemoryReferenceStore, AddressError> + Send + Sync + 'static,
        config: Config,
    ) -> Self {
        Self {
            store_cell: once_cell::sync::OnceCell::new(),
            index_cell: once_cell::sync::OnceCell::new(),
            build_store: Box::new(build_store),
            config,
        }
    }

    fn store(&self) -> Result<&InMemoryReferenceStore, AddressError> {
        reference::get_or_init(&self.store_cell, || (self.build_store)())
    }

    fn index(&self) -> Result<&TokenIndex, AddressError> {
        let store = self.store()?;
        if let Some(index) = self.index_cell.get() {
            return Ok(index);
        }
        let built = TokenIndex::build_from_store(store);
        Ok(self.index_cell.get_or_init(|| built))
    }

    /// Run the full six-phase pipeline over `raw`. Fails only when the
    /// Reference Store/Token Index cannot be built (spec.md §7); every
    /// other failure mode degrades to an empty, `failed` result rather
    /// than propagating an error.
    pub fn parse(
        &self,
        raw: &str,
        province_hint: Option<&str>,
        district_hint: Option<&str>,
    ) -> Result<ParseResult, AddressError> {
        let store = self.store()?;
        let index = self.index()?;
        Ok(run(raw, province_hint, district_hint, store, index, &self.config))
    }
}

fn short_circuit_candidate(result: &StructuralResult, tokens: &[Token]) -> Candidate {
    let match_level = if result.ward.is_some() {
        MatchLevel::Ward
    } else if result.district.is_some() {
        MatchLevel::District
    } else {
        MatchLevel::Province
    };
    let source = match result.tier {
        Tier::Tier1 => Source::StructuralTier1,
        Tier::Tier2 => Source::StructuralTier2,
    };
    Candidate {
        province: result.province.clone(),
        district: result.district.clone(),
        ward: result.ward.clone(),
        province_full: String::new(),
        district_full: String::new(),
        ward_full: String::new(),
        province_score: if result.province.is_some() { 0.95 } else { 0.0 },
        district_score: if result.district.is_some() { 0.95 } else { 0.0 },
        ward_score: if result.ward.is_some() { 0.95 } else { 0.0 },
        province_tokens: result.province_range,
        district_tokens: result.district_range,
        ward_tokens: result.ward_range,
        combined_score: result.confidence,
        proximity_score: 1.0,
        order_bonus: 1.0,
        adjacency_bonus: 1.0,
        direct_match_bonus: 1.0,
        match_level,
        hierarchy_valid: true,
        source,
        normalized_tokens: tokens.iter().map(|t| t.text.clone()).collect(),
        confidence: result.confidence,
        final_confidence: None,
        state_code: None,
        county_code: None,
        district_mismatch: false,
    }
}

/// The pure pipeline body: P1 preprocess → P2 structural (short-circuit
/// check) → P3 extract (unless short-circuited) → P4 enrich → P5
/// validate → P6 postprocess. Exposed directly so tests and alternate
/// hosts can drive it against an in-process store/index without going
/// through [`AddressParser`]'s lazy-init machinery.
pub fn run(
    raw: &str,
    province_hint: Option<&str>,
    district_hint: Option<&str>,
    store: &dyn ReferenceStore,
    index: &TokenIndex,
    config: &Config,
) -> ParseResult {
    let _span = tracing::debug_span!("parse").entered();
    let mut timings = PhaseTimings::default();

    let t0 = Instant::now();
    let preprocessed = preprocess::preprocess(raw, province_hint, district_hint, store, config);
    timings.preprocess_us = elapsed_us(t0);

    if preprocessed.normalized.trim().is_empty() {
        let (best, quality_flag) = postprocess::postprocess(None, config);
        debug!("empty normalized text, short-circuiting to failed result");
        return ParseResult {
            candidates: Vec::new(),
            best,
            quality_flag,
            phase_timings: timings,
            errors: vec!["invalid-input: empty normalized text, no tokens to extract from".to_string()],
        };
    }

    // Reuse the tokens/delimiter structure preprocessing already recovered
    // before `finalize_normalization` collapsed delimiter punctuation —
    // re-tokenizing `preprocessed.normalized` here would lose the `/` of a
    // protected "55/2"-style house number (spec.md §4.4 step 4).
    let tokens = preprocessed.tokens.clone();
    let delimiter_info = preprocessed.delimiter_info.clone();

    let t1 = Instant::now();
    let structural_result = structural::parse(
        &tokens,
        &delimiter_info.segments,
        delimiter_info.has_delimiters,
        store,
        config,
    );
    timings.structural_us = elapsed_us(t1);

    let effective_province_hint = preprocessed.province_context.as_deref().or(province_hint);
    let effective_district_hint = preprocessed.district_context.as_deref().or(district_hint);

    let mut candidates = match &structural_result {
        Some(result) if result.should_short_circuit(store) => {
            debug!(tier = ?result.tier, "structural parser short-circuited extraction");
            vec![short_circuit_candidate(result, &tokens)]
        }
        _ => {
            let t2 = Instant::now();
            let extracted = extractor::extract(
                &tokens,
                &preprocessed.pre_abbreviation_normalized,
                effective_province_hint,
                effective_district_hint,
                index,
                store,
                config,
            );
            timings.extract_us = elapsed_us(t2);
            extracted
        }
    };

    let t3 = Instant::now();
    candidates = enrich::enrich(candidates, store);
    timings.enrich_us = elapsed_us(t3);

    let t4 = Instant::now();
    candidates = validator::validate(candidates, store, config);
    timings.validate_us = elapsed_us(t4);

    let t5 = Instant::now();
    let (best, quality_flag) = postprocess::postprocess(candidates.first(), config);
    timings.postprocess_us = elapsed_us(t5);

    ParseResult {
        candidates,
        best,
        quality_flag,
        phase_timings: timings,
        errors: Vec::new(),
    }
}
