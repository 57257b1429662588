//! # viet-address-core — Vietnamese postal address hierarchy extraction
//!
//! Extracts the province/district/ward administrative hierarchy (plus a
//! leftover street/house-number remainder) from free-form Vietnamese
//! address text, through a six-phase pipeline:
//!
//! ```text
//! Preprocessor → Structural Parser → Extractor → Candidate Enricher
//!   → Validator & Ranker → Postprocessor
//! ```
//!
//! backed by a read-only Reference Store and Token Index, using a small
//! set of fuzzy-matching primitives (Levenshtein, Jaccard, token-sort,
//! and a weighted ensemble of the three).

pub mod cache;
pub mod candidate;
pub mod config;
pub mod enrich;
pub mod error;
pub mod extractor;
pub mod index;
pub mod matching;
pub mod ngram;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod reference;
pub mod structural;
pub mod text;
pub mod token;
pub mod validator;

pub use candidate::{Candidate, MatchLevel, Source};
pub use config::Config;
pub use error::AddressError;
pub use pipeline::{AddressParser, ParseResult, PhaseTimings};
pub use postprocess::{FormattedOutput, QualityFlag};
pub use reference::{
    AbbreviationRecord, AdminRecord, CollisionInfo, DistrictRecord, InMemoryReferenceStore,
    ProvinceRecord, ReferenceStore, StreetRecord, WardRecord,
};
