//! Fatal error conditions surfaced to callers.
//!
//! Per spec, `parse()` itself never fails — bad input degrades to an empty
//! `ParseResult` with a `failed` quality flag. Only reference-store and
//! token-index construction can fail outright, since those run once at
//! startup and a caller genuinely cannot proceed without them.

use thiserror::Error;

/// Fatal errors raised during one-time setup of the reference store or
/// token index. Never raised by `parse()` once setup has succeeded.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("reference store unavailable: {0}")]
    ReferenceStoreUnavailable(String),

    #[error("failed to build token index: {0}")]
    IndexBuildFailed(String),
}
