//! apx-reconcile
//!
//! Reconciliation engine: binds extracted invocations to the reference
//! contract, classifies divergences, scans for sensitive data reaching sinks,
//! and proposes consolidation of duplicated call sites.
//!
//! # Invariants
//! - Deterministic: identical input yields an identical [`AuditOutcome`],
//!   ids included.
//! - Every invocation has a binding and a (possibly empty) discrepancy list.
//! - `coverage.mapped + coverage.unmapped == coverage.total`; unresolved
//!   invocations stay in the denominator.
//! - Per-item problems degrade to recorded discrepancies and warnings. Nothing
//!   here fails the batch.
//!
//! Pure logic. No IO.

mod classifier;
mod consolidate;
mod engine;
mod matcher;
mod scanner;
mod types;

pub use classifier::{
    classify, unmapped, TAG_BASE_URL_DRIFT, TAG_ENUM_VIOLATION, TAG_MISSING_FIELD,
    TAG_MISSING_HEADER, TAG_SYMBOL_FORMAT, TAG_TRANSPORT_MISMATCH, TAG_UNKNOWN_FIELD,
    TAG_UNMAPPED,
};
pub use consolidate::{analyze, purposes_overlap, Consolidation, TAG_DUPLICATE_CALL_SITE};
pub use engine::{assemble, evaluate_invocation, reconcile, InvocationAudit};
pub use matcher::{bind, normalized_key, MatchOutcome};
pub use scanner::{
    classify_name, data_types_in, scan, vocabulary, ScanResult, NOTE_SINK_METADATA_MISSING,
    TAG_PLAIN_EXPOSURE,
};
pub use types::*;
