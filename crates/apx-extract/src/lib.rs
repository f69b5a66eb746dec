//! apx-extract
//!
//! Invocation extractor. Scans an inventory of source units with a set of
//! call-construction patterns and emits one [`apx_schemas::ApiInvocation`]
//! per distinct call site.
//!
//! # Invariants
//! - Output order is scan order: units in inventory order, call sites in
//!   byte-offset order within a unit. Stable across runs.
//! - No call site is dropped. A dynamically-built target that cannot be
//!   resolved statically is recorded as `<unresolved>` and reported as an
//!   [`UnresolvedTargetWarning`]. So is a call site whose captured method
//!   is unusable.
//! - A multi-topic subscription list yields one invocation per topic.
//! - Pure: no IO. The caller reads files into [`SourceUnit`]s.

mod extractor;
mod pattern;
mod resolve;
mod site;
mod unit;

pub use extractor::{merge_ordered, Extraction, Extractor, UnresolvedTargetWarning};
pub use pattern::{
    default_patterns, default_sink_patterns, CallPattern, ExtractOptions, PatternError,
    PatternSpec, SinkPattern,
};
pub use resolve::{is_symbol_like, Resolved};
pub use unit::SourceUnit;
