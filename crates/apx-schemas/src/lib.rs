//! apx-schemas
//!
//! Shared entity model for the call-site reconciliation engine:
//! - API invocations observed in a source inventory
//! - reference contract entries
//! - discrepancies, sensitive data findings, consolidation decisions
//! - the lifecycle state machines that drive discrepancies and decisions
//! - symbol-format normalization (REST dash form vs WS concatenated form)
//!
//! Pure data and pure functions. No IO.

mod contract;
mod findings;
mod ids;
mod invocation;
mod lifecycle;
pub mod symbol;

pub use contract::{ContractEntry, ContractKey, SigningRule, UseCase};
pub use findings::{
    Category, ConsolidationDecision, DataType, Discrepancy, Handling, Recommendation,
    SensitiveDataFinding, Severity, SinkLocation,
};
pub use ids::{
    decision_id, discrepancy_id, finding_id, invocation_id, DecisionId, DiscrepancyId, FindingId,
    InvocationId,
};
pub use invocation::{
    ApiInvocation, BaseUrlClass, Emission, FieldObservation, Method, SourceLocation,
    TargetResolution, Transport, UNRESOLVED_TARGET,
};
pub use lifecycle::{DecisionState, DiscrepancyStatus, EntityKind, TransitionError};
pub use symbol::SymbolFormat;
