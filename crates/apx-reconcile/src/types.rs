use std::collections::BTreeMap;
use std::fmt;

use apx_schemas::{
    ApiInvocation, ConsolidationDecision, ContractKey, DecisionId, DecisionState, Discrepancy,
    DiscrepancyId, DiscrepancyStatus, EntityKind, InvocationId, SensitiveDataFinding, Severity,
    SourceLocation, TransitionError,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Severity assignment for the checks whose severity is a policy input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeverityPolicy {
    pub transport_mismatch: Severity,
    /// Used instead of `transport_mismatch` when the use case is rate-limited.
    pub transport_mismatch_rate_limited: Severity,
    pub base_url_drift: Severity,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            transport_mismatch: Severity::Warning,
            transport_mismatch_rate_limited: Severity::Critical,
            base_url_drift: Severity::Warning,
        }
    }
}

// ---------------------------------------------------------------------------
// Sink metadata
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkRule {
    pub sink: String,
    #[serde(default)]
    pub redacts: bool,
}

/// Logging / persistence sinks reachable from one source location.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkMetadata {
    pub sinks: Vec<SinkRule>,
}

impl SinkMetadata {
    /// Whether `sink` redacts; `None` when the sink is not declared.
    pub fn redacts(&self, sink: &str) -> Option<bool> {
        self.sinks
            .iter()
            .find(|r| r.sink.eq_ignore_ascii_case(sink))
            .map(|r| r.redacts)
    }
}

/// Source of sink metadata per source location.
pub trait SinkMetadataSource {
    fn sinks_for(&self, path: &str) -> Option<&SinkMetadata>;
}

/// Exact-path lookup.
impl SinkMetadataSource for BTreeMap<String, SinkMetadata> {
    fn sinks_for(&self, path: &str) -> Option<&SinkMetadata> {
        self.get(path)
    }
}

/// No metadata anywhere: every sink is treated as plain.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSinkMetadata;

impl SinkMetadataSource for NoSinkMetadata {
    fn sinks_for(&self, _path: &str) -> Option<&SinkMetadata> {
        None
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of matching one invocation against the contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Binding {
    Mapped {
        key: ContractKey,
        /// The invocation's target had to be rewritten to the transport's
        /// symbol form to find the entry.
        symbol_normalized: bool,
    },
    Unmapped,
}

impl Binding {
    pub fn is_mapped(&self) -> bool {
        matches!(self, Binding::Mapped { .. })
    }

    pub fn key(&self) -> Option<&ContractKey> {
        match self {
            Binding::Mapped { key, .. } => Some(key),
            Binding::Unmapped => None,
        }
    }
}

/// `mapped + unmapped == total` always. Unresolved invocations are counted
/// in `total` and `unmapped`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub total: usize,
    pub mapped: usize,
    pub unmapped: usize,
    pub unresolved: usize,
    pub ratio: f64,
}

impl Coverage {
    pub fn from_counts(total: usize, mapped: usize, unresolved: usize) -> Self {
        let ratio = if total == 0 {
            1.0
        } else {
            mapped as f64 / total as f64
        };
        Self {
            total,
            mapped,
            unmapped: total - mapped.min(total),
            unresolved,
            ratio,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.mapped == self.total
    }
}

/// Recovered per-item conditions. Always recorded, never fatal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditWarning {
    UnresolvedTarget {
        invocation_id: InvocationId,
        location: SourceLocation,
        raw: String,
    },
    SinkMetadataMissing {
        invocation_id: InvocationId,
        evidence: SourceLocation,
        sink: String,
    },
}

impl fmt::Display for AuditWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditWarning::UnresolvedTarget { location, raw, .. } => {
                write!(f, "UNRESOLVED_TARGET: {location}: {raw}")
            }
            AuditWarning::SinkMetadataMissing { evidence, sink, .. } => write!(
                f,
                "SINK_METADATA_MISSING: {evidence}: sink '{sink}' treated as plain"
            ),
        }
    }
}

/// Complete entity set of one audit run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditOutcome {
    pub contract_version: String,
    /// Scan order.
    pub invocations: Vec<ApiInvocation>,
    pub bindings: BTreeMap<InvocationId, Binding>,
    /// Every invocation has an entry, possibly empty.
    pub discrepancies: BTreeMap<InvocationId, Vec<Discrepancy>>,
    pub findings: Vec<SensitiveDataFinding>,
    pub decisions: Vec<ConsolidationDecision>,
    pub coverage: Coverage,
    pub warnings: Vec<AuditWarning>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub invocations: usize,
    pub discrepancies: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
    pub findings: usize,
    pub plain_findings: usize,
    pub decisions: usize,
    pub warnings: usize,
}

impl AuditOutcome {
    /// Discrepancies flattened in scan order of their invocations.
    pub fn all_discrepancies(&self) -> Vec<&Discrepancy> {
        self.invocations
            .iter()
            .filter_map(|inv| self.discrepancies.get(&inv.id))
            .flatten()
            .collect()
    }

    pub fn summary(&self) -> AuditSummary {
        let all = self.all_discrepancies();
        let count = |s: Severity| all.iter().filter(|d| d.severity == s).count();
        AuditSummary {
            invocations: self.invocations.len(),
            discrepancies: all.len(),
            critical: count(Severity::Critical),
            warning: count(Severity::Warning),
            info: count(Severity::Info),
            findings: self.findings.len(),
            plain_findings: self
                .findings
                .iter()
                .filter(|f| f.handling_observed == apx_schemas::Handling::Plain)
                .count(),
            decisions: self.decisions.len(),
            warnings: self.warnings.len(),
        }
    }

    /// Move one discrepancy forward. Returns the state it left.
    pub fn transition_discrepancy(
        &mut self,
        id: DiscrepancyId,
        to: DiscrepancyStatus,
    ) -> Result<DiscrepancyStatus, ReviewError> {
        let d = self
            .discrepancies
            .values_mut()
            .flatten()
            .find(|d| d.id == id)
            .ok_or_else(|| ReviewError::NotFound {
                entity: EntityKind::Discrepancy,
                id: id.to_string(),
            })?;
        let from = d.status;
        d.transition(to)?;
        Ok(from)
    }

    /// Move one consolidation decision forward. Returns the state it left.
    pub fn transition_decision(
        &mut self,
        id: DecisionId,
        to: DecisionState,
    ) -> Result<DecisionState, ReviewError> {
        let d = self
            .decisions
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| ReviewError::NotFound {
                entity: EntityKind::Decision,
                id: id.to_string(),
            })?;
        let from = d.state;
        d.transition(to)?;
        Ok(from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    NotFound { entity: EntityKind, id: String },
    Transition(TransitionError),
}

impl From<TransitionError> for ReviewError {
    fn from(e: TransitionError) -> Self {
        ReviewError::Transition(e)
    }
}

impl fmt::Display for ReviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewError::NotFound { entity, id } => {
                write!(f, "REVIEW_NOT_FOUND: no {} with id {id}", entity.as_str())
            }
            ReviewError::Transition(e) => write!(f, "REVIEW_ILLEGAL_TRANSITION: {e}"),
        }
    }
}

impl std::error::Error for ReviewError {}
