use std::fmt;

use serde::{Deserialize, Serialize};

use crate::contract::ContractKey;
use crate::ids::{
    decision_id, discrepancy_id, finding_id, DecisionId, DiscrepancyId, FindingId, InvocationId,
};
use crate::invocation::SourceLocation;
use crate::lifecycle::{DecisionState, DiscrepancyStatus, TransitionError};

// ---------------------------------------------------------------------------
// Discrepancy
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Transport,
    PayloadShape,
    SigningAuth,
    DataSafety,
    Redundancy,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Transport => "transport",
            Category::PayloadShape => "payload_shape",
            Category::SigningAuth => "signing_auth",
            Category::DataSafety => "data_safety",
            Category::Redundancy => "redundancy",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered: `Info < Warning < Critical`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "info" => Some(Severity::Info),
            "warning" | "warn" => Some(Severity::Warning),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One divergence between an invocation and its contract entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub id: DiscrepancyId,
    pub invocation_id: InvocationId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub decision_id: Option<DecisionId>,
    pub category: Category,
    pub severity: Severity,
    /// Machine-readable sub-kind, e.g. `unmapped`, `missing_field`, `enum_violation`.
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub field: Option<String>,
    pub detail: String,
    pub remediation: String,
    pub status: DiscrepancyStatus,
}

impl Discrepancy {
    /// New discrepancy in `found`. The id is derived from its identity fields,
    /// so the same divergence on the same call site always gets the same id.
    pub fn new(
        invocation_id: InvocationId,
        category: Category,
        severity: Severity,
        tag: &str,
        field: Option<&str>,
        detail: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self {
            id: discrepancy_id(invocation_id, category, tag, field),
            invocation_id,
            decision_id: None,
            category,
            severity,
            tag: tag.to_string(),
            field: field.map(str::to_string),
            detail: detail.into(),
            remediation: remediation.into(),
            status: DiscrepancyStatus::Found,
        }
    }

    pub fn linked_to(mut self, decision: DecisionId) -> Self {
        self.decision_id = Some(decision);
        self
    }

    pub fn transition(&mut self, to: DiscrepancyStatus) -> Result<(), TransitionError> {
        self.status = self.status.transition(to)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sensitive data finding
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    ApiKey,
    Passphrase,
    Signature,
    WalletAddress,
    ClientOrderId,
}

impl DataType {
    pub const ALL: [DataType; 5] = [
        DataType::ApiKey,
        DataType::Passphrase,
        DataType::Signature,
        DataType::WalletAddress,
        DataType::ClientOrderId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::ApiKey => "api_key",
            DataType::Passphrase => "passphrase",
            DataType::Signature => "signature",
            DataType::WalletAddress => "wallet_address",
            DataType::ClientOrderId => "client_order_id",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a secret-bearing field ends up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SinkLocation {
    #[serde(rename = "log")]
    Log,
    #[serde(rename = "persisted-state")]
    PersistedState,
    #[serde(rename = "response-echo")]
    ResponseEcho,
}

impl SinkLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkLocation::Log => "log",
            SinkLocation::PersistedState => "persisted-state",
            SinkLocation::ResponseEcho => "response-echo",
        }
    }
}

impl fmt::Display for SinkLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handling {
    Redacted,
    Plain,
}

impl Handling {
    pub fn as_str(&self) -> &'static str {
        match self {
            Handling::Redacted => "redacted",
            Handling::Plain => "plain",
        }
    }
}

/// One detected exposure risk. Terminal once recorded; remediation is tracked
/// through the linked `data_safety` discrepancy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitiveDataFinding {
    pub id: FindingId,
    pub invocation_id: InvocationId,
    pub data_type: DataType,
    pub location: SinkLocation,
    pub handling_observed: Handling,
    pub evidence_location: SourceLocation,
    pub sink: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub discrepancy_id: Option<DiscrepancyId>,
}

impl SensitiveDataFinding {
    pub fn new(
        invocation_id: InvocationId,
        data_type: DataType,
        location: SinkLocation,
        handling_observed: Handling,
        evidence_location: SourceLocation,
        sink: impl Into<String>,
    ) -> Self {
        Self {
            id: finding_id(invocation_id, data_type, &evidence_location),
            invocation_id,
            data_type,
            location,
            handling_observed,
            evidence_location,
            sink: sink.into(),
            note: None,
            discrepancy_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Consolidation decision
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Consolidate,
    Retain,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Consolidate => "consolidate",
            Recommendation::Retain => "retain",
        }
    }
}

/// Recommendation for a contract target reached from two or more call sites.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationDecision {
    pub id: DecisionId,
    pub target_key: ContractKey,
    pub duplicate_count: usize,
    /// Members in scan order.
    pub members: Vec<InvocationId>,
    pub recommendation: Recommendation,
    pub rationale: String,
    pub state: DecisionState,
}

impl ConsolidationDecision {
    pub fn identified(
        target_key: ContractKey,
        members: Vec<InvocationId>,
        recommendation: Recommendation,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            id: decision_id(&target_key),
            duplicate_count: members.len(),
            target_key,
            members,
            recommendation,
            rationale: rationale.into(),
            state: DecisionState::Identified,
        }
    }

    pub fn transition(&mut self, to: DecisionState) -> Result<(), TransitionError> {
        self.state = self.state.transition(to)?;
        Ok(())
    }
}
