//! Lifecycle state machines for discrepancies and consolidation decisions.
//!
//! # Discrepancy
//!
//! ```text
//! found ──► reviewed ──► remediated ──► verified (term.)
//! ```
//!
//! # Consolidation decision
//!
//! ```text
//!                              ┌──► accepted ──► implemented (term.)
//! identified ──► recommended ──┤
//!                              └──► rejected (term.)
//! ```
//!
//! # Invariants
//!
//! - Forward-only: a transition is legal only if it is an edge above.
//! - No skipping, no backward moves, no self-loops. Every illegal move returns
//!   [`TransitionError`] and leaves the state untouched.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscrepancyStatus {
    Found,
    Reviewed,
    Remediated,
    /// **Terminal.**
    Verified,
}

impl DiscrepancyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscrepancyStatus::Found => "found",
            DiscrepancyStatus::Reviewed => "reviewed",
            DiscrepancyStatus::Remediated => "remediated",
            DiscrepancyStatus::Verified => "verified",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "found" => Some(DiscrepancyStatus::Found),
            "reviewed" => Some(DiscrepancyStatus::Reviewed),
            "remediated" => Some(DiscrepancyStatus::Remediated),
            "verified" => Some(DiscrepancyStatus::Verified),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DiscrepancyStatus::Verified)
    }

    /// The single legal successor, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            DiscrepancyStatus::Found => Some(DiscrepancyStatus::Reviewed),
            DiscrepancyStatus::Reviewed => Some(DiscrepancyStatus::Remediated),
            DiscrepancyStatus::Remediated => Some(DiscrepancyStatus::Verified),
            DiscrepancyStatus::Verified => None,
        }
    }

    pub fn transition(self, to: Self) -> Result<Self, TransitionError> {
        if self.next() == Some(to) {
            Ok(to)
        } else {
            Err(TransitionError {
                entity: EntityKind::Discrepancy,
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }
}

impl fmt::Display for DiscrepancyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionState {
    Identified,
    Recommended,
    Accepted,
    /// **Terminal.**
    Rejected,
    /// **Terminal.**
    Implemented,
}

impl DecisionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionState::Identified => "identified",
            DecisionState::Recommended => "recommended",
            DecisionState::Accepted => "accepted",
            DecisionState::Rejected => "rejected",
            DecisionState::Implemented => "implemented",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "identified" => Some(DecisionState::Identified),
            "recommended" => Some(DecisionState::Recommended),
            "accepted" => Some(DecisionState::Accepted),
            "rejected" => Some(DecisionState::Rejected),
            "implemented" => Some(DecisionState::Implemented),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DecisionState::Rejected | DecisionState::Implemented)
    }

    pub fn transition(self, to: Self) -> Result<Self, TransitionError> {
        use DecisionState::*;

        match (self, to) {
            (Identified, Recommended)
            | (Recommended, Accepted)
            | (Recommended, Rejected)
            | (Accepted, Implemented) => Ok(to),
            _ => Err(TransitionError {
                entity: EntityKind::Decision,
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            }),
        }
    }
}

impl fmt::Display for DecisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Discrepancy,
    Decision,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Discrepancy => "discrepancy",
            EntityKind::Decision => "decision",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "discrepancy" => Some(EntityKind::Discrepancy),
            "decision" => Some(EntityKind::Decision),
            _ => None,
        }
    }
}

/// Returned when a lifecycle move is backward, skips a state, or leaves a
/// terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub entity: EntityKind,
    pub from: String,
    pub to: String,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "illegal {} transition: {} -> {}",
            self.entity.as_str(),
            self.from,
            self.to
        )
    }
}

impl std::error::Error for TransitionError {}
