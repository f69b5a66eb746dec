//! Deterministic entity identifiers.
//!
//! Every id is a UUID v5 derived from the entity's identity fields under a
//! fixed namespace. No RNG: two runs over the same inventory and contract
//! produce the same ids, so reports diff cleanly across runs.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contract::ContractKey;
use crate::findings::{Category, DataType};
use crate::invocation::SourceLocation;

/// Namespace for all apx entity ids.
const APX_NAMESPACE: Uuid = Uuid::from_u128(0x6a70_785f_6175_6469_745f_6e73_0000_0001);

macro_rules! entity_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn parse(raw: &str) -> Option<Self> {
                Uuid::parse_str(raw.trim()).ok().map($name)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl $name {
            fn derive(parts: &[&str]) -> Self {
                let mut material = String::from($prefix);
                for p in parts {
                    // Unit separator keeps ("ab","c") and ("a","bc") distinct.
                    material.push('\u{1f}');
                    material.push_str(p);
                }
                $name(Uuid::new_v5(&APX_NAMESPACE, material.as_bytes()))
            }
        }
    };
}

entity_id!(InvocationId, "invocation");
entity_id!(DiscrepancyId, "discrepancy");
entity_id!(FindingId, "finding");
entity_id!(DecisionId, "decision");

/// Invocation id from its call-site location and its scan ordinal within the
/// source unit (two call sites can share a line).
pub fn invocation_id(location: &SourceLocation, ordinal: usize) -> InvocationId {
    InvocationId::derive(&[
        &location.path,
        &location.line.to_string(),
        &location.column.to_string(),
        &ordinal.to_string(),
    ])
}

pub fn discrepancy_id(
    invocation: InvocationId,
    category: Category,
    tag: &str,
    field: Option<&str>,
) -> DiscrepancyId {
    DiscrepancyId::derive(&[
        &invocation.to_string(),
        category.as_str(),
        tag,
        field.unwrap_or(""),
    ])
}

pub fn finding_id(
    invocation: InvocationId,
    data_type: DataType,
    evidence: &SourceLocation,
) -> FindingId {
    FindingId::derive(&[
        &invocation.to_string(),
        data_type.as_str(),
        &evidence.to_string(),
    ])
}

pub fn decision_id(key: &ContractKey) -> DecisionId {
    DecisionId::derive(&[&key.target, key.transport.as_str(), key.method.as_str()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_deterministic() {
        let loc = SourceLocation::new("src/client.py", 12, 5);
        assert_eq!(invocation_id(&loc, 0), invocation_id(&loc, 0));
        assert_ne!(invocation_id(&loc, 0), invocation_id(&loc, 1));
    }

    #[test]
    fn separator_prevents_concatenation_collisions() {
        let a = InvocationId::derive(&["ab", "c"]);
        let b = InvocationId::derive(&["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn id_display_parses_back() {
        let loc = SourceLocation::new("a.rs", 1, 1);
        let id = invocation_id(&loc, 0);
        assert_eq!(InvocationId::parse(&id.to_string()), Some(id));
    }
}
