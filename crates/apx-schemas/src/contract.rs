use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::invocation::{Method, Transport};
use crate::symbol::SymbolFormat;

/// Lookup key into the reference contract. Unique per contract document.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContractKey {
    pub target: String,
    pub transport: Transport,
    pub method: Method,
}

impl ContractKey {
    pub fn new(target: impl Into<String>, transport: Transport, method: Method) -> Self {
        Self {
            target: target.into(),
            transport,
            method,
        }
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.transport, self.method, self.target)
    }
}

/// Named signing rule: the headers a signed request must carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningRule {
    pub name: String,
    pub required_headers: Vec<String>,
}

impl SigningRule {
    pub fn unsigned() -> Self {
        Self {
            name: "none".to_string(),
            required_headers: Vec::new(),
        }
    }

    pub fn is_unsigned(&self) -> bool {
        self.required_headers.is_empty()
    }
}

/// Logical use case shared by one or more entries (e.g. `ticker` over REST and WS).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCase {
    pub name: String,
    /// Live/streaming use cases are designated to WS.
    pub streaming: bool,
    /// Serving this use case over the wrong transport trips exchange rate limits.
    pub rate_limited: bool,
}

impl UseCase {
    pub fn designated_transport(&self) -> Transport {
        if self.streaming {
            Transport::Ws
        } else {
            Transport::Rest
        }
    }
}

/// Canonical definition for one topic/path. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEntry {
    pub target: String,
    pub transport: Transport,
    pub method: Method,
    pub use_case: String,
    pub required_fields: BTreeSet<String>,
    pub optional_fields: BTreeSet<String>,
    /// field -> allowed values
    pub enums: BTreeMap<String, BTreeSet<String>>,
    pub signing_rule: SigningRule,
    pub symbol_format_required: SymbolFormat,
}

impl ContractEntry {
    pub fn key(&self) -> ContractKey {
        ContractKey::new(self.target.clone(), self.transport, self.method)
    }

    pub fn declares_field(&self, name: &str) -> bool {
        self.required_fields.contains(name) || self.optional_fields.contains(name)
    }
}
