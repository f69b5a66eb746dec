use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::findings::SinkLocation;
use crate::ids::InvocationId;
use crate::symbol::SymbolFormat;

/// Sentinel target for call sites whose dynamically-built target could not be
/// resolved to a static form. Such invocations are kept and flagged, never dropped.
pub const UNRESOLVED_TARGET: &str = "<unresolved>";

// ---------------------------------------------------------------------------
// Transport / method / environment
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Rest,
    Ws,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Rest => "rest",
            Transport::Ws => "ws",
        }
    }

    /// Case-insensitive parse. Accepts `rest`/`http` and `ws`/`websocket`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rest" | "http" | "https" => Some(Transport::Rest),
            "ws" | "wss" | "websocket" => Some(Transport::Ws),
            _ => None,
        }
    }

    /// Symbol format the exchange requires on this transport.
    pub fn symbol_format(&self) -> SymbolFormat {
        match self {
            Transport::Rest => SymbolFormat::Dash,
            Transport::Ws => SymbolFormat::Concat,
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP verb for REST call sites, topic operation kind for WS call sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Subscribe,
    Unsubscribe,
    Request,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Subscribe => "SUBSCRIBE",
            Method::Unsubscribe => "UNSUBSCRIBE",
            Method::Request => "REQUEST",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            "SUBSCRIBE" | "SUB" => Some(Method::Subscribe),
            "UNSUBSCRIBE" | "UNSUB" => Some(Method::Unsubscribe),
            "REQUEST" | "REQ" => Some(Method::Request),
            _ => None,
        }
    }

    /// HTTP verbs only make sense over REST; topic kinds only over WS.
    pub fn is_valid_for(&self, transport: Transport) -> bool {
        match transport {
            Transport::Rest => matches!(
                self,
                Method::Get | Method::Post | Method::Put | Method::Delete
            ),
            Transport::Ws => matches!(
                self,
                Method::Subscribe | Method::Unsubscribe | Method::Request
            ),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseUrlClass {
    Testnet,
    Mainnet,
}

impl BaseUrlClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseUrlClass::Testnet => "testnet",
            BaseUrlClass::Mainnet => "mainnet",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "testnet" | "sandbox" | "test" => Some(BaseUrlClass::Testnet),
            "mainnet" | "production" | "prod" | "live" => Some(BaseUrlClass::Mainnet),
            _ => None,
        }
    }
}

impl fmt::Display for BaseUrlClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Call-site metadata
// ---------------------------------------------------------------------------

/// Opaque locator for a call site or a piece of evidence.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub path: String,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

impl SourceLocation {
    pub fn new(path: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            path: path.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path, self.line, self.column)
    }
}

/// One payload field as observed at the call site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldObservation {
    /// `string` | `number` | `bool` | `expr`
    pub declared_type: String,
    /// Literal value when statically determinable.
    pub value: Option<String>,
}

impl FieldObservation {
    pub fn literal(declared_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            declared_type: declared_type.into(),
            value: Some(value.into()),
        }
    }

    pub fn expr() -> Self {
        Self {
            declared_type: "expr".to_string(),
            value: None,
        }
    }
}

/// A logging / persistence / response statement near a call site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emission {
    /// Sink name as matched (e.g. `logger`, `print`, `save_state`).
    pub sink: String,
    pub kind: SinkLocation,
    /// Raw statement text, used for data-type and redaction detection.
    pub text: String,
    pub evidence: SourceLocation,
}

/// How the invocation's target was obtained.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetResolution {
    /// Target was a literal.
    Static,
    /// Target was built from a template and resolved (fully or to a `{symbol}` template).
    Template { template: String },
    /// Target could not be resolved; `target` holds [`UNRESOLVED_TARGET`].
    Unresolved { raw: String },
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// One observed call site. Immutable after extraction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiInvocation {
    pub id: InvocationId,
    /// Topic (WS) or path (REST), as extracted.
    pub target: String,
    pub method: Method,
    pub transport: Transport,
    /// Environment implied by the base URL literal(s) reachable from the call site.
    pub base_url_class: Option<BaseUrlClass>,
    /// Environment the source location declares itself to run in.
    pub declared_environment: Option<BaseUrlClass>,
    pub payload_fields: BTreeMap<String, FieldObservation>,
    pub headers: BTreeSet<String>,
    pub symbol_format: SymbolFormat,
    pub source_location: SourceLocation,
    pub purpose: String,
    pub fallback_rationale: Option<String>,
    pub resolution: TargetResolution,
    pub emissions: Vec<Emission>,
    /// Name of the call-construction pattern that produced this record.
    pub pattern: String,
}

impl ApiInvocation {
    pub fn is_unresolved(&self) -> bool {
        matches!(self.resolution, TargetResolution::Unresolved { .. })
    }

    /// Unresolved invocations are surfaced for manual classification.
    pub fn needs_manual_review(&self) -> bool {
        self.is_unresolved()
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h.eq_ignore_ascii_case(name))
    }
}
