use std::collections::BTreeMap;

use apx_schemas::{Method, SinkLocation, Transport};
use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    InvalidRegex { name: String, message: String },
    /// Call patterns need a `target` or `ident` named group.
    MissingTargetGroup { name: String },
    /// No fixed method and no `method` named group.
    MissingMethod { name: String },
    UnknownTransport { name: String, raw: String },
    UnknownMethod { name: String, raw: String },
}

impl std::fmt::Display for PatternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRegex { name, message } => {
                write!(f, "pattern '{name}' has an invalid regex: {message}")
            }
            Self::MissingTargetGroup { name } => write!(
                f,
                "pattern '{name}' defines neither a `target` nor an `ident` named group"
            ),
            Self::MissingMethod { name } => write!(
                f,
                "pattern '{name}' has no fixed method and no `method` named group"
            ),
            Self::UnknownTransport { name, raw } => {
                write!(f, "pattern '{name}' has unrecognised transport '{raw}'")
            }
            Self::UnknownMethod { name, raw } => {
                write!(f, "pattern '{name}' has unrecognised method '{raw}'")
            }
        }
    }
}

impl std::error::Error for PatternError {}

// ---------------------------------------------------------------------------
// Specs (configuration-facing) and compiled forms
// ---------------------------------------------------------------------------

/// A known call-construction pattern as written in configuration.
///
/// The regex must define a `target` group (literal path/topic, may contain
/// `{name}` / `${name}` / `{}` placeholders) or an `ident` group (a constant
/// name the target is read from). The method is fixed here or captured by a
/// `method` group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub name: String,
    pub regex: String,
    pub transport: String,
    #[serde(default)]
    pub method: Option<String>,
}

/// A statement that sends data to a logging / persistence / response sink.
/// A `sink` named group, when present, names the sink; otherwise `name` does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkPattern {
    pub name: String,
    pub regex: String,
    pub kind: SinkLocation,
}

#[derive(Debug, Clone)]
pub struct CallPattern {
    pub name: String,
    pub regex: Regex,
    pub transport: Transport,
    /// `None` means "read from the `method` group".
    pub method: Option<Method>,
}

impl CallPattern {
    pub fn compile(spec: &PatternSpec) -> Result<Self, PatternError> {
        let regex = Regex::new(&spec.regex).map_err(|e| PatternError::InvalidRegex {
            name: spec.name.clone(),
            message: e.to_string(),
        })?;

        let groups: Vec<&str> = regex.capture_names().flatten().collect();
        if !groups.contains(&"target") && !groups.contains(&"ident") {
            return Err(PatternError::MissingTargetGroup {
                name: spec.name.clone(),
            });
        }

        let transport =
            Transport::parse(&spec.transport).ok_or_else(|| PatternError::UnknownTransport {
                name: spec.name.clone(),
                raw: spec.transport.clone(),
            })?;

        let method = match spec.method.as_deref() {
            Some(raw) => Some(Method::parse(raw).ok_or_else(|| PatternError::UnknownMethod {
                name: spec.name.clone(),
                raw: raw.to_string(),
            })?),
            None => {
                if !groups.contains(&"method") {
                    return Err(PatternError::MissingMethod {
                        name: spec.name.clone(),
                    });
                }
                None
            }
        };

        Ok(Self {
            name: spec.name.clone(),
            regex,
            transport,
            method,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledSink {
    pub name: String,
    pub regex: Regex,
    pub kind: SinkLocation,
}

impl CompiledSink {
    pub(crate) fn compile(spec: &SinkPattern) -> Result<Self, PatternError> {
        let regex = Regex::new(&spec.regex).map_err(|e| PatternError::InvalidRegex {
            name: spec.name.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            name: spec.name.clone(),
            regex,
            kind: spec.kind,
        })
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    pub patterns: Vec<PatternSpec>,
    pub sink_patterns: Vec<SinkPattern>,
    /// Known static values for template placeholders (`symbol` -> `BTCUSDT`).
    pub bindings: BTreeMap<String, String>,
    /// Substrings that mark a URL literal as testnet.
    pub testnet_markers: Vec<String>,
    /// Header names recognised besides the `X-*` family.
    pub header_names: Vec<String>,
    /// Message-envelope keys that are not payload fields.
    pub envelope_keys: Vec<String>,
    /// Keyword arguments that carry containers, not payload fields.
    pub container_kwargs: Vec<String>,
    /// Cap on the call-site window, in lines.
    pub window_lines: usize,
    /// Lines after the call-site window searched for sink emissions.
    pub emission_lookahead: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
            sink_patterns: default_sink_patterns(),
            bindings: BTreeMap::new(),
            testnet_markers: vec!["testnet".to_string(), "sandbox".to_string()],
            header_names: vec![
                "Authorization".to_string(),
                "Content-Type".to_string(),
                "Api-Key".to_string(),
            ],
            envelope_keys: vec!["op".to_string(), "args".to_string(), "req_id".to_string()],
            container_kwargs: [
                "params", "json", "data", "headers", "timeout", "body", "auth", "url", "verify",
                "method",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            window_lines: 12,
            emission_lookahead: 6,
        }
    }
}

fn spec(name: &str, regex: &str, transport: &str, method: Option<&str>) -> PatternSpec {
    PatternSpec {
        name: name.to_string(),
        regex: regex.to_string(),
        transport: transport.to_string(),
        method: method.map(str::to_string),
    }
}

/// Call-construction patterns for the common client shapes: HTTP verb calls,
/// generic `request(METHOD, path)`, WS `subscribe`/`unsubscribe` calls, WS
/// `{"op": ..., "args": [...]}` messages, and verb calls on a path constant.
pub fn default_patterns() -> Vec<PatternSpec> {
    vec![
        spec(
            "rest_verb_call",
            r#"\.(?P<method>get|post|put|delete)\(\s*(?:&?format!\(\s*)?[frb]?["'`](?P<target>/[^"'`\n]*)["'`]"#,
            "rest",
            None,
        ),
        spec(
            "rest_request_call",
            r#"\brequest\(\s*["'](?P<method>(?i:get|post|put|delete))["']\s*,\s*(?:&?format!\(\s*)?[frb]?["'`](?P<target>/[^"'`\n]*)["'`]"#,
            "rest",
            None,
        ),
        spec(
            "ws_subscribe_call",
            r#"\.(?P<method>subscribe|unsubscribe)\(\s*(?:\[\s*)?(?:&?format!\(\s*)?[frb]?["'`](?P<target>[A-Za-z$\{][^"'`\n]*)["'`]"#,
            "ws",
            None,
        ),
        spec(
            "ws_op_message",
            r#"["']op["']\s*:\s*["'](?P<method>subscribe|unsubscribe)["']\s*,\s*["']args["']\s*:\s*\[\s*[frb]?["'`](?P<target>[^"'`\n]+)["'`]"#,
            "ws",
            None,
        ),
        spec(
            "rest_const_call",
            r#"\.(?P<method>get|post|put|delete)\(\s*(?P<ident>[A-Z][A-Z0-9_]*)\s*[,)]"#,
            "rest",
            None,
        ),
    ]
}

fn sink(name: &str, regex: &str, kind: SinkLocation) -> SinkPattern {
    SinkPattern {
        name: name.to_string(),
        regex: regex.to_string(),
        kind,
    }
}

pub fn default_sink_patterns() -> Vec<SinkPattern> {
    vec![
        sink(
            "logger",
            r"\b(?P<sink>logger|logging|log|tracing)\s*(?:\.|::)\s*(?:debug|info|warn|warning|error|exception|critical|trace)!?\s*\(",
            SinkLocation::Log,
        ),
        sink(
            "stdout",
            r"\b(?P<sink>println|eprintln|print)!?\s*\(",
            SinkLocation::Log,
        ),
        sink(
            "console",
            r"\b(?P<sink>console)\.(?:log|error|warn|info)\s*\(",
            SinkLocation::Log,
        ),
        sink(
            "state",
            r"\b(?P<sink>json\.dump|pickle\.dump|save_state|write_state|persist|to_csv|fs::write)\s*\(",
            SinkLocation::PersistedState,
        ),
        sink(
            "response",
            r"\b(?P<sink>jsonify|Json|HttpResponse|res\.json|res\.send)\s*\(",
            SinkLocation::ResponseEcho,
        ),
        sink(
            "return",
            r"^\s*(?P<sink>return)\s+[^\s;]",
            SinkLocation::ResponseEcho,
        ),
    ]
}
