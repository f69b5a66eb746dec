use std::fmt;

use apx_schemas::symbol::{self, SymbolFormat};
use apx_schemas::{
    invocation_id, ApiInvocation, FieldObservation, InvocationId, Method, SourceLocation,
    TargetResolution, Transport, UNRESOLVED_TARGET,
};
use serde::{Deserialize, Serialize};

use crate::pattern::{CallPattern, CompiledSink, ExtractOptions, PatternError};
use crate::resolve::{Resolved, Resolver};
use crate::site::{observe, statement_end, trailing_args, LineIndex, SiteRules};
use crate::unit::SourceUnit;

/// A call site whose target could not be resolved statically. The invocation
/// is still emitted with target `<unresolved>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedTargetWarning {
    pub invocation_id: InvocationId,
    pub location: SourceLocation,
    /// Target expression as written.
    pub raw: String,
    pub pattern: String,
}

impl fmt::Display for UnresolvedTargetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UNRESOLVED_TARGET: {} ({}) could not be resolved: {}",
            self.location, self.pattern, self.raw
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub invocations: Vec<ApiInvocation>,
    pub warnings: Vec<UnresolvedTargetWarning>,
}

impl Extraction {
    pub fn extend(&mut self, other: Extraction) {
        self.invocations.extend(other.invocations);
        self.warnings.extend(other.warnings);
    }
}

/// Reassemble per-unit extractions produced out of order (parallel workers)
/// into inventory order.
pub fn merge_ordered(mut parts: Vec<(usize, Extraction)>) -> Extraction {
    parts.sort_by_key(|(index, _)| *index);
    let mut out = Extraction::default();
    for (_, part) in parts {
        out.extend(part);
    }
    out
}

struct RawMatch {
    start: usize,
    end: usize,
    pattern: usize,
    method: Option<String>,
    /// Target literal and the offset just past its closing quote.
    target: Option<(String, usize)>,
    ident: Option<String>,
}

/// Compiled extractor. Build once, share across workers.
pub struct Extractor {
    patterns: Vec<CallPattern>,
    sinks: Vec<CompiledSink>,
    resolver: Resolver,
    rules: SiteRules,
    window_lines: usize,
}

impl Extractor {
    pub fn new(options: ExtractOptions) -> Result<Self, PatternError> {
        let patterns = options
            .patterns
            .iter()
            .map(CallPattern::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let sinks = options
            .sink_patterns
            .iter()
            .map(CompiledSink::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let rules = SiteRules::new(&options)?;
        let resolver = Resolver::new(options.bindings.clone())?;
        Ok(Self {
            patterns,
            sinks,
            resolver,
            rules,
            window_lines: options.window_lines.max(1),
        })
    }

    pub fn patterns(&self) -> &[CallPattern] {
        &self.patterns
    }

    /// Sequential extraction over a whole inventory, in inventory order.
    pub fn extract_all(&self, units: &[SourceUnit]) -> Extraction {
        let mut out = Extraction::default();
        for unit in units {
            out.extend(self.extract_unit(unit));
        }
        out
    }

    /// Extract every call site in one unit, in byte-offset order.
    pub fn extract_unit(&self, unit: &SourceUnit) -> Extraction {
        let text = unit.text.as_str();
        let index = LineIndex::new(text);
        let lines: Vec<&str> = text.lines().collect();
        let constants = self.resolver.constants(text);
        let urls = self.rules.urls(text);
        let environment = unit.environment();

        let mut out = Extraction::default();

        for (ordinal, m) in self.matches(text).into_iter().enumerate() {
            let pattern = &self.patterns[m.pattern];

            let method = pattern
                .method
                .or_else(|| m.method.as_deref().and_then(Method::parse))
                .filter(|method| method.is_valid_for(pattern.transport));

            let (line, column) = index.position(m.start);
            let location = SourceLocation::new(unit.path.clone(), line, column);
            let id = invocation_id(&location, ordinal);

            let window_end = statement_end(text, m.start, m.end, self.window_lines);
            let window = &text[m.start..window_end.max(m.end)];

            let resolved = match (&m.target, &m.ident) {
                (Some((raw, after)), _) => {
                    let tail = &text[*after..window_end.max(*after)];
                    let positional = trailing_args(tail);
                    let concat = self.rules.concat_ident(tail);
                    self.resolver
                        .resolve_template(raw, &positional, concat, &constants)
                }
                (None, Some(ident)) => self.resolver.resolve_ident(ident, &constants),
                (None, None) => Resolved::Unresolved {
                    raw: String::new(),
                },
            };

            // A method group that captured no usable method leaves the call
            // site unmappable; it is kept with the capture as its raw target.
            let (method, resolved) = match method {
                Some(method) => (method, resolved),
                None => {
                    let captured = m.method.as_deref().unwrap_or_default();
                    let written = match (&m.target, &m.ident) {
                        (Some((raw, _)), _) => raw.as_str(),
                        (None, Some(ident)) => ident.as_str(),
                        (None, None) => "",
                    };
                    let raw = format!("{captured} {written}").trim().to_string();
                    (fallback_method(pattern.transport), Resolved::Unresolved { raw })
                }
            };

            let mut payload_fields = self.rules.payload(window);

            let (target, resolution) = match resolved {
                Resolved::Static(t) => (t, TargetResolution::Static),
                Resolved::Template { template, target } => {
                    (target, TargetResolution::Template { template })
                }
                Resolved::Unresolved { raw } => {
                    out.warnings.push(UnresolvedTargetWarning {
                        invocation_id: id,
                        location: location.clone(),
                        raw: raw.clone(),
                        pattern: pattern.name.clone(),
                    });
                    (UNRESOLVED_TARGET.to_string(), TargetResolution::Unresolved { raw })
                }
            };

            let target = match pattern.transport {
                Transport::Rest => split_query(&target, &mut payload_fields),
                Transport::Ws => target,
            };

            let symbol_format = match symbol::observed_format(&target) {
                SymbolFormat::Unknown => payload_fields
                    .values()
                    .filter_map(|f| f.value.as_deref())
                    .map(symbol::detect)
                    .find(|f| *f != SymbolFormat::Unknown)
                    .unwrap_or(SymbolFormat::Unknown),
                fmt => fmt,
            };

            let first_line = index.line_of(m.start);
            let last_line = index.line_of(window_end.saturating_sub(1).max(m.start));
            let comments = self.rules.preceding_comments(&lines, first_line);

            out.invocations.push(ApiInvocation {
                id,
                target,
                method,
                transport: pattern.transport,
                base_url_class: self.rules.base_url_class(&urls, m.start, pattern.transport),
                declared_environment: environment,
                payload_fields,
                headers: self.rules.headers(window),
                symbol_format,
                source_location: location,
                purpose: self.rules.purpose(&lines, first_line, &comments),
                fallback_rationale: self.rules.fallback(window, &comments),
                resolution,
                emissions: self.rules.emissions(
                    &unit.path,
                    &lines,
                    first_line,
                    last_line,
                    &self.sinks,
                ),
                pattern: pattern.name.clone(),
            });
        }

        out
    }

    /// All pattern matches, ordered by offset then pattern order, with
    /// overlapping matches dropped in favour of the earlier one. A WS match
    /// whose target opens a list literal yields one match per topic literal.
    fn matches(&self, text: &str) -> Vec<RawMatch> {
        let mut all = Vec::new();
        for (pi, pattern) in self.patterns.iter().enumerate() {
            for caps in pattern.regex.captures_iter(text) {
                let Some(whole) = caps.get(0) else { continue };
                let target = caps.name("target").map(|t| {
                    // The closing quote follows the group.
                    let after = (t.end() + 1).min(text.len());
                    (t.as_str().to_string(), after)
                });
                all.push(RawMatch {
                    start: whole.start(),
                    end: whole.end(),
                    pattern: pi,
                    method: caps.name("method").map(|m| m.as_str().to_string()),
                    target,
                    ident: caps.name("ident").map(|m| m.as_str().to_string()),
                });
            }
        }
        all.sort_by_key(|m| (m.start, m.pattern));

        let mut kept: Vec<RawMatch> = Vec::with_capacity(all.len());
        let mut last_end = 0usize;
        for m in all {
            if !kept.is_empty() && m.start < last_end {
                continue;
            }
            last_end = m.end;
            let siblings = match self.patterns[m.pattern].transport {
                Transport::Ws => list_siblings(text, &m),
                Transport::Rest => Vec::new(),
            };
            if let Some(last) = siblings.last() {
                last_end = last.end;
            }
            kept.push(m);
            kept.extend(siblings);
        }
        kept
    }
}

/// The string literals following `m`'s target inside the same `[...]` list,
/// each as its own match anchored at its opening quote.
fn list_siblings(text: &str, m: &RawMatch) -> Vec<RawMatch> {
    let Some((raw, after)) = &m.target else {
        return Vec::new();
    };
    // Opening quote, optional string prefix, then whitespace back to `[`.
    let open = after.saturating_sub(raw.len() + 2);
    let before = text[m.start..open.max(m.start)]
        .trim_end_matches(['f', 'r', 'b'])
        .trim_end();
    if !before.ends_with('[') {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut pos = *after;
    loop {
        let rest = &text[pos..];
        let Some(next) = rest.trim_start().strip_prefix(',') else {
            break;
        };
        let next = next.trim_start();
        let start = text.len() - next.len();
        let body = next.trim_start_matches(['f', 'r', 'b']);
        let quote_at = text.len() - body.len();
        let Some(quote) = body.chars().next().filter(|c| matches!(*c, '"' | '\'' | '`')) else {
            break;
        };
        let content = &body[1..];
        let Some(len) = content.find(|c: char| c == quote || c == '\n') else {
            break;
        };
        if len == 0 || !content[len..].starts_with(quote) {
            break;
        }
        let end = quote_at + 1 + len + 1;
        out.push(RawMatch {
            start,
            end,
            pattern: m.pattern,
            method: m.method.clone(),
            target: Some((content[..len].to_string(), end)),
            ident: None,
        });
        pos = end;
    }
    out
}

/// Stand-in method for a call site whose captured method is unusable.
fn fallback_method(transport: Transport) -> Method {
    match transport {
        Transport::Rest => Method::Get,
        Transport::Ws => Method::Subscribe,
    }
}

/// Move a REST target's query string into payload fields; returns the path.
fn split_query(
    target: &str,
    payload: &mut std::collections::BTreeMap<String, FieldObservation>,
) -> String {
    let Some((path, query)) = target.split_once('?') else {
        return target.to_string();
    };
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key.is_empty() {
            continue;
        }
        let observed = if value.is_empty() || value.contains('{') {
            FieldObservation::expr()
        } else if value.parse::<f64>().is_ok() {
            FieldObservation::literal("number", value)
        } else {
            observe(&format!("\"{value}\""))
        };
        payload.entry(key.to_string()).or_insert(observed);
    }
    path.to_string()
}
