//! Call-site analysis: the statement window around a match and everything
//! read from it (payload, headers, base URL, purpose, fallback, emissions).

use std::collections::{BTreeMap, BTreeSet};

use apx_schemas::{BaseUrlClass, Emission, FieldObservation, SourceLocation, Transport};
use regex::Regex;

use crate::pattern::{CompiledSink, ExtractOptions, PatternError};
use crate::resolve::{compile, string_literal};

// ---------------------------------------------------------------------------
// Line index
// ---------------------------------------------------------------------------

/// Byte offset -> 1-based (line, column).
pub(crate) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    /// 0-based line containing `offset`.
    pub(crate) fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }

    pub(crate) fn position(&self, offset: usize) -> (u32, u32) {
        let line = self.line_of(offset);
        let col = offset - self.starts[line];
        (line as u32 + 1, col as u32 + 1)
    }
}

// ---------------------------------------------------------------------------
// Statement window
// ---------------------------------------------------------------------------

/// End offset (exclusive) of the statement that starts at `start`.
///
/// The window closes when bracket depth drops below zero, at a newline or `;`
/// at depth zero once past `match_end`, or after `window_lines` lines. Quoted
/// text does not affect depth.
pub(crate) fn statement_end(text: &str, start: usize, match_end: usize, window_lines: usize) -> usize {
    let bytes = text.as_bytes();
    let mut depth: i32 = 0;
    let mut lines = 1usize;
    let mut quote: Option<u8> = None;
    let mut i = start;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            } else if b == b'\n' && q != b'`' && q != b'"' {
                quote = None;
            }
        } else {
            match b {
                b'"' | b'\'' | b'`' => {
                    // A lone apostrophe in a Rust lifetime is not a quote.
                    if !(b == b'\'' && is_lifetime(bytes, i)) {
                        quote = Some(b);
                    }
                }
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => {
                    depth -= 1;
                    if depth < 0 {
                        return i;
                    }
                }
                b';' if depth == 0 && i >= match_end => return i,
                _ => {}
            }
        }
        if b == b'\n' {
            if depth == 0 && quote.is_none() && i >= match_end {
                return i;
            }
            lines += 1;
            if lines > window_lines {
                return i;
            }
        }
        i += 1;
    }
    bytes.len()
}

fn is_lifetime(bytes: &[u8], i: usize) -> bool {
    let prev_amp = i > 0 && bytes[i - 1] == b'&';
    let next_ident = bytes.get(i + 1).is_some_and(|c| c.is_ascii_alphabetic());
    let closes = bytes.get(i + 2).is_some_and(|c| *c == b'\'');
    prev_amp && next_ident && !closes
}

// ---------------------------------------------------------------------------
// Rules compiled once per extractor
// ---------------------------------------------------------------------------

pub(crate) struct SiteRules {
    dict_key_re: Regex,
    kwarg_re: Regex,
    tuple_re: Regex,
    header_re: Regex,
    url_re: Regex,
    comment_re: Regex,
    function_re: Regex,
    fallback_re: Regex,
    concat_re: Regex,
    header_names: Vec<String>,
    envelope_keys: BTreeSet<String>,
    container_kwargs: BTreeSet<String>,
    testnet_markers: Vec<String>,
    emission_lookahead: usize,
}

impl SiteRules {
    pub(crate) fn new(options: &ExtractOptions) -> Result<Self, PatternError> {
        Ok(Self {
            dict_key_re: compile(
                "dict_key",
                r#"["'](?P<key>[A-Za-z_][A-Za-z0-9_\-]*)["']\s*:\s*(?P<value>[^,}\]\n]+)"#,
            )?,
            kwarg_re: compile(
                "kwarg",
                r"[(,]\s*(?P<key>[A-Za-z_][A-Za-z0-9_]*)\s*=\s*(?P<value>[^,)=\n][^,)\n]*)",
            )?,
            tuple_re: compile(
                "tuple",
                r#"[\[,(]\s*\(\s*["'](?P<key>[A-Za-z_][A-Za-z0-9_]*)["']\s*,\s*(?P<value>[^)\n]+)\)"#,
            )?,
            header_re: compile("header", r#"["'](?P<h>[A-Za-z][A-Za-z0-9\-]*)["']"#)?,
            url_re: compile("url", r#"["'`](?P<url>(?:https?|wss?)://[^"'`\s]+)["'`]"#)?,
            comment_re: compile(
                "comment",
                r#"(?:^|\s)(?:#+|//+!?|/\*+|\*|"""|''')\s*(?P<c>.*?)\s*(?:\*/|"""|''')?\s*$"#,
            )?,
            function_re: compile(
                "function",
                r"^\s*(?:pub(?:\(crate\))?\s+)?(?:async\s+)?(?:def|fn|function)\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)",
            )?,
            fallback_re: compile("fallback", r"apx:fallback=(?P<text>.+?)\s*$")?,
            concat_re: compile("concat", r"^\s*\+\s*(?P<ident>[A-Za-z_][A-Za-z0-9_.]*)")?,
            header_names: options.header_names.clone(),
            envelope_keys: options.envelope_keys.iter().cloned().collect(),
            container_kwargs: options.container_kwargs.iter().cloned().collect(),
            testnet_markers: options
                .testnet_markers
                .iter()
                .map(|m| m.to_ascii_lowercase())
                .collect(),
            emission_lookahead: options.emission_lookahead,
        })
    }

    pub(crate) fn is_header_name(&self, s: &str) -> bool {
        let is_x = s.len() > 2 && (s.starts_with("X-") || s.starts_with("x-"));
        is_x || self.header_names.iter().any(|h| h.eq_ignore_ascii_case(s))
    }

    // --- target tail -------------------------------------------------------

    /// Identifier appended with `+` right after the target literal.
    pub(crate) fn concat_ident<'a>(&self, tail: &'a str) -> Option<&'a str> {
        self.concat_re
            .captures(tail)
            .and_then(|c| c.name("ident"))
            .map(|m| m.as_str())
    }

    // --- payload -----------------------------------------------------------

    pub(crate) fn payload(&self, window: &str) -> BTreeMap<String, FieldObservation> {
        let mut fields = BTreeMap::new();
        let add = |key: &str, value: &str, fields: &mut BTreeMap<String, FieldObservation>| {
            if self.envelope_keys.contains(key) || self.is_header_name(key) {
                return;
            }
            fields
                .entry(key.to_string())
                .or_insert_with(|| observe(value));
        };

        for caps in self.dict_key_re.captures_iter(window) {
            if let (Some(k), Some(v)) = (caps.name("key"), caps.name("value")) {
                add(k.as_str(), v.as_str(), &mut fields);
            }
        }
        for caps in self.tuple_re.captures_iter(window) {
            if let (Some(k), Some(v)) = (caps.name("key"), caps.name("value")) {
                add(k.as_str(), v.as_str(), &mut fields);
            }
        }
        for caps in self.kwarg_re.captures_iter(window) {
            if let (Some(k), Some(v)) = (caps.name("key"), caps.name("value")) {
                if self.container_kwargs.contains(k.as_str()) {
                    continue;
                }
                add(k.as_str(), v.as_str(), &mut fields);
            }
        }
        fields
    }

    pub(crate) fn headers(&self, window: &str) -> BTreeSet<String> {
        self.header_re
            .captures_iter(window)
            .filter_map(|c| c.name("h"))
            .map(|m| m.as_str())
            .filter(|h| self.is_header_name(h))
            .map(str::to_string)
            .collect()
    }

    // --- environment -------------------------------------------------------

    /// URL literals in the unit with their byte offsets.
    pub(crate) fn urls(&self, text: &str) -> Vec<(usize, String)> {
        self.url_re
            .captures_iter(text)
            .filter_map(|c| c.name("url"))
            .map(|m| (m.start(), m.as_str().to_string()))
            .collect()
    }

    /// Class of the URL literal nearest `offset` whose scheme fits the
    /// transport; any URL when none fits. `None` without URL literals.
    pub(crate) fn base_url_class(
        &self,
        urls: &[(usize, String)],
        offset: usize,
        transport: Transport,
    ) -> Option<BaseUrlClass> {
        let fits = |url: &str| {
            let lower = url.to_ascii_lowercase();
            match transport {
                Transport::Rest => lower.starts_with("http"),
                Transport::Ws => lower.starts_with("ws"),
            }
        };
        let nearest = |only_fitting: bool| {
            urls.iter()
                .filter(|(_, u)| !only_fitting || fits(u))
                .min_by_key(|(at, _)| at.abs_diff(offset))
                .map(|(_, u)| u.as_str())
        };
        let url = nearest(true).or_else(|| nearest(false))?;
        Some(self.classify_url(url))
    }

    pub(crate) fn classify_url(&self, url: &str) -> BaseUrlClass {
        let lower = url.to_ascii_lowercase();
        if self.testnet_markers.iter().any(|m| lower.contains(m.as_str())) {
            BaseUrlClass::Testnet
        } else {
            BaseUrlClass::Mainnet
        }
    }

    // --- purpose / fallback ------------------------------------------------

    pub(crate) fn comment_text(&self, line: &str) -> Option<String> {
        self.comment_re
            .captures(line)
            .and_then(|c| c.name("c"))
            .map(|m| m.as_str().trim().to_string())
    }

    fn is_comment_line(line: &str) -> bool {
        let t = line.trim_start();
        ["#", "//", "/*", "*", "\"\"\"", "'''"]
            .iter()
            .any(|p| t.starts_with(p))
    }

    /// Contiguous comment block directly above `line` (0-based), nearest first.
    pub(crate) fn preceding_comments(&self, lines: &[&str], line: usize) -> Vec<String> {
        let mut out = Vec::new();
        for l in lines[..line.min(lines.len())].iter().rev() {
            if !Self::is_comment_line(l) {
                break;
            }
            if let Some(c) = self.comment_text(l) {
                if !c.is_empty() {
                    out.push(c);
                }
            }
        }
        out
    }

    /// Nearest preceding comment that is not an `apx:` marker, else the
    /// enclosing function name, else empty.
    pub(crate) fn purpose(&self, lines: &[&str], line: usize, comments: &[String]) -> String {
        if let Some(c) = comments.iter().find(|c| !c.starts_with("apx:")) {
            return c.clone();
        }
        for l in lines[..line.min(lines.len())].iter().rev() {
            if let Some(name) = self.function_re.captures(l).and_then(|c| c.name("name")) {
                return name.as_str().to_string();
            }
        }
        String::new()
    }

    pub(crate) fn fallback(&self, window: &str, comments: &[String]) -> Option<String> {
        let window_comments: Vec<String> = window
            .lines()
            .filter_map(|l| self.comment_text(l))
            .collect();
        let all = window_comments.iter().chain(comments.iter());

        let mut plain: Option<String> = None;
        for c in all {
            if let Some(t) = self.fallback_re.captures(c).and_then(|m| m.name("text")) {
                return Some(t.as_str().trim().to_string());
            }
            if plain.is_none() && c.to_ascii_lowercase().contains("fallback") {
                plain = Some(c.clone());
            }
        }
        plain
    }

    // --- emissions ---------------------------------------------------------

    /// Sink statements on lines `first..=last + lookahead` (0-based). One
    /// emission per line; the first matching sink pattern wins.
    pub(crate) fn emissions(
        &self,
        path: &str,
        lines: &[&str],
        first: usize,
        last: usize,
        sinks: &[CompiledSink],
    ) -> Vec<Emission> {
        let end = (last + self.emission_lookahead).min(lines.len().saturating_sub(1));
        let mut out = Vec::new();
        for (idx, line) in lines.iter().enumerate().take(end + 1).skip(first) {
            if Self::is_comment_line(line) {
                continue;
            }
            for sink in sinks {
                let Some(caps) = sink.regex.captures(line) else {
                    continue;
                };
                let at = caps.name("sink").or_else(|| caps.get(0));
                let column = at.map(|m| m.start()).unwrap_or(0);
                let name = caps
                    .name("sink")
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| sink.name.clone());
                out.push(Emission {
                    sink: name,
                    kind: sink.kind,
                    text: line.trim().to_string(),
                    evidence: SourceLocation::new(path, idx as u32 + 1, column as u32 + 1),
                });
                break;
            }
        }
        out
    }
}

/// Type and literal value of an observed field value.
pub(crate) fn observe(raw: &str) -> FieldObservation {
    let v = raw.trim().trim_end_matches([',', ';']).trim();
    if let Some(lit) = string_literal(v) {
        if lit.contains('{') && (v.starts_with('f') || v.starts_with('`')) {
            return FieldObservation::expr();
        }
        return FieldObservation::literal("string", lit);
    }
    match v {
        "true" | "false" | "True" | "False" => {
            return FieldObservation::literal("bool", v.to_ascii_lowercase())
        }
        _ => {}
    }
    if !v.is_empty() && v.parse::<f64>().is_ok() {
        return FieldObservation::literal("number", v);
    }
    FieldObservation::expr()
}

/// Positional arguments after a template literal: `, a, b)` for `format!`
/// and `.format(a, b)` for Python. Stops at the closing parenthesis.
pub(crate) fn trailing_args(tail: &str) -> Vec<String> {
    let rest = tail.trim_start();
    let rest = if let Some(r) = rest.strip_prefix(".format(") {
        r
    } else if let Some(r) = rest.strip_prefix(',') {
        r
    } else {
        return Vec::new();
    };

    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in rest.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    args.retain(|a| !a.is_empty() && !a.contains('='));
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> SiteRules {
        SiteRules::new(&ExtractOptions::default()).unwrap()
    }

    #[test]
    fn window_stops_at_statement_end() {
        let text = "r = s.post(\n  \"/v3/order\",\n  json={\"a\": 1},\n)\nnext_line()\n";
        let start = text.find(".post").unwrap();
        let end = statement_end(text, start, start + 6, 12);
        assert!(text[start..end].contains("json="));
        assert!(!text[start..end].contains("next_line"));
    }

    #[test]
    fn window_caps_at_line_limit() {
        let text = "s.get(\n1,\n2,\n3,\n4,\n";
        let end = statement_end(text, 0, 5, 2);
        assert_eq!(&text[..end], "s.get(\n1,");
    }

    #[test]
    fn payload_from_dicts_kwargs_and_tuples() {
        let r = rules();
        let w = r#".post("/v3/order", json={"symbol": "BTC-USDT", "qty": 1.5, "reduce": true}, side=side)"#;
        let p = r.payload(w);
        assert_eq!(p["symbol"], FieldObservation::literal("string", "BTC-USDT"));
        assert_eq!(p["qty"], FieldObservation::literal("number", "1.5"));
        assert_eq!(p["reduce"], FieldObservation::literal("bool", "true"));
        assert_eq!(p["side"], FieldObservation::expr());
        assert!(!p.contains_key("json"));

        let w = r#".get("/v3/depth", &[("symbol", sym), ("limit", "5")])"#;
        let p = r.payload(w);
        assert_eq!(p["symbol"], FieldObservation::expr());
        assert_eq!(p["limit"], FieldObservation::literal("string", "5"));
    }

    #[test]
    fn header_literals_are_not_payload() {
        let r = rules();
        let w = r#".get("/v3/account", headers={"X-Api-Key": key, "Authorization": tok})"#;
        assert!(r.payload(w).is_empty());
        let h = r.headers(w);
        assert!(h.contains("X-Api-Key"));
        assert!(h.contains("Authorization"));
    }

    #[test]
    fn url_class_prefers_matching_scheme() {
        let r = rules();
        let text = r#"REST = "https://api.exchange.io"
WS = "wss://stream.testnet.exchange.io"
"#;
        let urls = r.urls(text);
        assert_eq!(
            r.base_url_class(&urls, 0, Transport::Ws),
            Some(BaseUrlClass::Testnet)
        );
        assert_eq!(
            r.base_url_class(&urls, 0, Transport::Rest),
            Some(BaseUrlClass::Mainnet)
        );
        assert_eq!(r.base_url_class(&[], 0, Transport::Rest), None);
    }

    #[test]
    fn purpose_and_fallback_from_comments() {
        let r = rules();
        let lines = vec![
            "def refresh_book():",
            "    # apx:fallback=WS feed drops during maintenance",
            "    # poll the order book",
            "    s.get(\"/v3/depth\")",
        ];
        let comments = r.preceding_comments(&lines, 3);
        assert_eq!(r.purpose(&lines, 3, &comments), "poll the order book");
        assert_eq!(
            r.fallback(lines[3], &comments).as_deref(),
            Some("WS feed drops during maintenance")
        );

        let lines = vec!["fn load() {", "    s.get(\"/v3/x\");"];
        assert_eq!(r.purpose(&lines, 1, &[]), "load");
    }

    #[test]
    fn trailing_args_forms() {
        assert_eq!(trailing_args(", sym)"), vec!["sym"]);
        assert_eq!(trailing_args(".format(a, b.c)"), vec!["a", "b.c"]);
        assert_eq!(trailing_args(")"), Vec::<String>::new());
    }

    #[test]
    fn emission_lines_are_found() {
        let r = rules();
        let compiled: Vec<CompiledSink> = crate::pattern::default_sink_patterns()
            .iter()
            .map(|s| CompiledSink::compile(s).unwrap())
            .collect();
        let lines = vec![
            "r = s.get(\"/v3/account\")",
            "logger.info(\"passphrase=%s\", passphrase)",
            "x = 1",
        ];
        let e = r.emissions("a.py", &lines, 0, 0, &compiled);
        assert_eq!(e.len(), 1);
        assert_eq!(e[0].sink, "logger");
        assert_eq!(e[0].evidence, SourceLocation::new("a.py", 2, 1));
    }
}
