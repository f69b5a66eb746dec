//! Symbol-format normalization.
//!
//! The exchange spells the same instrument two ways:
//! - REST paths and params use the dash-separated form: `BTC-USDT`
//! - WS topics use the concatenated form: `BTCUSDT`
//!
//! [`rest_form`] and [`ws_form`] are pure total functions. Inputs that are not
//! a valid symbol come back unchanged.
//!
//! # Validity
//!
//! A pair `(base, quote)` is valid when `quote` is a known quote asset, `base`
//! is at least [`MIN_BASE_LEN`] uppercase alphanumerics, and splitting the
//! concatenated form `base + quote` yields exactly `(base, quote)` again
//! (longest known quote suffix wins). Under that definition
//! `ws_form(rest_form(x)) == x` and `rest_form(ws_form(y)) == y` hold for every
//! valid concatenated `x` and every valid dashed `y`.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolFormat {
    /// `BTC-USDT`
    Dash,
    /// `BTCUSDT`
    Concat,
    /// No symbol observed.
    Unknown,
}

impl SymbolFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolFormat::Dash => "dash",
            SymbolFormat::Concat => "concat",
            SymbolFormat::Unknown => "unknown",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dash" | "dashed" | "rest" => Some(SymbolFormat::Dash),
            "concat" | "concatenated" | "ws" => Some(SymbolFormat::Concat),
            "unknown" => Some(SymbolFormat::Unknown),
            _ => None,
        }
    }
}

/// Known quote assets, longest first. Order matters: the first suffix match wins.
pub const KNOWN_QUOTES: &[&str] = &[
    "FDUSD", "USDT", "USDC", "BUSD", "TUSD", "USD", "BTC", "ETH", "BNB", "EUR", "TRY", "DAI",
];

pub const MIN_BASE_LEN: usize = 2;

/// Placeholder a target template uses in place of a concrete symbol.
pub const SYMBOL_PLACEHOLDER: &str = "{symbol}";

fn is_symbol_chars(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Split a concatenated symbol into `(base, quote)` using the longest known quote suffix.
pub fn split_concat(s: &str) -> Option<(&str, &str)> {
    if !is_symbol_chars(s) {
        return None;
    }
    for quote in KNOWN_QUOTES {
        if let Some(base) = s.strip_suffix(quote) {
            if base.len() >= MIN_BASE_LEN && base.chars().any(|c| c.is_ascii_uppercase()) {
                return Some((base, quote));
            }
        }
    }
    None
}

/// Split a dashed symbol into `(base, quote)`. Only canonical pairs are accepted.
pub fn split_dash(s: &str) -> Option<(&str, &str)> {
    let (base, quote) = s.split_once('-')?;
    if !is_symbol_chars(base) || !is_symbol_chars(quote) {
        return None;
    }
    let joined = format!("{base}{quote}");
    match split_concat(&joined) {
        Some((b, q)) if b == base && q == quote => Some((base, quote)),
        _ => None,
    }
}

pub fn detect(token: &str) -> SymbolFormat {
    if split_dash(token).is_some() {
        SymbolFormat::Dash
    } else if split_concat(token).is_some() {
        SymbolFormat::Concat
    } else {
        SymbolFormat::Unknown
    }
}

/// REST (dash) form. Non-symbols are returned unchanged.
pub fn rest_form(s: &str) -> String {
    if split_dash(s).is_some() {
        return s.to_string();
    }
    match split_concat(s) {
        Some((base, quote)) => format!("{base}-{quote}"),
        None => s.to_string(),
    }
}

/// WS (concatenated) form. Non-symbols are returned unchanged.
pub fn ws_form(s: &str) -> String {
    match split_dash(s) {
        Some((base, quote)) => format!("{base}{quote}"),
        None => s.to_string(),
    }
}

pub fn to_format(s: &str, format: SymbolFormat) -> String {
    match format {
        SymbolFormat::Dash => rest_form(s),
        SymbolFormat::Concat => ws_form(s),
        SymbolFormat::Unknown => s.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Target-level helpers
// ---------------------------------------------------------------------------

fn is_delimiter(c: char) -> bool {
    matches!(c, '.' | '/' | '?' | '&' | '=' | ':' | ',' | '@' | ' ')
}

/// Rebuild `target` with every token passed through `f`; delimiters are kept.
fn map_tokens(target: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(target.len());
    let mut token = String::new();
    for c in target.chars() {
        if is_delimiter(c) {
            out.push_str(&f(&token));
            token.clear();
            out.push(c);
        } else {
            token.push(c);
        }
    }
    out.push_str(&f(&token));
    out
}

/// Symbol tokens found in a path or topic, in order, with their observed format.
pub fn symbols_in(target: &str) -> Vec<(String, SymbolFormat)> {
    let mut found = Vec::new();
    map_tokens(target, |tok| {
        let fmt = detect(tok);
        if fmt != SymbolFormat::Unknown {
            found.push((tok.to_string(), fmt));
        }
        tok.to_string()
    });
    found
}

/// Format of the first symbol token in `target`.
pub fn observed_format(target: &str) -> SymbolFormat {
    symbols_in(target)
        .first()
        .map(|(_, f)| *f)
        .unwrap_or(SymbolFormat::Unknown)
}

/// Rewrite every symbol token in `target` into `format`.
pub fn normalize_target(target: &str, format: SymbolFormat) -> String {
    map_tokens(target, |tok| to_format(tok, format))
}

/// Replace every symbol token with [`SYMBOL_PLACEHOLDER`].
pub fn generalize_target(target: &str) -> String {
    map_tokens(target, |tok| {
        if detect(tok) == SymbolFormat::Unknown {
            tok.to_string()
        } else {
            SYMBOL_PLACEHOLDER.to_string()
        }
    })
}
