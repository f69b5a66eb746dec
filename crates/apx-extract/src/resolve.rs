//! Best-effort static resolution of dynamically-built targets.
//!
//! Placeholder lookup order: string constants assigned in the same unit, then
//! configured bindings, then symbol-like names, which stay as the `{symbol}`
//! template. Anything else leaves the whole target unresolved.

use std::collections::BTreeMap;

use apx_schemas::symbol::SYMBOL_PLACEHOLDER;
use regex::Regex;

use crate::pattern::PatternError;

/// Outcome of resolving one call site's target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Literal target with no placeholders.
    Static(String),
    /// All placeholders resolved. `target` may still contain `{symbol}`.
    Template { template: String, target: String },
    Unresolved { raw: String },
}

impl Resolved {
    pub fn target(&self) -> Option<&str> {
        match self {
            Resolved::Static(t) => Some(t),
            Resolved::Template { target, .. } => Some(target),
            Resolved::Unresolved { .. } => None,
        }
    }
}

const SYMBOL_NAMES: &[&str] = &["symbol", "sym", "pair", "instrument", "ticker_symbol"];

/// Whether a placeholder or identifier names a trading symbol. Only the last
/// dotted segment counts (`self.symbol` is symbol-like).
pub fn is_symbol_like(name: &str) -> bool {
    let last = last_segment(name).trim_start_matches('_').to_ascii_lowercase();
    SYMBOL_NAMES.contains(&last.as_str())
        || last.ends_with("_symbol")
        || last.ends_with("_sym")
        || last.ends_with("_pair")
}

fn last_segment(name: &str) -> &str {
    name.rsplit(['.', ':']).next().unwrap_or(name).trim()
}

pub(crate) struct Resolver {
    constant_re: Regex,
    placeholder_re: Regex,
    bindings: BTreeMap<String, String>,
}

impl Resolver {
    pub(crate) fn new(bindings: BTreeMap<String, String>) -> Result<Self, PatternError> {
        let constant_re = compile(
            "constant",
            r#"(?m)^\s*(?:pub(?:\(crate\))?\s+)?(?:(?:const|static|let|var|final)\s+)?(?:mut\s+)?(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*(?::\s*&(?:'static\s+)?str\s*)?=\s*[rb]?["'](?P<value>[^"'\n{}]*)["']\s*;?\s*$"#,
        )?;
        let placeholder_re = compile(
            "placeholder",
            r"\$?\{(?P<name>[A-Za-z_][A-Za-z0-9_.]*)?(?::[^}]*)?\}",
        )?;
        Ok(Self {
            constant_re,
            placeholder_re,
            bindings,
        })
    }

    /// String constants assigned in `text`. The first assignment of a name wins.
    pub(crate) fn constants(&self, text: &str) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for caps in self.constant_re.captures_iter(text) {
            if let (Some(name), Some(value)) = (caps.name("name"), caps.name("value")) {
                out.entry(name.as_str().to_string())
                    .or_insert_with(|| value.as_str().to_string());
            }
        }
        out
    }

    /// Resolve a target that was read from an identifier (`client.get(PATH)`).
    pub(crate) fn resolve_ident(
        &self,
        ident: &str,
        constants: &BTreeMap<String, String>,
    ) -> Resolved {
        match self.lookup(ident, constants) {
            Some(value) if !value.contains('{') => Resolved::Template {
                template: format!("{{{ident}}}"),
                target: value,
            },
            _ => Resolved::Unresolved {
                raw: ident.to_string(),
            },
        }
    }

    /// Resolve a literal or template target.
    ///
    /// `positional` are the arguments that follow the template in a
    /// `format!`/`.format()` call; `concat` is an identifier appended with `+`.
    pub(crate) fn resolve_template(
        &self,
        raw: &str,
        positional: &[String],
        concat: Option<&str>,
        constants: &BTreeMap<String, String>,
    ) -> Resolved {
        let template = match concat {
            Some(ident) => format!("{raw}{{{ident}}}"),
            None => raw.to_string(),
        };

        if !self.placeholder_re.is_match(&template) {
            return Resolved::Static(template);
        }

        let mut next_positional = positional.iter();
        let mut target = String::with_capacity(template.len());
        let mut last = 0;

        for caps in self.placeholder_re.captures_iter(&template) {
            let Some(whole) = caps.get(0) else { continue };
            target.push_str(&template[last..whole.start()]);
            last = whole.end();

            let value = match caps.name("name") {
                Some(name) => self.lookup(name.as_str(), constants),
                None => next_positional
                    .next()
                    .and_then(|arg| self.resolve_argument(arg, constants)),
            };

            match value {
                Some(v) => target.push_str(&v),
                None => return Resolved::Unresolved { raw: template },
            }
        }
        target.push_str(&template[last..]);

        Resolved::Template { template, target }
    }

    fn resolve_argument(&self, arg: &str, constants: &BTreeMap<String, String>) -> Option<String> {
        let arg = arg.trim().trim_start_matches('&');
        if let Some(lit) = string_literal(arg) {
            return Some(lit.to_string());
        }
        self.lookup(arg, constants)
    }

    fn lookup(&self, name: &str, constants: &BTreeMap<String, String>) -> Option<String> {
        let name = name.trim();
        let last = last_segment(name);
        for key in [name, last] {
            if let Some(v) = constants.get(key) {
                return Some(v.clone());
            }
        }
        for key in [name, last] {
            if let Some(v) = self.bindings.get(key) {
                return Some(v.clone());
            }
        }
        if is_symbol_like(name) {
            return Some(SYMBOL_PLACEHOLDER.to_string());
        }
        None
    }
}

/// Contents of a plain quoted string literal, if `s` is one.
pub(crate) fn string_literal(s: &str) -> Option<&str> {
    let s = s.trim();
    let s = s
        .strip_prefix('r')
        .or_else(|| s.strip_prefix('b'))
        .filter(|rest| rest.starts_with(['"', '\'']))
        .unwrap_or(s);
    for q in ['"', '\'', '`'] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return Some(&s[1..s.len() - 1]);
        }
    }
    None
}

pub(crate) fn compile(name: &str, re: &str) -> Result<Regex, PatternError> {
    Regex::new(re).map_err(|e| PatternError::InvalidRegex {
        name: name.to_string(),
        message: e.to_string(),
    })
}
