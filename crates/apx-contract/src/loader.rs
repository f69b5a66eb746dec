use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use apx_schemas::symbol::{self, SymbolFormat};
use apx_schemas::{
    BaseUrlClass, ContractEntry, ContractKey, Method, SigningRule, Transport, UseCase,
};
use serde::Serialize;

use crate::error::ContractParseError;
use crate::raw::{RawContract, RawEntry};

/// Reserved signing-rule name for public (unsigned) endpoints.
const UNSIGNED_RULE: &str = "none";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BaseUrls {
    pub rest: Option<String>,
    pub ws: Option<String>,
}

/// A loaded, validated contract. Immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceContract {
    version: String,
    base_urls: BTreeMap<BaseUrlClass, BaseUrls>,
    use_cases: BTreeMap<String, UseCase>,
    entries: BTreeMap<ContractKey, ContractEntry>,
}

impl ReferenceContract {
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &ContractKey) -> Option<&ContractEntry> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> &BTreeMap<ContractKey, ContractEntry> {
        &self.entries
    }

    pub fn use_case(&self, name: &str) -> Option<&UseCase> {
        self.use_cases.get(name)
    }

    pub fn base_urls(&self) -> &BTreeMap<BaseUrlClass, BaseUrls> {
        &self.base_urls
    }

    /// Host names (scheme and path stripped) declared for `class`.
    pub fn hosts_for(&self, class: BaseUrlClass) -> Vec<String> {
        let Some(urls) = self.base_urls.get(&class) else {
            return Vec::new();
        };
        [urls.rest.as_deref(), urls.ws.as_deref()]
            .into_iter()
            .flatten()
            .map(host_of)
            .filter(|h| !h.is_empty())
            .collect()
    }
}

fn host_of(url: &str) -> String {
    let no_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    no_scheme
        .split(['/', '?'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

pub fn load_contract_file(
    path: impl AsRef<Path>,
    expected_version: Option<&str>,
) -> Result<ReferenceContract, ContractParseError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| ContractParseError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    load_contract_str(&raw, expected_version)
}

/// Parse and validate a contract document.
///
/// When `expected_version` is set, the document's `version` must equal it.
pub fn load_contract_str(
    doc: &str,
    expected_version: Option<&str>,
) -> Result<ReferenceContract, ContractParseError> {
    let raw: RawContract =
        serde_yaml::from_str(doc).map_err(|e| ContractParseError::Malformed {
            message: e.to_string(),
        })?;

    let version = raw
        .version
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ContractParseError::MissingVersion)?
        .to_string();

    if let Some(expected) = expected_version {
        if expected.trim() != version {
            return Err(ContractParseError::VersionMismatch {
                expected: expected.trim().to_string(),
                found: version,
            });
        }
    }

    let mut base_urls = BTreeMap::new();
    for (env, urls) in &raw.base_urls {
        let class = BaseUrlClass::parse(env)
            .ok_or_else(|| ContractParseError::UnknownEnvironment { raw: env.clone() })?;
        base_urls.insert(
            class,
            BaseUrls {
                rest: urls.rest.clone(),
                ws: urls.ws.clone(),
            },
        );
    }

    let use_cases: BTreeMap<String, UseCase> = raw
        .use_cases
        .iter()
        .map(|(name, uc)| {
            (
                name.clone(),
                UseCase {
                    name: name.clone(),
                    streaming: uc.streaming,
                    rate_limited: uc.rate_limited,
                },
            )
        })
        .collect();

    let signing_rules: BTreeMap<String, SigningRule> = raw
        .signing_rules
        .iter()
        .map(|(name, rule)| {
            (
                name.clone(),
                SigningRule {
                    name: name.clone(),
                    required_headers: rule.headers.clone(),
                },
            )
        })
        .collect();

    let mut implicit_use_cases: BTreeMap<String, UseCase> = BTreeMap::new();
    let mut entries: BTreeMap<ContractKey, ContractEntry> = BTreeMap::new();

    for (index, raw_entry) in raw.entries.iter().enumerate() {
        let entry = build_entry(index, raw_entry, &use_cases, &signing_rules)?;

        if raw_entry.use_case.is_none() {
            // An entry without a declared use case is its own use case, served
            // over the transport it declares.
            implicit_use_cases
                .entry(entry.use_case.clone())
                .or_insert_with(|| UseCase {
                    name: entry.use_case.clone(),
                    streaming: entry.transport == Transport::Ws,
                    rate_limited: false,
                });
        }

        let key = entry.key();
        if entries.contains_key(&key) {
            return Err(ContractParseError::DuplicateEntry { key });
        }
        entries.insert(key, entry);
    }

    let mut all_use_cases = implicit_use_cases;
    all_use_cases.extend(use_cases);

    Ok(ReferenceContract {
        version,
        base_urls,
        use_cases: all_use_cases,
        entries,
    })
}

fn build_entry(
    index: usize,
    raw: &RawEntry,
    use_cases: &BTreeMap<String, UseCase>,
    signing_rules: &BTreeMap<String, SigningRule>,
) -> Result<ContractEntry, ContractParseError> {
    let raw_target = raw.target.trim();
    if raw_target.is_empty() {
        return Err(ContractParseError::EmptyTarget { index });
    }

    let transport =
        Transport::parse(&raw.transport).ok_or_else(|| ContractParseError::UnknownTransport {
            target: raw_target.to_string(),
            raw: raw.transport.clone(),
        })?;

    let method = Method::parse(&raw.method).ok_or_else(|| ContractParseError::UnknownMethod {
        target: raw_target.to_string(),
        raw: raw.method.clone(),
    })?;

    if !method.is_valid_for(transport) {
        return Err(ContractParseError::MethodTransportMismatch {
            target: raw_target.to_string(),
            method: method.as_str().to_string(),
            transport: transport.as_str().to_string(),
        });
    }

    let required_format = transport.symbol_format();
    if let Some(declared) = raw.symbol_format.as_deref() {
        match SymbolFormat::parse(declared) {
            Some(fmt) if fmt == required_format => {}
            _ => {
                return Err(ContractParseError::SymbolFormatConflict {
                    target: raw_target.to_string(),
                    declared: declared.to_string(),
                    transport: transport.as_str().to_string(),
                })
            }
        }
    }

    let target = symbol::normalize_target(raw_target, required_format);

    let use_case = match raw.use_case.as_deref().map(str::trim) {
        Some(name) => {
            if !use_cases.contains_key(name) {
                return Err(ContractParseError::UnknownUseCase {
                    target: target.clone(),
                    use_case: name.to_string(),
                });
            }
            name.to_string()
        }
        None => symbol::generalize_target(&target),
    };

    let signing_rule = match raw.signing_rule.as_deref().map(str::trim) {
        None | Some(UNSIGNED_RULE) => SigningRule::unsigned(),
        Some(name) => signing_rules.get(name).cloned().ok_or_else(|| {
            ContractParseError::UnknownSigningRule {
                target: target.clone(),
                rule: name.to_string(),
            }
        })?,
    };

    let required_fields: BTreeSet<String> = raw.required_fields.iter().cloned().collect();
    let optional_fields: BTreeSet<String> = raw.optional_fields.iter().cloned().collect();

    if let Some(field) = required_fields.intersection(&optional_fields).next() {
        return Err(ContractParseError::FieldBothRequiredAndOptional {
            target: target.clone(),
            field: field.clone(),
        });
    }

    let mut enums = BTreeMap::new();
    for (field, allowed) in &raw.enums {
        if !required_fields.contains(field) && !optional_fields.contains(field) {
            return Err(ContractParseError::EnumOnUndeclaredField {
                target: target.clone(),
                field: field.clone(),
            });
        }
        if allowed.is_empty() {
            return Err(ContractParseError::EmptyEnum {
                target: target.clone(),
                field: field.clone(),
            });
        }
        enums.insert(
            field.clone(),
            allowed.iter().cloned().collect::<BTreeSet<String>>(),
        );
    }

    Ok(ContractEntry {
        target,
        transport,
        method,
        use_case,
        required_fields,
        optional_fields,
        enums,
        signing_rule,
        symbol_format_required: required_format,
    })
}
