//! Wire-level structs mirroring the contract document. Converted to the
//! internal [`apx_schemas::ContractEntry`] by the loader; nothing outside this
//! crate sees them.
//!
//! Unknown keys are rejected so a typo in a field name cannot silently drop a
//! required-field declaration.

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawContract {
    pub version: Option<String>,
    #[serde(default)]
    pub base_urls: BTreeMap<String, RawBaseUrls>,
    #[serde(default)]
    pub use_cases: BTreeMap<String, RawUseCase>,
    #[serde(default)]
    pub signing_rules: BTreeMap<String, RawSigningRule>,
    #[serde(default)]
    pub entries: Vec<RawEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawBaseUrls {
    pub rest: Option<String>,
    pub ws: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawUseCase {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub rate_limited: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawSigningRule {
    #[serde(default)]
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawEntry {
    pub target: String,
    pub transport: String,
    pub method: String,
    pub use_case: Option<String>,
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub optional_fields: Vec<String>,
    #[serde(default)]
    pub enums: BTreeMap<String, Vec<String>>,
    pub signing_rule: Option<String>,
    pub symbol_format: Option<String>,
}
