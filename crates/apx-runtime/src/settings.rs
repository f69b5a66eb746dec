//! Typed view of the layered audit configuration.
//!
//! Only the keys listed in `apx_config::consumed_pointers` are read here.
//! Subtrees consumed whole (`extract`, `sinks`, `policy`) reject unknown keys
//! themselves, since the unused-key report cannot see inside them.

use anyhow::{bail, Context, Result};
use apx_config::UnusedKeyPolicy;
use apx_extract::{ExtractOptions, PatternSpec, SinkPattern};
use apx_reconcile::{SeverityPolicy, SinkRule};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    pub contract: ContractSettings,
    #[serde(default)]
    pub inventory: InventorySettings,
    #[serde(default)]
    pub extract: ExtractSettings,
    #[serde(default)]
    pub sinks: Vec<SinkSettings>,
    #[serde(default)]
    pub policy: SeverityPolicy,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_exports_root")]
    pub exports_root: PathBuf,
    #[serde(default)]
    pub unused_keys: UnusedKeyPolicy,
    #[serde(default)]
    pub require_full_coverage: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractSettings {
    pub path: PathBuf,
    /// Expected `version`; loading fails on mismatch.
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventorySettings {
    #[serde(default)]
    pub roots: Vec<PathBuf>,
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

/// Overrides applied on top of [`ExtractOptions::default`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractSettings {
    /// Replaces the default call-construction patterns when set.
    #[serde(default)]
    pub patterns: Option<Vec<PatternSpec>>,
    #[serde(default)]
    pub sink_patterns: Option<Vec<SinkPattern>>,
    #[serde(default)]
    pub bindings: BTreeMap<String, String>,
    /// URL substrings that mark a base URL as testnet.
    #[serde(default)]
    pub environment_markers: Option<Vec<String>>,
    #[serde(default)]
    pub header_names: Option<Vec<String>>,
    #[serde(default)]
    pub window_lines: Option<usize>,
    #[serde(default)]
    pub emission_lookahead: Option<usize>,
}

impl ExtractSettings {
    pub fn to_options(&self) -> ExtractOptions {
        let mut o = ExtractOptions::default();
        if let Some(p) = &self.patterns {
            o.patterns = p.clone();
        }
        if let Some(s) = &self.sink_patterns {
            o.sink_patterns = s.clone();
        }
        o.bindings = self.bindings.clone();
        if let Some(m) = &self.environment_markers {
            o.testnet_markers = m.clone();
        }
        if let Some(h) = &self.header_names {
            o.header_names = h.clone();
        }
        if let Some(n) = self.window_lines {
            o.window_lines = n;
        }
        if let Some(n) = self.emission_lookahead {
            o.emission_lookahead = n;
        }
        o
    }
}

/// Sink rules for every inventory path matching `paths` (a glob).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkSettings {
    pub paths: String,
    #[serde(default)]
    pub rules: Vec<SinkRule>,
}

fn default_workers() -> usize {
    4
}

fn default_exports_root() -> PathBuf {
    PathBuf::from("exports")
}

fn default_include() -> Vec<String> {
    ["**/*.py", "**/*.rs", "**/*.js", "**/*.ts"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_exclude() -> Vec<String> {
    ["**/.git/**", "**/target/**", "**/node_modules/**", "**/__pycache__/**"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl AuditConfig {
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        let cfg: AuditConfig = serde_json::from_value(config_json.clone())
            .context("CONFIG_INVALID: audit settings do not match the expected shape")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.contract.path.as_os_str().is_empty() {
            bail!("CONFIG_INVALID: contract.path is empty");
        }
        if self.inventory.roots.is_empty() {
            bail!("CONFIG_INVALID: inventory.roots is empty");
        }
        if self.inventory.include.is_empty() {
            bail!("CONFIG_INVALID: inventory.include is empty; nothing would be scanned");
        }
        if self.workers == 0 {
            bail!("CONFIG_INVALID: workers must be at least 1");
        }
        if self.extract.window_lines == Some(0) {
            bail!("CONFIG_INVALID: extract.window_lines must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apx_schemas::Severity;

    fn parse(v: Value) -> Result<AuditConfig> {
        AuditConfig::from_config_json(&v)
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = parse(serde_json::json!({
            "contract": {"path": "contracts/v3.yaml"},
            "inventory": {"roots": ["bots"]}
        }))
        .unwrap();
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.exports_root, PathBuf::from("exports"));
        assert_eq!(cfg.unused_keys, UnusedKeyPolicy::Warn);
        assert!(!cfg.require_full_coverage);
        assert!(cfg.inventory.include.contains(&"**/*.py".to_string()));
        assert_eq!(cfg.policy, SeverityPolicy::default());
    }

    #[test]
    fn overrides_reach_extract_options() {
        let cfg = parse(serde_json::json!({
            "contract": {"path": "c.yaml"},
            "inventory": {"roots": ["src"]},
            "extract": {
                "bindings": {"channel": "depth"},
                "environment_markers": ["staging"],
                "window_lines": 4
            },
            "policy": {"transport_mismatch": "critical"}
        }))
        .unwrap();
        let o = cfg.extract.to_options();
        assert_eq!(o.bindings.get("channel").map(String::as_str), Some("depth"));
        assert_eq!(o.testnet_markers, vec!["staging".to_string()]);
        assert_eq!(o.window_lines, 4);
        assert_eq!(o.emission_lookahead, 6);
        assert_eq!(cfg.policy.transport_mismatch, Severity::Critical);
    }

    #[test]
    fn typo_inside_extract_is_rejected() {
        let err = parse(serde_json::json!({
            "contract": {"path": "c.yaml"},
            "inventory": {"roots": ["src"]},
            "extract": {"bindigns": {}}
        }))
        .unwrap_err();
        assert!(format!("{err:#}").contains("CONFIG_INVALID"));
    }

    #[test]
    fn empty_roots_and_zero_workers_rejected() {
        let no_roots = parse(serde_json::json!({"contract": {"path": "c.yaml"}})).unwrap_err();
        assert!(no_roots.to_string().contains("inventory.roots"));

        let zero = parse(serde_json::json!({
            "contract": {"path": "c.yaml"},
            "inventory": {"roots": ["src"]},
            "workers": 0
        }))
        .unwrap_err();
        assert!(zero.to_string().contains("workers"));
    }
}
