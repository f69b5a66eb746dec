use anyhow::{Context, Result};
use apx_config::{load_layered_yaml_from_strings, LoadedConfig};
use apx_runtime::AuditConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CONTRACT_FILE: &str = "contract.yaml";
pub const SOURCE_ROOT: &str = "bots";
pub const EXPORTS_DIR: &str = "exports";

/// Throwaway audit workspace: a contract, a `bots/` source tree and an
/// exports root, all under one temp dir removed on drop.
pub struct AuditWorkspace {
    dir: TempDir,
}

impl AuditWorkspace {
    pub fn new(contract_yaml: &str) -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp workspace failed")?;
        let ws = Self { dir };
        ws.write(CONTRACT_FILE, contract_yaml)?;
        fs::create_dir_all(ws.source_root())
            .with_context(|| format!("create {}", ws.source_root().display()))?;
        Ok(ws)
    }

    /// [`crate::EXCHANGE_CONTRACT`] plus the [`crate::bots`] tree.
    pub fn exchange() -> Result<Self> {
        let ws = Self::new(crate::EXCHANGE_CONTRACT)?;
        for (rel, text) in crate::bots::EXCHANGE_BOTS {
            ws.source(rel, text)?;
        }
        Ok(ws)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_root(&self) -> PathBuf {
        self.path().join(SOURCE_ROOT)
    }

    pub fn exports_root(&self) -> PathBuf {
        self.path().join(EXPORTS_DIR)
    }

    /// Write `text` at `rel` (relative to the workspace), creating parents.
    pub fn write(&self, rel: &str, text: &str) -> Result<PathBuf> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Write a source file under `bots/`.
    pub fn source(&self, rel: &str, text: &str) -> Result<PathBuf> {
        self.write(&format!("{SOURCE_ROOT}/{rel}"), text)
    }

    /// Base config pointing at this workspace. Paths are single-quoted so
    /// YAML leaves separators alone.
    pub fn base_config(&self) -> String {
        format!(
            "contract:\n  path: '{}'\ninventory:\n  roots: ['{}']\nexports_root: '{}'\n",
            self.path().join(CONTRACT_FILE).display(),
            self.source_root().display(),
            self.exports_root().display()
        )
    }

    /// Base config with `overlay` merged on top.
    pub fn loaded_config(&self, overlay: &str) -> Result<LoadedConfig> {
        let base = self.base_config();
        load_layered_yaml_from_strings(&[base.as_str(), overlay])
    }

    pub fn audit_config(&self, overlay: &str) -> Result<AuditConfig> {
        let loaded = self.loaded_config(overlay)?;
        AuditConfig::from_config_json(&loaded.config_json)
    }
}
