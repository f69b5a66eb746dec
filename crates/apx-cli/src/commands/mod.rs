//! Command handler modules for the `apx` binary.
//!
//! Shared utilities used by multiple command paths live here.

pub mod audit;
pub mod review;

use anyhow::{Context, Result};
use apx_config::LoadedConfig;

/// Load layered config from CLI path arguments.
pub fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    apx_config::load_layered_yaml(&refs)
}

/// Execute `apx contract check`.
pub fn contract_check(path: &str, version: Option<&str>) -> Result<()> {
    let contract = apx_contract::load_contract_file(path, version)
        .with_context(|| format!("contract check failed: {path}"))?;

    println!("contract_ok=true version={}", contract.version());
    println!("entries={}", contract.len());
    for key in contract.entries().keys() {
        println!("entry={key}");
    }
    Ok(())
}
