//! Source inventory: walk the configured roots and read every included file
//! into a [`SourceUnit`].
//!
//! Unit paths are `<root name>/<path under root>`, `/`-separated, so reports
//! do not depend on where the checkout lives. Units are sorted by path.

use anyhow::{bail, Context, Result};
use apx_extract::SourceUnit;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::settings::InventorySettings;

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub units: Vec<SourceUnit>,
    /// Included files that could not be read as UTF-8 text.
    pub skipped: Vec<String>,
}

pub fn compile_globset(globs: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for g in globs {
        builder.add(Glob::new(g).with_context(|| format!("CONFIG_INVALID: invalid glob {g:?}"))?);
    }
    builder
        .build()
        .context("CONFIG_INVALID: glob set failed to build")
}

fn root_label(root: &Path) -> Result<String> {
    let canonical = fs::canonicalize(root)
        .with_context(|| format!("INVENTORY_ROOT_MISSING: {}", root.display()))?;
    let name = canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string());
    Ok(name)
}

pub fn load_inventory(settings: &InventorySettings) -> Result<Inventory> {
    let include = compile_globset(&settings.include)?;
    let exclude = compile_globset(&settings.exclude)?;

    let mut labels: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut files: Vec<(String, PathBuf)> = Vec::new();

    for root in &settings.roots {
        let label = root_label(root)?;
        if let Some(prev) = labels.insert(label.clone(), root.clone()) {
            bail!(
                "INVENTORY_ROOT_COLLISION: {} and {} are both named '{label}'",
                prev.display(),
                root.display()
            );
        }

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.with_context(|| format!("walk inventory root: {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let rel_posix = rel.to_string_lossy().replace('\\', "/");
            let unit_path = format!("{label}/{rel_posix}");

            if !include.is_match(&unit_path) || exclude.is_match(&unit_path) {
                continue;
            }
            files.push((unit_path, entry.path().to_path_buf()));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut inventory = Inventory::default();
    for (unit_path, file) in files {
        let bytes = fs::read(&file).with_context(|| format!("read source {}", file.display()))?;
        match String::from_utf8(bytes) {
            Ok(text) => inventory.units.push(SourceUnit::new(unit_path, text)),
            Err(_) => {
                tracing::warn!(path = %unit_path, "source file is not UTF-8; skipped");
                inventory.skipped.push(unit_path);
            }
        }
    }
    Ok(inventory)
}
