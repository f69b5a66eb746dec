//! apx-artifacts
//!
//! Run directory layout under `exports/<run_id>/`:
//!
//! - `manifest.json`     run identity, config hash, contract version, file list
//! - `report.json`       the complete audit outcome (written atomically, last)
//! - `discrepancies.csv` one row per discrepancy
//! - `findings.csv`      one row per sensitive data finding
//! - `decisions.csv`     one row per consolidation decision
//! - `review.jsonl`      review ledger, appended by `apx review`
//!
//! `report.json` holds no timestamps or run id, so identical inputs give a
//! byte-identical report. Those live in the manifest only.

use anyhow::{bail, Context, Result};
use apx_reconcile::{AuditOutcome, AuditSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

mod csv_export;

pub use csv_export::{write_decisions_csv, write_discrepancies_csv, write_findings_csv};

pub const SCHEMA_VERSION: i32 = 1;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const REPORT_FILE: &str = "report.json";
pub const DISCREPANCIES_FILE: &str = "discrepancies.csv";
pub const FINDINGS_FILE: &str = "findings.csv";
pub const DECISIONS_FILE: &str = "decisions.csv";
pub const REVIEW_FILE: &str = "review.jsonl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub schema_version: i32,
    pub contract_version: String,
    pub config_hash: String,
    pub summary: AuditSummary,
    pub outcome: AuditOutcome,
}

impl AuditReport {
    pub fn new(config_hash: impl Into<String>, outcome: AuditOutcome) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            contract_version: outcome.contract_version.clone(),
            config_hash: config_hash.into(),
            summary: outcome.summary(),
            outcome,
        }
    }

    /// Recompute the summary after the outcome was edited in place.
    pub fn refresh_summary(&mut self) {
        self.summary = self.outcome.summary();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: i32,
    pub run_id: Uuid,
    pub contract_version: String,
    pub config_hash: String,
    pub coverage_ratio: f64,
    pub created_at_utc: DateTime<Utc>,
    pub artifacts: ArtifactList,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactList {
    pub manifest_json: String,
    pub report_json: String,
    pub discrepancies_csv: String,
    pub findings_csv: String,
    pub decisions_csv: String,
    pub review_jsonl: String,
}

impl Default for ArtifactList {
    fn default() -> Self {
        Self {
            manifest_json: MANIFEST_FILE.to_string(),
            report_json: REPORT_FILE.to_string(),
            discrepancies_csv: DISCREPANCIES_FILE.to_string(),
            findings_csv: FINDINGS_FILE.to_string(),
            decisions_csv: DECISIONS_FILE.to_string(),
            review_jsonl: REVIEW_FILE.to_string(),
        }
    }
}

pub struct PublishRunArgs<'a> {
    pub exports_root: &'a Path,
    pub run_id: Uuid,
    pub report: &'a AuditReport,
}

#[derive(Debug, Clone)]
pub struct PublishedRun {
    pub run_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub report_path: PathBuf,
}

/// Write every artifact of a completed run. The report goes last so a
/// present `report.json` always means a complete run directory.
pub fn publish_run(args: PublishRunArgs<'_>) -> Result<PublishedRun> {
    let run_dir = args.exports_root.join(args.run_id.to_string());
    if run_dir.join(REPORT_FILE).exists() {
        bail!(
            "RUN_DIR_EXISTS: {} already holds a report",
            run_dir.display()
        );
    }
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("create exports dir failed: {}", run_dir.display()))?;

    let manifest = RunManifest {
        schema_version: SCHEMA_VERSION,
        run_id: args.run_id,
        contract_version: args.report.contract_version.clone(),
        config_hash: args.report.config_hash.clone(),
        coverage_ratio: args.report.outcome.coverage.ratio,
        created_at_utc: Utc::now(),
        artifacts: ArtifactList::default(),
    };
    let manifest_path = run_dir.join(MANIFEST_FILE);
    write_json_atomic(&manifest_path, &manifest)?;

    let report_path = write_report_bundle(&run_dir, args.report)?;

    Ok(PublishedRun {
        run_dir,
        manifest_path,
        report_path,
    })
}

/// Rewrite the CSV exports and then the report. Used for the first publish
/// and after review transitions.
pub fn write_report_bundle(run_dir: &Path, report: &AuditReport) -> Result<PathBuf> {
    write_discrepancies_csv(&run_dir.join(DISCREPANCIES_FILE), &report.outcome)?;
    write_findings_csv(&run_dir.join(FINDINGS_FILE), &report.outcome)?;
    write_decisions_csv(&run_dir.join(DECISIONS_FILE), &report.outcome)?;

    let report_path = run_dir.join(REPORT_FILE);
    write_json_atomic(&report_path, report)?;
    Ok(report_path)
}

/// Pretty JSON to a temp file in the same directory, then rename over `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("no parent directory for {}", path.display()))?;
    let json = serde_json::to_string_pretty(value).context("serialize json failed")?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    tmp.write_all(format!("{json}\n").as_bytes())
        .context("write temp file failed")?;
    tmp.as_file()
        .sync_all()
        .context("sync temp file failed")?;
    tmp.persist(path)
        .with_context(|| format!("rename into {} failed", path.display()))?;
    Ok(())
}

pub fn read_report(path: &Path) -> Result<AuditReport> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read report failed: {}", path.display()))?;
    let report: AuditReport = serde_json::from_str(&raw)
        .with_context(|| format!("REPORT_INVALID: {}", path.display()))?;
    if report.schema_version != SCHEMA_VERSION {
        bail!(
            "REPORT_INVALID: {} has schema_version {}, expected {}",
            path.display(),
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

pub fn read_manifest(run_dir: &Path) -> Result<RunManifest> {
    let path = run_dir.join(MANIFEST_FILE);
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read manifest failed: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("MANIFEST_INVALID: {}", path.display()))
}
