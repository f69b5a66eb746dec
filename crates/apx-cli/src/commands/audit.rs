//! `apx audit run`: config -> batch audit -> published run directory.

use anyhow::{bail, Result};
use apx_config::report_unused_keys;
use apx_runtime::{run_and_publish, AuditConfig};

pub async fn audit_run(config_paths: Vec<String>) -> Result<()> {
    let loaded = super::load_config(&config_paths)?;
    let config = AuditConfig::from_config_json(&loaded.config_json)?;

    let unused = report_unused_keys(&loaded.config_json, config.unused_keys)?;
    for pointer in &unused.unused_leaf_pointers {
        tracing::warn!(%pointer, "CONFIG_UNUSED_KEY");
    }

    let require_full = config.require_full_coverage;
    let done = run_and_publish(config, &loaded.config_hash).await?;
    let summary = &done.report.summary;
    let coverage = &done.report.outcome.coverage;

    println!("run_id={}", done.run_id);
    println!("config_hash={}", loaded.config_hash);
    println!("contract_version={}", done.report.contract_version);
    println!(
        "invocations={} mapped={} unmapped={} unresolved={} coverage={:.4}",
        coverage.total, coverage.mapped, coverage.unmapped, coverage.unresolved, coverage.ratio
    );
    println!(
        "discrepancies={} critical={} warning={} info={} findings={} decisions={}",
        summary.discrepancies,
        summary.critical,
        summary.warning,
        summary.info,
        summary.findings,
        summary.decisions
    );
    for path in &done.skipped {
        println!("skipped={path}");
    }
    println!("report_path={}", done.published.report_path.display());

    if require_full && !done.coverage_complete() {
        bail!(
            "COVERAGE_INCOMPLETE: {} of {} invocations unmapped (report written to {})",
            coverage.unmapped,
            coverage.total,
            done.published.report_path.display()
        );
    }
    Ok(())
}
