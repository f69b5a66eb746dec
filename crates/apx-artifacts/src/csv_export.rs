//! Flat CSV views of the report for spreadsheet review. Rows follow scan
//! order; the JSON report remains the source of truth.

use anyhow::{Context, Result};
use apx_reconcile::AuditOutcome;
use apx_schemas::ApiInvocation;
use std::collections::BTreeMap;
use std::path::Path;

fn writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    csv::Writer::from_path(path).with_context(|| format!("create csv failed: {}", path.display()))
}

fn by_id(outcome: &AuditOutcome) -> BTreeMap<apx_schemas::InvocationId, &ApiInvocation> {
    outcome.invocations.iter().map(|i| (i.id, i)).collect()
}

pub fn write_discrepancies_csv(path: &Path, outcome: &AuditOutcome) -> Result<()> {
    let invocations = by_id(outcome);
    let mut w = writer(path)?;
    w.write_record([
        "discrepancy_id",
        "invocation_id",
        "path",
        "line",
        "target",
        "transport",
        "method",
        "category",
        "severity",
        "tag",
        "field",
        "status",
        "decision_id",
        "detail",
        "remediation",
    ])?;

    for d in outcome.all_discrepancies() {
        let Some(inv) = invocations.get(&d.invocation_id) else {
            continue;
        };
        w.write_record([
            d.id.to_string(),
            d.invocation_id.to_string(),
            inv.source_location.path.clone(),
            inv.source_location.line.to_string(),
            inv.target.clone(),
            inv.transport.to_string(),
            inv.method.to_string(),
            d.category.as_str().to_string(),
            d.severity.as_str().to_string(),
            d.tag.clone(),
            d.field.clone().unwrap_or_default(),
            d.status.as_str().to_string(),
            d.decision_id.map(|x| x.to_string()).unwrap_or_default(),
            d.detail.clone(),
            d.remediation.clone(),
        ])?;
    }
    w.flush().context("flush discrepancies csv")?;
    Ok(())
}

pub fn write_findings_csv(path: &Path, outcome: &AuditOutcome) -> Result<()> {
    let mut w = writer(path)?;
    w.write_record([
        "finding_id",
        "invocation_id",
        "data_type",
        "location",
        "handling",
        "sink",
        "path",
        "line",
        "note",
        "discrepancy_id",
    ])?;

    for f in &outcome.findings {
        w.write_record([
            f.id.to_string(),
            f.invocation_id.to_string(),
            f.data_type.as_str().to_string(),
            f.location.as_str().to_string(),
            f.handling_observed.as_str().to_string(),
            f.sink.clone(),
            f.evidence_location.path.clone(),
            f.evidence_location.line.to_string(),
            f.note.clone().unwrap_or_default(),
            f.discrepancy_id.map(|x| x.to_string()).unwrap_or_default(),
        ])?;
    }
    w.flush().context("flush findings csv")?;
    Ok(())
}

pub fn write_decisions_csv(path: &Path, outcome: &AuditOutcome) -> Result<()> {
    let mut w = writer(path)?;
    w.write_record([
        "decision_id",
        "target",
        "transport",
        "method",
        "duplicate_count",
        "recommendation",
        "state",
        "members",
        "rationale",
    ])?;

    for d in &outcome.decisions {
        let members: Vec<String> = d.members.iter().map(|m| m.to_string()).collect();
        w.write_record([
            d.id.to_string(),
            d.target_key.target.clone(),
            d.target_key.transport.to_string(),
            d.target_key.method.to_string(),
            d.duplicate_count.to_string(),
            d.recommendation.as_str().to_string(),
            d.state.as_str().to_string(),
            members.join(";"),
            d.rationale.clone(),
        ])?;
    }
    w.flush().context("flush decisions csv")?;
    Ok(())
}
