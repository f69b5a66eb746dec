//! Full pipeline over the exchange bot tree: inventory -> extraction ->
//! reconciliation -> published run directory.
//!
//! GREEN when:
//! - Every divergence planted in the tree surfaces with its category and
//!   severity.
//! - Coverage counts the unresolved topic as unmapped and is below 1.0.
//! - The duplicated subscription yields one `consolidate` decision in
//!   `identified`, with a linked redundancy discrepancy per member.
//! - The plain API-key log is a critical finding noted as missing sink
//!   metadata.
//! - CSV exports carry one row per discrepancy / finding.

use apx_artifacts::{read_manifest, DISCREPANCIES_FILE, FINDINGS_FILE};
use apx_reconcile::{
    AuditWarning, NOTE_SINK_METADATA_MISSING, TAG_BASE_URL_DRIFT, TAG_DUPLICATE_CALL_SITE,
    TAG_ENUM_VIOLATION, TAG_MISSING_HEADER, TAG_PLAIN_EXPOSURE, TAG_TRANSPORT_MISMATCH,
    TAG_UNMAPPED,
};
use apx_runtime::run_and_publish;
use apx_schemas::{
    Category, DataType, DecisionState, Discrepancy, Handling, Recommendation, Severity,
};
use apx_testkit::AuditWorkspace;

fn tagged<'a>(all: &[&'a Discrepancy], tag: &str) -> Vec<&'a Discrepancy> {
    all.iter().copied().filter(|d| d.tag == tag).collect()
}

fn csv_rows(path: &std::path::Path) -> usize {
    csv::Reader::from_path(path).unwrap().records().count()
}

#[tokio::test]
async fn exchange_tree_end_to_end() {
    let ws = AuditWorkspace::exchange().unwrap();
    let loaded = ws.loaded_config("workers: 3\n").unwrap();
    let cfg = apx_runtime::AuditConfig::from_config_json(&loaded.config_json).unwrap();

    let done = run_and_publish(cfg, &loaded.config_hash).await.unwrap();
    let outcome = &done.report.outcome;

    // --- coverage ----------------------------------------------------------
    let c = &outcome.coverage;
    assert_eq!((c.total, c.mapped, c.unmapped, c.unresolved), (7, 5, 2, 1));
    assert!(!done.coverage_complete());
    assert!((c.ratio - 5.0 / 7.0).abs() < 1e-9);

    // --- discrepancies -----------------------------------------------------
    let all = outcome.all_discrepancies();

    let header = tagged(&all, TAG_MISSING_HEADER);
    assert_eq!(header.len(), 1);
    assert_eq!(header[0].category, Category::SigningAuth);
    assert_eq!(header[0].field.as_deref(), Some("X-Signature"));

    let drift = tagged(&all, TAG_BASE_URL_DRIFT);
    assert_eq!(drift.len(), 1);
    assert_eq!(drift[0].severity, Severity::Warning);

    let enum_v = tagged(&all, TAG_ENUM_VIOLATION);
    assert_eq!(enum_v.len(), 1);
    assert_eq!(enum_v[0].field.as_deref(), Some("side"));

    let transport = tagged(&all, TAG_TRANSPORT_MISMATCH);
    assert_eq!(transport.len(), 1);
    assert_eq!(transport[0].severity, Severity::Critical, "ticker is rate limited");

    assert_eq!(tagged(&all, TAG_UNMAPPED).len(), 2);
    assert_eq!(tagged(&all, TAG_PLAIN_EXPOSURE).len(), 1);

    // --- consolidation -----------------------------------------------------
    assert_eq!(outcome.decisions.len(), 1);
    let decision = &outcome.decisions[0];
    assert_eq!(decision.recommendation, Recommendation::Consolidate);
    assert_eq!(decision.state, DecisionState::Identified);
    assert_eq!(decision.members.len(), 2);

    let redundancy = tagged(&all, TAG_DUPLICATE_CALL_SITE);
    assert_eq!(redundancy.len(), 2);
    for d in redundancy {
        assert_eq!(d.category, Category::Redundancy);
        assert_eq!(d.decision_id, Some(decision.id));
        assert!(decision.members.contains(&d.invocation_id));
    }

    // --- sensitive data ----------------------------------------------------
    assert_eq!(outcome.findings.len(), 1);
    let f = &outcome.findings[0];
    assert_eq!(f.data_type, DataType::ApiKey);
    assert_eq!(f.handling_observed, Handling::Plain);
    assert_eq!(f.note.as_deref(), Some(NOTE_SINK_METADATA_MISSING));
    assert_eq!(f.evidence_location.path, "bots/orders.py");

    // --- warnings ----------------------------------------------------------
    let unresolved = outcome
        .warnings
        .iter()
        .filter(|w| matches!(w, AuditWarning::UnresolvedTarget { .. }))
        .count();
    let missing_meta = outcome
        .warnings
        .iter()
        .filter(|w| matches!(w, AuditWarning::SinkMetadataMissing { .. }))
        .count();
    assert_eq!((unresolved, missing_meta), (1, 1));

    // --- artifacts ---------------------------------------------------------
    let run_dir = &done.published.run_dir;
    assert_eq!(csv_rows(&run_dir.join(DISCREPANCIES_FILE)), all.len());
    assert_eq!(csv_rows(&run_dir.join(FINDINGS_FILE)), 1);

    let manifest = read_manifest(run_dir).unwrap();
    assert_eq!(manifest.run_id, done.run_id);
    assert_eq!(manifest.config_hash, loaded.config_hash);
    assert_eq!(manifest.contract_version, "v3.2");
}
