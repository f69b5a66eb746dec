//! Two runs over identical input.
//!
//! GREEN when:
//! - report.json and every CSV export are byte-identical across runs, even
//!   with different worker counts.
//! - Only the manifest (run id, timestamp) differs.

use std::fs;

use apx_artifacts::{
    DECISIONS_FILE, DISCREPANCIES_FILE, FINDINGS_FILE, MANIFEST_FILE, REPORT_FILE,
};
use apx_runtime::run_and_publish;
use apx_testkit::AuditWorkspace;

#[tokio::test]
async fn replay_produces_identical_artifacts() {
    let ws = AuditWorkspace::exchange().unwrap();

    let first = run_and_publish(ws.audit_config("workers: 1\n").unwrap(), "h")
        .await
        .unwrap();
    let second = run_and_publish(ws.audit_config("workers: 8\n").unwrap(), "h")
        .await
        .unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_ne!(first.published.run_dir, second.published.run_dir);

    for file in [REPORT_FILE, DISCREPANCIES_FILE, FINDINGS_FILE, DECISIONS_FILE] {
        let a = fs::read(first.published.run_dir.join(file)).unwrap();
        let b = fs::read(second.published.run_dir.join(file)).unwrap();
        assert_eq!(a, b, "{file} differs between runs");
    }

    let a = fs::read(first.published.run_dir.join(MANIFEST_FILE)).unwrap();
    let b = fs::read(second.published.run_dir.join(MANIFEST_FILE)).unwrap();
    assert_ne!(a, b);
}
