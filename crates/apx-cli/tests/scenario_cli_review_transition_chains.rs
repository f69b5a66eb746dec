//! `apx review` against a published run.
//!
//! GREEN when:
//! - A legal transition rewrites report.json and appends one ledger event.
//! - Skipping a lifecycle step is rejected and the ledger is untouched.
//! - `review verify` accepts the chain, and rejects it once a line is edited.
//! - The ledger event is written before the report: a bundle that cannot be
//!   rewritten leaves the event recorded and the report as it was.

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;

fn published_run(ws: &Path) -> PathBuf {
    let out = common::apx(ws)
        .args(["audit", "run", "--config", "audit.yaml"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    common::report_path(ws, &out)
}

fn first_discrepancy(report: &Path) -> (String, String) {
    let v: Value = serde_json::from_str(&fs::read_to_string(report).unwrap()).unwrap();
    let d = v["outcome"]["discrepancies"]
        .as_object()
        .unwrap()
        .values()
        .find_map(|list| list.as_array().and_then(|l| l.first()).cloned())
        .unwrap();
    (
        d["id"].as_str().unwrap().to_string(),
        d["status"].as_str().unwrap().to_string(),
    )
}

fn transition(ws: &Path, report: &Path, id: &str, to: &str) -> assert_cmd::assert::Assert {
    common::apx(ws)
        .args(["review", "transition", "--report"])
        .arg(report)
        .args(["--kind", "discrepancy", "--id", id, "--to", to])
        .args(["--actor", "alice", "--note", "header added upstream"])
        .assert()
}

#[test]
fn transitions_are_recorded_and_chained() {
    let ws = common::workspace("", false);
    let report = published_run(ws.path());
    let ledger = report.parent().unwrap().join("review.jsonl");

    let (id, status) = first_discrepancy(&report);
    assert_eq!(status, "found");

    transition(ws.path(), &report, &id, "reviewed")
        .success()
        .stdout(predicate::str::contains("from=found to=reviewed"));

    let (same_id, status) = first_discrepancy(&report);
    assert_eq!(same_id, id);
    assert_eq!(status, "reviewed");

    // reviewed -> verified skips remediation.
    transition(ws.path(), &report, &id, "verified")
        .failure()
        .stderr(predicate::str::contains("REVIEW_REJECTED"));
    assert_eq!(first_discrepancy(&report).1, "reviewed");

    common::apx(ws.path())
        .args(["review", "verify", "--ledger"])
        .arg(&ledger)
        .assert()
        .success()
        .stdout(predicate::str::contains("ledger_ok=true lines=1"));

    let raw = fs::read_to_string(&ledger).unwrap();
    fs::write(&ledger, raw.replace("alice", "mallory")).unwrap();

    common::apx(ws.path())
        .args(["review", "verify", "--ledger"])
        .arg(&ledger)
        .assert()
        .failure()
        .stderr(predicate::str::contains("LEDGER_CHAIN_BROKEN"));
}

#[test]
fn unknown_ids_and_kinds_are_rejected() {
    let ws = common::workspace("", false);
    let report = published_run(ws.path());

    transition(
        ws.path(),
        &report,
        "00000000-0000-0000-0000-000000000000",
        "reviewed",
    )
    .failure()
    .stderr(predicate::str::contains("REVIEW_NOT_FOUND"));

    common::apx(ws.path())
        .args(["review", "transition", "--report"])
        .arg(&report)
        .args(["--kind", "finding", "--id", "x", "--to", "reviewed"])
        .args(["--actor", "alice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("REVIEW_INVALID"));

    assert!(!report.parent().unwrap().join("review.jsonl").exists());
}

#[test]
fn ledger_is_written_before_the_report() {
    let ws = common::workspace("", false);
    let report = published_run(ws.path());
    let run_dir = report.parent().unwrap().to_path_buf();
    let ledger = run_dir.join("review.jsonl");

    let (id, status) = first_discrepancy(&report);
    assert_eq!(status, "found");

    // A directory where the CSV export goes makes the bundle rewrite fail.
    let csv = run_dir.join("discrepancies.csv");
    fs::remove_file(&csv).unwrap();
    fs::create_dir(&csv).unwrap();

    transition(ws.path(), &report, &id, "reviewed")
        .failure()
        .stderr(predicate::str::contains("REVIEW_REPORT_WRITE_FAILED"));

    assert_eq!(first_discrepancy(&report).1, "found");

    let raw = fs::read_to_string(&ledger).unwrap();
    let events: Vec<Value> = raw
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["payload"]["entity_id"], id.as_str());
    assert_eq!(events[0]["payload"]["from"], "found");
    assert_eq!(events[0]["payload"]["to"], "reviewed");
}
