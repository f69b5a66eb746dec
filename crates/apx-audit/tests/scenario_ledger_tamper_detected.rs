//! Review ledger hash chain.
//!
//! GREEN when:
//! - Five appended transitions verify with a line count of 5.
//! - Editing a payload is detected at that line as a hash_self mismatch.
//! - Deleting a line is detected as a hash_prev mismatch.
//! - Reopening a ledger continues the same chain.
//! - A broken ledger refuses further appends.

use apx_audit::{verify_hash_chain, ReviewAction, ReviewLedger, VerifyResult, LEDGER_FILE};
use apx_schemas::EntityKind;
use serde_json::json;
use uuid::Uuid;

fn action(i: usize) -> ReviewAction {
    ReviewAction {
        entity: if i % 2 == 0 {
            EntityKind::Discrepancy
        } else {
            EntityKind::Decision
        },
        entity_id: format!("00000000-0000-0000-0000-00000000000{i}"),
        from: "found".to_string(),
        to: "reviewed".to_string(),
        actor: "reviewer".to_string(),
        note: Some(format!("batch {i}")),
    }
}

fn write_five(path: &std::path::Path) {
    let run_id = Uuid::new_v4();
    let mut ledger = ReviewLedger::open(path).unwrap();
    for i in 0..5 {
        ledger.append(run_id, &action(i)).unwrap();
    }
    assert_eq!(ledger.seq(), 5);
}

#[test]
fn untampered_chain_verifies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run").join(LEDGER_FILE);
    write_five(&path);

    assert_eq!(
        verify_hash_chain(&path).unwrap(),
        VerifyResult::Valid { lines: 5 }
    );
}

#[test]
fn edited_payload_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(LEDGER_FILE);
    write_five(&path);

    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    let mut rec: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
    rec["payload"]["to"] = json!("verified");
    lines[2] = serde_json::to_string(&rec).unwrap();
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();

    match verify_hash_chain(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 3, "{reason}");
            assert!(reason.contains("hash_self mismatch"), "{reason}");
        }
        other => panic!("tampered ledger verified: {other:?}"),
    }
}

#[test]
fn deleted_line_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(LEDGER_FILE);
    write_five(&path);

    let content = std::fs::read_to_string(&path).unwrap();
    let kept: Vec<&str> = content
        .lines()
        .enumerate()
        .filter(|(i, _)| *i != 1)
        .map(|(_, l)| l)
        .collect();
    std::fs::write(&path, kept.join("\n") + "\n").unwrap();

    match verify_hash_chain(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 2);
            assert!(reason.contains("hash_prev mismatch"), "{reason}");
        }
        other => panic!("truncated ledger verified: {other:?}"),
    }
}

#[test]
fn reopen_resumes_chain() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(LEDGER_FILE);
    write_five(&path);

    let mut ledger = ReviewLedger::open(&path).unwrap();
    assert_eq!(ledger.seq(), 5);
    let prev = ledger.last_hash().map(str::to_string);
    let rec = ledger.append(Uuid::new_v4(), &action(5)).unwrap();

    assert_eq!(rec.seq, 5);
    assert_eq!(rec.hash_prev, prev);
    assert_eq!(rec.event_type, "DECISION_TRANSITION");
    assert_eq!(
        verify_hash_chain(&path).unwrap(),
        VerifyResult::Valid { lines: 6 }
    );
}

#[test]
fn broken_ledger_refuses_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(LEDGER_FILE);
    write_five(&path);

    let content = std::fs::read_to_string(&path).unwrap();
    let first_dropped: Vec<&str> = content.lines().skip(1).collect();
    std::fs::write(&path, first_dropped.join("\n") + "\n").unwrap();

    let err = ReviewLedger::open(&path).err().unwrap();
    assert!(format!("{err:#}").contains("LEDGER_CHAIN_BROKEN"));
}
