//! `apx contract check` and `apx config-hash`.
//!
//! GREEN when:
//! - A valid contract prints its version and entry count.
//! - A version mismatch fails with CONTRACT_PARSE_ERROR.
//! - Reordered but equal config layers hash identically.
//! - A literal secret in config fails with CONFIG_SECRET_DETECTED and the
//!   value never reaches the output.

mod common;

use std::fs;

use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn contract_check_reports_version_and_entries() {
    let ws = common::workspace("", false);

    common::apx(ws.path())
        .args(["contract", "check", "--contract", "contract.yaml", "--version", "v3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("contract_ok=true version=v3"))
        .stdout(predicate::str::contains("entries=1"));

    common::apx(ws.path())
        .args(["contract", "check", "--contract", "contract.yaml", "--version", "v4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONTRACT_PARSE_ERROR"));
}

#[test]
fn config_hash_is_key_order_independent() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.yaml"), "workers: 4\nexports_root: out\n").unwrap();
    fs::write(dir.path().join("b.yaml"), "exports_root: out\nworkers: 4\n").unwrap();

    let hash_of = |file: &str| {
        let out = common::apx(dir.path())
            .args(["config-hash", file])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        common::field(&out, "config_hash").unwrap()
    };

    assert_eq!(hash_of("a.yaml"), hash_of("b.yaml"));
}

#[test]
fn literal_secrets_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("bad.yaml"),
        "sinks:\n  - paths: \"**\"\n    token: \"ghp_abcdefghijklmnop\"\n",
    )
    .unwrap();

    common::apx(dir.path())
        .args(["config-hash", "bad.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("ghp_abcdefghijklmnop").not())
        .stdout(predicate::str::contains("ghp_abcdefghijklmnop").not());
}
