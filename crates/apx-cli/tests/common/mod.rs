#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const CONTRACT: &str = r#"
version: "v3"
signing_rules:
  signed: { headers: ["X-Signature"] }
entries:
  - target: "/v3/account"
    transport: rest
    method: GET
    signing_rule: signed
"#;

/// Calls the contract knows, without the signing header.
pub const ACCOUNT_PY: &str = r#"def fetch_account(session):
    # read balances
    resp = session.get("/v3/account")
    return resp
"#;

pub const LEGACY_PY: &str = r#"def legacy_balances(session):
    # old balance endpoint
    return session.get("/v2/balances")
"#;

/// A workspace directory holding `contract.yaml`, `src/` and `audit.yaml`.
pub fn workspace(extra_config: &str, with_legacy: bool) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("contract.yaml"), CONTRACT).unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("account.py"), ACCOUNT_PY).unwrap();
    if with_legacy {
        fs::write(src.join("legacy.py"), LEGACY_PY).unwrap();
    }
    let config = format!(
        "contract:\n  path: contract.yaml\n  version: \"v3\"\ninventory:\n  roots: [src]\nexports_root: exports\nworkers: 2\n{extra_config}"
    );
    fs::write(dir.path().join("audit.yaml"), config).unwrap();
    dir
}

pub fn apx(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("apx").unwrap();
    cmd.current_dir(dir).env("RUST_LOG", "warn");
    cmd
}

/// Value of the first `key=value` token for `key` in CLI output.
pub fn field(stdout: &[u8], key: &str) -> Option<String> {
    let text = String::from_utf8_lossy(stdout);
    let prefix = format!("{key}=");
    text.split_whitespace()
        .find_map(|tok| tok.strip_prefix(prefix.as_str()).map(str::to_string))
}

pub fn report_path(dir: &Path, stdout: &[u8]) -> PathBuf {
    dir.join(field(stdout, "report_path").unwrap())
}
