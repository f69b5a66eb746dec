//! Base URL classification from the contract's declared hosts.
//!
//! GREEN when:
//! - A URL on a host the contract lists under `base_urls.testnet` is
//!   classified testnet even without a testnet marker in its name.
//! - Used from a unit declared mainnet, that URL raises base URL drift.
//! - Without the declaration the same host reads as mainnet and no drift
//!   is reported.

use std::fs;
use std::path::Path;

use apx_config::load_layered_yaml_from_strings;
use apx_reconcile::TAG_BASE_URL_DRIFT;
use apx_runtime::{AuditConfig, Orchestrator};
use apx_schemas::BaseUrlClass;

const ENTRIES: &str = r#"
version: "v3"
signing_rules:
  signed: { headers: ["X-Signature"] }
entries:
  - target: "/v3/account"
    transport: rest
    method: GET
    signing_rule: signed
"#;

const HOSTS: &str = r#"base_urls:
  mainnet: { rest: "https://api.exchange.io" }
  testnet: { rest: "https://api.stage-x.io/v3" }
"#;

const MAINNET_BOT_PY: &str = r#"# apx:env=mainnet
BASE_URL = "https://api.stage-x.io"

def fetch_account(session, sig):
    # read balances
    return session.get("/v3/account", headers={"X-Signature": sig})
"#;

fn workspace(contract: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("contract.yaml"), contract).unwrap();
    let bots = dir.path().join("bots");
    fs::create_dir_all(&bots).unwrap();
    fs::write(bots.join("account.py"), MAINNET_BOT_PY).unwrap();
    dir
}

fn config(root: &Path) -> AuditConfig {
    let base = format!(
        r#"
contract:
  path: "{root}/contract.yaml"
  version: "v3"
inventory:
  roots: ["{root}/bots"]
workers: 1
exports_root: "{root}/exports"
"#,
        root = root.display()
    );
    let loaded = load_layered_yaml_from_strings(&[base.as_str()]).unwrap();
    AuditConfig::from_config_json(&loaded.config_json).unwrap()
}

async fn drift_tags(root: &Path) -> (Option<BaseUrlClass>, Vec<String>) {
    let run = Orchestrator::new(config(root)).unwrap().run().await.unwrap();

    assert_eq!(run.outcome.invocations.len(), 1);
    let inv = &run.outcome.invocations[0];
    assert_eq!(inv.declared_environment, Some(BaseUrlClass::Mainnet));

    let tags = run.outcome.discrepancies[&inv.id]
        .iter()
        .filter(|d| d.tag == TAG_BASE_URL_DRIFT)
        .map(|d| d.tag.clone())
        .collect();
    (inv.base_url_class, tags)
}

#[tokio::test]
async fn declared_testnet_host_drifts_in_mainnet_unit() {
    let ws = workspace(&format!("{ENTRIES}{HOSTS}"));

    let (class, tags) = drift_tags(ws.path()).await;

    assert_eq!(class, Some(BaseUrlClass::Testnet));
    assert_eq!(tags, vec![TAG_BASE_URL_DRIFT.to_string()]);
}

#[tokio::test]
async fn undeclared_host_reads_as_mainnet() {
    let ws = workspace(ENTRIES);

    let (class, tags) = drift_tags(ws.path()).await;

    assert_eq!(class, Some(BaseUrlClass::Mainnet));
    assert!(tags.is_empty());
}
