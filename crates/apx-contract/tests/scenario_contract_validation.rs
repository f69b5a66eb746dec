//! Malformed or ambiguous entries abort loading with a typed error.

use apx_contract::{load_contract_file, load_contract_str, ContractParseError};
use apx_schemas::{BaseUrlClass, ContractKey, Method, Transport};

const FULL: &str = r#"
version: "v3.2"
base_urls:
  mainnet: { rest: "https://api.exchange.io", ws: "wss://ws.exchange.io" }
  testnet: { rest: "https://api-testnet.exchange.io", ws: "wss://ws-testnet.exchange.io" }
use_cases:
  ticker: { streaming: true, rate_limited: true }
signing_rules:
  hmac: { headers: ["X-Api-Key", "X-Timestamp", "X-Signature"] }
entries:
  - target: "/v3/account"
    transport: rest
    method: GET
    signing_rule: hmac
  - target: "/v3/market/ticker/BTCUSDT"
    transport: rest
    method: GET
    use_case: ticker
  - target: "ticker.BTC-USDT"
    transport: ws
    method: SUBSCRIBE
    use_case: ticker
  - target: "/v3/order"
    transport: rest
    method: POST
    signing_rule: hmac
    required_fields: [symbol, side, type, quantity]
    optional_fields: [price, clientOrderId]
    enums:
      side: [BUY, SELL]
      type: [LIMIT, MARKET]
"#;

fn with_entry(entry: &str) -> String {
    format!("version: \"v3\"\nentries:\n{entry}")
}

#[test]
fn full_document_loads_with_normalized_targets() {
    let c = load_contract_str(FULL, Some("v3.2")).unwrap();
    assert_eq!(c.len(), 4);

    // REST target stored in dash form, WS topic in concatenated form.
    assert!(c
        .get(&ContractKey::new("/v3/market/ticker/BTC-USDT", Transport::Rest, Method::Get))
        .is_some());
    assert!(c
        .get(&ContractKey::new("ticker.BTCUSDT", Transport::Ws, Method::Subscribe))
        .is_some());

    let account = c
        .get(&ContractKey::new("/v3/account", Transport::Rest, Method::Get))
        .unwrap();
    assert_eq!(
        account.signing_rule.required_headers,
        vec!["X-Api-Key", "X-Timestamp", "X-Signature"]
    );

    let ticker = c.use_case("ticker").unwrap();
    assert!(ticker.streaming);
    assert!(ticker.rate_limited);
    assert_eq!(ticker.designated_transport(), Transport::Ws);

    assert_eq!(c.hosts_for(BaseUrlClass::Testnet), vec![
        "api-testnet.exchange.io".to_string(),
        "ws-testnet.exchange.io".to_string()
    ]);
}

#[test]
fn version_mismatch_rejected() {
    let err = load_contract_str(FULL, Some("v4")).unwrap_err();
    assert_eq!(
        err,
        ContractParseError::VersionMismatch {
            expected: "v4".to_string(),
            found: "v3.2".to_string()
        }
    );
}

#[test]
fn method_must_fit_transport() {
    let doc = with_entry("  - { target: \"ticker.BTCUSDT\", transport: ws, method: GET }\n");
    assert!(matches!(
        load_contract_str(&doc, None).unwrap_err(),
        ContractParseError::MethodTransportMismatch { .. }
    ));
}

#[test]
fn unknown_signing_rule_rejected() {
    let doc = with_entry(
        "  - { target: \"/v3/account\", transport: rest, method: GET, signing_rule: rsa }\n",
    );
    assert!(matches!(
        load_contract_str(&doc, None).unwrap_err(),
        ContractParseError::UnknownSigningRule { .. }
    ));
}

#[test]
fn unknown_use_case_rejected() {
    let doc = with_entry(
        "  - { target: \"/v3/account\", transport: rest, method: GET, use_case: nope }\n",
    );
    assert!(matches!(
        load_contract_str(&doc, None).unwrap_err(),
        ContractParseError::UnknownUseCase { .. }
    ));
}

#[test]
fn field_cannot_be_both_required_and_optional() {
    let doc = with_entry(
        "  - { target: \"/v3/order\", transport: rest, method: POST, required_fields: [side], optional_fields: [side] }\n",
    );
    assert!(matches!(
        load_contract_str(&doc, None).unwrap_err(),
        ContractParseError::FieldBothRequiredAndOptional { .. }
    ));
}

#[test]
fn enum_must_target_declared_field() {
    let doc = with_entry(
        "  - { target: \"/v3/order\", transport: rest, method: POST, required_fields: [symbol], enums: { side: [BUY] } }\n",
    );
    assert!(matches!(
        load_contract_str(&doc, None).unwrap_err(),
        ContractParseError::EnumOnUndeclaredField { .. }
    ));
}

#[test]
fn symbol_format_must_match_transport() {
    let doc = with_entry(
        "  - { target: \"ticker.BTCUSDT\", transport: ws, method: SUBSCRIBE, symbol_format: dash }\n",
    );
    assert!(matches!(
        load_contract_str(&doc, None).unwrap_err(),
        ContractParseError::SymbolFormatConflict { .. }
    ));
}

#[test]
fn invalid_yaml_is_malformed() {
    assert!(matches!(
        load_contract_str("version: [unterminated", None).unwrap_err(),
        ContractParseError::Malformed { .. }
    ));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_contract_file(dir.path().join("absent.yaml"), None).unwrap_err();
    assert!(matches!(err, ContractParseError::Io { .. }));
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contract.yaml");
    std::fs::write(&path, FULL).unwrap();
    let c = load_contract_file(&path, None).unwrap();
    assert_eq!(c.version(), "v3.2");
}
