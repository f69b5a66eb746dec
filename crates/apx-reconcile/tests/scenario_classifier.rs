//! Scenario: bound call sites are checked against their entry.
//!
//! GREEN when:
//! - `GET /v3/account` without `X-Signature` yields exactly one
//!   `signing_auth`/`critical` discrepancy naming the header.
//! - Missing required fields and enum violations are `critical`; undeclared
//!   fields are `info`.
//! - Transport mismatches follow the severity policy, escalate for
//!   rate-limited use cases, and are suppressed by a fallback rationale.
//! - A testnet base URL in a mainnet context is flagged.

mod common;

use apx_extract::Extraction;
use apx_reconcile::{
    reconcile, AuditOutcome, NoSinkMetadata, SeverityPolicy, TAG_BASE_URL_DRIFT,
    TAG_ENUM_VIOLATION, TAG_MISSING_FIELD, TAG_MISSING_HEADER, TAG_TRANSPORT_MISMATCH,
    TAG_UNKNOWN_FIELD,
};
use apx_schemas::{ApiInvocation, BaseUrlClass, Category, Method, Severity, Transport};
use common::*;

fn run_with(invocations: Vec<ApiInvocation>, policy: &SeverityPolicy) -> AuditOutcome {
    let extraction = Extraction {
        invocations,
        warnings: Vec::new(),
    };
    reconcile(&contract(), extraction, &NoSinkMetadata, policy)
}

fn run(invocations: Vec<ApiInvocation>) -> AuditOutcome {
    run_with(invocations, &SeverityPolicy::default())
}

#[test]
fn unsigned_account_request_is_one_critical_signing_discrepancy() {
    let account = inv(12, "/v3/account", Transport::Rest, Method::Get);
    let id = account.id;

    let out = run(vec![account]);

    let ds = &out.discrepancies[&id];
    assert_eq!(ds.len(), 1, "{ds:?}");
    assert_eq!(ds[0].category, Category::SigningAuth);
    assert_eq!(ds[0].severity, Severity::Critical);
    assert_eq!(ds[0].tag, TAG_MISSING_HEADER);
    assert_eq!(ds[0].field.as_deref(), Some("X-Signature"));
}

#[test]
fn signed_account_request_is_clean() {
    let account = with_header(
        inv(12, "/v3/account", Transport::Rest, Method::Get),
        "x-signature",
    );
    let id = account.id;

    let out = run(vec![account]);
    assert!(out.discrepancies[&id].is_empty());
}

#[test]
fn payload_shape_checks() {
    let order = inv(20, "/v3/order", Transport::Rest, Method::Post);
    let order = with_field(order, "side", Some("HOLD"));
    let order = with_field(order, "qty", None);
    let id = order.id;

    let out = run(vec![order]);
    let ds = &out.discrepancies[&id];

    let tags: Vec<(&str, Option<&str>, Severity)> = ds
        .iter()
        .map(|d| (d.tag.as_str(), d.field.as_deref(), d.severity))
        .collect();
    assert_eq!(
        tags,
        vec![
            (TAG_MISSING_FIELD, Some("symbol"), Severity::Critical),
            (TAG_ENUM_VIOLATION, Some("side"), Severity::Critical),
            (TAG_UNKNOWN_FIELD, Some("qty"), Severity::Info),
        ]
    );
    assert!(ds
        .iter()
        .all(|d| d.category == Category::PayloadShape));
}

#[test]
fn non_literal_enum_value_is_not_judged() {
    let order = inv(20, "/v3/order", Transport::Rest, Method::Post);
    let order = with_field(order, "symbol", Some("BTC-USDT"));
    let order = with_field(order, "side", None);
    let id = order.id;

    let out = run(vec![order]);
    assert!(out.discrepancies[&id].is_empty());
}

#[test]
fn transport_mismatch_follows_policy() {
    let depth = with_field(
        inv(30, "/v3/depth", Transport::Rest, Method::Get),
        "symbol",
        Some("BTC-USDT"),
    );
    let trades = inv(31, "/v3/trades", Transport::Rest, Method::Get);
    let (depth_id, trades_id) = (depth.id, trades.id);

    let out = run(vec![depth.clone(), trades.clone()]);
    let d = &out.discrepancies[&depth_id];
    assert_eq!(d.len(), 1);
    assert_eq!(d[0].tag, TAG_TRANSPORT_MISMATCH);
    assert_eq!(d[0].category, Category::Transport);
    assert_eq!(d[0].severity, Severity::Warning);

    // Rate-limited use case escalates.
    let t = &out.discrepancies[&trades_id];
    assert_eq!(t.len(), 1);
    assert_eq!(t[0].severity, Severity::Critical);

    let strict = SeverityPolicy {
        transport_mismatch: Severity::Critical,
        ..SeverityPolicy::default()
    };
    let out = run_with(vec![depth], &strict);
    assert_eq!(out.discrepancies[&depth_id][0].severity, Severity::Critical);
}

#[test]
fn declared_fallback_suppresses_transport_mismatch() {
    let mut trades = inv(31, "/v3/trades", Transport::Rest, Method::Get);
    trades.fallback_rationale = Some("poll when the socket is down".to_string());
    let id = trades.id;

    let out = run(vec![trades]);
    assert!(out.discrepancies[&id].is_empty());
}

#[test]
fn testnet_url_in_mainnet_context_is_drift() {
    let ticker = with_environment(
        inv(40, "/v3/market/ticker/BTC-USDT", Transport::Rest, Method::Get),
        BaseUrlClass::Testnet,
        BaseUrlClass::Mainnet,
    );
    let id = ticker.id;

    let out = run(vec![ticker]);
    let ds = &out.discrepancies[&id];
    assert_eq!(ds.len(), 1);
    assert_eq!(ds[0].tag, TAG_BASE_URL_DRIFT);
    assert_eq!(ds[0].category, Category::Transport);
    assert_eq!(ds[0].severity, Severity::Warning);
}
