//! Dynamic target resolution.
//!
//! GREEN when:
//! - A symbol-like placeholder resolves to the `{symbol}` template.
//! - A same-unit string constant is substituted into the target.
//! - An unknown placeholder yields `<unresolved>` plus a warning, and the
//!   call site is still emitted.
//! - Configured bindings resolve placeholders the source cannot.
//! - Extraction order and ids are stable across runs.

use apx_extract::{ExtractOptions, Extractor, SourceUnit};
use apx_schemas::{Method, TargetResolution, Transport, UNRESOLVED_TARGET};

const STREAMS_PY: &str = r#"WS_URL = "wss://stream.testnet.exchange.io/v3"
SYMBOL = "BTCUSDT"

def stream_books(ws, symbol, channel):
    ws.subscribe(f"orderBook.{symbol}")
    ws.subscribe(f"trade.{SYMBOL}")
    ws.subscribe(f"{channel}.{symbol}")
    ws.subscribe("instrumentInfo.all")
"#;

const ACCOUNT_RS: &str = r#"const ACCOUNT_PATH: &str = "/v3/account";

pub async fn account(client: &Client, symbol: &str) -> Result<()> {
    client.get(ACCOUNT_PATH).send().await?;
    client.get(&format!("/v3/market/ticker/{}", symbol)).send().await?;
    Ok(())
}
"#;

fn extractor() -> Extractor {
    Extractor::new(ExtractOptions::default()).unwrap()
}

#[test]
fn placeholders_resolve_or_stay_flagged() {
    let got = extractor().extract_unit(&SourceUnit::new("bots/streams.py", STREAMS_PY));

    let targets: Vec<&str> = got.invocations.iter().map(|i| i.target.as_str()).collect();
    assert_eq!(
        targets,
        vec![
            "orderBook.{symbol}",
            "trade.BTCUSDT",
            UNRESOLVED_TARGET,
            "instrumentInfo.all",
        ]
    );

    for inv in &got.invocations {
        assert_eq!(inv.transport, Transport::Ws);
        assert_eq!(inv.method, Method::Subscribe);
    }

    assert_eq!(
        got.invocations[0].resolution,
        TargetResolution::Template {
            template: "orderBook.{symbol}".to_string()
        }
    );
    assert_eq!(got.invocations[3].resolution, TargetResolution::Static);

    let unresolved = &got.invocations[2];
    assert!(unresolved.is_unresolved());
    assert!(unresolved.needs_manual_review());
    assert_eq!(got.warnings.len(), 1);
    assert_eq!(got.warnings[0].invocation_id, unresolved.id);
    assert_eq!(got.warnings[0].raw, "{channel}.{symbol}");
    assert_eq!(got.warnings[0].location.line, 7);
}

#[test]
fn bindings_fill_what_the_source_cannot() {
    let mut options = ExtractOptions::default();
    options
        .bindings
        .insert("channel".to_string(), "depth".to_string());
    let got = Extractor::new(options)
        .unwrap()
        .extract_unit(&SourceUnit::new("bots/streams.py", STREAMS_PY));

    assert_eq!(got.invocations[2].target, "depth.{symbol}");
    assert!(got.warnings.is_empty());
}

#[test]
fn constants_and_format_macros_in_rust_sources() {
    let got = extractor().extract_unit(&SourceUnit::new("src/account.rs", ACCOUNT_RS));
    assert_eq!(got.invocations.len(), 2);

    let account = &got.invocations[0];
    assert_eq!(account.target, "/v3/account");
    assert_eq!(account.method, Method::Get);
    assert_eq!(account.pattern, "rest_const_call");
    assert_eq!(account.purpose, "account");

    let ticker = &got.invocations[1];
    assert_eq!(ticker.target, "/v3/market/ticker/{symbol}");
    assert_eq!(ticker.pattern, "rest_verb_call");
    assert!(got.warnings.is_empty());
}

#[test]
fn extraction_is_stable_across_runs() {
    let e = extractor();
    let units = vec![
        SourceUnit::new("bots/streams.py", STREAMS_PY),
        SourceUnit::new("src/account.rs", ACCOUNT_RS),
    ];
    let first = e.extract_all(&units);
    let second = extractor().extract_all(&units);
    assert_eq!(first, second);

    let lines: Vec<(String, u32)> = first
        .invocations
        .iter()
        .map(|i| (i.source_location.path.clone(), i.source_location.line))
        .collect();
    let mut sorted = lines.clone();
    sorted.sort();
    assert_eq!(lines, sorted, "scan order is inventory then offset order");
}
