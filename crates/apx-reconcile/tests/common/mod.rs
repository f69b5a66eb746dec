#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use apx_contract::{load_contract_str, ReferenceContract};
use apx_schemas::symbol;
use apx_schemas::{
    invocation_id, ApiInvocation, BaseUrlClass, Emission, FieldObservation, Method, SinkLocation,
    SourceLocation, TargetResolution, Transport, UNRESOLVED_TARGET,
};

pub const CONTRACT: &str = r#"
version: "v3"
use_cases:
  instrument_info: { streaming: true }
  ticker: { streaming: true, rate_limited: true }
  depth: { streaming: true }
signing_rules:
  signed: { headers: ["X-Signature"] }
entries:
  - target: "/v3/account"
    transport: rest
    method: GET
    signing_rule: signed
  - target: "instrumentInfo.all"
    transport: ws
    method: SUBSCRIBE
    use_case: instrument_info
  - target: "/v3/market/ticker/BTC-USDT"
    transport: rest
    method: GET
  - target: "ticker.BTCUSDT"
    transport: ws
    method: SUBSCRIBE
    use_case: ticker
  - target: "/v3/trades"
    transport: rest
    method: GET
    use_case: ticker
  - target: "orderBook.{symbol}"
    transport: ws
    method: SUBSCRIBE
    use_case: depth
  - target: "/v3/depth"
    transport: rest
    method: GET
    use_case: depth
    required_fields: [symbol]
    optional_fields: [limit]
  - target: "/v3/order"
    transport: rest
    method: POST
    required_fields: [symbol, side]
    optional_fields: [price]
    enums: { side: [BUY, SELL] }
"#;

pub fn contract() -> ReferenceContract {
    load_contract_str(CONTRACT, Some("v3")).unwrap()
}

/// Hand-built invocation; `line` keeps ids distinct.
pub fn inv(line: u32, target: &str, transport: Transport, method: Method) -> ApiInvocation {
    let location = SourceLocation::new("bots/client.py", line, 5);
    ApiInvocation {
        id: invocation_id(&location, line as usize),
        target: target.to_string(),
        method,
        transport,
        base_url_class: None,
        declared_environment: None,
        payload_fields: BTreeMap::new(),
        headers: BTreeSet::new(),
        symbol_format: symbol::observed_format(target),
        source_location: location,
        purpose: String::new(),
        fallback_rationale: None,
        resolution: TargetResolution::Static,
        emissions: Vec::new(),
        pattern: "fixture".to_string(),
    }
}

pub fn unresolved(line: u32, transport: Transport, method: Method) -> ApiInvocation {
    let mut i = inv(line, UNRESOLVED_TARGET, transport, method);
    i.resolution = TargetResolution::Unresolved {
        raw: "{channel}.{symbol}".to_string(),
    };
    i
}

pub fn with_field(mut i: ApiInvocation, name: &str, value: Option<&str>) -> ApiInvocation {
    let obs = match value {
        Some(v) => FieldObservation::literal("string", v),
        None => FieldObservation::expr(),
    };
    i.payload_fields.insert(name.to_string(), obs);
    i
}

pub fn with_header(mut i: ApiInvocation, name: &str) -> ApiInvocation {
    i.headers.insert(name.to_string());
    i
}

pub fn with_log(mut i: ApiInvocation, line: u32, text: &str) -> ApiInvocation {
    i.emissions.push(Emission {
        sink: "logger".to_string(),
        kind: SinkLocation::Log,
        text: text.to_string(),
        evidence: SourceLocation::new(i.source_location.path.clone(), line, 5),
    });
    i
}

pub fn with_environment(
    mut i: ApiInvocation,
    observed: BaseUrlClass,
    declared: BaseUrlClass,
) -> ApiInvocation {
    i.base_url_class = Some(observed);
    i.declared_environment = Some(declared);
    i
}
