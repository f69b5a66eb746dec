use anyhow::{Context, Result};
use apx_contract::{load_contract_str, ReferenceContract};
use serde_json::{json, Map, Value};

/// A mid-sized exchange contract: signed account endpoints, a rate-limited
/// streaming ticker, and a templated order book topic.
pub const EXCHANGE_CONTRACT: &str = r#"
version: "v3.2"
base_urls:
  mainnet: { rest: "https://api.exchange.io", ws: "wss://ws.exchange.io" }
  testnet: { rest: "https://api-testnet.exchange.io", ws: "wss://ws-testnet.exchange.io" }
use_cases:
  account: { streaming: false }
  ticker: { streaming: true, rate_limited: true }
  book: { streaming: true }
signing_rules:
  hmac: { headers: ["X-Api-Key", "X-Signature"] }
entries:
  - target: "/v3/account"
    transport: rest
    method: GET
    use_case: account
    signing_rule: hmac
  - target: "/v3/order"
    transport: rest
    method: POST
    use_case: account
    signing_rule: hmac
    required_fields: [symbol, side]
    optional_fields: [price, clientOrderId]
    enums: { side: [BUY, SELL] }
  - target: "/v3/ticker"
    transport: rest
    method: GET
    use_case: ticker
    required_fields: [symbol]
  - target: "ticker.{symbol}"
    transport: ws
    method: SUBSCRIBE
    use_case: ticker
  - target: "orderBook.{symbol}"
    transport: ws
    method: SUBSCRIBE
    use_case: book
"#;

/// One contract entry, built up field by field.
#[derive(Debug, Clone)]
pub struct EntryFixture {
    target: String,
    transport: String,
    method: String,
    use_case: Option<String>,
    required: Vec<String>,
    optional: Vec<String>,
    enums: Vec<(String, Vec<String>)>,
    signing_rule: Option<String>,
}

impl EntryFixture {
    pub fn rest(method: &str, target: &str) -> Self {
        Self::new("rest", method, target)
    }

    pub fn ws(method: &str, target: &str) -> Self {
        Self::new("ws", method, target)
    }

    fn new(transport: &str, method: &str, target: &str) -> Self {
        Self {
            target: target.to_string(),
            transport: transport.to_string(),
            method: method.to_string(),
            use_case: None,
            required: Vec::new(),
            optional: Vec::new(),
            enums: Vec::new(),
            signing_rule: None,
        }
    }

    pub fn use_case(mut self, name: &str) -> Self {
        self.use_case = Some(name.to_string());
        self
    }

    pub fn required(mut self, fields: &[&str]) -> Self {
        self.required.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn optional(mut self, fields: &[&str]) -> Self {
        self.optional.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn enumerated(mut self, field: &str, values: &[&str]) -> Self {
        self.enums.push((
            field.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        ));
        self
    }

    pub fn signed_by(mut self, rule: &str) -> Self {
        self.signing_rule = Some(rule.to_string());
        self
    }

    fn to_value(&self) -> Value {
        let mut m = Map::new();
        m.insert("target".into(), json!(self.target));
        m.insert("transport".into(), json!(self.transport));
        m.insert("method".into(), json!(self.method));
        if let Some(u) = &self.use_case {
            m.insert("use_case".into(), json!(u));
        }
        if !self.required.is_empty() {
            m.insert("required_fields".into(), json!(self.required));
        }
        if !self.optional.is_empty() {
            m.insert("optional_fields".into(), json!(self.optional));
        }
        if !self.enums.is_empty() {
            let enums: Map<String, Value> = self
                .enums
                .iter()
                .map(|(k, v)| (k.clone(), json!(v)))
                .collect();
            m.insert("enums".into(), Value::Object(enums));
        }
        if let Some(s) = &self.signing_rule {
            m.insert("signing_rule".into(), json!(s));
        }
        Value::Object(m)
    }
}

/// A contract document assembled in code and rendered to YAML, so tests go
/// through the same loader as real contracts.
#[derive(Debug, Clone)]
pub struct ContractFixture {
    version: String,
    use_cases: Map<String, Value>,
    signing_rules: Map<String, Value>,
    entries: Vec<EntryFixture>,
}

impl ContractFixture {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            use_cases: Map::new(),
            signing_rules: Map::new(),
            entries: Vec::new(),
        }
    }

    pub fn use_case(mut self, name: &str, streaming: bool, rate_limited: bool) -> Self {
        self.use_cases.insert(
            name.to_string(),
            json!({ "streaming": streaming, "rate_limited": rate_limited }),
        );
        self
    }

    pub fn signing_rule(mut self, name: &str, headers: &[&str]) -> Self {
        self.signing_rules
            .insert(name.to_string(), json!({ "headers": headers }));
        self
    }

    pub fn entry(mut self, entry: EntryFixture) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn to_yaml(&self) -> Result<String> {
        let doc = json!({
            "version": self.version,
            "use_cases": Value::Object(self.use_cases.clone()),
            "signing_rules": Value::Object(self.signing_rules.clone()),
            "entries": self.entries.iter().map(EntryFixture::to_value).collect::<Vec<_>>(),
        });
        serde_yaml::to_string(&doc).context("render contract fixture failed")
    }

    pub fn load(&self) -> Result<ReferenceContract> {
        let yaml = self.to_yaml()?;
        Ok(load_contract_str(&yaml, Some(&self.version))?)
    }
}
