use std::collections::{BTreeMap, BTreeSet};

use apx_schemas::symbol;
use apx_schemas::{
    invocation_id, ApiInvocation, BaseUrlClass, Emission, FieldObservation, Method, SinkLocation,
    SourceLocation, TargetResolution, Transport, UNRESOLVED_TARGET,
};

/// Hand-built [`ApiInvocation`] for engine-level tests that skip extraction.
///
/// The id is derived from path and line the same way the extractor derives
/// it: two builders at the same path and line get the same id.
#[derive(Debug, Clone)]
pub struct InvocationBuilder {
    inv: ApiInvocation,
}

impl InvocationBuilder {
    pub fn new(path: &str, line: u32, target: &str, transport: Transport, method: Method) -> Self {
        let location = SourceLocation::new(path, line, 5);
        Self {
            inv: ApiInvocation {
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
                pattern: "testkit".to_string(),
            },
        }
    }

    pub fn rest(path: &str, line: u32, method: Method, target: &str) -> Self {
        Self::new(path, line, target, Transport::Rest, method)
    }

    pub fn ws(path: &str, line: u32, target: &str) -> Self {
        Self::new(path, line, target, Transport::Ws, Method::Subscribe)
    }

    /// Dynamic target the extractor could not resolve.
    pub fn unresolved(mut self, raw: &str) -> Self {
        self.inv.target = UNRESOLVED_TARGET.to_string();
        self.inv.symbol_format = symbol::observed_format(UNRESOLVED_TARGET);
        self.inv.resolution = TargetResolution::Unresolved {
            raw: raw.to_string(),
        };
        self
    }

    /// `value` is the literal when statically known.
    pub fn field(mut self, name: &str, value: Option<&str>) -> Self {
        let obs = match value {
            Some(v) => FieldObservation::literal("string", v),
            None => FieldObservation::expr(),
        };
        self.inv.payload_fields.insert(name.to_string(), obs);
        self
    }

    pub fn header(mut self, name: &str) -> Self {
        self.inv.headers.insert(name.to_string());
        self
    }

    pub fn purpose(mut self, text: &str) -> Self {
        self.inv.purpose = text.to_string();
        self
    }

    pub fn fallback(mut self, rationale: &str) -> Self {
        self.inv.fallback_rationale = Some(rationale.to_string());
        self
    }

    pub fn environment(mut self, observed: BaseUrlClass, declared: BaseUrlClass) -> Self {
        self.inv.base_url_class = Some(observed);
        self.inv.declared_environment = Some(declared);
        self
    }

    pub fn emits(mut self, sink: &str, kind: SinkLocation, line: u32, text: &str) -> Self {
        let evidence = SourceLocation::new(self.inv.source_location.path.clone(), line, 5);
        self.inv.emissions.push(Emission {
            sink: sink.to_string(),
            kind,
            text: text.to_string(),
            evidence,
        });
        self
    }

    pub fn logs(self, line: u32, text: &str) -> Self {
        self.emits("logger", SinkLocation::Log, line, text)
    }

    pub fn build(self) -> ApiInvocation {
        self.inv
    }
}
