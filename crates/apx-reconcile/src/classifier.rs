//! Discrepancy classifier.
//!
//! Checks a bound (invocation, entry) pair in a fixed order: transport, symbol
//! format, required fields, enums, signing headers, base URL class, undeclared
//! fields. Every applicable violation is emitted; each check covers disjoint
//! fields, so one field never yields two discrepancies.

use apx_contract::ReferenceContract;
use apx_schemas::symbol::SymbolFormat;
use apx_schemas::{ApiInvocation, Category, ContractEntry, Discrepancy, Severity};

use crate::types::SeverityPolicy;

pub const TAG_UNMAPPED: &str = "unmapped";
pub const TAG_TRANSPORT_MISMATCH: &str = "transport_mismatch";
pub const TAG_SYMBOL_FORMAT: &str = "symbol_format";
pub const TAG_MISSING_FIELD: &str = "missing_field";
pub const TAG_ENUM_VIOLATION: &str = "enum_violation";
pub const TAG_MISSING_HEADER: &str = "missing_header";
pub const TAG_BASE_URL_DRIFT: &str = "base_url_drift";
pub const TAG_UNKNOWN_FIELD: &str = "unknown_field";

/// Orphan invocation: no contract entry, so no field-level checks.
pub fn unmapped(inv: &ApiInvocation) -> Discrepancy {
    let detail = match &inv.resolution {
        apx_schemas::TargetResolution::Unresolved { raw } => {
            format!("unresolved dynamic target `{raw}`; no contract entry can be bound")
        }
        _ => format!(
            "no contract entry for {} {} {}",
            inv.transport, inv.method, inv.target
        ),
    };
    let remediation = if inv.is_unresolved() {
        "classify the call site manually or add an extract binding for its placeholders"
    } else {
        "route the call through a documented endpoint or add the entry to the contract"
    };
    Discrepancy::new(
        inv.id,
        Category::Transport,
        Severity::Critical,
        TAG_UNMAPPED,
        None,
        detail,
        remediation,
    )
}

pub fn classify(
    contract: &ReferenceContract,
    inv: &ApiInvocation,
    entry: &ContractEntry,
    symbol_mismatch: Option<(SymbolFormat, SymbolFormat)>,
    policy: &SeverityPolicy,
) -> Vec<Discrepancy> {
    let mut out = Vec::new();

    // 1) Transport vs the use case's designated transport.
    if let Some(use_case) = contract.use_case(&entry.use_case) {
        let designated = use_case.designated_transport();
        if inv.transport != designated && inv.fallback_rationale.is_none() {
            let severity = if use_case.rate_limited {
                policy.transport_mismatch_rate_limited
            } else {
                policy.transport_mismatch
            };
            out.push(Discrepancy::new(
                inv.id,
                Category::Transport,
                severity,
                TAG_TRANSPORT_MISMATCH,
                None,
                format!(
                    "use case '{}' is designated {} but the call site uses {}",
                    use_case.name, designated, inv.transport
                ),
                format!(
                    "move the call to {designated} or record an apx:fallback rationale"
                ),
            ));
        }
    }

    // Symbol spelling flagged by the matcher.
    if let Some((observed, required)) = symbol_mismatch {
        out.push(Discrepancy::new(
            inv.id,
            Category::PayloadShape,
            Severity::Warning,
            TAG_SYMBOL_FORMAT,
            None,
            format!(
                "symbol spelled in {} form, {} requires {} form",
                observed.as_str(),
                inv.transport,
                required.as_str()
            ),
            format!("convert the symbol to {} form", required.as_str()),
        ));
    }

    // 2) Required fields.
    for field in &entry.required_fields {
        if !inv.payload_fields.contains_key(field) {
            out.push(Discrepancy::new(
                inv.id,
                Category::PayloadShape,
                Severity::Critical,
                TAG_MISSING_FIELD,
                Some(field.as_str()),
                format!("required field '{field}' is not sent"),
                format!("add '{field}' to the payload"),
            ));
        }
    }

    // 3) Enums, where the value is statically known.
    for (field, allowed) in &entry.enums {
        let Some(value) = inv
            .payload_fields
            .get(field)
            .and_then(|obs| obs.value.as_deref())
        else {
            continue;
        };
        if !allowed.contains(value) {
            let allowed_list: Vec<&str> = allowed.iter().map(String::as_str).collect();
            out.push(Discrepancy::new(
                inv.id,
                Category::PayloadShape,
                Severity::Critical,
                TAG_ENUM_VIOLATION,
                Some(field.as_str()),
                format!(
                    "field '{field}' is '{value}', allowed: {}",
                    allowed_list.join("|")
                ),
                format!("use one of {}", allowed_list.join(", ")),
            ));
        }
    }

    // 4) Signing headers.
    for header in &entry.signing_rule.required_headers {
        if !inv.has_header(header) {
            out.push(Discrepancy::new(
                inv.id,
                Category::SigningAuth,
                Severity::Critical,
                TAG_MISSING_HEADER,
                Some(header.as_str()),
                format!(
                    "signing rule '{}' requires header '{header}'",
                    entry.signing_rule.name
                ),
                format!("sign the request and send '{header}'"),
            ));
        }
    }

    // 5) Base URL class vs declared environment.
    if let (Some(observed), Some(declared)) = (inv.base_url_class, inv.declared_environment) {
        if observed != declared {
            out.push(Discrepancy::new(
                inv.id,
                Category::Transport,
                policy.base_url_drift,
                TAG_BASE_URL_DRIFT,
                None,
                format!("{observed} base URL used in a {declared} context"),
                format!("use the {declared} base URL"),
            ));
        }
    }

    // Fields the contract does not declare.
    for field in inv.payload_fields.keys() {
        if !entry.declares_field(field) {
            out.push(Discrepancy::new(
                inv.id,
                Category::PayloadShape,
                Severity::Info,
                TAG_UNKNOWN_FIELD,
                Some(field.as_str()),
                format!("field '{field}' is not declared by the contract"),
                format!("drop '{field}' or declare it in the contract"),
            ));
        }
    }

    out
}
