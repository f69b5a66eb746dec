//! Sensitive data scanner.
//!
//! For every emission near a call site, detect secret-bearing data by key
//! vocabulary and decide whether the sink redacts it. Unknown redaction status
//! is treated as plain (fail-closed) and noted.

use apx_schemas::{
    ApiInvocation, Category, DataType, Discrepancy, Emission, Handling, SensitiveDataFinding,
    Severity,
};

use crate::types::{AuditWarning, SinkMetadata};

pub const TAG_PLAIN_EXPOSURE: &str = "plain_exposure";
pub const NOTE_SINK_METADATA_MISSING: &str = "sink metadata missing";

/// Identifier vocabulary per data type, lower-cased.
pub fn vocabulary(data_type: DataType) -> &'static [&'static str] {
    match data_type {
        DataType::ApiKey => &["api_key", "apikey", "x-api-key", "access_key"],
        DataType::Passphrase => &["passphrase", "pass_phrase", "x-passphrase"],
        DataType::Signature => &["signature", "x-signature", "sign"],
        DataType::WalletAddress => &["wallet_address", "walletaddress", "address", "wallet"],
        DataType::ClientOrderId => &["client_order_id", "clientorderid", "clordid", "cl_ord_id"],
    }
}

const REDACTION_HELPERS: &[&str] = &["redact(", "mask(", "REDACTED", "***"];

/// Words that dump a whole container into the sink.
const PAYLOAD_WORDS: &[&str] = &["params", "payload", "body", "json", "data"];
const HEADER_WORDS: &[&str] = &["headers"];

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whole-word, case-insensitive occurrence of `word` in `text`.
fn contains_word(text: &str, word: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    let mut from = 0;
    while let Some(pos) = lower[from..].find(word) {
        let start = from + pos;
        let end = start + word.len();
        let before_ok = lower[..start].chars().next_back().map_or(true, |c| !is_ident_char(c));
        let after_ok = lower[end..].chars().next().map_or(true, |c| !is_ident_char(c));
        if before_ok && after_ok {
            return true;
        }
        from = start + 1;
    }
    false
}

/// Data type a single field or header name belongs to.
pub fn classify_name(name: &str) -> Option<DataType> {
    let lower = name.to_ascii_lowercase();
    DataType::ALL
        .into_iter()
        .find(|dt| vocabulary(*dt).contains(&lower.as_str()))
}

/// Data types whose vocabulary appears in `text`, or that reach it through a
/// dumped payload/header container.
pub fn data_types_in(text: &str, inv: &ApiInvocation) -> Vec<DataType> {
    let mut found: Vec<DataType> = DataType::ALL
        .into_iter()
        .filter(|dt| vocabulary(*dt).iter().any(|w| contains_word(text, w)))
        .collect();

    if PAYLOAD_WORDS.iter().any(|w| contains_word(text, w)) {
        add_named(&mut found, inv.payload_fields.keys());
    }
    if HEADER_WORDS.iter().any(|w| contains_word(text, w)) {
        add_named(&mut found, inv.headers.iter());
    }

    found.sort();
    found
}

fn add_named<'a>(found: &mut Vec<DataType>, names: impl Iterator<Item = &'a String>) {
    for name in names {
        if let Some(dt) = classify_name(name) {
            if !found.contains(&dt) {
                found.push(dt);
            }
        }
    }
}

fn uses_redaction_helper(text: &str) -> bool {
    REDACTION_HELPERS.iter().any(|h| text.contains(h))
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub findings: Vec<SensitiveDataFinding>,
    /// One `data_safety`/`critical` discrepancy per plain finding.
    pub discrepancies: Vec<Discrepancy>,
    pub warnings: Vec<AuditWarning>,
}

/// Scan one invocation's emissions. `sinks` is the metadata for the
/// invocation's source location, if any was supplied.
pub fn scan(inv: &ApiInvocation, sinks: Option<&SinkMetadata>) -> ScanResult {
    let mut out = ScanResult::default();
    for emission in &inv.emissions {
        scan_emission(inv, emission, sinks, &mut out);
    }
    out
}

fn scan_emission(
    inv: &ApiInvocation,
    emission: &Emission,
    sinks: Option<&SinkMetadata>,
    out: &mut ScanResult,
) {
    let types = data_types_in(&emission.text, inv);
    if types.is_empty() {
        return;
    }

    let declared = sinks.and_then(|m| m.redacts(&emission.sink));
    let helper = uses_redaction_helper(&emission.text);
    let (handling, metadata_missing) = match (declared, helper) {
        (Some(true), _) | (_, true) => (Handling::Redacted, false),
        (Some(false), false) => (Handling::Plain, false),
        (None, false) => (Handling::Plain, true),
    };

    if metadata_missing {
        out.warnings.push(AuditWarning::SinkMetadataMissing {
            invocation_id: inv.id,
            evidence: emission.evidence.clone(),
            sink: emission.sink.clone(),
        });
    }

    for data_type in types {
        let mut finding = SensitiveDataFinding::new(
            inv.id,
            data_type,
            emission.kind,
            handling,
            emission.evidence.clone(),
            emission.sink.clone(),
        );
        if metadata_missing {
            finding.note = Some(NOTE_SINK_METADATA_MISSING.to_string());
        }

        if handling == Handling::Plain {
            let field = format!("{}@{}", data_type.as_str(), emission.evidence.line);
            let d = Discrepancy::new(
                inv.id,
                Category::DataSafety,
                Severity::Critical,
                TAG_PLAIN_EXPOSURE,
                Some(field.as_str()),
                format!(
                    "{} reaches {} sink '{}' unredacted at {}",
                    data_type, emission.kind, emission.sink, emission.evidence
                ),
                format!("redact {} before it reaches '{}'", data_type, emission.sink),
            );
            finding.discrepancy_id = Some(d.id);
            out.discrepancies.push(d);
        }

        out.findings.push(finding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_word_matching() {
        assert!(contains_word("log(passphrase)", "passphrase"));
        assert!(contains_word("X-Api-Key: %s", "x-api-key"));
        assert!(!contains_word("signal received", "sign"));
        assert!(!contains_word("my_passphrase_hash", "passphrase"));
    }

    #[test]
    fn names_classify_case_insensitively() {
        assert_eq!(classify_name("X-Signature"), Some(DataType::Signature));
        assert_eq!(classify_name("clOrdId"), Some(DataType::ClientOrderId));
        assert_eq!(classify_name("apiKey"), Some(DataType::ApiKey));
        assert_eq!(classify_name("symbol"), None);
    }

    #[test]
    fn redaction_helpers_detected() {
        assert!(uses_redaction_helper("logger.info(mask(api_key))"));
        assert!(uses_redaction_helper("print('key=***')"));
        assert!(!uses_redaction_helper("print(api_key)"));
    }
}
