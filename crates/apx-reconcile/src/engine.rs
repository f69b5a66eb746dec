use std::collections::BTreeMap;

use apx_contract::ReferenceContract;
use apx_extract::Extraction;
use apx_schemas::{symbol, ApiInvocation, ContractKey, Discrepancy, SensitiveDataFinding};

use crate::classifier;
use crate::consolidate;
use crate::matcher;
use crate::scanner;
use crate::types::{
    AuditOutcome, AuditWarning, Binding, Coverage, SeverityPolicy, SinkMetadata,
    SinkMetadataSource,
};

/// Everything derived from one invocation alone. Independent of every other
/// invocation, so it can be computed on any worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationAudit {
    pub binding: Binding,
    pub discrepancies: Vec<Discrepancy>,
    pub findings: Vec<SensitiveDataFinding>,
    pub warnings: Vec<AuditWarning>,
}

/// Match, classify and scan one invocation.
///
/// Unmapped invocations get exactly one `transport`/`critical` discrepancy and
/// no field-level classification. The scanner runs either way.
pub fn evaluate_invocation(
    contract: &ReferenceContract,
    inv: &ApiInvocation,
    sinks: Option<&SinkMetadata>,
    policy: &SeverityPolicy,
) -> InvocationAudit {
    let matched = matcher::bind(contract, inv);

    let mut discrepancies = match matched.binding.key().and_then(|k| contract.get(k)) {
        Some(entry) => classifier::classify(contract, inv, entry, matched.symbol_mismatch, policy),
        None => vec![classifier::unmapped(inv)],
    };

    let scan = scanner::scan(inv, sinks);
    discrepancies.extend(scan.discrepancies);

    InvocationAudit {
        binding: matched.binding,
        discrepancies,
        findings: scan.findings,
        warnings: scan.warnings,
    }
}

/// Group key for consolidation: the bound contract key, or the normalized
/// target for resolved invocations the contract does not know. Unresolved
/// invocations are never grouped.
fn group_key(inv: &ApiInvocation, binding: &Binding) -> Option<ContractKey> {
    if inv.is_unresolved() {
        return None;
    }
    match binding {
        Binding::Mapped { key, .. } => Some(key.clone()),
        Binding::Unmapped => {
            let target = symbol::normalize_target(&inv.target, inv.transport.symbol_format());
            Some(ContractKey::new(target, inv.transport, inv.method))
        }
    }
}

/// Combine per-invocation results (in scan order) into the full outcome:
/// consolidation over all invocations, coverage, and warnings.
pub fn assemble(
    contract: &ReferenceContract,
    extraction: Extraction,
    audits: Vec<InvocationAudit>,
) -> AuditOutcome {
    let Extraction {
        invocations,
        warnings: extract_warnings,
    } = extraction;

    let mut warnings: Vec<AuditWarning> = extract_warnings
        .into_iter()
        .map(|w| AuditWarning::UnresolvedTarget {
            invocation_id: w.invocation_id,
            location: w.location,
            raw: w.raw,
        })
        .collect();

    let mut bindings = BTreeMap::new();
    let mut discrepancies: BTreeMap<_, Vec<Discrepancy>> = BTreeMap::new();
    let mut findings = Vec::new();

    for (inv, audit) in invocations.iter().zip(audits) {
        bindings.insert(inv.id, audit.binding);
        discrepancies.insert(inv.id, audit.discrepancies);
        findings.extend(audit.findings);
        warnings.extend(audit.warnings);
    }
    for inv in &invocations {
        bindings.entry(inv.id).or_insert(Binding::Unmapped);
        discrepancies.entry(inv.id).or_default();
    }

    let consolidation = consolidate::analyze(invocations.iter().filter_map(|inv| {
        let binding = bindings.get(&inv.id)?;
        group_key(inv, binding).map(|k| (k, inv))
    }));
    for d in consolidation.discrepancies {
        discrepancies.entry(d.invocation_id).or_default().push(d);
    }

    let mapped = bindings.values().filter(|b| b.is_mapped()).count();
    let unresolved = invocations.iter().filter(|i| i.is_unresolved()).count();
    let coverage = Coverage::from_counts(invocations.len(), mapped, unresolved);

    AuditOutcome {
        contract_version: contract.version().to_string(),
        invocations,
        bindings,
        discrepancies,
        findings,
        decisions: consolidation.decisions,
        coverage,
        warnings,
    }
}

/// Single-threaded audit over an extraction.
pub fn reconcile(
    contract: &ReferenceContract,
    extraction: Extraction,
    sinks: &dyn SinkMetadataSource,
    policy: &SeverityPolicy,
) -> AuditOutcome {
    let audits: Vec<InvocationAudit> = extraction
        .invocations
        .iter()
        .map(|inv| {
            evaluate_invocation(
                contract,
                inv,
                sinks.sinks_for(&inv.source_location.path),
                policy,
            )
        })
        .collect();
    assemble(contract, extraction, audits)
}
