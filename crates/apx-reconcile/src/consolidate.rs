//! Consolidation analyzer.
//!
//! Groups invocations by (`target`, `transport`, `method`) and proposes a
//! decision for every group with two or more members. Decisions are created
//! in `identified`; the engine never accepts or rejects them.

use std::collections::{BTreeMap, BTreeSet};

use apx_schemas::{
    ApiInvocation, Category, ConsolidationDecision, ContractKey, Discrepancy, Recommendation,
    Severity,
};

pub const TAG_DUPLICATE_CALL_SITE: &str = "duplicate_call_site";

/// Words too common to show two purposes describe the same feature.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "from", "with", "this", "that", "into", "call", "calls", "send", "get",
];

fn purpose_words(purpose: &str) -> BTreeSet<String> {
    purpose
        .split(|c: char| !c.is_ascii_alphanumeric())
        .map(|w| w.to_ascii_lowercase())
        .filter(|w| w.len() >= 3 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Two purposes overlap when they are equal (ignoring case and spacing) or
/// share a significant word. An empty purpose overlaps with anything.
pub fn purposes_overlap(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() || a.eq_ignore_ascii_case(b) {
        return true;
    }
    let wa = purpose_words(a);
    let wb = purpose_words(b);
    wa.intersection(&wb).next().is_some()
}

fn recommend(members: &[&ApiInvocation]) -> (Recommendation, String) {
    let n = members.len();

    let with_fallback = members
        .iter()
        .filter(|m| m.fallback_rationale.is_some())
        .count();
    if with_fallback > 0 && with_fallback < n {
        let reason = members
            .iter()
            .find_map(|m| m.fallback_rationale.as_deref())
            .unwrap_or_default();
        return (
            Recommendation::Retain,
            format!("{with_fallback} of {n} call sites are a declared fallback ({reason}); primary and fallback paths are distinct"),
        );
    }

    let first_keys: Vec<&String> = members[0].payload_fields.keys().collect();
    let same_payload = members
        .iter()
        .all(|m| m.payload_fields.keys().collect::<Vec<_>>() == first_keys);
    if !same_payload {
        return (
            Recommendation::Retain,
            format!("{n} call sites send different payload fields"),
        );
    }

    for (i, a) in members.iter().enumerate() {
        for b in &members[i + 1..] {
            if !purposes_overlap(&a.purpose, &b.purpose) {
                return (
                    Recommendation::Retain,
                    format!(
                        "purposes are distinct: '{}' at {} vs '{}' at {}",
                        a.purpose, a.source_location, b.purpose, b.source_location
                    ),
                );
            }
        }
    }

    (
        Recommendation::Consolidate,
        format!("{n} call sites send identical payload fields for the same purpose; route them through one helper"),
    )
}

/// Decisions plus one linked `redundancy`/`info` discrepancy per member.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Consolidation {
    pub decisions: Vec<ConsolidationDecision>,
    pub discrepancies: Vec<Discrepancy>,
}

/// `keyed` pairs each groupable invocation with its target key, in scan order.
/// Decisions come out ordered by key.
pub fn analyze<'a>(keyed: impl IntoIterator<Item = (ContractKey, &'a ApiInvocation)>) -> Consolidation {
    let mut groups: BTreeMap<ContractKey, Vec<&ApiInvocation>> = BTreeMap::new();
    for (key, inv) in keyed {
        groups.entry(key).or_default().push(inv);
    }

    let mut out = Consolidation::default();
    for (key, members) in groups {
        if members.len() < 2 {
            continue;
        }
        let (recommendation, rationale) = recommend(&members);
        let decision = ConsolidationDecision::identified(
            key.clone(),
            members.iter().map(|m| m.id).collect(),
            recommendation,
            rationale,
        );

        for m in &members {
            out.discrepancies.push(
                Discrepancy::new(
                    m.id,
                    Category::Redundancy,
                    Severity::Info,
                    TAG_DUPLICATE_CALL_SITE,
                    None,
                    format!(
                        "one of {} call sites for {key}; recommendation: {}",
                        members.len(),
                        recommendation.as_str()
                    ),
                    "follow the linked consolidation decision",
                )
                .linked_to(decision.id),
            );
        }
        out.decisions.push(decision);
    }
    out
}
