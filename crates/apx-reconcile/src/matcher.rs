use apx_contract::ReferenceContract;
use apx_schemas::symbol::{self, SymbolFormat};
use apx_schemas::{ApiInvocation, ContractKey};

use crate::types::Binding;

/// Matcher result for one invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchOutcome {
    pub binding: Binding,
    /// `(observed, required)` when the call site spells symbols in the other
    /// transport's form. Reported as a payload-shape divergence, never a miss.
    pub symbol_mismatch: Option<(SymbolFormat, SymbolFormat)>,
}

/// Contract lookup key for an invocation: its target rewritten to the
/// transport's symbol form.
pub fn normalized_key(inv: &ApiInvocation) -> ContractKey {
    let target = symbol::normalize_target(&inv.target, inv.transport.symbol_format());
    ContractKey::new(target, inv.transport, inv.method)
}

/// Bind `inv` to its contract entry.
///
/// Exact lookup after normalization first, then the `{symbol}` template the
/// entry may be declared as. Unresolved targets never bind.
pub fn bind(contract: &ReferenceContract, inv: &ApiInvocation) -> MatchOutcome {
    let required = inv.transport.symbol_format();
    let symbol_mismatch = match inv.symbol_format {
        SymbolFormat::Unknown => None,
        observed if observed != required => Some((observed, required)),
        _ => None,
    };

    if inv.is_unresolved() {
        return MatchOutcome {
            binding: Binding::Unmapped,
            symbol_mismatch: None,
        };
    }

    let key = normalized_key(inv);
    let symbol_normalized = key.target != inv.target;

    let binding = if contract.get(&key).is_some() {
        Binding::Mapped {
            key,
            symbol_normalized,
        }
    } else {
        let template = ContractKey::new(
            symbol::generalize_target(&key.target),
            key.transport,
            key.method,
        );
        if template.target != key.target && contract.get(&template).is_some() {
            Binding::Mapped {
                key: template,
                symbol_normalized,
            }
        } else {
            Binding::Unmapped
        }
    };

    MatchOutcome {
        binding,
        symbol_mismatch,
    }
}
