//! Sink metadata per inventory path, from the `sinks:` config entries.
//!
//! Every entry whose glob matches a path contributes its rules; a later
//! entry overrides an earlier one for the same sink name. Paths no entry
//! matches get no metadata at all, which the scanner treats as plain.

use anyhow::{Context, Result};
use apx_extract::SourceUnit;
use apx_reconcile::{SinkMetadata, SinkRule};
use globset::{Glob, GlobMatcher};
use std::collections::BTreeMap;

use crate::settings::SinkSettings;

pub fn sink_metadata_for(
    units: &[SourceUnit],
    settings: &[SinkSettings],
) -> Result<BTreeMap<String, SinkMetadata>> {
    let mut matchers: Vec<(GlobMatcher, &[SinkRule])> = Vec::with_capacity(settings.len());
    for s in settings {
        let glob = Glob::new(&s.paths)
            .with_context(|| format!("CONFIG_INVALID: invalid sinks glob {:?}", s.paths))?;
        matchers.push((glob.compile_matcher(), s.rules.as_slice()));
    }

    let mut out = BTreeMap::new();
    for unit in units {
        let mut rules: Vec<SinkRule> = Vec::new();
        let mut matched = false;
        for (m, entry_rules) in &matchers {
            if !m.is_match(&unit.path) {
                continue;
            }
            matched = true;
            for r in *entry_rules {
                match rules.iter_mut().find(|x| x.sink.eq_ignore_ascii_case(&r.sink)) {
                    Some(existing) => existing.redacts = r.redacts,
                    None => rules.push(r.clone()),
                }
            }
        }
        if matched {
            out.insert(unit.path.clone(), SinkMetadata { sinks: rules });
        }
    }
    Ok(out)
}
