//! `apx review`: human-driven lifecycle transitions on a published report.
//!
//! A transition appends one hash-chained event to `review.jsonl` next to the
//! report, then rewrites the report bundle atomically. The ledger is verified
//! on open and written first, so a report change never exists without its
//! ledger event. A failed bundle write leaves the event recorded and the
//! report at its prior state.

use anyhow::{anyhow, bail, Context, Result};
use apx_artifacts::{read_manifest, read_report, write_report_bundle};
use apx_audit::{verify_hash_chain, ReviewAction, ReviewLedger, VerifyResult, LEDGER_FILE};
use apx_schemas::{DecisionId, DecisionState, DiscrepancyId, DiscrepancyStatus, EntityKind};
use std::path::Path;

pub struct TransitionArgs<'a> {
    pub report: &'a str,
    pub kind: &'a str,
    pub id: &'a str,
    pub to: &'a str,
    pub actor: &'a str,
    pub note: Option<&'a str>,
}

pub fn review_transition(args: TransitionArgs<'_>) -> Result<()> {
    let actor = args.actor.trim();
    if actor.is_empty() {
        bail!("REVIEW_INVALID: --actor must not be empty");
    }
    let entity = EntityKind::parse(args.kind).ok_or_else(|| {
        anyhow!(
            "REVIEW_INVALID: --kind '{}'. expected one of: discrepancy | decision",
            args.kind
        )
    })?;

    let report_path = Path::new(args.report);
    let run_dir = report_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let manifest = read_manifest(run_dir)?;
    let mut report = read_report(report_path)?;
    let mut ledger = ReviewLedger::open(run_dir.join(LEDGER_FILE))?;

    let (from, to) = match entity {
        EntityKind::Discrepancy => {
            let id = DiscrepancyId::parse(args.id)
                .ok_or_else(|| anyhow!("REVIEW_INVALID: --id '{}' is not a uuid", args.id))?;
            let to = DiscrepancyStatus::parse(args.to).ok_or_else(|| {
                anyhow!("REVIEW_INVALID: unknown discrepancy status '{}'", args.to)
            })?;
            let from = report
                .outcome
                .transition_discrepancy(id, to)
                .context("REVIEW_REJECTED")?;
            (from.as_str(), to.as_str())
        }
        EntityKind::Decision => {
            let id = DecisionId::parse(args.id)
                .ok_or_else(|| anyhow!("REVIEW_INVALID: --id '{}' is not a uuid", args.id))?;
            let to = DecisionState::parse(args.to)
                .ok_or_else(|| anyhow!("REVIEW_INVALID: unknown decision state '{}'", args.to))?;
            let from = report
                .outcome
                .transition_decision(id, to)
                .context("REVIEW_REJECTED")?;
            (from.as_str(), to.as_str())
        }
    };

    let action = ReviewAction {
        entity,
        entity_id: args.id.trim().to_string(),
        from: from.to_string(),
        to: to.to_string(),
        actor: actor.to_string(),
        note: args.note.map(str::to_string),
    };
    let rec = ledger.append(manifest.run_id, &action)?;

    report.refresh_summary();
    write_report_bundle(run_dir, &report)
        .context("REVIEW_REPORT_WRITE_FAILED: ledger event recorded, report unchanged")?;

    tracing::info!(
        kind = entity.as_str(),
        id = %action.entity_id,
        from,
        to,
        actor,
        "review transition recorded"
    );

    println!(
        "transitioned=true kind={} id={} from={} to={}",
        entity.as_str(),
        action.entity_id,
        from,
        to
    );
    println!("ledger_path={}", ledger.path().display());
    println!("seq={}", rec.seq);
    if let Some(h) = rec.hash_self {
        println!("hash_self={h}");
    }
    Ok(())
}

pub fn review_verify(ledger: &str) -> Result<()> {
    match verify_hash_chain(ledger)? {
        VerifyResult::Valid { lines } => {
            println!("ledger_ok=true lines={lines}");
            Ok(())
        }
        VerifyResult::Broken { line, reason } => {
            bail!("LEDGER_CHAIN_BROKEN: line {line}: {reason}")
        }
    }
}
