//! Batch orchestrator.
//!
//! One pass: load contract, build inventory, fan extraction out over the
//! worker pool, fan per-invocation reconciliation out the same way, then
//! assemble consolidation and coverage on the full set. Worker results are
//! reassembled by input index, never completion order.

use anyhow::{Context, Result};
use apx_artifacts::{publish_run, AuditReport, PublishRunArgs, PublishedRun};
use apx_contract::{load_contract_file, ReferenceContract};
use apx_extract::{merge_ordered, Extraction, Extractor, SourceUnit};
use apx_reconcile::{
    assemble, evaluate_invocation, AuditOutcome, AuditWarning, InvocationAudit, SinkMetadata,
    SinkMetadataSource,
};
use apx_schemas::{ApiInvocation, BaseUrlClass};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::inventory::{load_inventory, Inventory};
use crate::settings::AuditConfig;
use crate::sinks::sink_metadata_for;

/// Split `items` into at most `workers` contiguous chunks, in order.
pub fn chunked<T>(items: Vec<T>, workers: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let size = items.len().div_ceil(workers.max(1));
    let mut out = Vec::new();
    let mut rest = items.into_iter().peekable();
    while rest.peek().is_some() {
        out.push(rest.by_ref().take(size).collect());
    }
    out
}

pub struct Orchestrator {
    config: AuditConfig,
    contract: Arc<ReferenceContract>,
    extractor: Arc<Extractor>,
}

#[derive(Debug, Clone)]
pub struct AuditRun {
    pub outcome: AuditOutcome,
    /// Inventory files skipped as unreadable.
    pub skipped: Vec<String>,
}

impl Orchestrator {
    /// Load the contract and compile the extraction patterns. Either failing
    /// is fatal for the run.
    pub fn new(config: AuditConfig) -> Result<Self> {
        let contract = load_contract_file(&config.contract.path, config.contract.version.as_deref())
            .with_context(|| format!("load contract {}", config.contract.path.display()))?;
        tracing::info!(
            version = contract.version(),
            entries = contract.len(),
            "reference contract loaded"
        );

        // Hosts the contract declares as testnet classify like the markers.
        let mut options = config.extract.to_options();
        for host in contract.hosts_for(BaseUrlClass::Testnet) {
            if !options.testnet_markers.contains(&host) {
                options.testnet_markers.push(host);
            }
        }
        let extractor = Extractor::new(options).context("compile extraction patterns")?;

        Ok(Self {
            config,
            contract: Arc::new(contract),
            extractor: Arc::new(extractor),
        })
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn contract(&self) -> &ReferenceContract {
        &self.contract
    }

    pub async fn run(&self) -> Result<AuditRun> {
        let Inventory { units, skipped } = load_inventory(&self.config.inventory)?;
        tracing::info!(
            units = units.len(),
            skipped = skipped.len(),
            workers = self.config.workers,
            "inventory loaded"
        );

        let sinks = sink_metadata_for(&units, &self.config.sinks)?;
        let extraction = self.extract(units).await?;
        tracing::info!(
            invocations = extraction.invocations.len(),
            unresolved = extraction.warnings.len(),
            "extraction complete"
        );

        let outcome = self.reconcile(extraction, sinks).await?;
        log_outcome(&outcome);

        Ok(AuditRun { outcome, skipped })
    }

    async fn extract(&self, units: Vec<SourceUnit>) -> Result<Extraction> {
        let mut set = JoinSet::new();
        for (idx, chunk) in chunked(units, self.config.workers).into_iter().enumerate() {
            let extractor = Arc::clone(&self.extractor);
            set.spawn_blocking(move || (idx, extractor.extract_all(&chunk)));
        }

        let mut parts = Vec::new();
        while let Some(joined) = set.join_next().await {
            let part = joined.context("WORKER_FAILED: extraction worker did not complete")?;
            parts.push(part);
        }
        Ok(merge_ordered(parts))
    }

    async fn reconcile(
        &self,
        extraction: Extraction,
        sinks: BTreeMap<String, SinkMetadata>,
    ) -> Result<AuditOutcome> {
        let Extraction {
            invocations,
            warnings,
        } = extraction;
        let sinks = Arc::new(sinks);
        let policy = self.config.policy;

        let mut set = JoinSet::new();
        let chunks = chunked(invocations, self.config.workers);
        for (idx, chunk) in chunks.into_iter().enumerate() {
            let contract = Arc::clone(&self.contract);
            let sinks = Arc::clone(&sinks);
            set.spawn_blocking(move || {
                let audits: Vec<InvocationAudit> = chunk
                    .iter()
                    .map(|inv| {
                        evaluate_invocation(
                            &contract,
                            inv,
                            sinks.sinks_for(&inv.source_location.path),
                            &policy,
                        )
                    })
                    .collect();
                (idx, chunk, audits)
            });
        }

        let mut parts: Vec<(usize, Vec<ApiInvocation>, Vec<InvocationAudit>)> = Vec::new();
        while let Some(joined) = set.join_next().await {
            let part = joined.context("WORKER_FAILED: reconciliation worker did not complete")?;
            parts.push(part);
        }
        parts.sort_by_key(|(idx, _, _)| *idx);

        let mut invocations = Vec::new();
        let mut audits = Vec::new();
        for (_, chunk, chunk_audits) in parts {
            invocations.extend(chunk);
            audits.extend(chunk_audits);
        }

        Ok(assemble(
            &self.contract,
            Extraction {
                invocations,
                warnings,
            },
            audits,
        ))
    }
}

fn log_outcome(outcome: &AuditOutcome) {
    for w in &outcome.warnings {
        match w {
            AuditWarning::UnresolvedTarget { location, raw, .. } => {
                tracing::warn!(%location, raw = %raw, "UNRESOLVED_TARGET");
            }
            AuditWarning::SinkMetadataMissing { evidence, sink, .. } => {
                tracing::warn!(%evidence, sink = %sink, "SINK_METADATA_MISSING: treated as plain");
            }
        }
    }
    for inv in &outcome.invocations {
        let mapped = outcome
            .bindings
            .get(&inv.id)
            .map(|b| b.is_mapped())
            .unwrap_or(false);
        if !mapped {
            tracing::warn!(
                location = %inv.source_location,
                target = %inv.target,
                transport = %inv.transport,
                method = %inv.method,
                "UNMAPPED_INVOCATION"
            );
        }
    }

    let s = outcome.summary();
    tracing::info!(
        invocations = s.invocations,
        discrepancies = s.discrepancies,
        critical = s.critical,
        findings = s.findings,
        decisions = s.decisions,
        coverage = outcome.coverage.ratio,
        "reconciliation complete"
    );
}

#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub run_id: Uuid,
    pub report: AuditReport,
    pub published: PublishedRun,
    pub skipped: Vec<String>,
}

impl CompletedRun {
    pub fn coverage_complete(&self) -> bool {
        self.report.outcome.coverage.is_complete()
    }
}

/// Run the audit and publish `exports/<run_id>/`. Nothing is written unless
/// every stage succeeded.
pub async fn run_and_publish(config: AuditConfig, config_hash: &str) -> Result<CompletedRun> {
    let orchestrator = Orchestrator::new(config)?;
    let run = orchestrator.run().await?;

    let run_id = Uuid::new_v4();
    let report = AuditReport::new(config_hash, run.outcome);
    let published = publish_run(PublishRunArgs {
        exports_root: &orchestrator.config().exports_root,
        run_id,
        report: &report,
    })?;
    tracing::info!(%run_id, run_dir = %published.run_dir.display(), "run published");

    Ok(CompletedRun {
        run_id,
        report,
        published,
        skipped: run.skipped,
    })
}
