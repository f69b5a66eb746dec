//! apx-audit
//!
//! Append-only review ledger. One JSON line per lifecycle transition applied
//! by a reviewer, hash-chained so that edits, deletions and reordering are
//! detectable.
//!
//! # Invariants
//! - Every record carries `hash_prev` (the previous record's `hash_self`, or
//!   null for the first) and `hash_self` (SHA-256 of the canonical record
//!   without `hash_self`).
//! - Reopening an existing ledger resumes its chain; it never starts a new one.
//! - `event_id` is derived from chain position and payload. No RNG.

use anyhow::{bail, Context, Result};
use apx_schemas::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const LEDGER_FILE: &str = "review.jsonl";

/// Namespace for ledger event ids.
const EVENT_NAMESPACE: Uuid = Uuid::from_u128(0x6a70_785f_7265_7669_6577_5f65_7600_0001);

/// One reviewer action on one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAction {
    pub entity: EntityKind,
    pub entity_id: String,
    pub from: String,
    pub to: String,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ReviewAction {
    pub fn event_type(&self) -> &'static str {
        match self.entity {
            EntityKind::Discrepancy => "DISCREPANCY_TRANSITION",
            EntityKind::Decision => "DECISION_TRANSITION",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub event_id: Uuid,
    pub run_id: Uuid,
    pub seq: u64,
    pub ts_utc: DateTime<Utc>,
    pub event_type: String,
    pub payload: Value,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

/// Append-only ledger writer.
pub struct ReviewLedger {
    path: PathBuf,
    last_hash: Option<String>,
    /// Number of records already in the file; the next record's `seq`.
    seq: u64,
}

impl ReviewLedger {
    /// Open `path`, creating parent directories. An existing ledger must
    /// verify; its chain is resumed from the last record.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {:?}", parent))?;
        }

        let mut ledger = Self {
            path,
            last_hash: None,
            seq: 0,
        };

        if ledger.path.exists() {
            let content = fs::read_to_string(&ledger.path)
                .with_context(|| format!("read review ledger {:?}", ledger.path))?;
            match verify_hash_chain_str(&content)? {
                VerifyResult::Valid { lines } => {
                    ledger.seq = lines as u64;
                    ledger.last_hash = last_record(&content)?.and_then(|r| r.hash_self);
                }
                VerifyResult::Broken { line, reason } => bail!(
                    "LEDGER_CHAIN_BROKEN: {:?} line {line}: {reason}; refusing to append",
                    ledger.path
                ),
            }
        }

        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn append(&mut self, run_id: Uuid, action: &ReviewAction) -> Result<LedgerRecord> {
        let payload = serde_json::to_value(action).context("serialize review action failed")?;
        let event_id = derive_event_id(self.last_hash.as_deref(), &payload, self.seq)?;

        let mut rec = LedgerRecord {
            event_id,
            run_id,
            seq: self.seq,
            ts_utc: Utc::now(),
            event_type: action.event_type().to_string(),
            payload,
            hash_prev: self.last_hash.clone(),
            hash_self: None,
        };
        let self_hash = compute_record_hash(&rec)?;
        rec.hash_self = Some(self_hash.clone());

        let line = canonical_json_line(&rec)?;
        append_line(&self.path, &line)?;

        self.last_hash = Some(self_hash);
        self.seq += 1;
        Ok(rec)
    }
}

fn last_record(content: &str) -> Result<Option<LedgerRecord>> {
    match content.lines().rev().find(|l| !l.trim().is_empty()) {
        Some(line) => {
            let rec = serde_json::from_str(line.trim()).context("parse last ledger record")?;
            Ok(Some(rec))
        }
        None => Ok(None),
    }
}

/// UUID v5 over (previous hash, seq, canonical payload).
fn derive_event_id(prev: Option<&str>, payload: &Value, seq: u64) -> Result<Uuid> {
    let canonical = serde_json::to_string(&sort_keys(payload)).context("serialize payload")?;
    let name = format!("{}|{seq}|{canonical}", prev.unwrap_or("GENESIS"));
    Ok(Uuid::new_v5(&EVENT_NAMESPACE, name.as_bytes()))
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open review ledger {:?}", path))?;
    f.write_all(line.as_bytes())
        .context("write ledger line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}

fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize ledger record failed")?;
    serde_json::to_string(&sort_keys(&raw)).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Hash of the canonical record without `hash_self`.
pub fn compute_record_hash(rec: &LedgerRecord) -> Result<String> {
    let mut clone = rec.clone();
    clone.hash_self = None;

    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

pub fn verify_hash_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read review ledger {:?}", path.as_ref()))?;
    verify_hash_chain_str(&content)
}

/// Same as [`verify_hash_chain`] over in-memory JSONL.
pub fn verify_hash_chain_str(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut line_count = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let rec: LedgerRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("parse ledger record at line {}", i + 1))?;

        if rec.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, rec.hash_prev
                ),
            });
        }

        if rec.seq != line_count as u64 {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!("seq mismatch: expected {line_count}, got {}", rec.seq),
            });
        }

        let Some(claimed) = rec.hash_self.as_deref() else {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: "hash_self missing".to_string(),
            });
        };
        let recomputed = compute_record_hash(&rec)?;
        if claimed != recomputed {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!(
                    "hash_self mismatch: claimed {}, recomputed {}",
                    claimed, recomputed
                ),
            });
        }

        line_count += 1;
        prev_hash = rec.hash_self.clone();
    }

    Ok(VerifyResult::Valid { lines: line_count })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { lines: usize },
    Broken { line: usize, reason: String },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid { .. })
    }
}
