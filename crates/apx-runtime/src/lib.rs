//! apx-runtime
//!
//! Batch orchestration around the pure engine crates: typed settings,
//! inventory walking, sink metadata lookup, worker-pool fan-out and run
//! publishing.
//!
//! # Invariants
//! - Output is independent of worker count and completion order.
//! - A failed stage or worker aborts before anything is written.
//! - Recovered per-item conditions are logged at `warn` and recorded in the
//!   report.

mod inventory;
mod orchestrator;
mod settings;
mod sinks;

pub use inventory::{compile_globset, load_inventory, Inventory};
pub use orchestrator::{chunked, run_and_publish, AuditRun, CompletedRun, Orchestrator};
pub use settings::{AuditConfig, ContractSettings, ExtractSettings, InventorySettings, SinkSettings};
pub use sinks::sink_metadata_for;
