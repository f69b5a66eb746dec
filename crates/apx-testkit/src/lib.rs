//! apx-testkit
//!
//! Fixtures shared by end-to-end scenarios: contract documents, source trees
//! on disk, and hand-built invocations for engine-level tests. Nothing here
//! is used by the `apx` binary.

pub mod bots;
mod contract;
mod invocation;
mod workspace;

pub use contract::{ContractFixture, EntryFixture, EXCHANGE_CONTRACT};
pub use invocation::InvocationBuilder;
pub use workspace::{AuditWorkspace, CONTRACT_FILE, EXPORTS_DIR, SOURCE_ROOT};
