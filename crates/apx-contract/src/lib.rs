//! apx-contract
//!
//! Reference contract loader. Parses the canonical contract document (YAML)
//! into a mapping keyed by (`target`, `transport`, `method`).
//!
//! - The contract is the oracle: any malformed or ambiguous entry is fatal.
//! - Duplicate keys within one document are fatal.
//! - Symbol tokens in targets are normalized to the transport's required form
//!   at load time so lookups never see two spellings of the same entry.
//!
//! No side effects beyond the returned mapping (and reading the file, for
//! [`load_contract_file`]).

mod error;
mod loader;
mod raw;

pub use error::ContractParseError;
pub use loader::{load_contract_file, load_contract_str, BaseUrls, ReferenceContract};
