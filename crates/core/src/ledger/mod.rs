//! Portfolio ledger write contract.
//!
//! The ledger itself lives in the hosting application; this engine only
//! needs the insert path and the known-fingerprint query, both behind
//! [`LedgerRepositoryTrait`].

pub mod ledger_model;
pub mod ledger_traits;

pub use ledger_model::NewLedgerTransaction;
pub use ledger_traits::LedgerRepositoryTrait;
