//! Wallet sync orchestration.
//!
//! The sync service drives a run through its phases:
//! validate, fetch (paginated, one provider per run), dedup, enrich with
//! prices, persist. Per-record problems become counts in the result;
//! only a malformed address or total provider exhaustion fail a run.

pub mod single_flight;
pub mod sync_model;
pub mod sync_service;
pub mod sync_traits;


pub use single_flight::WalletLocks;
pub use sync_model::{
    CancelToken, FetchLimits, SyncCountersSnapshot, SyncPhase, SyncResult, SyncStatus,
    WalletSyncSummary,
};
pub use sync_service::SyncService;
pub use sync_traits::{PriceServiceTrait, SyncServiceTrait};
