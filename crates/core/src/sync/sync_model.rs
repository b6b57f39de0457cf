//! Sync run models: phases, limits, results and counters.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use walletfolio_chain_data::models::CanonicalTransaction;

/// Phases of a sync run, in order. `Error` is reachable from every phase
/// except `Done`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncPhase {
    Idle,
    Validating,
    Fetching,
    Normalizing,
    Deduping,
    Enriching,
    Persisting,
    Done,
    Error,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Validating => "VALIDATING",
            Self::Fetching => "FETCHING",
            Self::Normalizing => "NORMALIZING",
            Self::Deduping => "DEDUPING",
            Self::Enriching => "ENRICHING",
            Self::Persisting => "PERSISTING",
            Self::Done => "DONE",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Cooperative cancellation flag for a sync run.
///
/// Checked at page boundaries during fetching, so a caller-initiated
/// cancel stops pagination promptly instead of running the provider to
/// exhaustion. Dropping the run's future remains the hard-cancel path.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Limits for one fetch/sync call. `None` means unbounded.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct FetchLimits {
    /// Stop once this many transactions have been fetched.
    pub max_transactions: Option<u32>,
    /// Stop once a page's oldest transaction predates this many days ago.
    pub days_back: Option<u32>,
}

impl FetchLimits {
    /// Full history, no cutoff.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max(max_transactions: u32) -> Self {
        Self {
            max_transactions: Some(max_transactions),
            ..Self::default()
        }
    }

    pub fn with_days_back(days_back: u32) -> Self {
        Self {
            days_back: Some(days_back),
            ..Self::default()
        }
    }
}

/// Outcome status of a fetch call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Error,
}

/// Result of a read-only fetch call.
///
/// `status` is `Error` only for validation failures or total provider
/// exhaustion; per-record problems surface as counts in an otherwise
/// successful result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncResult {
    pub status: SyncStatus,
    pub message: String,
    pub transactions: Vec<CanonicalTransaction>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}

impl SyncResult {
    pub fn success(transactions: Vec<CanonicalTransaction>, message: impl Into<String>) -> Self {
        Self {
            status: SyncStatus::Success,
            message: message.into(),
            count: transactions.len(),
            transactions,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SyncStatus::Error,
            message: message.into(),
            transactions: Vec::new(),
            count: 0,
            timestamp: Utc::now(),
        }
    }
}

/// Terminal counts of a persisting sync run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct WalletSyncSummary {
    pub transactions_added: u32,
    pub transactions_skipped: u32,
    pub transactions_failed: u32,
    pub total_fetched: u32,
}

/// Observable error counters for the sync service.
///
/// Every error class increments one of these; none of them abort a batch
/// on their own.
#[derive(Debug, Default)]
pub struct SyncCounters {
    pub validation_failures: AtomicU64,
    pub fetch_failures: AtomicU64,
    pub enrichment_failures: AtomicU64,
    pub persistence_conflicts: AtomicU64,
    pub persistence_failures: AtomicU64,
    pub duplicates_detected: AtomicU64,
    pub cancellations: AtomicU64,
}

impl SyncCounters {
    pub fn snapshot(&self) -> SyncCountersSnapshot {
        SyncCountersSnapshot {
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            enrichment_failures: self.enrichment_failures.load(Ordering::Relaxed),
            persistence_conflicts: self.persistence_conflicts.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            duplicates_detected: self.duplicates_detected.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`SyncCounters`].
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct SyncCountersSnapshot {
    pub validation_failures: u64,
    pub fetch_failures: u64,
    pub enrichment_failures: u64,
    pub persistence_conflicts: u64,
    pub persistence_failures: u64,
    pub duplicates_detected: u64,
    pub cancellations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let other_handle = token.clone();
        other_handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_sync_result_constructors() {
        let ok = SyncResult::success(vec![], "nothing new");
        assert_eq!(ok.status, SyncStatus::Success);
        assert_eq!(ok.count, 0);

        let err = SyncResult::error("bad address");
        assert_eq!(err.status, SyncStatus::Error);
        assert_eq!(err.message, "bad address");
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(SyncPhase::Validating.to_string(), "VALIDATING");
        assert_eq!(SyncPhase::Done.to_string(), "DONE");
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = SyncCounters::default();
        counters.duplicates_detected.fetch_add(3, Ordering::Relaxed);
        assert_eq!(counters.snapshot().duplicates_detected, 3);
    }
}
