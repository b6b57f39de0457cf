//! Per-wallet single-flight locking.
//!
//! Two sync runs for the same wallet may both pass the dedup check before
//! either persists - the dedup cache is read-check-then-later-write, not
//! atomic. The wallet lock serializes runs per wallet so that interleaving
//! cannot happen in-process; the ledger's uniqueness constraint covers
//! whatever still slips through (multiple processes).

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Table of per-wallet locks, created on demand.
#[derive(Default)]
pub struct WalletLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl WalletLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a wallet, waiting for any in-flight run.
    ///
    /// The guard must be held until the run is fully finished, persistence
    /// included.
    pub async fn acquire(&self, wallet: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(wallet.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
