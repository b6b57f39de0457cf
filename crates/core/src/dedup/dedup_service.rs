//! The deduplication index.
//!
//! Layered read-through lookup: in-process cache, then shared cache, then
//! a lazy ledger backfill that seeds both layers for the portfolio. The
//! index never persists anything itself - `filter_duplicates` is a pure
//! filter, and the ledger's uniqueness constraint remains the backstop for
//! races between concurrent sync runs.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use log::{debug, info};
use serde::Serialize;

use walletfolio_chain_data::models::CanonicalTransaction;

use super::cache::{Cache, LocalCache};
use super::fingerprint::compute_fingerprint;
use super::similarity::{similarity, SimilarityWeights};
use crate::ledger::LedgerRepositoryTrait;
use crate::Result;

/// How long cached fingerprints live before the next ledger backfill.
pub const DEFAULT_HASH_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Observability snapshot of the index.
#[derive(Clone, Debug, Serialize)]
pub struct DedupStats {
    /// Total entries in the in-process cache (markers included)
    pub cache_size: usize,
    /// Portfolios with a seeded cache
    pub portfolio_count: usize,
    /// Whether a shared cache backend is attached
    pub backend_connected: bool,
    /// Fingerprint entries in the in-process cache
    pub total_cached_hashes: usize,
}

/// Exact-fingerprint and fuzzy-similarity duplicate detection.
pub struct DeduplicationIndex {
    local: LocalCache,
    shared: Option<Arc<dyn Cache>>,
    ledger: Arc<dyn LedgerRepositoryTrait>,
    ttl: Duration,
    weights: SimilarityWeights,
    /// Portfolios whose ledger history has been pulled into the caches.
    seeded: DashSet<String>,
}

impl DeduplicationIndex {
    pub fn new(ledger: Arc<dyn LedgerRepositoryTrait>) -> Self {
        Self {
            local: LocalCache::new(),
            shared: None,
            ledger,
            ttl: DEFAULT_HASH_TTL,
            weights: SimilarityWeights::default(),
            seeded: DashSet::new(),
        }
    }

    /// Attach a shared cache layer (e.g. the application's cache service).
    pub fn with_shared_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.shared = Some(cache);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_similarity_weights(mut self, weights: SimilarityWeights) -> Self {
        self.weights = weights;
        self
    }

    fn hash_key(portfolio_id: &str, hash: &str) -> String {
        format!("dedup:{portfolio_id}:{hash}")
    }

    fn portfolio_prefix(portfolio_id: &str) -> String {
        format!("dedup:{portfolio_id}:")
    }

    /// Whether a fingerprint is already known for this portfolio.
    ///
    /// Read-through: in-process cache, then shared cache (seeding the local
    /// layer on hit), then - once per portfolio - a lazy ledger backfill.
    /// The full history is never preloaded eagerly.
    pub async fn is_duplicate(&self, portfolio_id: &str, hash: &str) -> Result<bool> {
        let key = Self::hash_key(portfolio_id, hash);

        if self.local.get(&key).is_some() {
            return Ok(true);
        }

        if let Some(shared) = &self.shared {
            if shared.get(&key).is_some() {
                self.local.set(&key, "1", self.ttl);
                return Ok(true);
            }
        }

        if !self.seeded.contains(portfolio_id) {
            self.backfill(portfolio_id).await?;
            return Ok(self.local.get(&key).is_some());
        }

        Ok(false)
    }

    /// Pull the portfolio's persisted fingerprints into both cache layers.
    async fn backfill(&self, portfolio_id: &str) -> Result<()> {
        let hashes = self.ledger.get_transaction_hashes(portfolio_id).await?;
        debug!(
            "Seeding dedup cache for portfolio '{}' with {} fingerprints",
            portfolio_id,
            hashes.len()
        );

        for hash in &hashes {
            let key = Self::hash_key(portfolio_id, hash);
            self.local.set(&key, "1", self.ttl);
            if let Some(shared) = &self.shared {
                shared.set(&key, "1", self.ttl);
            }
        }
        self.seeded.insert(portfolio_id.to_string());
        Ok(())
    }

    /// Partition candidates into unseen transactions and duplicate
    /// fingerprints, preserving candidate order.
    ///
    /// Pure filter: nothing is persisted or cached as a side effect, which
    /// is also why two concurrent runs can both see a transaction as new -
    /// the ledger's uniqueness constraint catches that later.
    pub async fn filter_duplicates(
        &self,
        portfolio_id: &str,
        candidates: Vec<CanonicalTransaction>,
    ) -> Result<(Vec<CanonicalTransaction>, Vec<String>)> {
        let mut unique = Vec::with_capacity(candidates.len());
        let mut duplicate_hashes = Vec::new();
        let mut seen_in_batch: HashSet<String> = HashSet::new();

        for tx in candidates {
            let fingerprint = compute_fingerprint(&tx, portfolio_id);
            let known = seen_in_batch.contains(&fingerprint)
                || self.is_duplicate(portfolio_id, &fingerprint).await?;
            if known {
                duplicate_hashes.push(fingerprint);
            } else {
                seen_in_batch.insert(fingerprint);
                unique.push(tx);
            }
        }

        Ok((unique, duplicate_hashes))
    }

    /// Record one fingerprint. Returns whether it was genuinely new.
    pub fn add_hash(&self, portfolio_id: &str, hash: &str) -> bool {
        self.add_hashes_bulk(portfolio_id, std::slice::from_ref(&hash.to_string())) == 1
    }

    /// Record fingerprints in both cache layers with the configured TTL.
    ///
    /// Idempotent: re-adding a known fingerprint refreshes its TTL but does
    /// not count. Returns the number of genuinely new fingerprints.
    pub fn add_hashes_bulk(&self, portfolio_id: &str, hashes: &[String]) -> usize {
        let mut added = 0;
        for hash in hashes {
            let key = Self::hash_key(portfolio_id, hash);
            let known = self.local.get(&key).is_some()
                || self
                    .shared
                    .as_ref()
                    .is_some_and(|shared| shared.get(&key).is_some());
            if !known {
                added += 1;
            }
            self.local.set(&key, "1", self.ttl);
            if let Some(shared) = &self.shared {
                shared.set(&key, "1", self.ttl);
            }
        }
        added
    }

    /// Similarity score between two transactions using the configured
    /// weights.
    pub fn similarity(&self, a: &CanonicalTransaction, b: &CanonicalTransaction) -> f64 {
        similarity(a, b, &self.weights)
    }

    /// Evict everything cached for a portfolio, both layers.
    ///
    /// Called whenever the portfolio's wallet binding changes. Returns the
    /// number of in-process entries evicted.
    pub fn clear_portfolio(&self, portfolio_id: &str) -> usize {
        let prefix = Self::portfolio_prefix(portfolio_id);
        let evicted = self.local.delete_prefix(&prefix);
        if let Some(shared) = &self.shared {
            shared.delete_prefix(&prefix);
        }
        self.seeded.remove(portfolio_id);
        info!(
            "Cleared dedup cache for portfolio '{}' ({} local entries)",
            portfolio_id, evicted
        );
        evicted
    }

    /// Observability snapshot.
    pub fn stats(&self) -> DedupStats {
        DedupStats {
            cache_size: self.local.len(),
            portfolio_count: self.seeded.len(),
            backend_connected: self.shared.is_some(),
            total_cached_hashes: self.local.count_prefix("dedup:"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LedgerError;
    use crate::ledger::NewLedgerTransaction;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use walletfolio_chain_data::models::TransactionType;

    /// Ledger stub that serves a fixed fingerprint set and counts queries.
    struct FixedLedger {
        fingerprints: Vec<String>,
        query_count: AtomicUsize,
    }

    impl FixedLedger {
        fn new(fingerprints: Vec<String>) -> Self {
            Self {
                fingerprints,
                query_count: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LedgerRepositoryTrait for FixedLedger {
        async fn insert_transaction(
            &self,
            _tx: &NewLedgerTransaction,
        ) -> std::result::Result<(), LedgerError> {
            Ok(())
        }

        async fn get_transaction_hashes(
            &self,
            _portfolio_id: &str,
        ) -> std::result::Result<Vec<String>, LedgerError> {
            self.query_count.fetch_add(1, Ordering::SeqCst);
            Ok(self.fingerprints.clone())
        }
    }

    fn tx(hash: &str) -> CanonicalTransaction {
        CanonicalTransaction {
            transaction_hash: hash.to_string(),
            symbol: "BTC".to_string(),
            transaction_type: TransactionType::TransferIn,
            quantity: dec!(0.1),
            price_at_execution: None,
            total_amount: None,
            currency: "USD".to_string(),
            fee: None,
            fee_currency: None,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            exchange: "ESPLORA".to_string(),
            notes: None,
            raw_provider_payload: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn test_filter_partitions_and_preserves_order() {
        let known = tx("known");
        let fresh = tx("fresh");
        let known_fp = compute_fingerprint(&known, "p1");

        let ledger = Arc::new(FixedLedger::new(vec![known_fp.clone()]));
        let index = DeduplicationIndex::new(ledger);

        let (unique, duplicates) = index
            .filter_duplicates("p1", vec![fresh.clone(), known.clone()])
            .await
            .unwrap();

        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].transaction_hash, "fresh");
        assert_eq!(duplicates, vec![known_fp]);
    }

    #[tokio::test]
    async fn test_backfill_is_lazy_and_happens_once() {
        let ledger = Arc::new(FixedLedger::new(vec!["aaa".to_string()]));
        let index = DeduplicationIndex::new(ledger.clone());

        // Nothing touched the ledger yet
        assert_eq!(ledger.query_count.load(Ordering::SeqCst), 0);

        assert!(index.is_duplicate("p1", "aaa").await.unwrap());
        assert!(!index.is_duplicate("p1", "bbb").await.unwrap());
        assert!(!index.is_duplicate("p1", "ccc").await.unwrap());

        // One backfill served all three lookups
        assert_eq!(ledger.query_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_portfolios_are_isolated() {
        let ledger = Arc::new(FixedLedger::new(vec![]));
        let index = DeduplicationIndex::new(ledger);

        index.add_hash("p1", "shared-hash");
        assert!(index.is_duplicate("p1", "shared-hash").await.unwrap());
        assert!(!index.is_duplicate("p2", "shared-hash").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_hashes_bulk_counts_only_new() {
        let ledger = Arc::new(FixedLedger::new(vec![]));
        let index = DeduplicationIndex::new(ledger);

        let hashes = vec!["a".to_string(), "b".to_string()];
        assert_eq!(index.add_hashes_bulk("p1", &hashes), 2);
        // Re-adding is idempotent
        assert_eq!(index.add_hashes_bulk("p1", &hashes), 0);

        let mixed = vec!["b".to_string(), "c".to_string()];
        assert_eq!(index.add_hashes_bulk("p1", &mixed), 1);
    }

    #[tokio::test]
    async fn test_shared_cache_seeds_local_layer() {
        let shared: Arc<dyn Cache> = Arc::new(LocalCache::new());
        shared.set("dedup:p1:warm", "1", DEFAULT_HASH_TTL);

        let ledger = Arc::new(FixedLedger::new(vec![]));
        let index = DeduplicationIndex::new(ledger.clone()).with_shared_cache(shared);

        assert!(index.is_duplicate("p1", "warm").await.unwrap());
        // Served by the shared layer; no ledger query needed
        assert_eq!(ledger.query_count.load(Ordering::SeqCst), 0);
        // And now cached locally too
        assert_eq!(index.stats().total_cached_hashes, 1);
    }

    #[tokio::test]
    async fn test_clear_portfolio_forgets_everything() {
        let ledger = Arc::new(FixedLedger::new(vec![]));
        let index = DeduplicationIndex::new(ledger.clone());

        index.add_hashes_bulk("p1", &["a".to_string(), "b".to_string()]);
        // A miss on both cache layers triggers the backfill and seeds the portfolio
        let _ = index.is_duplicate("p1", "zzz").await.unwrap();
        assert_eq!(index.stats().portfolio_count, 1);

        assert_eq!(index.clear_portfolio("p1"), 2);
        let stats = index.stats();
        assert_eq!(stats.total_cached_hashes, 0);
        assert_eq!(stats.portfolio_count, 0);

        // Next lookup backfills again
        let before = ledger.query_count.load(Ordering::SeqCst);
        let _ = index.is_duplicate("p1", "a").await.unwrap();
        assert_eq!(ledger.query_count.load(Ordering::SeqCst), before + 1);
    }

    #[tokio::test]
    async fn test_in_batch_duplicates_are_caught() {
        let ledger = Arc::new(FixedLedger::new(vec![]));
        let index = DeduplicationIndex::new(ledger);

        let (unique, duplicates) = index
            .filter_duplicates("p1", vec![tx("same"), tx("same")])
            .await
            .unwrap();

        assert_eq!(unique.len(), 1);
        assert_eq!(duplicates.len(), 1);
    }

    #[tokio::test]
    async fn test_stats_shape() {
        let ledger = Arc::new(FixedLedger::new(vec![]));
        let index = DeduplicationIndex::new(ledger);

        index.add_hash("p1", "x");
        let stats = index.stats();

        assert_eq!(stats.cache_size, 1);
        assert_eq!(stats.total_cached_hashes, 1);
        assert!(!stats.backend_connected);
    }
}
