//! The sync orchestrator.
//!
//! Drives one run end to end: validate the address, paginate the winning
//! provider (the fallback registry picks it on the first page and it keeps
//! the whole run - cursors never mix across providers), filter duplicates,
//! enrich with prices, persist. All collaborators are injected at
//! construction; there is no process-wide mutable state.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};

use walletfolio_chain_data::models::CanonicalTransaction;
use walletfolio_chain_data::registry::ProviderRegistry;

use super::single_flight::WalletLocks;
use super::sync_model::{
    CancelToken, FetchLimits, SyncCounters, SyncCountersSnapshot, SyncPhase, SyncResult,
    WalletSyncSummary,
};
use super::sync_traits::{PriceServiceTrait, SyncServiceTrait};
use crate::dedup::{compute_fingerprint, Cache, DedupStats, DeduplicationIndex, LocalCache};
use crate::errors::{Error, LedgerError};
use crate::ledger::{LedgerRepositoryTrait, NewLedgerTransaction};
use crate::wallet::WalletAddress;
use crate::Result;

/// Records requested per provider page.
const DEFAULT_PAGE_SIZE: u32 = 50;

/// How long a fetch preview may be served from the result cache.
const RESULT_CACHE_TTL: Duration = Duration::from_secs(120);

/// Currency the price collaborator quotes in.
const QUOTE_CURRENCY: &str = "USD";

/// End-to-end wallet sync driver.
pub struct SyncService {
    registry: Arc<ProviderRegistry>,
    dedup: Arc<DeduplicationIndex>,
    prices: Arc<dyn PriceServiceTrait>,
    ledger: Arc<dyn LedgerRepositoryTrait>,
    result_cache: LocalCache,
    locks: WalletLocks,
    counters: SyncCounters,
}

impl SyncService {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        dedup: Arc<DeduplicationIndex>,
        prices: Arc<dyn PriceServiceTrait>,
        ledger: Arc<dyn LedgerRepositoryTrait>,
    ) -> Self {
        Self {
            registry,
            dedup,
            prices,
            ledger,
            result_cache: LocalCache::new(),
            locks: WalletLocks::new(),
            counters: SyncCounters::default(),
        }
    }

    /// Snapshot of the error counters.
    pub fn counters(&self) -> SyncCountersSnapshot {
        self.counters.snapshot()
    }

    /// Snapshot of the dedup index state.
    pub fn dedup_stats(&self) -> DedupStats {
        self.dedup.stats()
    }

    /// Paginate the address's history, newest first.
    ///
    /// The fallback registry picks the provider with the first page; every
    /// follow-up page comes from that same provider with its cursor
    /// threaded through. Stops on: an empty page, a missing cursor, the
    /// `max_transactions` limit, the `days_back` cutoff, or cancellation.
    async fn fetch_all(
        &self,
        address: &WalletAddress,
        limits: &FetchLimits,
        cancel: &CancelToken,
    ) -> Result<(Vec<CanonicalTransaction>, bool)> {
        if limits.max_transactions == Some(0) {
            return Ok((Vec::new(), false));
        }

        let cutoff = limits
            .days_back
            .map(|days| Utc::now() - chrono::Duration::days(days as i64));

        let page_limit = |collected: usize| -> u32 {
            match limits.max_transactions {
                Some(max) => DEFAULT_PAGE_SIZE.min((max as usize).saturating_sub(collected) as u32),
                None => DEFAULT_PAGE_SIZE,
            }
        };

        debug!("[{}] paginating history of {}", SyncPhase::Fetching, address);
        let (provider_id, mut page) = self
            .registry
            .fetch_first_page(address.as_str(), page_limit(0))
            .await?;
        let provider = self.registry.provider(&provider_id).ok_or_else(|| {
            Error::Unexpected(format!("winning provider '{provider_id}' is not registered"))
        })?;

        let mut collected: Vec<CanonicalTransaction> = Vec::new();
        let mut cancelled = false;

        loop {
            let fetched_now = page.len();
            // Pages are newest-first: once the oldest record of a page
            // predates the cutoff, deeper pages are entirely out of range
            let crossed_cutoff = match (cutoff, page.transactions.last()) {
                (Some(cutoff), Some(oldest)) => oldest.timestamp < cutoff,
                _ => false,
            };
            if let Some(cutoff) = cutoff {
                page.transactions.retain(|tx| tx.timestamp >= cutoff);
            }
            collected.append(&mut page.transactions);

            if let Some(max) = limits.max_transactions {
                if collected.len() >= max as usize {
                    collected.truncate(max as usize);
                    break;
                }
            }
            if crossed_cutoff {
                debug!("[{}] reached days_back cutoff", SyncPhase::Fetching);
                break;
            }
            if fetched_now == 0 {
                break;
            }
            let Some(cursor) = page.next_cursor.take() else {
                break;
            };
            if cancel.is_cancelled() {
                self.counters.cancellations.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "[{}] sync for {} cancelled mid-pagination",
                    SyncPhase::Fetching,
                    address
                );
                cancelled = true;
                break;
            }

            page = provider
                .fetch_page(address.as_str(), page_limit(collected.len()), Some(&cursor))
                .await?;
        }

        debug!(
            "[{}] collected {} transactions from '{}'",
            SyncPhase::Fetching,
            collected.len(),
            provider_id
        );
        Ok((collected, cancelled))
    }

    /// Attach a price to the transaction: historical at its timestamp,
    /// falling back to the current price, converting currency when the
    /// quote currency differs. Returns false when no price is obtainable.
    async fn enrich(&self, tx: &mut CanonicalTransaction) -> bool {
        let date = tx.timestamp.date_naive();

        let quote = match self.prices.historical_price(&tx.symbol, date).await {
            Ok(Some(price)) => Some(price),
            Ok(None) => None,
            Err(e) => {
                debug!(
                    "[{}] historical price lookup for {} failed: {}",
                    SyncPhase::Enriching,
                    tx.symbol,
                    e
                );
                None
            }
        };
        let quote = match quote {
            Some(price) => Some(price),
            None => match self.prices.current_price(&tx.symbol).await {
                Ok(price) => price,
                Err(e) => {
                    debug!(
                        "[{}] current price lookup for {} failed: {}",
                        SyncPhase::Enriching,
                        tx.symbol,
                        e
                    );
                    None
                }
            },
        };
        let Some(mut price) = quote else {
            return false;
        };

        if tx.currency != QUOTE_CURRENCY {
            match self.prices.convert(price, QUOTE_CURRENCY, &tx.currency).await {
                Ok(Some(converted)) => price = converted,
                _ => return false,
            }
        }

        tx.price_at_execution = Some(price);
        tx.total_amount = Some(price * tx.quantity);
        true
    }
}

fn result_cache_key(portfolio_id: &str, address: &WalletAddress, limits: &FetchLimits) -> String {
    let max = limits
        .max_transactions
        .map_or_else(|| "all".to_string(), |m| m.to_string());
    let days = limits
        .days_back
        .map_or_else(|| "all".to_string(), |d| d.to_string());
    format!("fetch:{portfolio_id}:{address}:{max}:{days}")
}

#[async_trait]
impl SyncServiceTrait for SyncService {
    async fn fetch_transactions(
        &self,
        address: &str,
        portfolio_id: &str,
        limits: FetchLimits,
        cancel: &CancelToken,
    ) -> Result<SyncResult> {
        debug!(
            "[{}] fetch request for portfolio '{}'",
            SyncPhase::Validating,
            portfolio_id
        );
        let address = match WalletAddress::parse(address) {
            Ok(address) => address,
            Err(e) => {
                self.counters
                    .validation_failures
                    .fetch_add(1, Ordering::Relaxed);
                warn!("[{}] {}", SyncPhase::Error, e);
                return Ok(SyncResult::error(e.to_string()));
            }
        };

        let cache_key = result_cache_key(portfolio_id, &address, &limits);
        if let Some(cached) = self.result_cache.get(&cache_key) {
            if let Ok(result) = serde_json::from_str::<SyncResult>(&cached) {
                debug!("Serving fetch for {} from the result cache", address);
                return Ok(result);
            }
        }

        match self.fetch_all(&address, &limits, cancel).await {
            Ok((transactions, cancelled)) => {
                let message = if cancelled {
                    format!("fetch cancelled after {} transactions", transactions.len())
                } else {
                    format!("fetched {} transactions", transactions.len())
                };
                let result = SyncResult::success(transactions, message);
                if !cancelled {
                    if let Ok(serialized) = serde_json::to_string(&result) {
                        self.result_cache
                            .set(&cache_key, &serialized, RESULT_CACHE_TTL);
                    }
                }
                Ok(result)
            }
            Err(Error::ChainData(e)) => {
                self.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
                warn!("[{}] fetch for {} failed: {}", SyncPhase::Error, address, e);
                Ok(SyncResult::error(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn sync_wallet(
        &self,
        address: &str,
        portfolio_id: &str,
        limits: FetchLimits,
        cancel: &CancelToken,
    ) -> Result<WalletSyncSummary> {
        debug!(
            "[{}] sync request for portfolio '{}'",
            SyncPhase::Validating,
            portfolio_id
        );
        let address = WalletAddress::parse(address).map_err(|e| {
            self.counters
                .validation_failures
                .fetch_add(1, Ordering::Relaxed);
            warn!("[{}] {}", SyncPhase::Error, e);
            Error::from(e)
        })?;

        // Single flight: only one run per wallet proceeds past validation
        let _guard = self.locks.acquire(address.as_str()).await;

        let (fetched, _cancelled) =
            self.fetch_all(&address, &limits, cancel).await.map_err(|e| {
                self.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
                warn!("[{}] sync fetch for {} failed: {}", SyncPhase::Error, address, e);
                e
            })?;
        let total_fetched = fetched.len() as u32;

        debug!(
            "[{}] filtering {} candidates for portfolio '{}'",
            SyncPhase::Deduping,
            total_fetched,
            portfolio_id
        );
        let (unique, duplicate_hashes) =
            self.dedup.filter_duplicates(portfolio_id, fetched).await?;
        self.counters
            .duplicates_detected
            .fetch_add(duplicate_hashes.len() as u64, Ordering::Relaxed);
        let mut skipped = duplicate_hashes.len() as u32;

        let mut added = 0u32;
        let mut failed = 0u32;
        let mut new_fingerprints: Vec<String> = Vec::new();

        for mut tx in unique {
            if !self.enrich(&mut tx).await {
                self.counters
                    .enrichment_failures
                    .fetch_add(1, Ordering::Relaxed);
                warn!(
                    "[{}] no price obtainable for {} at {}, counted as failed",
                    SyncPhase::Enriching,
                    tx.transaction_hash,
                    tx.timestamp
                );
                failed += 1;
                continue;
            }

            let fingerprint = compute_fingerprint(&tx, portfolio_id);
            let Some(record) =
                NewLedgerTransaction::from_enriched(&tx, portfolio_id, fingerprint.clone())
            else {
                failed += 1;
                continue;
            };

            match self.ledger.insert_transaction(&record).await {
                Ok(()) => {
                    added += 1;
                    new_fingerprints.push(fingerprint);
                }
                Err(LedgerError::UniqueViolation(detail)) => {
                    // A concurrent run won the insert race; that is a skip,
                    // not a failure
                    self.counters
                        .persistence_conflicts
                        .fetch_add(1, Ordering::Relaxed);
                    debug!(
                        "[{}] late-detected duplicate ({}), skipping",
                        SyncPhase::Persisting,
                        detail
                    );
                    skipped += 1;
                    new_fingerprints.push(fingerprint);
                }
                Err(e) => {
                    self.counters
                        .persistence_failures
                        .fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "[{}] insert failed for {}: {}",
                        SyncPhase::Persisting,
                        record.transaction_hash,
                        e
                    );
                    failed += 1;
                }
            }
        }

        let newly_cached = self.dedup.add_hashes_bulk(portfolio_id, &new_fingerprints);
        debug!(
            "[{}] cached {} fresh fingerprints",
            SyncPhase::Persisting,
            newly_cached
        );

        let summary = WalletSyncSummary {
            transactions_added: added,
            transactions_skipped: skipped,
            transactions_failed: failed,
            total_fetched,
        };
        info!(
            "[{}] wallet {} portfolio '{}': {} added, {} skipped, {} failed of {} fetched",
            SyncPhase::Done,
            address,
            portfolio_id,
            summary.transactions_added,
            summary.transactions_skipped,
            summary.transactions_failed,
            summary.total_fetched
        );
        Ok(summary)
    }

    async fn test_provider_connectivity(&self) -> HashMap<String, bool> {
        self.registry.test_connectivity().await
    }
}
