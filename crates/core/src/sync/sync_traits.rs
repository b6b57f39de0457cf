use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::sync_model::{CancelToken, FetchLimits, SyncResult, WalletSyncSummary};
use crate::Result;

/// Trait defining the contract for the external price-lookup collaborator.
///
/// Valuation itself is out of scope for the sync engine; it only needs a
/// price per transaction, historical when available, current as fallback.
#[async_trait]
pub trait PriceServiceTrait: Send + Sync {
    /// Closing price of `symbol` on `date`, if known.
    async fn historical_price(&self, symbol: &str, date: NaiveDate) -> Result<Option<Decimal>>;

    /// Latest available price of `symbol`, if known.
    async fn current_price(&self, symbol: &str) -> Result<Option<Decimal>>;

    /// Convert an amount between currencies, if a rate is available.
    async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Option<Decimal>>;
}

/// Trait defining the contract for the sync engine itself.
#[async_trait]
pub trait SyncServiceTrait: Send + Sync {
    /// Read-only preview: fetch and normalize without touching the ledger
    /// or the dedup caches.
    async fn fetch_transactions(
        &self,
        address: &str,
        portfolio_id: &str,
        limits: FetchLimits,
        cancel: &CancelToken,
    ) -> Result<SyncResult>;

    /// Fetch, dedup, enrich and persist new transactions exactly once.
    async fn sync_wallet(
        &self,
        address: &str,
        portfolio_id: &str,
        limits: FetchLimits,
        cancel: &CancelToken,
    ) -> Result<WalletSyncSummary>;

    /// Probe every configured provider; true means reachable.
    async fn test_provider_connectivity(&self) -> HashMap<String, bool>;
}
