//! Block-explorer provider trait definition.

use async_trait::async_trait;

use crate::errors::ChainDataError;
use crate::models::{PageCursor, TransactionPage};

/// Trait for block-explorer transaction providers.
///
/// Implement this trait to add support for a new explorer API.
/// The registry uses the provider's priority to decide the fallback order.
///
/// Implementations are expected to do their own transport-level retrying
/// and rate-limiter pacing; errors that escape `fetch_page` have already
/// burned through the provider's retry budget.
#[async_trait]
pub trait BlockExplorerProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "ESPLORA", "BLOCKCYPHER", etc.
    /// Used for logging, circuit breaker tracking, and rate limiting.
    fn id(&self) -> &'static str;

    /// Provider priority for fallback ordering.
    ///
    /// Lower values = higher priority. Default is 10.
    fn priority(&self) -> u8 {
        10
    }

    /// Fetch one page of an address's transaction history.
    ///
    /// # Arguments
    ///
    /// * `address` - The wallet address being synced (already validated)
    /// * `limit` - Maximum records to return in this page
    /// * `cursor` - Cursor from the previous page, `None` for the first page
    ///
    /// # Returns
    ///
    /// A page of normalized transactions in provider order (newest first)
    /// plus a cursor for the next page if one exists. Individual records
    /// that fail to normalize are skipped, never fatal for the page.
    async fn fetch_page(
        &self,
        address: &str,
        limit: u32,
        cursor: Option<&PageCursor>,
    ) -> Result<TransactionPage, ChainDataError>;

    /// Cheap connectivity check against the provider.
    async fn probe(&self) -> Result<(), ChainDataError>;
}
