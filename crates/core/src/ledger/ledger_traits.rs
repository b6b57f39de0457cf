use async_trait::async_trait;

use super::ledger_model::NewLedgerTransaction;
use crate::errors::LedgerError;

/// Trait defining the contract for ledger persistence operations.
///
/// Implementations must enforce a uniqueness constraint on
/// `(portfolio_id, transaction_hash)` and surface its violation as
/// [`LedgerError::UniqueViolation`]. That constraint is the correctness
/// backstop for concurrent sync runs: two runs may both pass the dedup
/// check for the same transaction, but only one insert can win.
#[async_trait]
pub trait LedgerRepositoryTrait: Send + Sync {
    /// Insert one transaction into the portfolio ledger.
    async fn insert_transaction(
        &self,
        tx: &NewLedgerTransaction,
    ) -> Result<(), LedgerError>;

    /// Dedup fingerprints of every transaction persisted for a portfolio.
    ///
    /// Used by the dedup index for its lazy cache backfill.
    async fn get_transaction_hashes(
        &self,
        portfolio_id: &str,
    ) -> Result<Vec<String>, LedgerError>;
}
