use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use walletfolio_chain_data::models::{CanonicalTransaction, TransactionType};

/// A fully-enriched transaction ready for ledger insertion.
///
/// Unlike [`CanonicalTransaction`], price and total are mandatory here: an
/// unpriced transaction cannot be persisted by construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewLedgerTransaction {
    pub portfolio_id: String,
    pub transaction_hash: String,
    /// Dedup fingerprint, stored alongside the row so cache backfills
    /// don't have to recompute it
    pub fingerprint: String,
    pub symbol: String,
    pub transaction_type: TransactionType,
    pub quantity: Decimal,
    pub price_at_execution: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub fee: Option<Decimal>,
    pub fee_currency: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub exchange: String,
    pub notes: Option<String>,
}

impl NewLedgerTransaction {
    /// Build a ledger row from an enriched canonical transaction.
    ///
    /// Returns `None` when the transaction was never enriched with a price.
    pub fn from_enriched(
        tx: &CanonicalTransaction,
        portfolio_id: &str,
        fingerprint: String,
    ) -> Option<Self> {
        let price_at_execution = tx.price_at_execution?;
        let total_amount = tx.total_amount?;

        Some(Self {
            portfolio_id: portfolio_id.to_string(),
            transaction_hash: tx.transaction_hash.clone(),
            fingerprint,
            symbol: tx.symbol.clone(),
            transaction_type: tx.transaction_type,
            quantity: tx.quantity,
            price_at_execution,
            total_amount,
            currency: tx.currency.clone(),
            fee: tx.fee,
            fee_currency: tx.fee_currency.clone(),
            timestamp: tx.timestamp,
            exchange: tx.exchange.clone(),
            notes: tx.notes.clone(),
        })
    }
}
