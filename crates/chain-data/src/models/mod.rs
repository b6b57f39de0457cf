//! Chain data models
//!
//! This module contains the core data types for wallet transaction fetching:
//! - `types` - Type aliases for common identifiers (ProviderId, Currency, TxHash)
//! - `transaction` - Canonical transaction record, pagination page and cursor

mod transaction;
mod types;

pub use transaction::{
    direction_from_net, sats_to_btc, CanonicalTransaction, PageCursor, TransactionPage,
    TransactionType, SATS_PER_BTC,
};
pub use types::{Currency, ProviderId, TxHash};
