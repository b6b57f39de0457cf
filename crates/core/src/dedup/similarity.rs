//! Weighted transaction similarity.
//!
//! Used as a secondary signal when exact fingerprints differ slightly,
//! e.g. a provider re-serializing a pending transaction after confirmation.
//! The per-field weighting is a configurable parameter set, not a fixed
//! formula.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use walletfolio_chain_data::models::CanonicalTransaction;

/// Score at or above which two transactions are treated as the same event.
pub const DUPLICATE_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Window inside which two timestamps still contribute to similarity.
const TIMESTAMP_WINDOW_SECS: i64 = 3600;

/// Per-field weights for [`similarity`]. Weights should sum to 1.0.
///
/// The defaults put enough weight on the symbol that a lone symbol
/// mismatch lands below [`DUPLICATE_SIMILARITY_THRESHOLD`] while identical
/// transactions score 1.0.
#[derive(Clone, Copy, Debug)]
pub struct SimilarityWeights {
    pub symbol: f64,
    pub timestamp: f64,
    pub quantity: f64,
    pub tx_type: f64,
    pub hash: f64,
    pub exchange: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            symbol: 0.25,
            timestamp: 0.20,
            quantity: 0.20,
            tx_type: 0.15,
            hash: 0.15,
            exchange: 0.05,
        }
    }
}

impl SimilarityWeights {
    fn total(&self) -> f64 {
        self.symbol + self.timestamp + self.quantity + self.tx_type + self.hash + self.exchange
    }
}

/// Field-by-field weighted similarity between two transactions, in [0, 1].
///
/// Symbol, type, exchange and hash are exact-match terms. The timestamp
/// term decays linearly to zero over a one-hour window; the quantity term
/// is relative closeness.
pub fn similarity(
    a: &CanonicalTransaction,
    b: &CanonicalTransaction,
    weights: &SimilarityWeights,
) -> f64 {
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }

    let mut score = 0.0;

    if a.symbol == b.symbol {
        score += weights.symbol;
    }
    if a.transaction_type == b.transaction_type {
        score += weights.tx_type;
    }
    if a.exchange == b.exchange {
        score += weights.exchange;
    }
    if a.transaction_hash == b.transaction_hash {
        score += weights.hash;
    }

    score += weights.timestamp * timestamp_closeness(a, b);
    score += weights.quantity * quantity_closeness(a.quantity, b.quantity);

    (score / total).clamp(0.0, 1.0)
}

fn timestamp_closeness(a: &CanonicalTransaction, b: &CanonicalTransaction) -> f64 {
    let delta = (a.timestamp.timestamp() - b.timestamp.timestamp()).abs();
    if delta >= TIMESTAMP_WINDOW_SECS {
        0.0
    } else {
        1.0 - delta as f64 / TIMESTAMP_WINDOW_SECS as f64
    }
}

fn quantity_closeness(a: Decimal, b: Decimal) -> f64 {
    if a == b {
        return 1.0;
    }
    let larger = a.max(b);
    if larger.is_zero() {
        return 1.0;
    }
    let diff = (a - b).abs() / larger;
    (1.0 - diff.to_f64().unwrap_or(1.0)).clamp(0.0, 1.0)
}
