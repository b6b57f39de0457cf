use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Satoshis per bitcoin.
pub const SATS_PER_BTC: i64 = 100_000_000;

/// Convert provider-native satoshis to the canonical decimal unit.
pub fn sats_to_btc(sats: i64) -> Decimal {
    Decimal::new(sats, 8)
}

/// Map a signed net value for the synced address to a transaction direction.
///
/// Zero nets map to `TransferIn`. That is the reference behavior for
/// transactions where the address's inflow and outflow cancel out; it is
/// preserved here, not second-guessed.
pub fn direction_from_net(net_sats: i64) -> TransactionType {
    if net_sats < 0 {
        TransactionType::TransferOut
    } else {
        TransactionType::TransferIn
    }
}

/// Direction/kind of a ledger transaction.
///
/// Direction is carried here, never by the sign of the quantity.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    TransferIn,
    TransferOut,
    Buy,
    Sell,
}

impl TransactionType {
    /// Stable string form, used in fingerprints and persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransferIn => "transfer_in",
            Self::TransferOut => "transfer_out",
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer_in" => Ok(Self::TransferIn),
            "transfer_out" => Ok(Self::TransferOut),
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

/// Canonical wallet transaction.
///
/// Produced only by the provider normalizers and immutable afterwards.
/// `quantity` is strictly positive; `price_at_execution` and `total_amount`
/// stay `None` until the sync orchestrator enriches the record with a price.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    /// On-chain transaction hash
    pub transaction_hash: String,

    /// Asset symbol (always "BTC" for the current providers)
    pub symbol: String,

    /// Direction of the transaction relative to the synced address
    pub transaction_type: TransactionType,

    /// Quantity in the symbol's canonical unit, strictly positive
    pub quantity: Decimal,

    /// Unit price at execution time, filled during enrichment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_at_execution: Option<Decimal>,

    /// quantity * price, filled during enrichment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,

    /// Valuation currency for price/total
    pub currency: String,

    /// Network fee in `fee_currency` units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<Decimal>,

    /// Currency of the fee (the chain's native unit)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_currency: Option<String>,

    /// Block timestamp
    pub timestamp: DateTime<Utc>,

    /// Where the record came from (provider id)
    pub exchange: String,

    /// Free-form annotation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// The raw provider record, kept for provenance only.
    /// Nothing downstream of the normalizer reads into this.
    pub raw_provider_payload: serde_json::Value,
}

/// Provider-interpreted pagination cursor.
///
/// Each upstream API pages differently; the orchestrator threads the cursor
/// from one page to the next without looking inside. Cursors from different
/// providers are never mixed within one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageCursor {
    /// UTXO-explorer style: txid of the last item seen
    LastSeenTx(String),
    /// Ledger-explorer style: record offset
    Offset(u32),
    /// Full-history style: block height upper bound (exclusive)
    BeforeHeight(u64),
}

/// One page of normalized transactions.
#[derive(Clone, Debug, Default)]
pub struct TransactionPage {
    /// Normalized transactions, provider order (newest first)
    pub transactions: Vec<CanonicalTransaction>,
    /// Cursor for the next page, if the provider indicated one
    pub next_cursor: Option<PageCursor>,
}

impl TransactionPage {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }
}
