//! Esplora-style block explorer provider.
//!
//! Endpoints:
//! - `GET /address/{addr}/txs?limit&last_seen_txid` - paged address history
//! - `GET /tx/{hash}` - single transaction
//! - `GET /blocks?limit=1` - latest block (connectivity probe)
//! - `GET /fee-estimates` - current fee estimates
//!
//! The address endpoint pages newest-first; the txid of the last item is
//! the cursor for the next page.

mod models;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tracing::{debug, warn};

use crate::errors::ChainDataError;
use crate::models::{
    direction_from_net, sats_to_btc, CanonicalTransaction, PageCursor, TransactionPage,
};
use crate::provider::{BlockExplorerProvider, HttpClient, ProviderConfig};
use crate::registry::RateLimiter;

pub use models::{EsploraBlock, EsploraTx, EsploraTxStatus, EsploraVin, EsploraVout};

pub const PROVIDER_ID: &str = "ESPLORA";

/// Esplora-style explorer (Blockstream.info and compatible deployments).
pub struct EsploraProvider {
    http: HttpClient,
}

impl EsploraProvider {
    pub fn new(config: ProviderConfig, limiter: Arc<RateLimiter>) -> Self {
        Self {
            http: HttpClient::new(PROVIDER_ID, config, limiter),
        }
    }

    /// Fetch and normalize a single transaction by hash.
    ///
    /// Returns `Ok(None)` when the transaction exists but cannot be
    /// normalized (e.g. still unconfirmed).
    pub async fn fetch_transaction(
        &self,
        hash: &str,
        address: &str,
    ) -> Result<Option<CanonicalTransaction>, ChainDataError> {
        let raw: serde_json::Value = self.http.get_json(&format!("/tx/{hash}"), &[]).await?;
        Ok(normalize_record(&raw, address))
    }

    /// Current fee estimates: confirmation target (blocks) to sat/vB.
    pub async fn fee_estimates(&self) -> Result<HashMap<String, f64>, ChainDataError> {
        self.http.get_json("/fee-estimates", &[]).await
    }
}

#[async_trait]
impl BlockExplorerProvider for EsploraProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        1
    }

    async fn fetch_page(
        &self,
        address: &str,
        limit: u32,
        cursor: Option<&PageCursor>,
    ) -> Result<TransactionPage, ChainDataError> {
        let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
        match cursor {
            None => {}
            Some(PageCursor::LastSeenTx(txid)) => query.push(("last_seen_txid", txid.clone())),
            Some(other) => {
                warn!("ignoring foreign cursor {:?} for '{}'", other, PROVIDER_ID);
            }
        }

        let raw: Vec<serde_json::Value> = self
            .http
            .get_json(&format!("/address/{address}/txs"), &query)
            .await?;

        // Cursor comes from the raw page so skipped records still advance it
        let next_cursor = raw
            .last()
            .and_then(|record| record.get("txid"))
            .and_then(|txid| txid.as_str())
            .map(|txid| PageCursor::LastSeenTx(txid.to_string()));

        let mut transactions = Vec::with_capacity(raw.len());
        let mut skipped = 0usize;
        for record in &raw {
            match normalize_record(record, address) {
                Some(tx) => transactions.push(tx),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!("'{}' skipped {} unnormalizable records", PROVIDER_ID, skipped);
        }

        Ok(TransactionPage {
            transactions,
            next_cursor,
        })
    }

    async fn probe(&self) -> Result<(), ChainDataError> {
        let _: Vec<EsploraBlock> = self
            .http
            .get_json("/blocks", &[("limit", "1".to_string())])
            .await?;
        Ok(())
    }
}

/// Map one raw Esplora record into the canonical shape.
///
/// Returns `None` for records that should be skipped: undecodable payloads,
/// unconfirmed transactions (no `status.block_time`), and records whose
/// value for this address nets out to nothing at all.
pub(crate) fn normalize_record(
    raw: &serde_json::Value,
    address: &str,
) -> Option<CanonicalTransaction> {
    let tx: EsploraTx = serde_json::from_value(raw.clone()).ok()?;
    let block_time = tx.status.as_ref()?.block_time?;
    let timestamp = Utc.timestamp_opt(block_time, 0).single()?;

    let received: i64 = tx
        .vout
        .iter()
        .filter(|out| out.scriptpubkey_address.as_deref() == Some(address))
        .filter_map(|out| out.value)
        .map(|v| v as i64)
        .sum();
    let sent: i64 = tx
        .vin
        .iter()
        .filter_map(|input| input.prevout.as_ref())
        .filter(|prevout| prevout.scriptpubkey_address.as_deref() == Some(address))
        .filter_map(|prevout| prevout.value)
        .map(|v| v as i64)
        .sum();

    let net = received - sent;
    // Zero net keeps the inbound leg; a record that moved nothing for this
    // address is skipped
    let quantity_sats = if net != 0 { net.abs() } else { received };
    if quantity_sats <= 0 {
        return None;
    }

    Some(CanonicalTransaction {
        transaction_hash: tx.txid,
        symbol: "BTC".to_string(),
        transaction_type: direction_from_net(net),
        quantity: sats_to_btc(quantity_sats),
        price_at_execution: None,
        total_amount: None,
        currency: "USD".to_string(),
        fee: tx.fee.map(|f| sats_to_btc(f as i64)),
        fee_currency: tx.fee.map(|_| "BTC".to_string()),
        timestamp,
        exchange: PROVIDER_ID.to_string(),
        notes: None,
        raw_provider_payload: raw.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use rust_decimal_macros::dec;
    use serde_json::json;

    const ADDR: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";

    fn incoming_record() -> serde_json::Value {
        json!({
            "txid": "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16",
            "fee": 1000,
            "status": { "confirmed": true, "block_height": 170, "block_time": 1231731025 },
            "vin": [ { "prevout": { "scriptpubkey_address": "1SomeoneElse", "value": 5000000000u64 } } ],
            "vout": [
                { "scriptpubkey_address": ADDR, "value": 1000000000u64 },
                { "scriptpubkey_address": "1SomeoneElse", "value": 3999999000u64 }
            ]
        })
    }

    #[test]
    fn test_normalize_incoming() {
        let tx = normalize_record(&incoming_record(), ADDR).unwrap();

        assert_eq!(tx.transaction_type, TransactionType::TransferIn);
        assert_eq!(tx.quantity, dec!(10));
        assert_eq!(tx.fee, Some(dec!(0.00001)));
        assert_eq!(tx.fee_currency.as_deref(), Some("BTC"));
        assert_eq!(tx.exchange, "ESPLORA");
        assert_eq!(tx.timestamp.timestamp(), 1231731025);
        assert!(tx.price_at_execution.is_none());
    }

    #[test]
    fn test_normalize_outgoing() {
        let record = json!({
            "txid": "aa11",
            "status": { "confirmed": true, "block_time": 1700000000 },
            "vin": [ { "prevout": { "scriptpubkey_address": ADDR, "value": 200000000u64 } } ],
            "vout": [
                { "scriptpubkey_address": "1Recipient", "value": 150000000u64 },
                // change back to ourselves
                { "scriptpubkey_address": ADDR, "value": 49000000u64 }
            ]
        });

        let tx = normalize_record(&record, ADDR).unwrap();

        assert_eq!(tx.transaction_type, TransactionType::TransferOut);
        assert_eq!(tx.quantity, dec!(1.51));
    }

    #[test]
    fn test_normalize_zero_net_keeps_inbound_leg() {
        // Perfect self-transfer: in and out cancel exactly
        let record = json!({
            "txid": "bb22",
            "status": { "confirmed": true, "block_time": 1700000000 },
            "vin": [ { "prevout": { "scriptpubkey_address": ADDR, "value": 100000000u64 } } ],
            "vout": [ { "scriptpubkey_address": ADDR, "value": 100000000u64 } ]
        });

        let tx = normalize_record(&record, ADDR).unwrap();

        assert_eq!(tx.transaction_type, TransactionType::TransferIn);
        assert_eq!(tx.quantity, dec!(1));
    }

    #[test]
    fn test_normalize_skips_unconfirmed() {
        let record = json!({
            "txid": "cc33",
            "status": { "confirmed": false },
            "vout": [ { "scriptpubkey_address": ADDR, "value": 1000u64 } ]
        });
        assert!(normalize_record(&record, ADDR).is_none());
    }

    #[test]
    fn test_normalize_skips_malformed_record() {
        // No txid - undecodable, must not panic or error the batch
        let record = json!({ "status": { "confirmed": true, "block_time": 1 } });
        assert!(normalize_record(&record, ADDR).is_none());
    }

    #[test]
    fn test_normalize_skips_unrelated_transaction() {
        let record = json!({
            "txid": "dd44",
            "status": { "confirmed": true, "block_time": 1700000000 },
            "vout": [ { "scriptpubkey_address": "1SomeoneElse", "value": 5000u64 } ]
        });
        assert!(normalize_record(&record, ADDR).is_none());
    }

    #[test]
    fn test_raw_payload_is_carried() {
        let record = incoming_record();
        let tx = normalize_record(&record, ADDR).unwrap();
        assert_eq!(tx.raw_provider_payload, record);
    }
}
