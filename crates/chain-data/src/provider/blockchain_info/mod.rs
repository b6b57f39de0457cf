//! Ledger-style block explorer provider (Blockchain.info shape).
//!
//! Single endpoint: `GET /rawaddr/{addr}?limit&offset`, returning
//! `{ txs: [{ hash, time, result, out: [{ addr, value }] }] }` where
//! `result` is the signed net satoshi value for the queried address.
//! Pages newest-first; the cursor is a plain record offset.

mod models;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use log::{debug, warn};

use crate::errors::ChainDataError;
use crate::models::{
    direction_from_net, sats_to_btc, CanonicalTransaction, PageCursor, TransactionPage,
};
use crate::provider::{BlockExplorerProvider, HttpClient, ProviderConfig, PROBE_ADDRESS};
use crate::registry::RateLimiter;

pub use models::{RawAddrOut, RawAddrResponse, RawAddrTx};

pub const PROVIDER_ID: &str = "BLOCKCHAIN_INFO";

/// Blockchain.info-style explorer.
pub struct BlockchainInfoProvider {
    http: HttpClient,
}

impl BlockchainInfoProvider {
    pub fn new(config: ProviderConfig, limiter: Arc<RateLimiter>) -> Self {
        Self {
            http: HttpClient::new(PROVIDER_ID, config, limiter),
        }
    }
}

#[async_trait]
impl BlockExplorerProvider for BlockchainInfoProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        2
    }

    async fn fetch_page(
        &self,
        address: &str,
        limit: u32,
        cursor: Option<&PageCursor>,
    ) -> Result<TransactionPage, ChainDataError> {
        let offset = match cursor {
            None => 0,
            Some(PageCursor::Offset(n)) => *n,
            Some(other) => {
                warn!("ignoring foreign cursor {:?} for '{}'", other, PROVIDER_ID);
                0
            }
        };

        let query: Vec<(&str, String)> = vec![
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        let response: RawAddrResponse = self
            .http
            .get_json(&format!("/rawaddr/{address}"), &query)
            .await?;

        let fetched = response.txs.len() as u32;
        let mut transactions = Vec::with_capacity(response.txs.len());
        let mut skipped = 0usize;
        for record in &response.txs {
            match normalize_record(record, address) {
                Some(tx) => transactions.push(tx),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!("'{}' skipped {} unnormalizable records", PROVIDER_ID, skipped);
        }

        let next_cursor = if fetched > 0 {
            Some(PageCursor::Offset(offset + fetched))
        } else {
            None
        };

        Ok(TransactionPage {
            transactions,
            next_cursor,
        })
    }

    async fn probe(&self) -> Result<(), ChainDataError> {
        let _: RawAddrResponse = self
            .http
            .get_json(
                &format!("/rawaddr/{PROBE_ADDRESS}"),
                &[("limit", "1".to_string())],
            )
            .await?;
        Ok(())
    }
}

/// Map one raw `rawaddr` record into the canonical shape.
///
/// The signed `result` field drives direction and quantity. Records missing
/// `hash` or `time` are skipped; a missing `result` falls back to the sum
/// of outputs paid to the address.
pub(crate) fn normalize_record(
    raw: &serde_json::Value,
    address: &str,
) -> Option<CanonicalTransaction> {
    let tx: RawAddrTx = serde_json::from_value(raw.clone()).ok()?;
    let timestamp = Utc.timestamp_opt(tx.time, 0).single()?;

    let received: i64 = tx
        .out
        .iter()
        .filter(|out| out.addr.as_deref() == Some(address))
        .filter_map(|out| out.value)
        .map(|v| v as i64)
        .sum();
    let net = tx.result.unwrap_or(received);

    let quantity_sats = if net != 0 { net.abs() } else { received };
    if quantity_sats <= 0 {
        return None;
    }

    Some(CanonicalTransaction {
        transaction_hash: tx.hash,
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

    const ADDR: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

    #[test]
    fn test_normalize_incoming_from_result() {
        let record = json!({
            "hash": "ab01",
            "time": 1231006505,
            "result": 5000000000u64,
            "fee": 0,
            "out": [ { "addr": ADDR, "value": 5000000000u64 } ]
        });

        let tx = normalize_record(&record, ADDR).unwrap();

        assert_eq!(tx.transaction_type, TransactionType::TransferIn);
        assert_eq!(tx.quantity, dec!(50));
        assert_eq!(tx.exchange, "BLOCKCHAIN_INFO");
    }

    #[test]
    fn test_normalize_outgoing_from_result() {
        let record = json!({
            "hash": "ab02",
            "time": 1231006505,
            "result": -123450000,
            "out": [ { "addr": "1SomeoneElse", "value": 123450000u64 } ]
        });

        let tx = normalize_record(&record, ADDR).unwrap();

        assert_eq!(tx.transaction_type, TransactionType::TransferOut);
        assert_eq!(tx.quantity, dec!(1.2345));
    }

    #[test]
    fn test_normalize_missing_result_falls_back_to_outputs() {
        let record = json!({
            "hash": "ab03",
            "time": 1231006505,
            "out": [
                { "addr": ADDR, "value": 70000000u64 },
                { "addr": "1SomeoneElse", "value": 100u64 }
            ]
        });

        let tx = normalize_record(&record, ADDR).unwrap();

        assert_eq!(tx.transaction_type, TransactionType::TransferIn);
        assert_eq!(tx.quantity, dec!(0.7));
    }

    #[test]
    fn test_normalize_skips_missing_fields() {
        // no time
        assert!(normalize_record(&json!({ "hash": "x", "result": 5 }), ADDR).is_none());
        // no hash
        assert!(normalize_record(&json!({ "time": 1, "result": 5 }), ADDR).is_none());
        // nothing for this address at all
        assert!(normalize_record(
            &json!({ "hash": "x", "time": 1, "result": 0, "out": [] }),
            ADDR
        )
        .is_none());
    }
}
