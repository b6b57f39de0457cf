//! Wrapped full-history explorer provider (BlockCypher shape).
//!
//! Single endpoint: `GET /addrs/{addr}/full?limit&before`, returning
//! `{ txs: [{ hash, confirmed, total, fees }] }` plus full input/output
//! address lists. Pages newest-first; the cursor is the block height of
//! the last record, passed back as `before`.

mod models;

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use crate::errors::ChainDataError;
use crate::models::{
    direction_from_net, sats_to_btc, CanonicalTransaction, PageCursor, TransactionPage,
};
use crate::provider::{BlockExplorerProvider, HttpClient, ProviderConfig, PROBE_ADDRESS};
use crate::registry::RateLimiter;

pub use models::{FullAddrResponse, FullTx, FullTxInput, FullTxOutput};

pub const PROVIDER_ID: &str = "BLOCKCYPHER";

/// BlockCypher-style explorer. The free tier is heavily rate limited, so
/// this provider sits last in the fallback order.
pub struct BlockCypherProvider {
    http: HttpClient,
}

impl BlockCypherProvider {
    pub fn new(config: ProviderConfig, limiter: Arc<RateLimiter>) -> Self {
        Self {
            http: HttpClient::new(PROVIDER_ID, config, limiter),
        }
    }
}

#[async_trait]
impl BlockExplorerProvider for BlockCypherProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        3
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
            Some(PageCursor::BeforeHeight(height)) => {
                query.push(("before", height.to_string()));
            }
            Some(other) => {
                warn!("ignoring foreign cursor {:?} for '{}'", other, PROVIDER_ID);
            }
        }

        let response: FullAddrResponse = self
            .http
            .get_json(&format!("/addrs/{address}/full"), &query)
            .await?;

        // The cursor comes from the raw page so skipped records still
        // advance it
        let next_cursor = if response.has_more {
            response
                .txs
                .last()
                .and_then(|record| record.get("block_height"))
                .and_then(|height| height.as_u64())
                .map(PageCursor::BeforeHeight)
        } else {
            None
        };

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

        Ok(TransactionPage {
            transactions,
            next_cursor,
        })
    }

    async fn probe(&self) -> Result<(), ChainDataError> {
        let _: FullAddrResponse = self
            .http
            .get_json(
                &format!("/addrs/{PROBE_ADDRESS}/full"),
                &[("limit", "1".to_string())],
            )
            .await?;
        Ok(())
    }
}

/// Map one raw full-history record into the canonical shape.
///
/// This shape carries no signed net value, so direction is derived from the
/// input/output address lists. When the lists don't mention the address at
/// all the net is zero and the documented inbound quirk applies, with the
/// transaction total as the quantity.
pub(crate) fn normalize_record(
    raw: &serde_json::Value,
    address: &str,
) -> Option<CanonicalTransaction> {
    let tx: FullTx = serde_json::from_value(raw.clone()).ok()?;
    let timestamp = tx.confirmed?;

    let received: i64 = tx
        .outputs
        .iter()
        .filter(|out| out.addresses.iter().any(|a| a == address))
        .filter_map(|out| out.value)
        .map(|v| v as i64)
        .sum();
    let sent: i64 = tx
        .inputs
        .iter()
        .filter(|input| input.addresses.iter().any(|a| a == address))
        .filter_map(|input| input.output_value)
        .map(|v| v as i64)
        .sum();
    let net = received - sent;

    let quantity_sats = if net != 0 {
        net.abs()
    } else if received > 0 {
        received
    } else {
        tx.total.map(|t| t as i64).unwrap_or(0)
    };
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
        fee: tx.fees.map(|f| sats_to_btc(f as i64)),
        fee_currency: tx.fees.map(|_| "BTC".to_string()),
        timestamp,
        exchange: PROVIDER_ID.to_string(),
        notes: None,
        raw_provider_payload: raw.clone(),
    })
}
