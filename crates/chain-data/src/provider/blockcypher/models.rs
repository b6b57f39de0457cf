//! Typed payload structures for the wrapped full-history explorer API.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Response of `GET /addrs/{addr}/full?limit&before`.
#[derive(Clone, Debug, Deserialize)]
pub struct FullAddrResponse {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub txs: Vec<serde_json::Value>,
    /// More history available below the lowest block in this page
    #[serde(default, rename = "hasMore")]
    pub has_more: bool,
}

/// One transaction record of the full-address response.
#[derive(Clone, Debug, Deserialize)]
pub struct FullTx {
    pub hash: String,
    /// Confirmation timestamp (RFC 3339); absent while unconfirmed
    #[serde(default)]
    pub confirmed: Option<DateTime<Utc>>,
    /// Total satoshis moved by the transaction
    #[serde(default)]
    pub total: Option<u64>,
    /// Network fee in satoshis
    #[serde(default)]
    pub fees: Option<u64>,
    #[serde(default)]
    pub block_height: Option<i64>,
    #[serde(default)]
    pub inputs: Vec<FullTxInput>,
    #[serde(default)]
    pub outputs: Vec<FullTxOutput>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FullTxInput {
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Value of the spent output, in satoshis
    #[serde(default)]
    pub output_value: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FullTxOutput {
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Value in satoshis
    #[serde(default)]
    pub value: Option<u64>,
}
