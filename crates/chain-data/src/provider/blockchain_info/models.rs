//! Typed payload structures for the ledger-style explorer API.

use serde::Deserialize;

/// Response of `GET /rawaddr/{addr}?limit&offset`.
///
/// `txs` is kept as raw values so one malformed record can be skipped
/// without failing the whole page.
#[derive(Clone, Debug, Deserialize)]
pub struct RawAddrResponse {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub n_tx: Option<u64>,
    #[serde(default)]
    pub txs: Vec<serde_json::Value>,
}

/// One transaction record of the `rawaddr` response.
#[derive(Clone, Debug, Deserialize)]
pub struct RawAddrTx {
    pub hash: String,
    /// Unix timestamp
    pub time: i64,
    /// Signed net satoshi value for the queried address
    #[serde(default)]
    pub result: Option<i64>,
    /// Network fee in satoshis
    #[serde(default)]
    pub fee: Option<u64>,
    #[serde(default)]
    pub out: Vec<RawAddrOut>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawAddrOut {
    #[serde(default)]
    pub addr: Option<String>,
    /// Value in satoshis
    #[serde(default)]
    pub value: Option<u64>,
}
