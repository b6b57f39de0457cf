//! Typed payload structures for the Esplora-style explorer API.

use serde::Deserialize;

/// One transaction from `GET /address/{addr}/txs` or `GET /tx/{hash}`.
#[derive(Clone, Debug, Deserialize)]
pub struct EsploraTx {
    /// Transaction id
    pub txid: String,
    /// Network fee in satoshis
    #[serde(default)]
    pub fee: Option<u64>,
    /// Confirmation status, absent for never-seen transactions
    #[serde(default)]
    pub status: Option<EsploraTxStatus>,
    /// Inputs, with the spent output inlined
    #[serde(default)]
    pub vin: Vec<EsploraVin>,
    /// Outputs
    #[serde(default)]
    pub vout: Vec<EsploraVout>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EsploraTxStatus {
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u64>,
    /// Unix timestamp of the containing block; absent while unconfirmed
    #[serde(default)]
    pub block_time: Option<i64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EsploraVin {
    /// The output this input spends
    #[serde(default)]
    pub prevout: Option<EsploraVout>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EsploraVout {
    #[serde(default)]
    pub scriptpubkey_address: Option<String>,
    /// Value in satoshis
    #[serde(default)]
    pub value: Option<u64>,
}

/// One entry of `GET /blocks?limit=1`, used by the connectivity probe.
#[derive(Clone, Debug, Deserialize)]
pub struct EsploraBlock {
    pub id: String,
    pub height: u64,
}
