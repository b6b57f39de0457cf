//! Wallet address validation and the portfolio binding model.
//!
//! Three UTXO address encodings are accepted: legacy Base58Check (prefix
//! `1`, version byte 0x00), P2SH Base58Check (prefix `3`, version byte
//! 0x05) and Bech32 segwit (HRP `bc`). Testnet prefixes are rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Mainnet Base58Check version byte for P2PKH addresses.
const VERSION_P2PKH: u8 = 0x00;

/// Mainnet Base58Check version byte for P2SH addresses.
const VERSION_P2SH: u8 = 0x05;

/// Encoding of a validated wallet address.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    /// Legacy pay-to-pubkey-hash, Base58Check with prefix `1`
    Legacy,
    /// Pay-to-script-hash, Base58Check with prefix `3`
    P2sh,
    /// Segwit, Bech32 with prefix `bc1`
    Bech32,
}

/// A validated wallet address. Immutable once constructed.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress {
    address: String,
    kind: AddressKind,
}

impl WalletAddress {
    /// Validate and wrap an address string.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();

        if trimmed.len() < 26 || trimmed.len() > 90 {
            return Err(ValidationError::InvalidAddress(format!(
                "'{}' has invalid length",
                trimmed
            )));
        }

        let kind = classify(trimmed).ok_or_else(|| {
            ValidationError::InvalidAddress(format!(
                "'{}' is not a recognized address encoding",
                trimmed
            ))
        })?;

        Ok(Self {
            address: trimmed.to_string(),
            kind,
        })
    }

    /// Whether a string is a valid address, without keeping the result.
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.address
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(address: WalletAddress) -> Self {
        address.address
    }
}

/// Determine the encoding of an address candidate, if any.
fn classify(address: &str) -> Option<AddressKind> {
    if address.starts_with("bc1") || address.starts_with("BC1") {
        return classify_bech32(address);
    }
    if address.starts_with('1') || address.starts_with('3') {
        return classify_base58(address);
    }
    None
}

fn classify_bech32(address: &str) -> Option<AddressKind> {
    let (hrp, _version, _program) = bech32::segwit::decode(address).ok()?;
    if !hrp.to_string().eq_ignore_ascii_case("bc") {
        return None;
    }
    Some(AddressKind::Bech32)
}

fn classify_base58(address: &str) -> Option<AddressKind> {
    // `with_check` verifies the double-SHA256 checksum and strips it,
    // leaving version byte + 20-byte payload
    let decoded = bs58::decode(address).with_check(None).into_vec().ok()?;
    if decoded.len() != 21 {
        return None;
    }
    match decoded[0] {
        VERSION_P2PKH => Some(AddressKind::Legacy),
        VERSION_P2SH => Some(AddressKind::P2sh),
        _ => None,
    }
}

/// The one wallet currently bound to a portfolio.
///
/// Rebinding a portfolio to a different wallet invalidates the portfolio's
/// dedup cache; [`WalletService`](super::WalletService) enforces that.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PortfolioWalletBinding {
    pub portfolio_id: String,
    pub wallet_address: WalletAddress,
    pub updated_at: DateTime<Utc>,
}
