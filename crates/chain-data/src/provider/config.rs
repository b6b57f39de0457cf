//! Provider configuration.
//!
//! One immutable [`ProviderConfig`] per upstream API, loaded at startup and
//! injected into the provider. There is no process-wide mutable state.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for a single block-explorer provider.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the API, without trailing slash.
    pub base_url: String,

    /// Requests-per-second budget the provider tolerates.
    pub requests_per_second: f64,

    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,

    /// Maximum transport retries per request (429 waits excluded).
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            requests_per_second: 1.0,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl ProviderConfig {
    /// Per-request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Default configuration for the Esplora-style explorer.
    pub fn esplora() -> Self {
        Self {
            base_url: "https://blockstream.info/api".to_string(),
            requests_per_second: 4.0,
            ..Self::default()
        }
    }

    /// Default configuration for the Blockchain.info-style explorer.
    pub fn blockchain_info() -> Self {
        Self {
            base_url: "https://blockchain.info".to_string(),
            requests_per_second: 2.0,
            ..Self::default()
        }
    }

    /// Default configuration for the BlockCypher-style explorer.
    /// The free tier is tight; pace conservatively.
    pub fn blockcypher() -> Self {
        Self {
            base_url: "https://api.blockcypher.com/v1/btc/main".to_string(),
            requests_per_second: 1.0,
            ..Self::default()
        }
    }
}

/// Configuration for all three providers, deserializable as one block.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ChainDataConfig {
    pub esplora: ProviderConfig,
    pub blockchain_info: ProviderConfig,
    pub blockcypher: ProviderConfig,
}

impl Default for ChainDataConfig {
    fn default() -> Self {
        Self {
            esplora: ProviderConfig::esplora(),
            blockchain_info: ProviderConfig::blockchain_info(),
            blockcypher: ProviderConfig::blockcypher(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_complete() {
        let config = ChainDataConfig::default();
        assert!(config.esplora.base_url.starts_with("https://"));
        assert!(config.blockchain_info.base_url.starts_with("https://"));
        assert!(config.blockcypher.base_url.starts_with("https://"));
        assert!(config.esplora.requests_per_second > 0.0);
    }

    #[test]
    fn test_deserialize_partial_override() {
        let config: ProviderConfig = serde_json::from_str(
            r#"{ "base_url": "http://localhost:3002", "max_retries": 1 }"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:3002");
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.timeout_secs, 30);
    }
}
