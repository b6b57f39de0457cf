//! Walletfolio Chain Data Crate
//!
//! This crate provides provider-agnostic blockchain transaction fetching
//! for the Walletfolio wallet sync engine.
//!
//! # Overview
//!
//! The chain data crate supports:
//! - Multiple block-explorer providers with incompatible payload shapes
//! - Priority-ordered provider fallback
//! - Per-provider request pacing and circuit breaking
//! - Bounded retries with exponential backoff and Retry-After handling
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |   Domain Layer   | --> |  WalletAddress   |  (validated identity)
//! +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          | ProviderRegistry |  (priority fallback)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |    Provider      |  (Esplora, Blockchain.info, ...)
//!                          +------------------+
//!                                  |
//!                                  v
//!                       +-----------------------+
//!                       | CanonicalTransaction  |  (one shape for all)
//!                       +-----------------------+
//! ```
//!
//! # Core Types
//!
//! - [`CanonicalTransaction`] - Provider-agnostic transaction record
//! - [`TransactionPage`] - One page of normalized transactions plus cursor
//! - [`PageCursor`] - Provider-interpreted pagination cursor
//! - [`BlockExplorerProvider`] - Trait implemented by each upstream API
//! - [`ProviderRegistry`] - Priority-ordered fallback coordinator

pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

// Re-export all public types from models
pub use models::{
    CanonicalTransaction, Currency, PageCursor, ProviderId, TransactionPage, TransactionType,
    TxHash,
};

// Re-export provider types
pub use provider::blockchain_info::BlockchainInfoProvider;
pub use provider::blockcypher::BlockCypherProvider;
pub use provider::esplora::EsploraProvider;
pub use provider::{BlockExplorerProvider, ChainDataConfig, ProviderConfig};

// Re-export registry types
pub use registry::{CircuitBreaker, CircuitState, ProviderRegistry, RateLimiter};

use std::sync::Arc;

/// Build a registry with the three default providers, sharing one rate limiter.
///
/// Providers are ordered by their declared priority (Esplora first). The
/// rate limiter is configured from each provider's requests-per-second
/// budget; its state is global per provider, shared across all wallets.
pub fn default_registry(config: ChainDataConfig) -> ProviderRegistry {
    let limiter = Arc::new(RateLimiter::new());
    limiter.configure(provider::esplora::PROVIDER_ID, config.esplora.requests_per_second);
    limiter.configure(
        provider::blockchain_info::PROVIDER_ID,
        config.blockchain_info.requests_per_second,
    );
    limiter.configure(
        provider::blockcypher::PROVIDER_ID,
        config.blockcypher.requests_per_second,
    );

    let providers: Vec<Arc<dyn BlockExplorerProvider>> = vec![
        Arc::new(EsploraProvider::new(config.esplora, limiter.clone())),
        Arc::new(BlockchainInfoProvider::new(
            config.blockchain_info,
            limiter.clone(),
        )),
        Arc::new(BlockCypherProvider::new(config.blockcypher, limiter)),
    ];

    ProviderRegistry::new(providers)
}
