//! Provider fallback coordination.
//!
//! The registry tries providers in priority order until one yields a
//! usable page of transactions. Results from different providers are never
//! merged: mixing pagination cursors across APIs would corrupt a sync run,
//! so the first provider to answer wins the whole run.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::errors::{ChainDataError, RetryClass};
use crate::models::{ProviderId, TransactionPage};
use crate::provider::BlockExplorerProvider;

use super::CircuitBreaker;

/// Priority-ordered fallback coordinator over block-explorer providers.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn BlockExplorerProvider>>,
    circuit_breaker: CircuitBreaker,
}

impl ProviderRegistry {
    /// Create a registry; providers are ordered by their declared priority.
    pub fn new(providers: Vec<Arc<dyn BlockExplorerProvider>>) -> Self {
        Self::with_breaker(providers, CircuitBreaker::new())
    }

    /// Create a registry with a custom circuit breaker.
    pub fn with_breaker(
        mut providers: Vec<Arc<dyn BlockExplorerProvider>>,
        circuit_breaker: CircuitBreaker,
    ) -> Self {
        providers.sort_by_key(|p| p.priority());
        Self {
            providers,
            circuit_breaker,
        }
    }

    /// Fetch the first page of an address's history from the first provider
    /// that can serve it.
    ///
    /// Providers are tried in priority order:
    /// 1. Skip providers with an open circuit
    /// 2. Fetch the first page (the provider retries transport failures itself)
    /// 3. A non-empty normalized page wins - later providers are not tried
    /// 4. On failure, the retry class decides between "surface fatal",
    ///    "failover with a circuit penalty" and "just try the next one"
    ///
    /// If every provider fails or returns empty, the aggregate
    /// [`ChainDataError::AllProvidersFailed`] is returned - never partial
    /// results stitched together across providers.
    pub async fn fetch_first_page(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<(ProviderId, TransactionPage), ChainDataError> {
        if self.providers.is_empty() {
            warn!("No block-explorer providers registered");
            return Err(ChainDataError::NoProvidersAvailable);
        }

        let mut last_error: Option<ChainDataError> = None;

        for provider in &self.providers {
            let provider_id = provider.id();

            if !self.circuit_breaker.is_allowed(provider_id) {
                debug!("Circuit open for provider '{}', skipping", provider_id);
                continue;
            }

            info!("Fetching transactions for {} from '{}'", address, provider_id);

            match provider.fetch_page(address, limit, None).await {
                Ok(page) if page.is_empty() => {
                    debug!("Provider '{}' returned no transactions, trying next", provider_id);
                    self.circuit_breaker.record_success(provider_id);
                    last_error = Some(ChainDataError::EmptyResult {
                        provider: provider_id.to_string(),
                    });
                }
                Ok(page) => {
                    self.circuit_breaker.record_success(provider_id);
                    info!(
                        "Provider '{}' returned {} transactions",
                        provider_id,
                        page.len()
                    );
                    return Ok((std::borrow::Cow::Borrowed(provider_id), page));
                }
                Err(e) => {
                    match e.retry_class() {
                        RetryClass::Never => {
                            info!("Terminal error from '{}': {}, not retrying", provider_id, e);
                            return Err(e);
                        }
                        RetryClass::FailoverWithPenalty | RetryClass::CircuitOpen => {
                            self.circuit_breaker.record_failure(provider_id);
                            warn!(
                                "Provider '{}' failed with {}, recorded circuit breaker failure",
                                provider_id, e
                            );
                        }
                        RetryClass::NextProvider => {
                            info!("Provider '{}' failed with {}, trying next provider", provider_id, e);
                        }
                    }
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error {
            warn!("All providers exhausted, last error: {}", e);
        }
        Err(ChainDataError::AllProvidersFailed)
    }

    /// Look up a provider by id, e.g. to continue paginating with the
    /// winner of [`fetch_first_page`](Self::fetch_first_page).
    pub fn provider(&self, id: &str) -> Option<Arc<dyn BlockExplorerProvider>> {
        self.providers.iter().find(|p| p.id() == id).cloned()
    }

    /// Probe every provider and report reachability by name.
    pub async fn test_connectivity(&self) -> HashMap<String, bool> {
        let mut results = HashMap::new();
        for provider in &self.providers {
            let ok = match provider.probe().await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Connectivity probe failed for '{}': {}", provider.id(), e);
                    false
                }
            };
            results.insert(provider.id().to_string(), ok);
        }
        results
    }

    /// The registered providers, in fallback order.
    pub fn providers(&self) -> &[Arc<dyn BlockExplorerProvider>] {
        &self.providers
    }

    /// Check if a provider's circuit is open.
    pub fn is_circuit_open(&self, provider_id: &str) -> bool {
        !self.circuit_breaker.is_allowed(provider_id)
    }

    /// Reset a provider's circuit breaker.
    pub fn reset_circuit(&self, provider_id: &str) {
        self.circuit_breaker.reset(provider_id);
    }
}
