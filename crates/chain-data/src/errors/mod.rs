//! Error types and retry classification for the chain data crate.
//!
//! This module provides:
//! - [`ChainDataError`]: The main error enum for all provider operations
//! - [`RetryClass`]: Classification for determining fallback behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while fetching wallet transactions.
///
/// Transport-level variants (network, timeout, 429, 5xx) are produced and
/// consumed by the retrying HTTP client; what escapes it is classified into
/// a [`RetryClass`] via [`retry_class`](Self::retry_class), which determines
/// how the provider registry reacts.
#[derive(Error, Debug)]
pub enum ChainDataError {
    /// The wallet address is not valid for any supported encoding.
    /// This is a terminal error - retrying won't help.
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    /// A connection-level failure (refused, reset, DNS).
    /// Retried with backoff inside the HTTP client.
    #[error("Network error: {provider} - {message}")]
    Network {
        /// The provider the request was addressed to
        provider: String,
        /// The transport error description
        message: String,
    },

    /// The request to the provider timed out.
    /// Retried with backoff inside the HTTP client.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider rate limited the request (HTTP 429).
    /// The client waits `Retry-After` and retries without spending a retry slot.
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
        /// Seconds the provider asked us to wait, if it said
        retry_after: Option<u64>,
    },

    /// The provider answered with a non-success HTTP status.
    /// 5xx statuses are retried; everything else is permanent for this provider.
    #[error("HTTP {status} from {provider}")]
    Http {
        /// The provider that returned the status
        provider: String,
        /// The HTTP status code
        status: u16,
    },

    /// The provider's response body could not be decoded into the expected shape.
    /// Try the next provider in the chain.
    #[error("Parse error: {provider} - {message}")]
    Parse {
        /// The provider whose payload failed to decode
        provider: String,
        /// What went wrong
        message: String,
    },

    /// The provider answered successfully but yielded no usable transactions.
    /// Try the next provider in the chain.
    #[error("Empty result from {provider}")]
    EmptyResult {
        /// The provider that returned nothing
        provider: String,
    },

    /// The circuit breaker is open for this provider.
    /// Skip this provider until the circuit closes.
    #[error("Circuit open: {provider}")]
    CircuitOpen {
        /// The provider with an open circuit
        provider: String,
    },

    /// No providers are registered at all.
    #[error("No providers available")]
    NoProvidersAvailable,

    /// Every provider failed or returned nothing usable.
    /// This is the aggregate provider-exhausted error; partial results are
    /// never merged across providers.
    #[error("All providers failed")]
    AllProvidersFailed,
}

impl ChainDataError {
    /// Returns the retry classification for this error.
    ///
    /// The registry uses this to decide between "surface fatal",
    /// "try the next provider", and "try the next provider and record a
    /// circuit-breaker penalty".
    ///
    /// # Examples
    ///
    /// ```
    /// use walletfolio_chain_data::errors::{ChainDataError, RetryClass};
    ///
    /// let error = ChainDataError::Timeout { provider: "ESPLORA".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::FailoverWithPenalty);
    ///
    /// let error = ChainDataError::InvalidAddress("xyz".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            // Terminal errors - never retry
            Self::InvalidAddress(_) | Self::NoProvidersAvailable | Self::AllProvidersFailed => {
                RetryClass::Never
            }

            // Transport failures that already exhausted their retry budget -
            // failover and penalize the provider
            Self::Network { .. } | Self::Timeout { .. } | Self::RateLimited { .. } => {
                RetryClass::FailoverWithPenalty
            }

            // Server errors keep the penalty; other statuses just move on
            Self::Http { status, .. } => {
                if *status >= 500 {
                    RetryClass::FailoverWithPenalty
                } else {
                    RetryClass::NextProvider
                }
            }

            // Provider-specific failures - try next provider
            Self::Parse { .. } | Self::EmptyResult { .. } => RetryClass::NextProvider,

            // Circuit breaker open
            Self::CircuitOpen { .. } => RetryClass::CircuitOpen,
        }
    }

    /// Whether the transport layer should spend a retry slot on this error.
    ///
    /// Rate-limit waits are deliberately excluded: a 429 is handled by
    /// sleeping out `Retry-After`, not by the retry budget.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::Http { status: 500..=599, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address_never_retries() {
        let error = ChainDataError::InvalidAddress("not-an-address".to_string());
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_exhaustion_never_retries() {
        assert_eq!(
            ChainDataError::AllProvidersFailed.retry_class(),
            RetryClass::Never
        );
        assert_eq!(
            ChainDataError::NoProvidersAvailable.retry_class(),
            RetryClass::Never
        );
    }

    #[test]
    fn test_timeout_fails_over_with_penalty() {
        let error = ChainDataError::Timeout {
            provider: "ESPLORA".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::FailoverWithPenalty);
    }

    #[test]
    fn test_rate_limited_fails_over_with_penalty() {
        let error = ChainDataError::RateLimited {
            provider: "BLOCKCYPHER".to_string(),
            retry_after: Some(30),
        };
        assert_eq!(error.retry_class(), RetryClass::FailoverWithPenalty);
    }

    #[test]
    fn test_server_error_keeps_penalty() {
        let error = ChainDataError::Http {
            provider: "BLOCKCHAIN_INFO".to_string(),
            status: 503,
        };
        assert_eq!(error.retry_class(), RetryClass::FailoverWithPenalty);
    }

    #[test]
    fn test_client_error_tries_next_provider() {
        let error = ChainDataError::Http {
            provider: "BLOCKCHAIN_INFO".to_string(),
            status: 404,
        };
        assert_eq!(error.retry_class(), RetryClass::NextProvider);
    }

    #[test]
    fn test_parse_error_tries_next_provider() {
        let error = ChainDataError::Parse {
            provider: "ESPLORA".to_string(),
            message: "missing field `txid`".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::NextProvider);
    }

    #[test]
    fn test_empty_result_tries_next_provider() {
        let error = ChainDataError::EmptyResult {
            provider: "ESPLORA".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::NextProvider);
    }

    #[test]
    fn test_circuit_open_returns_circuit_open() {
        let error = ChainDataError::CircuitOpen {
            provider: "ESPLORA".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::CircuitOpen);
    }

    #[test]
    fn test_transient_classification() {
        assert!(ChainDataError::Timeout {
            provider: "ESPLORA".into()
        }
        .is_transient());
        assert!(ChainDataError::Http {
            provider: "ESPLORA".into(),
            status: 502
        }
        .is_transient());
        assert!(!ChainDataError::Http {
            provider: "ESPLORA".into(),
            status: 403
        }
        .is_transient());
        assert!(!ChainDataError::RateLimited {
            provider: "ESPLORA".into(),
            retry_after: None
        }
        .is_transient());
    }

    #[test]
    fn test_error_display() {
        let error = ChainDataError::InvalidAddress("zz".to_string());
        assert_eq!(format!("{}", error), "Invalid wallet address: zz");

        let error = ChainDataError::Http {
            provider: "ESPLORA".to_string(),
            status: 418,
        };
        assert_eq!(format!("{}", error), "HTTP 418 from ESPLORA");
    }
}
