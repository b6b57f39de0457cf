//! Shared retrying HTTP client for block-explorer providers.
//!
//! All provider traffic funnels through [`HttpClient::get_json`]:
//! - the per-provider rate limiter is acquired before **every** attempt,
//!   retries included;
//! - connection failures, timeouts and 5xx responses are retried up to the
//!   provider's `max_retries`, waiting `2^attempt` seconds (capped at 30s)
//!   between attempts;
//! - HTTP 429 sleeps out `Retry-After` (60s when absent) and retries
//!   without consuming a retry slot;
//! - any other non-success status is permanent for this provider.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;

use crate::errors::ChainDataError;
use crate::registry::RateLimiter;

use super::config::ProviderConfig;

/// Upper bound on the exponential backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Wait applied to a 429 that carries no usable `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Capped exponential backoff delay for transport retry `attempt` (1-based).
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    let secs = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
    Duration::from_secs(secs).min(MAX_BACKOFF)
}

/// Seconds from a `Retry-After` header, if present and in delta-seconds form.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn map_reqwest_error(provider: &str, err: reqwest::Error) -> ChainDataError {
    if err.is_timeout() {
        ChainDataError::Timeout {
            provider: provider.to_string(),
        }
    } else {
        ChainDataError::Network {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }
}

type AttemptFuture<T> = Pin<Box<dyn Future<Output = Result<T, ChainDataError>> + Send>>;

/// Drive one attempt factory until success, permanent failure, or an empty
/// retry budget.
///
/// `op` receives the number of transport retries already spent. Rate-limit
/// errors sleep and loop without touching the budget; transient errors
/// spend a slot and back off; everything else surfaces immediately.
pub(crate) async fn run_with_retries<T, F>(
    provider: &str,
    max_retries: u32,
    mut op: F,
) -> Result<T, ChainDataError>
where
    F: FnMut(u32) -> AttemptFuture<T>,
{
    let mut attempt: u32 = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(ChainDataError::RateLimited {
                provider: p,
                retry_after,
            }) => {
                let wait = retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                warn!("'{p}' rate limited, sleeping {wait}s (retry budget untouched)");
                tokio::time::sleep(Duration::from_secs(wait)).await;
            }
            Err(err) if err.is_transient() && attempt < max_retries => {
                attempt += 1;
                let delay = backoff_delay(attempt);
                warn!(
                    "'{provider}' attempt {attempt}/{max_retries} failed ({err}), \
                     retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// HTTP client bound to one provider's base URL, pacing budget and timeout.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    provider_id: &'static str,
    config: ProviderConfig,
    limiter: Arc<RateLimiter>,
}

impl HttpClient {
    pub fn new(
        provider_id: &'static str,
        config: ProviderConfig,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            provider_id,
            config,
            limiter,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// GET `base_url + path` and decode the JSON body into `T`.
    pub async fn get_json<T>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ChainDataError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let provider = self.provider_id;
        let url = format!("{}{}", self.config.base_url, path);
        let query: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        let client = self.client.clone();
        let limiter = self.limiter.clone();

        run_with_retries(provider, self.config.max_retries, move |attempt| {
            let client = client.clone();
            let limiter = limiter.clone();
            let url = url.clone();
            let query = query.clone();
            Box::pin(async move {
                limiter.acquire(provider).await;
                debug!("{provider} GET {url} (attempt {})", attempt + 1);

                let response = client
                    .get(&url)
                    .query(&query)
                    .send()
                    .await
                    .map_err(|e| map_reqwest_error(provider, e))?;

                let status = response.status();
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(ChainDataError::RateLimited {
                        provider: provider.to_string(),
                        retry_after: parse_retry_after(response.headers()),
                    });
                }
                if !status.is_success() {
                    return Err(ChainDataError::Http {
                        provider: provider.to_string(),
                        status: status.as_u16(),
                    });
                }

                response.json::<T>().await.map_err(|e| ChainDataError::Parse {
                    provider: provider.to_string(),
                    message: e.to_string(),
                })
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_backoff_delay_doubles_then_caps() {
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
        assert_eq!(backoff_delay(4), Duration::from_secs(16));
        // Uncapped this would be 32s, 64s, ...
        assert_eq!(backoff_delay(5), MAX_BACKOFF);
        assert_eq!(backoff_delay(20), MAX_BACKOFF);
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, "17".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(17));

        // HTTP-date form is not supported; fall back to the default wait
        headers.insert(RETRY_AFTER, "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_succeed_records_two_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_op = calls.clone();

        let result: Result<u32, _> = run_with_retries("TEST", 3, move |_attempt| {
            let calls = calls_in_op.clone();
            Box::pin(async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ChainDataError::Network {
                        provider: "TEST".to_string(),
                        message: "connection refused".to_string(),
                    })
                } else {
                    Ok(42)
                }
            })
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_returns_last_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_op = calls.clone();

        let result: Result<u32, _> = run_with_retries("TEST", 2, move |_attempt| {
            let calls = calls_in_op.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ChainDataError::Timeout {
                    provider: "TEST".to_string(),
                })
            })
        })
        .await;

        assert!(matches!(result, Err(ChainDataError::Timeout { .. })));
        // initial attempt + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_does_not_consume_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_op = calls.clone();

        // 429, 429, then a transient error, then success. With max_retries=1
        // this only passes if the 429s left the budget untouched.
        let result: Result<u32, _> = run_with_retries("TEST", 1, move |_attempt| {
            let calls = calls_in_op.clone();
            Box::pin(async move {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(ChainDataError::RateLimited {
                        provider: "TEST".to_string(),
                        retry_after: Some(1),
                    }),
                    2 => Err(ChainDataError::Network {
                        provider: "TEST".to_string(),
                        message: "reset by peer".to_string(),
                    }),
                    _ => Ok(7),
                }
            })
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_permanent_http_error_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_op = calls.clone();

        let result: Result<u32, _> = run_with_retries("TEST", 5, move |_attempt| {
            let calls = calls_in_op.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ChainDataError::Http {
                    provider: "TEST".to_string(),
                    status: 404,
                })
            })
        })
        .await;

        assert!(matches!(
            result,
            Err(ChainDataError::Http { status: 404, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
