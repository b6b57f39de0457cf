//! Per-provider request pacing.
//!
//! Each provider gets a pacer that spaces granted calls at least
//! `1 / requests_per_second` apart. This is a pure pacing primitive, not
//! admission control: `acquire` always eventually grants, it just blocks
//! the caller for the minimum time the provider's budget requires.
//!
//! Pacer state is global per provider - shared across every wallet that
//! hits that provider - and safe for concurrent use.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

/// Default budget for providers that were never configured.
const DEFAULT_REQUESTS_PER_SECOND: f64 = 1.0;

/// Pacing state for a single provider.
#[derive(Debug)]
struct Pacer {
    /// Minimum spacing between granted calls.
    interval: Duration,
    /// When the last call was granted.
    last_grant: Option<Instant>,
}

impl Pacer {
    fn new(requests_per_second: f64) -> Self {
        let rps = if requests_per_second > 0.0 {
            requests_per_second
        } else {
            DEFAULT_REQUESTS_PER_SECOND
        };
        Self {
            interval: Duration::from_secs_f64(1.0 / rps),
            last_grant: None,
        }
    }

    /// Grant now, or say how long the caller must still wait.
    fn try_grant(&mut self, now: Instant) -> Result<(), Duration> {
        match self.last_grant {
            None => {
                self.last_grant = Some(now);
                Ok(())
            }
            Some(last) => {
                let elapsed = now.duration_since(last);
                if elapsed >= self.interval {
                    self.last_grant = Some(now);
                    Ok(())
                } else {
                    Err(self.interval - elapsed)
                }
            }
        }
    }
}

/// Pacing rate limiter for multiple providers.
///
/// Pacers are created on demand with default settings, or can be configured
/// with each provider's requests-per-second budget up front.
pub struct RateLimiter {
    /// Per-provider pacers.
    pacers: Mutex<HashMap<String, Pacer>>,
    /// Per-provider budget overrides.
    rates: Mutex<HashMap<String, f64>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            pacers: Mutex::new(HashMap::new()),
            rates: Mutex::new(HashMap::new()),
        }
    }

    /// Lock the pacers mutex, recovering from poison if necessary.
    ///
    /// The worst case of recovering is slightly off pacing, which beats
    /// panicking mid-sync.
    fn lock_pacers(&self) -> MutexGuard<'_, HashMap<String, Pacer>> {
        self.pacers.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter pacers mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_rates(&self) -> MutexGuard<'_, HashMap<String, f64>> {
        self.rates.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter rates mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Configure the budget for a specific provider.
    pub fn configure(&self, provider: &str, requests_per_second: f64) {
        let mut rates = self.lock_rates();
        rates.insert(provider.to_string(), requests_per_second);
        drop(rates);

        // Reset the pacer if it already exists
        let mut pacers = self.lock_pacers();
        pacers.remove(provider);
    }

    /// Block until the provider's budget permits another call.
    ///
    /// Waits (asynchronously) until at least `1/rate` seconds have elapsed
    /// since the provider's last granted call, then records the grant.
    pub async fn acquire(&self, provider: &str) {
        loop {
            let wait = {
                let mut pacers = self.lock_pacers();
                let pacer = pacers
                    .entry(provider.to_string())
                    .or_insert_with(|| self.create_pacer(provider));

                match pacer.try_grant(Instant::now()) {
                    Ok(()) => {
                        debug!("Rate limiter: granted call for '{}'", provider);
                        return;
                    }
                    Err(wait) => wait,
                }
            };

            debug!("Rate limiter: waiting {:?} for provider '{}'", wait, provider);
            tokio::time::sleep(wait).await;
        }
    }

    /// Try to get a grant without waiting.
    ///
    /// Returns true if the call was granted, false if the caller would
    /// have to wait.
    pub fn try_acquire(&self, provider: &str) -> bool {
        let mut pacers = self.lock_pacers();
        let pacer = pacers
            .entry(provider.to_string())
            .or_insert_with(|| self.create_pacer(provider));

        pacer.try_grant(Instant::now()).is_ok()
    }

    /// Forget a provider's pacing state.
    pub fn reset(&self, provider: &str) {
        let mut pacers = self.lock_pacers();
        pacers.remove(provider);
    }

    fn create_pacer(&self, provider: &str) -> Pacer {
        let rates = self.lock_rates();
        let rps = rates
            .get(provider)
            .copied()
            .unwrap_or(DEFAULT_REQUESTS_PER_SECOND);
        Pacer::new(rps)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_grant_is_immediate() {
        let limiter = RateLimiter::new();
        assert!(limiter.try_acquire("TEST_PROVIDER"));
    }

    #[test]
    fn test_second_grant_requires_waiting() {
        let limiter = RateLimiter::new();
        assert!(limiter.try_acquire("TEST_PROVIDER"));
        assert!(!limiter.try_acquire("TEST_PROVIDER"));
    }

    #[test]
    fn test_per_provider_isolation() {
        let limiter = RateLimiter::new();

        assert!(limiter.try_acquire("PROVIDER_A"));
        assert!(!limiter.try_acquire("PROVIDER_A"));

        // Provider B has its own pacer
        assert!(limiter.try_acquire("PROVIDER_B"));
    }

    #[test]
    fn test_reset_forgets_state() {
        let limiter = RateLimiter::new();

        assert!(limiter.try_acquire("RESET_PROVIDER"));
        assert!(!limiter.try_acquire("RESET_PROVIDER"));

        limiter.reset("RESET_PROVIDER");
        assert!(limiter.try_acquire("RESET_PROVIDER"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_paces_at_configured_interval() {
        let limiter = RateLimiter::new();
        limiter.configure("PACED", 2.0); // one call per 500ms

        let start = Instant::now();
        limiter.acquire("PACED").await;
        limiter.acquire("PACED").await;
        limiter.acquire("PACED").await;

        // Two waits of >= 500ms each
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_calls_do_not_wait() {
        let limiter = RateLimiter::new();
        limiter.configure("SPACED", 10.0); // 100ms interval

        limiter.acquire("SPACED").await;
        tokio::time::advance(Duration::from_millis(150)).await;

        let start = Instant::now();
        limiter.acquire("SPACED").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_configure_resets_existing_pacer() {
        let limiter = RateLimiter::new();

        assert!(limiter.try_acquire("RECONFIGURED"));
        assert!(!limiter.try_acquire("RECONFIGURED"));

        limiter.configure("RECONFIGURED", 5.0);
        assert!(limiter.try_acquire("RECONFIGURED"));
    }
}
