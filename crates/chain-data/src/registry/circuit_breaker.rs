//! Per-provider circuit breaker for fault tolerance.
//!
//! Prevents hammering a provider that is currently failing. The circuit has
//! three states:
//!
//! - **Closed**: Normal operation, requests are allowed through.
//! - **Open**: Provider is failing, requests are blocked.
//! - **HalfOpen**: Testing if the provider has recovered.
//!
//! State is in-memory and resets on application restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{info, warn};

/// Failures before the circuit opens.
const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// How long an open circuit blocks before a half-open trial.
const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Successes needed to close the circuit from HalfOpen.
const DEFAULT_HALF_OPEN_SUCCESSES: u32 = 2;

/// Circuit breaker state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CircuitState {
    /// Normal operation - requests are allowed.
    Closed,
    /// Provider is failing - requests are blocked.
    Open,
    /// Testing recovery - limited requests allowed.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit.
    pub failure_threshold: u32,
    /// Time to wait before testing recovery.
    pub recovery_timeout: Duration,
    /// Number of successes needed to close from HalfOpen.
    pub half_open_success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout: DEFAULT_RECOVERY_TIMEOUT,
            half_open_success_threshold: DEFAULT_HALF_OPEN_SUCCESSES,
        }
    }
}

/// Per-provider circuit tracking.
#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    last_failure: Option<Instant>,
}

impl Circuit {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            half_open_successes: 0,
            last_failure: None,
        }
    }
}

/// Thread-safe per-provider circuit breaker.
pub struct CircuitBreaker {
    circuits: Mutex<HashMap<String, Circuit>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            circuits: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Lock the circuits mutex, recovering from poison if necessary.
    /// Slightly stale circuit state beats panicking mid-sync.
    fn lock_circuits(&self) -> MutexGuard<'_, HashMap<String, Circuit>> {
        self.circuits.lock().unwrap_or_else(|poisoned| {
            warn!("Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Check whether requests are allowed for a provider.
    ///
    /// Also drives the Open -> HalfOpen transition once the recovery
    /// timeout elapses.
    pub fn is_allowed(&self, provider: &str) -> bool {
        let mut circuits = self.lock_circuits();
        let circuit = circuits
            .entry(provider.to_string())
            .or_insert_with(Circuit::new);

        match circuit.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let recovered = circuit
                    .last_failure
                    .map(|at| at.elapsed() >= self.config.recovery_timeout)
                    .unwrap_or(true);
                if recovered {
                    info!("Circuit for '{}' moving to HalfOpen", provider);
                    circuit.state = CircuitState::HalfOpen;
                    circuit.half_open_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self, provider: &str) {
        let mut circuits = self.lock_circuits();
        let circuit = circuits
            .entry(provider.to_string())
            .or_insert_with(Circuit::new);

        match circuit.state {
            CircuitState::Closed => {
                circuit.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                circuit.half_open_successes += 1;
                if circuit.half_open_successes >= self.config.half_open_success_threshold {
                    info!("Circuit for '{}' closed after recovery", provider);
                    *circuit = Circuit::new();
                }
            }
            CircuitState::Open => {
                // A success while open means a request slipped through the
                // recovery window; treat it as the first half-open success.
                circuit.state = CircuitState::HalfOpen;
                circuit.half_open_successes = 1;
            }
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self, provider: &str) {
        let mut circuits = self.lock_circuits();
        let circuit = circuits
            .entry(provider.to_string())
            .or_insert_with(Circuit::new);

        circuit.consecutive_failures += 1;
        circuit.last_failure = Some(Instant::now());

        match circuit.state {
            CircuitState::HalfOpen => {
                warn!("Circuit for '{}' reopened after half-open failure", provider);
                circuit.state = CircuitState::Open;
                circuit.half_open_successes = 0;
            }
            CircuitState::Closed => {
                if circuit.consecutive_failures >= self.config.failure_threshold {
                    warn!(
                        "Circuit for '{}' opened after {} consecutive failures",
                        provider, circuit.consecutive_failures
                    );
                    circuit.state = CircuitState::Open;
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Current state for a provider (Closed when never seen).
    pub fn state(&self, provider: &str) -> CircuitState {
        let circuits = self.lock_circuits();
        circuits
            .get(provider)
            .map(|c| c.state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Reset a provider's circuit to Closed.
    pub fn reset(&self, provider: &str) {
        let mut circuits = self.lock_circuits();
        circuits.remove(provider);
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}
