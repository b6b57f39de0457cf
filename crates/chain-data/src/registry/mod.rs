//! Provider registry module.
//!
//! This module provides orchestration for block-explorer providers, including:
//! - Provider registration and priority ordering
//! - Fallback to the next provider until one yields usable data
//! - Per-provider request pacing
//! - Circuit breaking for fault tolerance

mod circuit_breaker;
mod rate_limiter;
mod registry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use rate_limiter::RateLimiter;
pub use registry::ProviderRegistry;
