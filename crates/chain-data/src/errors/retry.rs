/// Classification for fallback policy.
///
/// Used to determine how the registry should respond to errors from providers.
///
/// # Behavior Summary
///
/// | Class | Try Next Provider? | Record Circuit Breaker Failure? |
/// |-------|-------------------|--------------------------------|
/// | `Never` | No | No |
/// | `FailoverWithPenalty` | Yes | Yes (affects future requests) |
/// | `NextProvider` | Yes | No |
/// | `CircuitOpen` | Yes (skip this one) | No (already recorded) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - invalid address or total exhaustion.
    /// The request is fundamentally invalid and retrying won't help.
    Never,

    /// Failover to the next provider and record a circuit breaker penalty.
    ///
    /// Used when a provider burned through its transport retry budget
    /// (connection failures, timeouts, rate limiting, 5xx). The failure is
    /// recorded in the circuit breaker, which may cause this provider to be
    /// skipped entirely once failures accumulate.
    FailoverWithPenalty,

    /// Try the next provider without recording any penalty.
    ///
    /// Used when this provider can't serve the request (unparsable payload,
    /// empty history, a 4xx it will always answer) but another provider may
    /// well succeed.
    NextProvider,

    /// Circuit breaker is open for this provider.
    /// Skip this provider until the circuit closes.
    CircuitOpen,
}
