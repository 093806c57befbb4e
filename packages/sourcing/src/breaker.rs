//! Per-source circuit breaking and error classification.
//!
//! Each source carries a closed → open → half-open state machine. Five
//! consecutive failures open the circuit; after a cooldown exactly one
//! trial request is allowed through. The trial's success closes the
//! circuit, its failure re-opens it and restarts the cooldown clock.
//!
//! Failure counts are cleared only by a success, never by request or
//! budget boundaries. A source that kept failing ten minutes ago is still
//! suspect now; letting counts persist is what keeps a degraded source
//! avoided across a session.
//!
//! The classifier buckets error text for observability only; no bucket
//! changes breaker transitions.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::ErrorKind;

/// Breaker tuning.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// How long an open circuit rejects before allowing a trial.
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Circuit position for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are skipped until the cooldown elapses.
    Open,
    /// One trial request is in flight.
    HalfOpen,
}

#[derive(Debug)]
struct SourceBreaker {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    trial_started: Option<Instant>,
}

impl SourceBreaker {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure: None,
            trial_started: None,
        }
    }
}

/// Process-wide registry of per-source breakers.
///
/// Shared by `Arc` across concurrent searches; the interior map is mutex
/// guarded so failure increments from simultaneous requests never race.
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    config: BreakerConfig,
    sources: Mutex<HashMap<String, SourceBreaker>>,
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::with_config(BreakerConfig::default())
    }

    pub fn with_config(config: BreakerConfig) -> Self {
        Self {
            config,
            sources: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a request may be routed to this source right now.
    ///
    /// An open circuit whose cooldown has elapsed flips to half-open and
    /// answers `true` exactly once; the next answer depends on how the
    /// trial is recorded.
    pub fn can_execute(&self, source: &str) -> bool {
        let mut sources = self.sources.lock().unwrap();
        let breaker = sources
            .entry(source.to_string())
            .or_insert_with(SourceBreaker::new);

        match breaker.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                // A trial whose outcome was never reported (the request
                // was dropped before dispatch) counts as lost after one
                // cooldown; a fresh trial is allowed.
                let stale = breaker
                    .trial_started
                    .map(|at| at.elapsed() >= self.config.cooldown)
                    .unwrap_or(true);
                if stale {
                    info!(source, "previous trial never reported, allowing another");
                    breaker.trial_started = Some(Instant::now());
                    true
                } else {
                    false
                }
            }
            CircuitState::Open => {
                let cooled = breaker
                    .last_failure
                    .map(|at| at.elapsed() >= self.config.cooldown)
                    .unwrap_or(true);
                if cooled {
                    info!(source, "circuit half-open, allowing trial request");
                    breaker.state = CircuitState::HalfOpen;
                    breaker.trial_started = Some(Instant::now());
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call: the circuit closes and counters clear.
    pub fn record_success(&self, source: &str) {
        let mut sources = self.sources.lock().unwrap();
        let breaker = sources
            .entry(source.to_string())
            .or_insert_with(SourceBreaker::new);

        if breaker.state != CircuitState::Closed {
            info!(source, "circuit closed after successful call");
        }
        breaker.state = CircuitState::Closed;
        breaker.failure_count = 0;
        breaker.last_failure = None;
        breaker.trial_started = None;
    }

    /// Record a failed call.
    ///
    /// A failed half-open trial re-opens immediately and restarts the
    /// cooldown; a closed circuit opens once the threshold is reached.
    pub fn record_failure(&self, source: &str) {
        let mut sources = self.sources.lock().unwrap();
        let breaker = sources
            .entry(source.to_string())
            .or_insert_with(SourceBreaker::new);

        breaker.failure_count += 1;
        breaker.last_failure = Some(Instant::now());

        match breaker.state {
            CircuitState::HalfOpen => {
                warn!(source, "trial request failed, circuit re-opened");
                breaker.state = CircuitState::Open;
                breaker.trial_started = None;
            }
            CircuitState::Closed if breaker.failure_count >= self.config.failure_threshold => {
                warn!(
                    source,
                    failures = breaker.failure_count,
                    "failure threshold reached, circuit opened"
                );
                breaker.state = CircuitState::Open;
            }
            _ => {
                debug!(
                    source,
                    failures = breaker.failure_count,
                    "failure recorded"
                );
            }
        }
    }

    /// Current circuit position for a source.
    pub fn state(&self, source: &str) -> CircuitState {
        self.sources
            .lock()
            .unwrap()
            .get(source)
            .map(|b| b.state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Accumulated consecutive failures for a source.
    pub fn failure_count(&self, source: &str) -> u32 {
        self.sources
            .lock()
            .unwrap()
            .get(source)
            .map(|b| b.failure_count)
            .unwrap_or(0)
    }
}

/// Bucket an error message for observability.
///
/// Works purely from message content so it applies equally to typed
/// errors and to the stringified failures carried by task results.
pub fn classify_error(message: &str) -> ErrorKind {
    let m = message.to_ascii_lowercase();
    if m.contains("timed out") || m.contains("timeout") {
        ErrorKind::Timeout
    } else if m.contains("rate limit") || m.contains("too many requests") || m.contains("429") {
        ErrorKind::RateLimit
    } else if m.contains("authentication")
        || m.contains("unauthorized")
        || m.contains("forbidden")
        || m.contains("api key")
        || m.contains("401")
        || m.contains("403")
    {
        ErrorKind::Authentication
    } else if m.contains("network")
        || m.contains("connection")
        || m.contains("connect")
        || m.contains("dns")
        || m.contains("unreachable")
    {
        ErrorKind::Network
    } else {
        ErrorKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_registry() -> CircuitBreakerRegistry {
        CircuitBreakerRegistry::with_config(BreakerConfig {
            failure_threshold: 3,
            cooldown: Duration::from_millis(50),
        })
    }

    #[test]
    fn test_closed_until_threshold() {
        let registry = fast_registry();
        registry.record_failure("github");
        registry.record_failure("github");
        assert!(registry.can_execute("github"));
        assert_eq!(registry.state("github"), CircuitState::Closed);

        registry.record_failure("github");
        assert_eq!(registry.state("github"), CircuitState::Open);
        assert!(!registry.can_execute("github"));
    }

    #[test]
    fn test_half_open_allows_exactly_one_trial() {
        let registry = fast_registry();
        for _ in 0..3 {
            registry.record_failure("github");
        }
        assert!(!registry.can_execute("github"));

        std::thread::sleep(Duration::from_millis(60));

        assert!(registry.can_execute("github"));
        // Trial outstanding: nothing else gets through.
        assert!(!registry.can_execute("github"));
    }

    #[test]
    fn test_trial_success_closes_and_resets() {
        let registry = fast_registry();
        for _ in 0..3 {
            registry.record_failure("github");
        }
        std::thread::sleep(Duration::from_millis(60));
        assert!(registry.can_execute("github"));

        registry.record_success("github");
        assert_eq!(registry.state("github"), CircuitState::Closed);
        assert_eq!(registry.failure_count("github"), 0);
        assert!(registry.can_execute("github"));
    }

    #[test]
    fn test_trial_failure_reopens_with_fresh_cooldown() {
        let registry = fast_registry();
        for _ in 0..3 {
            registry.record_failure("github");
        }
        std::thread::sleep(Duration::from_millis(60));
        assert!(registry.can_execute("github"));

        registry.record_failure("github");
        assert_eq!(registry.state("github"), CircuitState::Open);
        assert!(!registry.can_execute("github"));

        std::thread::sleep(Duration::from_millis(60));
        assert!(registry.can_execute("github"));
    }

    #[test]
    fn test_failures_persist_until_success() {
        let registry = fast_registry();
        registry.record_failure("linkedin");
        registry.record_failure("linkedin");
        // No boundary clears the count; only success does.
        assert_eq!(registry.failure_count("linkedin"), 2);
        registry.record_success("linkedin");
        assert_eq!(registry.failure_count("linkedin"), 0);
    }

    #[test]
    fn test_sources_are_independent() {
        let registry = fast_registry();
        for _ in 0..3 {
            registry.record_failure("github");
        }
        assert!(!registry.can_execute("github"));
        assert!(registry.can_execute("stackoverflow"));
    }

    #[test]
    fn test_classification() {
        assert_eq!(classify_error("timed out after 5000ms"), ErrorKind::Timeout);
        assert_eq!(classify_error("HTTP 429 Too Many Requests"), ErrorKind::RateLimit);
        assert_eq!(classify_error("401 unauthorized"), ErrorKind::Authentication);
        assert_eq!(classify_error("invalid api key"), ErrorKind::Authentication);
        assert_eq!(classify_error("connection refused"), ErrorKind::Network);
        assert_eq!(classify_error("something odd happened"), ErrorKind::Unknown);
    }
}
