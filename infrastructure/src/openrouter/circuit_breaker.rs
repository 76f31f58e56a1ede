//! Per-model circuit breaker
//!
//! A model that keeps failing is short-circuited for a while instead of
//! being hammered with requests. Each model has its own circuit:
//!
//! - **Closed**: requests pass; consecutive failures are counted
//! - **Open**: requests are rejected until `reset_timeout` has passed
//! - **HalfOpen**: requests pass as trial calls; `success_threshold` successes
//!   close the circuit, any failure reopens it

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Breaker thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerSettings {
    /// Consecutive failures that open a closed circuit
    pub failure_threshold: u32,
    /// Trial successes that close a half-open circuit
    pub success_threshold: u32,
    /// How long an open circuit rejects requests
    pub reset_timeout: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    failures: u32,
    successes: u32,
    changed_at: Instant,
}

impl Circuit {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            successes: 0,
            changed_at: Instant::now(),
        }
    }

    fn set_state(&mut self, state: CircuitState) {
        self.state = state;
        self.changed_at = Instant::now();
    }
}

/// Set of circuits keyed by model id
#[derive(Debug)]
pub struct CircuitBreaker {
    settings: BreakerSettings,
    circuits: Mutex<HashMap<String, Circuit>>,
}

impl CircuitBreaker {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            circuits: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject a request for `key`
    ///
    /// Returns the remaining open time when rejected. An open circuit whose
    /// timeout has elapsed moves to half-open and admits the request.
    pub fn try_acquire(&self, key: &str) -> Result<(), Duration> {
        let Ok(mut circuits) = self.circuits.lock() else {
            return Ok(());
        };
        let circuit = circuits.entry(key.to_string()).or_insert_with(Circuit::new);

        if circuit.state != CircuitState::Open {
            return Ok(());
        }

        let open_for = circuit.changed_at.elapsed();
        if open_for >= self.settings.reset_timeout {
            circuit.set_state(CircuitState::HalfOpen);
            circuit.successes = 0;
            info!("Circuit {}: open -> half_open", key);
            Ok(())
        } else {
            Err(self.settings.reset_timeout - open_for)
        }
    }

    pub fn record_success(&self, key: &str) {
        let Ok(mut circuits) = self.circuits.lock() else {
            return;
        };
        let circuit = circuits.entry(key.to_string()).or_insert_with(Circuit::new);

        match circuit.state {
            CircuitState::HalfOpen => {
                circuit.successes += 1;
                if circuit.successes >= self.settings.success_threshold {
                    circuit.set_state(CircuitState::Closed);
                    circuit.failures = 0;
                    circuit.successes = 0;
                    info!("Circuit {}: half_open -> closed", key);
                }
            }
            CircuitState::Closed => circuit.failures = 0,
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self, key: &str) {
        let Ok(mut circuits) = self.circuits.lock() else {
            return;
        };
        let circuit = circuits.entry(key.to_string()).or_insert_with(Circuit::new);
        circuit.failures += 1;

        match circuit.state {
            CircuitState::HalfOpen => {
                circuit.set_state(CircuitState::Open);
                warn!("Circuit {}: half_open -> open (trial call failed)", key);
            }
            CircuitState::Closed if circuit.failures >= self.settings.failure_threshold => {
                circuit.set_state(CircuitState::Open);
                warn!(
                    "Circuit {}: closed -> open ({} consecutive failures)",
                    key, circuit.failures
                );
            }
            _ => {}
        }
    }

    /// Current state of `key`'s circuit; unknown keys are closed
    pub fn state(&self, key: &str) -> CircuitState {
        self.circuits
            .lock()
            .ok()
            .and_then(|circuits| circuits.get(key).map(|c| c.state))
            .unwrap_or(CircuitState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(reset_timeout: Duration) -> CircuitBreaker {
        CircuitBreaker::new(BreakerSettings {
            failure_threshold: 3,
            success_threshold: 2,
            reset_timeout,
        })
    }

    #[test]
    fn test_opens_after_threshold() {
        let cb = breaker(Duration::from_secs(60));
        for _ in 0..2 {
            cb.record_failure("m");
        }
        assert_eq!(cb.state("m"), CircuitState::Closed);
        cb.record_failure("m");
        assert_eq!(cb.state("m"), CircuitState::Open);

        let remaining = cb.try_acquire("m").unwrap_err();
        assert!(remaining <= Duration::from_secs(60));
    }

    #[test]
    fn test_success_resets_failure_count() {
        let cb = breaker(Duration::from_secs(60));
        cb.record_failure("m");
        cb.record_failure("m");
        cb.record_success("m");
        cb.record_failure("m");
        cb.record_failure("m");
        assert_eq!(cb.state("m"), CircuitState::Closed);
    }

    #[test]
    fn test_circuits_are_per_model() {
        let cb = breaker(Duration::from_secs(60));
        for _ in 0..3 {
            cb.record_failure("bad");
        }
        assert!(cb.try_acquire("bad").is_err());
        assert!(cb.try_acquire("good").is_ok());
    }

    #[test]
    fn test_half_open_recovers() {
        let cb = breaker(Duration::ZERO);
        for _ in 0..3 {
            cb.record_failure("m");
        }
        assert!(cb.try_acquire("m").is_ok());
        assert_eq!(cb.state("m"), CircuitState::HalfOpen);

        cb.record_success("m");
        assert_eq!(cb.state("m"), CircuitState::HalfOpen);
        cb.record_success("m");
        assert_eq!(cb.state("m"), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let cb = breaker(Duration::ZERO);
        for _ in 0..3 {
            cb.record_failure("m");
        }
        assert!(cb.try_acquire("m").is_ok());
        cb.record_failure("m");
        assert_eq!(cb.state("m"), CircuitState::Open);
    }
}
