//! Outbound resilience for the VIES endpoint: bounded retry with
//! exponential backoff and a circuit breaker shared across calls.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::core::ViesError;

/// Retry schedule for `checkVat` calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Backoff base; retry `n` (1-based) sleeps `base * 2^n`.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Circuit breaker thresholds for the VIES endpoint.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before a half-open probe.
    pub open_duration: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
enum BreakerState {
    Closed { consecutive_failures: u32 },
    Open { until: Instant },
    HalfOpen,
}

/// Circuit breaker guarding the VIES endpoint.
///
/// Cheap to clone; clones share state, so all concurrent calls observe
/// one breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: Arc<Mutex<BreakerState>>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(BreakerState::Closed {
                consecutive_failures: 0,
            })),
        }
    }

    /// Admission check. Fails with `ServiceUnavailable` while the
    /// circuit is open; an elapsed open period transitions to half-open
    /// and admits a single probe call.
    pub fn check(&self) -> Result<(), ViesError> {
        let mut state = self.lock();
        if let BreakerState::Open { until } = *state {
            if Instant::now() < until {
                return Err(ViesError::ServiceUnavailable(
                    "circuit breaker is open; VIES calls are suspended".into(),
                ));
            }
            debug!("circuit breaker half-open, probing VIES");
            *state = BreakerState::HalfOpen;
        }
        Ok(())
    }

    pub fn record_success(&self) {
        let mut state = self.lock();
        if matches!(*state, BreakerState::HalfOpen) {
            debug!("circuit breaker closed, normal operation resumed");
        }
        *state = BreakerState::Closed {
            consecutive_failures: 0,
        };
    }

    pub fn record_failure(&self) {
        let mut state = self.lock();
        match *state {
            BreakerState::Closed {
                consecutive_failures,
            } => {
                let failures = consecutive_failures + 1;
                if failures >= self.config.failure_threshold {
                    warn!(
                        failures,
                        open_secs = self.config.open_duration.as_secs(),
                        "circuit breaker opened after consecutive VIES failures"
                    );
                    *state = BreakerState::Open {
                        until: Instant::now() + self.config.open_duration,
                    };
                } else {
                    *state = BreakerState::Closed {
                        consecutive_failures: failures,
                    };
                }
            }
            BreakerState::HalfOpen => {
                warn!("circuit breaker re-opened after failed half-open probe");
                *state = BreakerState::Open {
                    until: Instant::now() + self.config.open_duration,
                };
            }
            BreakerState::Open { .. } => {}
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        // A poisoned lock only means a panic elsewhere; the state itself
        // stays usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Sleep for the exponential backoff delay of 1-based retry `attempt`.
pub async fn backoff(config: &RetryConfig, attempt: u32) {
    let delay = config.base_delay * 2u32.saturating_pow(attempt);
    debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying VIES request");
    tokio::time::sleep(delay).await;
}
