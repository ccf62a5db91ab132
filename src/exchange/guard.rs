// =============================================================================
// Gateway Guard — bounded concurrency, deadlines and retry for exchange calls
// =============================================================================
//
// Every call to the exchange goes through one shared guard:
//   - A semaphore caps the number of in-flight calls so concurrent requests
//     cannot burst past the exchange's public rate limit.
//   - Each attempt runs under a deadline; an expired deadline surfaces as
//     `GatewayError::Timeout` and is never retried.
//   - Transport failures are retried with exponential backoff, up to
//     `max_retries` extra attempts. Exchange rejections are returned as-is.
//
// Counters are plain atomics so the health endpoint can read them lock-free.
// =============================================================================

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::GatewayError;
use crate::config::GatewayConfig;

/// Shared guard wrapping all exchange calls.
pub struct GatewayGuard {
    permits: Semaphore,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
    calls: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
    retries: AtomicU64,
    in_flight: AtomicU32,
}

/// Serialisable view of the guard counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardSnapshot {
    pub calls: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub retries: u64,
    pub in_flight: u32,
}

/// Decrements the in-flight counter even if the caller's future is dropped.
struct InFlight<'a>(&'a AtomicU32);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl GatewayGuard {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            permits: Semaphore::new(config.max_inflight.max(1)),
            timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
            calls: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            in_flight: AtomicU32::new(0),
        }
    }

    /// Run `call` under the guard. `call` is invoked once per attempt.
    pub async fn run<T, F, Fut>(&self, op: &'static str, call: F) -> Result<T, GatewayError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| GatewayError::Network("gateway guard closed".into()))?;

        self.calls.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        let _in_flight = InFlight(&self.in_flight);

        let mut attempt: u32 = 0;
        loop {
            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => {
                    self.timeouts.fetch_add(1, Ordering::Relaxed);
                    Err(GatewayError::Timeout(self.timeout))
                }
            };

            match outcome {
                Ok(value) => {
                    debug!(op, attempt, "gateway call succeeded");
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff.saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        op,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient gateway failure — retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(op, attempt, error = %e, "gateway call failed");
                    return Err(e);
                }
            }
        }
    }

    pub fn snapshot(&self) -> GuardSnapshot {
        GuardSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for GatewayGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayGuard")
            .field("available_permits", &self.permits.available_permits())
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
