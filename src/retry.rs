//! Bounded retry with backoff for LLM calls
//!
//! One policy is shared by every stage that talks to the model.

use crate::Result;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay to wait after a failed attempt (1-based)
pub trait Backoff: Send + Sync {
    fn delay(&self, attempt: u32) -> Duration;
}

/// Exponential backoff: base * 2^(attempt-1), capped at `max`, plus random jitter
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub max: Duration,
    /// Fraction of the delay added as random jitter (0.0 - 1.0)
    pub jitter: f64,
}

impl ExponentialBackoff {
    fn undithered(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let multiplier = 2u32.saturating_pow(exponent);
        self.base.saturating_mul(multiplier).min(self.max)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(200),
            max: Duration::from_secs(5),
            jitter: 0.25,
        }
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let delay = self.undithered(attempt);
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 || delay.is_zero() {
            return delay;
        }
        let factor = rand::thread_rng().gen_range(0.0..=jitter);
        delay + delay.mul_f64(factor)
    }
}

/// No wait between attempts
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl Backoff for NoBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// Retry configuration shared by all retried calls
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Arc<dyn Backoff>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Arc<dyn Backoff>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Policy that retries immediately
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Arc::new(NoBackoff))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op` until it succeeds or the attempt bound is reached.
    ///
    /// The last error is returned once attempts are exhausted.
    pub async fn call<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;

        loop {
            let delay = {
                let error = match op().await {
                    Ok(value) => {
                        if attempt > 1 {
                            debug!(call = label, attempt, "Call succeeded after retry");
                        }
                        return Ok(value);
                    }
                    Err(e) => e,
                };

                if attempt >= self.max_attempts {
                    warn!(
                        call = label,
                        attempts = attempt,
                        error = %error,
                        "Call failed, retries exhausted"
                    );
                    return Err(error);
                }

                let delay = self.backoff.delay(attempt);
                warn!(
                    call = label,
                    attempt,
                    max_attempts = self.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Call failed, retrying"
                );
                delay
            };

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, Arc::new(ExponentialBackoff::default()))
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VerifierError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_returns_first_success() {
        let policy = RetryPolicy::immediate(3);
        let calls = AtomicU32::new(0);

        let result = policy
            .call("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, VerifierError>(42)
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let policy = RetryPolicy::immediate(3);
        let calls = AtomicU32::new(0);

        let result = policy
            .call("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(VerifierError::Llm(format!("transient {}", n)))
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error_when_exhausted() {
        let policy = RetryPolicy::immediate(2);
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy
            .call("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(VerifierError::Llm(format!("failure {}", n)))
            })
            .await;

        match result {
            Err(VerifierError::Llm(msg)) => assert_eq!(msg, "failure 2"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::immediate(0).max_attempts(), 1);
    }

    #[test]
    fn test_exponential_backoff_grows_and_caps() {
        let backoff = ExponentialBackoff {
            base: Duration::from_millis(100),
            max: Duration::from_millis(1000),
            jitter: 0.0,
        };

        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(400));
        assert_eq!(backoff.delay(10), Duration::from_millis(1000));
        assert_eq!(backoff.delay(100), Duration::from_millis(1000));
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let backoff = ExponentialBackoff {
            base: Duration::from_millis(100),
            max: Duration::from_secs(10),
            jitter: 0.25,
        };

        for attempt in 1..5 {
            let base = backoff.undithered(attempt);
            let delay = backoff.delay(attempt);
            assert!(delay >= base);
            assert!(delay <= base + base.mul_f64(0.25));
        }
    }
}
