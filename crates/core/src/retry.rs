use std::thread;
use std::time::Duration;

use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DedupError, Result};

/// Bounded exponential backoff with random jitter.
///
/// The wait before retry `n` is drawn uniformly from
/// `[min_wait, ceiling(n)]` where `ceiling(n) = base * 2^(n-1)` clamped to
/// `[min_wait, max_wait]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    #[serde(default = "default_base_ms")]
    pub base_ms: u64,
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
}

fn default_base_ms() -> u64 {
    1_000
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, min_wait: Duration, max_wait: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_ms: default_base_ms(),
            min_wait_ms: min_wait.as_millis() as u64,
            max_wait_ms: max_wait.as_millis() as u64,
        }
    }

    /// Slow recognition service: few attempts, long waits.
    pub fn ocr_default() -> Self {
        Self::new(3, Duration::from_secs(10), Duration::from_secs(60))
    }

    /// Fast embedding service: more attempts, shorter floor.
    pub fn embedding_default() -> Self {
        Self::new(10, Duration::from_secs(3), Duration::from_secs(100))
    }

    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_ms: 0,
            min_wait_ms: 0,
            max_wait_ms: 0,
        }
    }

    pub fn backoff_ceiling(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as u32;
        let exp = self.base_ms.saturating_mul(1u64 << exponent);
        let ceiling = exp.clamp(self.min_wait_ms, self.max_wait_ms.max(self.min_wait_ms));
        Duration::from_millis(ceiling)
    }

    pub fn delay_for_attempt<R: Rng + ?Sized>(&self, attempt: usize, rng: &mut R) -> Duration {
        let ceiling = self.backoff_ceiling(attempt).as_millis() as u64;
        if ceiling <= self.min_wait_ms {
            return Duration::from_millis(ceiling);
        }
        Duration::from_millis(rng.gen_range(self.min_wait_ms..=ceiling))
    }

    pub fn validate(&self, label: &str) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(DedupError::Config(format!(
                "{label}: max_attempts must be at least 1"
            )));
        }
        if self.min_wait_ms > self.max_wait_ms {
            return Err(DedupError::Config(format!(
                "{label}: min_wait_ms {} exceeds max_wait_ms {}",
                self.min_wait_ms, self.max_wait_ms
            )));
        }
        Ok(())
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// policy's attempts are used up.
pub fn call_with_retry<T, F>(policy: &RetryPolicy, operation: &str, op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    call_with_retry_using(policy, operation, op, thread::sleep)
}

pub fn call_with_retry_using<T, F, S>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
    mut sleep: S,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
    S: FnMut(Duration),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut rng = thread_rng();
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) => {
                if attempt >= max_attempts {
                    return Err(DedupError::RetriesExhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                let wait = policy.delay_for_attempt(attempt, &mut rng);
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    wait_ms = wait.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                sleep(wait);
            }
        }
    }
}
