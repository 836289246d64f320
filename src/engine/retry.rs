// ABOUTME: Retry policy shared by every layer: bounded attempts with exponential backoff.
// ABOUTME: Each attempt is bounded by the layer timeout; timeouts count as transient.

use crate::layers::LayerError;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            backoff_max: Duration::from_secs(30),
        }
    }
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub struct Attempt {
    pub result: Result<(), LayerError>,
    /// Attempts made beyond the first.
    pub retries: u32,
}

impl RetryPolicy {
    /// Delay before retry `n` (1-based): `min(base * 2^(n-1), max)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(20);
        self.backoff_base
            .saturating_mul(1 << exponent)
            .min(self.backoff_max)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<F, Fut>(&self, layer: &str, timeout: Duration, mut op: F) -> Attempt
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), LayerError>>,
    {
        let mut retries = 0;
        loop {
            let result = match tokio::time::timeout(timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(LayerError::Timeout(timeout)),
            };

            match result {
                Ok(()) => {
                    return Attempt {
                        result: Ok(()),
                        retries,
                    };
                }
                Err(e) if e.is_transient() && retries + 1 < self.max_attempts => {
                    retries += 1;
                    let delay = self.delay_for(retries);
                    tracing::warn!(
                        layer,
                        retry = retries,
                        delay = ?delay,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Attempt {
                        result: Err(e),
                        retries,
                    };
                }
            }
        }
    }
}
