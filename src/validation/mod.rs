// ABOUTME: Health poller: waits for the deployed workload units to report ready.
// ABOUTME: Polls with a doubling interval until convergence, timeout or cancellation.

use crate::config::ValidationConfig;
use crate::engine::CancelSignal;
use crate::tools::{ToolEnv, WorkloadReconciler};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Lower bound on how long a single unit check may take.
const MIN_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationStatus {
    Converged,
    TimedOut,
    Cancelled,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStatus::Converged => f.write_str("converged"),
            ValidationStatus::TimedOut => f.write_str("timed out"),
            ValidationStatus::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Last observed state of the workload units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub status: ValidationStatus,
    pub polls: u32,
    pub ready: Vec<String>,
    pub pending: Vec<String>,
    pub elapsed_seconds: f64,
}

impl ValidationReport {
    fn new(
        status: ValidationStatus,
        polls: u32,
        ready: Vec<String>,
        pending: Vec<String>,
        started: Instant,
    ) -> Self {
        Self {
            status,
            polls,
            ready,
            pending,
            elapsed_seconds: started.elapsed().as_millis() as f64 / 1000.0,
        }
    }

    pub fn is_converged(&self) -> bool {
        self.status == ValidationStatus::Converged
    }
}

#[derive(Debug, Clone)]
pub struct HealthPoller {
    expected: Vec<String>,
    interval: Duration,
    max_interval: Duration,
    timeout: Duration,
}

impl HealthPoller {
    /// `expected` empty means "whatever the reconciler lists first".
    pub fn new(
        expected: Vec<String>,
        interval: Duration,
        max_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            expected,
            interval,
            max_interval: max_interval.max(interval),
            timeout,
        }
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(
            config.expected_units.clone(),
            config.interval,
            config.max_interval,
            config.timeout,
        )
    }

    /// Poll until every expected unit is ready or the timeout elapses.
    pub async fn poll(
        &self,
        reconciler: &dyn WorkloadReconciler,
        env: &ToolEnv<'_>,
        scope: &str,
        cancel: &CancelSignal,
    ) -> ValidationReport {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut expected = self.expected.clone();
        let mut interval = self.interval;
        let mut polls = 0;
        let mut ready = Vec::new();
        let mut pending = expected.clone();

        let status = loop {
            if cancel.is_cancelled() {
                break ValidationStatus::Cancelled;
            }

            if expected.is_empty() {
                match reconciler.list_units(env, scope).await {
                    Ok(units) if !units.is_empty() => {
                        expected = units.into_iter().map(|u| u.name).collect();
                        tracing::debug!(units = ?expected, "expected units taken from reconciler");
                    }
                    Ok(_) => tracing::debug!(%scope, "reconciler lists no units yet"),
                    Err(e) => tracing::debug!(%scope, error = %e, "listing units failed"),
                }
            }

            polls += 1;
            if !expected.is_empty() {
                (ready, pending) = self.tick(reconciler, env, scope, &expected).await;
                tracing::info!(
                    poll = polls,
                    ready = ready.len(),
                    pending = pending.len(),
                    "workload health"
                );
                if pending.is_empty() {
                    break ValidationStatus::Converged;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break ValidationStatus::TimedOut;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval.min(deadline - now)) => {}
                _ = cancel.cancelled() => break ValidationStatus::Cancelled,
            }
            interval = interval.saturating_mul(2).min(self.max_interval);
        };

        ValidationReport::new(status, polls, ready, pending, started)
    }

    /// Check every expected unit concurrently; errors count as not ready.
    async fn tick(
        &self,
        reconciler: &dyn WorkloadReconciler,
        env: &ToolEnv<'_>,
        scope: &str,
        expected: &[String],
    ) -> (Vec<String>, Vec<String>) {
        let per_check = self.interval.max(MIN_CHECK_TIMEOUT);
        let checks = expected.iter().map(|unit| async move {
            let ready =
                match tokio::time::timeout(per_check, reconciler.unit_status(env, scope, unit))
                    .await
                {
                    Ok(Ok(status)) => status.ready,
                    Ok(Err(e)) => {
                        tracing::debug!(%unit, error = %e, "unit check failed");
                        false
                    }
                    Err(_) => {
                        tracing::debug!(%unit, "unit check timed out");
                        false
                    }
                };
            (unit.clone(), ready)
        });

        let mut ready = Vec::new();
        let mut pending = Vec::new();
        for (unit, is_ready) in join_all(checks).await {
            if is_ready {
                ready.push(unit);
            } else {
                pending.push(unit);
            }
        }
        (ready, pending)
    }
}
