// ABOUTME: Preflight prober: the gate every run passes before any layer is touched.
// ABOUTME: Checks endpoint reachability and that the active identity targets the profile's account.

mod error;

pub use error::{PreflightError, PreflightErrorKind};

use crate::config::{EndpointConfig, PreflightConfig};
use crate::profile::CustomerProfile;
use crate::tools::{IdentityService, ToolEnv};
use error::{IdentityMismatchSnafu, IdentityUnavailableSnafu, UnreachableSnafu};
use futures::future::join_all;
use snafu::{ResultExt, ensure};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;

/// What preflight confirmed.
#[derive(Debug, Clone)]
pub struct PreflightReport {
    pub endpoints_checked: usize,
    pub active_account: String,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct Preflight {
    timeout: Duration,
    endpoints: Vec<EndpointConfig>,
}

impl Preflight {
    pub fn new(config: &PreflightConfig) -> Self {
        Self {
            timeout: config.timeout,
            endpoints: config.endpoints.clone(),
        }
    }

    /// Run every check. No mutating call is made, and `--force` has no say.
    pub async fn check(
        &self,
        profile: &CustomerProfile,
        identity: &dyn IdentityService,
        env: &ToolEnv<'_>,
    ) -> Result<PreflightReport, PreflightError> {
        let started = Instant::now();

        let reachability = join_all(self.endpoints.iter().map(|e| self.reach(e))).await;
        for result in reachability {
            result?;
        }

        let active = identity
            .active_account(env)
            .await
            .context(IdentityUnavailableSnafu)?;
        ensure!(
            profile.target_account_id.matches(&active),
            IdentityMismatchSnafu {
                active,
                expected: profile.target_account_id.to_string(),
            }
        );

        tracing::debug!(
            endpoints = self.endpoints.len(),
            account = %active,
            "preflight passed"
        );
        Ok(PreflightReport {
            endpoints_checked: self.endpoints.len(),
            active_account: active,
            elapsed: started.elapsed(),
        })
    }

    async fn reach(&self, endpoint: &EndpointConfig) -> Result<(), PreflightError> {
        let connect = TcpStream::connect(endpoint.address.as_str());
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_stream)) => {
                tracing::debug!(
                    class = %endpoint.class,
                    address = %endpoint.address,
                    "endpoint reachable"
                );
                Ok(())
            }
            Ok(Err(e)) => UnreachableSnafu {
                class: &endpoint.class,
                address: &endpoint.address,
                reason: e.to_string(),
            }
            .fail(),
            Err(_) => UnreachableSnafu {
                class: &endpoint.class,
                address: &endpoint.address,
                reason: format!("no answer within {:?}", self.timeout),
            }
            .fail(),
        }
    }
}
