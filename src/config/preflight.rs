// ABOUTME: Preflight configuration: endpoints that must be reachable before mutation.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreflightConfig {
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            endpoints: Vec::new(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

/// One endpoint class a later layer depends on, e.g. the provisioner's API.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub class: String,
    /// `host:port`
    pub address: String,
}
