// ABOUTME: Per-layer overrides for timeout and retry behaviour.
// ABOUTME: Unset values fall back to the layer's own defaults.

use crate::engine::RetryPolicy;
use crate::layers::LayerSettings;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerSettingsConfig {
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default)]
    pub max_attempts: Option<u32>,

    #[serde(default, with = "humantime_serde")]
    pub backoff_base: Option<Duration>,

    #[serde(default, with = "humantime_serde")]
    pub backoff_max: Option<Duration>,
}

impl LayerSettingsConfig {
    pub fn apply_to(&self, defaults: LayerSettings) -> LayerSettings {
        let retry = match &self.retry {
            Some(r) => RetryPolicy {
                max_attempts: r.max_attempts.unwrap_or(defaults.retry.max_attempts),
                backoff_base: r.backoff_base.unwrap_or(defaults.retry.backoff_base),
                backoff_max: r.backoff_max.unwrap_or(defaults.retry.backoff_max),
            },
            None => defaults.retry,
        };

        LayerSettings {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            retry,
        }
    }
}
