// ABOUTME: Per-run execution context handed to layers by reference.
// ABOUTME: Owns the profile, secret broker, collaborators, cancellation and the journal.

use super::CancelSignal;
use crate::config::LayerSettingsConfig;
use crate::diagnostics::{Diagnostics, Warning};
use crate::journal::{BootstrapRun, LayerResult, RunMode};
use crate::layers::{Layer, LayerSettings};
use crate::profile::CustomerProfile;
use crate::secrets::{Redactor, SecretBroker};
use crate::tools::{ToolEnv, Toolset};
use std::collections::BTreeMap;

/// Everything one invocation carries from layer to layer.
///
/// Layers only ever see `&ExecutionContext`; the engine alone records
/// results and warnings between layer calls.
pub struct ExecutionContext {
    profile: CustomerProfile,
    secrets: SecretBroker,
    tools: Toolset,
    cancel: CancelSignal,
    expected_units: Vec<String>,
    overrides: BTreeMap<String, LayerSettingsConfig>,
    run: BootstrapRun,
    diagnostics: Diagnostics,
}

impl ExecutionContext {
    pub fn new(
        profile: CustomerProfile,
        secrets: SecretBroker,
        tools: Toolset,
        mode: RunMode,
    ) -> Self {
        let run = BootstrapRun::start(&profile, mode);
        Self {
            profile,
            secrets,
            tools,
            cancel: CancelSignal::new(),
            expected_units: Vec::new(),
            overrides: BTreeMap::new(),
            run,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Workload units the workload probe requires to be ready.
    pub fn with_expected_units(mut self, units: Vec<String>) -> Self {
        self.expected_units = units;
        self
    }

    pub fn with_layer_overrides(mut self, overrides: BTreeMap<String, LayerSettingsConfig>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn profile(&self) -> &CustomerProfile {
        &self.profile
    }

    pub fn secrets(&self) -> &SecretBroker {
        &self.secrets
    }

    pub fn redactor(&self) -> &Redactor {
        self.secrets.redactor()
    }

    pub fn tools(&self) -> &Toolset {
        &self.tools
    }

    pub fn tool_env(&self) -> ToolEnv<'_> {
        ToolEnv {
            profile: &self.profile,
            secrets: &self.secrets,
        }
    }

    pub fn cancel(&self) -> &CancelSignal {
        &self.cancel
    }

    pub fn expected_units(&self) -> &[String] {
        &self.expected_units
    }

    /// The layer's own settings with any configured overrides applied.
    pub fn settings_for(&self, layer: &dyn Layer) -> LayerSettings {
        let defaults = layer.settings();
        match self.overrides.get(layer.name()) {
            Some(overrides) => overrides.apply_to(defaults),
            None => defaults,
        }
    }

    pub fn run(&self) -> &BootstrapRun {
        &self.run
    }

    pub fn run_mut(&mut self) -> &mut BootstrapRun {
        &mut self.run
    }

    pub fn record(&mut self, result: LayerResult) {
        tracing::info!(
            layer = %result.name,
            outcome = %result.outcome,
            retries = result.retry_count,
            "layer finished"
        );
        self.run.record(result);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn warn(&mut self, warning: Warning) {
        self.diagnostics.warn(warning);
    }

    /// Hand back the journal and the accumulated warnings.
    pub fn into_parts(self) -> (BootstrapRun, Diagnostics) {
        (self.run, self.diagnostics)
    }
}
