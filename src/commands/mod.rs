// ABOUTME: Command module aggregator for the layerboot CLI.
// ABOUTME: Holds the validated invocation shared by the execute and plan commands.

mod execute;
mod plan;

pub use execute::execute;
pub use plan::plan;

use layerboot::config::Config;
use layerboot::engine::{CancelSignal, ExecutionContext, WalkOptions};
use layerboot::journal::RunMode;
use layerboot::layers::Registry;
use layerboot::profile::CustomerProfile;
use layerboot::secrets::{Redactor, SecretBroker};
use layerboot::tools::Toolset;

/// Everything resolved and validated before a run may start.
pub struct Invocation {
    pub config: Config,
    pub registry: Registry,
    pub profile: CustomerProfile,
    pub options: WalkOptions,
    pub break_lock: bool,
}

impl Invocation {
    fn context(&self, redactor: Redactor, mode: RunMode, cancel: CancelSignal) -> ExecutionContext {
        let secrets = SecretBroker::new(self.config.secrets.clone(), redactor);
        let tools = Toolset::from_config(&self.config.tools, &self.config.base_dir);

        ExecutionContext::new(self.profile.clone(), secrets, tools, mode)
            .with_cancel(cancel)
            .with_expected_units(self.config.validation.expected_units.clone())
            .with_layer_overrides(self.config.layers.clone())
    }
}
