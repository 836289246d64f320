// ABOUTME: Collaborator interfaces consumed by the layers and the health poller.
// ABOUTME: The orchestrator supervises these; it never implements provisioning itself.

mod adapters;
mod command;

pub use command::{EX_TEMPFAIL, ToolCommand};

use crate::config::{ToolConfig, ToolsConfig};
use crate::layers::LayerError;
use crate::profile::CustomerProfile;
use crate::secrets::{Secret, SecretBroker};
use crate::types::SizeClass;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Handles a collaborator call needs: who it acts for and where secrets come from.
#[derive(Clone, Copy)]
pub struct ToolEnv<'a> {
    pub profile: &'a CustomerProfile,
    pub secrets: &'a SecretBroker,
}

/// Desired state handed to the resource provisioner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredState {
    pub scope: String,
    pub region: String,
    pub account_id: String,
    pub size_class: SizeClass,
}

impl DesiredState {
    pub fn for_profile(profile: &CustomerProfile) -> Self {
        Self {
            scope: profile.scope(),
            region: profile.region.to_string(),
            account_id: profile.target_account_id.to_string(),
            size_class: profile.size_class,
        }
    }
}

/// State reported back by the provisioner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualState {
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    pub name: String,
    pub size_class: SizeClass,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageReference(String);

impl ImageReference {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityStatus {
    Connected,
    Disconnected,
    Unknown,
}

impl fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityStatus::Connected => f.write_str("connected"),
            ConnectivityStatus::Disconnected => f.write_str("disconnected"),
            ConnectivityStatus::Unknown => f.write_str("unknown"),
        }
    }
}

/// Readiness of one workload unit as reported by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStatus {
    pub name: String,
    pub ready: bool,
}

/// Declarative resource provisioner.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Read-only: current state of the scope, `None` when nothing exists.
    async fn describe(
        &self,
        env: &ToolEnv<'_>,
        scope: &str,
    ) -> Result<Option<ActualState>, LayerError>;

    async fn apply(
        &self,
        env: &ToolEnv<'_>,
        desired: &DesiredState,
    ) -> Result<ActualState, LayerError>;

    async fn destroy(&self, env: &ToolEnv<'_>, scope: &str) -> Result<(), LayerError>;
}

/// Identity / automation-account service.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Account the active credential context targets.
    async fn active_account(&self, env: &ToolEnv<'_>) -> Result<String, LayerError>;

    /// Read-only: whether the principal exists.
    async fn lookup(&self, env: &ToolEnv<'_>, principal: &str) -> Result<bool, LayerError>;

    async fn create_or_rotate(
        &self,
        env: &ToolEnv<'_>,
        principal: &str,
    ) -> Result<Secret, LayerError>;

    async fn remove(&self, env: &ToolEnv<'_>, principal: &str) -> Result<(), LayerError>;
}

/// Image-build service.
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Read-only: reference of an already built image.
    async fn lookup(
        &self,
        env: &ToolEnv<'_>,
        spec: &ImageSpec,
    ) -> Result<Option<ImageReference>, LayerError>;

    async fn build_or_fetch(
        &self,
        env: &ToolEnv<'_>,
        spec: &ImageSpec,
    ) -> Result<ImageReference, LayerError>;

    async fn delete(&self, env: &ToolEnv<'_>, spec: &ImageSpec) -> Result<(), LayerError>;
}

/// Hybrid edge-management plane.
#[async_trait]
pub trait EdgeRegistry: Send + Sync {
    /// Read-only: connectivity of a node.
    async fn status(
        &self,
        env: &ToolEnv<'_>,
        node: &str,
    ) -> Result<ConnectivityStatus, LayerError>;

    async fn register(
        &self,
        env: &ToolEnv<'_>,
        node: &str,
        image: &ImageReference,
    ) -> Result<ConnectivityStatus, LayerError>;

    async fn deregister(&self, env: &ToolEnv<'_>, node: &str) -> Result<(), LayerError>;
}

/// GitOps workload reconciler.
#[async_trait]
pub trait WorkloadReconciler: Send + Sync {
    async fn list_units(
        &self,
        env: &ToolEnv<'_>,
        scope: &str,
    ) -> Result<Vec<UnitStatus>, LayerError>;

    async fn unit_status(
        &self,
        env: &ToolEnv<'_>,
        scope: &str,
        unit: &str,
    ) -> Result<UnitStatus, LayerError>;

    /// Ask the reconciler to converge the scope to its declared source.
    async fn sync(&self, env: &ToolEnv<'_>, scope: &str) -> Result<(), LayerError>;

    /// Remove every workload the scope declares.
    async fn prune(&self, env: &ToolEnv<'_>, scope: &str) -> Result<(), LayerError>;
}

/// The collaborators available to a run.
#[derive(Clone)]
pub struct Toolset {
    pub provisioner: Arc<dyn Provisioner>,
    pub identity: Arc<dyn IdentityService>,
    pub images: Arc<dyn ImageBuilder>,
    pub edge: Arc<dyn EdgeRegistry>,
    pub reconciler: Arc<dyn WorkloadReconciler>,
}

impl Toolset {
    /// Command-backed collaborators as configured in `tools:`.
    pub fn from_config(config: &ToolsConfig, base_dir: &Path) -> Self {
        let tool = |name: &str, c: &ToolConfig| {
            Arc::new(
                ToolCommand::new(name, c.command.clone(), base_dir).with_secrets(c.secrets.clone()),
            )
        };

        Self {
            provisioner: tool("provisioner", &config.provisioner),
            identity: tool("identity", &config.identity),
            images: tool("images", &config.images),
            edge: tool("edge", &config.edge),
            reconciler: tool("reconciler", &config.reconciler),
        }
    }
}
