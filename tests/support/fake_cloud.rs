// ABOUTME: In-memory stand-in for every collaborator.
// ABOUTME: Records calls and can be told to fail specific operations.

use async_trait::async_trait;
use layerboot::layers::LayerError;
use layerboot::secrets::Secret;
use layerboot::tools::{
    ActualState, ConnectivityStatus, DesiredState, EdgeRegistry, IdentityService, ImageBuilder,
    ImageReference, ImageSpec, Provisioner, ToolEnv, Toolset, UnitStatus, WorkloadReconciler,
};
use parking_lot::{Mutex, MutexGuard};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// How an operation should fail.
#[derive(Debug, Clone)]
pub enum Failure {
    Transient(String),
    Permanent(String),
}

#[derive(Default)]
pub struct CloudState {
    pub account: String,
    pub credential: String,
    pub scopes: BTreeSet<String>,
    pub principals: BTreeSet<String>,
    pub images: BTreeMap<String, String>,
    pub nodes: BTreeMap<String, ConnectivityStatus>,
    pub register_status: Option<ConnectivityStatus>,
    pub synced: BTreeSet<String>,
    pub units: Vec<UnitStatus>,
    /// Secret the provisioner resolves and logs on apply.
    pub leak_secret: Option<String>,
    pub calls: Vec<String>,
    failures: HashMap<String, (Failure, u32)>,
}

/// Shared handle to one fake environment; clones see the same state.
#[derive(Clone, Default)]
pub struct FakeCloud {
    state: Arc<Mutex<CloudState>>,
}

const MUTATING: &[&str] = &[
    "provisioner.apply",
    "provisioner.destroy",
    "identity.create_or_rotate",
    "identity.remove",
    "images.build_or_fetch",
    "images.delete",
    "edge.register",
    "edge.deregister",
    "reconciler.sync",
    "reconciler.prune",
];

impl FakeCloud {
    /// A fresh environment whose active identity targets `account`.
    pub fn new(account: &str) -> Self {
        let cloud = Self::default();
        {
            let mut state = cloud.state.lock();
            state.account = account.to_string();
            state.credential = "rotated-credential-7f3a".to_string();
        }
        cloud
    }

    /// Units the reconciler reports once the scope has been synced.
    pub fn with_units(self, units: &[(&str, bool)]) -> Self {
        self.state.lock().units = units
            .iter()
            .map(|(name, ready)| UnitStatus {
                name: name.to_string(),
                ready: *ready,
            })
            .collect();
        self
    }

    /// Fail `op` the next `times` calls.
    pub fn fail(&self, op: &str, failure: Failure, times: u32) {
        self.state
            .lock()
            .failures
            .insert(op.to_string(), (failure, times));
    }

    pub fn state(&self) -> MutexGuard<'_, CloudState> {
        self.state.lock()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| MUTATING.contains(&c.as_str()))
            .collect()
    }

    pub fn toolset(&self) -> Toolset {
        Toolset {
            provisioner: Arc::new(self.clone()),
            identity: Arc::new(self.clone()),
            images: Arc::new(self.clone()),
            edge: Arc::new(self.clone()),
            reconciler: Arc::new(self.clone()),
        }
    }

    fn enter(&self, op: &str) -> Result<MutexGuard<'_, CloudState>, LayerError> {
        let mut state = self.state.lock();
        state.calls.push(op.to_string());

        let failure = match state.failures.get_mut(op) {
            Some((failure, remaining)) if *remaining > 0 => {
                *remaining -= 1;
                Some(failure.clone())
            }
            _ => None,
        };

        match failure {
            Some(Failure::Transient(message)) => Err(LayerError::Transient(message)),
            Some(Failure::Permanent(message)) => Err(LayerError::Permanent(message)),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl Provisioner for FakeCloud {
    async fn describe(
        &self,
        _env: &ToolEnv<'_>,
        scope: &str,
    ) -> Result<Option<ActualState>, LayerError> {
        let state = self.enter("provisioner.describe")?;
        Ok(state.scopes.contains(scope).then(|| ActualState {
            outputs: BTreeMap::from([("scope".to_string(), scope.to_string())]),
        }))
    }

    async fn apply(
        &self,
        env: &ToolEnv<'_>,
        desired: &DesiredState,
    ) -> Result<ActualState, LayerError> {
        let leak = self.state.lock().leak_secret.clone();
        if let Some(name) = leak {
            let secret = env.secrets.resolve(&name)?;
            tracing::info!("provisioner authenticating with {}", secret.expose());
        }

        let mut state = self.enter("provisioner.apply")?;
        state.scopes.insert(desired.scope.clone());
        Ok(ActualState::default())
    }

    async fn destroy(&self, _env: &ToolEnv<'_>, scope: &str) -> Result<(), LayerError> {
        let mut state = self.enter("provisioner.destroy")?;
        state.scopes.remove(scope);
        Ok(())
    }
}

#[async_trait]
impl IdentityService for FakeCloud {
    async fn active_account(&self, _env: &ToolEnv<'_>) -> Result<String, LayerError> {
        let state = self.enter("identity.active_account")?;
        Ok(state.account.clone())
    }

    async fn lookup(&self, _env: &ToolEnv<'_>, principal: &str) -> Result<bool, LayerError> {
        let state = self.enter("identity.lookup")?;
        Ok(state.principals.contains(principal))
    }

    async fn create_or_rotate(
        &self,
        _env: &ToolEnv<'_>,
        principal: &str,
    ) -> Result<Secret, LayerError> {
        let mut state = self.enter("identity.create_or_rotate")?;
        state.principals.insert(principal.to_string());
        Ok(Secret::new(state.credential.clone()))
    }

    async fn remove(&self, _env: &ToolEnv<'_>, principal: &str) -> Result<(), LayerError> {
        let mut state = self.enter("identity.remove")?;
        state.principals.remove(principal);
        Ok(())
    }
}

#[async_trait]
impl ImageBuilder for FakeCloud {
    async fn lookup(
        &self,
        _env: &ToolEnv<'_>,
        spec: &ImageSpec,
    ) -> Result<Option<ImageReference>, LayerError> {
        let state = self.enter("images.lookup")?;
        Ok(state.images.get(&spec.name).map(ImageReference::new))
    }

    async fn build_or_fetch(
        &self,
        _env: &ToolEnv<'_>,
        spec: &ImageSpec,
    ) -> Result<ImageReference, LayerError> {
        let mut state = self.enter("images.build_or_fetch")?;
        let reference = format!("registry.example/{}:1", spec.name);
        state.images.insert(spec.name.clone(), reference.clone());
        Ok(ImageReference::new(reference))
    }

    async fn delete(&self, _env: &ToolEnv<'_>, spec: &ImageSpec) -> Result<(), LayerError> {
        let mut state = self.enter("images.delete")?;
        state.images.remove(&spec.name);
        Ok(())
    }
}

#[async_trait]
impl EdgeRegistry for FakeCloud {
    async fn status(
        &self,
        _env: &ToolEnv<'_>,
        node: &str,
    ) -> Result<ConnectivityStatus, LayerError> {
        let state = self.enter("edge.status")?;
        Ok(state
            .nodes
            .get(node)
            .copied()
            .unwrap_or(ConnectivityStatus::Disconnected))
    }

    async fn register(
        &self,
        _env: &ToolEnv<'_>,
        node: &str,
        _image: &ImageReference,
    ) -> Result<ConnectivityStatus, LayerError> {
        let mut state = self.enter("edge.register")?;
        let status = state
            .register_status
            .unwrap_or(ConnectivityStatus::Connected);
        state.nodes.insert(node.to_string(), status);
        Ok(status)
    }

    async fn deregister(&self, _env: &ToolEnv<'_>, node: &str) -> Result<(), LayerError> {
        let mut state = self.enter("edge.deregister")?;
        state.nodes.remove(node);
        Ok(())
    }
}

#[async_trait]
impl WorkloadReconciler for FakeCloud {
    async fn list_units(
        &self,
        _env: &ToolEnv<'_>,
        scope: &str,
    ) -> Result<Vec<UnitStatus>, LayerError> {
        let state = self.enter("reconciler.list_units")?;
        if state.synced.contains(scope) {
            Ok(state.units.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn unit_status(
        &self,
        _env: &ToolEnv<'_>,
        scope: &str,
        unit: &str,
    ) -> Result<UnitStatus, LayerError> {
        let state = self.enter("reconciler.unit_status")?;
        state
            .units
            .iter()
            .find(|u| u.name == unit && state.synced.contains(scope))
            .cloned()
            .ok_or_else(|| LayerError::transient(format!("unit {unit} not found")))
    }

    async fn sync(&self, _env: &ToolEnv<'_>, scope: &str) -> Result<(), LayerError> {
        let mut state = self.enter("reconciler.sync")?;
        state.synced.insert(scope.to_string());
        Ok(())
    }

    async fn prune(&self, _env: &ToolEnv<'_>, scope: &str) -> Result<(), LayerError> {
        let mut state = self.enter("reconciler.prune")?;
        state.synced.remove(scope);
        Ok(())
    }
}
