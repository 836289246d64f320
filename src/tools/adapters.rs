// ABOUTME: Collaborator trait implementations backed by external tool commands.
// ABOUTME: Each operation maps to one tool invocation and one response shape.

use super::{
    ActualState, ConnectivityStatus, DesiredState, EdgeRegistry, IdentityService, ImageBuilder,
    ImageReference, ImageSpec, Provisioner, ToolCommand, ToolEnv, UnitStatus, WorkloadReconciler,
};
use crate::layers::LayerError;
use crate::secrets::Secret;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

#[derive(Deserialize)]
struct Presence {
    present: bool,
    #[serde(default)]
    outputs: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveAccount {
    account_id: String,
}

#[derive(Deserialize)]
struct Credential {
    credential: String,
}

#[derive(Deserialize)]
struct ImageLookup {
    present: bool,
    #[serde(default)]
    reference: Option<ImageReference>,
}

#[derive(Deserialize)]
struct ImageBuilt {
    reference: ImageReference,
}

#[derive(Deserialize)]
struct Connectivity {
    status: ConnectivityStatus,
}

#[derive(Deserialize)]
struct Units {
    units: Vec<UnitStatus>,
}

#[async_trait]
impl Provisioner for ToolCommand {
    async fn describe(
        &self,
        env: &ToolEnv<'_>,
        scope: &str,
    ) -> Result<Option<ActualState>, LayerError> {
        let response: Presence = self
            .call_json(env, "describe", json!({ "profile": env.profile, "scope": scope }))
            .await?;
        Ok(response.present.then_some(ActualState {
            outputs: response.outputs,
        }))
    }

    async fn apply(
        &self,
        env: &ToolEnv<'_>,
        desired: &DesiredState,
    ) -> Result<ActualState, LayerError> {
        self.call_json(env, "apply", json!({ "profile": env.profile, "desired": desired }))
            .await
    }

    async fn destroy(&self, env: &ToolEnv<'_>, scope: &str) -> Result<(), LayerError> {
        self.call(env, "destroy", json!({ "profile": env.profile, "scope": scope }))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl IdentityService for ToolCommand {
    async fn active_account(&self, env: &ToolEnv<'_>) -> Result<String, LayerError> {
        let response: ActiveAccount = self
            .call_json(env, "active-account", json!({ "profile": env.profile }))
            .await?;
        Ok(response.account_id)
    }

    async fn lookup(&self, env: &ToolEnv<'_>, principal: &str) -> Result<bool, LayerError> {
        let response: Presence = self
            .call_json(env, "lookup", json!({ "profile": env.profile, "principal": principal }))
            .await?;
        Ok(response.present)
    }

    async fn create_or_rotate(
        &self,
        env: &ToolEnv<'_>,
        principal: &str,
    ) -> Result<Secret, LayerError> {
        let response: Credential = self
            .call_json(
                env,
                "create-or-rotate",
                json!({ "profile": env.profile, "principal": principal }),
            )
            .await?;
        Ok(Secret::new(response.credential))
    }

    async fn remove(&self, env: &ToolEnv<'_>, principal: &str) -> Result<(), LayerError> {
        self.call(env, "remove", json!({ "profile": env.profile, "principal": principal }))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ImageBuilder for ToolCommand {
    async fn lookup(
        &self,
        env: &ToolEnv<'_>,
        spec: &ImageSpec,
    ) -> Result<Option<ImageReference>, LayerError> {
        let response: ImageLookup = self
            .call_json(env, "lookup", json!({ "profile": env.profile, "spec": spec }))
            .await?;
        match (response.present, response.reference) {
            (false, _) => Ok(None),
            (true, Some(reference)) => Ok(Some(reference)),
            (true, None) => Err(LayerError::permanent(format!(
                "{} lookup: image {} reported present without a reference",
                self.name(),
                spec.name
            ))),
        }
    }

    async fn build_or_fetch(
        &self,
        env: &ToolEnv<'_>,
        spec: &ImageSpec,
    ) -> Result<ImageReference, LayerError> {
        let response: ImageBuilt = self
            .call_json(
                env,
                "build-or-fetch",
                json!({ "profile": env.profile, "spec": spec }),
            )
            .await?;
        Ok(response.reference)
    }

    async fn delete(&self, env: &ToolEnv<'_>, spec: &ImageSpec) -> Result<(), LayerError> {
        self.call(env, "delete", json!({ "profile": env.profile, "spec": spec }))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl EdgeRegistry for ToolCommand {
    async fn status(
        &self,
        env: &ToolEnv<'_>,
        node: &str,
    ) -> Result<ConnectivityStatus, LayerError> {
        let response: Connectivity = self
            .call_json(env, "status", json!({ "profile": env.profile, "node": node }))
            .await?;
        Ok(response.status)
    }

    async fn register(
        &self,
        env: &ToolEnv<'_>,
        node: &str,
        image: &ImageReference,
    ) -> Result<ConnectivityStatus, LayerError> {
        let response: Connectivity = self
            .call_json(
                env,
                "register",
                json!({ "profile": env.profile, "node": node, "image": image }),
            )
            .await?;
        Ok(response.status)
    }

    async fn deregister(&self, env: &ToolEnv<'_>, node: &str) -> Result<(), LayerError> {
        self.call(env, "deregister", json!({ "profile": env.profile, "node": node }))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl WorkloadReconciler for ToolCommand {
    async fn list_units(
        &self,
        env: &ToolEnv<'_>,
        scope: &str,
    ) -> Result<Vec<UnitStatus>, LayerError> {
        let response: Units = self
            .call_json(env, "list-units", json!({ "profile": env.profile, "scope": scope }))
            .await?;
        Ok(response.units)
    }

    async fn unit_status(
        &self,
        env: &ToolEnv<'_>,
        scope: &str,
        unit: &str,
    ) -> Result<UnitStatus, LayerError> {
        self.call_json(
            env,
            "unit-status",
            json!({ "profile": env.profile, "scope": scope, "unit": unit }),
        )
        .await
    }

    async fn sync(&self, env: &ToolEnv<'_>, scope: &str) -> Result<(), LayerError> {
        self.call(env, "sync", json!({ "profile": env.profile, "scope": scope }))
            .await
            .map(|_| ())
    }

    async fn prune(&self, env: &ToolEnv<'_>, scope: &str) -> Result<(), LayerError> {
        self.call(env, "prune", json!({ "profile": env.profile, "scope": scope }))
            .await
            .map(|_| ())
    }
}
