// ABOUTME: Infrastructure layer: the customer's resource scope in the target account.
// ABOUTME: Backed by the declarative provisioner.

use super::{INFRASTRUCTURE, Layer, LayerError, LayerSettings, ProbeOutcome};
use crate::engine::{ExecutionContext, RetryPolicy};
use crate::tools::DesiredState;
use async_trait::async_trait;
use std::time::Duration;

pub struct InfrastructureLayer;

#[async_trait]
impl Layer for InfrastructureLayer {
    fn name(&self) -> &str {
        INFRASTRUCTURE
    }

    fn ordinal(&self) -> u32 {
        1
    }

    fn predecessors(&self) -> Vec<&str> {
        Vec::new()
    }

    // Provisioning a scope is slow and the provisioner API throttles.
    fn settings(&self) -> LayerSettings {
        LayerSettings {
            timeout: Duration::from_secs(30 * 60),
            retry: RetryPolicy {
                max_attempts: 4,
                backoff_base: Duration::from_secs(5),
                backoff_max: Duration::from_secs(120),
            },
        }
    }

    async fn probe(&self, ctx: &ExecutionContext) -> ProbeOutcome {
        let scope = ctx.profile().scope();
        let described = ctx
            .tools()
            .provisioner
            .describe(&ctx.tool_env(), &scope)
            .await;
        ProbeOutcome::from_check(self.name(), described.map(|state| state.is_some()))
    }

    async fn apply(&self, ctx: &ExecutionContext) -> Result<(), LayerError> {
        let desired = DesiredState::for_profile(ctx.profile());
        let actual = ctx
            .tools()
            .provisioner
            .apply(&ctx.tool_env(), &desired)
            .await?;
        tracing::info!(
            scope = %desired.scope,
            outputs = actual.outputs.len(),
            "scope provisioned"
        );
        Ok(())
    }

    async fn destroy(&self, ctx: &ExecutionContext) -> Result<(), LayerError> {
        let scope = ctx.profile().scope();
        ctx.tools()
            .provisioner
            .destroy(&ctx.tool_env(), &scope)
            .await
    }
}
