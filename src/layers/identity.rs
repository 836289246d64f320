// ABOUTME: Identity layer: the automation principal the later layers act through.
// ABOUTME: A rotated credential is registered for redaction and never persisted.

use super::{IDENTITY, INFRASTRUCTURE, Layer, LayerError, ProbeOutcome};
use crate::engine::ExecutionContext;
use crate::profile::CustomerProfile;
use crate::types::naming::ResourceKind;
use async_trait::async_trait;

pub struct IdentityLayer;

fn principal(profile: &CustomerProfile) -> String {
    profile.resource_name(ResourceKind::ServicePrincipal)
}

#[async_trait]
impl Layer for IdentityLayer {
    fn name(&self) -> &str {
        IDENTITY
    }

    fn ordinal(&self) -> u32 {
        2
    }

    fn predecessors(&self) -> Vec<&str> {
        vec![INFRASTRUCTURE]
    }

    async fn probe(&self, ctx: &ExecutionContext) -> ProbeOutcome {
        let found = ctx
            .tools()
            .identity
            .lookup(&ctx.tool_env(), &principal(ctx.profile()))
            .await;
        ProbeOutcome::from_check(self.name(), found)
    }

    async fn apply(&self, ctx: &ExecutionContext) -> Result<(), LayerError> {
        let principal = principal(ctx.profile());
        let credential = ctx
            .tools()
            .identity
            .create_or_rotate(&ctx.tool_env(), &principal)
            .await?;
        ctx.secrets().register(&credential);
        tracing::info!(%principal, "principal credential rotated");
        Ok(())
    }

    async fn destroy(&self, ctx: &ExecutionContext) -> Result<(), LayerError> {
        ctx.tools()
            .identity
            .remove(&ctx.tool_env(), &principal(ctx.profile()))
            .await
    }
}
