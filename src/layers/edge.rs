// ABOUTME: Edge layer: deploys the image to the customer's edge node and registers it.
// ABOUTME: Registration only counts once the management plane reports the node connected.

use super::{EDGE, IMAGE, Layer, LayerError, ProbeOutcome, image_spec};
use crate::engine::ExecutionContext;
use crate::profile::CustomerProfile;
use crate::tools::ConnectivityStatus;
use crate::types::naming::ResourceKind;
use async_trait::async_trait;

pub struct EdgeLayer;

fn node(profile: &CustomerProfile) -> String {
    profile.resource_name(ResourceKind::EdgeNode)
}

#[async_trait]
impl Layer for EdgeLayer {
    fn name(&self) -> &str {
        EDGE
    }

    fn ordinal(&self) -> u32 {
        4
    }

    fn predecessors(&self) -> Vec<&str> {
        vec![IMAGE]
    }

    async fn probe(&self, ctx: &ExecutionContext) -> ProbeOutcome {
        let status = ctx
            .tools()
            .edge
            .status(&ctx.tool_env(), &node(ctx.profile()))
            .await;
        ProbeOutcome::from_check(
            self.name(),
            status.map(|s| s == ConnectivityStatus::Connected),
        )
    }

    async fn apply(&self, ctx: &ExecutionContext) -> Result<(), LayerError> {
        let env = ctx.tool_env();
        let spec = image_spec(ctx.profile());
        let node = node(ctx.profile());

        let Some(image) = ctx.tools().images.lookup(&env, &spec).await? else {
            return Err(LayerError::permanent(format!(
                "image {} does not exist; the image layer must complete first",
                spec.name
            )));
        };

        match ctx.tools().edge.register(&env, &node, &image).await? {
            ConnectivityStatus::Connected => {
                tracing::info!(%node, %image, "edge node registered");
                Ok(())
            }
            status => Err(LayerError::transient(format!(
                "edge node {node} reported {status} after registration"
            ))),
        }
    }

    async fn destroy(&self, ctx: &ExecutionContext) -> Result<(), LayerError> {
        ctx.tools()
            .edge
            .deregister(&ctx.tool_env(), &node(ctx.profile()))
            .await
    }
}
