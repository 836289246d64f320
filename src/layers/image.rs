// ABOUTME: Image layer: the OS image edge nodes boot from.

use super::{IDENTITY, IMAGE, Layer, LayerError, ProbeOutcome};
use crate::engine::ExecutionContext;
use crate::profile::CustomerProfile;
use crate::tools::ImageSpec;
use crate::types::naming::ResourceKind;
use async_trait::async_trait;

pub struct ImageLayer;

/// Image the profile's edge nodes run.
pub fn image_spec(profile: &CustomerProfile) -> ImageSpec {
    ImageSpec {
        name: profile.resource_name(ResourceKind::Image),
        size_class: profile.size_class,
    }
}

#[async_trait]
impl Layer for ImageLayer {
    fn name(&self) -> &str {
        IMAGE
    }

    fn ordinal(&self) -> u32 {
        3
    }

    fn predecessors(&self) -> Vec<&str> {
        vec![IDENTITY]
    }

    async fn probe(&self, ctx: &ExecutionContext) -> ProbeOutcome {
        let found = ctx
            .tools()
            .images
            .lookup(&ctx.tool_env(), &image_spec(ctx.profile()))
            .await;
        ProbeOutcome::from_check(self.name(), found.map(|r| r.is_some()))
    }

    async fn apply(&self, ctx: &ExecutionContext) -> Result<(), LayerError> {
        let spec = image_spec(ctx.profile());
        let reference = ctx
            .tools()
            .images
            .build_or_fetch(&ctx.tool_env(), &spec)
            .await?;
        tracing::info!(image = %spec.name, %reference, "image available");
        Ok(())
    }

    async fn destroy(&self, ctx: &ExecutionContext) -> Result<(), LayerError> {
        ctx.tools()
            .images
            .delete(&ctx.tool_env(), &image_spec(ctx.profile()))
            .await
    }
}
