// ABOUTME: Workload layer: GitOps convergence of the customer's workload units.
// ABOUTME: Satisfied only when every expected unit is listed and ready.

use super::{EDGE, Layer, LayerError, ProbeOutcome, WORKLOAD};
use crate::engine::ExecutionContext;
use crate::profile::CustomerProfile;
use crate::tools::UnitStatus;
use crate::types::naming::ResourceKind;
use async_trait::async_trait;

pub struct WorkloadLayer;

/// Reconciler scope holding the profile's workloads.
pub fn gitops_scope(profile: &CustomerProfile) -> String {
    profile.resource_name(ResourceKind::GitOpsScope)
}

/// Whether `units` shows every expected unit ready.
///
/// With no expected units configured, every listed unit must be ready. An
/// empty listing never counts as converged.
pub fn units_converged(expected: &[String], units: &[UnitStatus]) -> bool {
    if units.is_empty() {
        return false;
    }
    if expected.is_empty() {
        return units.iter().all(|u| u.ready);
    }
    expected
        .iter()
        .all(|name| units.iter().any(|u| &u.name == name && u.ready))
}

#[async_trait]
impl Layer for WorkloadLayer {
    fn name(&self) -> &str {
        WORKLOAD
    }

    fn ordinal(&self) -> u32 {
        5
    }

    fn predecessors(&self) -> Vec<&str> {
        vec![EDGE]
    }

    async fn probe(&self, ctx: &ExecutionContext) -> ProbeOutcome {
        let units = ctx
            .tools()
            .reconciler
            .list_units(&ctx.tool_env(), &gitops_scope(ctx.profile()))
            .await;
        ProbeOutcome::from_check(
            self.name(),
            units.map(|units| units_converged(ctx.expected_units(), &units)),
        )
    }

    async fn apply(&self, ctx: &ExecutionContext) -> Result<(), LayerError> {
        let scope = gitops_scope(ctx.profile());
        ctx.tools().reconciler.sync(&ctx.tool_env(), &scope).await?;
        tracing::info!(%scope, "workload sync requested");
        Ok(())
    }

    async fn destroy(&self, ctx: &ExecutionContext) -> Result<(), LayerError> {
        ctx.tools()
            .reconciler
            .prune(&ctx.tool_env(), &gitops_scope(ctx.profile()))
            .await
    }
}
