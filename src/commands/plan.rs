// ABOUTME: Plan command: preflight and probes only, nothing is changed or journaled.

use super::Invocation;
use layerboot::engine::{CancelSignal, Engine};
use layerboot::error::Result;
use layerboot::journal::{OverallOutcome, RunMode};
use layerboot::output::Output;
use layerboot::preflight::Preflight;
use layerboot::secrets::Redactor;

pub async fn plan(
    invocation: &Invocation,
    output: &Output,
    redactor: Redactor,
) -> Result<OverallOutcome> {
    let ctx = invocation.context(redactor, RunMode::Bootstrap, CancelSignal::new());

    Preflight::new(&invocation.config.preflight)
        .check(ctx.profile(), ctx.tools().identity.as_ref(), &ctx.tool_env())
        .await?;

    output.progress(&format!("Plan for {}:", invocation.profile.name));
    let entries = Engine::new(&invocation.registry)
        .plan(&ctx, &invocation.options)
        .await;
    output.plan(&entries);

    Ok(OverallOutcome::Succeeded)
}
