// ABOUTME: One complete invocation: preflight gate, layer walk, health validation.
// ABOUTME: Leaves a finished journal in the context whatever happens.

use super::{Engine, ExecutionContext, WalkOptions, WalkOutcome};
use crate::journal::{OverallOutcome, RunMode};
use crate::layers::{Registry, WORKLOAD, gitops_scope};
use crate::preflight::Preflight;
use crate::validation::{HealthPoller, ValidationStatus};

/// Run preflight, then the walk for the context's mode, then validation.
///
/// Preflight failure rejects the run before any layer is touched; `force`
/// does not bypass it. The poller runs only after a bootstrap that
/// completed every selected layer and whose selection includes the
/// workload layer.
pub async fn execute(
    ctx: &mut ExecutionContext,
    registry: &Registry,
    preflight: &Preflight,
    poller: Option<&HealthPoller>,
    options: &WalkOptions,
) -> OverallOutcome {
    let checked = {
        let ctx: &ExecutionContext = ctx;
        preflight
            .check(ctx.profile(), ctx.tools().identity.as_ref(), &ctx.tool_env())
            .await
    };
    if let Err(e) = checked {
        let reason = format!("{}: {}", e.error_kind(), ctx.redactor().redact(&e.to_string()));
        tracing::error!(error = %reason, "preflight rejected the run");
        ctx.run_mut().abort(reason);
        ctx.run_mut().finish(OverallOutcome::Rejected);
        return OverallOutcome::Rejected;
    }

    let engine = Engine::new(registry);
    let mode = ctx.run().mode;
    let walked = match mode {
        RunMode::Bootstrap => engine.bootstrap(ctx, options).await,
        RunMode::Teardown => engine.teardown(ctx, options).await,
    };

    let mut outcome = walked.overall();
    if let (RunMode::Bootstrap, WalkOutcome::Completed, Some(poller)) = (mode, &walked, poller)
        && options.selector.includes(WORKLOAD)
    {
        let report = {
            let ctx: &ExecutionContext = ctx;
            let scope = gitops_scope(ctx.profile());
            poller
                .poll(
                    ctx.tools().reconciler.as_ref(),
                    &ctx.tool_env(),
                    &scope,
                    ctx.cancel(),
                )
                .await
        };
        outcome = match report.status {
            ValidationStatus::Converged => OverallOutcome::Succeeded,
            ValidationStatus::TimedOut => OverallOutcome::Unconverged,
            ValidationStatus::Cancelled => OverallOutcome::Cancelled,
        };
        ctx.run_mut().set_validation(report);
    }

    ctx.run_mut().finish(outcome);
    outcome
}
