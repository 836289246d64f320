// ABOUTME: Bootstrap and teardown command implementation.
// ABOUTME: Takes the run lock, wires Ctrl-C to cancellation, runs, and persists the journal.

use super::Invocation;
use layerboot::diagnostics::Warning;
use layerboot::engine::{self, CancelSignal};
use layerboot::error::{Error, Result};
use layerboot::journal::{OverallOutcome, RunMode};
use layerboot::lock::RunLock;
use layerboot::output::Output;
use layerboot::preflight::Preflight;
use layerboot::secrets::Redactor;
use layerboot::validation::HealthPoller;

pub async fn execute(
    invocation: &Invocation,
    mode: RunMode,
    output: &Output,
    redactor: Redactor,
) -> Result<OverallOutcome> {
    let config = &invocation.config;
    let lock = RunLock::acquire(
        &config.journal_dir,
        &invocation.profile.name,
        invocation.break_lock,
    )?;

    let cancel = CancelSignal::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received; stopping after the current layer");
                cancel.cancel();
            }
        })
    };

    let mut ctx = invocation.context(redactor.clone(), mode, cancel);
    if let Some(previous) = lock.replaced() {
        ctx.warn(Warning::lock_broken(previous));
    }

    output.progress(&format!(
        "{} {} ({}, {})",
        match mode {
            RunMode::Bootstrap => "Bootstrapping",
            RunMode::Teardown => "Tearing down",
        },
        invocation.profile.name,
        invocation.profile.environment,
        invocation.profile.region
    ));

    let preflight = Preflight::new(&config.preflight);
    let poller = config
        .validation
        .enabled
        .then(|| HealthPoller::from_config(&config.validation));

    let outcome = engine::execute(
        &mut ctx,
        &invocation.registry,
        &preflight,
        poller.as_ref(),
        &invocation.options,
    )
    .await;
    interrupt.abort();

    if let Err(e) = lock.release() {
        ctx.warn(Warning::lock_release(e));
    }

    let (run, diagnostics) = ctx.into_parts();
    let persisted = run.persist(&config.journal_dir, &redactor);

    if let Some(reason) = &run.abort_reason {
        output.error(reason);
    }
    output.run_summary(&run);
    if let Some(report) = &run.validation {
        output.progress(&format!(
            "validation {} after {} poll(s): {} ready, {} pending",
            report.status,
            report.polls,
            report.ready.len(),
            report.pending.len()
        ));
    }
    for warning in diagnostics.warnings() {
        output.warning(&warning.to_string());
    }

    let path = persisted.map_err(Error::Journal)?;
    output.progress(&format!("journal: {}", path.display()));

    Ok(outcome)
}
