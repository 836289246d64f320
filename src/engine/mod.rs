// ABOUTME: Execution engine: walks the layer registry for bootstrap, teardown and plan.
// ABOUTME: Sequential walk; probes gate apply, failures halt apply and are tolerated by teardown.

mod cancel;
mod context;
mod retry;
mod run;

pub use cancel::CancelSignal;
pub use context::ExecutionContext;
pub use retry::{Attempt, RetryPolicy};
pub use run::execute;

use crate::diagnostics::Warning;
use crate::journal::{LayerOutcome, LayerResult, OverallOutcome};
use crate::layers::{ErrorKind, Layer, ProbeOutcome, Registry};
use crate::types::LayerSelector;
use chrono::Utc;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Apply every selected layer regardless of what its probe says.
    pub force: bool,
    pub selector: LayerSelector,
}

/// How a walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Every selected layer was handled.
    Completed,
    /// An apply failed; later layers were not attempted.
    Halted { layer: String, kind: ErrorKind },
    /// Cancellation was observed before `next` started.
    Cancelled { next: String },
    /// Teardown reached the end but these layers failed to destroy.
    Incomplete { failed: Vec<String> },
}

impl WalkOutcome {
    pub fn overall(&self) -> OverallOutcome {
        match self {
            WalkOutcome::Completed => OverallOutcome::Succeeded,
            WalkOutcome::Halted { .. } | WalkOutcome::Incomplete { .. } => OverallOutcome::Failed,
            WalkOutcome::Cancelled { .. } => OverallOutcome::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedAction {
    Skip,
    Apply,
}

/// What a bootstrap would do with one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub layer: String,
    pub probe: ProbeOutcome,
    pub action: PlannedAction,
}

pub struct Engine<'r> {
    registry: &'r Registry,
}

impl<'r> Engine<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    fn selected<'a>(
        &'a self,
        selector: &'a LayerSelector,
    ) -> impl Iterator<Item = &'r dyn Layer> + 'a {
        self.registry
            .order()
            .filter(move |layer| selector.includes(layer.name()))
    }

    fn selected_reversed<'a>(
        &'a self,
        selector: &'a LayerSelector,
    ) -> impl Iterator<Item = &'r dyn Layer> + 'a {
        self.registry
            .reverse_order()
            .filter(move |layer| selector.includes(layer.name()))
    }

    async fn probe(layer: &dyn Layer, ctx: &ExecutionContext, timeout: Duration) -> ProbeOutcome {
        match tokio::time::timeout(timeout, layer.probe(ctx)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::debug!(layer = layer.name(), "probe timed out");
                ProbeOutcome::Unknown
            }
        }
    }

    /// Converge every selected layer in dependency order.
    ///
    /// Satisfied layers are skipped unless forced. The first failure is
    /// recorded and ends the walk.
    pub async fn bootstrap(&self, ctx: &mut ExecutionContext, options: &WalkOptions) -> WalkOutcome {
        for layer in self.selected(&options.selector) {
            let name = layer.name();
            if ctx.cancel().is_cancelled() {
                tracing::warn!(next = name, "cancelled; stopping before layer");
                return WalkOutcome::Cancelled {
                    next: name.to_string(),
                };
            }

            let settings = ctx.settings_for(layer);
            let started_at = Utc::now();

            if !options.force {
                match Self::probe(layer, ctx, settings.timeout).await {
                    ProbeOutcome::Satisfied => {
                        tracing::info!(layer = name, "already satisfied, skipping");
                        let result =
                            LayerResult::new(name, LayerOutcome::Skipped, started_at, Utc::now(), 0);
                        ctx.record(result);
                        continue;
                    }
                    ProbeOutcome::Unknown => ctx.warn(Warning::probe_unknown(name)),
                    ProbeOutcome::Unsatisfied => {}
                }
            }

            tracing::info!(layer = name, "applying layer");
            let attempt = {
                let ctx: &ExecutionContext = ctx;
                settings
                    .retry
                    .run(name, settings.timeout, || layer.apply(ctx))
                    .await
            };
            let ended_at = Utc::now();

            match attempt.result {
                Ok(()) => ctx.record(LayerResult::new(
                    name,
                    LayerOutcome::Succeeded,
                    started_at,
                    ended_at,
                    attempt.retries,
                )),
                Err(e) => {
                    let summary = e.summary(ctx.redactor());
                    tracing::error!(layer = name, error = %summary, "layer failed, halting");
                    ctx.record(
                        LayerResult::new(
                            name,
                            LayerOutcome::Failed,
                            started_at,
                            ended_at,
                            attempt.retries,
                        )
                        .with_error(summary),
                    );
                    return WalkOutcome::Halted {
                        layer: name.to_string(),
                        kind: e.kind(),
                    };
                }
            }
        }

        WalkOutcome::Completed
    }

    /// Destroy every selected layer in reverse dependency order.
    ///
    /// No probes; a failed destroy is recorded and the walk moves on.
    pub async fn teardown(&self, ctx: &mut ExecutionContext, options: &WalkOptions) -> WalkOutcome {
        let mut failed = Vec::new();

        for layer in self.selected_reversed(&options.selector) {
            let name = layer.name();
            if ctx.cancel().is_cancelled() {
                tracing::warn!(next = name, "cancelled; stopping before layer");
                return WalkOutcome::Cancelled {
                    next: name.to_string(),
                };
            }

            let settings = ctx.settings_for(layer);
            let started_at = Utc::now();

            tracing::info!(layer = name, "destroying layer");
            let attempt = {
                let ctx: &ExecutionContext = ctx;
                settings
                    .retry
                    .run(name, settings.timeout, || layer.destroy(ctx))
                    .await
            };
            let ended_at = Utc::now();

            match attempt.result {
                Ok(()) => ctx.record(LayerResult::new(
                    name,
                    LayerOutcome::Destroyed,
                    started_at,
                    ended_at,
                    attempt.retries,
                )),
                Err(e) => {
                    let summary = e.summary(ctx.redactor());
                    tracing::error!(layer = name, error = %summary, "destroy failed, continuing");
                    ctx.record(
                        LayerResult::new(
                            name,
                            LayerOutcome::Failed,
                            started_at,
                            ended_at,
                            attempt.retries,
                        )
                        .with_error(summary),
                    );
                    failed.push(name.to_string());
                }
            }
        }

        if failed.is_empty() {
            WalkOutcome::Completed
        } else {
            WalkOutcome::Incomplete { failed }
        }
    }

    /// Probe every selected layer without changing anything.
    pub async fn plan(&self, ctx: &ExecutionContext, options: &WalkOptions) -> Vec<PlanEntry> {
        let mut entries = Vec::new();
        for layer in self.selected(&options.selector) {
            let probe = Self::probe(layer, ctx, ctx.settings_for(layer).timeout).await;
            let action = if probe.is_satisfied() {
                PlannedAction::Skip
            } else {
                PlannedAction::Apply
            };
            entries.push(PlanEntry {
                layer: layer.name().to_string(),
                probe,
                action,
            });
        }
        entries
    }
}
