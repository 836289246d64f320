// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes; every line is redacted.

use crate::engine::{PlanEntry, PlannedAction};
use crate::journal::{BootstrapRun, LayerResult};
use crate::secrets::Redactor;
use serde::Serialize;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    redactor: Redactor,
}

impl Output {
    pub fn new(mode: OutputMode, redactor: Redactor) -> Self {
        Self { mode, redactor }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    fn emit(&self, event: &JsonEvent<'_>, to_stderr: bool) {
        let Ok(mut value) = serde_json::to_value(event) else {
            return;
        };
        self.redactor.redact_json(&mut value);
        if let Ok(json) = serde_json::to_string(&value) {
            if to_stderr {
                eprintln!("{json}");
            } else {
                println!("{json}");
            }
        }
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{}", self.redactor.redact(message));
        }
    }

    /// One summary line per layer result.
    pub fn layer(&self, result: &LayerResult) {
        match self.mode {
            OutputMode::Normal => {
                let mut line = format!(
                    "  {:<15} {:<10} {:>7.1}s  retries: {}",
                    result.name,
                    result.outcome.to_string(),
                    result.duration_seconds(),
                    result.retry_count
                );
                if let Some(summary) = &result.error_summary {
                    line.push_str(&format!("  {summary}"));
                }
                println!("{}", self.redactor.redact(&line));
            }
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit(
                &JsonEvent {
                    event: "layer",
                    message: &result.name,
                    layer: Some(result),
                    duration_secs: Some(result.duration_seconds()),
                },
                false,
            ),
        }
    }

    /// Print the per-layer summary and the overall result of a run.
    pub fn run_summary(&self, run: &BootstrapRun) {
        for result in &run.layers {
            self.layer(result);
        }
        let message = format!("{} {} for {}", run.mode, run.overall_outcome, run.customer);
        match self.mode {
            OutputMode::Normal => {
                println!("{message} ({:.1}s)", run.total_duration_seconds);
            }
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => self.emit(
                &JsonEvent {
                    event: "run",
                    message: &message,
                    layer: None,
                    duration_secs: Some(run.total_duration_seconds),
                },
                false,
            ),
        }
    }

    pub fn plan(&self, entries: &[PlanEntry]) {
        for entry in entries {
            let action = match entry.action {
                PlannedAction::Skip => "skip",
                PlannedAction::Apply => "apply",
            };
            match self.mode {
                OutputMode::Json => self.emit(
                    &JsonEvent {
                        event: "plan",
                        message: &format!("{} {} ({})", action, entry.layer, entry.probe),
                        layer: None,
                        duration_secs: None,
                    },
                    false,
                ),
                _ => println!("  {:<15} {:<6} ({})", entry.layer, action, entry.probe),
            }
        }
    }

    /// Print a non-fatal warning.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {}", self.redactor.redact(message)),
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit(
                &JsonEvent {
                    event: "warning",
                    message,
                    layer: None,
                    duration_secs: None,
                },
                true,
            ),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {}", self.redactor.redact(message));
            }
            OutputMode::Json => self.emit(
                &JsonEvent {
                    event: "error",
                    message,
                    layer: None,
                    duration_secs: None,
                },
                true,
            ),
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    layer: Option<&'a LayerResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
