// ABOUTME: Run journal: the durable record of one bootstrap or teardown invocation.
// ABOUTME: The only artifact other tooling should consume; written once, atomically, redacted.

use crate::profile::CustomerProfile;
use crate::secrets::Redactor;
use crate::types::Environment;
use crate::validation::ValidationReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerOutcome {
    Skipped,
    Succeeded,
    Failed,
    Destroyed,
}

impl fmt::Display for LayerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerOutcome::Skipped => f.write_str("skipped"),
            LayerOutcome::Succeeded => f.write_str("succeeded"),
            LayerOutcome::Failed => f.write_str("failed"),
            LayerOutcome::Destroyed => f.write_str("destroyed"),
        }
    }
}

/// Outcome of one layer in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerResult {
    pub name: String,
    pub outcome: LayerOutcome,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub retry_count: u32,
    /// Already redacted and bounded; never a raw collaborator payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,
}

impl LayerResult {
    pub fn new(
        name: &str,
        outcome: LayerOutcome,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        retry_count: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            outcome,
            started_at,
            ended_at,
            retry_count,
            error_summary: None,
        }
    }

    pub fn with_error(mut self, summary: String) -> Self {
        self.error_summary = Some(summary);
        self
    }

    pub fn duration_seconds(&self) -> f64 {
        seconds_between(self.started_at, self.ended_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Bootstrap,
    Teardown,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Bootstrap => f.write_str("bootstrap"),
            RunMode::Teardown => f.write_str("teardown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverallOutcome {
    InProgress,
    Succeeded,
    /// One or more layers failed.
    Failed,
    /// Interrupted by the operator at a layer boundary.
    Cancelled,
    /// Rejected before any mutating action.
    Rejected,
    /// Every layer succeeded but validation did not converge in time.
    Unconverged,
}

impl OverallOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            OverallOutcome::Succeeded => 0,
            OverallOutcome::Rejected => 2,
            OverallOutcome::InProgress
            | OverallOutcome::Failed
            | OverallOutcome::Cancelled
            | OverallOutcome::Unconverged => 1,
        }
    }
}

impl fmt::Display for OverallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverallOutcome::InProgress => "in progress",
            OverallOutcome::Succeeded => "succeeded",
            OverallOutcome::Failed => "failed",
            OverallOutcome::Cancelled => "cancelled",
            OverallOutcome::Rejected => "rejected",
            OverallOutcome::Unconverged => "unconverged",
        };
        f.write_str(s)
    }
}

/// Journal of one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapRun {
    pub run_id: String,
    pub customer: String,
    pub environment: Environment,
    pub mode: RunMode,
    /// Machine the run executed on.
    pub host: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    pub overall_outcome: OverallOutcome,
    pub total_duration_seconds: f64,
    pub layers: Vec<LayerResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
}

impl BootstrapRun {
    pub fn start(profile: &CustomerProfile, mode: RunMode) -> Self {
        let started_at = Utc::now();
        Self {
            run_id: format!(
                "{}-{}-{}",
                profile.name,
                mode,
                started_at.format("%Y%m%dT%H%M%S%.3fZ")
            ),
            customer: profile.name.to_string(),
            environment: profile.environment,
            mode,
            host: gethostname::gethostname().to_string_lossy().into_owned(),
            started_at,
            ended_at: None,
            overall_outcome: OverallOutcome::InProgress,
            total_duration_seconds: 0.0,
            layers: Vec::new(),
            validation: None,
            abort_reason: None,
        }
    }

    pub fn record(&mut self, result: LayerResult) {
        self.layers.push(result);
    }

    pub fn set_validation(&mut self, report: ValidationReport) {
        self.validation = Some(report);
    }

    /// Reason the run stopped before touching any layer.
    pub fn abort(&mut self, reason: String) {
        self.abort_reason = Some(reason);
    }

    pub fn finish(&mut self, outcome: OverallOutcome) {
        let ended_at = Utc::now();
        self.ended_at = Some(ended_at);
        self.overall_outcome = outcome;
        self.total_duration_seconds = seconds_between(self.started_at, ended_at);
    }

    pub fn outcome_of(&self, layer: &str) -> Option<LayerOutcome> {
        self.layers
            .iter()
            .find(|r| r.name == layer)
            .map(|r| r.outcome)
    }

    /// Write the journal to `<dir>/<run_id>.json`.
    ///
    /// Every string value is redacted before encoding. The file lands via a
    /// temporary file plus rename, so readers never see a partial journal.
    pub fn persist(&self, dir: &Path, redactor: &Redactor) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let mut value = serde_json::to_value(self).map_err(std::io::Error::other)?;
        redactor.redact_json(&mut value);
        let text = serde_json::to_string_pretty(&value).map_err(std::io::Error::other)?;

        let path = dir.join(format!("{}.json", self.run_id));
        let tmp = dir.join(format!(".{}.json.tmp", self.run_id));
        std::fs::write(&tmp, text.as_bytes())?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!(path = %path.display(), "journal written");
        Ok(path)
    }
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds().max(0) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn profile() -> CustomerProfile {
        CustomerProfile::from_yaml(
            "name: acme\nenvironment: trial\nregion: westeurope\ntargetAccountId: sub-123\nsizeClass: small\n",
        )
        .unwrap()
    }

    #[test]
    fn run_id_names_customer_and_mode() {
        let run = BootstrapRun::start(&profile(), RunMode::Teardown);
        assert!(run.run_id.starts_with("acme-teardown-"));
        assert!(run.run_id.ends_with('Z'));
        assert_eq!(run.overall_outcome, OverallOutcome::InProgress);
    }

    #[test]
    fn finish_sets_duration_and_outcome() {
        let mut run = BootstrapRun::start(&profile(), RunMode::Bootstrap);
        run.started_at -= Duration::milliseconds(1500);
        run.finish(OverallOutcome::Succeeded);

        assert!(run.ended_at.is_some());
        assert!(run.total_duration_seconds >= 1.5);
        assert_eq!(run.overall_outcome.exit_code(), 0);
    }

    #[test]
    fn exit_codes() {
        assert_eq!(OverallOutcome::Succeeded.exit_code(), 0);
        assert_eq!(OverallOutcome::Failed.exit_code(), 1);
        assert_eq!(OverallOutcome::Cancelled.exit_code(), 1);
        assert_eq!(OverallOutcome::Unconverged.exit_code(), 1);
        assert_eq!(OverallOutcome::Rejected.exit_code(), 2);
    }

    #[test]
    fn journal_uses_camel_case_keys() {
        let mut run = BootstrapRun::start(&profile(), RunMode::Bootstrap);
        let now = Utc::now();
        run.record(
            LayerResult::new("image", LayerOutcome::Failed, now, now, 2)
                .with_error("PermanentExternalError: quota".to_string()),
        );
        run.finish(OverallOutcome::Failed);

        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["overallOutcome"], "failed");
        assert!(value["totalDurationSeconds"].is_number());
        let layer = &value["layers"][0];
        assert_eq!(layer["name"], "image");
        assert_eq!(layer["outcome"], "failed");
        assert_eq!(layer["retryCount"], 2);
        assert_eq!(layer["errorSummary"], "PermanentExternalError: quota");
        assert!(layer["startedAt"].is_string());
    }

    #[test]
    fn persist_writes_redacted_json() {
        let dir = tempfile::tempdir().unwrap();
        let redactor = Redactor::new();
        redactor.register("tok-abc123");

        let mut run = BootstrapRun::start(&profile(), RunMode::Bootstrap);
        run.abort("identity tok-abc123 rejected".to_string());
        run.finish(OverallOutcome::Rejected);

        let path = run.persist(&dir.path().join("runs"), &redactor).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();

        assert!(!text.contains("tok-abc123"));
        assert!(text.contains("identity *** rejected"));
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            format!("{}.json", run.run_id)
        );

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("runs"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn persist_redacts_secrets_that_json_would_escape() {
        let dir = tempfile::tempdir().unwrap();
        let redactor = Redactor::new();
        let secret = r#"q"uo\te"#;
        redactor.register(secret);

        let mut run = BootstrapRun::start(&profile(), RunMode::Bootstrap);
        let now = Utc::now();
        run.record(
            LayerResult::new("identity", LayerOutcome::Failed, now, now, 0)
                .with_error(format!("PermanentExternalError: login {secret} refused")),
        );
        run.finish(OverallOutcome::Failed);

        let path = run.persist(dir.path(), &redactor).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(
            value["layers"][0]["errorSummary"],
            "PermanentExternalError: login *** refused"
        );
    }
}
