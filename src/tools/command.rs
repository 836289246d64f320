// ABOUTME: Runs an external tool for one collaborator operation.
// ABOUTME: JSON request on stdin, JSON response on stdout, exit status maps to the error taxonomy.

use super::ToolEnv;
use crate::layers::LayerError;
use crate::profile::CustomerProfile;
use nonempty::NonEmpty;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Exit status a tool uses to report a temporary failure worth retrying
/// (sysexits `EX_TEMPFAIL`).
pub const EX_TEMPFAIL: i32 = 75;

/// An external command standing in for a collaborator.
///
/// Invoked as `<argv...> <operation>` in the config directory. The tool
/// receives the profile as `LAYERBOOT_*` variables, its configured secrets
/// as the variables named in config, and a JSON request on stdin.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    name: String,
    argv: NonEmpty<String>,
    working_dir: PathBuf,
    secrets: BTreeMap<String, String>,
}

impl ToolCommand {
    pub fn new(name: &str, argv: NonEmpty<String>, working_dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            argv,
            working_dir: working_dir.to_path_buf(),
            secrets: BTreeMap::new(),
        }
    }

    /// Environment variable name -> secret name, resolved per call.
    pub fn with_secrets(mut self, secrets: BTreeMap<String, String>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn profile_env(profile: &CustomerProfile) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("LAYERBOOT_CUSTOMER".to_string(), profile.name.to_string());
        env.insert(
            "LAYERBOOT_ENVIRONMENT".to_string(),
            profile.environment.to_string(),
        );
        env.insert("LAYERBOOT_REGION".to_string(), profile.region.to_string());
        env.insert(
            "LAYERBOOT_ACCOUNT".to_string(),
            profile.target_account_id.to_string(),
        );
        env.insert(
            "LAYERBOOT_SIZE_CLASS".to_string(),
            profile.size_class.to_string(),
        );
        env.insert("LAYERBOOT_SCOPE".to_string(), profile.scope());
        env
    }

    /// Run one operation and return its stdout.
    pub async fn call(
        &self,
        env: &ToolEnv<'_>,
        operation: &str,
        request: serde_json::Value,
    ) -> Result<String, LayerError> {
        let secrets = env.secrets.resolve_env(&self.secrets)?;
        let body = serde_json::to_vec(&request).map_err(|e| {
            LayerError::permanent(format!("{} {operation}: cannot encode request: {e}", self.name))
        })?;

        tracing::debug!(tool = %self.name, operation, "invoking tool");

        let mut command = Command::new(self.argv.first());
        command
            .args(self.argv.tail())
            .arg(operation)
            .current_dir(&self.working_dir)
            .envs(Self::profile_env(env.profile))
            .env("LAYERBOOT_OPERATION", operation)
            .envs(secrets.iter().map(|(var, secret)| (var, secret.expose())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group: a terminal Ctrl-C reaches layerboot only, and the
        // in-flight operation runs to completion.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| {
            LayerError::permanent(format!(
                "{} {operation}: failed to start {}: {e}",
                self.name,
                self.argv.first()
            ))
        })?;
        drop(command);
        drop(secrets);

        if let Some(mut stdin) = child.stdin.take() {
            // A tool may exit without reading its request; that is not an error.
            let _ = stdin.write_all(&body).await;
        }

        let output = child.wait_with_output().await.map_err(|e| {
            LayerError::permanent(format!("{} {operation}: failed to wait: {e}", self.name))
        })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let detail = last_line(&output.stderr);
        match output.status.code() {
            Some(EX_TEMPFAIL) => Err(LayerError::transient(format!(
                "{} {operation} temporarily failed: {detail}",
                self.name
            ))),
            Some(code) => Err(LayerError::permanent(format!(
                "{} {operation} exited with status {code}: {detail}",
                self.name
            ))),
            None => Err(LayerError::permanent(format!(
                "{} {operation} terminated by signal",
                self.name
            ))),
        }
    }

    /// Run one operation and decode its stdout as JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        env: &ToolEnv<'_>,
        operation: &str,
        request: serde_json::Value,
    ) -> Result<T, LayerError> {
        let stdout = self.call(env, operation, request).await?;
        serde_json::from_str(&stdout).map_err(|e| {
            LayerError::permanent(format!("{} {operation}: unreadable response: {e}", self.name))
        })
    }
}

/// Last non-empty line of a tool's stderr; tools print their reason last.
fn last_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| "no diagnostic output".to_string())
}
