// ABOUTME: Secret broker: resolves secret references into in-memory values.
// ABOUTME: Every resolved value is registered with the redactor before it is handed out.

mod redact;

pub use redact::{REDACTED, RedactingMakeWriter, RedactingWriter, Redactor};

use crate::config::SecretSource;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret '{0}' is not defined")]
    Undefined(String),

    #[error("secret '{name}': environment variable {var} is not set")]
    MissingEnv { name: String, var: String },

    #[error("secret '{name}': cannot read {path}: {source}")]
    Unreadable {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("secret '{0}' resolved to an empty value")]
    Empty(String),
}

/// A resolved secret value.
///
/// Deliberately has no `Display` and a scrubbed `Debug`; the only way to
/// read the value is [`Secret::expose`].
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Resolves named secrets for the duration of a run.
///
/// The broker keeps only the secret *sources*; resolved values live in the
/// [`Secret`] handed to the caller and are dropped with it. The redactor
/// keeps the value so sinks can scrub it for the rest of the process.
#[derive(Debug)]
pub struct SecretBroker {
    sources: HashMap<String, SecretSource>,
    redactor: Redactor,
}

impl SecretBroker {
    pub fn new(sources: HashMap<String, SecretSource>, redactor: Redactor) -> Self {
        Self { sources, redactor }
    }

    /// Resolve a named secret and register its value for redaction.
    pub fn resolve(&self, name: &str) -> Result<Secret, SecretError> {
        let source = self
            .sources
            .get(name)
            .ok_or_else(|| SecretError::Undefined(name.to_string()))?;

        let value = match source {
            SecretSource::Env { env: var } => std::env::var(var).map_err(|_| SecretError::MissingEnv {
                name: name.to_string(),
                var: var.clone(),
            })?,
            SecretSource::File { file: path } => std::fs::read_to_string(path)
                .map(|s| s.trim_end_matches(['\r', '\n']).to_string())
                .map_err(|source| SecretError::Unreadable {
                    name: name.to_string(),
                    path: path.clone(),
                    source,
                })?,
        };

        if value.is_empty() {
            return Err(SecretError::Empty(name.to_string()));
        }

        let secret = Secret::new(value);
        self.register(&secret);
        tracing::debug!(secret = name, "resolved secret");
        Ok(secret)
    }

    /// Resolve a mapping of environment variable name to secret name.
    pub fn resolve_env(
        &self,
        mapping: &BTreeMap<String, String>,
    ) -> Result<Vec<(String, Secret)>, SecretError> {
        mapping
            .iter()
            .map(|(var, name)| self.resolve(name).map(|secret| (var.clone(), secret)))
            .collect()
    }

    /// Register a secret that did not come from a configured source, such
    /// as a credential returned by a collaborator.
    pub fn register(&self, secret: &Secret) {
        self.redactor.register(secret.expose());
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }
}
