// ABOUTME: Error types raised by layer operations and their classification.
// ABOUTME: Classification decides retry versus halt; summaries are safe to persist.

use crate::secrets::{Redactor, SecretError};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Longest error summary kept in the journal and on the console.
pub const MAX_SUMMARY_LEN: usize = 240;

/// Errors that can occur while probing, applying or destroying a layer.
#[derive(Debug, Error)]
pub enum LayerError {
    /// The collaborator may succeed if asked again.
    #[error("{0}")]
    Transient(String),

    /// Retrying will not help.
    #[error("{0}")]
    Permanent(String),

    /// A single attempt ran past the layer's timeout.
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    /// A secret the layer needs could not be resolved.
    #[error(transparent)]
    Secret(#[from] SecretError),
}

/// Error taxonomy as surfaced to the operator and the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    IdentityMismatch,
    TransientExternal,
    PermanentExternal,
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::IdentityMismatch => "IdentityMismatchError",
            ErrorKind::TransientExternal => "TransientExternalError",
            ErrorKind::PermanentExternal => "PermanentExternalError",
            ErrorKind::Timeout => "TimeoutError",
        };
        f.write_str(name)
    }
}

impl LayerError {
    pub fn transient(message: impl Into<String>) -> Self {
        LayerError::Transient(message.into())
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        LayerError::Permanent(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LayerError::Transient(_) => ErrorKind::TransientExternal,
            LayerError::Permanent(_) => ErrorKind::PermanentExternal,
            LayerError::Timeout(_) => ErrorKind::Timeout,
            LayerError::Secret(_) => ErrorKind::Configuration,
        }
    }

    /// Whether another attempt is worthwhile. Timeouts are.
    pub fn is_transient(&self) -> bool {
        matches!(self, LayerError::Transient(_) | LayerError::Timeout(_))
    }

    /// `"<ErrorKind>: <message>"` with known secrets scrubbed, bounded in length.
    pub fn summary(&self, redactor: &Redactor) -> String {
        let message = self.to_string();
        let text = format!("{}: {}", self.kind(), redactor.redact(&message));
        truncate(text, MAX_SUMMARY_LEN)
    }
}

fn truncate(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        return text;
    }
    let mut short: String = text.chars().take(max.saturating_sub(3)).collect();
    short.push_str("...");
    short
}
