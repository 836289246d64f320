// ABOUTME: Preflight error types with SNAFU pattern.
// ABOUTME: Every variant rejects the run before any layer is touched.

use crate::layers::{ErrorKind, LayerError};
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PreflightError {
    #[snafu(display("{class} endpoint {address} is unreachable: {reason}"))]
    Unreachable {
        class: String,
        address: String,
        reason: String,
    },

    #[snafu(display(
        "active identity targets account '{active}' but the profile targets '{expected}'"
    ))]
    IdentityMismatch { active: String, expected: String },

    #[snafu(display("could not determine the active identity: {source}"))]
    IdentityUnavailable { source: LayerError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreflightErrorKind {
    Unreachable,
    IdentityMismatch,
    IdentityUnavailable,
}

impl PreflightError {
    pub fn kind(&self) -> PreflightErrorKind {
        match self {
            PreflightError::Unreachable { .. } => PreflightErrorKind::Unreachable,
            PreflightError::IdentityMismatch { .. } => PreflightErrorKind::IdentityMismatch,
            PreflightError::IdentityUnavailable { .. } => PreflightErrorKind::IdentityUnavailable,
        }
    }

    /// Where this rejection sits in the operator-facing taxonomy.
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            PreflightError::IdentityMismatch { .. } => ErrorKind::IdentityMismatch,
            PreflightError::Unreachable { .. } | PreflightError::IdentityUnavailable { .. } => {
                ErrorKind::Configuration
            }
        }
    }
}
