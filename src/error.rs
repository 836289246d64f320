// ABOUTME: Application-wide error types for layerboot.
// ABOUTME: Everything here rejects a run before any layer mutates anything.

use crate::layers::{ErrorKind, RegistryError};
use crate::lock::LockError;
use crate::preflight::PreflightError;
use crate::profile::ProfileError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("no profile for customer '{customer}' in {dir}")]
    ProfileNotFound { customer: String, dir: PathBuf },

    #[error("profile {path}: {source}")]
    Profile {
        path: PathBuf,
        #[source]
        source: ProfileError,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid layer registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("unknown layer '{name}' (expected one of: {expected})")]
    UnknownLayer { name: String, expected: String },

    #[error("preflight failed: {0}")]
    Preflight(#[from] PreflightError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("failed to write journal: {0}")]
    Journal(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Process exit status for this error.
    ///
    /// Rejections before any mutation exit 2. A journal that cannot be
    /// written after layers ran is a failed run, exit 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Journal(_) => 1,
            _ => 2,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Preflight(e) => e.error_kind(),
            _ => ErrorKind::Configuration,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
