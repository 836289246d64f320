// ABOUTME: Run lock to prevent concurrent runs against the same customer.
// ABOUTME: Uses atomic file creation with lock info stored next to the journals.

use crate::types::CustomerName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error(
        "a run for '{customer}' is already in progress on {holder} (pid {pid}) since {started_at}; \
         use --break-lock to override"
    )]
    Held {
        customer: String,
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
    },

    #[error("lock {0} was taken by another process while breaking it")]
    Contended(PathBuf),

    #[error("lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Information about who holds a run lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub customer: String,
}

impl LockInfo {
    pub fn new(customer: &CustomerName) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            customer: customer.to_string(),
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.started_at;
        age.num_hours() >= 1
    }

    pub fn lock_path(dir: &Path, customer: &CustomerName) -> PathBuf {
        dir.join(format!("{customer}.lock"))
    }
}

/// A held run lock. Released explicitly with [`RunLock::release`].
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    replaced: Option<LockInfo>,
}

impl RunLock {
    /// Acquire the run lock for a customer.
    ///
    /// Creation is atomic (`create_new`), so two runs cannot both succeed.
    /// Stale locks (>1 hour) and unreadable lock files are broken
    /// automatically; `break_lock` breaks any lock.
    pub fn acquire(dir: &Path, customer: &CustomerName, break_lock: bool) -> Result<Self, LockError> {
        std::fs::create_dir_all(dir).map_err(|source| LockError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = LockInfo::lock_path(dir, customer);
        let info = LockInfo::new(customer);

        if Self::try_create(&path, &info)? {
            return Ok(Self {
                path,
                replaced: None,
            });
        }

        let existing = Self::read(&path);
        match &existing {
            Some(held) if !break_lock && !held.is_stale() => {
                return Err(LockError::Held {
                    customer: held.customer.clone(),
                    holder: held.holder.clone(),
                    pid: held.pid,
                    started_at: held.started_at,
                });
            }
            Some(held) => tracing::warn!(
                "Breaking lock held by {} (pid {}) since {}",
                held.holder,
                held.pid,
                held.started_at
            ),
            None => tracing::warn!("Lock info unreadable, breaking lock"),
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(LockError::Io { path, source }),
        }

        if !Self::try_create(&path, &info)? {
            return Err(LockError::Contended(path));
        }

        Ok(Self {
            path,
            replaced: existing,
        })
    }

    fn try_create(path: &Path, info: &LockInfo) -> Result<bool, LockError> {
        let io_error = |source| LockError::Io {
            path: path.to_path_buf(),
            source,
        };

        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => {
                serde_json::to_writer(file, info)
                    .map_err(|e| io_error(std::io::Error::other(e)))?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(io_error(e)),
        }
    }

    fn read(path: &Path) -> Option<LockInfo> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// The lock this one replaced, if an existing lock was broken.
    pub fn replaced(&self) -> Option<&LockInfo> {
        self.replaced.as_ref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(self) -> Result<(), LockError> {
        std::fs::remove_file(&self.path).map_err(|source| LockError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
