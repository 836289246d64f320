// ABOUTME: Layer definitions: the unit of work the engine walks.
// ABOUTME: Each layer probes reality, converges it, or tears it down through collaborators.

mod edge;
mod error;
mod identity;
mod image;
mod infrastructure;
mod registry;
mod workload;

pub use edge::EdgeLayer;
pub use error::{ErrorKind, LayerError, MAX_SUMMARY_LEN};
pub use identity::IdentityLayer;
pub use image::{ImageLayer, image_spec};
pub use infrastructure::InfrastructureLayer;
pub use registry::{Registry, RegistryError};
pub use workload::{WorkloadLayer, gitops_scope, units_converged};

use crate::engine::{ExecutionContext, RetryPolicy};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

pub const INFRASTRUCTURE: &str = "infrastructure";
pub const IDENTITY: &str = "identity";
pub const IMAGE: &str = "image";
pub const EDGE: &str = "edge";
pub const WORKLOAD: &str = "workload";

/// What a state probe found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeOutcome {
    /// Desired state already holds.
    Satisfied,
    Unsatisfied,
    /// The probe could not tell; treated as unsatisfied.
    Unknown,
}

impl ProbeOutcome {
    /// Map a read-only check to an outcome. A failed check is `Unknown`.
    pub fn from_check(layer: &str, check: Result<bool, LayerError>) -> Self {
        match check {
            Ok(true) => ProbeOutcome::Satisfied,
            Ok(false) => ProbeOutcome::Unsatisfied,
            Err(e) => {
                tracing::debug!(layer, error = %e, "probe could not determine state");
                ProbeOutcome::Unknown
            }
        }
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self, ProbeOutcome::Satisfied)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Satisfied => f.write_str("satisfied"),
            ProbeOutcome::Unsatisfied => f.write_str("unsatisfied"),
            ProbeOutcome::Unknown => f.write_str("unknown"),
        }
    }
}

/// Execution bounds for one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSettings {
    /// Bound on a single apply or destroy attempt.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            retry: RetryPolicy::default(),
        }
    }
}

/// A named unit of work in the bootstrap graph.
///
/// Layers hold no run state; everything they need arrives through the
/// [`ExecutionContext`], and every run re-derives reality through
/// [`Layer::probe`].
#[async_trait]
pub trait Layer: Send + Sync {
    fn name(&self) -> &str;

    /// Position used to break ties between layers with no ordering constraint.
    fn ordinal(&self) -> u32;

    fn predecessors(&self) -> Vec<&str>;

    fn settings(&self) -> LayerSettings {
        LayerSettings::default()
    }

    /// Read-only check of whether the desired state already holds.
    async fn probe(&self, ctx: &ExecutionContext) -> ProbeOutcome;

    async fn apply(&self, ctx: &ExecutionContext) -> Result<(), LayerError>;

    async fn destroy(&self, ctx: &ExecutionContext) -> Result<(), LayerError>;
}
