// ABOUTME: Non-fatal findings collected while a run walks its layers.
// ABOUTME: Printed after the run summary; they never change the outcome or the exit code.

use crate::lock::LockInfo;
use std::fmt;

/// Warnings raised during one bootstrap or teardown run, in the order they occurred.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning and log it, tagged with its layer when it has one.
    pub fn warn(&mut self, warning: Warning) {
        match &warning.layer {
            Some(layer) => tracing::warn!(%layer, kind = %warning.kind, "{}", warning.message),
            None => tracing::warn!(kind = %warning.kind, "{}", warning.message),
        }
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Warnings raised while handling one layer.
    pub fn for_layer<'a>(&'a self, layer: &'a str) -> impl Iterator<Item = &'a Warning> + 'a {
        self.warnings
            .iter()
            .filter(move |w| w.layer.as_deref() == Some(layer))
    }
}

#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    /// Layer the warning concerns; `None` for run-wide warnings.
    pub layer: Option<String>,
    pub message: String,
}

impl Warning {
    fn run_wide(kind: WarningKind, message: String) -> Self {
        Self {
            kind,
            layer: None,
            message,
        }
    }

    /// The run lock file could not be removed after the run.
    pub fn lock_release(error: impl fmt::Display) -> Self {
        Self::run_wide(
            WarningKind::LockRelease,
            format!("run lock was not released: {error}"),
        )
    }

    pub fn lock_broken(previous: &LockInfo) -> Self {
        Self::run_wide(
            WarningKind::LockBroken,
            format!(
                "replaced run lock held by {} (pid {}) since {}",
                previous.holder, previous.pid, previous.started_at
            ),
        )
    }

    pub fn probe_unknown(layer: &str) -> Self {
        Self {
            kind: WarningKind::ProbeUnknown,
            layer: Some(layer.to_string()),
            message: "state could not be determined; applied anyway".to_string(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.layer {
            Some(layer) => write!(f, "layer '{layer}': {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    LockRelease,
    /// A stale lock, or one named by `--break-lock`, was replaced.
    LockBroken,
    /// A probe returned no answer, so its layer was applied.
    ProbeUnknown,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WarningKind::LockRelease => "lock-release",
            WarningKind::LockBroken => "lock-broken",
            WarningKind::ProbeUnknown => "probe-unknown",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CustomerName;

    #[test]
    fn layer_warnings_are_attributed() {
        let mut diag = Diagnostics::default();
        diag.warn(Warning::probe_unknown("edge"));
        diag.warn(Warning::lock_release("permission denied"));

        assert_eq!(diag.warnings().len(), 2);
        let edge: Vec<_> = diag.for_layer("edge").collect();
        assert_eq!(edge.len(), 1);
        assert_eq!(edge[0].kind, WarningKind::ProbeUnknown);
        assert_eq!(diag.for_layer("image").count(), 0);
    }

    #[test]
    fn display_prefixes_the_layer() {
        assert_eq!(
            Warning::probe_unknown("edge").to_string(),
            "layer 'edge': state could not be determined; applied anyway"
        );
        assert_eq!(
            Warning::lock_release("permission denied").to_string(),
            "run lock was not released: permission denied"
        );
    }

    #[test]
    fn broken_lock_names_the_previous_holder() {
        let customer = CustomerName::new("acme").unwrap();
        let previous = LockInfo::new(&customer);
        let warning = Warning::lock_broken(&previous);

        assert_eq!(warning.kind, WarningKind::LockBroken);
        assert!(warning.layer.is_none());
        assert!(warning.message.starts_with("replaced run lock held by"));
        assert!(warning.message.contains(&format!("pid {}", previous.pid)));
    }
}
