// ABOUTME: Test support utilities.
// ABOUTME: Fake collaborators, scripted layers, profiles and log capture for integration tests.

use layerboot::engine::ExecutionContext;
use layerboot::journal::RunMode;
use layerboot::profile::CustomerProfile;
use layerboot::secrets::{RedactingMakeWriter, Redactor, SecretBroker};
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Once};

// Each test binary only uses some of these modules, so allow dead_code.
#[allow(dead_code)]
pub mod fake_cloud;
#[allow(dead_code)]
pub mod scripted;

pub const CUSTOMER: &str = "acme";
pub const ACCOUNT: &str = "sub-acme-001";

pub const PROFILE_YAML: &str = "\
name: acme
environment: trial
region: westeurope
targetAccountId: sub-acme-001
sizeClass: small
";

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("layerboot=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[allow(dead_code)]
pub fn profile() -> CustomerProfile {
    CustomerProfile::from_yaml(PROFILE_YAML).unwrap()
}

/// Context for `profile()` over the given collaborators, no secrets configured.
#[allow(dead_code)]
pub fn context(tools: layerboot::tools::Toolset, mode: RunMode) -> ExecutionContext {
    let secrets = SecretBroker::new(HashMap::new(), Redactor::new());
    ExecutionContext::new(profile(), secrets, tools, mode)
}

/// Log output captured through the redacting writer.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<parking_lot::Mutex<Vec<u8>>>);

#[allow(dead_code)]
impl CapturedLogs {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// Install a thread-local subscriber that writes here through `redactor`.
    pub fn install(&self, redactor: &Redactor) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_ansi(false)
            .with_writer(RedactingMakeWriter::new(redactor.clone(), move || sink.clone()))
            .finish();
        tracing::subscriber::set_default(subscriber)
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
