// ABOUTME: Where a named secret's value comes from.
// ABOUTME: Either an environment variable or a file; values are never stored in config.

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SecretSource {
    /// `{ env: VAR_NAME }`
    Env { env: String },
    /// `{ file: /run/secrets/token }`, relative paths resolve against the config file.
    File { file: PathBuf },
}

impl SecretSource {
    pub(crate) fn relative_to(self, base: &Path) -> Self {
        match self {
            SecretSource::File { file } if file.is_relative() => SecretSource::File {
                file: base.join(file),
            },
            other => other,
        }
    }
}
