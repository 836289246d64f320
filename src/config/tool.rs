// ABOUTME: Configuration for the external tools behind each collaborator.
// ABOUTME: A tool is an argv prefix plus the secrets it receives as env vars.

use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    pub provisioner: ToolConfig,
    pub identity: ToolConfig,
    pub images: ToolConfig,
    pub edge: ToolConfig,
    pub reconciler: ToolConfig,
}

impl ToolsConfig {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ToolConfig)> {
        [
            ("provisioner", &self.provisioner),
            ("identity", &self.identity),
            ("images", &self.images),
            ("edge", &self.edge),
            ("reconciler", &self.reconciler),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    #[serde(deserialize_with = "deserialize_command")]
    pub command: NonEmpty<String>,

    /// Environment variable name -> secret name.
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,
}

fn deserialize_command<'de, D>(deserializer: D) -> Result<NonEmpty<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let argv: Vec<String> = Vec::deserialize(deserializer)?;
    NonEmpty::from_vec(argv).ok_or_else(|| serde::de::Error::custom("tool command cannot be empty"))
}
