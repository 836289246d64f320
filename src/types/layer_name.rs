// ABOUTME: Layer names and the CLI layer selector.
// ABOUTME: `All` selects the whole registry, a name restricts the walk to one layer.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayerNameError {
    #[error("layer name cannot be empty")]
    Empty,

    #[error("invalid character in layer name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerName(String);

impl LayerName {
    pub fn new(value: &str) -> Result<Self, LayerNameError> {
        if value.is_empty() {
            return Err(LayerNameError::Empty);
        }

        if let Some(c) = value
            .chars()
            .find(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && *c != '-')
        {
            return Err(LayerNameError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which layers a walk should visit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LayerSelector {
    #[default]
    All,
    Only(LayerName),
}

impl LayerSelector {
    pub fn includes(&self, name: &str) -> bool {
        match self {
            LayerSelector::All => true,
            LayerSelector::Only(only) => only.as_str() == name,
        }
    }
}

impl FromStr for LayerSelector {
    type Err = LayerNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(LayerSelector::All);
        }
        LayerName::new(s).map(LayerSelector::Only)
    }
}

impl fmt::Display for LayerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerSelector::All => f.write_str("All"),
            LayerSelector::Only(name) => write!(f, "{name}"),
        }
    }
}
