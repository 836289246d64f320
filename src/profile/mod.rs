// ABOUTME: Customer profile loading and validation.
// ABOUTME: Turns a profile descriptor into an immutable, validated CustomerProfile.

use crate::error::{Error, Result};
use crate::types::{
    AccountId, CustomerName, Environment, RegionId, ResourceKind, SizeClass, UnknownTagError,
    resource_name,
};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::Path;
use thiserror::Error;

/// Configuration errors raised while loading a profile. Every variant that
/// concerns a single key names it.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("malformed profile: {0}")]
    Malformed(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("invalid field `environment`: {0}")]
    UnknownEnvironment(#[source] UnknownTagError),

    #[error("invalid field `name`: profile declares '{found}' but '{requested}' was requested")]
    NameMismatch { requested: String, found: String },
}

impl ProfileError {
    /// The offending field, when the error concerns a single key.
    pub fn field(&self) -> Option<&str> {
        match self {
            ProfileError::Malformed(_) => None,
            ProfileError::MissingField(field) => Some(field),
            ProfileError::InvalidField { field, .. } => Some(field),
            ProfileError::UnknownEnvironment(_) => Some("environment"),
            ProfileError::NameMismatch { .. } => Some("name"),
        }
    }
}

/// Immutable description of one deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub name: CustomerName,
    pub environment: Environment,
    pub region: RegionId,
    pub target_account_id: AccountId,
    pub size_class: SizeClass,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawProfile {
    name: Option<Value>,
    environment: Option<Value>,
    region: Option<Value>,
    target_account_id: Option<Value>,
    size_class: Option<Value>,
}

/// A present string field. Any other type is an error naming the field;
/// numbers are not coerced since `0042` would lose its leading zeros.
fn required(value: Option<Value>, field: &'static str) -> std::result::Result<String, ProfileError> {
    match value {
        None | Some(Value::Null) => Err(ProfileError::MissingField(field)),
        Some(Value::String(text)) => Ok(text),
        Some(other) => Err(invalid(
            field,
            format!("expected a string, found {}", type_name(&other)),
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn invalid(field: &'static str, reason: impl std::fmt::Display) -> ProfileError {
    ProfileError::InvalidField {
        field,
        reason: reason.to_string(),
    }
}

impl CustomerProfile {
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, ProfileError> {
        let raw: RawProfile =
            serde_yaml::from_str(yaml).map_err(|e| ProfileError::Malformed(e.to_string()))?;

        let name = CustomerName::new(&required(raw.name, "name")?)
            .map_err(|e| invalid("name", e))?;

        let environment = required(raw.environment, "environment")?
            .parse::<Environment>()
            .map_err(ProfileError::UnknownEnvironment)?;

        let region = RegionId::new(&required(raw.region, "region")?)
            .map_err(|e| invalid("region", e))?;

        let target_account_id = AccountId::new(&required(raw.target_account_id, "targetAccountId")?)
            .map_err(|e| invalid("targetAccountId", e))?;

        let size_class = required(raw.size_class, "sizeClass")?
            .parse::<SizeClass>()
            .map_err(|e| invalid("sizeClass", e))?;

        Ok(Self {
            name,
            environment,
            region,
            target_account_id,
            size_class,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|source| Error::Profile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Locate and load `<customer>.yml` (or `.yaml`) from the profiles directory.
    pub fn discover(dir: &Path, customer: &str) -> Result<Self> {
        let candidates = [
            dir.join(format!("{customer}.yml")),
            dir.join(format!("{customer}.yaml")),
        ];

        let path = candidates
            .iter()
            .find(|p| p.is_file())
            .ok_or_else(|| Error::ProfileNotFound {
                customer: customer.to_string(),
                dir: dir.to_path_buf(),
            })?;

        let profile = Self::load(path)?;
        if profile.name.as_str() != customer {
            return Err(Error::Profile {
                path: path.clone(),
                source: ProfileError::NameMismatch {
                    requested: customer.to_string(),
                    found: profile.name.to_string(),
                },
            });
        }

        Ok(profile)
    }

    /// Name of a resource owned by this customer deployment.
    pub fn resource_name(&self, kind: ResourceKind) -> String {
        resource_name(&self.name, self.environment, kind)
    }

    /// The top-level scope every layer operates in.
    pub fn scope(&self) -> String {
        self.resource_name(ResourceKind::ResourceGroup)
    }
}
