// ABOUTME: Target account / subscription identifier.
// ABOUTME: Compared byte-for-byte against the active identity during preflight.

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountIdError {
    #[error("account id cannot be empty")]
    Empty,

    #[error("account id exceeds maximum length of 64 characters")]
    TooLong,

    #[error("invalid character in account id: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(value: &str) -> Result<Self, AccountIdError> {
        if value.is_empty() {
            return Err(AccountIdError::Empty);
        }

        if value.len() > 64 {
            return Err(AccountIdError::TooLong);
        }

        if let Some(c) = value
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-')
        {
            return Err(AccountIdError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact match, no case folding. A scope that differs only in case is a
    /// different scope as far as the safety gate is concerned.
    pub fn matches(&self, active: &str) -> bool {
        self.0 == active
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
