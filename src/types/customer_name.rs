// ABOUTME: DNS-compatible customer name validation.
// ABOUTME: Customer names are embedded in every derived resource name, so they stay short.

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Maximum length keeps derived names like `gitops-<customer>-trial` within
/// the tightest provider limits.
pub const MAX_CUSTOMER_NAME_LEN: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CustomerNameError {
    #[error("customer name cannot be empty")]
    Empty,

    #[error("customer name exceeds maximum length of {MAX_CUSTOMER_NAME_LEN} characters")]
    TooLong,

    #[error("customer name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("customer name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("customer name must be lowercase")]
    NotLowercase,

    #[error("invalid character in customer name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomerName(String);

impl CustomerName {
    pub fn new(value: &str) -> Result<Self, CustomerNameError> {
        if value.is_empty() {
            return Err(CustomerNameError::Empty);
        }

        if value.len() > MAX_CUSTOMER_NAME_LEN {
            return Err(CustomerNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(CustomerNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(CustomerNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(CustomerNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(CustomerNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for CustomerName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
