// Copyright (c) 2025 - Cowboy AI, Inc.
//! Logical Id Value Object
//!
//! Logical ids name a resource within a stack. They follow CloudFormation
//! logical-id rules so a synthesized artifact can be deployed unchanged.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

/// Logical id validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogicalIdError {
    #[error("Logical id is empty")]
    Empty,

    #[error("Logical id exceeds maximum length of 255 characters: {0}")]
    TooLong(usize),

    #[error("Invalid character {ch:?} in logical id {id:?}")]
    InvalidCharacter { id: String, ch: char },
}

/// Stack-unique resource identifier
///
/// # Invariants
/// - Non-empty
/// - At most 255 characters
/// - ASCII alphanumeric only
///
/// # Examples
///
/// ```rust
/// use cim_stack::domain::LogicalId;
///
/// assert!(LogicalId::new("SaveFunction").is_ok());
/// assert!(LogicalId::new("save-function").is_err());
/// assert!(LogicalId::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalId(String);

impl LogicalId {
    /// Maximum length accepted by CloudFormation
    pub const MAX_LENGTH: usize = 255;

    /// Create a validated logical id
    pub fn new(id: impl Into<String>) -> Result<Self, LogicalIdError> {
        let id = id.into();

        if id.is_empty() {
            return Err(LogicalIdError::Empty);
        }

        if id.len() > Self::MAX_LENGTH {
            return Err(LogicalIdError::TooLong(id.len()));
        }

        if let Some(ch) = id.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(LogicalIdError::InvalidCharacter { id, ch });
        }

        Ok(Self(id))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LogicalId {
    type Error = LogicalIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for LogicalId {
    type Error = LogicalIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LogicalId> for String {
    fn from(id: LogicalId) -> Self {
        id.0
    }
}

impl Borrow<str> for LogicalId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
