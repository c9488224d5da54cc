//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
}

/// A validated application identifier.
///
/// App IDs must be non-empty strings. They are the package-style identifiers
/// reported by the platform event log (e.g., "com.example.mail").
///
/// Ordered so that maps keyed by `AppId` iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppId(String);

impl AppId {
    /// Creates a new ID after validation.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::Empty { field: "app ID" });
        }
        Ok(Self(id))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AppId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AppId> for String {
    fn from(id: AppId) -> Self {
        id.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AppId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_id_rejects_empty() {
        assert!(AppId::new("").is_err());
        assert!(AppId::new("com.example.mail").is_ok());
    }

    #[test]
    fn app_id_serde_roundtrip() {
        let id = AppId::new("com.example.mail").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"com.example.mail\"");
        let parsed: AppId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn app_id_serde_rejects_empty() {
        let result: Result<AppId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn app_id_as_ref() {
        let id = AppId::new("com.example.mail").unwrap();
        let s: &str = id.as_ref();
        assert_eq!(s, "com.example.mail");
    }

    #[test]
    fn app_id_ordering_is_lexicographic() {
        let a = AppId::new("com.a.app").unwrap();
        let b = AppId::new("com.b.app").unwrap();
        assert!(a < b);
    }
}
