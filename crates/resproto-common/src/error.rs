// ============================================
// File: crates/resproto-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Errors raised while interpreting shared protocol values (roles,
//! resource names) from text.
//!
//! ## Design Philosophy
//! - Each crate defines its own error type and wraps `CommonError`
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

/// Common result type.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors shared across resproto crates.
///
/// # Example
/// ```
/// use resproto_common::error::CommonError;
/// use resproto_common::types::Role;
///
/// let err = "observer".parse::<Role>().unwrap_err();
/// assert!(matches!(err, CommonError::Parse { .. }));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// A required value is missing or unusable.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the field or parameter
        field: String,
        /// Description of what's wrong
        reason: String,
    },

    /// Text did not name a known value.
    #[error("Failed to parse {what}: '{input}'")]
    Parse {
        /// What was being parsed
        what: String,
        /// The offending input
        input: String,
    },
}

impl CommonError {
    /// Creates an `InvalidInput` error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Parse` error.
    pub fn parse(what: impl Into<String>, input: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            input: input.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommonError::invalid_input("resources", "cannot be empty");
        assert_eq!(err.to_string(), "Invalid input for 'resources': cannot be empty");

        let err = CommonError::parse("role", "peer");
        assert_eq!(err.to_string(), "Failed to parse role: 'peer'");
    }
}
