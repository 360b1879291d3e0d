// ============================================
// File: crates/resproto-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Defines error types for the structured IPC layer: building wire
//! messages, reading typed arguments back, byte framing and sending.
//!
//! ## Error Categories
//! 1. **Build Errors**: Invalid header fields, unappendable arguments
//! 2. **Read Errors**: Argument type mismatch or missing argument
//! 3. **Framing Errors**: Truncated or corrupted byte frames
//! 4. **Connection Errors**: Closed connection, failed send
//!
//! ## ⚠️ Important Note for Next Developer
//! - Read errors carry the argument index; keep it, it is the only clue
//!   about which field of a message layout went wrong
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// TransportError
// ============================================

/// Transport layer error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    // ========================================
    // Build Errors
    // ========================================

    /// A header field (destination, path, interface, member) is unusable.
    #[error("Invalid header field '{field}': {reason}")]
    InvalidHeader {
        /// Header field name
        field: &'static str,
        /// Why it's invalid
        reason: String,
    },

    /// An argument could not be appended to the message body.
    #[error("Cannot append argument {index}: {reason}")]
    AppendFailed {
        /// Position the argument would have taken
        index: usize,
        /// Why appending failed
        reason: String,
    },

    /// Message body would exceed the maximum size.
    #[error("Message body too large: max {max} bytes, got {actual}")]
    BodyTooLarge {
        /// Maximum body size
        max: usize,
        /// Size the body would have reached
        actual: usize,
    },

    // ========================================
    // Read Errors
    // ========================================

    /// Argument has a different wire type than requested.
    #[error("Argument {index} type mismatch: expected '{expected}', found '{found}'")]
    ArgTypeMismatch {
        /// Argument position
        index: usize,
        /// Requested type code
        expected: char,
        /// Actual type code
        found: char,
    },

    /// Message body ended before the requested argument.
    #[error("Argument {index} missing: expected '{expected}'")]
    MissingArg {
        /// Argument position
        index: usize,
        /// Requested type code
        expected: char,
    },

    // ========================================
    // Framing Errors
    // ========================================

    /// Frame is shorter than its header claims.
    #[error("Frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum expected length
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    /// Frame content is malformed.
    #[error("Malformed frame: {reason}")]
    MalformedFrame {
        /// What's wrong with the frame
        reason: String,
    },

    // ========================================
    // Connection Errors
    // ========================================

    /// Send operation failed.
    #[error("Failed to send to '{destination}': {reason}")]
    SendFailed {
        /// Destination bus name
        destination: String,
        /// Why send failed
        reason: String,
    },

    /// Connection is closed.
    #[error("Connection closed")]
    Closed,
}

impl TransportError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates an `InvalidHeader` error.
    pub fn invalid_header(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            field,
            reason: reason.into(),
        }
    }

    /// Creates an `AppendFailed` error.
    pub fn append_failed(index: usize, reason: impl Into<String>) -> Self {
        Self::AppendFailed {
            index,
            reason: reason.into(),
        }
    }

    /// Creates a `MalformedFrame` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            reason: reason.into(),
        }
    }

    /// Creates a `FrameTooShort` error.
    pub const fn too_short(expected: usize, actual: usize) -> Self {
        Self::FrameTooShort { expected, actual }
    }

    /// Creates a `SendFailed` error.
    pub fn send_failed(destination: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SendFailed {
            destination: destination.into(),
            reason: reason.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this error is transient and retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::SendFailed { .. })
    }

    /// Returns `true` if this error came from reading typed arguments.
    #[must_use]
    pub const fn is_read_error(&self) -> bool {
        matches!(self, Self::ArgTypeMismatch { .. } | Self::MissingArg { .. })
    }

    /// Returns `true` if this error came from building a message.
    #[must_use]
    pub const fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidHeader { .. } | Self::AppendFailed { .. } | Self::BodyTooLarge { .. }
        )
    }
}

// ============================================
// Tests
// ============================================
