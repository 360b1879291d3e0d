// ============================================
// File: crates/resproto-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines the failures of the message codec, split into the encoding
//! side (building a wire message) and the decoding side (turning one back
//! into a protocol message).
//!
//! ## Error Categories
//! 1. **Encoding Errors**: Missing routing, non-composable type, append failure
//! 2. **Decoding Errors**: Absent message, unknown discriminant, layout mismatch
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every codec failure is all-or-nothing; never return partial messages
//!   alongside an error
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use resproto_transport::error::TransportError;

use crate::protocol::messages::MessageType;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Codec error types.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Encoding Errors
    // ========================================

    /// A routing field needed to address the message is absent.
    #[error("Missing routing information: {field}")]
    MissingRouting {
        /// Which routing field is missing
        field: &'static str,
    },

    /// The message type cannot be sent in the requested form.
    #[error("Message type {0} cannot be composed as a method call")]
    NotComposable(MessageType),

    /// A reply was requested for something other than a status message.
    #[error("Reply must be a status message, got {0}")]
    NotAStatus(MessageType),

    /// The transport refused to build the wire message.
    #[error("Encoding failed: {source}")]
    Encoding {
        /// Underlying transport failure
        #[source]
        source: TransportError,
    },

    // ========================================
    // Decoding Errors
    // ========================================

    /// No wire message was supplied.
    #[error("No wire message to parse")]
    MissingMessage,

    /// The leading discriminant is outside the closed enumeration.
    #[error("Unknown message type: {0}")]
    UnknownMessageType(i32),

    /// The body does not match the layout of its discriminant.
    #[error("Decoding {message_type} failed: {source}")]
    Decoding {
        /// Discriminant whose layout was being read
        message_type: String,
        /// Underlying argument read failure
        #[source]
        source: TransportError,
    },
}

impl CoreError {
    /// Creates an `Encoding` error.
    pub const fn encoding(source: TransportError) -> Self {
        Self::Encoding { source }
    }

    /// Creates a `Decoding` error.
    pub fn decoding(message_type: impl Into<String>, source: TransportError) -> Self {
        Self::Decoding {
            message_type: message_type.into(),
            source,
        }
    }

    /// Returns `true` if this error happened while composing.
    #[must_use]
    pub const fn is_encoding_error(&self) -> bool {
        matches!(
            self,
            Self::MissingRouting { .. }
                | Self::NotComposable(_)
                | Self::NotAStatus(_)
                | Self::Encoding { .. }
        )
    }

    /// Returns `true` if this error happened while parsing.
    #[must_use]
    pub const fn is_decoding_error(&self) -> bool {
        matches!(
            self,
            Self::MissingMessage | Self::UnknownMessageType(_) | Self::Decoding { .. }
        )
    }
}

// ============================================
// Tests
// ============================================
