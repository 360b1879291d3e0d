// ============================================
// File: crates/resproto-session/src/error.rs
// ============================================
//! # Session Error Types
//!
//! ## Creation Reason
//! Defines the failures of the session layer. Gate errors are rejections
//! that leave every piece of state untouched and send nothing.
//!
//! ## Error Categories
//! 1. **Gate Errors**: Not connected, lifecycle message, out-of-role handler
//! 2. **Configuration Errors**: Load/parse/validation failures
//! 3. **Delivery Errors**: Backend send or reply failures
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use resproto_common::types::Role;
use resproto_core::error::CoreError;
use resproto_core::protocol::messages::MessageType;
use resproto_transport::error::TransportError;

use crate::resource_set::ConnectionState;

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Session error types.
#[derive(Error, Debug)]
pub enum SessionError {
    // ========================================
    // Gate Errors
    // ========================================

    #[error("Resource set {id} is not connected (state: {state})")]
    NotConnected {
        id: u32,
        state: ConnectionState,
    },

    #[error("Message type {0} is a lifecycle message and cannot be sent directly")]
    LifecycleMessage(MessageType),

    #[error("Message type {msg_type} is not permitted for the {role} role")]
    HandlerNotPermitted {
        msg_type: MessageType,
        role: Role,
    },

    #[error("Unknown message type: {0}")]
    UnknownMessageType(i32),

    #[error("Invalid state transition for resource set {id}: {from} -> {to}")]
    InvalidTransition {
        id: u32,
        from: ConnectionState,
        to: ConnectionState,
    },

    #[error("Request {0} already has a pending reply")]
    DuplicateRequest(u32),

    // ========================================
    // Configuration Errors
    // ========================================

    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        path: String,
        reason: String,
    },

    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        field: String,
        reason: String,
    },

    // ========================================
    // Delivery Errors
    // ========================================

    #[error("Resource set {id} has no peer address")]
    MissingPeer {
        id: u32,
    },

    #[error("Failed to send {msg_type}: {source}")]
    SendFailed {
        msg_type: MessageType,
        #[source]
        source: TransportError,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl SessionError {
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub const fn send_failed(msg_type: MessageType, source: TransportError) -> Self {
        Self::SendFailed { msg_type, source }
    }

    /// Returns `true` for rejections that sent nothing and changed nothing.
    #[must_use]
    pub const fn is_gate_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected { .. }
                | Self::LifecycleMessage(_)
                | Self::HandlerNotPermitted { .. }
                | Self::UnknownMessageType(_)
                | Self::InvalidTransition { .. }
                | Self::DuplicateRequest(_)
        )
    }

    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::SendFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}
