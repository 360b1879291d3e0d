// ============================================
// File: crates/resproto-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! Defines the interface the protocol layers use to hand finished wire
//! messages to whatever carries them (a bus connection, a socket, an
//! in-process loopback, a test double).
//!
//! ## Design Philosophy
//! - Connection setup, authentication and the event loop stay outside
//! - Calls are synchronous; any suspension happens inside the implementation
//! - Implementations must be `Send + Sync` so sessions can share them
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use crate::error::Result;
use crate::wire::WireMessage;

// ============================================
// Connection Trait
// ============================================

/// An established IPC connection able to send wire messages.
///
/// # Example
/// ```ignore
/// fn ping<C: Connection>(conn: &C) -> Result<u32> {
///     let msg = WireMessage::new_method_call("org.peer", "/org/peer", "org.peer", "ping")?;
///     conn.send(msg)
/// }
/// ```
pub trait Connection: Send + Sync {
    /// Sends a message, assigning its serial and sender.
    ///
    /// # Returns
    /// The serial assigned to the message.
    ///
    /// # Errors
    /// Returns error if the connection is closed or the send fails.
    fn send(&self, msg: WireMessage) -> Result<u32>;

    /// Returns the unique bus name of this end of the connection.
    fn unique_name(&self) -> &str;

    /// Returns `true` if the connection can still send.
    fn is_active(&self) -> bool;
}

impl<C: Connection + ?Sized> Connection for std::sync::Arc<C> {
    fn send(&self, msg: WireMessage) -> Result<u32> {
        (**self).send(msg)
    }

    fn unique_name(&self) -> &str {
        (**self).unique_name()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }
}
