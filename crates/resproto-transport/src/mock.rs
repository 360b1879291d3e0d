// ============================================
// File: crates/resproto-transport/src/mock.rs
// ============================================
//! # Mock Connection Implementation
//!
//! ## Creation Reason
//! Provides an in-memory connection for testing protocol layers without
//! a running bus.
//!
//! ## Main Functionality
//! - Captures every sent message for verification
//! - Assigns serials and sender like a real connection
//! - Carries each message through a byte frame, as a stream carrier would
//! - Injectable send failure and connection close
//!
//! ## Usage in Tests
//! ```
//! use resproto_transport::mock::MockConnection;
//! use resproto_transport::traits::Connection;
//! use resproto_transport::wire::WireMessage;
//!
//! let conn = MockConnection::new(":1.7");
//! let msg = WireMessage::new_method_call("org.peer", "/org/peer", "org.peer", "ping").unwrap();
//!
//! let serial = conn.send(msg).unwrap();
//! let sent = conn.take_sent();
//! assert_eq!(sent.len(), 1);
//! assert_eq!(sent[0].serial(), serial);
//! assert_eq!(sent[0].sender(), Some(":1.7"));
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This is for testing only - do not use in production
//! - The sent queue is bounded to catch runaway send loops
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::marshal;
use crate::traits::Connection;
use crate::wire::WireMessage;

/// Maximum number of captured messages.
const MAX_QUEUE_SIZE: usize = 1000;

// ============================================
// MockConnection
// ============================================

/// In-memory connection capturing sent messages.
pub struct MockConnection {
    /// Unique bus name reported for this end
    name: String,
    /// Messages sent so far
    sent: Mutex<Vec<WireMessage>>,
    /// Next serial to assign
    next_serial: AtomicU32,
    /// Total framed bytes sent
    bytes_sent: AtomicUsize,
    /// Whether sends should fail
    fail_sends: AtomicBool,
    /// Whether the connection is open
    active: AtomicBool,
}

impl MockConnection {
    /// Creates an open mock connection with the given unique name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent: Mutex::new(Vec::new()),
            next_serial: AtomicU32::new(1),
            bytes_sent: AtomicUsize::new(0),
            fail_sends: AtomicBool::new(false),
            active: AtomicBool::new(true),
        }
    }

    /// Makes subsequent sends fail (or succeed again).
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Release);
    }

    /// Closes the connection; further sends return `Closed`.
    pub fn close(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Takes all messages sent so far, clearing the capture.
    #[must_use]
    pub fn take_sent(&self) -> Vec<WireMessage> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Returns the number of captured messages.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Returns the total size of all frames sent so far.
    #[must_use]
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Returns a copy of the most recently sent message.
    #[must_use]
    pub fn last_sent(&self) -> Option<WireMessage> {
        self.sent.lock().last().cloned()
    }
}

impl Connection for MockConnection {
    fn send(&self, mut msg: WireMessage) -> Result<u32> {
        if !self.is_active() {
            return Err(TransportError::Closed);
        }

        let destination = msg.destination().unwrap_or_default().to_owned();
        if self.fail_sends.load(Ordering::Acquire) {
            return Err(TransportError::send_failed(destination, "injected failure"));
        }

        let mut sent = self.sent.lock();
        if sent.len() >= MAX_QUEUE_SIZE {
            return Err(TransportError::send_failed(destination, "mock queue full"));
        }

        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        msg.set_serial(serial);
        msg.set_sender(self.name.clone());

        let frame = marshal::encode(&msg);
        let delivered = marshal::decode(&frame)
            .map_err(|e| TransportError::send_failed(destination, e.to_string()))?;
        self.bytes_sent.fetch_add(frame.len(), Ordering::Relaxed);

        trace!(serial, frame_len = frame.len(), %delivered, "mock send");
        sent.push(delivered);

        Ok(serial)
    }

    fn unique_name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnection")
            .field("name", &self.name)
            .field("active", &self.is_active())
            .field("sent", &self.sent_count())
            .finish()
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new(":1.0")
    }
}

// ============================================
// Tests
// ============================================
