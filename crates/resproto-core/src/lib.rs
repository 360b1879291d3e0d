// ============================================
// File: crates/resproto-core/src/lib.rs
// ============================================
//! # resproto Core - Protocol Library
//!
//! ## Creation Reason
//! Provides the message model of the resource policy protocol and the
//! codec that moves it in and out of wire messages.
//!
//! ## Main Functionality
//!
//! ### Protocol Module ([`protocol`])
//! - Message type definitions (register, acquire, grant, status, ...)
//! - Per-layout codec for composing and parsing wire messages
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              resproto-session                       │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   resproto-core  ──►  resproto-transport            │
//! │   You are here                │                     │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             resproto-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - **All-or-nothing**: compose and parse never return partial results
//! - **Exhaustive**: every message type is matched in both directions
//!
//! ## ⚠️ Important Note for Next Developer
//! - Protocol changes MUST stay wire compatible with deployed managers
//! - Keep encode and decode of each layout side by side
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod protocol;

// Re-export commonly used items
pub use error::{CoreError, Result};
pub use protocol::{Message, MessageCodec, MessageType, Route, StatusMsg};
