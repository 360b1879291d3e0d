// ============================================
// File: crates/resproto-transport/src/lib.rs
// ============================================
//! # resproto Transport - Structured IPC Layer
//!
//! ## Creation Reason
//! Provides the structured IPC message the resource protocol travels in,
//! the connection abstraction used to send it, and a byte framing for
//! stream carriers.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`wire`]: Wire message model (routed header + typed arguments)
//! - [`traits`]: `Connection` trait
//! - [`marshal`]: Frame encoding/decoding for byte-stream carriers
//! - [`mock`]: In-memory connection for tests; carries every message
//!   through [`marshal`]
//! - [`error`]: Transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              resproto-session                       │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   resproto-core  ──►  resproto-transport            │
//! │                        You are here ◄──             │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             resproto-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Connection establishment and the event loop are not part of this crate
//! - Always go through `Connection` so tests can substitute the mock
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod marshal;
pub mod mock;
pub mod traits;
pub mod wire;

// Re-export primary types
pub use error::{Result, TransportError};
pub use mock::MockConnection;
pub use traits::Connection;
pub use wire::{ArgReader, MessageKind, WireArg, WireMessage, WireType};
