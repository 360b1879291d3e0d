// ============================================
// File: crates/resproto-session/src/lib.rs
// ============================================
//! # resproto Session Library
//!
//! ## Creation Reason
//! Provides the protocol session layer on top of the message codec:
//! per-connection role and handler tables, resource set state gating,
//! and request/reply correlation.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`session`]: Handler registration, dispatch, request numbers
//! - [`resource_set`]: Connection state machine and gated sends
//! - [`backend`]: Role-specific addressing over a transport connection
//! - [`config`]: Session configuration (TOML)
//! - [`logging`]: Tracing subscriber setup
//! - [`error`]: Session-specific error types
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Application                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────┐  send/reply   ┌─────────────┐              │
//! │  │ ResourceSet │ ────────────► │   Session   │              │
//! │  │  (state)    │ ◄──────────── │ (handlers,  │              │
//! │  └─────────────┘   Arc<..>     │  pending)   │              │
//! │                                └──────┬──────┘              │
//! │                                       │                     │
//! │                                       ▼                     │
//! │                                ┌─────────────┐              │
//! │                                │ BusBackend  │              │
//! │                                └──────┬──────┘              │
//! ├───────────────────────────────────────┼─────────────────────┤
//! │                    Transport          ▼                     │
//! │                              Connection (send)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//! Outgoing: Message → ResourceSet gate → Backend → compose → Connection
//! Incoming: WireMessage → Session::dispatch → parse → handler | pending reply
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - All operations are synchronous; the event loop belongs to the caller
//! - Reply timeouts are not tracked here; use `Session::cancel_pending`
//!
//! ## Last Modified
//! v0.1.0 - Initial session library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod resource_set;
pub mod session;

// Re-export primary types
pub use backend::{BusBackend, ProtocolBackend};
pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use resource_set::{ConnectionState, ResourceSet};
pub use session::{Dispatch, MessageHandler, ReplyContext, Session, StatusCallback};
