// ============================================
// File: crates/resproto-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the resource policy protocol: the closed set of messages and
//! their encoding into wire messages.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`messages`]: Message types and payloads
//! - [`codec`]: Wire message composition and parsing
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Client ──── register / update / acquire / release ───► Mgr │
//! │  Client ◄─────────────── status (reply) ─────────────── Mgr │
//! │                                                             │
//! │  Client ◄──────────── grant / advice ────────────────── Mgr │
//! │  Client ──── audio / video (stream metadata) ──────────► Mgr│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The discriminant is always the first body argument
//! - Field order is the contract; there is no embedded schema
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod codec;
pub mod messages;

// Re-export primary types
pub use codec::{compose_message, parse_message, reply_message, Codec, MessageCodec, Route};
pub use messages::{
    AudioMsg, AudioProperty, Layout, MatchMethod, MatchRule, Message, MessageType, NotifyMsg,
    PossessMsg, RecordMsg, ResourceSpec, StatusMsg, VideoMsg, MESSAGE_TYPE_COUNT,
};
