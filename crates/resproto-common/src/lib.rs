// ============================================
// File: crates/resproto-common/src/lib.rs
// ============================================
//! # resproto Common - Shared Types Library
//!
//! ## Creation Reason
//! Provides the small vocabulary shared by every resproto crate: the
//! resource bitmask, record mode flags, endpoint roles and the common
//! error type.
//!
//! ## Main Functionality
//! - [`types`]: `ResourceMask`, `RecordMode`, `Role`
//! - [`error`]: Common error types and result aliases
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              resproto-session                       │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   resproto-core  ──►  resproto-transport            │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             resproto-common  ◄── You are here       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation - changes affect everything
//! - Bit positions in `ResourceMask` are part of the wire contract
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use types::{RecordMode, ResourceMask, Role};
