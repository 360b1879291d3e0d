// ============================================
// File: crates/resproto-session/src/logging.rs
// ============================================
//! # Logging Setup
//!
//! ## Creation Reason
//! Installs the tracing subscriber for processes embedding a session.
//!
//! ## ⚠️ Important Note for Next Developer
//! - `RUST_LOG` overrides the configured level
//! - Safe to call more than once; only the first call installs anything
//!
//! ## Last Modified
//! v0.1.0 - Initial logging setup

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Initializes the tracing subscriber at `level`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .is_ok()
}

/// Initializes the tracing subscriber from a logging section.
pub fn init_from_config(config: &LoggingConfig) -> bool {
    init_logging(&config.level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logging("debug");
        assert!(!init_from_config(&LoggingConfig::default()));
    }
}
