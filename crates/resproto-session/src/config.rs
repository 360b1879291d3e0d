// ============================================
// File: crates/resproto-session/src/config.rs
// ============================================
//! # Session Configuration
//!
//! ## Creation Reason
//! Provides the configuration of a protocol endpoint: which role it plays
//! and the bus names messages are addressed with.
//!
//! ## Main Functionality
//! - `SessionConfig`: Main configuration structure
//! - TOML file loading and parsing
//! - Configuration validation
//! - Defaults matching the standard resource manager names
//!
//! ## Configuration Sections
//! - `role`: `client` or `server`
//! - `bus`: Manager and client bus names, object paths, interfaces
//! - `logging`: Log level
//!
//! ## Example Configuration
//! ```toml
//! role = "client"
//!
//! [bus]
//! manager_name = "org.maemo.resource.manager"
//! manager_path = "/org/maemo/resource/manager"
//! manager_interface = "org.maemo.resource.manager"
//! client_path = "/org/maemo/resource/client"
//! client_interface = "org.maemo.resource.client"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Both ends must agree on paths and interfaces or nothing gets delivered
//! - Validate config before building a session
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use resproto_common::types::Role;

use crate::error::{Result, SessionError};

/// Default bus name of the resource manager.
pub const DEFAULT_MANAGER_NAME: &str = "org.maemo.resource.manager";
/// Default object path of the resource manager.
pub const DEFAULT_MANAGER_PATH: &str = "/org/maemo/resource/manager";
/// Default interface of the resource manager.
pub const DEFAULT_MANAGER_INTERFACE: &str = "org.maemo.resource.manager";
/// Default object path of resource clients.
pub const DEFAULT_CLIENT_PATH: &str = "/org/maemo/resource/client";
/// Default interface of resource clients.
pub const DEFAULT_CLIENT_INTERFACE: &str = "org.maemo.resource.client";

// ============================================
// SessionConfig
// ============================================

/// Main session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Role of this endpoint.
    #[serde(default = "default_role")]
    pub role: Role,

    /// Bus addressing.
    #[serde(default)]
    pub bus: BusConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_role() -> Role {
    Role::Client
}

impl SessionConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = std::fs::read_to_string(path)
            .map_err(|e| SessionError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| SessionError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!(role = %config.role, "Configuration loaded successfully");
        Ok(config)
    }

    /// Loads configuration from a string.
    ///
    /// # Errors
    /// Returns error if the content cannot be parsed or validated.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| SessionError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.bus.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Serializes configuration to a TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            role: default_role(),
            bus: BusConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ============================================
// BusConfig
// ============================================

/// Bus addressing section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Well-known bus name of the manager.
    #[serde(default = "default_manager_name")]
    pub manager_name: String,

    /// Object path the manager serves.
    #[serde(default = "default_manager_path")]
    pub manager_path: String,

    /// Interface the manager implements.
    #[serde(default = "default_manager_interface")]
    pub manager_interface: String,

    /// Object path clients serve.
    #[serde(default = "default_client_path")]
    pub client_path: String,

    /// Interface clients implement.
    #[serde(default = "default_client_interface")]
    pub client_interface: String,
}

fn default_manager_name() -> String {
    DEFAULT_MANAGER_NAME.to_string()
}

fn default_manager_path() -> String {
    DEFAULT_MANAGER_PATH.to_string()
}

fn default_manager_interface() -> String {
    DEFAULT_MANAGER_INTERFACE.to_string()
}

fn default_client_path() -> String {
    DEFAULT_CLIENT_PATH.to_string()
}

fn default_client_interface() -> String {
    DEFAULT_CLIENT_INTERFACE.to_string()
}

impl BusConfig {
    fn validate(&self) -> Result<()> {
        check_name("bus.manager_name", &self.manager_name)?;
        check_path("bus.manager_path", &self.manager_path)?;
        check_interface("bus.manager_interface", &self.manager_interface)?;
        check_path("bus.client_path", &self.client_path)?;
        check_interface("bus.client_interface", &self.client_interface)?;
        Ok(())
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            manager_name: default_manager_name(),
            manager_path: default_manager_path(),
            manager_interface: default_manager_interface(),
            client_path: default_client_path(),
            client_interface: default_client_interface(),
        }
    }
}

fn check_name(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(SessionError::config_invalid(field, "cannot be empty"));
    }
    if value.contains(char::is_whitespace) || value.contains('\0') {
        return Err(SessionError::config_invalid(
            field,
            format!("'{value}' contains invalid characters"),
        ));
    }
    Ok(())
}

fn check_path(field: &str, value: &str) -> Result<()> {
    check_name(field, value)?;
    if !value.starts_with('/') {
        return Err(SessionError::config_invalid(
            field,
            format!("'{value}' must start with '/'"),
        ));
    }
    Ok(())
}

fn check_interface(field: &str, value: &str) -> Result<()> {
    check_name(field, value)?;
    if !value.contains('.') || value.split('.').any(str::is_empty) {
        return Err(SessionError::config_invalid(
            field,
            format!("'{value}' is not a dotted interface name"),
        ));
    }
    Ok(())
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    fn validate(&self) -> Result<()> {
        if self.level.trim().is_empty() {
            return Err(SessionError::config_invalid(
                "logging.level",
                "cannot be empty",
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.role, Role::Client);
        assert_eq!(config.bus.manager_name, DEFAULT_MANAGER_NAME);
    }

    #[test]
    fn test_full_config_format() {
        let toml = r#"
            role = "server"

            [bus]
            manager_name = "com.example.policy"
            manager_path = "/com/example/policy"
            manager_interface = "com.example.policy"
            client_path = "/com/example/client"
            client_interface = "com.example.client"

            [logging]
            level = "debug"
        "#;

        let config = SessionConfig::from_str(toml).unwrap();
        assert_eq!(config.role, Role::Server);
        assert_eq!(config.bus.manager_path, "/com/example/policy");
        assert_eq!(config.bus.client_interface, "com.example.client");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = SessionConfig::from_str("[logging]\nlevel = \"warn\"\n").unwrap();
        assert_eq!(config.role, Role::Client);
        assert_eq!(config.bus, BusConfig::default());
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SessionConfig::from_str("[bus]\nmanager_path = \"relative/path\"\n").unwrap_err();
        assert!(matches!(err, SessionError::ConfigInvalid { ref field, .. } if field == "bus.manager_path"));

        let err = SessionConfig::from_str("[bus]\nclient_interface = \"nodots\"\n").unwrap_err();
        assert!(err.is_config_error());

        let err = SessionConfig::from_str("[bus]\nmanager_name = \"\"\n").unwrap_err();
        assert!(err.is_config_error());

        let err = SessionConfig::from_str("role = \"observer\"\n").unwrap_err();
        assert!(matches!(err, SessionError::ConfigLoad { .. }));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = SessionConfig::default();
        config.role = Role::Server;
        config.logging.level = "trace".into();

        let parsed = SessionConfig::from_str(&config.to_toml()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SessionConfig::load("/nonexistent/resproto.toml").unwrap_err();
        assert!(matches!(err, SessionError::ConfigLoad { .. }));
    }
}
