// ============================================
// File: crates/resproto-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Centralizes the value types that appear inside protocol messages and
//! session configuration, so every crate agrees on their representation.
//!
//! ## Main Functionality
//! - `ResourceMask`: Bitmask of policy-managed resources
//! - `RecordMode`: Flags carried by register/update records
//! - `Role`: Which end of the protocol an endpoint plays
//!
//! ## ⚠️ Important Note for Next Developer
//! - Resource bit positions are shared with the policy manager; never renumber
//! - New resources go at the next free bit
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::CommonError;

// ============================================
// ResourceMask
// ============================================

bitflags! {
    /// Bitmask of resources managed by the policy manager.
    ///
    /// Bits outside the named set come from newer peers and are kept as-is;
    /// build masks from the wire with `from_bits_retain`.
    ///
    /// # Example
    /// ```
    /// use resproto_common::types::ResourceMask;
    ///
    /// let mask = ResourceMask::AUDIO_PLAYBACK | ResourceMask::VIBRA;
    /// assert!(mask.contains(ResourceMask::VIBRA));
    /// assert_eq!(mask.to_string(), "AudioPlayback,Vibra");
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ResourceMask: u32 {
        /// Audio playback.
        const AUDIO_PLAYBACK  = 1 << 0;
        /// Video playback.
        const VIDEO_PLAYBACK  = 1 << 1;
        /// Audio recording.
        const AUDIO_RECORDING = 1 << 2;
        /// Video recording.
        const VIDEO_RECORDING = 1 << 3;
        /// Vibration motor.
        const VIBRA           = 1 << 4;
        /// Notification LEDs.
        const LEDS            = 1 << 5;
        /// Display backlight.
        const BACKLIGHT       = 1 << 6;
        /// System (power) button.
        const SYSTEM_BUTTON   = 1 << 7;
        /// Lock button.
        const LOCK_BUTTON     = 1 << 8;
        /// Volume/zoom scale button.
        const SCALE_BUTTON    = 1 << 9;
        /// Camera snap button.
        const SNAP_BUTTON     = 1 << 10;
        /// Camera lens cover.
        const LENS_COVER      = 1 << 11;
        /// Headset buttons.
        const HEADSET_BUTTONS = 1 << 12;
    }
}

impl Default for ResourceMask {
    fn default() -> Self {
        Self::NONE
    }
}

impl ResourceMask {
    /// No resources.
    pub const NONE: Self = Self::empty();

    /// Returns the bits not covered by any named resource.
    #[must_use]
    pub const fn unknown_bits(&self) -> u32 {
        self.bits() & !Self::all().bits()
    }
}

/// Writes a flag name such as `AUDIO_PLAYBACK` as `AudioPlayback`.
fn write_camel(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    for word in name.split('_') {
        let mut chars = word.chars();
        if let Some(head) = chars.next() {
            write!(f, "{head}")?;
            for c in chars {
                write!(f, "{}", c.to_ascii_lowercase())?;
            }
        }
    }
    Ok(())
}

impl fmt::Display for ResourceMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("<none>");
        }

        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                f.write_str(",")?;
            }
            write_camel(f, name)?;
            first = false;
        }

        let unknown = self.unknown_bits();
        if unknown != 0 {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "0x{unknown:x}")?;
        }

        Ok(())
    }
}

impl FromStr for ResourceMask {
    type Err = CommonError;

    /// Parses the `Display` form: comma separated names, `0x..` for raw
    /// bits, or `<none>`. Names match case-insensitively, with or without
    /// underscores (`AudioPlayback`, `AUDIO_PLAYBACK`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CommonError::invalid_input("resources", "cannot be empty"));
        }
        if s == "<none>" {
            return Ok(Self::NONE);
        }

        let mut mask = Self::NONE;
        for part in s.split(',').map(str::trim) {
            if let Some(hex) = part.strip_prefix("0x") {
                let bits = u32::from_str_radix(hex, 16)
                    .map_err(|_| CommonError::parse("resource bits", part))?;
                mask |= Self::from_bits_retain(bits);
                continue;
            }
            let wanted: String = part.chars().filter(|c| *c != '_').collect();
            let (_, bit) = Self::all()
                .iter_names()
                .find(|(name, _)| name.replace('_', "").eq_ignore_ascii_case(&wanted))
                .ok_or_else(|| CommonError::parse("resource", part))?;
            mask |= bit;
        }
        Ok(mask)
    }
}

// ============================================
// RecordMode
// ============================================

bitflags! {
    /// Mode flags carried by register and update records.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RecordMode: u32 {
        /// Release resources automatically when the policy manager revokes them.
        const AUTO_RELEASE = 1 << 0;
        /// Always send a status reply, even for successful requests.
        const ALWAYS_REPLY = 1 << 1;
    }
}

impl Default for RecordMode {
    fn default() -> Self {
        Self::empty()
    }
}

// ============================================
// Role
// ============================================

/// Which end of the protocol an endpoint plays.
///
/// Clients are applications asking for resources; the server is the
/// central policy manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Application side.
    Client,
    /// Policy manager side.
    Server,
}

impl Role {
    /// Returns the lowercase role name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "server" | "manager" => Ok(Self::Server),
            _ => Err(CommonError::parse("role", s)),
        }
    }
}

// ============================================
// Tests
// ============================================
