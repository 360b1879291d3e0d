// ============================================
// File: crates/resproto-transport/src/wire.rs
// ============================================
//! # Wire Message Model
//!
//! ## Creation Reason
//! Models the structured IPC message the protocol travels in: a routed
//! header plus an ordered list of typed arguments. This is the contract
//! the message codec is written against.
//!
//! ## Main Functionality
//! - `WireMessage`: Method call or method return with typed body
//! - `WireArg` / `WireType`: The argument types the protocol uses
//! - `ArgReader`: In-order typed reads over a message body
//!
//! ## Message Shape
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ kind         │ MethodCall | MethodReturn          │
//! │ serial       │ assigned by the connection         │
//! │ reply_serial │ serial of the call being answered  │
//! │ destination  │ bus name of the receiver           │
//! │ path         │ object path ("/org/...")           │
//! │ interface    │ dotted interface name              │
//! │ member       │ method name                        │
//! │ sender       │ bus name of the sender             │
//! ├──────────────────────────────────────────────────┤
//! │ body         │ [i | u | s]*                       │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `append` is all-or-nothing: a rejected batch leaves the body untouched
//! - Strings may not contain NUL; the framing terminates them with one
//!
//! ## Last Modified
//! v0.1.0 - Initial wire model

use std::fmt;

use crate::error::{Result, TransportError};

// ============================================
// Constants
// ============================================

/// Largest body a single message may carry (128 MiB).
pub const MAX_BODY_SIZE: usize = 128 * 1024 * 1024;

// ============================================
// MessageKind
// ============================================

/// Whether a wire message is a request or the answer to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// A method call addressed to a destination.
    MethodCall = 1,
    /// A reply to an earlier method call.
    MethodReturn = 2,
}

impl MessageKind {
    /// Converts a byte to a `MessageKind`.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::MethodCall),
            2 => Some(Self::MethodReturn),
            _ => None,
        }
    }

    /// Returns the byte representation.
    #[must_use]
    pub const fn as_byte(&self) -> u8 {
        *self as u8
    }
}

// ============================================
// WireType / WireArg
// ============================================

/// Wire type of a single body argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Length-prefixed UTF-8 text.
    String,
}

impl WireType {
    /// Returns the signature character for this type.
    #[must_use]
    pub const fn code(&self) -> char {
        match self {
            Self::Int32 => 'i',
            Self::Uint32 => 'u',
            Self::String => 's',
        }
    }

    /// Parses a signature character.
    #[must_use]
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'i' => Some(Self::Int32),
            'u' => Some(Self::Uint32),
            's' => Some(Self::String),
            _ => None,
        }
    }
}

/// A typed body argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WireArg {
    /// Signed 32-bit integer.
    Int32(i32),
    /// Unsigned 32-bit integer.
    Uint32(u32),
    /// Text.
    Str(String),
}

impl WireArg {
    /// Returns the wire type of this argument.
    #[must_use]
    pub const fn wire_type(&self) -> WireType {
        match self {
            Self::Int32(_) => WireType::Int32,
            Self::Uint32(_) => WireType::Uint32,
            Self::Str(_) => WireType::String,
        }
    }

    /// Upper bound of the encoded size, alignment padding included.
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        match self {
            Self::Int32(_) | Self::Uint32(_) => 4,
            Self::Str(s) => 4 + s.len() + 1 + 3,
        }
    }
}

impl From<i32> for WireArg {
    fn from(value: i32) -> Self {
        Self::Int32(value)
    }
}

impl From<u32> for WireArg {
    fn from(value: u32) -> Self {
        Self::Uint32(value)
    }
}

impl From<&str> for WireArg {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for WireArg {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

// ============================================
// WireMessage
// ============================================

/// A structured IPC message: routing header plus typed body.
///
/// # Example
/// ```
/// use resproto_transport::wire::{WireArg, WireMessage};
///
/// let mut call = WireMessage::new_method_call(
///     "org.maemo.resource.manager",
///     "/org/maemo/resource/manager",
///     "org.maemo.resource.manager",
///     "acquire",
/// ).unwrap();
/// call.append([WireArg::Int32(3), WireArg::Uint32(1), WireArg::Uint32(7)]).unwrap();
///
/// assert_eq!(call.signature(), "iuu");
/// let mut reader = call.reader();
/// assert_eq!(reader.read_i32().unwrap(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    kind: MessageKind,
    serial: u32,
    reply_serial: Option<u32>,
    destination: Option<String>,
    path: Option<String>,
    interface: Option<String>,
    member: Option<String>,
    sender: Option<String>,
    args: Vec<WireArg>,
    body_size: usize,
}

impl WireMessage {
    /// Creates a method call addressed to `member` on `interface` at
    /// `path` of `destination`.
    ///
    /// # Errors
    /// Returns `InvalidHeader` if any routing field is empty, contains a
    /// NUL byte, or `path` is not absolute.
    pub fn new_method_call(
        destination: &str,
        path: &str,
        interface: &str,
        member: &str,
    ) -> Result<Self> {
        check_header("destination", destination)?;
        check_header("path", path)?;
        check_header("interface", interface)?;
        check_header("member", member)?;

        if !path.starts_with('/') {
            return Err(TransportError::invalid_header(
                "path",
                format!("'{path}' is not an absolute object path"),
            ));
        }

        Ok(Self {
            kind: MessageKind::MethodCall,
            serial: 0,
            reply_serial: None,
            destination: Some(destination.to_owned()),
            path: Some(path.to_owned()),
            interface: Some(interface.to_owned()),
            member: Some(member.to_owned()),
            sender: None,
            args: Vec::new(),
            body_size: 0,
        })
    }

    /// Creates a method return answering `original`.
    ///
    /// The reply is addressed back to the original sender and carries the
    /// original serial as its `reply_serial`.
    #[must_use]
    pub fn new_method_return(original: &Self) -> Self {
        Self {
            kind: MessageKind::MethodReturn,
            serial: 0,
            reply_serial: Some(original.serial),
            destination: original.sender.clone(),
            path: None,
            interface: None,
            member: None,
            sender: None,
            args: Vec::new(),
            body_size: 0,
        }
    }

    /// Appends arguments to the body.
    ///
    /// Either every argument is appended or none is.
    ///
    /// # Errors
    /// - `AppendFailed` if a string contains a NUL byte
    /// - `BodyTooLarge` if the body would exceed [`MAX_BODY_SIZE`]
    pub fn append<I>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = WireArg>,
    {
        let batch: Vec<WireArg> = args.into_iter().collect();
        let mut size = self.body_size;

        for (offset, arg) in batch.iter().enumerate() {
            if let WireArg::Str(s) = arg {
                if s.contains('\0') {
                    return Err(TransportError::append_failed(
                        self.args.len() + offset,
                        "string contains a NUL byte",
                    ));
                }
            }
            size += arg.encoded_size();
        }

        if size > MAX_BODY_SIZE {
            return Err(TransportError::BodyTooLarge {
                max: MAX_BODY_SIZE,
                actual: size,
            });
        }

        self.args.extend(batch);
        self.body_size = size;
        Ok(())
    }

    /// Returns a reader positioned at the first body argument.
    #[must_use]
    pub fn reader(&self) -> ArgReader<'_> {
        ArgReader {
            args: &self.args,
            pos: 0,
        }
    }

    /// Returns the body's type signature, e.g. `"iuus"`.
    #[must_use]
    pub fn signature(&self) -> String {
        self.args.iter().map(|a| a.wire_type().code()).collect()
    }

    /// Returns the body arguments.
    #[must_use]
    pub fn args(&self) -> &[WireArg] {
        &self.args
    }

    /// Returns the message kind.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Returns `true` if this message answers an earlier call.
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        matches!(self.kind, MessageKind::MethodReturn)
    }

    /// Returns the serial assigned by the sending connection (0 if unsent).
    #[must_use]
    pub const fn serial(&self) -> u32 {
        self.serial
    }

    /// Sets the serial. Called by connections when the message is sent.
    pub fn set_serial(&mut self, serial: u32) {
        self.serial = serial;
    }

    /// Returns the serial of the call this message answers.
    #[must_use]
    pub const fn reply_serial(&self) -> Option<u32> {
        self.reply_serial
    }

    /// Returns the destination bus name.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// Returns the object path.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns the interface name.
    #[must_use]
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    /// Returns the member (method) name.
    #[must_use]
    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    /// Returns the sender bus name.
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// Sets the sender. Called by connections when the message is sent.
    pub fn set_sender(&mut self, sender: impl Into<String>) {
        self.sender = Some(sender.into());
    }

    /// Reassembles a message from already-validated parts.
    pub(crate) fn from_parts(parts: WireParts) -> Self {
        let body_size = parts.args.iter().map(WireArg::encoded_size).sum();
        Self {
            kind: parts.kind,
            serial: parts.serial,
            reply_serial: parts.reply_serial,
            destination: parts.destination,
            path: parts.path,
            interface: parts.interface,
            member: parts.member,
            sender: parts.sender,
            args: parts.args,
            body_size,
        }
    }
}

impl fmt::Display for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MessageKind::MethodCall => write!(
                f,
                "call {}.{} -> {} [{}] serial={}",
                self.interface.as_deref().unwrap_or("?"),
                self.member.as_deref().unwrap_or("?"),
                self.destination.as_deref().unwrap_or("?"),
                self.signature(),
                self.serial
            ),
            MessageKind::MethodReturn => write!(
                f,
                "return -> {} [{}] reply_serial={}",
                self.destination.as_deref().unwrap_or("?"),
                self.signature(),
                self.reply_serial.unwrap_or(0)
            ),
        }
    }
}

/// Decoded pieces of a message, used by the framing layer.
#[derive(Debug, Default)]
pub(crate) struct WireParts {
    pub kind: MessageKind,
    pub serial: u32,
    pub reply_serial: Option<u32>,
    pub destination: Option<String>,
    pub path: Option<String>,
    pub interface: Option<String>,
    pub member: Option<String>,
    pub sender: Option<String>,
    pub args: Vec<WireArg>,
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::MethodCall
    }
}

fn check_header(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(TransportError::invalid_header(field, "cannot be empty"));
    }
    if value.contains('\0') {
        return Err(TransportError::invalid_header(field, "contains a NUL byte"));
    }
    Ok(())
}

// ============================================
// ArgReader
// ============================================

/// Reads body arguments in order, checking each one's wire type.
///
/// Arguments left unread after the last call are ignored.
#[derive(Debug, Clone)]
pub struct ArgReader<'a> {
    args: &'a [WireArg],
    pos: usize,
}

impl<'a> ArgReader<'a> {
    /// Reads a signed 32-bit integer.
    ///
    /// # Errors
    /// `MissingArg` or `ArgTypeMismatch`.
    pub fn read_i32(&mut self) -> Result<i32> {
        match self.args.get(self.pos) {
            Some(WireArg::Int32(v)) => {
                self.pos += 1;
                Ok(*v)
            }
            other => Err(read_error(self.pos, WireType::Int32, other)),
        }
    }

    /// Reads an unsigned 32-bit integer.
    ///
    /// # Errors
    /// `MissingArg` or `ArgTypeMismatch`.
    pub fn read_u32(&mut self) -> Result<u32> {
        match self.args.get(self.pos) {
            Some(WireArg::Uint32(v)) => {
                self.pos += 1;
                Ok(*v)
            }
            other => Err(read_error(self.pos, WireType::Uint32, other)),
        }
    }

    /// Reads a string, borrowed from the message body.
    ///
    /// # Errors
    /// `MissingArg` or `ArgTypeMismatch`.
    pub fn read_str(&mut self) -> Result<&'a str> {
        let args = self.args;
        match args.get(self.pos) {
            Some(WireArg::Str(s)) => {
                self.pos += 1;
                Ok(s.as_str())
            }
            other => Err(read_error(self.pos, WireType::String, other)),
        }
    }

    /// Number of arguments not yet read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.args.len() - self.pos
    }
}

fn read_error(index: usize, expected: WireType, found: Option<&WireArg>) -> TransportError {
    match found {
        None => TransportError::MissingArg {
            index,
            expected: expected.code(),
        },
        Some(arg) => TransportError::ArgTypeMismatch {
            index,
            expected: expected.code(),
            found: arg.wire_type().code(),
        },
    }
}

// ============================================
// Tests
// ============================================
