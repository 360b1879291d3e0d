// ============================================
// File: crates/resproto-core/src/protocol/codec.rs
// ============================================
//! # Protocol Codec
//!
//! ## Creation Reason
//! Converts protocol messages to and from wire messages. Every layout has
//! both directions written out field by field, since the field order is
//! the only schema there is.
//!
//! ## Main Functionality
//! - `Codec` trait: Per-payload encode/decode interface
//! - `MessageCodec`: Implementation for all layouts
//! - `compose` / `compose_reply`: Message → wire message
//! - `parse` / `parse_into` / `parse_optional`: Wire message → message
//!
//! ## Parsing Strategy
//! 1. Read the leading i32 discriminant
//! 2. Reject anything outside the enumeration
//! 3. Dispatch to the layout-specific decoder
//! 4. Any mismatch fails the whole parse
//!
//! ## ⚠️ Important Note for Next Developer
//! - Encode and decode of a layout MUST mirror each other exactly
//! - Absent strings go out as "" (never omitted)
//! - Decoded strings are owned copies; messages may outlive the wire message
//!
//! ## Last Modified
//! v0.1.0 - Initial codec implementation

use tracing::{debug, trace};

use resproto_common::types::{RecordMode, ResourceMask};
use resproto_transport::error::TransportError;
use resproto_transport::wire::{ArgReader, WireArg, WireMessage};

use crate::error::{CoreError, Result};
use crate::protocol::messages::{
    AudioMsg, AudioProperty, MatchMethod, MatchRule, Message, MessageType, NotifyMsg,
    PossessMsg, RecordMsg, ResourceSpec, StatusMsg, VideoMsg,
};

// ============================================
// Route
// ============================================

/// Where a composed method call is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route<'a> {
    /// Bus name of the receiver.
    pub destination: &'a str,
    /// Object path.
    pub path: &'a str,
    /// Interface name.
    pub interface: &'a str,
    /// Method name.
    pub method: &'a str,
}

impl<'a> Route<'a> {
    /// Creates a route.
    #[must_use]
    pub const fn new(destination: &'a str, path: &'a str, interface: &'a str, method: &'a str) -> Self {
        Self {
            destination,
            path,
            interface,
            method,
        }
    }

    /// Creates a route whose method is the bus name of `msg_type`.
    #[must_use]
    pub const fn for_type(
        destination: &'a str,
        path: &'a str,
        interface: &'a str,
        msg_type: MessageType,
    ) -> Self {
        Self::new(destination, path, interface, msg_type.method_name())
    }

    fn check(&self) -> Result<()> {
        let fields = [
            ("destination", self.destination),
            ("path", self.path),
            ("interface", self.interface),
            ("method", self.method),
        ];
        match fields.iter().find(|(_, value)| value.is_empty()) {
            Some((field, _)) => Err(CoreError::MissingRouting { field: *field }),
            None => Ok(()),
        }
    }
}

// ============================================
// Codec Trait
// ============================================

/// Trait for encoding and decoding one payload layout.
///
/// The discriminant is handled by the caller; implementations only deal
/// with the fields that follow it.
///
/// # Type Parameters
/// * `T` - The payload type to encode/decode
pub trait Codec<T> {
    /// Appends the payload fields to `args`, in wire order.
    fn encode(&self, msg: &T, args: &mut Vec<WireArg>);

    /// Reads the payload fields from `reader`, in wire order.
    ///
    /// # Errors
    /// Returns the first argument read failure.
    fn decode(&self, reader: &mut ArgReader<'_>) -> std::result::Result<T, TransportError>;
}

// ============================================
// MessageCodec
// ============================================

/// Codec implementation for all protocol messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageCodec;

impl MessageCodec {
    /// Creates a new message codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Builds a method call carrying `msg`, addressed to `route`.
    ///
    /// # Errors
    /// - `MissingRouting` if a route field is empty
    /// - `NotComposable` for status messages, which only travel as replies
    /// - `Encoding` if the transport rejects the header or the body
    pub fn compose(&self, route: &Route<'_>, msg: &Message) -> Result<WireMessage> {
        route.check()?;

        let msg_type = msg.message_type();
        if msg_type == MessageType::Status {
            return Err(CoreError::NotComposable(msg_type));
        }

        let mut call = WireMessage::new_method_call(
            route.destination,
            route.path,
            route.interface,
            route.method,
        )
        .map_err(CoreError::encoding)?;

        call.append(self.encode_message(msg))
            .map_err(CoreError::encoding)?;

        debug!(
            msg_type = %msg_type,
            id = msg.id(),
            reqno = msg.reqno(),
            destination = route.destination,
            "Composed message"
        );
        Ok(call)
    }

    /// Builds a method return answering `original` with a status message.
    ///
    /// # Errors
    /// - `NotAStatus` if `status` is not a status message
    /// - `Encoding` if the transport rejects the body
    pub fn compose_reply(&self, original: &WireMessage, status: &Message) -> Result<WireMessage> {
        let msg_type = status.message_type();
        if msg_type != MessageType::Status {
            return Err(CoreError::NotAStatus(msg_type));
        }

        let mut reply = WireMessage::new_method_return(original);
        reply
            .append(self.encode_message(status))
            .map_err(CoreError::encoding)?;

        debug!(
            id = status.id(),
            reqno = status.reqno(),
            reply_serial = original.serial(),
            "Composed reply"
        );
        Ok(reply)
    }

    /// Parses a wire message into a newly built message.
    ///
    /// # Errors
    /// - `UnknownMessageType` if the discriminant is outside the enumeration
    /// - `Decoding` if the body does not match the layout
    pub fn parse(&self, wire: &WireMessage) -> Result<Message> {
        let mut reader = wire.reader();
        let msg_type = read_discriminant(&mut reader)?;

        let msg = self
            .decode_payload(msg_type, &mut reader)
            .map_err(|e| CoreError::decoding(msg_type.as_str(), e))?;

        debug!(
            msg_type = %msg_type,
            id = msg.id(),
            reqno = msg.reqno(),
            serial = wire.serial(),
            "Parsed message"
        );
        Ok(msg)
    }

    /// Parses a wire message into a caller-owned message.
    ///
    /// `out` is only written on success.
    ///
    /// # Errors
    /// Same as [`MessageCodec::parse`].
    pub fn parse_into(&self, wire: &WireMessage, out: &mut Message) -> Result<()> {
        *out = self.parse(wire)?;
        Ok(())
    }

    /// Parses a wire message that may be absent.
    ///
    /// # Errors
    /// `MissingMessage` if `wire` is `None`, otherwise as [`MessageCodec::parse`].
    pub fn parse_optional(&self, wire: Option<&WireMessage>) -> Result<Message> {
        let wire = wire.ok_or(CoreError::MissingMessage)?;
        self.parse(wire)
    }

    /// Identifies the message type without decoding the rest of the body.
    ///
    /// # Errors
    /// - `Decoding` if the body does not start with an i32
    /// - `UnknownMessageType` if the discriminant is outside the enumeration
    pub fn peek_message_type(wire: &WireMessage) -> Result<MessageType> {
        read_discriminant(&mut wire.reader())
    }

    fn encode_message(&self, msg: &Message) -> Vec<WireArg> {
        let mut args = vec![WireArg::Int32(msg.message_type().as_i32())];
        match msg {
            Message::Register(m) | Message::Update(m) => self.encode(m, &mut args),
            Message::Unregister(m) | Message::Acquire(m) | Message::Release(m) => {
                self.encode(m, &mut args);
            }
            Message::Grant(m) | Message::Advice(m) => self.encode(m, &mut args),
            Message::Audio(m) => self.encode(m, &mut args),
            Message::Video(m) => self.encode(m, &mut args),
            Message::Status(m) => self.encode(m, &mut args),
        }
        trace!(count = args.len(), "Encoded message arguments");
        args
    }

    fn decode_payload(
        &self,
        msg_type: MessageType,
        reader: &mut ArgReader<'_>,
    ) -> std::result::Result<Message, TransportError> {
        Ok(match msg_type {
            MessageType::Register => Message::Register(self.decode(reader)?),
            MessageType::Update => Message::Update(self.decode(reader)?),
            MessageType::Unregister => Message::Unregister(self.decode(reader)?),
            MessageType::Acquire => Message::Acquire(self.decode(reader)?),
            MessageType::Release => Message::Release(self.decode(reader)?),
            MessageType::Grant => Message::Grant(self.decode(reader)?),
            MessageType::Advice => Message::Advice(self.decode(reader)?),
            MessageType::Audio => Message::Audio(self.decode(reader)?),
            MessageType::Video => Message::Video(self.decode(reader)?),
            MessageType::Status => Message::Status(self.decode(reader)?),
        })
    }
}

fn read_discriminant(reader: &mut ArgReader<'_>) -> Result<MessageType> {
    let raw = reader
        .read_i32()
        .map_err(|e| CoreError::decoding("discriminant", e))?;
    MessageType::from_i32(raw).ok_or(CoreError::UnknownMessageType(raw))
}

/// Absent strings travel as "".
fn text(value: &Option<String>) -> WireArg {
    WireArg::Str(value.clone().unwrap_or_default())
}

fn read_text(reader: &mut ArgReader<'_>) -> std::result::Result<Option<String>, TransportError> {
    reader.read_str().map(|s| Some(s.to_owned()))
}

// ============================================
// Record Codec (register, update)
// ============================================

impl Codec<RecordMsg> for MessageCodec {
    fn encode(&self, msg: &RecordMsg, args: &mut Vec<WireArg>) {
        args.extend([
            WireArg::Uint32(msg.id),
            WireArg::Uint32(msg.reqno),
            WireArg::Uint32(msg.rset.all.bits()),
            WireArg::Uint32(msg.rset.opt.bits()),
            WireArg::Uint32(msg.rset.share.bits()),
            WireArg::Uint32(msg.rset.mask.bits()),
            text(&msg.class),
            WireArg::Uint32(msg.mode.bits()),
        ]);
    }

    fn decode(&self, reader: &mut ArgReader<'_>) -> std::result::Result<RecordMsg, TransportError> {
        let id = reader.read_u32()?;
        let reqno = reader.read_u32()?;
        let rset = ResourceSpec {
            all: ResourceMask::from_bits_retain(reader.read_u32()?),
            opt: ResourceMask::from_bits_retain(reader.read_u32()?),
            share: ResourceMask::from_bits_retain(reader.read_u32()?),
            mask: ResourceMask::from_bits_retain(reader.read_u32()?),
        };
        let class = read_text(reader)?;
        let mode = RecordMode::from_bits_retain(reader.read_u32()?);

        Ok(RecordMsg {
            id,
            reqno,
            rset,
            class,
            mode,
        })
    }
}

// ============================================
// Possess Codec (unregister, acquire, release)
// ============================================

impl Codec<PossessMsg> for MessageCodec {
    fn encode(&self, msg: &PossessMsg, args: &mut Vec<WireArg>) {
        args.extend([WireArg::Uint32(msg.id), WireArg::Uint32(msg.reqno)]);
    }

    fn decode(&self, reader: &mut ArgReader<'_>) -> std::result::Result<PossessMsg, TransportError> {
        Ok(PossessMsg {
            id: reader.read_u32()?,
            reqno: reader.read_u32()?,
        })
    }
}

// ============================================
// Notify Codec (grant, advice)
// ============================================

impl Codec<NotifyMsg> for MessageCodec {
    fn encode(&self, msg: &NotifyMsg, args: &mut Vec<WireArg>) {
        args.extend([
            WireArg::Uint32(msg.id),
            WireArg::Uint32(msg.reqno),
            WireArg::Uint32(msg.resources.bits()),
        ]);
    }

    fn decode(&self, reader: &mut ArgReader<'_>) -> std::result::Result<NotifyMsg, TransportError> {
        Ok(NotifyMsg {
            id: reader.read_u32()?,
            reqno: reader.read_u32()?,
            resources: ResourceMask::from_bits_retain(reader.read_u32()?),
        })
    }
}

// ============================================
// Audio Codec
// ============================================

impl Codec<AudioMsg> for MessageCodec {
    fn encode(&self, msg: &AudioMsg, args: &mut Vec<WireArg>) {
        args.extend([
            WireArg::Uint32(msg.id),
            WireArg::Uint32(msg.reqno),
            text(&msg.group),
            WireArg::Uint32(msg.pid),
            text(&msg.property.name),
            WireArg::Int32(msg.property.matching.method.0),
            text(&msg.property.matching.pattern),
        ]);
    }

    fn decode(&self, reader: &mut ArgReader<'_>) -> std::result::Result<AudioMsg, TransportError> {
        let id = reader.read_u32()?;
        let reqno = reader.read_u32()?;
        let group = read_text(reader)?;
        let pid = reader.read_u32()?;
        let name = read_text(reader)?;
        let method = MatchMethod(reader.read_i32()?);
        let pattern = read_text(reader)?;

        Ok(AudioMsg {
            id,
            reqno,
            group,
            pid,
            property: AudioProperty {
                name,
                matching: MatchRule { method, pattern },
            },
        })
    }
}

// ============================================
// Video Codec
// ============================================

impl Codec<VideoMsg> for MessageCodec {
    fn encode(&self, msg: &VideoMsg, args: &mut Vec<WireArg>) {
        args.extend([
            WireArg::Uint32(msg.id),
            WireArg::Uint32(msg.reqno),
            WireArg::Uint32(msg.pid),
        ]);
    }

    fn decode(&self, reader: &mut ArgReader<'_>) -> std::result::Result<VideoMsg, TransportError> {
        Ok(VideoMsg {
            id: reader.read_u32()?,
            reqno: reader.read_u32()?,
            pid: reader.read_u32()?,
        })
    }
}

// ============================================
// Status Codec
// ============================================

impl Codec<StatusMsg> for MessageCodec {
    fn encode(&self, msg: &StatusMsg, args: &mut Vec<WireArg>) {
        args.extend([
            WireArg::Uint32(msg.id),
            WireArg::Uint32(msg.reqno),
            WireArg::Int32(msg.errcode),
            text(&msg.errmsg),
        ]);
    }

    fn decode(&self, reader: &mut ArgReader<'_>) -> std::result::Result<StatusMsg, TransportError> {
        Ok(StatusMsg {
            id: reader.read_u32()?,
            reqno: reader.read_u32()?,
            errcode: reader.read_i32()?,
            errmsg: read_text(reader)?,
        })
    }
}

// ============================================
// Convenience Functions
// ============================================

/// Composes `msg` as a method call to `route`.
///
/// # Errors
/// See [`MessageCodec::compose`].
pub fn compose_message(route: &Route<'_>, msg: &Message) -> Result<WireMessage> {
    MessageCodec.compose(route, msg)
}

/// Composes a status reply to `original`.
///
/// # Errors
/// See [`MessageCodec::compose_reply`].
pub fn reply_message(original: &WireMessage, status: &Message) -> Result<WireMessage> {
    MessageCodec.compose_reply(original, status)
}

/// Parses a wire message.
///
/// # Errors
/// See [`MessageCodec::parse`].
pub fn parse_message(wire: &WireMessage) -> Result<Message> {
    MessageCodec.parse(wire)
}

// ============================================
// Tests
// ============================================
