// ============================================
// File: crates/resproto-transport/src/marshal.rs
// ============================================
//! # Wire Message Framing
//!
//! ## Creation Reason
//! Lets a byte-stream carrier move [`WireMessage`]s: each message is
//! written as one self-delimiting frame and read back with full
//! validation.
//!
//! ## Frame Layout (Little Endian)
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ endian 'l' (1) │ kind (1) │ flags (1) │ ver (1)│
//! ├───────────────────────────────────────────────┤
//! │ body_len (4)                                  │
//! │ serial (4)                                    │
//! │ reply_serial (4, 0 = none)                    │
//! │ fields_len (4)                                │
//! ├───────────────────────────────────────────────┤
//! │ header fields: [code (1) │ len (4) │ utf8 │ 0]*│
//! ├───────────────────────────────────────────────┤
//! │ padding to 8                                  │
//! ├───────────────────────────────────────────────┤
//! │ body: args aligned to 4                       │
//! │   i/u: 4 bytes                                │
//! │   s:   len (4) │ utf8 │ 0                     │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! The body signature travels as header field 8; the body is
//! meaningless without it.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Check lengths before every read; frames come from other processes
//! - Padding bytes must be zero; anything else is rejected
//!
//! ## Last Modified
//! v0.1.0 - Initial framing

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, TransportError};
use crate::wire::{MessageKind, WireArg, WireMessage, WireParts, WireType, MAX_BODY_SIZE};

// ============================================
// Constants
// ============================================

/// Size of the fixed frame header.
pub const FIXED_HEADER_SIZE: usize = 20;

/// Maximum size of the header field block.
pub const MAX_FIELDS_SIZE: usize = 64 * 1024;

/// Framing protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

const LITTLE_ENDIAN: u8 = b'l';

const FIELD_PATH: u8 = 1;
const FIELD_INTERFACE: u8 = 2;
const FIELD_MEMBER: u8 = 3;
const FIELD_DESTINATION: u8 = 6;
const FIELD_SENDER: u8 = 7;
const FIELD_SIGNATURE: u8 = 8;

const fn align(offset: usize, to: usize) -> usize {
    (offset + to - 1) & !(to - 1)
}

// ============================================
// Encoding
// ============================================

/// Encodes a wire message into a single frame.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode(msg: &WireMessage) -> BytesMut {
    let mut fields = BytesMut::new();
    let header_fields = [
        (FIELD_PATH, msg.path()),
        (FIELD_INTERFACE, msg.interface()),
        (FIELD_MEMBER, msg.member()),
        (FIELD_DESTINATION, msg.destination()),
        (FIELD_SENDER, msg.sender()),
    ];
    for (code, value) in header_fields {
        if let Some(value) = value {
            put_field(&mut fields, code, value);
        }
    }
    put_field(&mut fields, FIELD_SIGNATURE, &msg.signature());

    let mut body = BytesMut::new();
    for arg in msg.args() {
        let target = align(body.len(), 4);
        put_padding(&mut body, target);
        match arg {
            WireArg::Int32(v) => body.put_i32_le(*v),
            WireArg::Uint32(v) => body.put_u32_le(*v),
            WireArg::Str(s) => put_string(&mut body, s),
        }
    }

    let mut buf = BytesMut::with_capacity(
        align(FIXED_HEADER_SIZE + fields.len(), 8) + body.len(),
    );
    buf.put_u8(LITTLE_ENDIAN);
    buf.put_u8(msg.kind().as_byte());
    buf.put_u8(0);
    buf.put_u8(PROTOCOL_VERSION);
    buf.put_u32_le(body.len() as u32);
    buf.put_u32_le(msg.serial());
    buf.put_u32_le(msg.reply_serial().unwrap_or(0));
    buf.put_u32_le(fields.len() as u32);
    buf.put_slice(&fields);
    let target = align(buf.len(), 8);
    put_padding(&mut buf, target);
    buf.put_slice(&body);
    buf
}

fn put_field(buf: &mut BytesMut, code: u8, value: &str) {
    buf.put_u8(code);
    put_string(buf, value);
}

#[allow(clippy::cast_possible_truncation)]
fn put_string(buf: &mut BytesMut, value: &str) {
    buf.put_u32_le(value.len() as u32);
    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
}

fn put_padding(buf: &mut BytesMut, target: usize) {
    while buf.len() < target {
        buf.put_u8(0);
    }
}

// ============================================
// Frame Detection
// ============================================

/// Checks whether `buf` starts with a complete frame.
///
/// # Returns
/// - `Ok(Some(len))` - Complete frame of `len` bytes
/// - `Ok(None)` - Incomplete frame, need more data
/// - `Err(_)` - The fixed header is invalid or claims more than
///   [`MAX_FIELDS_SIZE`] / [`MAX_BODY_SIZE`] bytes
pub fn frame_len(buf: &[u8]) -> Result<Option<usize>> {
    if buf.len() < FIXED_HEADER_SIZE {
        return Ok(None);
    }

    let header = parse_fixed_header(buf)?;
    let total = header.total_len()?;

    if buf.len() >= total {
        Ok(Some(total))
    } else {
        Ok(None)
    }
}

struct FixedHeader {
    kind: MessageKind,
    body_len: usize,
    serial: u32,
    reply_serial: u32,
    fields_len: usize,
}

impl FixedHeader {
    fn body_offset(&self) -> usize {
        align(FIXED_HEADER_SIZE + self.fields_len, 8)
    }

    fn total_len(&self) -> Result<usize> {
        if self.fields_len > MAX_FIELDS_SIZE {
            return Err(TransportError::malformed(format!(
                "header fields too large: max {MAX_FIELDS_SIZE} bytes, got {}",
                self.fields_len
            )));
        }
        if self.body_len > MAX_BODY_SIZE {
            return Err(TransportError::BodyTooLarge {
                max: MAX_BODY_SIZE,
                actual: self.body_len,
            });
        }
        Ok(self.body_offset() + self.body_len)
    }
}

fn parse_fixed_header(buf: &[u8]) -> Result<FixedHeader> {
    let mut cur = buf;
    if cur.remaining() < FIXED_HEADER_SIZE {
        return Err(TransportError::too_short(FIXED_HEADER_SIZE, cur.remaining()));
    }

    let endian = cur.get_u8();
    if endian != LITTLE_ENDIAN {
        return Err(TransportError::malformed(format!(
            "unsupported endianness marker 0x{endian:02x}"
        )));
    }

    let kind_byte = cur.get_u8();
    let kind = MessageKind::from_byte(kind_byte)
        .ok_or_else(|| TransportError::malformed(format!("unknown message kind {kind_byte}")))?;

    let _flags = cur.get_u8();
    let version = cur.get_u8();
    if version != PROTOCOL_VERSION {
        return Err(TransportError::malformed(format!(
            "unsupported framing version {version}"
        )));
    }

    Ok(FixedHeader {
        kind,
        body_len: cur.get_u32_le() as usize,
        serial: cur.get_u32_le(),
        reply_serial: cur.get_u32_le(),
        fields_len: cur.get_u32_le() as usize,
    })
}

// ============================================
// Decoding
// ============================================

/// Decodes exactly one frame into a wire message.
///
/// # Errors
/// Returns error if the frame is truncated, has trailing bytes, or any
/// header field, signature or body argument is malformed.
pub fn decode(buf: &[u8]) -> Result<WireMessage> {
    let header = parse_fixed_header(buf)?;
    let total = header.total_len()?;

    if buf.len() < total {
        return Err(TransportError::too_short(total, buf.len()));
    }
    if buf.len() > total {
        return Err(TransportError::malformed(format!(
            "{} trailing bytes after frame",
            buf.len() - total
        )));
    }

    let mut parts = WireParts {
        kind: header.kind,
        serial: header.serial,
        reply_serial: (header.reply_serial != 0).then_some(header.reply_serial),
        ..WireParts::default()
    };

    let fields_end = FIXED_HEADER_SIZE + header.fields_len;
    let body_offset = header.body_offset();
    let mut signature = None;

    let mut fields = &buf[FIXED_HEADER_SIZE..fields_end];
    while fields.has_remaining() {
        let code = fields.get_u8();
        let value = get_string(&mut fields)?;
        match code {
            FIELD_PATH => parts.path = Some(value),
            FIELD_INTERFACE => parts.interface = Some(value),
            FIELD_MEMBER => parts.member = Some(value),
            FIELD_DESTINATION => parts.destination = Some(value),
            FIELD_SENDER => parts.sender = Some(value),
            FIELD_SIGNATURE => signature = Some(value),
            other => {
                return Err(TransportError::malformed(format!(
                    "unknown header field code {other}"
                )))
            }
        }
    }

    check_padding(&buf[fields_end..body_offset])?;

    let signature = signature.unwrap_or_default();
    parts.args = decode_body(&buf[body_offset..], &signature)?;

    Ok(WireMessage::from_parts(parts))
}

fn decode_body(body: &[u8], signature: &str) -> Result<Vec<WireArg>> {
    let mut cur = body;
    let mut args = Vec::with_capacity(signature.len());

    for code in signature.chars() {
        let wire_type = WireType::from_code(code).ok_or_else(|| {
            TransportError::malformed(format!("unsupported signature code '{code}'"))
        })?;

        let offset = body.len() - cur.remaining();
        let pad = align(offset, 4) - offset;
        if cur.remaining() < pad {
            return Err(TransportError::too_short(offset + pad, body.len()));
        }
        check_padding(&cur[..pad])?;
        cur.advance(pad);

        let arg = match wire_type {
            WireType::Int32 => WireArg::Int32(get_u32(&mut cur)? as i32),
            WireType::Uint32 => WireArg::Uint32(get_u32(&mut cur)?),
            WireType::String => WireArg::Str(get_string(&mut cur)?),
        };
        args.push(arg);
    }

    if cur.has_remaining() {
        return Err(TransportError::malformed(format!(
            "{} body bytes not covered by signature '{signature}'",
            cur.remaining()
        )));
    }

    Ok(args)
}

fn get_u32(cur: &mut &[u8]) -> Result<u32> {
    if cur.remaining() < 4 {
        return Err(TransportError::too_short(4, cur.remaining()));
    }
    Ok(cur.get_u32_le())
}

fn get_string(cur: &mut &[u8]) -> Result<String> {
    let len = get_u32(cur)? as usize;
    if cur.remaining() < len + 1 {
        return Err(TransportError::too_short(len + 1, cur.remaining()));
    }

    let bytes = &cur[..len];
    if cur[len] != 0 {
        return Err(TransportError::malformed("string is not NUL-terminated"));
    }
    if bytes.contains(&0) {
        return Err(TransportError::malformed("string contains a NUL byte"));
    }
    let value = std::str::from_utf8(bytes)
        .map_err(|e| TransportError::malformed(format!("string is not UTF-8: {e}")))?
        .to_owned();

    cur.advance(len + 1);
    Ok(value)
}

fn check_padding(pad: &[u8]) -> Result<()> {
    if pad.iter().any(|&b| b != 0) {
        return Err(TransportError::malformed("non-zero padding"));
    }
    Ok(())
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_call() -> WireMessage {
        let mut msg = WireMessage::new_method_call(
            "org.maemo.resource.manager",
            "/org/maemo/resource/manager",
            "org.maemo.resource.manager",
            "register",
        )
        .unwrap();
        msg.append([
            WireArg::Int32(0),
            WireArg::Uint32(1),
            WireArg::Uint32(2),
            WireArg::Str("player".into()),
            WireArg::Uint32(3),
        ])
        .unwrap();
        msg.set_serial(5);
        msg.set_sender(":1.42");
        msg
    }

    #[test]
    fn test_call_roundtrip() {
        let original = sample_call();
        let frame = encode(&original);
        let decoded = decode(&frame).unwrap();

        assert_eq!(decoded, original);
        assert_eq!(decoded.signature(), "iuusu");
    }

    #[test]
    fn test_reply_roundtrip() {
        let original = sample_call();
        let mut reply = WireMessage::new_method_return(&original);
        reply
            .append([WireArg::Int32(9), WireArg::Str(String::new())])
            .unwrap();

        let decoded = decode(&encode(&reply)).unwrap();
        assert!(decoded.is_reply());
        assert_eq!(decoded.reply_serial(), Some(5));
        assert_eq!(decoded.destination(), Some(":1.42"));
        assert_eq!(decoded.path(), None);
        assert_eq!(decoded.args(), reply.args());
    }

    #[test]
    fn test_body_alignment() {
        let frame = encode(&sample_call());
        assert_eq!(frame[0], b'l');

        let fields_len = u32::from_le_bytes(frame[16..20].try_into().unwrap()) as usize;
        let body_offset = align(FIXED_HEADER_SIZE + fields_len, 8);
        assert_eq!(body_offset % 8, 0);

        // "player" is 4 + 6 + 1 = 11 bytes starting at body offset 12,
        // so the trailing u32 is padded to offset 24.
        let body = &frame[body_offset..];
        assert_eq!(&body[12..16], &6u32.to_le_bytes());
        assert_eq!(&body[16..22], b"player");
        assert_eq!(&body[24..28], &3u32.to_le_bytes());
    }

    #[test]
    fn test_frame_len() {
        let frame = encode(&sample_call());

        assert_eq!(frame_len(&[]).unwrap(), None);
        assert_eq!(frame_len(&frame[..10]).unwrap(), None);
        assert_eq!(frame_len(&frame[..frame.len() - 1]).unwrap(), None);
        assert_eq!(frame_len(&frame).unwrap(), Some(frame.len()));

        let mut two = frame.to_vec();
        two.extend_from_slice(&frame);
        assert_eq!(frame_len(&two).unwrap(), Some(frame.len()));
    }

    #[test]
    fn test_decode_truncated() {
        let frame = encode(&sample_call());
        let result = decode(&frame[..frame.len() - 3]);
        assert!(matches!(result, Err(TransportError::FrameTooShort { .. })));
    }

    #[test]
    fn test_decode_rejects_corruption() {
        let frame = encode(&sample_call());

        let mut bad_endian = frame.to_vec();
        bad_endian[0] = b'B';
        assert!(decode(&bad_endian).is_err());

        let mut bad_kind = frame.to_vec();
        bad_kind[1] = 9;
        assert!(decode(&bad_kind).is_err());

        let mut trailing = frame.to_vec();
        trailing.push(0);
        assert!(decode(&trailing).is_err());

        // Flip the NUL terminator of the last header field.
        let fields_len = u32::from_le_bytes(frame[16..20].try_into().unwrap()) as usize;
        let mut bad_nul = frame.to_vec();
        bad_nul[FIXED_HEADER_SIZE + fields_len - 1] = b'x';
        assert!(decode(&bad_nul).is_err());
    }

    #[test]
    fn test_decode_rejects_oversized_body() {
        let mut frame = encode(&sample_call()).to_vec();
        frame[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            frame_len(&frame),
            Err(TransportError::BodyTooLarge { .. })
        ));
    }

    #[test]
    fn test_frame_len_rejects_oversized_fields() {
        // A bare fixed header claiming a huge field block must fail up
        // front instead of asking the reader to keep buffering.
        let mut header = encode(&sample_call())[..FIXED_HEADER_SIZE].to_vec();
        header[16..20].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            frame_len(&header),
            Err(TransportError::MalformedFrame { .. })
        ));

        let limit = u32::try_from(MAX_FIELDS_SIZE + 1).unwrap();
        header[16..20].copy_from_slice(&limit.to_le_bytes());
        assert!(frame_len(&header).is_err());
        assert!(decode(&header).is_err());
    }

    #[test]
    fn test_padding_between_mixed_args() {
        let mut msg = sample_call();
        msg.append([WireArg::Str("é".into()), WireArg::Int32(i32::MIN)])
            .unwrap();

        let frame = encode(&msg);
        assert_eq!(frame_len(&frame).unwrap(), Some(frame.len()));
        assert_eq!(decode(&frame).unwrap(), msg);
    }
}
