// ============================================
// File: crates/resproto-core/src/protocol/messages.rs
// ============================================
//! # Protocol Message Definitions
//!
//! ## Creation Reason
//! Defines every message exchanged between applications and the resource
//! policy manager, as one closed enumeration with a payload per layout.
//!
//! ## Main Functionality
//! - `MessageType`: The wire discriminant
//! - `Message`: Tagged union over all message kinds
//! - Payloads: `RecordMsg`, `PossessMsg`, `NotifyMsg`, `AudioMsg`,
//!   `VideoMsg`, `StatusMsg`
//!
//! ## Layouts
//! | Layout | Types | Signature |
//! |--------|-------|-----------|
//! | Record | register, update | `iuuuuuusu` |
//! | Possess | unregister, acquire, release | `iuu` |
//! | Notify | grant, advice | `iuuu` |
//! | Audio | audio | `iuususis` |
//! | Video | video | `iuuu` |
//! | Status | status | `iuuis` |
//!
//! ## ⚠️ Important Note for Next Developer
//! - Discriminant values are shared with peers - DO NOT renumber
//! - Field order is the wire contract; there is no schema on the wire
//! - Optional strings are sent as "" and come back as `Some("")`
//!
//! ## Last Modified
//! v0.1.0 - Initial message definitions

use std::fmt;

use serde::{Deserialize, Serialize};

use resproto_common::types::{RecordMode, ResourceMask};

// ============================================
// MessageType
// ============================================

/// Number of message types in the closed enumeration.
pub const MESSAGE_TYPE_COUNT: usize = 10;

/// Protocol message discriminant.
///
/// # Values
/// | Value | Type |
/// |-------|------|
/// | 0 | Register |
/// | 1 | Unregister |
/// | 2 | Update |
/// | 3 | Acquire |
/// | 4 | Release |
/// | 5 | Grant |
/// | 6 | Advice |
/// | 7 | Audio |
/// | 8 | Video |
/// | 9 | Status |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum MessageType {
    /// Declare a new resource set.
    Register = 0,
    /// Withdraw a resource set.
    Unregister = 1,
    /// Change a registered resource set.
    Update = 2,
    /// Ask for the resources of a set.
    Acquire = 3,
    /// Give the resources of a set back.
    Release = 4,
    /// Manager grants resources.
    Grant = 5,
    /// Manager advises which resources would be available.
    Advice = 6,
    /// Audio stream classification.
    Audio = 7,
    /// Video stream identification.
    Video = 8,
    /// Outcome of an earlier request.
    Status = 9,
}

impl MessageType {
    /// Every message type, in discriminant order.
    pub const ALL: [Self; MESSAGE_TYPE_COUNT] = [
        Self::Register,
        Self::Unregister,
        Self::Update,
        Self::Acquire,
        Self::Release,
        Self::Grant,
        Self::Advice,
        Self::Audio,
        Self::Video,
        Self::Status,
    ];

    /// Converts a raw discriminant to a `MessageType`.
    ///
    /// # Returns
    /// `None` if the value is outside the enumeration.
    #[must_use]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Register),
            1 => Some(Self::Unregister),
            2 => Some(Self::Update),
            3 => Some(Self::Acquire),
            4 => Some(Self::Release),
            5 => Some(Self::Grant),
            6 => Some(Self::Advice),
            7 => Some(Self::Audio),
            8 => Some(Self::Video),
            9 => Some(Self::Status),
            _ => None,
        }
    }

    /// Returns the raw discriminant.
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Returns the position of this type in per-type tables.
    #[must_use]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Returns the lowercase type name, also used as the bus method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Unregister => "unregister",
            Self::Update => "update",
            Self::Acquire => "acquire",
            Self::Release => "release",
            Self::Grant => "grant",
            Self::Advice => "advice",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Status => "status",
        }
    }

    /// Returns the bus member name used when sending this type.
    #[must_use]
    pub const fn method_name(&self) -> &'static str {
        self.as_str()
    }

    /// Returns the field layout this type uses on the wire.
    #[must_use]
    pub const fn layout(&self) -> Layout {
        match self {
            Self::Register | Self::Update => Layout::Record,
            Self::Unregister | Self::Acquire | Self::Release => Layout::Possess,
            Self::Grant | Self::Advice => Layout::Notify,
            Self::Audio => Layout::Audio,
            Self::Video => Layout::Video,
            Self::Status => Layout::Status,
        }
    }

    /// Returns `true` for the types that open or close a registration.
    #[must_use]
    pub const fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Register | Self::Unregister)
    }
}

impl TryFrom<i32> for MessageType {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_i32(value).ok_or(value)
    }
}

impl From<MessageType> for i32 {
    fn from(msg_type: MessageType) -> Self {
        msg_type.as_i32()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Layout
// ============================================

/// Field layout shared by one or more message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// type, id, reqno, all, opt, share, mask, class, mode
    Record,
    /// type, id, reqno
    Possess,
    /// type, id, reqno, resources
    Notify,
    /// type, id, reqno, group, pid, name, method, pattern
    Audio,
    /// type, id, reqno, pid
    Video,
    /// type, id, reqno, errcode, errmsg
    Status,
}

impl Layout {
    /// Returns the wire signature of this layout.
    #[must_use]
    pub const fn signature(&self) -> &'static str {
        match self {
            Self::Record => "iuuuuuusu",
            Self::Possess => "iuu",
            Self::Notify => "iuuu",
            Self::Audio => "iuususis",
            Self::Video => "iuuu",
            Self::Status => "iuuis",
        }
    }
}

// ============================================
// Payloads
// ============================================

/// The four resource masks of a resource set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Every resource the set may use.
    pub all: ResourceMask,
    /// The optional subset of `all`.
    pub opt: ResourceMask,
    /// Resources the set is willing to share.
    pub share: ResourceMask,
    /// Resources whose grant state the application wants to follow.
    pub mask: ResourceMask,
}

/// Register/update payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordMsg {
    /// Resource set identifier.
    pub id: u32,
    /// Request number.
    pub reqno: u32,
    /// Requested resources.
    pub rset: ResourceSpec,
    /// Application class (e.g. "player", "call").
    pub class: Option<String>,
    /// Mode flags.
    pub mode: RecordMode,
}

/// Unregister/acquire/release payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PossessMsg {
    /// Resource set identifier.
    pub id: u32,
    /// Request number.
    pub reqno: u32,
}

/// Grant/advice payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotifyMsg {
    /// Resource set identifier.
    pub id: u32,
    /// Request number.
    pub reqno: u32,
    /// Granted or advised resources.
    pub resources: ResourceMask,
}

/// How an audio property value is compared against its pattern.
///
/// Kept as the raw wire value; unknown methods pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchMethod(pub i32);

impl MatchMethod {
    /// Exact string equality.
    pub const EQUALS: Self = Self(0);
    /// Prefix match.
    pub const STARTS_WITH: Self = Self(1);
    /// Pattern match.
    pub const MATCHES: Self = Self(2);
}

/// Matching rule of an audio stream property.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchRule {
    /// Comparison method.
    pub method: MatchMethod,
    /// Pattern compared against the property value.
    pub pattern: Option<String>,
}

/// Audio stream property used to recognise the application's streams.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioProperty {
    /// Property name (e.g. "media.name").
    pub name: Option<String>,
    /// Matching rule.
    pub matching: MatchRule,
}

/// Audio stream classification payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioMsg {
    /// Resource set identifier.
    pub id: u32,
    /// Request number.
    pub reqno: u32,
    /// Audio group (e.g. "player").
    pub group: Option<String>,
    /// Process id owning the streams.
    pub pid: u32,
    /// Stream property and rule.
    pub property: AudioProperty,
}

/// Video stream identification payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoMsg {
    /// Resource set identifier.
    pub id: u32,
    /// Request number.
    pub reqno: u32,
    /// Process id owning the streams.
    pub pid: u32,
}

/// Status reply payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusMsg {
    /// Resource set identifier.
    pub id: u32,
    /// Request number of the request being answered.
    pub reqno: u32,
    /// 0 on success.
    pub errcode: i32,
    /// Human readable error.
    pub errmsg: Option<String>,
}

impl StatusMsg {
    /// Creates a success status for `reqno`.
    #[must_use]
    pub const fn ok(id: u32, reqno: u32) -> Self {
        Self {
            id,
            reqno,
            errcode: 0,
            errmsg: None,
        }
    }

    /// Returns `true` if the request succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.errcode == 0
    }
}

// ============================================
// Message
// ============================================

/// A protocol message: discriminant plus the payload of its layout.
///
/// # Example
/// ```
/// use resproto_core::protocol::messages::{Message, MessageType, PossessMsg};
///
/// let msg = Message::Acquire(PossessMsg { id: 1, reqno: 7 });
/// assert_eq!(msg.message_type(), MessageType::Acquire);
/// assert_eq!(msg.reqno(), 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Declare a new resource set.
    Register(RecordMsg),
    /// Withdraw a resource set.
    Unregister(PossessMsg),
    /// Change a registered resource set.
    Update(RecordMsg),
    /// Ask for the resources of a set.
    Acquire(PossessMsg),
    /// Give the resources of a set back.
    Release(PossessMsg),
    /// Manager grants resources.
    Grant(NotifyMsg),
    /// Manager advises which resources would be available.
    Advice(NotifyMsg),
    /// Audio stream classification.
    Audio(AudioMsg),
    /// Video stream identification.
    Video(VideoMsg),
    /// Outcome of an earlier request.
    Status(StatusMsg),
}

impl Message {
    /// Returns the discriminant.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::Register(_) => MessageType::Register,
            Self::Unregister(_) => MessageType::Unregister,
            Self::Update(_) => MessageType::Update,
            Self::Acquire(_) => MessageType::Acquire,
            Self::Release(_) => MessageType::Release,
            Self::Grant(_) => MessageType::Grant,
            Self::Advice(_) => MessageType::Advice,
            Self::Audio(_) => MessageType::Audio,
            Self::Video(_) => MessageType::Video,
            Self::Status(_) => MessageType::Status,
        }
    }

    /// Returns the resource set identifier.
    #[must_use]
    pub const fn id(&self) -> u32 {
        match self {
            Self::Register(m) | Self::Update(m) => m.id,
            Self::Unregister(m) | Self::Acquire(m) | Self::Release(m) => m.id,
            Self::Grant(m) | Self::Advice(m) => m.id,
            Self::Audio(m) => m.id,
            Self::Video(m) => m.id,
            Self::Status(m) => m.id,
        }
    }

    /// Returns the request number.
    #[must_use]
    pub const fn reqno(&self) -> u32 {
        match self {
            Self::Register(m) | Self::Update(m) => m.reqno,
            Self::Unregister(m) | Self::Acquire(m) | Self::Release(m) => m.reqno,
            Self::Grant(m) | Self::Advice(m) => m.reqno,
            Self::Audio(m) => m.reqno,
            Self::Video(m) => m.reqno,
            Self::Status(m) => m.reqno,
        }
    }

    /// Sets the request number.
    pub fn set_reqno(&mut self, reqno: u32) {
        match self {
            Self::Register(m) | Self::Update(m) => m.reqno = reqno,
            Self::Unregister(m) | Self::Acquire(m) | Self::Release(m) => m.reqno = reqno,
            Self::Grant(m) | Self::Advice(m) => m.reqno = reqno,
            Self::Audio(m) => m.reqno = reqno,
            Self::Video(m) => m.reqno = reqno,
            Self::Status(m) => m.reqno = reqno,
        }
    }

    /// Returns the message as it reads back after a trip over the wire:
    /// every absent string becomes `Some("")`.
    #[must_use]
    pub fn normalized(&self) -> Self {
        fn fill(s: &Option<String>) -> Option<String> {
            Some(s.clone().unwrap_or_default())
        }

        let mut out = self.clone();
        match &mut out {
            Self::Register(m) | Self::Update(m) => m.class = fill(&m.class),
            Self::Audio(m) => {
                m.group = fill(&m.group);
                m.property.name = fill(&m.property.name);
                m.property.matching.pattern = fill(&m.property.matching.pattern);
            }
            Self::Status(m) => m.errmsg = fill(&m.errmsg),
            Self::Unregister(_)
            | Self::Acquire(_)
            | Self::Release(_)
            | Self::Grant(_)
            | Self::Advice(_)
            | Self::Video(_) => {}
        }
        out
    }

    /// Returns the status payload, if this is a status message.
    #[must_use]
    pub const fn as_status(&self) -> Option<&StatusMsg> {
        match self {
            Self::Status(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} id={} reqno={}", self.message_type(), self.id(), self.reqno())?;
        match self {
            Self::Register(m) | Self::Update(m) => write!(
                f,
                " all={} opt={} class={}",
                m.rset.all,
                m.rset.opt,
                m.class.as_deref().unwrap_or("<none>")
            ),
            Self::Grant(m) | Self::Advice(m) => write!(f, " resources={}", m.resources),
            Self::Audio(m) => write!(f, " pid={}", m.pid),
            Self::Video(m) => write!(f, " pid={}", m.pid),
            Self::Status(m) => write!(
                f,
                " errcode={} errmsg={}",
                m.errcode,
                m.errmsg.as_deref().unwrap_or("")
            ),
            Self::Unregister(_) | Self::Acquire(_) | Self::Release(_) => Ok(()),
        }
    }
}

// ============================================
// Tests
// ============================================
