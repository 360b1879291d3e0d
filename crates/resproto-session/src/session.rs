// ============================================
// File: crates/resproto-session/src/session.rs
// ============================================
//! # Protocol Session
//!
//! ## Creation Reason
//! Holds the per-connection protocol state: the role, which message types
//! that role may handle, the registered handlers, the request counter and
//! the replies still outstanding.
//!
//! ## Main Functionality
//! - `Session`: Handler table, validity table, pending replies
//! - `set_handler` / `set_handler_raw`: Handler registration gated by role
//! - `dispatch`: Parse an incoming wire message and route it
//! - `next_reqno`: Session-local request numbers
//!
//! ## Dispatch Flow
//! ```text
//! WireMessage ──► parse ──┬── status ──► pending[reqno]? ──► callback
//!                         │                  └─ none ──► Uncorrelated
//!                         │
//!                         └── other ──► valid for role? ──► handler?
//!                                           └─ no ──► gate error
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Handlers are invoked without any session lock held; they may register
//!   handlers or send messages themselves
//! - Status messages never reach handlers
//! - Pending replies are only tracked when a status callback was given
//!
//! ## Last Modified
//! v0.1.0 - Initial session implementation

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use resproto_common::types::Role;
use resproto_core::protocol::codec::MessageCodec;
use resproto_core::protocol::messages::{Message, MessageType, StatusMsg, MESSAGE_TYPE_COUNT};
use resproto_transport::traits::Connection;
use resproto_transport::wire::WireMessage;

use crate::backend::{BusBackend, ProtocolBackend};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::resource_set::ResourceSet;

// ============================================
// Handler Types
// ============================================

/// Receives the incoming messages of one type.
pub trait MessageHandler: Send + Sync {
    /// Handles `msg`. `context` allows answering it through
    /// [`ResourceSet::reply_message`].
    fn handle(&self, msg: &Message, context: &ReplyContext);
}

impl<F> MessageHandler for F
where
    F: Fn(&Message, &ReplyContext) + Send + Sync,
{
    fn handle(&self, msg: &Message, context: &ReplyContext) {
        self(msg, context);
    }
}

/// Invoked once with the status reply to a request.
pub type StatusCallback = Box<dyn FnOnce(&StatusMsg) + Send + Sync>;

/// The wire message a handler may answer.
#[derive(Debug, Clone)]
pub struct ReplyContext {
    wire: WireMessage,
}

impl ReplyContext {
    #[must_use]
    pub const fn new(wire: WireMessage) -> Self {
        Self { wire }
    }

    /// The message being answered.
    #[must_use]
    pub const fn wire(&self) -> &WireMessage {
        &self.wire
    }

    /// Bus name the reply goes to.
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.wire.sender()
    }
}

/// Outcome of [`Session::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A registered handler received the message.
    Handled(MessageType),
    /// The type is valid for the role but no handler is registered.
    Unhandled(MessageType),
    /// A status reply matched a pending request.
    Correlated {
        /// Request number of the answered request.
        reqno: u32,
    },
    /// A status reply matched nothing.
    Uncorrelated {
        /// Request number carried by the reply.
        reqno: u32,
    },
}

struct PendingReply {
    id: u32,
    msg_type: MessageType,
    callback: StatusCallback,
}

/// Returns `true` if `role` may receive (and register handlers for) `msg_type`.
#[must_use]
pub const fn role_accepts(role: Role, msg_type: MessageType) -> bool {
    match role {
        Role::Client => matches!(
            msg_type,
            MessageType::Unregister | MessageType::Grant | MessageType::Advice
        ),
        Role::Server => matches!(
            msg_type,
            MessageType::Register
                | MessageType::Unregister
                | MessageType::Update
                | MessageType::Acquire
                | MessageType::Release
                | MessageType::Audio
                | MessageType::Video
        ),
    }
}

// ============================================
// Session
// ============================================

/// One logical protocol connection.
///
/// # Thread Safety
/// All state is behind locks or atomics; a `Session` is shared as
/// `Arc<Session>` between its resource sets.
pub struct Session {
    role: Role,
    valid: [bool; MESSAGE_TYPE_COUNT],
    handlers: RwLock<[Option<Arc<dyn MessageHandler>>; MESSAGE_TYPE_COUNT]>,
    pending: DashMap<u32, PendingReply>,
    next_reqno: AtomicU32,
    backend: Box<dyn ProtocolBackend>,
    codec: MessageCodec,
}

impl Session {
    /// Creates a session for `role` sending through `backend`.
    #[must_use]
    pub fn new(role: Role, backend: Box<dyn ProtocolBackend>) -> Self {
        debug!(role = %role, "Creating protocol session");
        Self {
            role,
            valid: MessageType::ALL.map(|t| role_accepts(role, t)),
            handlers: RwLock::new(std::array::from_fn(|_| None)),
            pending: DashMap::new(),
            next_reqno: AtomicU32::new(1),
            backend,
            codec: MessageCodec::new(),
        }
    }

    /// Creates a session over `connection` using the configured role and
    /// bus names.
    ///
    /// # Errors
    /// Returns a configuration error if `config` does not validate.
    pub fn from_config(config: &SessionConfig, connection: Arc<dyn Connection>) -> Result<Arc<Self>> {
        config.validate()?;
        let backend = BusBackend::new(config.role, config.bus.clone(), connection);
        Ok(Arc::new(Self::new(config.role, Box::new(backend))))
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns `true` if this session's role may receive `msg_type`.
    #[must_use]
    pub const fn is_valid(&self, msg_type: MessageType) -> bool {
        self.valid[msg_type.index()]
    }

    /// The backend messages are sent through.
    #[must_use]
    pub fn backend(&self) -> &dyn ProtocolBackend {
        self.backend.as_ref()
    }

    // ========================================
    // Handlers
    // ========================================

    /// Registers `handler` for `msg_type`, replacing any previous one.
    ///
    /// # Errors
    /// `HandlerNotPermitted` if the role does not receive `msg_type`; the
    /// handler table is left unchanged.
    pub fn set_handler<H>(&self, msg_type: MessageType, handler: H) -> Result<()>
    where
        H: MessageHandler + 'static,
    {
        if !self.is_valid(msg_type) {
            warn!(role = %self.role, msg_type = %msg_type, "Handler not permitted for role");
            return Err(SessionError::HandlerNotPermitted {
                msg_type,
                role: self.role,
            });
        }

        let replaced = self.handlers.write()[msg_type.index()]
            .replace(Arc::new(handler))
            .is_some();
        debug!(msg_type = %msg_type, replaced, "Registered handler");
        Ok(())
    }

    /// Registers `handler` for a raw discriminant.
    ///
    /// # Errors
    /// `UnknownMessageType` for values outside the enumeration, otherwise
    /// as [`Session::set_handler`].
    pub fn set_handler_raw<H>(&self, raw: i32, handler: H) -> Result<()>
    where
        H: MessageHandler + 'static,
    {
        let msg_type = MessageType::from_i32(raw).ok_or_else(|| {
            warn!(raw, "Handler for unknown message type");
            SessionError::UnknownMessageType(raw)
        })?;
        self.set_handler(msg_type, handler)
    }

    /// Removes the handler for `msg_type`. Returns `true` if one was set.
    pub fn remove_handler(&self, msg_type: MessageType) -> bool {
        self.handlers.write()[msg_type.index()].take().is_some()
    }

    #[must_use]
    pub fn has_handler(&self, msg_type: MessageType) -> bool {
        self.handlers.read()[msg_type.index()].is_some()
    }

    // ========================================
    // Requests
    // ========================================

    /// Returns the next request number: starts at 1, wraps past `u32::MAX`
    /// back to 1, never 0.
    pub fn next_reqno(&self) -> u32 {
        let (Ok(reqno) | Err(reqno)) =
            self.next_reqno
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                    Some(if n == u32::MAX { 1 } else { n + 1 })
                });
        trace!(reqno, "Allocated request number");
        reqno
    }

    /// Returns `true` if a status reply for `reqno` is awaited.
    #[must_use]
    pub fn is_pending(&self, reqno: u32) -> bool {
        self.pending.contains_key(&reqno)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Stops waiting for the reply to `reqno`. Returns `true` if it was pending.
    pub fn cancel_pending(&self, reqno: u32) -> bool {
        self.pending.remove(&reqno).is_some()
    }

    /// Records `status` under the message's reqno and sends through the
    /// backend. The record is dropped again if the send fails.
    pub(crate) fn deliver(
        &self,
        rset: &ResourceSet,
        msg: &Message,
        status: Option<StatusCallback>,
    ) -> Result<()> {
        let msg_type = msg.message_type();
        let reqno = msg.reqno();

        let tracked = match status {
            Some(callback) => {
                match self.pending.entry(reqno) {
                    Entry::Occupied(_) => {
                        warn!(reqno, msg_type = %msg_type, "Request number already pending");
                        return Err(SessionError::DuplicateRequest(reqno));
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(PendingReply {
                            id: rset.id(),
                            msg_type,
                            callback,
                        });
                    }
                }
                true
            }
            None => false,
        };

        match self.backend.send(rset, msg) {
            Ok(serial) => {
                debug!(id = rset.id(), msg_type = %msg_type, reqno, serial, "Sent message");
                Ok(())
            }
            Err(e) => {
                if tracked {
                    self.pending.remove(&reqno);
                }
                warn!(id = rset.id(), msg_type = %msg_type, reqno, error = %e, "Send failed");
                Err(e)
            }
        }
    }

    // ========================================
    // Dispatch
    // ========================================

    /// Parses `wire` and routes it.
    ///
    /// Status replies complete the matching pending request. Every other
    /// type goes to its registered handler.
    ///
    /// # Errors
    /// - `Core` if the message cannot be parsed
    /// - `HandlerNotPermitted` if the role does not receive the type
    pub fn dispatch(&self, wire: &WireMessage) -> Result<Dispatch> {
        let msg = self.codec.parse(wire).map_err(|e| {
            warn!(serial = wire.serial(), sender = ?wire.sender(), error = %e, "Dropping undecodable message");
            SessionError::from(e)
        })?;

        if let Message::Status(status) = &msg {
            return Ok(self.correlate(status));
        }

        let msg_type = msg.message_type();
        if !self.is_valid(msg_type) {
            warn!(role = %self.role, msg_type = %msg_type, "Received message not valid for role");
            return Err(SessionError::HandlerNotPermitted {
                msg_type,
                role: self.role,
            });
        }

        let handler = self.handlers.read()[msg_type.index()].clone();
        match handler {
            Some(handler) => {
                debug!(msg_type = %msg_type, id = msg.id(), reqno = msg.reqno(), "Dispatching message");
                handler.handle(&msg, &ReplyContext::new(wire.clone()));
                Ok(Dispatch::Handled(msg_type))
            }
            None => {
                debug!(msg_type = %msg_type, "No handler registered");
                Ok(Dispatch::Unhandled(msg_type))
            }
        }
    }

    fn correlate(&self, status: &StatusMsg) -> Dispatch {
        let reqno = status.reqno;
        match self.pending.remove(&reqno) {
            Some((_, pending)) => {
                if pending.id != status.id {
                    warn!(reqno, expected = pending.id, got = status.id, "Status for unexpected resource set");
                }
                debug!(
                    reqno,
                    request = %pending.msg_type,
                    errcode = status.errcode,
                    "Correlated status reply"
                );
                (pending.callback)(status);
                Dispatch::Correlated { reqno }
            }
            None => {
                debug!(reqno, "Status reply without pending request");
                Dispatch::Uncorrelated { reqno }
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("pending", &self.pending.len())
            .field("next_reqno", &self.next_reqno.load(Ordering::Relaxed))
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use parking_lot::Mutex;

    use resproto_common::types::ResourceMask;
    use resproto_core::protocol::codec::{compose_message, reply_message, Route};
    use resproto_core::protocol::messages::{NotifyMsg, PossessMsg, VideoMsg};
    use resproto_core::CoreError;
    use resproto_transport::mock::MockConnection;
    use resproto_transport::wire::WireArg;

    use super::*;
    use crate::resource_set::ConnectionState;

    const CLIENT_PATH: &str = "/org/maemo/resource/client";
    const CLIENT_IFACE: &str = "org.maemo.resource.client";

    fn session(role: Role) -> (Arc<Session>, Arc<MockConnection>) {
        let conn = Arc::new(MockConnection::new(":1.2"));
        let config = SessionConfig {
            role,
            ..SessionConfig::default()
        };
        (Session::from_config(&config, conn.clone()).unwrap(), conn)
    }

    fn incoming(msg: &Message) -> WireMessage {
        let route = Route::for_type(":1.2", CLIENT_PATH, CLIENT_IFACE, msg.message_type());
        let mut wire = compose_message(&route, msg).unwrap();
        wire.set_serial(31);
        wire.set_sender("org.maemo.resource.manager");
        wire
    }

    fn status_reply(id: u32, reqno: u32, errcode: i32) -> WireMessage {
        let original = incoming(&Message::Grant(NotifyMsg::default()));
        let status = Message::Status(StatusMsg {
            id,
            reqno,
            errcode,
            errmsg: None,
        });
        reply_message(&original, &status).unwrap()
    }

    fn grant(id: u32) -> Message {
        Message::Grant(NotifyMsg {
            id,
            reqno: 0,
            resources: ResourceMask::AUDIO_PLAYBACK,
        })
    }

    #[test]
    fn test_role_tables() {
        let (client, _) = session(Role::Client);
        let (server, _) = session(Role::Server);

        for msg_type in MessageType::ALL {
            let client_ok = matches!(
                msg_type,
                MessageType::Unregister | MessageType::Grant | MessageType::Advice
            );
            assert_eq!(client.is_valid(msg_type), client_ok, "{msg_type}");
        }
        assert!(server.is_valid(MessageType::Register));
        assert!(server.is_valid(MessageType::Video));
        assert!(!server.is_valid(MessageType::Grant));
        assert!(!server.is_valid(MessageType::Status));
        assert!(!client.is_valid(MessageType::Status));
    }

    #[test]
    fn test_set_handler_overwrites() {
        let (session, _) = session(Role::Client);
        let hits = Arc::new(Mutex::new(Vec::new()));

        let first = hits.clone();
        session
            .set_handler(MessageType::Grant, move |_: &Message, _: &ReplyContext| {
                first.lock().push("first");
            })
            .unwrap();
        let second = hits.clone();
        session
            .set_handler(MessageType::Grant, move |_: &Message, _: &ReplyContext| {
                second.lock().push("second");
            })
            .unwrap();

        session.dispatch(&incoming(&grant(1))).unwrap();
        assert_eq!(*hits.lock(), vec!["second"]);
    }

    #[test]
    fn test_out_of_role_handler_rejected() {
        let (session, _) = session(Role::Client);
        session
            .set_handler(MessageType::Grant, |_: &Message, _: &ReplyContext| {})
            .unwrap();

        let err = session
            .set_handler(MessageType::Acquire, |_: &Message, _: &ReplyContext| {})
            .unwrap_err();
        assert!(err.is_gate_error());
        assert!(matches!(
            err,
            SessionError::HandlerNotPermitted { msg_type: MessageType::Acquire, role: Role::Client }
        ));
        assert!(!session.has_handler(MessageType::Acquire));
        assert!(session.has_handler(MessageType::Grant));

        assert!(session
            .set_handler(MessageType::Status, |_: &Message, _: &ReplyContext| {})
            .is_err());
    }

    #[test]
    fn test_set_handler_raw() {
        let (session, _) = session(Role::Server);

        let err = session
            .set_handler_raw(42, |_: &Message, _: &ReplyContext| {})
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownMessageType(42)));

        session
            .set_handler_raw(MessageType::Acquire.as_i32(), |_: &Message, _: &ReplyContext| {})
            .unwrap();
        assert!(session.has_handler(MessageType::Acquire));
        assert!(session.remove_handler(MessageType::Acquire));
        assert!(!session.remove_handler(MessageType::Acquire));
    }

    #[test]
    fn test_dispatch_handled_and_unhandled() {
        let (session, _) = session(Role::Client);
        assert_eq!(
            session.dispatch(&incoming(&grant(1))).unwrap(),
            Dispatch::Unhandled(MessageType::Grant)
        );

        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        session
            .set_handler(MessageType::Grant, move |msg: &Message, ctx: &ReplyContext| {
                *slot.lock() = Some((msg.clone(), ctx.wire().serial()));
            })
            .unwrap();

        assert_eq!(
            session.dispatch(&incoming(&grant(5))).unwrap(),
            Dispatch::Handled(MessageType::Grant)
        );
        assert_eq!(*seen.lock(), Some((grant(5), 31)));
    }

    #[test]
    fn test_dispatch_rejects_out_of_role() {
        let (session, _) = session(Role::Client);
        let video = Message::Video(VideoMsg {
            id: 1,
            reqno: 2,
            pid: 3,
        });
        let err = session.dispatch(&incoming(&video)).unwrap_err();
        assert!(err.is_gate_error());
    }

    #[test]
    fn test_dispatch_undecodable() {
        let (session, _) = session(Role::Client);
        let mut wire =
            WireMessage::new_method_call(":1.2", CLIENT_PATH, CLIENT_IFACE, "grant").unwrap();
        wire.append([WireArg::Int32(77)]).unwrap();

        let err = session.dispatch(&wire).unwrap_err();
        assert!(matches!(err, SessionError::Core(CoreError::UnknownMessageType(77))));
    }

    #[test]
    fn test_dispatch_preserves_order() {
        let (session, _) = session(Role::Client);
        let order = Arc::new(Mutex::new(Vec::new()));

        for msg_type in [MessageType::Grant, MessageType::Advice, MessageType::Unregister] {
            let order = order.clone();
            session
                .set_handler(msg_type, move |msg: &Message, _: &ReplyContext| {
                    order.lock().push(msg.id());
                })
                .unwrap();
        }

        let msgs = [
            grant(1),
            Message::Advice(NotifyMsg {
                id: 2,
                ..NotifyMsg::default()
            }),
            Message::Unregister(PossessMsg { id: 3, reqno: 0 }),
            grant(4),
        ];
        for msg in &msgs {
            session.dispatch(&incoming(msg)).unwrap();
        }
        assert_eq!(*order.lock(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_status_correlation() {
        let (session, _) = session(Role::Client);
        let rset = ResourceSet::new(session.clone(), 8);
        rset.transition(ConnectionState::Connecting).unwrap();
        rset.transition(ConnectionState::Connected).unwrap();

        let errcode = Arc::new(Mutex::new(None));
        let slot = errcode.clone();
        let reqno = session.next_reqno();
        rset.send_message(
            &Message::Acquire(PossessMsg { id: 8, reqno }),
            Some(Box::new(move |status: &StatusMsg| {
                *slot.lock() = Some(status.errcode);
            })),
        )
        .unwrap();
        assert!(session.is_pending(reqno));

        assert_eq!(
            session.dispatch(&status_reply(8, reqno, 0)).unwrap(),
            Dispatch::Correlated { reqno }
        );
        assert_eq!(*errcode.lock(), Some(0));
        assert_eq!(session.pending_count(), 0);

        // A second reply for the same request is no longer expected.
        assert_eq!(
            session.dispatch(&status_reply(8, reqno, 0)).unwrap(),
            Dispatch::Uncorrelated { reqno }
        );
    }

    #[test]
    fn test_status_never_reaches_handlers() {
        let (session, _) = session(Role::Client);
        let hits = Arc::new(AtomicUsize::new(0));
        for msg_type in [MessageType::Grant, MessageType::Advice, MessageType::Unregister] {
            let hits = hits.clone();
            session
                .set_handler(msg_type, move |_: &Message, _: &ReplyContext| {
                    hits.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }

        session.dispatch(&status_reply(1, 99, 3)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_duplicate_pending_request() {
        let (session, conn) = session(Role::Client);
        let rset = ResourceSet::new(session.clone(), 8);
        rset.transition(ConnectionState::Connecting).unwrap();
        rset.transition(ConnectionState::Connected).unwrap();

        let msg = Message::Release(PossessMsg { id: 8, reqno: 5 });
        rset.send_message(&msg, Some(Box::new(|_: &StatusMsg| {}))).unwrap();

        let err = rset
            .send_message(&msg, Some(Box::new(|_: &StatusMsg| {})))
            .unwrap_err();
        assert!(matches!(err, SessionError::DuplicateRequest(5)));
        assert_eq!(conn.sent_count(), 1);

        assert!(session.cancel_pending(5));
        rset.send_message(&msg, None).unwrap();
        assert_eq!(conn.sent_count(), 2);
    }

    #[test]
    fn test_next_reqno_wraps_skipping_zero() {
        let (session, _) = session(Role::Client);
        assert_eq!(session.next_reqno(), 1);
        assert_eq!(session.next_reqno(), 2);

        session.next_reqno.store(u32::MAX, Ordering::Relaxed);
        assert_eq!(session.next_reqno(), u32::MAX);
        assert_eq!(session.next_reqno(), 1);
    }

    #[test]
    fn test_reqno_counters_are_per_session() {
        let (a, _) = session(Role::Client);
        let (b, _) = session(Role::Client);
        a.next_reqno();
        a.next_reqno();
        assert_eq!(b.next_reqno(), 1);
    }
}
