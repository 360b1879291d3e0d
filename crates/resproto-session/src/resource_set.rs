// ============================================
// File: crates/resproto-session/src/resource_set.rs
// ============================================
//! # Resource Set
//!
//! ## Creation Reason
//! Represents one registered entity's association with a session and
//! gates which messages it may send in its current connection state.
//!
//! ## Main Functionality
//! - `ResourceSet`: Identifier, owning session, peer, connection state
//! - `ConnectionState`: Registration state machine
//! - `send_message` / `reply_message`: Gated sends through the session
//! - `register` / `unregister`: Lifecycle sends driven by the registration flow
//!
//! ## Connection Lifecycle
//! ```text
//! ┌─────────┐  registration  ┌────────────┐  established  ┌───────────┐
//! │ Initial │ ─────────────► │ Connecting │ ────────────► │ Connected │
//! └─────────┘    accepted    └─────┬──────┘               └─────┬─────┘
//!                                  │ transport failure          │
//!                                  ▼                  ┌─────────┴─────────┐
//!                             ┌─────────┐   failure   │                   │ close
//!                             │  Error  │ ◄───────────┘                   ▼
//!                             └─────────┘                            ┌────────┐
//!                                                                    │ Closed │
//!                                                                    └────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `send_message` only works in `Connected`
//! - Register/unregister never go through `send_message`
//! - Closed and Error are terminal
//! - `register`/`unregister` hold the state lock across the send; a
//!   backend must not call `transition` on the set it is sending for
//!
//! ## Last Modified
//! v0.1.0 - Initial resource set implementation

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tracing::{debug, info, warn};

use resproto_core::protocol::messages::{Message, MessageType, PossessMsg, StatusMsg};

use crate::error::{Result, SessionError};
use crate::session::{ReplyContext, Session, StatusCallback};

// ============================================
// ConnectionState
// ============================================

/// Connection state of a resource set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Created, nothing sent yet.
    Initial,
    /// Registration sent, waiting for the session to be established.
    Connecting,
    /// Ordinary messages may be sent.
    Connected,
    /// Gracefully closed.
    Closed,
    /// Transport failure.
    Error,
}

impl ConnectionState {
    /// Returns `true` if `next` is a legal successor of this state.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Initial, Self::Connecting)
                | (Self::Connecting, Self::Connected)
                | (Self::Connecting, Self::Error)
                | (Self::Connected, Self::Closed)
                | (Self::Connected, Self::Error)
        )
    }

    /// Returns `true` for states with no way out.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Error)
    }

    /// Returns the lowercase state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// ResourceSet
// ============================================

/// One registered entity's handle on a session.
pub struct ResourceSet {
    id: u32,
    session: Arc<Session>,
    /// Bus name of the client, for server-originated messages.
    peer: Option<String>,
    state: RwLock<ConnectionState>,
}

impl ResourceSet {
    /// Creates a resource set in the `Initial` state.
    #[must_use]
    pub fn new(session: Arc<Session>, id: u32) -> Self {
        Self {
            id,
            session,
            peer: None,
            state: RwLock::new(ConnectionState::Initial),
        }
    }

    /// Creates a resource set owned by the client at `peer`.
    ///
    /// Used on the server side, where outgoing messages go to the client.
    #[must_use]
    pub fn with_peer(session: Arc<Session>, id: u32, peer: impl Into<String>) -> Self {
        Self {
            peer: Some(peer.into()),
            ..Self::new(session, id)
        }
    }

    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    #[must_use]
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Moves to `next`.
    ///
    /// # Errors
    /// `InvalidTransition` if the edge is not part of the state machine;
    /// the state is left unchanged.
    pub fn transition(&self, next: ConnectionState) -> Result<()> {
        let mut state = self.state.write();
        let current = *state;

        if !current.can_transition_to(next) {
            warn!(id = self.id, from = %current, to = %next, "Rejected state transition");
            return Err(SessionError::InvalidTransition {
                id: self.id,
                from: current,
                to: next,
            });
        }

        *state = next;
        info!(id = self.id, from = %current, to = %next, "Resource set state changed");
        Ok(())
    }

    /// Sends an ordinary message through the session's backend.
    ///
    /// `status` is invoked when the matching status reply is dispatched.
    ///
    /// # Errors
    /// - `LifecycleMessage` for register/unregister
    /// - `NotConnected` outside the `Connected` state
    /// - Any backend failure
    pub fn send_message(&self, msg: &Message, status: Option<StatusCallback>) -> Result<()> {
        let msg_type = msg.message_type();
        if msg_type.is_lifecycle() {
            warn!(id = self.id, msg_type = %msg_type, "Refusing to send lifecycle message");
            return Err(SessionError::LifecycleMessage(msg_type));
        }

        let state = self.state();
        if state != ConnectionState::Connected {
            warn!(id = self.id, state = %state, msg_type = %msg_type, "Refusing to send while not connected");
            return Err(SessionError::NotConnected { id: self.id, state });
        }

        self.session.deliver(self, msg, status)
    }

    /// Answers `original` with a status message.
    ///
    /// Without a `context` the peer does not expect an answer and nothing
    /// is sent.
    ///
    /// # Errors
    /// Any backend failure.
    pub fn reply_message(
        &self,
        original: &Message,
        context: Option<&ReplyContext>,
        errcode: i32,
        errmsg: Option<&str>,
    ) -> Result<()> {
        let Some(context) = context else {
            debug!(id = self.id, reqno = original.reqno(), "No reply expected");
            return Ok(());
        };

        let status = Message::Status(StatusMsg {
            id: self.id,
            reqno: original.reqno(),
            errcode,
            errmsg: errmsg.map(str::to_owned),
        });

        self.session.backend().reply(self, &status, context)?;
        debug!(id = self.id, reqno = original.reqno(), errcode, "Sent reply");
        Ok(())
    }

    /// Sends the registration message and moves to `Connecting`.
    ///
    /// # Errors
    /// - `LifecycleMessage` if `msg` is not register
    /// - `InvalidTransition` unless the set is `Initial`
    /// - Any backend failure (the state is left unchanged)
    pub fn register(&self, msg: &Message, status: Option<StatusCallback>) -> Result<()> {
        if msg.message_type() != MessageType::Register {
            return Err(SessionError::LifecycleMessage(msg.message_type()));
        }
        self.lifecycle(msg, status, ConnectionState::Connecting)
    }

    /// Sends the unregister message and moves to `Closed`.
    ///
    /// # Errors
    /// - `InvalidTransition` unless the set is `Connected`
    /// - Any backend failure (the state is left unchanged)
    pub fn unregister(&self, reqno: u32, status: Option<StatusCallback>) -> Result<()> {
        let msg = Message::Unregister(PossessMsg { id: self.id, reqno });
        self.lifecycle(&msg, status, ConnectionState::Closed)
    }

    fn lifecycle(
        &self,
        msg: &Message,
        status: Option<StatusCallback>,
        next: ConnectionState,
    ) -> Result<()> {
        // Readers still see the old state while the message is in flight;
        // competing transitions wait until the new state is in place.
        let state = self.state.upgradable_read();
        let current = *state;
        if !current.can_transition_to(next) {
            warn!(id = self.id, from = %current, to = %next, "Rejected lifecycle send");
            return Err(SessionError::InvalidTransition {
                id: self.id,
                from: current,
                to: next,
            });
        }

        self.session.deliver(self, msg, status)?;

        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        *state = next;
        info!(id = self.id, from = %current, to = %next, "Resource set state changed");
        Ok(())
    }
}

impl fmt::Debug for ResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSet")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("state", &self.state())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    use resproto_common::types::{ResourceMask, Role};
    use resproto_core::protocol::codec::{compose_message, parse_message, Route};
    use resproto_core::protocol::messages::{NotifyMsg, RecordMsg};
    use resproto_transport::mock::MockConnection;
    use resproto_transport::traits::Connection;

    use super::*;
    use crate::backend::ProtocolBackend;
    use crate::config::SessionConfig;

    /// Backend that parks inside `send` until a second thread has arrived.
    struct SlowBackend {
        entered: Arc<Barrier>,
    }

    impl ProtocolBackend for SlowBackend {
        fn role(&self) -> Role {
            Role::Client
        }

        fn send(&self, _rset: &ResourceSet, _msg: &Message) -> Result<u32> {
            self.entered.wait();
            std::thread::sleep(Duration::from_millis(50));
            Ok(1)
        }

        fn reply(&self, _rset: &ResourceSet, _status: &Message, _context: &ReplyContext) -> Result<u32> {
            Ok(2)
        }
    }

    fn client() -> (Arc<Session>, Arc<MockConnection>) {
        let conn = Arc::new(MockConnection::new(":1.5"));
        let session = Session::from_config(&SessionConfig::default(), conn.clone()).unwrap();
        (session, conn)
    }

    fn connected(session: &Arc<Session>, id: u32) -> ResourceSet {
        let rset = ResourceSet::new(session.clone(), id);
        rset.transition(ConnectionState::Connecting).unwrap();
        rset.transition(ConnectionState::Connected).unwrap();
        rset
    }

    fn acquire(id: u32, reqno: u32) -> Message {
        Message::Acquire(PossessMsg { id, reqno })
    }

    #[test]
    fn test_state_machine() {
        use ConnectionState::*;

        assert!(Initial.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Connected));
        assert!(Connected.can_transition_to(Closed));
        assert!(Connected.can_transition_to(Error));
        assert!(!Initial.can_transition_to(Connected));
        assert!(!Closed.can_transition_to(Connected));
        assert!(!Error.can_transition_to(Initial));
        assert!(Closed.is_terminal() && Error.is_terminal());
    }

    #[test]
    fn test_invalid_transition_keeps_state() {
        let (session, _) = client();
        let rset = ResourceSet::new(session, 1);

        let err = rset.transition(ConnectionState::Connected).unwrap_err();
        assert!(err.is_gate_error());
        assert_eq!(rset.state(), ConnectionState::Initial);
    }

    #[test]
    fn test_send_register_rejected_in_any_state() {
        let (session, conn) = client();
        let register = Message::Register(RecordMsg::default());
        let rset = ResourceSet::new(session, 1);

        let steps = [
            None,
            Some(ConnectionState::Connecting),
            Some(ConnectionState::Connected),
            Some(ConnectionState::Closed),
        ];
        for step in steps {
            if let Some(next) = step {
                rset.transition(next).unwrap();
            }
            let err = rset.send_message(&register, None).unwrap_err();
            assert!(matches!(err, SessionError::LifecycleMessage(MessageType::Register)));
        }

        let unregister = Message::Unregister(PossessMsg::default());
        assert!(rset.send_message(&unregister, None).is_err());

        let failed = ResourceSet::new(rset.session().clone(), 2);
        failed.transition(ConnectionState::Connecting).unwrap();
        failed.transition(ConnectionState::Error).unwrap();
        let err = failed.send_message(&register, None).unwrap_err();
        assert!(matches!(err, SessionError::LifecycleMessage(MessageType::Register)));
        let err = failed.register(&register, None).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition { from: ConnectionState::Error, .. }
        ));

        assert_eq!(conn.sent_count(), 0);
    }

    #[test]
    fn test_send_while_connecting_rejected() {
        let (session, conn) = client();
        let rset = ResourceSet::new(session.clone(), 2);
        rset.transition(ConnectionState::Connecting).unwrap();

        let err = rset.send_message(&acquire(2, 1), None).unwrap_err();
        assert!(matches!(
            err,
            SessionError::NotConnected { id: 2, state: ConnectionState::Connecting }
        ));
        assert_eq!(conn.sent_count(), 0);
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn test_send_when_connected() {
        let (session, conn) = client();
        let rset = connected(&session, 3);

        rset.send_message(&acquire(3, 21), Some(Box::new(|_: &StatusMsg| {}))).unwrap();

        let sent = conn.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].member(), Some("acquire"));
        assert_eq!(parse_message(&sent[0]).unwrap(), acquire(3, 21));
        assert!(session.is_pending(21));
    }

    #[test]
    fn test_failed_send_drops_pending() {
        let (session, conn) = client();
        let rset = connected(&session, 3);
        conn.set_fail_sends(true);

        let err = rset.send_message(&acquire(3, 8), Some(Box::new(|_: &StatusMsg| {}))).unwrap_err();
        assert!(matches!(err, SessionError::SendFailed { .. }));
        assert!(err.is_retryable());
        assert!(!session.is_pending(8));
    }

    #[test]
    fn test_reply_message() {
        let conn = Arc::new(MockConnection::new(":1.1"));
        let config = SessionConfig {
            role: Role::Server,
            ..SessionConfig::default()
        };
        let session = Session::from_config(&config, conn.clone()).unwrap();
        let rset = ResourceSet::with_peer(session, 9, ":1.30");

        let route = Route::new(
            "org.maemo.resource.manager",
            "/org/maemo/resource/manager",
            "org.maemo.resource.manager",
            "acquire",
        );
        let mut request = compose_message(&route, &acquire(9, 7)).unwrap();
        request.set_serial(55);
        request.set_sender(":1.30");
        let context = ReplyContext::new(request);

        rset.reply_message(&acquire(9, 7), Some(&context), 42, Some("denied"))
            .unwrap();

        let reply = conn.last_sent().unwrap();
        assert!(reply.is_reply());
        assert_eq!(reply.reply_serial(), Some(55));
        assert_eq!(reply.destination(), Some(":1.30"));
        assert_eq!(
            parse_message(&reply).unwrap(),
            Message::Status(StatusMsg {
                id: 9,
                reqno: 7,
                errcode: 42,
                errmsg: Some("denied".into()),
            })
        );
    }

    #[test]
    fn test_reply_without_context_sends_nothing() {
        let (session, conn) = client();
        let rset = ResourceSet::new(session, 9);

        rset.reply_message(&acquire(9, 7), None, 42, Some("denied"))
            .unwrap();
        assert_eq!(conn.sent_count(), 0);
    }

    #[test]
    fn test_register_and_unregister_lifecycle() {
        let (session, conn) = client();
        let rset = ResourceSet::new(session.clone(), 4);
        let answered = Arc::new(AtomicU32::new(0));

        let register = Message::Register(RecordMsg {
            id: 4,
            reqno: 1,
            class: Some("player".into()),
            ..RecordMsg::default()
        });
        let seen = answered.clone();
        rset.register(
            &register,
            Some(Box::new(move |status: &StatusMsg| {
                seen.store(status.reqno, Ordering::SeqCst);
            })),
        )
        .unwrap();
        assert_eq!(rset.state(), ConnectionState::Connecting);
        assert_eq!(conn.last_sent().unwrap().member(), Some("register"));

        // Second registration is rejected by the state machine.
        assert!(rset.register(&register, None).unwrap_err().is_gate_error());
        assert!(rset.unregister(2, None).is_err());

        rset.transition(ConnectionState::Connected).unwrap();
        rset.unregister(2, None).unwrap();
        assert_eq!(rset.state(), ConnectionState::Closed);
        assert_eq!(conn.sent_count(), 2);
        assert_eq!(answered.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_server_send_goes_to_peer() {
        let conn = Arc::new(MockConnection::new(":1.1"));
        let config = SessionConfig {
            role: Role::Server,
            ..SessionConfig::default()
        };
        let session = Session::from_config(&config, conn.clone()).unwrap();

        let rset = ResourceSet::with_peer(session.clone(), 6, ":1.77");
        rset.transition(ConnectionState::Connecting).unwrap();
        rset.transition(ConnectionState::Connected).unwrap();

        let grant = Message::Grant(NotifyMsg {
            id: 6,
            reqno: 0,
            resources: ResourceMask::AUDIO_PLAYBACK,
        });
        rset.send_message(&grant, None).unwrap();

        let sent = conn.take_sent();
        assert_eq!(sent[0].destination(), Some(":1.77"));
        assert_eq!(sent[0].path(), Some("/org/maemo/resource/client"));
        assert_eq!(sent[0].interface(), Some("org.maemo.resource.client"));
        assert_eq!(sent[0].member(), Some("grant"));
        assert_eq!(sent[0].sender(), Some(conn.unique_name()));
    }

    #[test]
    fn test_unregister_blocks_competing_transition() {
        let entered = Arc::new(Barrier::new(2));
        let backend = SlowBackend {
            entered: entered.clone(),
        };
        let session = Arc::new(Session::new(Role::Client, Box::new(backend)));
        let rset = connected(&session, 4);

        std::thread::scope(|s| {
            let racer = s.spawn(|| {
                entered.wait();
                rset.transition(ConnectionState::Error)
            });

            rset.unregister(9, Some(Box::new(|_: &StatusMsg| {}))).unwrap();

            // The competing transition only runs once Closed is in place.
            let raced = racer.join().unwrap();
            assert!(matches!(
                raced,
                Err(SessionError::InvalidTransition { from: ConnectionState::Closed, .. })
            ));
        });

        assert_eq!(rset.state(), ConnectionState::Closed);
        assert!(session.is_pending(9));
    }
}
