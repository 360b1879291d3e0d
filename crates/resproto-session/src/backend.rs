// ============================================
// File: crates/resproto-session/src/backend.rs
// ============================================
//! # Protocol Backends
//!
//! ## Creation Reason
//! Separates the role-specific part of sending (who a message is
//! addressed to) from the session bookkeeping.
//!
//! ## Main Functionality
//! - `ProtocolBackend`: Send and reply operations used by the session
//! - `BusBackend`: Implementation over a transport `Connection`
//!
//! ## Addressing
//! | Role | Destination | Path | Interface |
//! |------|-------------|------|-----------|
//! | client | manager name | manager path | manager interface |
//! | server | resource set peer | client path | client interface |
//!
//! The member is always the lowercase message type name.
//!
//! ## Last Modified
//! v0.1.0 - Initial backend implementation

use std::sync::Arc;

use tracing::trace;

use resproto_common::types::Role;
use resproto_core::protocol::codec::{MessageCodec, Route};
use resproto_core::protocol::messages::Message;
use resproto_transport::traits::Connection;

use crate::config::BusConfig;
use crate::error::{Result, SessionError};
use crate::resource_set::ResourceSet;
use crate::session::ReplyContext;

// ============================================
// ProtocolBackend Trait
// ============================================

/// Role-specific delivery of protocol messages.
///
/// Both operations return the serial the transport assigned.
pub trait ProtocolBackend: Send + Sync {
    /// Role this backend sends as.
    fn role(&self) -> Role;

    /// Sends `msg` on behalf of `rset`.
    ///
    /// # Errors
    /// Returns an error if the message cannot be composed or sent.
    fn send(&self, rset: &ResourceSet, msg: &Message) -> Result<u32>;

    /// Sends the status message `status` as the answer to `context`.
    ///
    /// # Errors
    /// Returns an error if the reply cannot be composed or sent.
    fn reply(&self, rset: &ResourceSet, status: &Message, context: &ReplyContext) -> Result<u32>;
}

// ============================================
// BusBackend
// ============================================

/// Backend sending over a bus connection.
pub struct BusBackend {
    role: Role,
    bus: BusConfig,
    connection: Arc<dyn Connection>,
    codec: MessageCodec,
}

impl BusBackend {
    #[must_use]
    pub fn new(role: Role, bus: BusConfig, connection: Arc<dyn Connection>) -> Self {
        Self {
            role,
            bus,
            connection,
            codec: MessageCodec::new(),
        }
    }

    /// Bus name of the local end.
    #[must_use]
    pub fn unique_name(&self) -> &str {
        self.connection.unique_name()
    }

    fn route<'a>(&'a self, rset: &'a ResourceSet, msg: &Message) -> Result<Route<'a>> {
        let msg_type = msg.message_type();
        match self.role {
            Role::Client => Ok(Route::for_type(
                &self.bus.manager_name,
                &self.bus.manager_path,
                &self.bus.manager_interface,
                msg_type,
            )),
            Role::Server => {
                let peer = rset
                    .peer()
                    .ok_or(SessionError::MissingPeer { id: rset.id() })?;
                Ok(Route::for_type(
                    peer,
                    &self.bus.client_path,
                    &self.bus.client_interface,
                    msg_type,
                ))
            }
        }
    }
}

impl ProtocolBackend for BusBackend {
    fn role(&self) -> Role {
        self.role
    }

    fn send(&self, rset: &ResourceSet, msg: &Message) -> Result<u32> {
        let route = self.route(rset, msg)?;
        let wire = self.codec.compose(&route, msg)?;

        let serial = self
            .connection
            .send(wire)
            .map_err(|e| SessionError::send_failed(msg.message_type(), e))?;
        trace!(serial, destination = route.destination, "Message handed to connection");
        Ok(serial)
    }

    fn reply(&self, rset: &ResourceSet, status: &Message, context: &ReplyContext) -> Result<u32> {
        let wire = self.codec.compose_reply(context.wire(), status)?;

        let serial = self
            .connection
            .send(wire)
            .map_err(|e| SessionError::send_failed(status.message_type(), e))?;
        trace!(serial, id = rset.id(), sender = ?context.sender(), "Reply handed to connection");
        Ok(serial)
    }
}

impl std::fmt::Debug for BusBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusBackend")
            .field("role", &self.role)
            .field("unique_name", &self.unique_name())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use resproto_core::protocol::codec::parse_message;
    use resproto_core::protocol::messages::{MessageType, PossessMsg, StatusMsg, VideoMsg};
    use resproto_core::CoreError;
    use resproto_transport::error::TransportError;
    use resproto_transport::mock::MockConnection;
    use resproto_transport::wire::WireMessage;

    use super::*;
    use crate::config::SessionConfig;
    use crate::session::Session;

    fn backend(role: Role) -> (BusBackend, Arc<MockConnection>) {
        let conn = Arc::new(MockConnection::new(":1.4"));
        (BusBackend::new(role, BusConfig::default(), conn.clone()), conn)
    }

    fn request() -> WireMessage {
        WireMessage::new_method_call(
            "org.maemo.resource.manager",
            "/org/maemo/resource/manager",
            "org.maemo.resource.manager",
            "acquire",
        )
        .unwrap()
    }

    fn rset(role: Role, peer: Option<&str>) -> ResourceSet {
        let config = SessionConfig {
            role,
            ..SessionConfig::default()
        };
        let session = Session::from_config(&config, Arc::new(MockConnection::default())).unwrap();
        match peer {
            Some(peer) => ResourceSet::with_peer(session, 1, peer),
            None => ResourceSet::new(session, 1),
        }
    }

    #[test]
    fn test_client_addresses_manager() {
        let (backend, conn) = backend(Role::Client);
        let msg = Message::Video(VideoMsg {
            id: 1,
            reqno: 2,
            pid: 300,
        });

        let serial = backend.send(&rset(Role::Client, None), &msg).unwrap();

        let wire = conn.last_sent().unwrap();
        assert_eq!(wire.serial(), serial);
        assert_eq!(wire.destination(), Some("org.maemo.resource.manager"));
        assert_eq!(wire.path(), Some("/org/maemo/resource/manager"));
        assert_eq!(wire.interface(), Some("org.maemo.resource.manager"));
        assert_eq!(wire.member(), Some("video"));
        assert_eq!(parse_message(&wire).unwrap(), msg);
    }

    #[test]
    fn test_server_requires_peer() {
        let (backend, conn) = backend(Role::Server);
        let msg = Message::Release(PossessMsg { id: 1, reqno: 3 });

        let err = backend.send(&rset(Role::Server, None), &msg).unwrap_err();
        assert!(matches!(err, SessionError::MissingPeer { id: 1 }));
        assert_eq!(conn.sent_count(), 0);
    }

    #[test]
    fn test_closed_connection() {
        let (backend, conn) = backend(Role::Client);
        conn.close();

        let msg = Message::Acquire(PossessMsg { id: 1, reqno: 3 });
        let err = backend.send(&rset(Role::Client, None), &msg).unwrap_err();
        assert!(matches!(
            err,
            SessionError::SendFailed {
                msg_type: MessageType::Acquire,
                source: TransportError::Closed
            }
        ));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_reply_requires_status() {
        let (backend, conn) = backend(Role::Server);
        let set = rset(Role::Server, Some(":1.9"));
        let mut original = request();
        original.set_serial(12);
        original.set_sender(":1.9");
        let context = ReplyContext::new(original);

        let not_status = Message::Acquire(PossessMsg { id: 1, reqno: 3 });
        let err = backend.reply(&set, &not_status, &context).unwrap_err();
        assert!(matches!(err, SessionError::Core(CoreError::NotAStatus(_))));

        let status = Message::Status(StatusMsg::ok(1, 3));
        backend.reply(&set, &status, &context).unwrap();
        let wire = conn.last_sent().unwrap();
        assert_eq!(wire.reply_serial(), Some(12));
        assert_eq!(wire.destination(), Some(":1.9"));
    }
}
