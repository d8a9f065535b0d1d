//! Extension-point traits: handshaker, session, and listener.
//!
//! The client consumes these as opaque collaborators. A production
//! deployment plugs in [`SignedHandshaker`](crate::security::SignedHandshaker);
//! tests typically use [`PlainHandshaker`](crate::testing::PlainHandshaker).

use std::future::Future;

use tokio::net::TcpStream;

use super::error::{HandshakeError, ListenerError, SessionError};
use super::types::{Identity, Version};

/// An authenticated, encrypted session bound to a single socket.
///
/// Produced by a [`Handshaker`] and discarded together with the socket on
/// any I/O error. `encrypt` and `decrypt` take `&mut self`: a session is
/// only ever driven by the one task that owns its connection.
pub trait Session: Send + 'static {
    /// Encrypt a message body for the remote peer.
    fn encrypt(&mut self, data: &[u8]) -> Result<Vec<u8>, SessionError>;

    /// Decrypt a message body received from the remote peer.
    fn decrypt(&mut self, data: &[u8]) -> Result<Vec<u8>, SessionError>;

    /// The peer identity established during the handshake.
    fn remote_identity(&self) -> Identity;
}

/// Establishes a [`Session`] over a freshly connected socket.
///
/// Implementations must be callable concurrently: every per-address
/// connection task shares one handshaker.
pub trait Handshaker: Send + Sync + 'static {
    /// The session type produced by a successful handshake.
    type Session: Session;

    /// Run the initiator side of the handshake on an outbound socket.
    fn handshake(
        &self,
        stream: &mut TcpStream,
    ) -> impl Future<Output = Result<Self::Session, HandshakeError>> + Send;

    /// Run the responder side of the handshake on an accepted socket.
    fn accept_handshake(
        &self,
        stream: &mut TcpStream,
    ) -> impl Future<Output = Result<Self::Session, HandshakeError>> + Send;
}

/// Receives decrypted acknowledgements.
///
/// This is the only channel by which responses reach application code.
/// Returning an error from any callback kills the session that delivered
/// the acknowledgement.
pub trait Listener: Send + Sync + 'static {
    /// A ping acknowledgement arrived.
    fn did_receive_ping_ack(
        &self,
        version: Version,
        data: Vec<u8>,
        from: Identity,
    ) -> Result<(), ListenerError>;

    /// A push acknowledgement arrived.
    fn did_receive_push_ack(
        &self,
        version: Version,
        data: Vec<u8>,
        from: Identity,
    ) -> Result<(), ListenerError>;

    /// A pull acknowledgement arrived.
    fn did_receive_pull_ack(
        &self,
        version: Version,
        data: Vec<u8>,
        from: Identity,
    ) -> Result<(), ListenerError>;
}
