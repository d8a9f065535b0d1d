//! Plaintext handshaker and session for tests that don't exercise
//! crypto.

use rand::RngCore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::protocol::error::{HandshakeError, SessionError};
use crate::protocol::session::{Handshaker, Session};
use crate::protocol::types::Identity;

/// Handshaker that exchanges bare 32-byte identities and encrypts
/// nothing.
#[derive(Clone)]
pub struct PlainHandshaker {
    identity: [u8; 32],
}

impl PlainHandshaker {
    /// Create a plaintext handshaker with a random identity.
    pub fn new() -> Self {
        let mut identity = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut identity);
        Self { identity }
    }

    /// Create a plaintext handshaker with a fixed identity.
    pub fn with_identity(identity: [u8; 32]) -> Self {
        Self { identity }
    }

    async fn run(&self, stream: &mut TcpStream) -> Result<PlainSession, HandshakeError> {
        stream.write_all(&self.identity).await?;
        let mut peer = [0u8; 32];
        stream.read_exact(&mut peer).await?;
        Ok(PlainSession::new(Identity(peer)))
    }
}

impl Default for PlainHandshaker {
    fn default() -> Self {
        Self::new()
    }
}

impl Handshaker for PlainHandshaker {
    type Session = PlainSession;

    async fn handshake(&self, stream: &mut TcpStream) -> Result<PlainSession, HandshakeError> {
        self.run(stream).await
    }

    async fn accept_handshake(
        &self,
        stream: &mut TcpStream,
    ) -> Result<PlainSession, HandshakeError> {
        self.run(stream).await
    }
}

/// A pass-through session: bodies travel in the clear.
#[derive(Debug)]
pub struct PlainSession {
    remote: Identity,
}

impl PlainSession {
    /// Create a session bound to the given remote identity.
    pub fn new(remote: Identity) -> Self {
        Self { remote }
    }
}

impl Session for PlainSession {
    fn encrypt(&mut self, data: &[u8]) -> Result<Vec<u8>, SessionError> {
        Ok(data.to_vec())
    }

    fn decrypt(&mut self, data: &[u8]) -> Result<Vec<u8>, SessionError> {
        Ok(data.to_vec())
    }

    fn remote_identity(&self) -> Identity {
        self.remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_plain_handshake_swaps_identities() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = PlainHandshaker::with_identity([2u8; 32]);
        let server_task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            server.accept_handshake(&mut socket).await.unwrap()
        });

        let client = PlainHandshaker::with_identity([1u8; 32]);
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let client_session = client.handshake(&mut stream).await.unwrap();
        let server_session = server_task.await.unwrap();

        assert_eq!(client_session.remote_identity(), Identity([2u8; 32]));
        assert_eq!(server_session.remote_identity(), Identity([1u8; 32]));
    }

    #[test]
    fn test_plain_session_is_passthrough() {
        let mut session = PlainSession::new(Identity([0u8; 32]));
        assert_eq!(session.encrypt(b"abc").unwrap(), b"abc");
        assert_eq!(session.decrypt(b"abc").unwrap(), b"abc");
    }
}
