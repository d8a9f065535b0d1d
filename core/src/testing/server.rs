//! Ack-echoing TCP server for exercising the client end to end.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::network::wire::{self, WireError};
use crate::protocol::session::{Handshaker, Session};
use crate::protocol::types::Message;

/// A test server that answers every request with the matching ack.
///
/// Each accepted connection is handshaken with the responder side of the
/// provided handshaker, then served by [`echo_connection`]: requests are
/// decrypted, recorded on the receive channel, and answered with an ack
/// of the same version and an empty (encrypted) body.
pub struct EchoServer {
    addr: String,
    cancel: CancellationToken,
}

impl EchoServer {
    /// Bind an ephemeral loopback port and start serving.
    pub async fn spawn<H>(
        handshaker: H,
    ) -> io::Result<(Self, mpsc::UnboundedReceiver<Message>)>
    where
        H: Handshaker,
    {
        Self::spawn_on("127.0.0.1:0", handshaker).await
    }

    /// Bind a specific address and start serving. Useful for restarting a
    /// server on the port a client already knows.
    pub async fn spawn_on<H>(
        addr: &str,
        handshaker: H,
    ) -> io::Result<(Self, mpsc::UnboundedReceiver<Message>)>
    where
        H: Handshaker,
    {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?.to_string();
        let cancel = CancellationToken::new();
        let (received_tx, received_rx) = mpsc::unbounded_channel();

        let handshaker = Arc::new(handshaker);
        let accept_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                let (mut socket, peer) = tokio::select! {
                    _ = accept_cancel.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    },
                };
                debug!(peer = %peer, "server accepted connection");

                let handshaker = handshaker.clone();
                let received_tx = received_tx.clone();
                let conn_cancel = accept_cancel.clone();
                tokio::spawn(async move {
                    let session = match handshaker.accept_handshake(&mut socket).await {
                        Ok(session) => session,
                        Err(e) => {
                            debug!(error = %e, "server handshake failed");
                            return;
                        }
                    };
                    tokio::select! {
                        _ = conn_cancel.cancelled() => {}
                        result = echo_connection(socket, session, received_tx) => {
                            if let Err(e) = result {
                                debug!(error = %e, "echo connection ended");
                            }
                        }
                    }
                });
            }
            debug!("echo server stopped");
        });

        Ok((Self { addr, cancel }, received_rx))
    }

    /// The address the server is listening on.
    pub fn addr(&self) -> String {
        self.addr.clone()
    }

    /// Stop accepting and drop every open connection.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Serve one established connection: decrypt and record each request,
/// reply with the matching ack of equal version and empty body.
///
/// Returns `Ok(())` when the peer closes the connection cleanly.
pub async fn echo_connection<S>(
    stream: TcpStream,
    mut session: S,
    received: mpsc::UnboundedSender<Message>,
) -> io::Result<()>
where
    S: Session,
{
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut writer = BufWriter::new(write_half);

    loop {
        let msg = match wire::unmarshal(&mut reader, wire::MAX_FRAME_LEN).await {
            Ok(msg) => msg,
            Err(WireError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(WireError::Io(e)) => return Err(e),
            Err(other) => return Err(io::Error::new(io::ErrorKind::InvalidData, other.to_string())),
        };

        let Some(ack_type) = msg.msg_type.ack() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("server expected a request, got {}", msg.msg_type),
            ));
        };

        let plaintext = session
            .decrypt(&msg.data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        // A dropped receiver just means the test stopped looking.
        let _ = received.send(Message::new(msg.version, msg.msg_type, plaintext));

        let body = session
            .encrypt(&[])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        let reply = Message::new(msg.version, ack_type, body);
        wire::marshal(&reply, &mut writer, wire::MAX_FRAME_LEN)
            .await
            .map_err(|e| match e {
                WireError::Io(e) => e,
                other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
            })?;
        writer.flush().await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{MessageType, Version};
    use crate::testing::PlainHandshaker;

    #[tokio::test]
    async fn test_echo_server_answers_with_matching_ack() {
        let (server, mut received) = EchoServer::spawn(PlainHandshaker::new()).await.unwrap();

        let client_hs = PlainHandshaker::with_identity([1u8; 32]);
        let mut stream = TcpStream::connect(&server.addr()).await.unwrap();
        let mut session = client_hs.handshake(&mut stream).await.unwrap();

        let request = Message::new(Version::V1, MessageType::PULL, b"give".to_vec());
        let framed = Message::new(
            Version::V1,
            MessageType::PULL,
            session.encrypt(b"give").unwrap(),
        );
        wire::marshal(&framed, &mut stream, wire::MAX_FRAME_LEN)
            .await
            .unwrap();
        stream.flush().await.unwrap();

        let reply = wire::unmarshal(&mut stream, wire::MAX_FRAME_LEN)
            .await
            .unwrap();
        assert_eq!(reply.msg_type, MessageType::PULL_ACK);
        assert_eq!(reply.version, Version::V1);
        assert!(session.decrypt(&reply.data).unwrap().is_empty());

        let seen = received.recv().await.unwrap();
        assert_eq!(seen, request);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_echo_server_drops_non_request_frames() {
        let (server, mut received) = EchoServer::spawn(PlainHandshaker::new()).await.unwrap();

        let client_hs = PlainHandshaker::new();
        let mut stream = TcpStream::connect(&server.addr()).await.unwrap();
        let _session = client_hs.handshake(&mut stream).await.unwrap();

        let bogus = Message::new(Version::V1, MessageType::PING_ACK, Vec::new());
        wire::marshal(&bogus, &mut stream, wire::MAX_FRAME_LEN)
            .await
            .unwrap();
        stream.flush().await.unwrap();

        // The connection is dropped without recording anything.
        let reply = wire::unmarshal(&mut stream, wire::MAX_FRAME_LEN).await;
        assert!(reply.is_err());
        assert!(received.try_recv().is_err());

        server.shutdown();
    }
}
