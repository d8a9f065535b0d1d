//! Per-address connection supervision.
//!
//! Each address the client sends to gets one [`ConnWorker`] task that owns
//! the socket, the handshake session, and the receive side of the address
//! queue. The worker dials, drains the queue through framed exchanges, and
//! re-dials on transient failures until it is cancelled or its budgets run
//! out. On exit it removes its own entry from the pool.

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{mpsc, Mutex};
use tokio::time::{timeout, Instant, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::network::client::ConnHandle;
use crate::network::dial::{dial, DialError};
use crate::network::wire::{self, WireError};
use crate::protocol::config::ClientConfig;
use crate::protocol::error::{ListenerError, SessionError};
use crate::protocol::session::{Handshaker, Listener, Session};
use crate::protocol::types::{Message, MessageType, Version};

/// Why a framed exchange failed.
#[derive(Debug)]
pub(crate) enum ExchangeError {
    /// Encrypting the request body failed.
    Encrypt(SessionError),
    /// Writing or flushing the request frame failed.
    Write(WireError),
    /// Reading the response frame failed.
    Read(WireError),
    /// Decrypting the response body failed.
    Decrypt(SessionError),
    /// The response carried a version this client does not speak.
    UnsupportedVersion(Version),
    /// The response was a request type; only servers receive those.
    UnexpectedRequest(MessageType),
    /// The response type was neither a request nor an acknowledgement.
    UnsupportedType(MessageType),
    /// The listener rejected the acknowledgement.
    Listener(ListenerError),
    /// The exchange did not complete within the time-to-live.
    TimedOut,
}

impl ExchangeError {
    /// Fatal errors retire the connection; everything else triggers a
    /// re-dial with the message preserved as the resend candidate.
    pub(crate) fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExchangeError::UnsupportedVersion(_)
                | ExchangeError::UnexpectedRequest(_)
                | ExchangeError::UnsupportedType(_)
                | ExchangeError::Listener(_)
        )
    }
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::Encrypt(e) => write!(f, "encrypting message: {}", e),
            ExchangeError::Write(e) => write!(f, "writing message: {}", e),
            ExchangeError::Read(e) => write!(f, "reading response: {}", e),
            ExchangeError::Decrypt(e) => write!(f, "decrypting response: {}", e),
            ExchangeError::UnsupportedVersion(v) => {
                write!(f, "unsupported response version {}", v)
            }
            ExchangeError::UnexpectedRequest(t) => {
                write!(f, "client does not expect request type {}", t)
            }
            ExchangeError::UnsupportedType(t) => write!(f, "unsupported response type {}", t),
            ExchangeError::Listener(e) => write!(f, "handling response: {}", e),
            ExchangeError::TimedOut => write!(f, "exchange timed out"),
        }
    }
}

/// Why a connection worker retired.
#[derive(Debug)]
pub(crate) enum RetireReason {
    /// The connection was cancelled via close.
    Cancelled,
    /// No message was dequeued for the time-to-live duration.
    IdleExpired,
    /// The dial budget ran out.
    Dial(DialError),
    /// A fatal exchange error (validation or listener failure).
    Exchange(ExchangeError),
}

impl fmt::Display for RetireReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetireReason::Cancelled => write!(f, "cancelled"),
            RetireReason::IdleExpired => write!(f, "time-to-live expired"),
            RetireReason::Dial(e) => write!(f, "connecting: {}", e),
            RetireReason::Exchange(e) => write!(f, "{}", e),
        }
    }
}

/// One request/response transaction over an established session.
///
/// Encrypts the body, writes and flushes the frame, reads exactly one
/// response frame, validates its header, decrypts the body after the
/// header checks (no cycles spent on invalid frames), and dispatches the
/// acknowledgement to the listener.
pub(crate) async fn exchange<L, S, R, W>(
    listener: &L,
    session: &mut S,
    reader: &mut R,
    writer: &mut W,
    msg: &Message,
) -> Result<(), ExchangeError>
where
    L: Listener,
    S: Session,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let ciphertext = session.encrypt(&msg.data).map_err(ExchangeError::Encrypt)?;
    let framed = Message {
        version: msg.version,
        msg_type: msg.msg_type,
        data: ciphertext,
    };
    wire::marshal(&framed, writer, wire::MAX_FRAME_LEN)
        .await
        .map_err(ExchangeError::Write)?;
    writer
        .flush()
        .await
        .map_err(|e| ExchangeError::Write(WireError::Io(e)))?;

    let mut response = wire::unmarshal(reader, wire::MAX_FRAME_LEN)
        .await
        .map_err(ExchangeError::Read)?;

    if !response.version.is_supported() {
        return Err(ExchangeError::UnsupportedVersion(response.version));
    }
    if response.msg_type.is_request() {
        return Err(ExchangeError::UnexpectedRequest(response.msg_type));
    }
    if !response.msg_type.is_ack() {
        return Err(ExchangeError::UnsupportedType(response.msg_type));
    }

    response.data = session
        .decrypt(&response.data)
        .map_err(ExchangeError::Decrypt)?;

    let from = session.remote_identity();
    let result = match response.msg_type {
        MessageType::PING_ACK => {
            listener.did_receive_ping_ack(response.version, response.data, from)
        }
        MessageType::PUSH_ACK => {
            listener.did_receive_push_ack(response.version, response.data, from)
        }
        MessageType::PULL_ACK => {
            listener.did_receive_pull_ack(response.version, response.data, from)
        }
        _ => unreachable!("response type validated above"),
    };
    result.map_err(ExchangeError::Listener)
}

/// The per-address supervision task.
pub(crate) struct ConnWorker<H, L> {
    pub(crate) addr: String,
    pub(crate) config: ClientConfig,
    pub(crate) handshaker: Arc<H>,
    pub(crate) listener: Arc<L>,
    pub(crate) cancel: CancellationToken,
    pub(crate) conns: Arc<Mutex<HashMap<String, ConnHandle>>>,
}

impl<H, L> ConnWorker<H, L>
where
    H: Handshaker,
    L: Listener,
{
    /// Keep the connection alive, re-establishing it on transient
    /// failures, until cancelled or until a budget runs out.
    ///
    /// The idle deadline lives here so that its remaining time is
    /// preserved across re-dials. Resetting a pinned [`Sleep`] re-arms it
    /// atomically; a stale expiry can never be observed after a reset.
    pub(crate) async fn run(self, mut queue: mpsc::Receiver<Message>) {
        let idle = tokio::time::sleep(self.config.time_to_live);
        tokio::pin!(idle);

        // The most recent message whose write was attempted. Resent after
        // a reconnect for at-least-once delivery of that one message.
        let mut last_sent: Option<Message> = None;

        loop {
            match self
                .run_once(&mut queue, idle.as_mut(), last_sent.take())
                .await
            {
                Ok(resend) => {
                    last_sent = Some(resend);
                }
                Err(RetireReason::Cancelled) => {
                    debug!(addr = %self.addr, "connection cancelled");
                    break;
                }
                Err(reason) => {
                    error!(addr = %self.addr, reason = %reason, "running connection");
                    break;
                }
            }
        }

        // Self-removal is idempotent with an external close: remove if
        // present, under the pool lock.
        self.conns.lock().await.remove(&self.addr);
        debug!(addr = %self.addr, "connection retired");
    }

    /// One connection lifetime: dial, resend the inflight candidate, then
    /// drain the queue.
    ///
    /// `Ok(msg)` means a transient failure happened after `msg`'s write
    /// was attempted; the caller re-dials and resends it. `Err` retires
    /// the worker. The socket is dropped on every exit path.
    async fn run_once(
        &self,
        queue: &mut mpsc::Receiver<Message>,
        mut idle: Pin<&mut Sleep>,
        last_sent: Option<Message>,
    ) -> Result<Message, RetireReason> {
        let (stream, mut session) = tokio::select! {
            _ = self.cancel.cancelled() => return Err(RetireReason::Cancelled),
            dialed = dial(&self.addr, &self.config, self.handshaker.as_ref()) => {
                dialed.map_err(RetireReason::Dial)?
            }
        };
        info!(addr = %self.addr, peer = %session.remote_identity(), "connected");

        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::with_capacity(wire::MAX_FRAME_LEN, read_half);
        let mut writer = BufWriter::with_capacity(wire::MAX_FRAME_LEN, write_half);

        if let Some(msg) = last_sent {
            info!(addr = %self.addr, "resending last message");
            match self
                .checked_exchange(&mut session, &mut reader, &mut writer, &msg)
                .await
            {
                Ok(()) => {}
                Err(err) if err.is_fatal() => return Err(RetireReason::Exchange(err)),
                Err(err) => {
                    warn!(addr = %self.addr, error = %err, "resending");
                    return Ok(msg);
                }
            }
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(RetireReason::Cancelled);
                }
                _ = idle.as_mut() => {
                    // No message was handed to this connection for the
                    // whole time-to-live.
                    return Err(RetireReason::IdleExpired);
                }
                next = queue.recv() => {
                    // The pool never closes the queue while the worker is
                    // live; observing a closed queue means the control
                    // flow around handles and cancellation was broken.
                    let msg = next.expect("send queue closed while connection is live");

                    // The connection is in use again.
                    idle.as_mut().reset(Instant::now() + self.config.time_to_live);

                    match self
                        .checked_exchange(&mut session, &mut reader, &mut writer, &msg)
                        .await
                    {
                        Ok(()) => {}
                        Err(err) if err.is_fatal() => {
                            return Err(RetireReason::Exchange(err));
                        }
                        Err(err) => {
                            // The message is preserved and resent on the
                            // next connection; pending messages stay
                            // queued.
                            warn!(addr = %self.addr, error = %err, "writing");
                            return Ok(msg);
                        }
                    }
                }
            }
        }
    }

    /// Run one exchange under the time-to-live I/O deadline.
    async fn checked_exchange<S, R, W>(
        &self,
        session: &mut S,
        reader: &mut R,
        writer: &mut W,
        msg: &Message,
    ) -> Result<(), ExchangeError>
    where
        S: Session,
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        match timeout(
            self.config.time_to_live,
            exchange(self.listener.as_ref(), session, reader, writer, msg),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ExchangeError::TimedOut),
        }
    }
}
