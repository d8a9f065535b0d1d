//! Public error types

use std::fmt;

/// Errors surfaced to callers of [`Client::send`](crate::Client::send).
///
/// All other failures (dial, handshake, exchange) are handled inside the
/// per-address connection and only show up in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The pool is at its connection limit and the address has no live
    /// connection.
    CapacityExceeded,
    /// The caller's cancellation fired before the message was buffered.
    Cancelled,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::CapacityExceeded => write!(f, "max outbound connections exceeded"),
            SendError::Cancelled => write!(f, "send cancelled"),
        }
    }
}

impl std::error::Error for SendError {}

/// Errors produced by a [`Handshaker`](crate::Handshaker).
#[derive(Debug)]
pub enum HandshakeError {
    /// I/O failure on the underlying socket.
    Io(String),
    /// The peer authenticated but is not allowed to connect.
    Rejected(String),
    /// Key material or signature verification failure.
    Crypto(String),
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeError::Io(e) => write!(f, "handshake io error: {}", e),
            HandshakeError::Rejected(e) => write!(f, "handshake rejected: {}", e),
            HandshakeError::Crypto(e) => write!(f, "handshake crypto error: {}", e),
        }
    }
}

impl std::error::Error for HandshakeError {}

impl From<std::io::Error> for HandshakeError {
    fn from(e: std::io::Error) -> Self {
        HandshakeError::Io(e.to_string())
    }
}

/// Error produced by [`Session::encrypt`](crate::Session::encrypt) or
/// [`Session::decrypt`](crate::Session::decrypt).
#[derive(Debug, Clone)]
pub struct SessionError(String);

impl SessionError {
    /// Create a new session error.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SessionError {}

/// Error returned by a [`Listener`](crate::Listener) callback.
///
/// Any listener error kills the session that delivered the
/// acknowledgement.
#[derive(Debug, Clone)]
pub struct ListenerError(String);

impl ListenerError {
    /// Create a new listener error.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ListenerError {}
