//! Hawser Core
//!
//! An outbound TCP client that multiplexes authenticated, encrypted,
//! long-lived connections to remote peers addressed by `host:port`
//! strings. Sending to an address transparently establishes (or reuses)
//! a connection, performs the handshake, writes a length-prefixed
//! encrypted frame, awaits the typed acknowledgement, and hands it to a
//! listener. Every connection is supervised independently: dropped
//! connections are re-dialled, idle ones are reaped, and the most recent
//! inflight message is resent after a reconnect.
//!
//! # Module Structure
//!
//! - `protocol/`: Public interface (message model, config, errors, and
//!   the handshaker/session/listener extension points)
//! - `network/`: Wire framing and the client runtime (pool, per-address
//!   supervision, dial loop, framed exchange)
//! - `security/`: Cryptography (key pairs, signed handshake, admission
//!   gate)
//! - `testing/`: Test utilities (plaintext handshaker, echo server,
//!   recording listener)
//!
//! # Quick Start
//!
//! ```ignore
//! use hawser_core::{Client, ClientConfig, Message, MessageType, Version};
//! use hawser_core::security::{generate_key_pair, SignedHandshaker};
//! use tokio_util::sync::CancellationToken;
//!
//! let handshaker = SignedHandshaker::new(generate_key_pair());
//! let client = Client::new(ClientConfig::default(), handshaker, listener);
//!
//! let ctx = CancellationToken::new();
//! let msg = Message::new(Version::V1, MessageType::PUSH, b"ahoy".to_vec());
//! client.send(&ctx, "10.0.0.7:19333", msg).await?;
//! ```

// Public interface
pub mod protocol;

// Infrastructure modules
pub mod network;
pub mod security;
pub mod testing;

// Re-export main API types for convenience
pub use network::Client;
pub use protocol::{
    ClientConfig, Handshaker, HandshakeError, Identity, Listener, ListenerError, Message,
    MessageType, SendError, Session, SessionError, Version,
};
