//! Testing utilities for the client
//!
//! Provides an in-process harness for exercising the client against real
//! TCP sockets without a full deployment.
//!
//! # Example
//!
//! ```ignore
//! let (server, mut received) = EchoServer::spawn(PlainHandshaker::new()).await?;
//! let (listener, mut acks) = RecordingListener::new();
//! let client = Client::new(ClientConfig::for_testing(), PlainHandshaker::new(), listener);
//!
//! let ctx = CancellationToken::new();
//! client.send(&ctx, &server.addr(), msg).await?;
//!
//! let seen = received.recv().await;   // what the server decrypted
//! let ack = acks.recv().await;        // what the listener was handed
//! ```

pub mod listener;
pub mod plain;
pub mod server;

pub use listener::{AckRecord, RecordingListener};
pub use plain::{PlainHandshaker, PlainSession};
pub use server::{echo_connection, EchoServer};
