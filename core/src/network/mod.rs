//! Wire framing and the client runtime: connection pool, per-address
//! supervision, dialling, and the framed request/response exchange.

pub mod client;
pub(crate) mod conn;
pub mod dial;
pub mod wire;

pub use client::Client;
pub use dial::DialError;
pub use wire::{WireError, FRAME_HEADER_LEN, MAX_FRAME_LEN};
