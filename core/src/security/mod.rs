//! Cryptography: identity key pairs, the signed handshake, and the
//! handshake admission gate.

pub mod gate;
pub mod handshake;
pub mod keys;

pub use gate::HandshakeGate;
pub use handshake::{CipherSession, SignedHandshaker};
pub use keys::{generate_key_pair, key_pair_from_bytes, KeyPair};
