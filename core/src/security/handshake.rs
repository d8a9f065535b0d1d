//! Signed handshake and the session cipher it produces.
//!
//! Both sides run the same symmetric protocol over the fresh socket:
//!
//! 1. send `[own public key (32)][random challenge (32)]`, read the
//!    peer's;
//! 2. check the peer against the admission gate, if one is configured;
//! 3. send an Ed25519 signature over the peer's challenge, read the
//!    peer's signature and verify it over our own challenge.
//!
//! On success both sides derive the same shared secret (ed25519→x25519
//! ECDH) and wrap it in a [`CipherSession`]: XChaCha20-Poly1305 with the
//! 24-byte nonce appended to each ciphertext.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::protocol::error::{HandshakeError, SessionError};
use crate::protocol::session::{Handshaker, Session};
use crate::protocol::types::Identity;
use crate::security::gate::HandshakeGate;
use crate::security::keys::KeyPair;

/// Nonce length for XChaCha20-Poly1305
const NONCE_LEN: usize = 24;

/// Bytes of the handshake intro: public key + challenge.
const INTRO_LEN: usize = 64;

/// Handshaker that authenticates both peers with Ed25519 signatures and
/// derives an encrypted session.
pub struct SignedHandshaker {
    keypair: KeyPair,
    gate: Option<HandshakeGate>,
}

impl SignedHandshaker {
    /// Create a handshaker for the given identity, admitting any
    /// authenticated peer.
    pub fn new(keypair: KeyPair) -> Self {
        Self {
            keypair,
            gate: None,
        }
    }

    /// Restrict admitted peers to a gate's allowlist.
    pub fn with_gate(mut self, gate: HandshakeGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// The symmetric handshake body shared by both sides.
    async fn run(&self, stream: &mut TcpStream) -> Result<CipherSession, HandshakeError> {
        let signing_key = SigningKey::from_bytes(&self.keypair.private_key);

        let mut challenge = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut challenge);

        let mut intro = [0u8; INTRO_LEN];
        intro[..32].copy_from_slice(&self.keypair.public_key);
        intro[32..].copy_from_slice(&challenge);
        stream.write_all(&intro).await?;

        let mut peer_intro = [0u8; INTRO_LEN];
        stream.read_exact(&mut peer_intro).await?;

        let mut peer_key = [0u8; 32];
        peer_key.copy_from_slice(&peer_intro[..32]);
        let peer_challenge = &peer_intro[32..];

        let verifying_key = VerifyingKey::from_bytes(&peer_key)
            .map_err(|_| HandshakeError::Crypto("invalid peer public key".to_string()))?;
        let peer_identity = Identity(peer_key);

        if let Some(gate) = &self.gate {
            if !gate.is_allowed(&peer_identity) {
                return Err(HandshakeError::Rejected(format!(
                    "peer {} not in allowlist",
                    peer_identity
                )));
            }
        }

        let signature = signing_key.sign(peer_challenge);
        stream.write_all(&signature.to_bytes()).await?;

        let mut peer_signature = [0u8; 64];
        stream.read_exact(&mut peer_signature).await?;
        verifying_key
            .verify(&challenge, &Signature::from_bytes(&peer_signature))
            .map_err(|_| {
                HandshakeError::Crypto("challenge signature verification failed".to_string())
            })?;

        Ok(CipherSession::derive(&signing_key, &verifying_key))
    }
}

impl Handshaker for SignedHandshaker {
    type Session = CipherSession;

    async fn handshake(&self, stream: &mut TcpStream) -> Result<CipherSession, HandshakeError> {
        self.run(stream).await
    }

    async fn accept_handshake(
        &self,
        stream: &mut TcpStream,
    ) -> Result<CipherSession, HandshakeError> {
        self.run(stream).await
    }
}

/// Encrypted session derived from the handshake.
///
/// Sender and receiver derive the same shared secret from their
/// respective keypairs, so ciphertext produced on one end opens on the
/// other. The nonce is appended to the ciphertext (24 bytes at the end).
pub struct CipherSession {
    shared: crypto_box::ChaChaBox,
    remote: Identity,
}

impl CipherSession {
    /// Derive the shared box from our signing key and the peer's
    /// verifying key.
    fn derive(signing_key: &SigningKey, peer: &VerifyingKey) -> Self {
        // Convert ed25519 private key → x25519 secret key
        let x25519_secret = crypto_box::SecretKey::from(signing_key.to_scalar());
        // Convert ed25519 public key → x25519 public key
        let x25519_public = crypto_box::PublicKey::from(peer.to_montgomery());

        Self {
            shared: crypto_box::ChaChaBox::new(&x25519_public, &x25519_secret),
            remote: Identity(peer.to_bytes()),
        }
    }
}

impl Session for CipherSession {
    fn encrypt(&mut self, data: &[u8]) -> Result<Vec<u8>, SessionError> {
        use crypto_box::aead::{AeadCore, AeadInPlace, OsRng};

        let nonce = crypto_box::ChaChaBox::generate_nonce(&mut OsRng);
        let mut buffer = data.to_vec();
        self.shared
            .encrypt_in_place(&nonce, &[], &mut buffer)
            .map_err(|_| SessionError::new("encryption failed"))?;
        buffer.extend_from_slice(&nonce);
        Ok(buffer)
    }

    fn decrypt(&mut self, data: &[u8]) -> Result<Vec<u8>, SessionError> {
        use crypto_box::aead::AeadInPlace;

        if data.len() < NONCE_LEN {
            return Err(SessionError::new("ciphertext too short"));
        }

        let offset = data.len() - NONCE_LEN;
        let nonce: [u8; NONCE_LEN] = data[offset..]
            .try_into()
            .map_err(|_| SessionError::new("ciphertext too short"))?;

        let mut buffer = data[..offset].to_vec();
        self.shared
            .decrypt_in_place(&nonce.into(), &[], &mut buffer)
            .map_err(|_| SessionError::new("decryption failed (wrong key or tampered data)"))?;

        Ok(buffer)
    }

    fn remote_identity(&self) -> Identity {
        self.remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::keys::generate_key_pair;
    use tokio::net::TcpListener;

    async fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (accepted, _) = listener.accept().await.unwrap();
        (connect.await.unwrap(), accepted)
    }

    async fn handshake_pair(
        alice: SignedHandshaker,
        bob: SignedHandshaker,
    ) -> (
        Result<CipherSession, HandshakeError>,
        Result<CipherSession, HandshakeError>,
    ) {
        let (mut initiator, mut responder) = socket_pair().await;
        let bob_side =
            tokio::spawn(async move { bob.accept_handshake(&mut responder).await });
        let alice_side = alice.handshake(&mut initiator).await;
        (alice_side, bob_side.await.unwrap())
    }

    #[tokio::test]
    async fn test_mutual_handshake_establishes_sessions() {
        let alice_keys = generate_key_pair();
        let bob_keys = generate_key_pair();

        let (alice, bob) = handshake_pair(
            SignedHandshaker::new(alice_keys.clone()),
            SignedHandshaker::new(bob_keys.clone()),
        )
        .await;
        let mut alice = alice.unwrap();
        let mut bob = bob.unwrap();

        assert_eq!(alice.remote_identity(), Identity(bob_keys.public_key));
        assert_eq!(bob.remote_identity(), Identity(alice_keys.public_key));

        // Alice → Bob
        let ciphertext = alice.encrypt(b"halyard").unwrap();
        assert_ne!(ciphertext, b"halyard");
        assert_eq!(bob.decrypt(&ciphertext).unwrap(), b"halyard");

        // Bob → Alice
        let ciphertext = bob.encrypt(b"bowline").unwrap();
        assert_eq!(alice.decrypt(&ciphertext).unwrap(), b"bowline");
    }

    #[tokio::test]
    async fn test_mutual_gates_admit_each_other() {
        let alice_keys = generate_key_pair();
        let bob_keys = generate_key_pair();

        let alice = SignedHandshaker::new(alice_keys.clone())
            .with_gate(HandshakeGate::new().allow(bob_keys.public_key));
        let bob = SignedHandshaker::new(bob_keys.clone())
            .with_gate(HandshakeGate::new().allow(alice_keys.public_key));

        let (alice_session, bob_session) = handshake_pair(alice, bob).await;
        assert!(alice_session.is_ok());
        assert!(bob_session.is_ok());
    }

    #[tokio::test]
    async fn test_gate_rejects_unlisted_peer() {
        let alice_keys = generate_key_pair();
        let bob_keys = generate_key_pair();
        let stranger = generate_key_pair();

        let alice = SignedHandshaker::new(alice_keys)
            .with_gate(HandshakeGate::new().allow(bob_keys.public_key));
        // Bob only admits the stranger.
        let bob = SignedHandshaker::new(bob_keys)
            .with_gate(HandshakeGate::new().allow(stranger.public_key));

        let (alice_session, bob_session) = handshake_pair(alice, bob).await;
        assert!(matches!(bob_session, Err(HandshakeError::Rejected(_))));
        // Alice's side fails too: the peer hung up before signing.
        assert!(alice_session.is_err());
    }

    #[tokio::test]
    async fn test_tampered_ciphertext_fails() {
        let (alice, bob) = handshake_pair(
            SignedHandshaker::new(generate_key_pair()),
            SignedHandshaker::new(generate_key_pair()),
        )
        .await;
        let mut alice = alice.unwrap();
        let mut bob = bob.unwrap();

        let mut ciphertext = alice.encrypt(b"secret").unwrap();
        ciphertext[0] ^= 0xFF; // tamper
        assert!(bob.decrypt(&ciphertext).is_err());
    }

    #[tokio::test]
    async fn test_truncated_ciphertext_fails() {
        let (alice, _bob) = handshake_pair(
            SignedHandshaker::new(generate_key_pair()),
            SignedHandshaker::new(generate_key_pair()),
        )
        .await;
        let mut alice = alice.unwrap();

        assert!(alice.decrypt(&[0u8; 5]).is_err());
    }

    #[tokio::test]
    async fn test_empty_payload_roundtrip() {
        let (alice, bob) = handshake_pair(
            SignedHandshaker::new(generate_key_pair()),
            SignedHandshaker::new(generate_key_pair()),
        )
        .await;
        let mut alice = alice.unwrap();
        let mut bob = bob.unwrap();

        let ciphertext = alice.encrypt(b"").unwrap();
        assert_eq!(bob.decrypt(&ciphertext).unwrap(), b"");
    }
}
