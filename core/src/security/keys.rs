//! Ed25519 identity key pairs.

use std::fmt;

use ed25519_dalek::SigningKey;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::protocol::types::Identity;

/// An Ed25519 key pair identifying one endpoint.
///
/// The public half doubles as the endpoint's wire identity and travels
/// in every handshake intro. The private half signs handshake challenges
/// and is wiped from memory when the pair is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    /// Signing key. Never leaves this process.
    pub private_key: [u8; 32],
    /// Verification key, presented to peers.
    #[zeroize(skip)]
    pub public_key: [u8; 32],
}

impl KeyPair {
    /// Generate a fresh key pair seeded from the operating system's
    /// secure random number generator.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        let keypair = Self::from_bytes(&seed);
        seed.zeroize();
        keypair
    }

    /// Restore a key pair from stored private key bytes.
    pub fn from_bytes(private_key: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(private_key);
        Self {
            private_key: signing_key.to_bytes(),
            public_key: signing_key.verifying_key().to_bytes(),
        }
    }

    /// The wire identity this key pair presents to peers.
    pub fn identity(&self) -> Identity {
        Identity(self.public_key)
    }
}

// Keep the private key out of logs.
impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &"[REDACTED]")
            .field("public_key", &hex::encode(self.public_key))
            .finish()
    }
}

/// Generate a new random Ed25519 key pair.
pub fn generate_key_pair() -> KeyPair {
    KeyPair::generate()
}

/// Restore a key pair from stored private key bytes.
pub fn key_pair_from_bytes(private_key: &[u8; 32]) -> KeyPair {
    KeyPair::from_bytes(private_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, Verifier};

    #[test]
    fn test_generated_pairs_are_unique() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::generate();

        assert_ne!(kp1.private_key, kp1.public_key);
        assert_ne!(kp1.private_key, kp2.private_key);
        assert_ne!(kp1.public_key, kp2.public_key);
    }

    #[test]
    fn test_from_bytes_is_deterministic() {
        let original = KeyPair::generate();
        let restored = KeyPair::from_bytes(&original.private_key);

        assert_eq!(original.public_key, restored.public_key);
        assert_eq!(original.private_key, restored.private_key);
    }

    #[test]
    fn test_free_functions_match_constructors() {
        let kp = generate_key_pair();
        let restored = key_pair_from_bytes(&kp.private_key);
        assert_eq!(kp.public_key, restored.public_key);
    }

    #[test]
    fn test_identity_is_public_key() {
        let kp = KeyPair::generate();
        assert_eq!(kp.identity(), Identity(kp.public_key));
    }

    #[test]
    fn test_keys_sign_and_verify() {
        let kp = KeyPair::generate();
        let signing_key = SigningKey::from_bytes(&kp.private_key);
        let verifying_key = signing_key.verifying_key();

        let signature = signing_key.sign(b"challenge bytes");
        assert!(verifying_key.verify(b"challenge bytes", &signature).is_ok());
        assert!(verifying_key.verify(b"other bytes", &signature).is_err());
    }

    #[test]
    fn test_debug_does_not_expose_private_key() {
        let kp = KeyPair::generate();
        let debug_output = format!("{:?}", kp);

        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains(&hex::encode(kp.public_key)));
    }
}
