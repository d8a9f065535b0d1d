//! Core message model shared by the client and the wire codec.

use std::fmt;

/// Protocol version carried in every frame.
///
/// Kept as a raw byte so that unknown versions survive the codec and are
/// rejected by the exchange layer instead of failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version(pub u8);

impl Version {
    /// Version 1, the only version this client currently speaks.
    pub const V1: Version = Version(1);

    /// Whether this client knows how to handle the version.
    pub fn is_supported(&self) -> bool {
        *self == Version::V1
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Version::V1 => write!(f, "v1"),
            Version(other) => write!(f, "unknown({})", other),
        }
    }
}

/// Message type carried in every frame.
///
/// Requests travel client-to-server, acknowledgements server-to-client.
/// Like [`Version`], a raw byte so unknown types reach the validation
/// layer intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageType(pub u8);

impl MessageType {
    /// Ping request.
    pub const PING: MessageType = MessageType(1);
    /// Push request.
    pub const PUSH: MessageType = MessageType(2);
    /// Pull request.
    pub const PULL: MessageType = MessageType(3);
    /// Acknowledgement of a ping.
    pub const PING_ACK: MessageType = MessageType(4);
    /// Acknowledgement of a push.
    pub const PUSH_ACK: MessageType = MessageType(5);
    /// Acknowledgement of a pull.
    pub const PULL_ACK: MessageType = MessageType(6);

    /// Whether this is a request type.
    pub fn is_request(&self) -> bool {
        matches!(
            *self,
            MessageType::PING | MessageType::PUSH | MessageType::PULL
        )
    }

    /// Whether this is an acknowledgement type.
    pub fn is_ack(&self) -> bool {
        matches!(
            *self,
            MessageType::PING_ACK | MessageType::PUSH_ACK | MessageType::PULL_ACK
        )
    }

    /// The acknowledgement type answering this request type, if any.
    pub fn ack(&self) -> Option<MessageType> {
        match *self {
            MessageType::PING => Some(MessageType::PING_ACK),
            MessageType::PUSH => Some(MessageType::PUSH_ACK),
            MessageType::PULL => Some(MessageType::PULL_ACK),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MessageType::PING => write!(f, "ping"),
            MessageType::PUSH => write!(f, "push"),
            MessageType::PULL => write!(f, "pull"),
            MessageType::PING_ACK => write!(f, "ping-ack"),
            MessageType::PUSH_ACK => write!(f, "push-ack"),
            MessageType::PULL_ACK => write!(f, "pull-ack"),
            MessageType(other) => write!(f, "unknown({})", other),
        }
    }
}

/// A protocol message.
///
/// `data` holds the plaintext body on the application side of the client
/// and ciphertext on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Protocol version of this message.
    pub version: Version,
    /// Request or acknowledgement type.
    pub msg_type: MessageType,
    /// Opaque body bytes.
    pub data: Vec<u8>,
}

impl Message {
    /// Create a new message.
    pub fn new(version: Version, msg_type: MessageType, data: Vec<u8>) -> Self {
        Self {
            version,
            msg_type,
            data,
        }
    }
}

/// Identity of a remote peer, as established by the handshake.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity(pub [u8; 32]);

impl Identity {
    /// The raw identity bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_version_support() {
        assert!(Version::V1.is_supported());
        assert!(!Version(0).is_supported());
        assert!(!Version(200).is_supported());
    }

    #[test]
    fn test_version_display() {
        assert_eq!(Version::V1.to_string(), "v1");
        assert_eq!(Version(9).to_string(), "unknown(9)");
    }

    #[test]
    fn test_request_ack_classification() {
        for ty in [MessageType::PING, MessageType::PUSH, MessageType::PULL] {
            assert!(ty.is_request());
            assert!(!ty.is_ack());
        }
        for ty in [
            MessageType::PING_ACK,
            MessageType::PUSH_ACK,
            MessageType::PULL_ACK,
        ] {
            assert!(ty.is_ack());
            assert!(!ty.is_request());
        }
        assert!(!MessageType(0).is_request());
        assert!(!MessageType(0).is_ack());
        assert!(!MessageType(77).is_ack());
    }

    #[test]
    fn test_ack_mapping() {
        assert_eq!(MessageType::PING.ack(), Some(MessageType::PING_ACK));
        assert_eq!(MessageType::PUSH.ack(), Some(MessageType::PUSH_ACK));
        assert_eq!(MessageType::PULL.ack(), Some(MessageType::PULL_ACK));
        assert_eq!(MessageType::PING_ACK.ack(), None);
        assert_eq!(MessageType(42).ack(), None);
    }

    #[test]
    fn test_message_type_display() {
        assert_eq!(MessageType::PING.to_string(), "ping");
        assert_eq!(MessageType::PULL_ACK.to_string(), "pull-ack");
        assert_eq!(MessageType(42).to_string(), "unknown(42)");
    }

    #[test]
    fn test_identity_display_is_hex() {
        let id = Identity([0xAB; 32]);
        assert_eq!(id.to_string(), "ab".repeat(32));
        assert!(format!("{:?}", id).starts_with("Identity(ab"));
    }

    #[test]
    fn test_message_new() {
        let msg = Message::new(Version::V1, MessageType::PUSH, vec![1, 2, 3]);
        assert_eq!(msg.version, Version::V1);
        assert_eq!(msg.msg_type, MessageType::PUSH);
        assert_eq!(msg.data, vec![1, 2, 3]);
    }

    proptest! {
        #[test]
        fn request_and_ack_are_disjoint(byte in any::<u8>()) {
            let ty = MessageType(byte);
            prop_assert!(!(ty.is_request() && ty.is_ack()));
        }

        #[test]
        fn ack_mapping_only_for_requests(byte in any::<u8>()) {
            let ty = MessageType(byte);
            prop_assert_eq!(ty.ack().is_some(), ty.is_request());
            if let Some(ack) = ty.ack() {
                prop_assert!(ack.is_ack());
            }
        }
    }
}
