//! Listener that records every acknowledgement it is handed.

use tokio::sync::mpsc;

use crate::protocol::error::ListenerError;
use crate::protocol::session::Listener;
use crate::protocol::types::{Identity, MessageType, Version};

/// One acknowledgement as dispatched to the listener.
#[derive(Debug, Clone)]
pub struct AckRecord {
    /// Which acknowledgement callback fired.
    pub msg_type: MessageType,
    /// Version of the response.
    pub version: Version,
    /// Decrypted response body.
    pub data: Vec<u8>,
    /// Peer the acknowledgement came from.
    pub from: Identity,
}

/// Listener that forwards every acknowledgement onto a channel.
pub struct RecordingListener {
    tx: mpsc::UnboundedSender<AckRecord>,
}

impl RecordingListener {
    /// Create a recording listener and the receive side of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AckRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn record(&self, msg_type: MessageType, version: Version, data: Vec<u8>, from: Identity) {
        // A dropped receiver just means the test stopped looking.
        let _ = self.tx.send(AckRecord {
            msg_type,
            version,
            data,
            from,
        });
    }
}

impl Listener for RecordingListener {
    fn did_receive_ping_ack(
        &self,
        version: Version,
        data: Vec<u8>,
        from: Identity,
    ) -> Result<(), ListenerError> {
        self.record(MessageType::PING_ACK, version, data, from);
        Ok(())
    }

    fn did_receive_push_ack(
        &self,
        version: Version,
        data: Vec<u8>,
        from: Identity,
    ) -> Result<(), ListenerError> {
        self.record(MessageType::PUSH_ACK, version, data, from);
        Ok(())
    }

    fn did_receive_pull_ack(
        &self,
        version: Version,
        data: Vec<u8>,
        from: Identity,
    ) -> Result<(), ListenerError> {
        self.record(MessageType::PULL_ACK, version, data, from);
        Ok(())
    }
}
