//! Connection-multiplexing outbound client.
//!
//! Maps addresses to live connection tasks, admits new connections up to
//! a configured cap, and routes sends into the per-address queues.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::network::conn::ConnWorker;
use crate::protocol::config::ClientConfig;
use crate::protocol::error::SendError;
use crate::protocol::session::{Handshaker, Listener};
use crate::protocol::types::Message;

/// Handle to a live per-address connection task.
///
/// Held by the pool; the task itself owns the socket, the session, and
/// the receive side of the queue.
pub(crate) struct ConnHandle {
    pub(crate) queue: mpsc::Sender<Message>,
    pub(crate) cancel: CancellationToken,
}

/// An outbound TCP client maintaining one supervised, encrypted
/// connection per remote address.
///
/// Cheap to clone; all clones share the same pool.
pub struct Client<H, L> {
    config: ClientConfig,
    handshaker: Arc<H>,
    listener: Arc<L>,
    conns: Arc<Mutex<HashMap<String, ConnHandle>>>,
}

impl<H, L> Clone for Client<H, L> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            handshaker: self.handshaker.clone(),
            listener: self.listener.clone(),
            conns: self.conns.clone(),
        }
    }
}

impl<H, L> Client<H, L>
where
    H: Handshaker,
    L: Listener,
{
    /// Create a new client.
    pub fn new(config: ClientConfig, handshaker: H, listener: L) -> Self {
        Self {
            config,
            handshaker: Arc::new(handshaker),
            listener: Arc::new(listener),
            conns: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The configuration this client runs with. Mutating a copy has no
    /// effect on the running client.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a message to an address.
    ///
    /// If no connection to the address exists, one is established and
    /// kept alive; otherwise the existing one is reused. The message is
    /// buffered onto the address queue: when the queue is full this
    /// blocks until there is room or `ctx` is cancelled.
    pub async fn send(
        &self,
        ctx: &CancellationToken,
        addr: &str,
        msg: Message,
    ) -> Result<(), SendError> {
        let queue = {
            let mut conns = self.conns.lock().await;
            match conns.get(addr) {
                Some(handle) => handle.queue.clone(),
                None => {
                    if conns.len() >= self.config.max_connections {
                        return Err(SendError::CapacityExceeded);
                    }
                    let handle = self.start_conn(addr);
                    let queue = handle.queue.clone();
                    conns.insert(addr.to_string(), handle);
                    queue
                }
            }
        };

        // The lock is released before the enqueue: a full queue blocks,
        // and a blocked send to one address must not serialize sends to
        // other addresses.
        tokio::select! {
            biased;

            _ = ctx.cancelled() => Err(SendError::Cancelled),
            sent = queue.send(msg) => {
                // A closed queue means the connection retired between the
                // handle lookup and the enqueue; its cancel has fired.
                sent.map_err(|_| SendError::Cancelled)
            }
        }
    }

    /// Close the connection to an address, if any. Other connections are
    /// kept alive. Idempotent.
    pub async fn close(&self, addr: &str) {
        let mut conns = self.conns.lock().await;
        if let Some(handle) = conns.remove(addr) {
            handle.cancel.cancel();
            debug!(addr, "connection closed");
        }
    }

    /// Close every connection this client maintains.
    ///
    /// Cancels all entries and swaps in an empty map under a single lock
    /// acquisition.
    pub async fn close_all(&self) {
        let mut conns = self.conns.lock().await;
        for handle in conns.values() {
            handle.cancel.cancel();
        }
        *conns = HashMap::new();
        debug!("all connections closed");
    }

    /// Spawn the per-address task and hand back its pool handle.
    fn start_conn(&self, addr: &str) -> ConnHandle {
        // A zero capacity would make the queue constructor panic; treat
        // it as the smallest buffered queue.
        let (queue, rx) = mpsc::channel(self.config.max_capacity.max(1));
        let cancel = CancellationToken::new();

        let worker = ConnWorker {
            addr: addr.to_string(),
            config: self.config.clone(),
            handshaker: self.handshaker.clone(),
            listener: self.listener.clone(),
            cancel: cancel.clone(),
            conns: self.conns.clone(),
        };
        tokio::spawn(worker.run(rx));
        debug!(addr, "connection started");

        ConnHandle { queue, cancel }
    }
}
