//! Public interface: message model, configuration, errors, and the
//! handshaker/session/listener extension points.

pub mod config;
pub mod error;
pub mod session;
pub mod types;

pub use config::ClientConfig;
pub use error::{HandshakeError, ListenerError, SendError, SessionError};
pub use session::{Handshaker, Listener, Session};
pub use types::{Identity, Message, MessageType, Version};
