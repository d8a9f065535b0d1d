//! Wire framing for protocol messages.
//!
//! Each message is framed as `[version][type][len: u32 BE][data]`.
//! Version and type bytes pass through the codec untouched; validating
//! them is the exchange layer's job.

use std::fmt;
use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::types::{Message, MessageType, Version};

/// Frame header size in bytes: 1 byte version + 1 byte type + 4 byte length.
pub const FRAME_HEADER_LEN: usize = 6;

/// Largest frame the codec will write or accept (1 MiB). Connection
/// buffers are sized to this, so it also bounds per-connection memory.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Errors when encoding or decoding a frame.
#[derive(Debug)]
pub enum WireError {
    /// Frame exceeds the caller's size limit.
    FrameTooLarge {
        /// Total frame size (header + payload).
        len: usize,
        /// The limit that was exceeded.
        max: usize,
    },
    /// Underlying stream failure.
    Io(io::Error),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::FrameTooLarge { len, max } => {
                write!(f, "frame too large: {} bytes exceeds {}", len, max)
            }
            WireError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WireError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WireError {
    fn from(e: io::Error) -> Self {
        WireError::Io(e)
    }
}

/// Write a framed message and return the number of bytes written.
///
/// The caller flushes; a single exchange may batch the frame with other
/// writer state.
pub async fn marshal<W>(msg: &Message, w: &mut W, max_bytes: usize) -> Result<usize, WireError>
where
    W: AsyncWrite + Unpin,
{
    let total = FRAME_HEADER_LEN + msg.data.len();
    if total > max_bytes {
        return Err(WireError::FrameTooLarge {
            len: total,
            max: max_bytes,
        });
    }

    let mut header = [0u8; FRAME_HEADER_LEN];
    header[0] = msg.version.0;
    header[1] = msg.msg_type.0;
    header[2..6].copy_from_slice(&(msg.data.len() as u32).to_be_bytes());

    w.write_all(&header).await?;
    w.write_all(&msg.data).await?;
    Ok(total)
}

/// Read one framed message.
///
/// The declared payload length is checked against `max_bytes` before any
/// allocation happens.
pub async fn unmarshal<R>(r: &mut R, max_bytes: usize) -> Result<Message, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    r.read_exact(&mut header).await?;

    let len = u32::from_be_bytes([header[2], header[3], header[4], header[5]]) as usize;
    let total = FRAME_HEADER_LEN + len;
    if total > max_bytes {
        return Err(WireError::FrameTooLarge {
            len: total,
            max: max_bytes,
        });
    }

    let mut data = vec![0u8; len];
    r.read_exact(&mut data).await?;

    Ok(Message {
        version: Version(header[0]),
        msg_type: MessageType(header[1]),
        data,
    })
}
