//! Dial loop with pacing and an attempt budget.

use std::cmp;
use std::fmt;

use tokio::net::TcpStream;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{error, warn};

use crate::protocol::config::ClientConfig;
use crate::protocol::session::Handshaker;

/// Error type for dial attempts.
#[derive(Debug)]
pub enum DialError {
    /// The attempt budget was spent without a successful dial.
    Exhausted {
        /// Attempts made before giving up.
        attempts: usize,
        /// The failure that ended the last attempt.
        last: String,
    },
    /// No connection was established within the time-to-live budget.
    TimeToLiveExpired,
}

impl fmt::Display for DialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialError::Exhausted { attempts, last } => {
                write!(f, "exceeded max dial attempts ({}): {}", attempts, last)
            }
            DialError::TimeToLiveExpired => {
                write!(f, "no dial attempt succeeded within the time-to-live")
            }
        }
    }
}

impl std::error::Error for DialError {}

/// Dial an address and perform the handshake.
///
/// Attempts once every `time_to_dial`, until success or until the
/// `time_to_live` budget expires. A failed dial waits out the remainder
/// of its `time_to_dial` window before the next attempt, so reconnect
/// storms are paced even against an address that refuses immediately.
///
/// A failed handshake drops the socket and loops without pacing: the peer
/// was reachable, it may just need a restart to accept us.
pub(crate) async fn dial<H>(
    addr: &str,
    config: &ClientConfig,
    handshaker: &H,
) -> Result<(TcpStream, H::Session), DialError>
where
    H: Handshaker,
{
    let deadline = Instant::now() + config.time_to_live;
    let mut attempts: usize = 0;

    loop {
        let now = Instant::now();
        if now >= deadline {
            return Err(DialError::TimeToLiveExpired);
        }

        attempts += 1;

        // One attempt gets a time_to_dial window, clamped to whatever is
        // left of the overall budget.
        let attempt_deadline = cmp::min(now + config.time_to_dial, deadline);
        let failure = match timeout_at(attempt_deadline, TcpStream::connect(addr)).await {
            Ok(Ok(mut stream)) => {
                let handshake = timeout_at(deadline, handshaker.handshake(&mut stream)).await;
                match handshake {
                    Ok(Ok(session)) => return Ok((stream, session)),
                    Ok(Err(err)) => {
                        error!(addr, error = %err, "handshake failed");
                        continue;
                    }
                    Err(_) => {
                        error!(addr, "handshake timed out");
                        continue;
                    }
                }
            }
            Ok(Err(err)) => err.to_string(),
            Err(_) => "dial attempt timed out".to_string(),
        };

        // Wait until the attempt window has fully passed, otherwise we
        // might re-dial too quickly.
        sleep_until(attempt_deadline).await;

        if attempts >= config.max_dial_attempts {
            return Err(DialError::Exhausted {
                attempts,
                last: failure,
            });
        }

        warn!(addr, attempts, error = %failure, "dial failed");
    }
}
