//! Client configuration

use std::time::Duration;

/// Time-to-live for connections: 1 hour.
pub const DEFAULT_TIME_TO_LIVE: Duration = Duration::from_secs(60 * 60);

/// Per-attempt dial timeout: 15 seconds.
pub const DEFAULT_TIME_TO_DIAL: Duration = Duration::from_secs(15);

/// Dial attempts per reconnect cycle: 1.
pub const DEFAULT_MAX_DIAL_ATTEMPTS: usize = 1;

/// Messages buffered per address: 4096.
pub const DEFAULT_MAX_CAPACITY: usize = 4096;

/// Maximum live outbound connections: 128.
pub const DEFAULT_MAX_CONNECTIONS: usize = 128;

/// Configuration for the client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long a connection may sit idle before it is retired, and the
    /// total budget for (re-)dialling a connection. Choosing this value,
    /// together with which addresses get sent to, is the main lever for
    /// bounding how many resources the client spends keeping connections
    /// alive.
    pub time_to_live: Duration,

    /// Window for a single dial attempt. A failed attempt also waits out
    /// the remainder of this window before the next attempt, so it is the
    /// minimum spacing between attempts.
    pub time_to_dial: Duration,

    /// Dial attempts per reconnect cycle before the connection is dropped.
    /// A value of 0 behaves like 1: the first attempt is always made
    /// before the budget is consulted.
    pub max_dial_attempts: usize,

    /// Messages that can be buffered per address while its connection is
    /// being (re-)established. Senders block once the buffer is full.
    pub max_capacity: usize,

    /// Maximum number of live outbound connections. Sends to new
    /// addresses beyond this limit are rejected.
    pub max_connections: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            time_to_live: DEFAULT_TIME_TO_LIVE,
            time_to_dial: DEFAULT_TIME_TO_DIAL,
            max_dial_attempts: DEFAULT_MAX_DIAL_ATTEMPTS,
            max_capacity: DEFAULT_MAX_CAPACITY,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl ClientConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection time-to-live
    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = ttl;
        self
    }

    /// Set the per-attempt dial timeout
    pub fn with_time_to_dial(mut self, ttd: Duration) -> Self {
        self.time_to_dial = ttd;
        self
    }

    /// Set the dial attempt budget
    pub fn with_max_dial_attempts(mut self, attempts: usize) -> Self {
        self.max_dial_attempts = attempts;
        self
    }

    /// Set the per-address message buffer size
    pub fn with_max_capacity(mut self, capacity: usize) -> Self {
        self.max_capacity = capacity;
        self
    }

    /// Set the live connection cap
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Configuration for testing (short timeouts, small buffers)
    pub fn for_testing() -> Self {
        Self {
            time_to_live: Duration::from_secs(5),
            time_to_dial: Duration::from_millis(250),
            max_dial_attempts: 3,
            max_capacity: 64,
            max_connections: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.time_to_live, Duration::from_secs(3600));
        assert_eq!(config.time_to_dial, Duration::from_secs(15));
        assert_eq!(config.max_dial_attempts, 1);
        assert_eq!(config.max_capacity, 4096);
        assert_eq!(config.max_connections, 128);
    }

    #[test]
    fn test_new_equals_default() {
        let config1 = ClientConfig::new();
        let config2 = ClientConfig::default();
        assert_eq!(config1.time_to_live, config2.time_to_live);
        assert_eq!(config1.max_capacity, config2.max_capacity);
        assert_eq!(config1.max_connections, config2.max_connections);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ClientConfig::new()
            .with_time_to_live(Duration::from_secs(10))
            .with_time_to_dial(Duration::from_millis(100))
            .with_max_dial_attempts(5)
            .with_max_capacity(8)
            .with_max_connections(2);

        assert_eq!(config.time_to_live, Duration::from_secs(10));
        assert_eq!(config.time_to_dial, Duration::from_millis(100));
        assert_eq!(config.max_dial_attempts, 5);
        assert_eq!(config.max_capacity, 8);
        assert_eq!(config.max_connections, 2);
    }

    #[test]
    fn test_testing_config_is_fast() {
        let config = ClientConfig::for_testing();
        assert!(config.time_to_live <= Duration::from_secs(10));
        assert!(config.time_to_dial <= Duration::from_secs(1));
        assert!(config.max_capacity <= 1024);
    }

    #[test]
    fn test_config_clone() {
        let config1 = ClientConfig::new().with_max_capacity(7);
        let config2 = config1.clone();
        assert_eq!(config1.max_capacity, config2.max_capacity);
    }
}
