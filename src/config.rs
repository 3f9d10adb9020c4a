//! Configuration for framehub
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{HubError, Result};
use crate::protocol::{HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// Main configuration for a hub instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrently connected clients
    pub max_clients: usize,

    /// Delay before re-checking the client count once the cap is reached (milliseconds)
    pub accept_backoff_ms: u64,

    /// Poll interval of the non-blocking accept loop (milliseconds)
    pub accept_poll_ms: u64,

    /// Size of a single read from a connection; frames may span several reads
    pub recv_buffer_size: usize,

    /// Connection write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,

    /// TCP keepalive parameters applied once per accepted socket
    pub keepalive: KeepaliveConfig,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// How client ids are assigned at accept time
    pub id_policy: IdPolicy,

    /// Which commands an unnamed connection may issue
    pub registration_gate: RegistrationGate,

    /// Shape of the reply to a `list` command
    pub list_style: ListStyle,
}

/// TCP keepalive settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveConfig {
    /// Idle time before the first keepalive packet
    pub idle: Duration,

    /// Interval between keepalive packets
    pub interval: Duration,

    /// Unanswered keepalive packets before the connection is considered dead
    pub retries: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            idle: Duration::from_secs(3),
            interval: Duration::from_secs(1),
            retries: 2,
        }
    }
}

/// Client id assignment strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    /// Low byte of the peer's address. Two peers on different subnets with
    /// the same host byte share an id; lookups then resolve to the first.
    /// Host bytes equal to a reserved id get a sequential id instead.
    PeerAddress,

    /// Wrapping counter that skips 0 and the reserved ids
    Sequential,
}

/// Registration requirement for administrative commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationGate {
    /// Only `register`/`login` is accepted before a name is set
    Strict,

    /// Every command is accepted regardless of registration
    Open,
}

/// Reply shape of the `list` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    /// A single JSON array of client objects
    Array,

    /// One JSON object reply per connected client
    PerClient,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8888".to_string(),
            max_clients: 6,
            accept_backoff_ms: 1000,
            accept_poll_ms: 50,
            recv_buffer_size: 4 * 1024,
            write_timeout_ms: 5000,
            keepalive: KeepaliveConfig::default(),
            id_policy: IdPolicy::PeerAddress,
            registration_gate: RegistrationGate::Strict,
            list_style: ListStyle::Array,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_clients == 0 {
            return Err(HubError::Config("max_clients must be at least 1".to_string()));
        }
        if self.recv_buffer_size <= HEADER_SIZE {
            return Err(HubError::Config(format!(
                "recv_buffer_size must exceed the {} byte frame header",
                HEADER_SIZE
            )));
        }
        if self.recv_buffer_size > HEADER_SIZE + MAX_PAYLOAD_SIZE as usize {
            return Err(HubError::Config(format!(
                "recv_buffer_size {} exceeds the largest frame",
                self.recv_buffer_size
            )));
        }
        Ok(())
    }

    /// Accept-loop backoff as a Duration
    pub fn accept_backoff(&self) -> Duration {
        Duration::from_millis(self.accept_backoff_ms)
    }

    /// Accept-loop poll interval as a Duration
    pub fn accept_poll(&self) -> Duration {
        Duration::from_millis(self.accept_poll_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrently connected clients
    pub fn max_clients(mut self, count: usize) -> Self {
        self.config.max_clients = count;
        self
    }

    /// Set the backoff used while the client cap is reached (in milliseconds)
    pub fn accept_backoff_ms(mut self, ms: u64) -> Self {
        self.config.accept_backoff_ms = ms;
        self
    }

    /// Set the accept poll interval (in milliseconds)
    pub fn accept_poll_ms(mut self, ms: u64) -> Self {
        self.config.accept_poll_ms = ms;
        self
    }

    /// Set the receive buffer size (in bytes)
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.config.recv_buffer_size = size;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the keepalive parameters
    pub fn keepalive(mut self, keepalive: KeepaliveConfig) -> Self {
        self.config.keepalive = keepalive;
        self
    }

    /// Set the id assignment policy
    pub fn id_policy(mut self, policy: IdPolicy) -> Self {
        self.config.id_policy = policy;
        self
    }

    /// Set the registration gate
    pub fn registration_gate(mut self, gate: RegistrationGate) -> Self {
        self.config.registration_gate = gate;
        self
    }

    /// Set the `list` reply style
    pub fn list_style(mut self, style: ListStyle) -> Self {
        self.config.list_style = style;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
