//! Server configuration.

use std::net::SocketAddr;

use mrcp_protocol::{ConnectionConfig, DEFAULT_MAX_MESSAGE_SIZE};

/// Port registered for MRCPv2 over TCP.
pub const DEFAULT_PORT: u16 = 1544;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: SocketAddr,

    /// Maximum concurrent control connections.
    pub max_connections: usize,

    /// Largest message accepted or sent on a connection.
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            max_connections: 100,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Per-connection settings derived from this config.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::default().with_max_message_size(self.max_message_size)
    }
}
