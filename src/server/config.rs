//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::protocol::constants::{DEFAULT_API_PORT, DEFAULT_MAX_REQUEST_SIZE, DEFAULT_SERVER_PORT};

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address for the socket protocol
    pub bind_addr: SocketAddr,

    /// Address for the HTTP admin API (`None` disables it)
    pub api_addr: Option<SocketAddr>,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// How long a new connection may go without sending any bytes before
    /// its request line is complete
    pub read_timeout: Duration,

    /// Largest accepted request line in bytes
    pub max_request_size: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_SERVER_PORT)),
            api_addr: Some(SocketAddr::from(([0, 0, 0, 0], DEFAULT_API_PORT))),
            max_connections: 0, // Unlimited
            read_timeout: Duration::from_secs(30),
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            tcp_nodelay: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the admin API address
    pub fn api_addr(mut self, addr: SocketAddr) -> Self {
        self.api_addr = Some(addr);
        self
    }

    /// Disable the admin API
    pub fn disable_api(mut self) -> Self {
        self.api_addr = None;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the request read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the maximum request size, at least one byte
    pub fn max_request_size(mut self, size: usize) -> Self {
        self.max_request_size = size.max(1);
        self
    }
}
