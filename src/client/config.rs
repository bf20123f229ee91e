//! Client configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::files::OverwritePolicy;
use crate::protocol::constants::DEFAULT_SERVER_PORT;

/// Client configuration options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay server address
    pub server_addr: SocketAddr,

    /// Directory received files are written under
    pub files_dir: PathBuf,

    /// Whether received files may replace existing ones
    pub overwrite: OverwritePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_SERVER_PORT)),
            files_dir: PathBuf::from("./files"),
            overwrite: OverwritePolicy::Reject,
        }
    }
}

impl ClientConfig {
    /// Create a config for the given server
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            ..Default::default()
        }
    }

    /// Set the directory for received files
    pub fn files_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.files_dir = dir.into();
        self
    }

    /// Set the overwrite policy
    pub fn overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }
}
