//! Crate-wide error type
//!
//! Each subsystem owns its own error enum; this type wraps them so callers
//! that cross subsystem boundaries can use a single `Result`.

use thiserror::Error;

use crate::files::FileError;
use crate::protocol::ProtocolError;
use crate::registry::RegistryError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Socket or filesystem failure outside a more specific context
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire protocol violation or undecodable payload
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Channel registry failure
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Local file persistence failure
    #[error("File error: {0}")]
    File(#[from] FileError),
}

impl Error {
    /// True if this error means the target channel has no registry entry
    pub fn is_unknown_channel(&self) -> bool {
        matches!(self, Error::Registry(RegistryError::UnknownChannel(_)))
    }
}
