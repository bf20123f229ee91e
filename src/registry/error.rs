//! Registry error types
//!
//! Error types for channel registry operations.

use std::time::Duration;

use thiserror::Error;

/// Error type for registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No channel with this name has ever been subscribed to
    #[error("Channel not found: {0}")]
    UnknownChannel(String),

    /// Writing a frame to a subscriber failed
    #[error("Write to subscriber {peer} failed: {source}")]
    SubscriberWrite {
        peer: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing a frame to a subscriber did not finish in time
    #[error("Write to subscriber {peer} timed out after {timeout:?}")]
    SubscriberWriteTimeout { peer: String, timeout: Duration },
}
