//! Registry configuration

use std::time::Duration;

pub(super) const MIN_CLEANUP_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for the channel registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Upper bound on writing one frame to one subscriber
    pub write_timeout: Duration,

    /// Remove channels that have had no subscribers for this long
    ///
    /// `None` keeps every channel for the lifetime of the process.
    pub empty_channel_ttl: Option<Duration>,

    /// How often the cleanup task runs when `empty_channel_ttl` is set
    pub cleanup_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_secs(10),
            empty_channel_ttl: None,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl RegistryConfig {
    /// Set the per-subscriber write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Enable removal of empty channels after `ttl`
    pub fn empty_channel_ttl(mut self, ttl: Duration) -> Self {
        self.empty_channel_ttl = Some(ttl);
        self
    }

    /// Set the cleanup interval (minimum 1 ms)
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval.max(MIN_CLEANUP_INTERVAL);
        self
    }
}
