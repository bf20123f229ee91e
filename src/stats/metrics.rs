//! Channel and server statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel-level snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Channel name
    pub name: String,
    /// Broadcasts that reached this channel
    pub files_sent: u64,
    /// Current subscribers
    pub clients_connected: u32,
    /// When the channel was created
    pub created_at: DateTime<Utc>,
}

/// Server-wide statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStats {
    /// Broadcasts across all channels
    pub files_sent: u64,
    /// Subscribers across all channels
    pub clients_connected: u64,
    /// Number of channels in the registry
    pub channels_available: u64,
    /// When the registry was created
    pub created_at: DateTime<Utc>,
}

impl ServerStats {
    /// Sum per-channel snapshots into server totals
    pub fn aggregate<I>(channels: I, created_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = ChannelInfo>,
    {
        let mut stats = Self {
            files_sent: 0,
            clients_connected: 0,
            channels_available: 0,
            created_at,
        };

        for channel in channels {
            stats.files_sent += channel.files_sent;
            stats.clients_connected += u64::from(channel.clients_connected);
            stats.channels_available += 1;
        }

        stats
    }

    /// Time since the registry was created
    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }
}
