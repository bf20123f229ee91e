//! Channel registry implementation
//!
//! The central registry that tracks every channel's subscribers and fans
//! published files out to them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::protocol::{split_send, Envelope, FilePayload, ProtocolError};
use crate::stats::{ChannelInfo, ServerStats};

use super::config::{RegistryConfig, MIN_CLEANUP_INTERVAL};
use super::entry::ChannelEntry;
use super::error::RegistryError;
use super::subscriber::Subscriber;

/// Outcome of a single broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers that received the frame
    pub delivered: usize,
    /// Peers evicted because their write failed
    pub evicted: Vec<String>,
}

/// Central registry for all channels
///
/// Thread-safe via `RwLock` over the channel map and a `Mutex` per channel.
pub struct ChannelRegistry {
    /// Map of channel name to channel entry
    channels: RwLock<HashMap<String, Arc<ChannelEntry>>>,

    /// When the registry was created
    created_at: DateTime<Utc>,

    /// Configuration
    config: RegistryConfig,
}

impl ChannelRegistry {
    /// Create a new channel registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new channel registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            created_at: Utc::now(),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// When the registry was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Subscribe a connection to a channel
    ///
    /// Creates the channel if it doesn't exist. A subscriber whose peer
    /// address is already registered on the channel replaces the old one,
    /// which is closed.
    pub async fn subscribe(&self, channel: &str, subscriber: Subscriber) {
        let peer = subscriber.peer().to_string();
        let session_id = subscriber.session_id();

        loop {
            let entry = self.get_or_create(channel).await;
            let mut subscribers = entry.subscribers.lock().await;

            // Lost a race with cleanup; the entry is no longer in the map
            if entry.is_retired() {
                continue;
            }

            let replaced = subscribers.insert(peer.clone(), subscriber);
            entry.sync_subscriber_count(subscribers.len());
            entry.touch();
            drop(subscribers);

            tracing::info!(
                channel = %channel,
                peer = %peer,
                session_id = session_id,
                subscribers = entry.subscriber_count(),
                replaced = replaced.is_some(),
                "Subscriber added"
            );

            if let Some(old) = replaced {
                old.close().await;
            }
            return;
        }
    }

    /// Unsubscribe a peer from a channel and close its stream
    ///
    /// Returns `false` without doing anything if the channel or the peer is
    /// not registered, so a second eviction of the same peer is harmless.
    pub async fn unsubscribe(&self, channel: &str, peer: &str) -> bool {
        self.remove_subscriber(channel, peer, None).await
    }

    /// Unsubscribe a peer only if it is still the given connection
    ///
    /// Used when a subscriber's socket closes: by then a new connection
    /// from the same address may already have replaced it.
    pub async fn detach(&self, channel: &str, peer: &str, session_id: u64) -> bool {
        self.remove_subscriber(channel, peer, Some(session_id)).await
    }

    async fn remove_subscriber(&self, channel: &str, peer: &str, session_id: Option<u64>) -> bool {
        let Some(entry) = self.entry(channel).await else {
            return false;
        };

        let removed = {
            let mut subscribers = entry.subscribers.lock().await;
            let matches = match (subscribers.get(peer), session_id) {
                (Some(existing), Some(id)) => existing.session_id() == id,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if !matches {
                return false;
            }

            let removed = subscribers.remove(peer);
            entry.sync_subscriber_count(subscribers.len());
            entry.touch();
            removed
        };

        match removed {
            Some(subscriber) => {
                tracing::info!(
                    channel = %channel,
                    peer = %peer,
                    subscribed_for = ?subscriber.age(),
                    subscribers = entry.subscriber_count(),
                    "Subscriber removed"
                );
                subscriber.close().await;
                true
            }
            None => false,
        }
    }

    /// Parse a raw send request into its channel and payload
    ///
    /// The channel must already exist; sending never creates one. The
    /// channel is checked before the payload is decoded.
    pub async fn parse_send(&self, request: &str) -> Result<(String, FilePayload)> {
        let (channel, json) = split_send(request).ok_or_else(|| ProtocolError::malformed(request))?;

        if self.entry(channel).await.is_none() {
            return Err(RegistryError::UnknownChannel(channel.to_string()).into());
        }

        let payload = FilePayload::from_json(json)?;
        Ok((channel.to_string(), payload))
    }

    /// Handle a complete send request line
    pub async fn handle_send(&self, request: &str) -> Result<BroadcastReport> {
        let (channel, payload) = self.parse_send(request).await?;
        Ok(self.broadcast(&channel, &payload).await?)
    }

    /// Submit an envelope to a channel, same as a send request
    pub async fn submit(&self, channel: &str, envelope: Envelope) -> Result<BroadcastReport> {
        if self.entry(channel).await.is_none() {
            return Err(RegistryError::UnknownChannel(channel.to_string()).into());
        }

        let payload = FilePayload::from_envelope(envelope)?;
        Ok(self.broadcast(channel, &payload).await?)
    }

    /// Broadcast a file to all subscribers of a channel
    ///
    /// The channel's file counter is bumped once per call regardless of how
    /// many writes succeed. Subscribers are written one at a time, each
    /// bounded by the configured write timeout; any that fail are removed
    /// and closed while the rest still receive the frame.
    pub async fn broadcast(
        &self,
        channel: &str,
        payload: &FilePayload,
    ) -> std::result::Result<BroadcastReport, RegistryError> {
        let entry = self
            .entry(channel)
            .await
            .ok_or_else(|| RegistryError::UnknownChannel(channel.to_string()))?;

        let timeout = self.config.write_timeout;
        let frame = payload.frame();
        let mut report = BroadcastReport::default();

        let evicted = {
            let mut subscribers = entry.subscribers.lock().await;
            let files_sent = entry.record_file();

            tracing::debug!(
                channel = %channel,
                file = %payload.envelope().file_name(),
                subscribers = subscribers.len(),
                files_sent = files_sent,
                "Broadcasting file"
            );

            for (peer, subscriber) in subscribers.iter_mut() {
                match subscriber.deliver(frame, timeout).await {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        tracing::warn!(
                            channel = %channel,
                            peer = %peer,
                            subscribed_for = ?subscriber.age(),
                            error = %e,
                            "Subscriber write failed, unsubscribing"
                        );
                        report.evicted.push(peer.clone());
                    }
                }
            }

            let evicted: Vec<Subscriber> = report
                .evicted
                .iter()
                .filter_map(|peer| subscribers.remove(peer))
                .collect();
            entry.sync_subscriber_count(subscribers.len());
            entry.touch();
            evicted
        };

        for subscriber in evicted {
            subscriber.close().await;
        }

        Ok(report)
    }

    /// Check if a channel exists
    pub async fn channel_exists(&self, channel: &str) -> bool {
        self.entry(channel).await.is_some()
    }

    /// Get a snapshot of one channel
    pub async fn channel_info(&self, channel: &str) -> Option<ChannelInfo> {
        self.entry(channel).await.map(|entry| entry.info())
    }

    /// Get snapshots of all channels, ordered by name
    pub async fn channels(&self) -> Vec<ChannelInfo> {
        let channels = self.channels.read().await;
        let mut infos: Vec<ChannelInfo> = channels.values().map(|entry| entry.info()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Get total number of channels
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Aggregate statistics across all channels
    ///
    /// Only reads atomic counters under the map's read lock, so it never
    /// waits on a broadcast in progress.
    pub async fn stats(&self) -> ServerStats {
        let channels = self.channels.read().await;
        ServerStats::aggregate(channels.values().map(|entry| entry.info()), self.created_at)
    }

    /// Run cleanup task once
    ///
    /// Removes channels that have no subscribers and have been idle longer
    /// than `empty_channel_ttl`. Does nothing when no TTL is configured.
    pub async fn cleanup(&self) {
        let Some(ttl) = self.config.empty_channel_ttl else {
            return;
        };

        let mut channels = self.channels.write().await;

        channels.retain(|name, entry| {
            // Skip entries that are busy right now
            let Ok(subscribers) = entry.subscribers.try_lock() else {
                return true;
            };

            if subscribers.is_empty() && entry.idle_for() > ttl {
                entry.retire();
                tracing::info!(channel = %name, "Empty channel removed by cleanup");
                false
            } else {
                true
            }
        });
    }

    /// Close every subscriber on every channel
    ///
    /// Channels themselves are kept. Returns how many subscribers were closed.
    pub async fn disconnect_all(&self) -> usize {
        let entries: Vec<Arc<ChannelEntry>> =
            self.channels.read().await.values().cloned().collect();
        let mut closed = 0;

        for entry in entries {
            let drained: Vec<Subscriber> = {
                let mut subscribers = entry.subscribers.lock().await;
                let drained = subscribers.drain().map(|(_, subscriber)| subscriber).collect();
                entry.sync_subscriber_count(0);
                drained
            };

            for subscriber in drained {
                subscriber.close().await;
                closed += 1;
            }
        }

        closed
    }

    /// Spawn background cleanup task
    ///
    /// Returns `None` when empty channels are kept forever. Otherwise returns
    /// a handle that can be used to abort the task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        self.config.empty_channel_ttl?;

        let registry = Arc::clone(self);
        let interval = registry.config.cleanup_interval;

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(MIN_CLEANUP_INTERVAL));
            loop {
                ticker.tick().await;
                registry.cleanup().await;
            }
        }))
    }

    async fn entry(&self, channel: &str) -> Option<Arc<ChannelEntry>> {
        self.channels.read().await.get(channel).cloned()
    }

    async fn get_or_create(&self, channel: &str) -> Arc<ChannelEntry> {
        if let Some(entry) = self.entry(channel).await {
            return entry;
        }

        let mut channels = self.channels.write().await;
        Arc::clone(channels.entry(channel.to_string()).or_insert_with(|| {
            tracing::info!(channel = %channel, "Channel created");
            Arc::new(ChannelEntry::new(channel))
        }))
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
