//! Channel entry
//!
//! This module defines the per-channel state stored in the registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::stats::ChannelInfo;

use super::subscriber::Subscriber;

/// Entry for a single channel in the registry
pub struct ChannelEntry {
    /// Channel name
    name: String,

    /// Subscribers keyed by remote address
    pub(super) subscribers: Mutex<HashMap<String, Subscriber>>,

    /// Number of subscribers, mirrored from the map for lock-free reads
    subscriber_count: AtomicU32,

    /// Broadcasts that reached this channel
    files_sent: AtomicU64,

    /// Wall-clock creation time, reported through the admin API
    created_at: DateTime<Utc>,

    /// Monotonic creation time, base for `last_activity_ms`
    created: Instant,

    /// Milliseconds after `created` of the last subscribe/unsubscribe/broadcast
    last_activity_ms: AtomicU64,

    /// Set once cleanup has removed the entry from the channel map
    retired: AtomicBool,
}

impl ChannelEntry {
    /// Create an empty channel entry
    pub(super) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscribers: Mutex::new(HashMap::new()),
            subscriber_count: AtomicU32::new(0),
            files_sent: AtomicU64::new(0),
            created_at: Utc::now(),
            created: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            retired: AtomicBool::new(false),
        }
    }

    /// Channel name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When the channel was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the number of subscribers
    pub fn subscriber_count(&self) -> u32 {
        self.subscriber_count.load(Ordering::Relaxed)
    }

    /// Get the number of broadcasts made to this channel
    pub fn files_sent(&self) -> u64 {
        self.files_sent.load(Ordering::Relaxed)
    }

    /// Snapshot for the admin API and stats
    pub fn info(&self) -> ChannelInfo {
        ChannelInfo {
            name: self.name.clone(),
            files_sent: self.files_sent(),
            clients_connected: self.subscriber_count(),
            created_at: self.created_at,
        }
    }

    /// Time since the last subscribe, unsubscribe or broadcast
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed));
        self.created.elapsed().saturating_sub(last)
    }

    /// Must be called with the subscriber map locked
    pub(super) fn sync_subscriber_count(&self, count: usize) {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        self.subscriber_count.store(count, Ordering::Relaxed);
    }

    pub(super) fn record_file(&self) -> u64 {
        self.files_sent.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(super) fn touch(&self) {
        let now = u64::try_from(self.created.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_activity_ms.store(now, Ordering::Relaxed);
    }

    pub(super) fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Must be called with the subscriber map locked
    pub(super) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for ChannelEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelEntry")
            .field("name", &self.name)
            .field("subscribers", &self.subscriber_count())
            .field("files_sent", &self.files_sent())
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_is_empty() {
        let entry = ChannelEntry::new("docs");

        assert_eq!(entry.name(), "docs");
        assert_eq!(entry.subscriber_count(), 0);
        assert_eq!(entry.files_sent(), 0);
        assert!(!entry.is_retired());
    }

    #[test]
    fn test_counters() {
        let entry = ChannelEntry::new("docs");

        assert_eq!(entry.record_file(), 1);
        assert_eq!(entry.record_file(), 2);
        entry.sync_subscriber_count(3);

        let info = entry.info();
        assert_eq!(info.name, "docs");
        assert_eq!(info.files_sent, 2);
        assert_eq!(info.clients_connected, 3);
        assert_eq!(info.created_at, entry.created_at());
    }

    #[test]
    fn test_touch_resets_idle_time() {
        let entry = ChannelEntry::new("docs");
        std::thread::sleep(Duration::from_millis(20));
        assert!(entry.idle_for() >= Duration::from_millis(20));

        entry.touch();
        assert!(entry.idle_for() < Duration::from_millis(20));
    }
}
