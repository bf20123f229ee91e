//! Subscriber sinks
//!
//! A subscribed connection is only ever written to by the registry. The
//! write half is boxed here as a [`SubscriberSink`]; whatever watches the
//! read half for the peer closing lives in a separate task whose abort
//! handle travels with the subscriber.

use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::task::AbortHandle;

use super::error::RegistryError;

/// Write-only half of a subscribed connection
pub type SubscriberSink = Box<dyn AsyncWrite + Send + Unpin>;

/// A connection registered to receive broadcasts for one channel
pub struct Subscriber {
    session_id: u64,
    peer: String,
    sink: SubscriberSink,
    watcher: Option<AbortHandle>,
    subscribed_at: Instant,
}

impl Subscriber {
    /// Create a subscriber keyed by the remote address string
    pub fn new<W>(session_id: u64, peer: impl Into<String>, sink: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            session_id,
            peer: peer.into(),
            sink: Box::new(sink),
            watcher: None,
            subscribed_at: Instant::now(),
        }
    }

    /// Attach the task that watches the read half, aborted on close
    pub fn with_watcher(mut self, watcher: AbortHandle) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Connection session ID
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Remote address string, the subscriber's key within a channel
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Time since the subscriber was registered
    pub fn age(&self) -> Duration {
        self.subscribed_at.elapsed()
    }

    /// Write one complete frame, bounded by `timeout`
    pub(super) async fn deliver(
        &mut self,
        frame: &Bytes,
        timeout: Duration,
    ) -> Result<(), RegistryError> {
        let write = async {
            self.sink.write_all(frame).await?;
            self.sink.flush().await
        };

        match tokio::time::timeout(timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(RegistryError::SubscriberWrite {
                peer: self.peer.clone(),
                source,
            }),
            Err(_) => Err(RegistryError::SubscriberWriteTimeout {
                peer: self.peer.clone(),
                timeout,
            }),
        }
    }

    /// Close the underlying stream and stop watching it
    pub(super) async fn close(mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }

        if let Err(e) = self.sink.shutdown().await {
            tracing::debug!(peer = %self.peer, error = %e, "Subscriber shutdown failed");
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("session_id", &self.session_id)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}
