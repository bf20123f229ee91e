//! Connection dispatcher
//!
//! Every accepted connection is classified by its first line and never
//! read as a request again:
//!
//! ```text
//! Accepted ──read one line──┬── send ───────► SendProcessed (connection dropped)
//!                           ├── subscribe ──► Subscribed (write half owned by registry)
//!                           └── otherwise ──► Rejected (logged, connection dropped)
//! ```
//!
//! A subscribed connection's read half is handed to a watcher task that
//! only waits for the peer to close, then detaches the subscriber.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, BufReader};
use tokio::sync::{oneshot, OwnedSemaphorePermit};

use crate::error::Error;
use crate::protocol::{ProtocolError, Request};
use crate::registry::{BroadcastReport, ChannelRegistry, Subscriber};
use crate::server::config::ServerConfig;

/// Terminal state of a dispatched connection
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Registered as a subscriber; the connection stays open
    Subscribed { channel: String },
    /// Send request broadcast to the channel
    SendProcessed {
        channel: String,
        report: BroadcastReport,
    },
    /// Send request recognized but dropped (unknown channel, bad payload)
    SendFailed(Error),
    /// No usable request line
    Rejected(ProtocolError),
}

/// A freshly accepted connection awaiting its request line
pub struct Connection<S> {
    session_id: u64,
    stream: S,
    peer: String,
    config: ServerConfig,
    registry: Arc<ChannelRegistry>,
    permit: Option<OwnedSemaphorePermit>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Create a new connection
    pub fn new(
        session_id: u64,
        stream: S,
        peer: impl Into<String>,
        config: ServerConfig,
        registry: Arc<ChannelRegistry>,
    ) -> Self {
        Self {
            session_id,
            stream,
            peer: peer.into(),
            config,
            registry,
            permit: None,
        }
    }

    /// Hold a connection-limit permit for as long as the connection lives
    pub fn with_permit(mut self, permit: Option<OwnedSemaphorePermit>) -> Self {
        self.permit = permit;
        self
    }

    /// Read the request line and route it
    pub async fn run(self) -> DispatchOutcome {
        let Connection {
            session_id,
            stream,
            peer,
            config,
            registry,
            permit,
        } = self;

        let (reader, writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        let line =
            match read_request_line(&mut reader, config.max_request_size, config.read_timeout).await
            {
                Ok(line) => line,
                Err(e) => {
                    tracing::debug!(
                        session_id = session_id,
                        peer = %peer,
                        error = %e,
                        "No request received"
                    );
                    return DispatchOutcome::Rejected(e);
                }
            };

        match Request::parse(&line) {
            Ok(Request::Send { channel, .. }) => match registry.handle_send(&line).await {
                Ok(report) => {
                    tracing::info!(
                        session_id = session_id,
                        peer = %peer,
                        channel = %channel,
                        delivered = report.delivered,
                        evicted = report.evicted.len(),
                        "File broadcast"
                    );
                    DispatchOutcome::SendProcessed { channel, report }
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = session_id,
                        peer = %peer,
                        channel = %channel,
                        error = %e,
                        "Send request dropped"
                    );
                    DispatchOutcome::SendFailed(e)
                }
            },
            Ok(Request::Subscribe { channel }) => {
                let (ready_tx, ready_rx) = oneshot::channel();
                let watcher = tokio::spawn(watch_peer(
                    reader,
                    Arc::clone(&registry),
                    channel.clone(),
                    peer.clone(),
                    session_id,
                    ready_rx,
                    permit,
                ));

                let subscriber =
                    Subscriber::new(session_id, peer, writer).with_watcher(watcher.abort_handle());
                registry.subscribe(&channel, subscriber).await;
                let _ = ready_tx.send(());

                DispatchOutcome::Subscribed { channel }
            }
            Err(e) => {
                tracing::warn!(
                    session_id = session_id,
                    peer = %peer,
                    error = %e,
                    "Ignoring malformed request"
                );
                DispatchOutcome::Rejected(e)
            }
        }
    }
}

/// Read one newline-terminated request line
///
/// `timeout` bounds each wait for more bytes, not the whole line, so a slow
/// publisher that keeps making progress is never cut off. A line cut short
/// by EOF is accepted as-is; an empty stream is not. The returned line has
/// its line ending stripped.
pub(crate) async fn read_request_line<R>(
    reader: &mut R,
    limit: usize,
    timeout: Duration,
) -> Result<String, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();

    loop {
        let available = tokio::time::timeout(timeout, reader.fill_buf())
            .await
            .map_err(|_| ProtocolError::ReadTimeout)??;
        if available.is_empty() {
            break;
        }

        // Take at most one byte past the limit so oversize lines are detected
        let room = limit.saturating_add(1) - buf.len();
        let window = &available[..available.len().min(room)];
        let (used, complete) = match window.iter().position(|&b| b == b'\n') {
            Some(idx) => (idx + 1, true),
            None => (window.len(), false),
        };
        buf.extend_from_slice(&window[..used]);
        reader.consume(used);

        if complete {
            break;
        }
        if buf.len() > limit {
            return Err(ProtocolError::RequestTooLarge { limit });
        }
    }

    if buf.is_empty() {
        return Err(ProtocolError::ConnectionClosed);
    }

    let mut line = String::from_utf8(buf)
        .map_err(|e| ProtocolError::malformed(&String::from_utf8_lossy(e.as_bytes())))?;
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(line)
}

/// Wait for a subscriber's peer to close, then detach it
///
/// Nothing is expected from a subscriber after its request line, so
/// anything it sends is discarded.
async fn watch_peer<R>(
    mut reader: R,
    registry: Arc<ChannelRegistry>,
    channel: String,
    peer: String,
    session_id: u64,
    ready: oneshot::Receiver<()>,
    _permit: Option<OwnedSemaphorePermit>,
) where
    R: AsyncRead + Unpin,
{
    if ready.await.is_err() {
        return;
    }

    let mut buf = [0u8; 1024];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(peer = %peer, error = %e, "Subscriber read error");
                break;
            }
        }
    }

    tracing::debug!(
        session_id = session_id,
        peer = %peer,
        channel = %channel,
        "Subscriber disconnected"
    );
    registry.detach(&channel, &peer, session_id).await;
}
