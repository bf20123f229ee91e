//! File receiver
//!
//! Subscribes to a channel and writes every received file to disk until
//! the server closes the connection.

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::Result;
use crate::files::save_envelope;
use crate::protocol::{is_valid_channel, parse_file_frame, ProtocolError, Request};

use super::config::ClientConfig;

/// Totals for one subscribe session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveSummary {
    /// Files written to disk
    pub saved: usize,
    /// Frames dropped (malformed, undecodable, or rejected by the overwrite policy)
    pub skipped: usize,
}

/// Subscriber side of the protocol
///
/// # Example
/// ```no_run
/// use filecast::client::{ClientConfig, FileReceiver};
/// use filecast::OverwritePolicy;
///
/// # async fn example() -> filecast::Result<()> {
/// let config = ClientConfig::default().overwrite(OverwritePolicy::Allow);
/// let summary = FileReceiver::new(config, "docs").run().await?;
/// println!("saved {} files", summary.saved);
/// # Ok(())
/// # }
/// ```
pub struct FileReceiver {
    config: ClientConfig,
    channel: String,
}

impl FileReceiver {
    /// Create a receiver for one channel
    pub fn new(config: ClientConfig, channel: impl Into<String>) -> Self {
        Self {
            config,
            channel: channel.into(),
        }
    }

    /// Channel this receiver subscribes to
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Connect, subscribe, and receive until the server closes the stream
    pub async fn run(&self) -> Result<ReceiveSummary> {
        if !is_valid_channel(&self.channel) {
            return Err(ProtocolError::InvalidChannel(self.channel.clone()).into());
        }

        let mut stream = TcpStream::connect(self.config.server_addr).await?;
        stream
            .write_all(Request::subscribe(&self.channel).encode().as_bytes())
            .await?;
        stream.flush().await?;

        tracing::info!(
            channel = %self.channel,
            server = %self.config.server_addr,
            overwrite = ?self.config.overwrite,
            "Subscribed"
        );

        self.receive(stream).await
    }

    /// Save every `file` frame read from `reader`
    ///
    /// A bad frame or a rejected overwrite only skips that delivery.
    pub async fn receive<R>(&self, reader: R) -> Result<ReceiveSummary>
    where
        R: AsyncRead + Unpin,
    {
        let mut summary = ReceiveSummary::default();
        let mut lines = BufReader::new(reader).lines();

        while let Some(line) = lines.next_line().await? {
            match self.handle_frame(&line).await {
                Ok(path) => {
                    summary.saved += 1;
                    tracing::info!(channel = %self.channel, path = %path.display(), "File saved");
                }
                Err(e) => {
                    summary.skipped += 1;
                    tracing::warn!(channel = %self.channel, error = %e, "Dropped received file");
                }
            }
        }

        tracing::info!(
            channel = %self.channel,
            saved = summary.saved,
            skipped = summary.skipped,
            "Connection closed by server"
        );
        Ok(summary)
    }

    async fn handle_frame(&self, line: &str) -> Result<PathBuf> {
        let envelope = parse_file_frame(line)?;
        tracing::debug!(channel = %self.channel, file = %envelope.file_name(), "Received file");

        let path = save_envelope(
            &self.config.files_dir,
            &self.channel,
            &envelope,
            self.config.overwrite,
        )
        .await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::files::OverwritePolicy;
    use crate::protocol::Envelope;

    fn frame(name: &str, data: &[u8]) -> String {
        let envelope = Envelope::from_bytes(name, ".txt", data);
        format!("file {}\n", envelope.to_json().unwrap())
    }

    #[tokio::test]
    async fn test_receive_saves_files_and_skips_garbage() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig::default().files_dir(dir.path());
        let receiver = FileReceiver::new(config, "docs");

        let input = format!(
            "{}not a frame\nfile {{\"name\":1}}\n{}",
            frame("a", b"one"),
            frame("b", b"two")
        );
        let summary = receiver.receive(input.as_bytes()).await.unwrap();

        assert_eq!(summary, ReceiveSummary { saved: 2, skipped: 2 });
        let docs = dir.path().join("docs");
        assert_eq!(tokio::fs::read(docs.join("a.txt")).await.unwrap(), b"one");
        assert_eq!(tokio::fs::read(docs.join("b.txt")).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_receive_respects_overwrite_policy() {
        let dir = TempDir::new().unwrap();
        let input = format!("{}{}", frame("a", b"first"), frame("a", b"second"));

        let rejecting = FileReceiver::new(ClientConfig::default().files_dir(dir.path()), "docs");
        let summary = rejecting.receive(input.as_bytes()).await.unwrap();
        assert_eq!(summary, ReceiveSummary { saved: 1, skipped: 1 });
        let path = dir.path().join("docs").join("a.txt");
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"first");

        let config = ClientConfig::default()
            .files_dir(dir.path())
            .overwrite(OverwritePolicy::Allow);
        let allowing = FileReceiver::new(config, "docs");
        let summary = allowing.receive(input.as_bytes()).await.unwrap();
        assert_eq!(summary, ReceiveSummary { saved: 2, skipped: 0 });
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"second");
    }
}
