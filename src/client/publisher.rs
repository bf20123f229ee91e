//! File publisher
//!
//! Opens a connection, writes one `send` line, and closes it. The protocol
//! has no acknowledgement, so success only means the line was written.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::error::Result;
use crate::files::envelope_from_path;
use crate::protocol::{is_valid_channel, Envelope, ProtocolError, Request};

use super::config::ClientConfig;

/// Publish an envelope to a channel
///
/// # Example
/// ```no_run
/// use filecast::client::{publish, ClientConfig};
/// use filecast::Envelope;
///
/// # async fn example() -> filecast::Result<()> {
/// let config = ClientConfig::default();
/// let envelope = Envelope::from_bytes("hello", ".txt", b"hello world");
/// publish(&config, "docs", &envelope).await?;
/// # Ok(())
/// # }
/// ```
pub async fn publish(config: &ClientConfig, channel: &str, envelope: &Envelope) -> Result<()> {
    if !is_valid_channel(channel) {
        return Err(ProtocolError::InvalidChannel(channel.to_string()).into());
    }

    let request = Request::send(channel, envelope)?;

    let mut stream = TcpStream::connect(config.server_addr).await?;
    stream.write_all(request.encode().as_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await?;

    tracing::info!(
        channel = %channel,
        file = %envelope.file_name(),
        server = %config.server_addr,
        "File sent"
    );
    Ok(())
}

/// Read a local file and publish it to a channel
///
/// Returns the envelope that was sent.
pub async fn send_file(
    config: &ClientConfig,
    channel: &str,
    path: impl AsRef<Path>,
) -> Result<Envelope> {
    let envelope = envelope_from_path(path).await?;
    publish(config, channel, &envelope).await?;
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_publish_writes_send_line() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ClientConfig::new(listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = String::new();
            socket.read_to_string(&mut received).await.unwrap();
            received
        });

        let envelope = Envelope::new("a", ".txt", "aGVsbG8=");
        publish(&config, "docs", &envelope).await.unwrap();

        assert_eq!(
            server.await.unwrap(),
            "send docs {\"name\":\"a\",\"extension\":\".txt\",\"content\":\"aGVsbG8=\"}\n"
        );
    }

    #[tokio::test]
    async fn test_publish_rejects_bad_channel() {
        let config = ClientConfig::default();
        let envelope = Envelope::new("a", ".txt", "");

        let result = publish(&config, "two words", &envelope).await;

        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::InvalidChannel(_)))
        ));
    }
}
