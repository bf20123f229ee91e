//! Protocol error types

use thiserror::Error;

use super::constants::PREVIEW_LEN;

/// Error type for reading and decoding wire messages
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Line matches neither the subscribe nor the send shape
    #[error("Malformed request: {0:?}")]
    MalformedRequest(String),

    /// Channel name is empty or contains whitespace
    #[error("Invalid channel name: {0:?}")]
    InvalidChannel(String),

    /// Payload is not a well-formed envelope
    #[error("Invalid envelope: {0}")]
    Decode(#[from] serde_json::Error),

    /// Request line exceeded the configured size limit
    #[error("Request exceeds {limit} bytes")]
    RequestTooLarge { limit: usize },

    /// No complete request line arrived within the read deadline
    #[error("Timed out waiting for a request line")]
    ReadTimeout,

    /// Peer closed the connection before sending anything
    #[error("Connection closed before a request was received")]
    ConnectionClosed,

    /// Socket failure while reading the request
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Build a `MalformedRequest` carrying a bounded preview of the line
    pub fn malformed(line: &str) -> Self {
        ProtocolError::MalformedRequest(preview(line))
    }
}

/// Truncate a line for logging, respecting char boundaries
pub(crate) fn preview(line: &str) -> String {
    match line.char_indices().nth(PREVIEW_LEN) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_line_unchanged() {
        assert_eq!(preview("hello"), "hello");
    }

    #[test]
    fn test_preview_truncates_long_line() {
        let line = "é".repeat(PREVIEW_LEN + 10);
        let shown = preview(&line);

        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), PREVIEW_LEN + 3);
    }
}
