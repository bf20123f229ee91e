//! Request classification and encoding
//!
//! Parsing is deliberately permissive at the connection level: a line that
//! matches neither shape yields `MalformedRequest`, which the dispatcher
//! logs and drops without affecting anything else.

use super::constants::{FILE_PREFIX, SEND_PREFIX, SUBSCRIBE_PAYLOAD, SUBSCRIBE_PREFIX};
use super::envelope::Envelope;
use super::error::ProtocolError;

/// A classified client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `subscribe <channel> {}`
    Subscribe { channel: String },
    /// `send <channel> <json>`; the payload is not yet decoded
    Send { channel: String, payload: String },
}

impl Request {
    /// Classify a single request line
    ///
    /// Trailing `\r\n` is ignored. The send shape is tested first; no line
    /// can match both.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = trim_line_ending(line);

        if let Some((channel, payload)) = split_send(line) {
            return Ok(Request::Send {
                channel: channel.to_string(),
                payload: payload.to_string(),
            });
        }

        if let Some(channel) = split_subscribe(line) {
            return Ok(Request::Subscribe {
                channel: channel.to_string(),
            });
        }

        Err(ProtocolError::malformed(line))
    }

    /// Build a subscribe request
    pub fn subscribe(channel: impl Into<String>) -> Self {
        Request::Subscribe {
            channel: channel.into(),
        }
    }

    /// Build a send request carrying an envelope
    pub fn send(channel: impl Into<String>, envelope: &Envelope) -> Result<Self, ProtocolError> {
        Ok(Request::Send {
            channel: channel.into(),
            payload: envelope.to_json()?,
        })
    }

    /// Target channel of the request
    pub fn channel(&self) -> &str {
        match self {
            Request::Subscribe { channel } | Request::Send { channel, .. } => channel,
        }
    }

    /// Encode as a newline-terminated line
    pub fn encode(&self) -> String {
        match self {
            Request::Subscribe { channel } => {
                format!("{}{} {}\n", SUBSCRIBE_PREFIX, channel, SUBSCRIBE_PAYLOAD)
            }
            Request::Send { channel, payload } => {
                format!("{}{} {}\n", SEND_PREFIX, channel, payload)
            }
        }
    }
}

/// Split a send line into `(channel, payload)` if it has the send shape
///
/// The channel is everything between the prefix and the first space; the
/// payload must be a non-empty JSON object literal.
pub fn split_send(line: &str) -> Option<(&str, &str)> {
    let rest = trim_line_ending(line).strip_prefix(SEND_PREFIX)?;
    let (channel, payload) = rest.split_once(' ')?;

    let is_object = payload.len() > 2 && payload.starts_with('{') && payload.ends_with('}');
    if channel.is_empty() || !is_object {
        return None;
    }

    Some((channel, payload))
}

fn split_subscribe(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(SUBSCRIBE_PREFIX)?;
    let (channel, payload) = rest.split_once(' ')?;

    if channel.is_empty() || payload != SUBSCRIBE_PAYLOAD {
        return None;
    }

    Some(channel)
}

/// A channel token: non-empty and free of whitespace
pub fn is_valid_channel(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace)
}

/// Decode a `file <json>` line received by a subscriber
pub fn parse_file_frame(line: &str) -> Result<Envelope, ProtocolError> {
    let line = trim_line_ending(line);
    let json = line
        .strip_prefix(FILE_PREFIX)
        .filter(|json| json.starts_with('{') && json.ends_with('}'))
        .ok_or_else(|| ProtocolError::malformed(line))?;

    Envelope::from_json(json)
}

fn trim_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}
