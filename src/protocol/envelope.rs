//! Transport envelope
//!
//! The unit carried end to end: a file name, its extension, and the file
//! bytes as standard base64 so the whole thing fits on one line of JSON.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use super::constants::FILE_PREFIX;
use super::error::ProtocolError;

/// A named, typed file payload
///
/// `name` and `extension` are opaque here; callers that turn them into
/// filesystem paths are responsible for validating them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// File name without extension
    pub name: String,
    /// Extension including the leading dot (e.g. `.txt`), or empty
    pub extension: String,
    /// Base64-encoded file content
    pub content: String,
}

impl Envelope {
    /// Create an envelope from already-encoded content
    pub fn new(
        name: impl Into<String>,
        extension: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            content: content.into(),
        }
    }

    /// Create an envelope from raw file bytes
    pub fn from_bytes(name: impl Into<String>, extension: impl Into<String>, data: &[u8]) -> Self {
        Self::new(name, extension, STANDARD.encode(data))
    }

    /// Decode the base64 content back into bytes
    pub fn decode_content(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.content.as_bytes())
    }

    /// File name as it would be written to disk
    pub fn file_name(&self) -> String {
        format!("{}{}", self.name, self.extension)
    }

    /// Parse an envelope from its JSON form
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to single-line JSON
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A validated envelope ready for broadcast
///
/// Keeps the JSON text exactly as the publisher sent it so subscribers
/// receive it verbatim, and pre-builds the `file <json>\n` frame once.
/// The frame is `Bytes`, so handing it to every subscriber only bumps a
/// reference count.
#[derive(Debug, Clone)]
pub struct FilePayload {
    envelope: Envelope,
    frame: Bytes,
}

impl FilePayload {
    /// Validate raw JSON as an envelope, keeping the original text
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        let envelope = Envelope::from_json(json)?;
        Ok(Self {
            envelope,
            frame: build_frame(json),
        })
    }

    /// Serialize an envelope that did not arrive as text (admin API)
    pub fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        let json = envelope.to_json()?;
        Ok(Self {
            frame: build_frame(&json),
            envelope,
        })
    }

    /// The decoded envelope
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// The complete `file <json>\n` line written to each subscriber
    pub fn frame(&self) -> &Bytes {
        &self.frame
    }

    /// The JSON portion of the frame
    pub fn json(&self) -> &str {
        let end = self.frame.len() - 1;
        // Built from a &str in build_frame, so always valid UTF-8
        std::str::from_utf8(&self.frame[FILE_PREFIX.len()..end]).unwrap_or_default()
    }
}

fn build_frame(json: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(FILE_PREFIX.len() + json.len() + 1);
    buf.put_slice(FILE_PREFIX.as_bytes());
    buf.put_slice(json.as_bytes());
    buf.put_u8(b'\n');
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = r#"{"name":"a","extension":".txt","content":"aGVsbG8="}"#;

    #[test]
    fn test_from_json_keeps_text_verbatim() {
        // Extra whitespace must survive untouched
        let json = r#"{"name": "a", "extension": ".txt", "content": "aGVsbG8="}"#;
        let payload = FilePayload::from_json(json).unwrap();

        assert_eq!(payload.json(), json);
        assert_eq!(payload.envelope().name, "a");
        assert_eq!(&payload.frame()[..], format!("file {}\n", json).as_bytes());
    }

    #[test]
    fn test_from_json_rejects_bad_payload() {
        let result = FilePayload::from_json(r#"{"name":"a"}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));

        let result = FilePayload::from_json("{not json}");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_from_envelope_frame() {
        let envelope = Envelope::new("a", ".txt", "aGVsbG8=");
        let payload = FilePayload::from_envelope(envelope).unwrap();

        assert_eq!(&payload.frame()[..], format!("file {}\n", HELLO).as_bytes());
    }

    #[test]
    fn test_envelope_wire_round_trip() {
        let data = [0u8, 1, 2, 254, 255, b'\n', b' '];
        let envelope = Envelope::from_bytes("report", ".bin", &data);

        let decoded = Envelope::from_json(&envelope.to_json().unwrap()).unwrap();

        assert_eq!(decoded.name, "report");
        assert_eq!(decoded.extension, ".bin");
        assert_eq!(decoded.decode_content().unwrap(), data);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(Envelope::new("notes", ".md", "").file_name(), "notes.md");
        assert_eq!(Envelope::new("Makefile", "", "").file_name(), "Makefile");
    }
}
