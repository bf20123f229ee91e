//! Local file persistence
//!
//! Turns files on disk into envelopes for sending, and received envelopes
//! back into files under `<files_dir>/<channel>/<name><extension>`.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::protocol::Envelope;

/// Error type for file persistence
#[derive(Debug, Error)]
pub enum FileError {
    /// Target file exists and the session does not allow overwriting
    #[error("{0} already exists and overwriting is not allowed")]
    OverwriteRejected(PathBuf),

    /// Envelope content is not valid base64
    #[error("Invalid file content: {0}")]
    InvalidContent(#[from] base64::DecodeError),

    /// Name or channel would escape the target directory
    #[error("Invalid path component: {0:?}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether received files may replace existing ones
///
/// Decided once per subscribe session, before any file arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Replace existing files
    Allow,
    /// Drop a delivery whose target already exists
    #[default]
    Reject,
}

impl OverwritePolicy {
    pub fn from_allow(allow: bool) -> Self {
        if allow {
            OverwritePolicy::Allow
        } else {
            OverwritePolicy::Reject
        }
    }
}

/// Read a local file into an envelope
///
/// The name is the file stem and the extension keeps its leading dot, so
/// `notes.tar.gz` becomes `notes.tar` + `.gz`.
pub async fn envelope_from_path(path: impl AsRef<Path>) -> Result<Envelope, FileError> {
    let path = path.as_ref();
    let data = fs::read(path).await?;

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| FileError::InvalidPath(path.display().to_string()))?;
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    Ok(Envelope::from_bytes(name, extension, &data))
}

/// Write a received envelope under `<dir>/<channel>/`
///
/// Returns the path written.
pub async fn save_envelope(
    dir: impl AsRef<Path>,
    channel: &str,
    envelope: &Envelope,
    policy: OverwritePolicy,
) -> Result<PathBuf, FileError> {
    let file_name = envelope.file_name();
    check_component(channel)?;
    check_component(&file_name)?;

    let data = envelope.decode_content()?;

    let channel_dir = dir.as_ref().join(channel);
    fs::create_dir_all(&channel_dir).await?;

    let path = channel_dir.join(file_name);
    if policy == OverwritePolicy::Reject && fs::try_exists(&path).await? {
        return Err(FileError::OverwriteRejected(path));
    }

    let mut file = fs::File::create(&path).await?;
    file.write_all(&data).await?;
    file.sync_all().await?;

    Ok(path)
}

/// A single normal path component: no separators, no `.` or `..`
fn check_component(value: &str) -> Result<(), FileError> {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !value.contains(['/', '\\']) => Ok(()),
        _ => Err(FileError::InvalidPath(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_envelope_from_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.tar.gz");
        fs::write(&path, b"\x00\x01binary").await.unwrap();

        let envelope = envelope_from_path(&path).await.unwrap();

        assert_eq!(envelope.name, "notes.tar");
        assert_eq!(envelope.extension, ".gz");
        assert_eq!(envelope.decode_content().unwrap(), b"\x00\x01binary");
    }

    #[tokio::test]
    async fn test_envelope_from_path_without_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Makefile");
        fs::write(&path, b"all:").await.unwrap();

        let envelope = envelope_from_path(&path).await.unwrap();

        assert_eq!(envelope.name, "Makefile");
        assert_eq!(envelope.extension, "");
    }

    #[tokio::test]
    async fn test_envelope_from_missing_path() {
        let result = envelope_from_path("/definitely/not/here.txt").await;
        assert!(matches!(result, Err(FileError::Io(_))));
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let path = src.path().join("photo.png");
        let data: Vec<u8> = (0..=255).collect();
        fs::write(&path, &data).await.unwrap();

        let envelope = envelope_from_path(&path).await.unwrap();
        let written = save_envelope(dst.path(), "docs", &envelope, OverwritePolicy::Reject)
            .await
            .unwrap();

        assert_eq!(written, dst.path().join("docs").join("photo.png"));
        assert_eq!(fs::read(&written).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_overwrite_policy() {
        let dir = TempDir::new().unwrap();
        let first = Envelope::from_bytes("a", ".txt", b"first");
        let second = Envelope::from_bytes("a", ".txt", b"second");

        let path = save_envelope(dir.path(), "docs", &first, OverwritePolicy::Reject)
            .await
            .unwrap();

        let result = save_envelope(dir.path(), "docs", &second, OverwritePolicy::Reject).await;
        assert!(matches!(result, Err(FileError::OverwriteRejected(ref p)) if p == &path));
        assert_eq!(fs::read(&path).await.unwrap(), b"first");

        save_envelope(dir.path(), "docs", &second, OverwritePolicy::Allow)
            .await
            .unwrap();
        assert_eq!(fs::read(&path).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let dir = TempDir::new().unwrap();

        for (channel, name) in [("docs", "../evil"), ("..", "a"), ("docs", "a/b"), ("", "a")] {
            let envelope = Envelope::from_bytes(name, ".txt", b"x");
            let result =
                save_envelope(dir.path(), channel, &envelope, OverwritePolicy::Allow).await;
            assert!(
                matches!(result, Err(FileError::InvalidPath(_))),
                "expected {:?}/{:?} to be rejected",
                channel,
                name
            );
        }
    }

    #[tokio::test]
    async fn test_rejects_bad_base64() {
        let dir = TempDir::new().unwrap();
        let envelope = Envelope::new("a", ".txt", "not base64!!");

        let result = save_envelope(dir.path(), "docs", &envelope, OverwritePolicy::Allow).await;
        assert!(matches!(result, Err(FileError::InvalidContent(_))));
    }

    #[test]
    fn test_policy_from_allow() {
        assert_eq!(OverwritePolicy::from_allow(true), OverwritePolicy::Allow);
        assert_eq!(OverwritePolicy::from_allow(false), OverwritePolicy::Reject);
        assert_eq!(OverwritePolicy::default(), OverwritePolicy::Reject);
    }
}
