//! Upload encoding: raw bytes in, `data:` URI out.
//!
//! Media is stored inline in records, so an upload is read to completion
//! and base64-encoded in one step. Nothing is written to disk.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("file exceeds {max} bytes")]
    TooLarge { max: usize },

    #[error("empty upload")]
    Empty,

    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a base64 data URI")]
    InvalidDataUri,
}

/// What an upload is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    /// PDF for a note or tutorial
    #[default]
    Document,
    /// Banner, logo, teacher photo or thumbnail
    Image,
    /// Video file
    Video,
}

impl UploadKind {
    /// MIME type used when the client does not send one
    pub fn default_mime(self) -> &'static str {
        match self {
            UploadKind::Document => "application/pdf",
            UploadKind::Image => "image/png",
            UploadKind::Video => "video/mp4",
        }
    }
}

/// Read `reader` to the end and encode it as a `data:<mime>;base64,` URI.
/// Reading stops with [`MediaError::TooLarge`] as soon as `limit` is passed.
pub async fn read_to_data_uri<R>(reader: R, mime: &str, limit: usize) -> Result<String, MediaError>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut bytes)
        .await?;

    if bytes.len() > limit {
        return Err(MediaError::TooLarge { max: limit });
    }
    if bytes.is_empty() {
        return Err(MediaError::Empty);
    }

    Ok(encode_data_uri(mime, &bytes))
}

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Split a base64 `data:` URI into its MIME type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), MediaError> {
    let rest = uri.strip_prefix("data:").ok_or(MediaError::InvalidDataUri)?;
    let (meta, payload) = rest.split_once(',').ok_or(MediaError::InvalidDataUri)?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or(MediaError::InvalidDataUri)?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| MediaError::InvalidDataUri)?;
    let mime = if mime.is_empty() {
        "application/octet-stream"
    } else {
        mime
    };
    Ok((mime.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encodes_small_file() {
        let uri = read_to_data_uri(&b"%PDF-1.4"[..], "application/pdf", 1024)
            .await
            .unwrap();
        assert_eq!(uri, "data:application/pdf;base64,JVBERi0xLjQ=");

        let (mime, bytes) = decode_data_uri(&uri).unwrap();
        assert_eq!(mime, "application/pdf");
        assert_eq!(bytes, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn limit_is_inclusive() {
        let data = vec![7u8; 16];
        assert!(read_to_data_uri(&data[..], "video/mp4", 16).await.is_ok());
        assert!(matches!(
            read_to_data_uri(&data[..], "video/mp4", 15).await,
            Err(MediaError::TooLarge { max: 15 })
        ));
    }

    #[tokio::test]
    async fn empty_upload_rejected() {
        assert!(matches!(
            read_to_data_uri(&b""[..], "image/png", 10).await,
            Err(MediaError::Empty)
        ));
    }

    #[test]
    fn plain_urls_are_not_data_uris() {
        assert!(decode_data_uri("https://example.com/a.pdf").is_err());
        assert!(decode_data_uri("data:text/plain,hello").is_err());
    }

    #[test]
    fn default_mimes() {
        assert_eq!(UploadKind::Document.default_mime(), "application/pdf");
        assert_eq!(UploadKind::Video.default_mime(), "video/mp4");
    }
}
