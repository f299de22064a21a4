//! Data URI encoding and the file upload boundary.
//!
//! Generated images travel as base64 payloads wrapped into `data:` URIs,
//! and user-supplied reference photos enter the session the same way.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Encode raw bytes into a `data:<mime>;base64,<payload>` URI.
pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
}

/// Split a data URI into its media type and base64 payload without decoding.
pub fn parse(uri: &str) -> Result<(&str, &str), DataUriError> {
    let rest = uri.strip_prefix("data:").ok_or(DataUriError::MissingScheme)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUriError::MissingPayload)?;
    let mime_type = header.strip_suffix(";base64").ok_or(DataUriError::NotBase64)?;
    Ok((mime_type, payload))
}

/// Decode a data URI into its media type and raw bytes.
pub fn decode(uri: &str) -> Result<(String, Vec<u8>), DataUriError> {
    let (mime_type, payload) = parse(uri)?;
    let bytes = BASE64.decode(payload)?;
    Ok((mime_type.to_string(), bytes))
}

/// Read a user-selected file and wrap it into a data URI.
///
/// The media subtype is guessed from the file extension; anything
/// unrecognized is labelled `application/octet-stream` and left for the
/// provider to accept or reject.
pub async fn from_file(path: &Path) -> Result<String, DataUriError> {
    let bytes = tokio::fs::read(path).await?;
    let mime_type = mime_for_extension(path.extension().and_then(|e| e.to_str()));
    Ok(encode(mime_type, &bytes))
}

fn mime_for_extension(ext: Option<&str>) -> &'static str {
    match ext.map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Errors from data URI handling.
#[derive(Debug, thiserror::Error)]
pub enum DataUriError {
    #[error("not a data URI")]
    MissingScheme,

    #[error("data URI has no payload")]
    MissingPayload,

    #[error("data URI payload is not base64-encoded")]
    NotBase64,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_data_uri() {
        let uri = encode("image/png", b"hello");
        assert_eq!(uri, "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn test_parse_splits_mime_and_payload() {
        let (mime, payload) = parse("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(payload, "aGVsbG8=");
    }

    #[test]
    fn test_decode_roundtrips_bytes() {
        let uri = encode("image/webp", &[0u8, 1, 2, 255]);
        let (mime, bytes) = decode(&uri).unwrap();
        assert_eq!(mime, "image/webp");
        assert_eq!(bytes, vec![0u8, 1, 2, 255]);
    }

    #[test]
    fn test_parse_rejects_non_data_uri() {
        let result = parse("https://example.com/image.png");
        assert!(matches!(result, Err(DataUriError::MissingScheme)));
    }

    #[test]
    fn test_parse_rejects_missing_payload() {
        let result = parse("data:image/png;base64");
        assert!(matches!(result, Err(DataUriError::MissingPayload)));
    }

    #[test]
    fn test_parse_rejects_non_base64_encoding() {
        let result = parse("data:text/plain,hello");
        assert!(matches!(result, Err(DataUriError::NotBase64)));
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        let result = decode("data:image/png;base64,!!!not-base64!!!");
        assert!(matches!(result, Err(DataUriError::Base64(_))));
    }

    #[test]
    fn test_mime_for_extension_known_types() {
        assert_eq!(mime_for_extension(Some("png")), "image/png");
        assert_eq!(mime_for_extension(Some("JPG")), "image/jpeg");
        assert_eq!(mime_for_extension(Some("jpeg")), "image/jpeg");
        assert_eq!(mime_for_extension(Some("gif")), "image/gif");
        assert_eq!(mime_for_extension(Some("webp")), "image/webp");
    }

    #[test]
    fn test_mime_for_extension_falls_back_to_octet_stream() {
        assert_eq!(mime_for_extension(Some("tiff")), "application/octet-stream");
        assert_eq!(mime_for_extension(None), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_from_file_wraps_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.png");
        tokio::fs::write(&path, b"fake-png").await.unwrap();

        let uri = from_file(&path).await.unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        let (_, bytes) = decode(&uri).unwrap();
        assert_eq!(bytes, b"fake-png");
    }

    #[tokio::test]
    async fn test_from_file_missing_file_is_io_error() {
        let result = from_file(Path::new("/nonexistent/ref.png")).await;
        assert!(matches!(result, Err(DataUriError::Io(_))));
    }
}
