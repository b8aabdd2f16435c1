//! Image encoding: file bytes → base64 `ImageData`.
//!
//! The bytes are sent as-is. No decoding, resizing or format check happens
//! here; the MIME type is only a hint taken from the file extension.

use crate::error::Img2MdError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::path::Path;
use tracing::debug;

/// MIME type for `path`, guessed from its extension.
pub fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Encode raw image bytes for the vision API.
pub fn encode_bytes(bytes: &[u8], mime_type: &str) -> ImageData {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, mime_type)
}

/// Read the image at `path` and encode it for the vision API.
pub async fn encode_image(path: &Path) -> Result<ImageData, Img2MdError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Img2MdError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(encode_bytes(&bytes, &guess_mime(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_from_extension() {
        assert_eq!(guess_mime(Path::new("scan.jpg")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("scan.PNG")), "image/png");
        assert_eq!(guess_mime(Path::new("scan")), "application/octet-stream");
    }

    #[test]
    fn encode_bytes_is_plain_base64() {
        let data = encode_bytes(b"\xff\xd8\xff\xe0", "image/jpeg");
        assert_eq!(data.mime_type, "image/jpeg");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, b"\xff\xd8\xff\xe0");
    }

    #[tokio::test]
    async fn encode_image_missing_file_is_read_error() {
        let err = encode_image(Path::new("/definitely/not/here.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, Img2MdError::ReadFailed { .. }));
    }
}
