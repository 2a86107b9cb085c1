//! Evidence artifacts accepted by the forensic pipeline
//!
//! An uploaded artifact is classified once, at the boundary, into one of two
//! variants. Everything downstream dispatches on the variant instead of
//! re-inspecting bytes or content types.

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors raised while classifying an uploaded artifact
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvidenceError {
    /// The artifact is neither a raster image nor plain text
    #[error("Unsupported evidence type: {content_type}. Upload an image (png, jpeg, gif, webp, bmp, tiff) or a plain text file")]
    UnsupportedEvidenceType { content_type: String },

    /// The upload carried no bytes
    #[error("Evidence is empty")]
    Empty,
}

/// Raster image formats the vision collaborator accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
    Tiff,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
        }
    }

    /// Detects the format from the leading magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageFormat::Webp)
        } else if bytes.starts_with(b"BM") && bytes.len() >= 14 {
            Some(ImageFormat::Bmp)
        } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            Some(ImageFormat::Tiff)
        } else {
            None
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
            "image/gif" => Some(ImageFormat::Gif),
            "image/webp" => Some(ImageFormat::Webp),
            "image/bmp" | "image/x-ms-bmp" => Some(ImageFormat::Bmp),
            "image/tiff" => Some(ImageFormat::Tiff),
            _ => None,
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" | "jpe" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "webp" => Some(ImageFormat::Webp),
            "bmp" => Some(ImageFormat::Bmp),
            "tif" | "tiff" => Some(ImageFormat::Tiff),
            _ => None,
        }
    }
}

/// The single artifact analysed by one pipeline run
///
/// Immutable once constructed and never persisted.
#[derive(Clone, PartialEq, Eq)]
pub enum Evidence {
    /// Raster image bytes with their MIME type
    Image { bytes: Vec<u8>, mime_type: String },
    /// Plain text document
    Text { content: String },
}

impl Evidence {
    pub fn image(bytes: Vec<u8>, format: ImageFormat) -> Self {
        Evidence::Image {
            bytes,
            mime_type: format.mime_type().to_string(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Evidence::Text {
            content: content.into(),
        }
    }

    /// Classifies an uploaded artifact
    ///
    /// Magic bytes win over the declared content type, which wins over the
    /// file extension. Text is only accepted when the upload is declared or
    /// named as text and decodes as UTF-8.
    pub fn from_upload(
        bytes: Vec<u8>,
        declared_type: Option<&str>,
        file_name: Option<&str>,
    ) -> Result<Self, EvidenceError> {
        if bytes.is_empty() {
            return Err(EvidenceError::Empty);
        }

        let declared = declared_type
            .map(|t| {
                t.split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_ascii_lowercase()
            })
            .filter(|t| !t.is_empty() && t != "application/octet-stream");
        let extension = file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str());

        if let Some(format) = ImageFormat::sniff(&bytes)
            .or_else(|| declared.as_deref().and_then(ImageFormat::from_mime))
            .or_else(|| extension.and_then(ImageFormat::from_extension))
        {
            return Ok(Evidence::image(bytes, format));
        }

        let looks_textual = match declared.as_deref() {
            Some(t) => t.starts_with("text/"),
            None => matches!(
                extension.map(|e| e.to_ascii_lowercase()).as_deref(),
                Some("txt") | Some("text") | Some("md") | Some("log") | Some("csv")
            ),
        };

        if looks_textual {
            if let Ok(content) = String::from_utf8(bytes) {
                return Ok(Evidence::Text { content });
            }
        }

        Err(EvidenceError::UnsupportedEvidenceType {
            content_type: declared
                .or_else(|| extension.map(|e| format!(".{}", e)))
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Evidence::Image { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Evidence::Image { .. } => "image",
            Evidence::Text { .. } => "text",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Evidence::Image { bytes, .. } => bytes.len(),
            Evidence::Text { content } => content.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hex SHA-256 of the artifact bytes, used to correlate log lines
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            Evidence::Image { bytes, .. } => hasher.update(bytes),
            Evidence::Text { content } => hasher.update(content.as_bytes()),
        }
        hex::encode(hasher.finalize())
    }
}

impl fmt::Debug for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evidence::Image { bytes, mime_type } => f
                .debug_struct("Image")
                .field("mime_type", mime_type)
                .field("len", &bytes.len())
                .finish(),
            Evidence::Text { content } => f
                .debug_struct("Text")
                .field("len", &content.len())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F'];

    #[test]
    fn test_sniff_png_ignores_declared_type() {
        let evidence =
            Evidence::from_upload(PNG_HEADER.to_vec(), Some("text/plain"), Some("a.txt")).unwrap();
        assert_eq!(
            evidence,
            Evidence::Image {
                bytes: PNG_HEADER.to_vec(),
                mime_type: "image/png".to_string()
            }
        );
    }

    #[test]
    fn test_sniff_jpeg() {
        let evidence = Evidence::from_upload(JPEG_HEADER.to_vec(), None, None).unwrap();
        assert!(evidence.is_image());
        match evidence {
            Evidence::Image { mime_type, .. } => assert_eq!(mime_type, "image/jpeg"),
            _ => panic!("Expected image"),
        }
    }

    #[test]
    fn test_declared_image_type_without_magic() {
        let evidence =
            Evidence::from_upload(vec![1, 2, 3], Some("image/webp; charset=binary"), None)
                .unwrap();
        match evidence {
            Evidence::Image { mime_type, .. } => assert_eq!(mime_type, "image/webp"),
            _ => panic!("Expected image"),
        }
    }

    #[test]
    fn test_extension_fallback_for_octet_stream() {
        let evidence = Evidence::from_upload(
            vec![1, 2, 3],
            Some("application/octet-stream"),
            Some("scan.JPG"),
        )
        .unwrap();
        assert!(evidence.is_image());
    }

    #[test]
    fn test_text_upload() {
        let evidence = Evidence::from_upload(
            b"Invoice #42\nPay to: ACME".to_vec(),
            Some("text/plain"),
            Some("invoice.txt"),
        )
        .unwrap();
        assert_eq!(evidence, Evidence::text("Invoice #42\nPay to: ACME"));
        assert_eq!(evidence.kind(), "text");
    }

    #[test]
    fn test_text_by_extension() {
        let evidence = Evidence::from_upload(b"hello".to_vec(), None, Some("notes.md")).unwrap();
        assert!(!evidence.is_image());
    }

    #[test]
    fn test_unsupported_type() {
        let err = Evidence::from_upload(b"%PDF-1.7".to_vec(), Some("application/pdf"), None)
            .unwrap_err();
        assert_eq!(
            err,
            EvidenceError::UnsupportedEvidenceType {
                content_type: "application/pdf".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_utf8_text_is_rejected() {
        let err = Evidence::from_upload(vec![0xC3, 0x28], Some("text/plain"), None).unwrap_err();
        assert!(matches!(err, EvidenceError::UnsupportedEvidenceType { .. }));
    }

    #[test]
    fn test_empty_upload() {
        assert_eq!(
            Evidence::from_upload(Vec::new(), Some("image/png"), None),
            Err(EvidenceError::Empty)
        );
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = Evidence::text("same");
        let b = Evidence::text("same");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert_ne!(a.fingerprint(), Evidence::text("other").fingerprint());
    }

    #[test]
    fn test_debug_does_not_dump_bytes() {
        let evidence = Evidence::image(vec![0u8; 1024], ImageFormat::Png);
        let debug = format!("{:?}", evidence);
        assert!(debug.contains("len: 1024"));
        assert!(!debug.contains("0, 0, 0"));
    }
}
