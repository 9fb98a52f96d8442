//! Input resolution: media types, document references and upload policy.
//!
//! A stored transcript is identified only by its storage path. Its media type
//! comes either from the upload's content type (when we have it) or from the
//! path suffix. Suffix inference is advisory: a `.jpg` that is really a PNG is
//! still handed to the model, which reads either.

use crate::config::PdfSupport;
use crate::error::VerifyError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Media types a transcript may be stored as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    /// Paginated document; needs rasterising.
    Pdf,
    Png,
    Jpeg,
}

impl MediaType {
    /// Canonical MIME type.
    pub fn mime(self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
        }
    }

    /// Canonical file extension (without dot).
    pub fn extension(self) -> &'static str {
        match self {
            MediaType::Pdf => "pdf",
            MediaType::Png => "png",
            MediaType::Jpeg => "jpg",
        }
    }

    pub fn is_raster(self) -> bool {
        !matches!(self, MediaType::Pdf)
    }

    /// Parse an upload content type. Parameters (`; charset=…`) are ignored.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(MediaType::Pdf),
            "image/png" => Some(MediaType::Png),
            "image/jpeg" | "image/jpg" => Some(MediaType::Jpeg),
            _ => None,
        }
    }

    /// Infer from a storage path suffix: `.pdf` → PDF, `.png` → PNG,
    /// anything else → JPEG.
    pub fn from_path(path: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            MediaType::Pdf
        } else if lower.ends_with(".png") {
            MediaType::Png
        } else {
            MediaType::Jpeg
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Pointer to a previously uploaded transcript in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReference {
    pub path: String,
    pub media_type: MediaType,
}

impl DocumentReference {
    /// Reference with the media type inferred from the path suffix.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let media_type = MediaType::from_path(&path);
        Self { path, media_type }
    }

    /// Reference with an explicitly declared media type.
    pub fn with_media_type(path: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            path: path.into(),
            media_type,
        }
    }
}

/// Check an upload against the type and size policy.
///
/// Returns the accepted media type. PDFs are refused up front when this
/// process cannot rasterise them, so the tutor is told at upload time rather
/// than at verification time.
pub fn validate_upload(
    content_type: &str,
    size: usize,
    max_bytes: usize,
    pdf_support: &PdfSupport,
) -> Result<MediaType, VerifyError> {
    let allowed = if pdf_support.is_enabled() {
        "PDF, PNG, JPG"
    } else {
        "PNG, JPG"
    };

    let media_type =
        MediaType::from_content_type(content_type).ok_or_else(|| VerifyError::InvalidUpload {
            reason: format!("Invalid file type. Allowed types: {allowed}"),
        })?;

    if media_type == MediaType::Pdf && !pdf_support.is_enabled() {
        return Err(VerifyError::InvalidUpload {
            reason: "PDF support is not available. Please upload a PNG or JPG image instead."
                .into(),
        });
    }

    if size == 0 {
        return Err(VerifyError::InvalidUpload {
            reason: "The uploaded file is empty".into(),
        });
    }

    if size > max_bytes {
        return Err(VerifyError::InvalidUpload {
            reason: format!(
                "File too large. Maximum size: {}MB",
                max_bytes / (1024 * 1024)
            ),
        });
    }

    debug!("Upload accepted: {} ({} bytes)", media_type, size);
    Ok(media_type)
}

/// Storage path for a new upload: `{subject_id}/{unique}.{ext}`.
///
/// The extension is always the validated media type's, so
/// [`MediaType::from_path`] reads back the type the upload was accepted as.
pub fn storage_path(subject_id: &str, media_type: MediaType) -> String {
    let ext = media_type.extension();
    let now = Utc::now();
    let unique = format!(
        "{}-{:09}",
        now.format("%Y%m%dT%H%M%S"),
        now.timestamp_subsec_nanos()
    );
    format!("{subject_id}/{unique}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PdfiumLibrary;

    const MB: usize = 1024 * 1024;

    #[test]
    fn path_suffix_inference() {
        assert_eq!(MediaType::from_path("u1/a.PDF"), MediaType::Pdf);
        assert_eq!(MediaType::from_path("u1/a.png"), MediaType::Png);
        assert_eq!(MediaType::from_path("u1/a.jpg"), MediaType::Jpeg);
        assert_eq!(MediaType::from_path("u1/a.jpeg"), MediaType::Jpeg);
        // Unknown suffixes are treated as JPEG, never rejected.
        assert_eq!(MediaType::from_path("u1/a.webp"), MediaType::Jpeg);
        assert_eq!(MediaType::from_path("u1/noext"), MediaType::Jpeg);
    }

    #[test]
    fn content_type_parsing() {
        assert_eq!(
            MediaType::from_content_type("application/pdf"),
            Some(MediaType::Pdf)
        );
        assert_eq!(MediaType::from_content_type("image/jpg"), Some(MediaType::Jpeg));
        assert_eq!(
            MediaType::from_content_type("IMAGE/PNG; charset=binary"),
            Some(MediaType::Png)
        );
        assert_eq!(MediaType::from_content_type("text/plain"), None);
    }

    #[test]
    fn reference_infers_media_type() {
        let r = DocumentReference::new("tutor-1/x.pdf");
        assert_eq!(r.media_type, MediaType::Pdf);
        let r = DocumentReference::with_media_type("tutor-1/x.bin", MediaType::Png);
        assert_eq!(r.media_type, MediaType::Png);
    }

    #[test]
    fn upload_rejects_unknown_type() {
        let err = validate_upload("text/plain", 10, MB, &PdfSupport::Disabled).unwrap_err();
        assert!(err.public_message().contains("PNG, JPG"));
    }

    #[test]
    fn upload_rejects_pdf_without_support() {
        let err = validate_upload("application/pdf", 10, MB, &PdfSupport::Disabled).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidUpload { .. }));

        let enabled = PdfSupport::Pdfium(PdfiumLibrary::System);
        assert_eq!(
            validate_upload("application/pdf", 10, MB, &enabled).unwrap(),
            MediaType::Pdf
        );
    }

    #[test]
    fn upload_rejects_oversized_and_empty() {
        let err = validate_upload("image/png", 11 * MB, 10 * MB, &PdfSupport::Disabled)
            .unwrap_err();
        assert!(err.to_string().contains("Maximum size: 10MB"));
        assert!(validate_upload("image/png", 0, MB, &PdfSupport::Disabled).is_err());
    }

    #[test]
    fn storage_path_uses_subject_prefix_and_extension() {
        let p = storage_path("tutor-7", MediaType::Png);
        assert!(p.starts_with("tutor-7/"));
        assert!(p.ends_with(".png"));

        assert!(storage_path("tutor-7", MediaType::Pdf).ends_with(".pdf"));
        assert!(storage_path("tutor-7", MediaType::Jpeg).ends_with(".jpg"));
    }

    #[test]
    fn storage_path_round_trips_media_type() {
        for media_type in [MediaType::Pdf, MediaType::Png, MediaType::Jpeg] {
            let p = storage_path("t", media_type);
            assert_eq!(MediaType::from_path(&p), media_type);
        }
    }
}
