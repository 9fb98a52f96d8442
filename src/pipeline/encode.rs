//! Image encoding: `DynamicImage` → PNG bytes, and image bytes → base64
//! payloads for the multimodal API request body.
//!
//! VLM APIs accept images as base64 data URIs embedded in JSON. PNG is used
//! for rendered PDF pages because it is lossless; JPEG artefacts around small
//! grade letters confuse vision models.

use crate::pipeline::normalize::NormalizedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// PNG-encode a rendered page.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// A base64-encoded image with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: &'static str,
    pub base64: String,
}

impl EncodedImage {
    pub fn from_normalized(image: &NormalizedImage) -> Self {
        let base64 = STANDARD.encode(&image.bytes);
        debug!(
            "Encoded {} image → {} bytes base64",
            image.mime_type(),
            base64.len()
        );
        Self {
            mime_type: image.mime_type(),
            base64,
        }
    }

    /// `data:<mime>;base64,<payload>`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }

    /// Attachment for an `edgequake_llm` chat message.
    ///
    /// `detail: "high"` lets GPT-4-class models tile the image instead of
    /// reading a single 512 px overview, which loses fine print.
    pub fn to_image_data(&self, detail: &str) -> ImageData {
        ImageData::new(self.base64.clone(), self.mime_type).with_detail(detail)
    }
}
