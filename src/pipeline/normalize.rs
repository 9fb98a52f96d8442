//! Document normalisation: turn a stored transcript into one raster image.
//!
//! ## Why only the first page?
//!
//! Transcripts put the student's name, institution and the bulk of the grade
//! table on page 1, and a vision call per page would multiply cost for little
//! gain. Later pages are ignored; the page count is logged.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is blocking and not
//! async-safe. Rendering runs on the blocking pool so Tokio workers keep
//! serving other requests.
//!
//! Page selection is written against [`PaginatedDocument`] rather than pdfium
//! directly, which keeps the zero-page and first-page rules testable without
//! the native library.

use crate::config::{PdfSupport, PdfiumLibrary, VerifierConfig};
use crate::error::VerifyError;
use crate::pipeline::encode::encode_png;
use crate::pipeline::input::{DocumentReference, MediaType};
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Error type returned by [`PaginatedDocument::render_page`].
pub type RenderError = Box<dyn std::error::Error + Send + Sync>;

/// A single raster image ready for the vision model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    /// Always [`MediaType::Png`] or [`MediaType::Jpeg`].
    pub media_type: MediaType,
}

impl NormalizedImage {
    pub fn mime_type(&self) -> &'static str {
        self.media_type.mime()
    }
}

/// Largest edge, in pixels, a rendered page may have.
pub const MAX_RENDER_EDGE: u32 = 16_384;

/// pdfium's edge limit for a configured `max_pixels`.
fn render_edge_limit(max_pixels: u32) -> i32 {
    max_pixels.min(MAX_RENDER_EDGE) as i32
}

/// A decoded multi-page document.
pub trait PaginatedDocument {
    fn page_count(&self) -> usize;

    /// Render the page at `index` (0-based), upscaled by `scale` and capped at
    /// `max_pixels` on either edge.
    fn render_page(
        &self,
        index: usize,
        scale: f32,
        max_pixels: u32,
    ) -> Result<DynamicImage, RenderError>;
}

/// Render page 1 of `doc`; a document without pages is an error.
pub fn rasterize_first_page(
    doc: &dyn PaginatedDocument,
    path: &str,
    scale: f32,
    max_pixels: u32,
) -> Result<DynamicImage, VerifyError> {
    let total = doc.page_count();
    if total == 0 {
        return Err(VerifyError::EmptyDocument {
            path: path.to_string(),
        });
    }
    if total > 1 {
        debug!("'{}' has {} pages; verifying page 1 only", path, total);
    }

    let image = doc
        .render_page(0, scale, max_pixels)
        .map_err(|source| VerifyError::DocumentConversion {
            path: path.to_string(),
            source,
        })?;

    debug!(
        "Rendered page 1 of '{}' → {}x{} px",
        path,
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Converts documents into [`NormalizedImage`]s.
#[derive(Debug, Clone)]
pub struct DocumentNormalizer {
    pdf_support: PdfSupport,
    render_scale: f32,
    max_rendered_pixels: u32,
}

impl DocumentNormalizer {
    pub fn new(pdf_support: PdfSupport, render_scale: f32, max_rendered_pixels: u32) -> Self {
        Self {
            pdf_support,
            render_scale,
            max_rendered_pixels,
        }
    }

    pub fn from_config(config: &VerifierConfig) -> Self {
        Self::new(
            config.pdf_support.clone(),
            config.render_scale,
            config.max_rendered_pixels,
        )
    }

    /// Normalise `bytes`, the content stored at `document`.
    ///
    /// Raster images pass through untouched. PDFs have their first page
    /// rendered and PNG-encoded.
    pub async fn normalize(
        &self,
        document: &DocumentReference,
        bytes: Vec<u8>,
    ) -> Result<NormalizedImage, VerifyError> {
        match document.media_type {
            MediaType::Png | MediaType::Jpeg => Ok(self.pass_through(document, bytes)),
            MediaType::Pdf => self.render_pdf(document, bytes).await,
        }
    }

    fn pass_through(&self, document: &DocumentReference, bytes: Vec<u8>) -> NormalizedImage {
        // Advisory only: the model copes with either format.
        if let Ok(actual) = image::guess_format(&bytes) {
            let declared = match document.media_type {
                MediaType::Png => image::ImageFormat::Png,
                _ => image::ImageFormat::Jpeg,
            };
            if actual != declared {
                debug!(
                    "'{}' is declared {} but content looks like {:?}",
                    document.path, document.media_type, actual
                );
            }
        }
        NormalizedImage {
            bytes,
            media_type: document.media_type,
        }
    }

    async fn render_pdf(
        &self,
        document: &DocumentReference,
        bytes: Vec<u8>,
    ) -> Result<NormalizedImage, VerifyError> {
        let PdfSupport::Pdfium(library) = &self.pdf_support else {
            return Err(VerifyError::UnsupportedFormat {
                media_type: MediaType::Pdf.mime().to_string(),
                hint: "PDF support is not available. Please upload a PNG or JPG image instead."
                    .into(),
            });
        };

        let library = library.clone();
        let path = document.path.clone();
        let scale = self.render_scale;
        let max_pixels = self.max_rendered_pixels;

        let png = tokio::task::spawn_blocking(move || {
            render_pdf_blocking(&library, &bytes, &path, scale, max_pixels)
        })
        .await
        .map_err(|e| VerifyError::Internal(format!("Render task panicked: {}", e)))??;

        info!("Converted '{}' page 1 to PNG ({} bytes)", document.path, png.len());
        Ok(NormalizedImage {
            bytes: png,
            media_type: MediaType::Png,
        })
    }
}

/// Bind to the pdfium shared library.
pub fn bind_pdfium(library: &PdfiumLibrary) -> Result<Pdfium, PdfiumError> {
    let bindings = match library {
        PdfiumLibrary::System => Pdfium::bind_to_system_library()?,
        PdfiumLibrary::Path(p) if p.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(p))?
        }
        PdfiumLibrary::Path(p) => Pdfium::bind_to_library(p)?,
    };
    Ok(Pdfium::new(bindings))
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl PaginatedDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_page(
        &self,
        index: usize,
        scale: f32,
        max_pixels: u32,
    ) -> Result<DynamicImage, RenderError> {
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(scale)
            .set_maximum_width(render_edge_limit(max_pixels))
            .set_maximum_height(render_edge_limit(max_pixels));

        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| format!("page {}: {:?}", index + 1, e))?;

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| format!("page {}: {:?}", index + 1, e))?;

        Ok(bitmap.as_image())
    }
}

/// Blocking implementation of PDF normalisation.
fn render_pdf_blocking(
    library: &PdfiumLibrary,
    bytes: &[u8],
    path: &str,
    scale: f32,
    max_pixels: u32,
) -> Result<Vec<u8>, VerifyError> {
    let pdfium = bind_pdfium(library).map_err(|e| VerifyError::UnsupportedFormat {
        media_type: MediaType::Pdf.mime().to_string(),
        hint: format!("PDF engine unavailable ({:?}). Please upload a PNG or JPG image instead.", e),
    })?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| VerifyError::DocumentConversion {
            path: path.to_string(),
            source: format!("{:?}", e).into(),
        })?;

    let doc = PdfiumDocument { document };
    let image = rasterize_first_page(&doc, path, scale, max_pixels)?;

    encode_png(&image).map_err(|e| VerifyError::DocumentConversion {
        path: path.to_string(),
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::sync::Mutex;

    #[test]
    fn edge_limit_never_wraps_negative() {
        assert_eq!(render_edge_limit(5000), 5000);
        assert_eq!(render_edge_limit(u32::MAX), MAX_RENDER_EDGE as i32);
        assert!(render_edge_limit(i32::MAX as u32 + 1) > 0);
    }

    struct FakeDocument {
        pages: usize,
        fail: bool,
        rendered: Mutex<Vec<(usize, f32)>>,
    }

    impl FakeDocument {
        fn new(pages: usize) -> Self {
            Self {
                pages,
                fail: false,
                rendered: Mutex::new(Vec::new()),
            }
        }
    }

    impl PaginatedDocument for FakeDocument {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn render_page(
            &self,
            index: usize,
            scale: f32,
            _max_pixels: u32,
        ) -> Result<DynamicImage, RenderError> {
            self.rendered.lock().unwrap().push((index, scale));
            if self.fail {
                return Err("bitmap allocation failed".into());
            }
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                4,
                4,
                Rgba([255, 255, 255, 255]),
            )))
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255])));
        encode_png(&img).unwrap()
    }

    #[test]
    fn zero_pages_is_empty_document() {
        let doc = FakeDocument::new(0);
        let err = rasterize_first_page(&doc, "t/a.pdf", 2.0, 5000).unwrap_err();
        assert!(matches!(err, VerifyError::EmptyDocument { .. }));
        assert!(doc.rendered.lock().unwrap().is_empty());
    }

    #[test]
    fn three_pages_render_only_the_first() {
        let doc = FakeDocument::new(3);
        let img = rasterize_first_page(&doc, "t/a.pdf", 2.0, 5000).unwrap();
        assert_eq!(img.width(), 4);
        assert_eq!(*doc.rendered.lock().unwrap(), vec![(0, 2.0)]);
    }

    #[test]
    fn render_failure_is_conversion_error_with_cause() {
        let mut doc = FakeDocument::new(1);
        doc.fail = true;
        let err = rasterize_first_page(&doc, "t/a.pdf", 2.0, 5000).unwrap_err();
        match err {
            VerifyError::DocumentConversion { path, source } => {
                assert_eq!(path, "t/a.pdf");
                assert!(source.to_string().contains("bitmap allocation failed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn png_passes_through_unchanged() {
        let bytes = png_bytes();
        let n = DocumentNormalizer::new(PdfSupport::Disabled, 2.0, 5000);
        let img = n
            .normalize(&DocumentReference::new("t/a.png"), bytes.clone())
            .await
            .unwrap();
        assert_eq!(img.bytes, bytes);
        assert_eq!(img.mime_type(), "image/png");
    }

    #[tokio::test]
    async fn suffix_mismatch_is_not_rejected() {
        // PNG content stored under a .jpg name: passed through as JPEG.
        let bytes = png_bytes();
        let n = DocumentNormalizer::new(PdfSupport::Disabled, 2.0, 5000);
        let img = n
            .normalize(&DocumentReference::new("t/scan.jpg"), bytes.clone())
            .await
            .unwrap();
        assert_eq!(img.bytes, bytes);
        assert_eq!(img.mime_type(), "image/jpeg");
    }

    #[tokio::test]
    async fn pdf_without_support_is_unsupported() {
        let n = DocumentNormalizer::new(PdfSupport::Disabled, 2.0, 5000);
        let err = n
            .normalize(&DocumentReference::new("t/a.pdf"), b"%PDF-1.7".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::UnsupportedFormat { .. }));
    }
}
