//! Configuration for transcript verification.
//!
//! All pipeline behaviour is controlled through [`VerifierConfig`], built via
//! [`VerifierConfigBuilder`]. The config is constructed once at process start
//! and handed to [`crate::verify::TranscriptVerifier::from_config`]; nothing
//! in the pipeline reads process-wide state after that.
//!
//! PDF support is a capability, not a guess: [`PdfSupport::detect`] probes
//! for a pdfium library once and the answer travels inside the config to the
//! normaliser.

use crate::error::VerifyError;
use crate::pipeline::normalize::{bind_pdfium, MAX_RENDER_EDGE};
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Default vision model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for a [`crate::verify::TranscriptVerifier`].
///
/// # Example
/// ```rust
/// use transcript_verify::VerifierConfig;
///
/// let config = VerifierConfig::builder()
///     .render_scale(3.0)
///     .max_tokens(1500)
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 1500);
/// ```
#[derive(Clone)]
pub struct VerifierConfig {
    /// Upscaling factor applied when rasterising the first PDF page. Range: 2.0–4.0. Default: 2.0.
    ///
    /// Transcripts are dense tables of small print; below 2× the model
    /// misreads grades like "B+" vs "B".
    pub render_scale: f32,

    /// Cap on either rendered dimension in pixels. Range: 500–[`MAX_RENDER_EDGE`]. Default: 5000.
    pub max_rendered_pixels: u32,

    /// Maximum tokens the model may generate. Default: 2000.
    pub max_tokens: usize,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// Provider name (e.g. "openai", "anthropic", "gemini").
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Timeout for the single vision call, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Image detail hint passed with the attachment. Default: "high".
    pub image_detail: String,

    /// Largest accepted upload in bytes. Default: 10 MiB.
    pub max_upload_bytes: usize,

    /// Whether PDFs can be rasterised in this process. Default: disabled.
    pub pdf_support: PdfSupport,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            max_rendered_pixels: 5000,
            max_tokens: 2000,
            temperature: 0.0,
            model: None,
            provider_name: None,
            provider: None,
            api_timeout_secs: 60,
            image_detail: "high".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            pdf_support: PdfSupport::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for VerifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierConfig")
            .field("render_scale", &self.render_scale)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("image_detail", &self.image_detail)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("pdf_support", &self.pdf_support)
            .finish()
    }
}

impl VerifierConfig {
    /// Create a new builder for `VerifierConfig`.
    pub fn builder() -> VerifierConfigBuilder {
        VerifierConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model to request, falling back to [`DEFAULT_MODEL`].
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`VerifierConfig`].
pub struct VerifierConfigBuilder {
    config: VerifierConfig,
}

impl fmt::Debug for VerifierConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl VerifierConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(2.0, 4.0);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.clamp(500, MAX_RENDER_EDGE);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn image_detail(mut self, detail: impl Into<String>) -> Self {
        self.config.image_detail = detail.into();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn pdf_support(mut self, support: PdfSupport) -> Self {
        self.config.pdf_support = support;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<VerifierConfig, VerifyError> {
        let c = &self.config;
        if !(2.0..=4.0).contains(&c.render_scale) {
            return Err(VerifyError::InvalidConfig(format!(
                "render scale must be 2.0–4.0, got {}",
                c.render_scale
            )));
        }
        if c.max_tokens == 0 {
            return Err(VerifyError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(VerifyError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(VerifyError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── PDF capability ───────────────────────────────────────────────────────

/// Where to load the pdfium shared library from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfiumLibrary {
    /// The platform's system library search path.
    System,
    /// A directory containing `libpdfium.so` / `libpdfium.dylib` / `pdfium.dll`,
    /// or the library file itself.
    Path(PathBuf),
}

/// Whether paginated documents (PDF) can be rasterised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PdfSupport {
    /// PDFs are rejected with `UnsupportedFormat`.
    #[default]
    Disabled,
    /// PDFs are rendered with pdfium loaded from this location.
    Pdfium(PdfiumLibrary),
}

impl PdfSupport {
    /// Probe for a usable pdfium library, once, at startup.
    ///
    /// Tries `lib_path` when given, otherwise the system library. Returns
    /// [`PdfSupport::Disabled`] (with a warning) when binding fails so the
    /// process still serves image transcripts.
    pub fn detect(lib_path: Option<&Path>) -> Self {
        let library = match lib_path {
            Some(p) => PdfiumLibrary::Path(p.to_path_buf()),
            None => PdfiumLibrary::System,
        };
        match bind_pdfium(&library) {
            Ok(_) => {
                info!("PDF support enabled ({:?})", library);
                PdfSupport::Pdfium(library)
            }
            Err(e) => {
                warn!(
                    "PDF support disabled: could not bind pdfium ({:?}): {:?}",
                    library, e
                );
                PdfSupport::Disabled
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, PdfSupport::Pdfium(_))
    }
}
