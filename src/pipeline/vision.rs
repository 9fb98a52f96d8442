//! VLM interaction: submit the transcript image and prompt, get raw text back.
//!
//! The external model sits behind [`VisionModel`] so the orchestrator can be
//! driven by a fake in tests and by any `edgequake_llm` provider in
//! production ([`LlmVisionModel`]).
//!
//! ## No retries
//!
//! Verification is triggered by a tutor clicking a button and is safe to
//! repeat, so a failed call surfaces immediately as
//! [`VerifyError::VerificationService`]. Whether to retry is the caller's
//! decision. The call is bounded by a timeout and holds no locks while in
//! flight; dropping the future abandons the request.

use crate::config::VerifierConfig;
use crate::error::VerifyError;
use crate::pipeline::encode::EncodedImage;
use crate::pipeline::normalize::NormalizedImage;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Prompt text plus one image, sent as a single user turn.
#[derive(Debug, Clone)]
pub struct MultimodalPrompt {
    pub text: String,
    pub image: EncodedImage,
}

/// A vision-capable model: one request, one text reply.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Provider name used in logs and error messages.
    fn name(&self) -> &str;

    async fn complete(
        &self,
        prompt: &MultimodalPrompt,
        max_tokens: usize,
    ) -> Result<String, VerifyError>;
}

/// [`VisionModel`] backed by an `edgequake_llm` provider.
pub struct LlmVisionModel {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    image_detail: String,
}

impl LlmVisionModel {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32, image_detail: impl Into<String>) -> Self {
        Self {
            provider,
            temperature,
            image_detail: image_detail.into(),
        }
    }

    /// Resolve the provider from `config` (see [`resolve_provider`]).
    pub fn from_config(config: &VerifierConfig) -> Result<Self, VerifyError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config.temperature, config.image_detail.clone()))
    }
}

#[async_trait]
impl VisionModel for LlmVisionModel {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn complete(
        &self,
        prompt: &MultimodalPrompt,
        max_tokens: usize,
    ) -> Result<String, VerifyError> {
        let messages = vec![ChatMessage::user_with_images(
            prompt.text.as_str(),
            vec![prompt.image.to_image_data(&self.image_detail)],
        )];
        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| VerifyError::VerificationService {
                provider: self.provider.name().to_string(),
                message: e.to_string(),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.provider.name(),
            response.prompt_tokens,
            response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Encodes the image and performs the single, timeout-bounded model call.
#[derive(Clone)]
pub struct VisionClient {
    model: Arc<dyn VisionModel>,
    max_tokens: usize,
    timeout: Duration,
}

impl VisionClient {
    pub fn new(model: Arc<dyn VisionModel>, max_tokens: usize, timeout: Duration) -> Self {
        Self {
            model,
            max_tokens,
            timeout,
        }
    }

    pub fn from_config(model: Arc<dyn VisionModel>, config: &VerifierConfig) -> Self {
        Self::new(
            model,
            config.max_tokens,
            Duration::from_secs(config.api_timeout_secs),
        )
    }

    /// Submit `image` with `prompt_text`; returns the model's raw reply.
    pub async fn verify(
        &self,
        image: &NormalizedImage,
        prompt_text: &str,
    ) -> Result<String, VerifyError> {
        let prompt = MultimodalPrompt {
            text: prompt_text.to_string(),
            image: EncodedImage::from_normalized(image),
        };

        let start = Instant::now();
        let reply = tokio::time::timeout(self.timeout, self.model.complete(&prompt, self.max_tokens))
            .await
            .map_err(|_| VerifyError::ServiceTimeout {
                secs: self.timeout.as_secs(),
            })??;

        info!(
            "{} replied with {} chars in {}ms",
            self.model.name(),
            reply.len(),
            start.elapsed().as_millis()
        );
        Ok(reply)
    }
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, VerifyError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        VerifyError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`).
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **`OPENAI_API_KEY`** present → OpenAI with the configured model.
/// 5. **Full auto-detection** via `ProviderFactory::from_env`.
pub fn resolve_provider(config: &VerifierConfig) -> Result<Arc<dyn LLMProvider>, VerifyError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", config.model_or_default());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| VerifyError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
