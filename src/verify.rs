//! Verification orchestrator: one stored transcript in, one outcome out.
//!
//! ```text
//! fetch ─▶ normalize ─▶ prompt ─▶ vision ─▶ parse ─▶ VerificationOutcome
//! ```
//!
//! [`TranscriptVerifier::run_verification`] never persists anything. The
//! caller decides what to do with the outcome, which keeps the "write only
//! after the whole pipeline succeeded" rule in one place
//! ([`crate::service::TranscriptService::verify`]).

use crate::config::VerifierConfig;
use crate::error::VerifyError;
use crate::output::VerificationOutcome;
use crate::pipeline::input::DocumentReference;
use crate::pipeline::normalize::DocumentNormalizer;
use crate::pipeline::parse::parse_response;
use crate::pipeline::vision::{LlmVisionModel, VisionClient, VisionModel};
use crate::progress::{ProgressCallback, Stage};
use crate::prompts::build_verification_prompt;
use crate::store::{DocumentStore, FsDocumentStore, StoreError};
use chrono::Utc;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs the verification pipeline against injected collaborators.
///
/// Holds no per-request state, so one instance can serve concurrent
/// verifications behind an `Arc`.
pub struct TranscriptVerifier {
    documents: Arc<dyn DocumentStore>,
    normalizer: DocumentNormalizer,
    vision: VisionClient,
    progress: Option<ProgressCallback>,
}

impl TranscriptVerifier {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        normalizer: DocumentNormalizer,
        vision: VisionClient,
    ) -> Self {
        Self {
            documents,
            normalizer,
            vision,
            progress: None,
        }
    }

    /// Build from a config: normaliser settings, token limit, timeout and
    /// progress callback all come from `config`.
    pub fn from_config(
        documents: Arc<dyn DocumentStore>,
        model: Arc<dyn VisionModel>,
        config: &VerifierConfig,
    ) -> Self {
        Self {
            documents,
            normalizer: DocumentNormalizer::from_config(config),
            vision: VisionClient::from_config(model, config),
            progress: config.progress_callback.clone(),
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Verify the transcript at `document` against `claimed_subjects`.
    ///
    /// # Errors
    /// - [`VerifyError::DocumentNotFound`]: nothing stored at the path
    /// - [`VerifyError::UnsupportedFormat`], [`VerifyError::DocumentConversion`],
    ///   [`VerifyError::EmptyDocument`]: the document could not be normalised
    /// - [`VerifyError::VerificationService`], [`VerifyError::ServiceTimeout`]:
    ///   the model call failed
    ///
    /// An unreadable model reply is not an error; it yields a rejected
    /// outcome.
    pub async fn run_verification(
        &self,
        document: &DocumentReference,
        claimed_subjects: &[String],
    ) -> Result<VerificationOutcome, VerifyError> {
        let start = Instant::now();
        info!(
            "Verifying transcript '{}' ({}) against {} claimed subjects",
            document.path,
            document.media_type,
            claimed_subjects.len()
        );

        let bytes = self.stage(Stage::Fetch, self.fetch(document)).await?;

        let image = self
            .stage(Stage::Normalize, self.normalizer.normalize(document, bytes))
            .await?;

        let prompt = self
            .stage(Stage::Prompt, async {
                Ok(build_verification_prompt(claimed_subjects))
            })
            .await?;

        let raw = self
            .stage(Stage::Vision, self.vision.verify(&image, &prompt))
            .await?;

        let result = self
            .stage(Stage::Parse, async { Ok(parse_response(&raw)) })
            .await?;

        let outcome = VerificationOutcome::new(result, Utc::now());

        if let Some(ref cb) = self.progress {
            cb.on_verification_complete(outcome.status);
        }
        info!(
            "Transcript '{}' {} in {}ms ({} courses, authenticity {:.2})",
            document.path,
            outcome.status,
            start.elapsed().as_millis(),
            outcome.verification_data.verified_courses.len(),
            outcome.verification_data.authenticity_score
        );

        Ok(outcome)
    }

    async fn fetch(&self, document: &DocumentReference) -> Result<Vec<u8>, VerifyError> {
        match self.documents.fetch(&document.path).await {
            Ok(bytes) => {
                debug!("Fetched {} bytes for '{}'", bytes.len(), document.path);
                Ok(bytes)
            }
            Err(StoreError::NotFound { .. }) => Err(VerifyError::DocumentNotFound {
                path: document.path.clone(),
            }),
            Err(StoreError::Backend(msg)) => Err(VerifyError::Storage(msg)),
        }
    }

    /// Run one stage, reporting start, completion or failure.
    async fn stage<T, F>(&self, stage: Stage, work: F) -> Result<T, VerifyError>
    where
        F: Future<Output = Result<T, VerifyError>>,
    {
        if let Some(ref cb) = self.progress {
            cb.on_stage_start(stage);
        }
        let start = Instant::now();

        match work.await {
            Ok(value) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                debug!("Stage {} done in {}ms", stage, elapsed_ms);
                if let Some(ref cb) = self.progress {
                    cb.on_stage_complete(stage, elapsed_ms);
                }
                Ok(value)
            }
            Err(e) => {
                warn!("Stage {} failed: {}", stage, e);
                if let Some(ref cb) = self.progress {
                    cb.on_stage_error(stage, &e.to_string());
                }
                Err(e)
            }
        }
    }
}

/// Verify a transcript on the local filesystem with the provider `config`
/// resolves to.
///
/// The file's directory becomes the document store root; the media type is
/// inferred from the file name.
pub async fn verify_file(
    path: impl AsRef<Path>,
    claimed_subjects: &[String],
    config: &VerifierConfig,
) -> Result<VerificationOutcome, VerifyError> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| VerifyError::DocumentNotFound {
            path: path.display().to_string(),
        })?;
    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let model = Arc::new(LlmVisionModel::from_config(config)?);
    let verifier =
        TranscriptVerifier::from_config(Arc::new(FsDocumentStore::new(root)), model, config);

    verifier
        .run_verification(&DocumentReference::new(name), claimed_subjects)
        .await
}
