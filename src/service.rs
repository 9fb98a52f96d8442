//! Tutor-facing transcript operations: upload, verify, status.
//!
//! Each method corresponds to one HTTP endpoint of the marketplace API and
//! returns the response body that endpoint serialises. Authentication is the
//! caller's job: `subject_id` is an already-authenticated user id. What this
//! layer enforces is the tutor role and the ordering rule that a
//! verification outcome is written only after the whole pipeline succeeded.

use crate::config::{PdfSupport, VerifierConfig};
use crate::error::VerifyError;
use crate::output::{TranscriptStatus, UploadReceipt, VerifyResponse};
use crate::pipeline::input::{storage_path, validate_upload, DocumentReference};
use crate::pipeline::vision::VisionModel;
use crate::store::{DocumentStore, ProfileStore, ReviewState, Role, StoreError, TutorProfile};
use crate::verify::TranscriptVerifier;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct TranscriptService {
    verifier: TranscriptVerifier,
    documents: Arc<dyn DocumentStore>,
    profiles: Arc<dyn ProfileStore>,
    pdf_support: PdfSupport,
    max_upload_bytes: usize,
}

impl TranscriptService {
    pub fn new(
        verifier: TranscriptVerifier,
        documents: Arc<dyn DocumentStore>,
        profiles: Arc<dyn ProfileStore>,
        pdf_support: PdfSupport,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            verifier,
            documents,
            profiles,
            pdf_support,
            max_upload_bytes,
        }
    }

    /// Wire a service whose verifier reads from the same `documents` store
    /// uploads are written to.
    pub fn from_config(
        documents: Arc<dyn DocumentStore>,
        profiles: Arc<dyn ProfileStore>,
        model: Arc<dyn VisionModel>,
        config: &VerifierConfig,
    ) -> Self {
        let verifier = TranscriptVerifier::from_config(Arc::clone(&documents), model, config);
        Self::new(
            verifier,
            documents,
            profiles,
            config.pdf_support.clone(),
            config.max_upload_bytes,
        )
    }

    /// Accept a new transcript file and reset the tutor's state to pending.
    pub async fn upload(
        &self,
        subject_id: &str,
        filename: Option<&str>,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, VerifyError> {
        self.tutor(subject_id).await?;

        let media_type =
            validate_upload(content_type, bytes.len(), self.max_upload_bytes, &self.pdf_support)?;
        let path = storage_path(subject_id, media_type);
        let size = bytes.len();
        if let Some(name) = filename {
            debug!("Upload '{}' for '{}' accepted as {}", name, subject_id, media_type);
        }

        self.documents
            .put(&path, bytes, media_type.mime())
            .await
            .map_err(storage_error)?;
        self.profiles
            .mark_pending(subject_id, &path)
            .await
            .map_err(|e| profile_error(subject_id, e))?;

        info!("Stored transcript for '{}' at {} ({} bytes)", subject_id, path, size);
        Ok(UploadReceipt {
            success: true,
            message: "Transcript uploaded successfully".to_string(),
            file_path: path,
            status: ReviewState::Pending.as_str().to_string(),
        })
    }

    /// Verify the tutor's current transcript against their claimed subjects
    /// and record the outcome.
    ///
    /// Nothing is written unless the pipeline ran to completion; a failed
    /// attempt leaves the previous state untouched.
    pub async fn verify(&self, subject_id: &str) -> Result<VerifyResponse, VerifyError> {
        let profile = self.tutor(subject_id).await?;

        let path = profile
            .transcript
            .file_path
            .ok_or_else(|| VerifyError::NoDocumentOnFile {
                subject_id: subject_id.to_string(),
            })?;

        let outcome = self
            .verifier
            .run_verification(&DocumentReference::new(path), &profile.subjects)
            .await?;

        self.profiles
            .update(subject_id, &outcome)
            .await
            .map_err(|e| profile_error(subject_id, e))?;

        Ok(outcome.into())
    }

    /// Current transcript state as recorded on the profile.
    pub async fn status(&self, subject_id: &str) -> Result<TranscriptStatus, VerifyError> {
        let transcript = self.tutor(subject_id).await?.transcript;

        Ok(TranscriptStatus {
            has_transcript: transcript.file_path.is_some(),
            status: transcript.status.map(|s| s.as_str().to_string()),
            verified_at: transcript.verified_at,
            verification_data: transcript.verification_data,
        })
    }

    /// Load the profile and require the tutor role.
    async fn tutor(&self, subject_id: &str) -> Result<TutorProfile, VerifyError> {
        let profile = self
            .profiles
            .tutor_profile(subject_id)
            .await
            .map_err(|e| profile_error(subject_id, e))?
            .ok_or_else(|| VerifyError::ProfileNotFound {
                subject_id: subject_id.to_string(),
            })?;

        if !profile.has_role(Role::Tutor) {
            warn!("'{}' attempted a transcript operation without the tutor role", subject_id);
            return Err(VerifyError::Forbidden {
                subject_id: subject_id.to_string(),
                role: Role::Tutor.to_string(),
            });
        }
        Ok(profile)
    }
}

fn storage_error(e: StoreError) -> VerifyError {
    VerifyError::Storage(e.to_string())
}

fn profile_error(subject_id: &str, e: StoreError) -> VerifyError {
    match e {
        StoreError::NotFound { .. } => VerifyError::ProfileNotFound {
            subject_id: subject_id.to_string(),
        },
        StoreError::Backend(msg) => VerifyError::Storage(msg),
    }
}
