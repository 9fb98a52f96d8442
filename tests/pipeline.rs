//! Whole-pipeline tests with in-memory stores and a scripted vision model.
//!
//! No network, no pdfium: the transcript is a raster image and the model's
//! reply is fixed per test.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use transcript_verify::pipeline::parse::{FALLBACK_REJECTION_REASON, FALLBACK_SUMMARY};
use transcript_verify::pipeline::vision::MultimodalPrompt;
use transcript_verify::prompts::NO_SUBJECTS_PLACEHOLDER;
use transcript_verify::store::{
    MemoryDocumentStore, MemoryProfileStore, ReviewState, Role, TutorProfile,
};
use transcript_verify::{
    DocumentReference, TranscriptService, TranscriptVerifier, VerificationStatus, VerifierConfig,
    VerifyError, VisionModel,
};

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Returns a fixed reply and remembers every prompt it was sent.
struct ScriptedModel {
    reply: String,
    prompts: Mutex<Vec<MultimodalPrompt>>,
}

impl ScriptedModel {
    fn new(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn last_prompt_text(&self) -> String {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .map(|p| p.text.clone())
            .expect("model was never called")
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        prompt: &MultimodalPrompt,
        _max_tokens: usize,
    ) -> Result<String, VerifyError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        Ok(self.reply.clone())
    }
}

const TRANSCRIPT_PATH: &str = "tutor-1/transcript.png";
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

const VERIFIED_REPLY: &str = "```json\n{\"verified_courses\":[{\"course_name\":\"Calculus II\",\"grade\":\"A\",\"grade_points\":4.0,\"matches_subject\":\"Calculus\"}],\"overall_status\":\"verified\",\"authenticity_score\":0.9,\"authenticity_notes\":\"Registrar seal present\",\"rejection_reason\":null,\"summary\":\"Strong calculus record\"}\n```";

struct Harness {
    service: TranscriptService,
    documents: Arc<MemoryDocumentStore>,
    profiles: Arc<MemoryProfileStore>,
    model: Arc<ScriptedModel>,
}

fn harness(reply: &str, subjects: &[&str], with_document: bool) -> Harness {
    let documents = Arc::new(MemoryDocumentStore::new());
    if with_document {
        documents.insert(TRANSCRIPT_PATH, PNG_MAGIC.to_vec(), "image/png");
    }

    let profiles = Arc::new(MemoryProfileStore::new());
    let mut profile = TutorProfile::new(
        "tutor-1",
        vec![Role::Tutor],
        subjects.iter().map(|s| s.to_string()).collect(),
    );
    profile.transcript.file_path = Some(TRANSCRIPT_PATH.to_string());
    profile.transcript.status = Some(ReviewState::Pending);
    profiles.insert(profile);

    let model = ScriptedModel::new(reply);
    let service = TranscriptService::from_config(
        documents.clone(),
        profiles.clone(),
        model.clone(),
        &VerifierConfig::default(),
    );

    Harness {
        service,
        documents,
        profiles,
        model,
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fenced_verified_reply_is_recorded_as_verified() {
    let h = harness(VERIFIED_REPLY, &["Calculus"], true);

    let response = h.service.verify("tutor-1").await.unwrap();
    assert!(response.success);
    assert_eq!(response.status, VerificationStatus::Verified);
    assert_eq!(response.verification_data.authenticity_score, 0.9);
    assert_eq!(response.verification_data.qualifying_courses().count(), 1);

    let stored = h.profiles.get("tutor-1").unwrap().transcript;
    assert_eq!(stored.status, Some(ReviewState::Verified));
    assert!(stored.verified_at.is_some());
    assert_eq!(h.profiles.update_count(), 1);

    let status = h.service.status("tutor-1").await.unwrap();
    assert_eq!(status.status.as_deref(), Some("verified"));
    assert!(status.verified_at.is_some());
}

#[tokio::test]
async fn unreadable_reply_is_recorded_as_rejected() {
    let h = harness("not json at all", &["Calculus"], true);

    let response = h.service.verify("tutor-1").await.unwrap();
    assert_eq!(response.status, VerificationStatus::Rejected);
    assert_eq!(
        response.verification_data.rejection_reason.as_deref(),
        Some(FALLBACK_REJECTION_REASON)
    );
    assert_eq!(response.verification_data.summary, FALLBACK_SUMMARY);

    let stored = h.profiles.get("tutor-1").unwrap().transcript;
    assert_eq!(stored.status, Some(ReviewState::Rejected));
    assert!(stored.verified_at.is_none());
}

#[tokio::test]
async fn no_claimed_subjects_uses_placeholder() {
    let h = harness(VERIFIED_REPLY, &[], true);

    h.service.verify("tutor-1").await.unwrap();

    let prompt = h.model.last_prompt_text();
    assert!(prompt.contains(NO_SUBJECTS_PLACEHOLDER));
    assert!(!prompt.contains("[]"));
}

#[tokio::test]
async fn missing_document_aborts_without_writing() {
    let h = harness(VERIFIED_REPLY, &["Calculus"], false);

    let err = h.service.verify("tutor-1").await.unwrap_err();
    assert!(matches!(err, VerifyError::DocumentNotFound { .. }));
    assert_eq!(err.status_code(), 400);

    assert_eq!(h.model.calls(), 0);
    assert_eq!(h.profiles.update_count(), 0);
    let stored = h.profiles.get("tutor-1").unwrap().transcript;
    assert_eq!(stored.status, Some(ReviewState::Pending));
    assert!(stored.verification_data.is_none());
}

// ── Flow ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_then_verify_uses_the_new_document() {
    let h = harness(VERIFIED_REPLY, &["Calculus"], false);

    let receipt = h
        .service
        .upload("tutor-1", Some("scan.jpg"), "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
        .await
        .unwrap();
    assert!(h.documents.contains(&receipt.file_path));

    let response = h.service.verify("tutor-1").await.unwrap();
    assert_eq!(response.status, VerificationStatus::Verified);

    let sent = h.model.prompts.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].image.mime_type, "image/jpeg");
    assert!(sent[0].text.contains("Calculus"));
}

#[tokio::test]
async fn png_uploaded_under_pdf_name_still_verifies_without_pdf_support() {
    let h = harness(VERIFIED_REPLY, &["Calculus"], false);

    let receipt = h
        .service
        .upload("tutor-1", Some("scan.pdf"), "image/png", PNG_MAGIC.to_vec())
        .await
        .unwrap();
    assert!(receipt.file_path.ends_with(".png"));

    let response = h.service.verify("tutor-1").await.unwrap();
    assert_eq!(response.status, VerificationStatus::Verified);
    assert_eq!(h.model.prompts.lock().unwrap()[0].image.mime_type, "image/png");
}

#[tokio::test]
async fn reverify_replaces_previous_outcome() {
    let h = harness(VERIFIED_REPLY, &["Calculus"], true);
    h.service.verify("tutor-1").await.unwrap();

    // Same profile, different model answer.
    let rejecting = ScriptedModel::new(r#"{"overall_status":"rejected","rejection_reason":"Blurry"}"#);
    let service = TranscriptService::from_config(
        h.documents.clone(),
        h.profiles.clone(),
        rejecting,
        &VerifierConfig::default(),
    );
    service.verify("tutor-1").await.unwrap();

    let stored = h.profiles.get("tutor-1").unwrap().transcript;
    assert_eq!(stored.status, Some(ReviewState::Rejected));
    assert!(stored.verified_at.is_none());
    assert_eq!(
        stored.verification_data.unwrap().rejection_reason.as_deref(),
        Some("Blurry")
    );
    assert_eq!(h.profiles.update_count(), 2);
}

#[tokio::test]
async fn verifier_is_shareable_across_tasks() {
    let documents = Arc::new(MemoryDocumentStore::new());
    for i in 0..4 {
        documents.insert(format!("t{i}/a.png"), PNG_MAGIC.to_vec(), "image/png");
    }
    let model = ScriptedModel::new(VERIFIED_REPLY);
    let verifier = Arc::new(TranscriptVerifier::from_config(
        documents.clone(),
        model.clone(),
        &VerifierConfig::default(),
    ));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let v = Arc::clone(&verifier);
            tokio::spawn(async move {
                v.run_verification(
                    &DocumentReference::new(format!("t{i}/a.png")),
                    &["Calculus".to_string()],
                )
                .await
            })
        })
        .collect();

    for h in handles {
        let outcome = h.await.unwrap().unwrap();
        assert_eq!(outcome.status, VerificationStatus::Verified);
    }
    assert_eq!(model.calls(), 4);
    assert_eq!(documents.fetch_count(), 4);
}
