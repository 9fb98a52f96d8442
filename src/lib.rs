//! # transcript-verify
//!
//! Verify a tutor's academic transcript with a Vision Language Model (VLM).
//!
//! A tutor uploads a transcript (PDF, PNG or JPEG) and claims a set of
//! subjects. This crate turns the document into a single image, asks a
//! vision model to extract every course and grade, match them against the
//! claimed subjects and judge authenticity, then reduces the reply to a
//! structured, two-valued outcome: `verified` or `rejected`.
//!
//! Identity, persistence and file storage stay outside: they are reached
//! through the [`store::DocumentStore`] and [`store::ProfileStore`] traits,
//! and the model through [`pipeline::vision::VisionModel`].
//!
//! ## Pipeline Overview
//!
//! ```text
//! DocumentReference
//!  │
//!  ├─ 1. Fetch      read bytes from the DocumentStore
//!  ├─ 2. Normalize  PDF page 1 → PNG via pdfium (spawn_blocking); images pass through
//!  ├─ 3. Prompt     subject list → verification instructions
//!  ├─ 4. Vision     one timeout-bounded call to gpt-4o / claude / gemini / …
//!  ├─ 5. Parse      strip code fence, decode JSON, fall back to rejected
//!  └─ 6. Outcome    status + verified_at + structured result
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use transcript_verify::{verify_file, VerifierConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = VerifierConfig::default();
//!     let subjects = vec!["Calculus".to_string(), "Physics".to_string()];
//!     let outcome = verify_file("transcript.png", &subjects, &config).await?;
//!     println!("{}: {}", outcome.status, outcome.verification_data.summary);
//!     Ok(())
//! }
//! ```
//!
//! ## Embedding in a service
//!
//! [`TranscriptService`] exposes the three tutor-facing operations (upload,
//! verify, status) over injected stores and a [`pipeline::vision::VisionModel`].
//! Errors carry an HTTP status via [`VerifyError::status_code`] and a
//! caller-safe text via [`VerifyError::public_message`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `transcript-verify` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! PDF input additionally needs a pdfium shared library at runtime; see
//! [`PdfSupport::detect`]. Without it PDFs are refused and PNG/JPEG still work.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod service;
pub mod store;
pub mod verify;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PdfSupport, PdfiumLibrary, VerifierConfig, VerifierConfigBuilder};
pub use error::{ErrorKind, VerifyError};
pub use output::{
    TranscriptStatus, UploadReceipt, VerificationOutcome, VerificationResult, VerificationStatus,
    VerifiedCourse, VerifyResponse,
};
pub use pipeline::input::{DocumentReference, MediaType};
pub use pipeline::vision::{LlmVisionModel, VisionModel};
pub use progress::{NoopProgressCallback, ProgressCallback, Stage, VerificationProgressCallback};
pub use service::TranscriptService;
pub use verify::{verify_file, TranscriptVerifier};
