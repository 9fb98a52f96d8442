//! End-to-end tests against a live vision model.
//!
//! These read transcript files from `./test_cases/` and make real LLM API
//! calls. They are gated behind the `E2E_ENABLED` environment variable so
//! they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 OPENAI_API_KEY=sk-... cargo test --test e2e -- --nocapture
//!
//! PDF cases additionally need `PDFIUM_LIB_PATH` (or a system pdfium).

use std::path::{Path, PathBuf};
use transcript_verify::{
    verify_file, PdfSupport, VerificationStatus, VerifierConfig, VerifyError,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        init_tracing();
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn config(pdf_support: PdfSupport) -> VerifierConfig {
    VerifierConfig::builder()
        .api_timeout_secs(120)
        .pdf_support(pdf_support)
        .build()
        .expect("valid config")
}

fn subjects(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Library logs on stderr; honours RUST_LOG, defaults to info.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

fn pdfium_path() -> Option<PathBuf> {
    std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_image_transcript_produces_consistent_outcome() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("transcript.png"));

    let outcome = verify_file(&path, &subjects(&["Calculus", "Physics"]), &config(PdfSupport::Disabled))
        .await
        .expect("verification should complete");

    println!("{}", serde_json::to_string_pretty(&outcome).unwrap());
    assert_eq!(outcome.status, outcome.verification_data.overall_status);
    assert_eq!(
        outcome.verified_at.is_some(),
        outcome.status == VerificationStatus::Verified
    );
    assert!(!outcome.verification_data.summary.is_empty());
}

#[tokio::test]
async fn e2e_pdf_transcript_first_page() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("transcript.pdf"));

    let support = PdfSupport::detect(pdfium_path().as_deref());
    if !support.is_enabled() {
        println!("SKIP: pdfium not available");
        return;
    }

    let outcome = verify_file(&path, &subjects(&["Chemistry"]), &config(support))
        .await
        .expect("verification should complete");
    println!("status: {}", outcome.status);
    assert_eq!(
        outcome.verified_at.is_some(),
        outcome.status == VerificationStatus::Verified
    );
}

#[tokio::test]
async fn e2e_pdf_refused_without_support() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("transcript.pdf"));

    let err = verify_file(&path, &subjects(&["Chemistry"]), &config(PdfSupport::Disabled))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::UnsupportedFormat { .. }), "{err}");
    assert_eq!(err.status_code(), 422);
}

#[tokio::test]
async fn e2e_missing_file() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    let missing = Path::new(env!("CARGO_MANIFEST_DIR")).join("test_cases/does-not-exist.png");

    let err = verify_file(&missing, &[], &config(PdfSupport::Disabled))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::DocumentNotFound { .. }), "{err}");
}
