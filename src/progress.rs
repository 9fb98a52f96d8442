//! Progress-callback trait for per-stage verification events.
//!
//! Inject an [`Arc<dyn VerificationProgressCallback>`] via
//! [`crate::config::VerifierConfigBuilder::progress_callback`] to learn which
//! stage a verification is in. The CLI uses it to drive its spinner; a web
//! service might forward events to a WebSocket so the tutor sees
//! "Reading transcript…" while the model works.
//!
//! # Example
//!
//! ```rust
//! use transcript_verify::{Stage, VerificationProgressCallback, VerifierConfig};
//! use std::sync::Arc;
//!
//! struct Log;
//!
//! impl VerificationProgressCallback for Log {
//!     fn on_stage_start(&self, stage: Stage) {
//!         eprintln!("→ {}", stage.label());
//!     }
//! }
//!
//! let config = VerifierConfig::builder()
//!     .progress_callback(Arc::new(Log) as Arc<dyn VerificationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::VerificationStatus;
use std::fmt;
use std::sync::Arc;

/// One step of the verification pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetch,
    Normalize,
    Prompt,
    Vision,
    Parse,
}

impl Stage {
    /// Short human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Fetch => "Fetching transcript",
            Stage::Normalize => "Preparing image",
            Stage::Prompt => "Building prompt",
            Stage::Vision => "Reading transcript",
            Stage::Parse => "Checking results",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the orchestrator as a verification moves through its stages.
///
/// Implementations must be `Send + Sync`: one verifier may serve many
/// concurrent requests. Every method has a no-op default.
pub trait VerificationProgressCallback: Send + Sync {
    /// A stage is about to run.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// A stage finished successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// A stage failed; the pipeline stops here.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// The full pipeline completed and produced an outcome.
    fn on_verification_complete(&self, status: VerificationStatus) {
        let _ = status;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl VerificationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::VerifierConfig`].
pub type ProgressCallback = Arc<dyn VerificationProgressCallback>;
