//! Error types for the transcript-verify library.
//!
//! Every failure that stops the verification pipeline is a [`VerifyError`].
//! A model reply that cannot be read is deliberately *not* one of them: the
//! parser turns it into a rejected [`crate::output::VerificationResult`] so
//! "we could not even ask" stays distinguishable from "we asked and could not
//! read the answer".
//!
//! [`ErrorKind`] groups variants the way a wrapping HTTP service reports
//! them, and [`VerifyError::public_message`] is the text that is safe to show
//! to the caller. Diagnostic detail stays in the `Display` form for logs.

use thiserror::Error;

/// Coarse error category, mapped onto an HTTP status by the wrapping service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No document on file; the caller must upload first.
    DocumentNotFound,
    /// The stored document cannot be turned into an image.
    UnsupportedDocument,
    /// The request or document failed validation.
    Validation,
    /// Caller lacks the required role.
    Forbidden,
    /// Profile does not exist.
    NotFound,
    /// The vision model could not be reached or refused the request.
    ServiceUnavailable,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::DocumentNotFound | Self::Validation => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::UnsupportedDocument => 422,
            Self::ServiceUnavailable => 503,
            Self::Internal => 500,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DocumentNotFound => "DOCUMENT_NOT_FOUND",
            Self::UnsupportedDocument => "UNSUPPORTED_DOCUMENT",
            Self::Validation => "VALIDATION_FAILED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

/// All fatal errors returned by the transcript-verify library.
#[derive(Debug, Error)]
pub enum VerifyError {
    // ── Document errors ───────────────────────────────────────────────────
    /// The document store has nothing at this path.
    #[error("Transcript not found in storage: '{path}'")]
    DocumentNotFound { path: String },

    /// The tutor profile carries no document reference at all.
    #[error("No transcript uploaded for '{subject_id}'. Please upload a transcript first.")]
    NoDocumentOnFile { subject_id: String },

    /// The document is a format this build cannot normalise.
    #[error("Unsupported transcript format '{media_type}': {hint}")]
    UnsupportedFormat { media_type: String, hint: String },

    /// Decoding, rendering or re-encoding the document failed.
    #[error("Could not convert transcript '{path}' to an image: {source}")]
    DocumentConversion {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The paginated document has no pages.
    #[error("Transcript '{path}' appears to be empty (0 pages)")]
    EmptyDocument { path: String },

    /// Upload rejected before it reached storage.
    #[error("Invalid upload: {reason}")]
    InvalidUpload { reason: String },

    // ── Vision service errors ─────────────────────────────────────────────
    /// The model call failed (network, auth, quota, content filter).
    #[error("Verification service error from '{provider}': {message}")]
    VerificationService { provider: String, message: String },

    /// The model call exceeded the configured timeout.
    #[error("Verification service timed out after {secs}s")]
    ServiceTimeout { secs: u64 },

    /// No vision provider could be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Authorization / profile errors ────────────────────────────────────
    /// Caller does not hold the role the operation requires.
    #[error("'{subject_id}' does not hold the {role} role")]
    Forbidden { subject_id: String, role: String },

    /// Profile store has no profile for this id.
    #[error("Tutor profile not found: '{subject_id}'")]
    ProfileNotFound { subject_id: String },

    // ── Infrastructure ────────────────────────────────────────────────────
    /// A store call failed for a reason other than "not found".
    #[error("Storage error: {0}")]
    Storage(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VerifyError {
    /// Category used for status mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DocumentNotFound { .. } | Self::NoDocumentOnFile { .. } => {
                ErrorKind::DocumentNotFound
            }
            Self::UnsupportedFormat { .. } | Self::DocumentConversion { .. } => {
                ErrorKind::UnsupportedDocument
            }
            Self::EmptyDocument { .. } | Self::InvalidUpload { .. } => ErrorKind::Validation,
            Self::VerificationService { .. }
            | Self::ServiceTimeout { .. }
            | Self::ProviderNotConfigured { .. } => ErrorKind::ServiceUnavailable,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::ProfileNotFound { .. } => ErrorKind::NotFound,
            Self::Storage(_) | Self::InvalidConfig(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Human-readable reason that is safe to return to the caller.
    ///
    /// Service and internal failures collapse to a generic message; the full
    /// `Display` text is for logs only.
    pub fn public_message(&self) -> String {
        match self {
            Self::DocumentNotFound { .. } | Self::NoDocumentOnFile { .. } => {
                "No transcript uploaded. Please upload a transcript first.".to_string()
            }
            Self::UnsupportedFormat { .. } | Self::DocumentConversion { .. } => {
                "The transcript could not be read. Please upload it as a PNG or JPG image instead."
                    .to_string()
            }
            Self::EmptyDocument { .. } => "The uploaded PDF appears to be empty.".to_string(),
            Self::InvalidUpload { reason } => reason.clone(),
            Self::VerificationService { .. }
            | Self::ServiceTimeout { .. }
            | Self::ProviderNotConfigured { .. } => {
                "The verification service is temporarily unavailable. Please try again later."
                    .to_string()
            }
            Self::Forbidden { role, .. } => format!("Only {role}s can manage transcripts"),
            Self::ProfileNotFound { .. } => "Tutor profile not found".to_string(),
            Self::Storage(_) | Self::InvalidConfig(_) | Self::Internal(_) => {
                "An internal error occurred. Please try again later.".to_string()
            }
        }
    }
}
