//! Result types produced by the verification pipeline.
//!
//! [`VerificationResult`] is what the model told us (after parsing);
//! [`VerificationOutcome`] is what gets persisted on the tutor profile. The
//! remaining types are the response shapes of the service operations in
//! [`crate::service`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum grade points for a matched course to qualify (B+).
pub const QUALIFYING_GRADE_POINTS: f64 = 3.3;

/// Minimum authenticity score for a transcript to be accepted.
pub const MIN_AUTHENTICITY_SCORE: f64 = 0.7;

/// Final accept/reject decision.
///
/// Only these two values ever leave the crate. A model that answers anything
/// else is mapped to `Rejected` by [`crate::pipeline::status::resolve_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Verified,
    #[default]
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_verified(self) -> bool {
        self == Self::Verified
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One course/grade pair read off the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedCourse {
    pub course_name: String,
    pub grade: String,
    pub grade_points: f64,
    /// Claimed subject this course matches, if any.
    pub matches_subject: Option<String>,
}

impl VerifiedCourse {
    /// Matches a claimed subject with a grade of B+ or better.
    pub fn qualifies(&self) -> bool {
        self.matches_subject.is_some() && self.grade_points >= QUALIFYING_GRADE_POINTS
    }
}

/// Structured verification result, as parsed from the model's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified_courses: Vec<VerifiedCourse>,
    pub authenticity_score: f64,
    pub authenticity_notes: String,
    pub overall_status: VerificationStatus,
    pub rejection_reason: Option<String>,
    pub summary: String,
}

impl VerificationResult {
    /// Courses that satisfy the qualifying rule. Informational only: the
    /// model's (resolved) status is the decision of record.
    pub fn qualifying_courses(&self) -> impl Iterator<Item = &VerifiedCourse> {
        self.verified_courses.iter().filter(|c| c.qualifies())
    }
}

/// The value persisted on the tutor profile after a completed verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub status: VerificationStatus,
    /// Set only when `status` is verified.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_data: VerificationResult,
}

impl VerificationOutcome {
    /// Assemble an outcome; `verified_at` is stamped with `now` only for a
    /// verified result.
    pub fn new(result: VerificationResult, now: DateTime<Utc>) -> Self {
        let status = result.overall_status;
        Self {
            status,
            verified_at: status.is_verified().then_some(now),
            verification_data: result,
        }
    }
}

/// Response of the verify operation (`POST /tutors/transcript/verify`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub status: VerificationStatus,
    pub verification_data: VerificationResult,
}

impl From<VerificationOutcome> for VerifyResponse {
    fn from(outcome: VerificationOutcome) -> Self {
        Self {
            success: true,
            status: outcome.status,
            verification_data: outcome.verification_data,
        }
    }
}

/// Response of the status query (`GET /tutors/transcript/status`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptStatus {
    pub has_transcript: bool,
    /// `pending`, `verified`, `rejected`, or absent when nothing was uploaded.
    pub status: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_data: Option<VerificationResult>,
}

/// Response of the upload operation (`POST /tutors/transcript/upload`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub success: bool,
    pub message: String,
    pub file_path: String,
    pub status: String,
}
