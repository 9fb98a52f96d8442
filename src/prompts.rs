//! Prompt text for VLM-based transcript verification.
//!
//! The prompt is a pure function of the tutor's claimed subjects so the same
//! claims always produce byte-identical instructions. The grading thresholds
//! are spliced in from [`crate::output`] so the policy the model is told
//! about and the policy the crate reports on can never drift apart.

use crate::output::{MIN_AUTHENTICITY_SCORE, QUALIFYING_GRADE_POINTS};

/// Rendered in place of the subject list when the tutor claims nothing.
pub const NO_SUBJECTS_PLACEHOLDER: &str = "No subjects specified";

/// Render the claimed subjects as a comma-separated list.
pub fn format_subjects(claimed_subjects: &[String]) -> String {
    let subjects: Vec<&str> = claimed_subjects
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if subjects.is_empty() {
        NO_SUBJECTS_PLACEHOLDER.to_string()
    } else {
        subjects.join(", ")
    }
}

/// Build the verification instructions sent alongside the transcript image.
pub fn build_verification_prompt(claimed_subjects: &[String]) -> String {
    let subjects = format_subjects(claimed_subjects);
    let min_points = QUALIFYING_GRADE_POINTS;
    let min_score = MIN_AUTHENTICITY_SCORE;

    format!(
        r#"You are analyzing a university transcript image to verify a tutor's qualifications.

The tutor claims to teach these subjects: {subjects}

Please analyze this transcript and provide a JSON response with the following structure:
{{
    "verified_courses": [
        {{
            "course_name": "Course name from transcript",
            "grade": "Letter grade (A, A-, B+, etc.)",
            "grade_points": 4.0,
            "matches_subject": "Which tutor subject this matches, or null if no match"
        }}
    ],
    "authenticity_score": 0.95,
    "authenticity_notes": "Brief notes on why the transcript appears authentic or suspicious",
    "overall_status": "verified",
    "rejection_reason": null,
    "summary": "Brief summary of verification results"
}}

Verification criteria:
1. Extract ALL courses and grades visible on the transcript
2. For courses matching tutor's subjects, verify grades are B+ ({min_points:.1}) or higher
3. Assess authenticity: look for consistent formatting, official markings, realistic course progressions, and give an authenticity_score between 0 and 1
4. Set overall_status to "verified" if:
   - At least one course matches a tutor subject with grade B+ or higher
   - Authenticity score is {min_score:.1} or higher
5. Set overall_status to "rejected" otherwise, with a clear rejection_reason

IMPORTANT: Return ONLY valid JSON, no markdown or other formatting."#
    )
}
