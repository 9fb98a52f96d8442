//! Response parsing: raw model text → [`VerificationResult`].
//!
//! Models are told to answer with bare JSON and regularly wrap it in a
//! ```` ```json ```` fence anyway. Extraction is a fixed two-step strategy:
//! decode the whole reply, and if that fails decode the body of its first
//! fenced block. A reply that still does not decode to a JSON object becomes
//! the fixed rejected [`fallback_result`]; this function never fails.
//!
//! Once an object is decoded its fields are read leniently. A field of the
//! wrong type takes its default instead of discarding the reply.

use crate::output::{VerificationResult, VerificationStatus, VerifiedCourse};
use crate::pipeline::status::resolve_status;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// `authenticity_notes` of the fallback result.
pub const FALLBACK_AUTHENTICITY_NOTES: &str = "Failed to parse transcript";

/// `rejection_reason` of the fallback result.
pub const FALLBACK_REJECTION_REASON: &str =
    "Could not analyze the transcript image. Please upload a clearer image.";

/// `summary` of the fallback result.
pub const FALLBACK_SUMMARY: &str = "Verification failed due to image quality or format";

/// Opening fence with an optional language tag (`json`, `JSON`, `javascript`, …).
static RE_FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[A-Za-z0-9_+.-]*[ \t]*\r?\n?").unwrap());

/// Body of the first fenced block, or the whole text when there is none.
///
/// An opening fence without a closing one yields everything after it.
pub fn extract_json_payload(raw: &str) -> &str {
    let Some(open) = RE_FENCE_OPEN.find(raw) else {
        return raw.trim();
    };
    let body = &raw[open.end()..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Decode the reply as JSON, unwrapping a fence only when the bare text
/// does not decode.
fn decode_reply(raw: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(raw.trim()).or_else(|_| serde_json::from_str(extract_json_payload(raw)))
}

/// Parse the model's reply. Never fails: undecodable input yields
/// [`fallback_result`].
pub fn parse_response(raw: &str) -> VerificationResult {
    match decode_reply(raw) {
        Ok(Value::Object(fields)) => {
            let result = read_result(&fields);
            debug!(
                "Parsed model reply: {} courses, score {}",
                result.verified_courses.len(),
                result.authenticity_score
            );
            result
        }
        Ok(other) => {
            warn!(
                "Model reply is JSON but not an object ({}); falling back to rejected",
                json_type(&other)
            );
            fallback_result()
        }
        Err(e) => {
            warn!(
                "Model reply is not valid JSON ({}); falling back to rejected. Reply starts: {:?}",
                e,
                preview(raw, 200)
            );
            fallback_result()
        }
    }
}

/// The deterministic result used when the model's reply cannot be read.
pub fn fallback_result() -> VerificationResult {
    VerificationResult {
        verified_courses: Vec::new(),
        authenticity_score: 0.0,
        authenticity_notes: FALLBACK_AUTHENTICITY_NOTES.to_string(),
        overall_status: VerificationStatus::Rejected,
        rejection_reason: Some(FALLBACK_REJECTION_REASON.to_string()),
        summary: FALLBACK_SUMMARY.to_string(),
    }
}

fn preview(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn read_result(fields: &Map<String, Value>) -> VerificationResult {
    let raw_status = fields.get("overall_status").and_then(Value::as_str);
    let overall_status = resolve_status(raw_status);
    if raw_status.is_some_and(|s| s != overall_status.as_str()) {
        warn!(
            "Model returned overall_status {:?}; treating as {}",
            raw_status, overall_status
        );
    }

    let verified_courses = match fields.get("verified_courses") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .map(read_course)
            .collect(),
        _ => Vec::new(),
    };

    VerificationResult {
        verified_courses,
        authenticity_score: number(fields.get("authenticity_score")),
        authenticity_notes: text(fields.get("authenticity_notes")),
        overall_status,
        rejection_reason: optional_text(fields.get("rejection_reason")),
        summary: text(fields.get("summary")),
    }
}

fn read_course(fields: &Map<String, Value>) -> VerifiedCourse {
    VerifiedCourse {
        course_name: text(fields.get("course_name")),
        grade: text(fields.get("grade")),
        grade_points: number(fields.get("grade_points")),
        matches_subject: optional_text(fields.get("matches_subject")),
    }
}

/// Numbers and numeric strings; anything else is 0.
fn number(v: Option<&Value>) -> f64 {
    match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    }
}

/// Strings as-is, scalars in their JSON spelling, anything else empty.
fn text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
        _ => String::new(),
    }
}

fn optional_text(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str).map(str::to_string)
}
