//! Pipeline stages for transcript verification.
//!
//! Each submodule implements exactly one transformation step so each can be
//! tested on its own and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ encode ──▶ vision ──▶ parse ──▶ status
//! (ref)     (pdfium)      (base64)   (VLM)      (JSON)    (verified|rejected)
//! ```
//!
//! 1. [`input`]: media types, document references, upload policy
//! 2. [`normalize`]: PDF page 1 → PNG, raster images pass through; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]: base64 data URI for the multimodal request body
//! 4. [`vision`]: the single, timeout-bounded VLM call; the only stage
//!    with network I/O
//! 5. [`parse`]: fence stripping + strict JSON decode with a safe
//!    rejected fallback
//! 6. [`status`]: maps the model's status string onto the two allowed values

pub mod encode;
pub mod input;
pub mod normalize;
pub mod parse;
pub mod status;
pub mod vision;
