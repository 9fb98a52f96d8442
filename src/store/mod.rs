//! Collaborator contracts: where transcripts and tutor profiles live.
//!
//! The crate never owns storage. It talks to a [`DocumentStore`] for the
//! uploaded files and a [`ProfileStore`] for the tutor record that carries
//! the transcript path, the claimed subjects and the last verification
//! outcome. Implementations are injected at construction time.
//!
//! | Implementation | Use |
//! |----------------|-----|
//! | [`FsDocumentStore`] | local directory (CLI, development) |
//! | [`HttpDocumentStore`] | object-storage REST API |
//! | [`MemoryDocumentStore`], [`MemoryProfileStore`] | tests, embedding |

mod fs;
mod http;
mod memory;

pub use fs::FsDocumentStore;
pub use http::HttpDocumentStore;
pub use memory::{MemoryDocumentStore, MemoryProfileStore};

use crate::output::{VerificationOutcome, VerificationResult, VerificationStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure reported by a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Nothing stored under this key.
    #[error("not found: '{key}'")]
    NotFound { key: String },

    /// Transport, permission or backend failure.
    #[error("{0}")]
    Backend(String),
}

/// Blob storage holding uploaded transcripts.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the full document at `path`.
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Store `bytes` at `path`, replacing anything already there.
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError>;
}

/// Tutor profile records.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn tutor_profile(&self, subject_id: &str) -> Result<Option<TutorProfile>, StoreError>;

    /// Replace the stored verification state with `outcome`.
    async fn update(&self, subject_id: &str, outcome: &VerificationOutcome) -> Result<(), StoreError>;

    /// Point the profile at a freshly uploaded document and reset its state
    /// to pending.
    async fn mark_pending(&self, subject_id: &str, document_path: &str) -> Result<(), StoreError>;
}

/// Marketplace roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Tutor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Student => "student",
            Role::Tutor => "tutor",
        })
    }
}

/// Review state persisted on the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewState {
    Pending,
    Verified,
    Rejected,
}

impl ReviewState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewState::Pending => "pending",
            ReviewState::Verified => "verified",
            ReviewState::Rejected => "rejected",
        }
    }
}

impl From<VerificationStatus> for ReviewState {
    fn from(status: VerificationStatus) -> Self {
        match status {
            VerificationStatus::Verified => ReviewState::Verified,
            VerificationStatus::Rejected => ReviewState::Rejected,
        }
    }
}

/// Transcript-related fields of a tutor profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub file_path: Option<String>,
    pub status: Option<ReviewState>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_data: Option<VerificationResult>,
}

/// The slice of a user profile this crate reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorProfile {
    pub id: String,
    /// Multi-role accounts list every role here.
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Older single-role accounts only carry this field.
    #[serde(default)]
    pub legacy_role: Option<Role>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub transcript: TranscriptRecord,
}

impl TutorProfile {
    pub fn new(id: impl Into<String>, roles: Vec<Role>, subjects: Vec<String>) -> Self {
        Self {
            id: id.into(),
            roles,
            legacy_role: None,
            subjects,
            transcript: TranscriptRecord::default(),
        }
    }

    /// `roles` when non-empty, otherwise the legacy single role.
    pub fn effective_roles(&self) -> Vec<Role> {
        if !self.roles.is_empty() {
            self.roles.clone()
        } else {
            self.legacy_role.into_iter().collect()
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.effective_roles().contains(&role)
    }
}
