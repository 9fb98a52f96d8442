//! In-process stores for tests and embedding.

use super::{DocumentStore, ProfileStore, ReviewState, StoreError, TranscriptRecord, TutorProfile};
use crate::output::VerificationOutcome;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("store lock poisoned".into())
}

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    objects: RwLock<HashMap<String, (Vec<u8>, String)>>,
    fetches: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document.
    pub fn insert(&self, path: impl Into<String>, bytes: Vec<u8>, content_type: impl Into<String>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(path.into(), (bytes, content_type.into()));
        }
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.objects
            .read()
            .ok()?
            .get(path)
            .map(|(_, content_type)| content_type.clone())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects
            .read()
            .map(|o| o.contains_key(path))
            .unwrap_or(false)
    }

    /// Number of `fetch` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.objects
            .read()
            .map_err(poisoned)?
            .get(path)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| StoreError::NotFound {
                key: path.to_string(),
            })
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        self.objects
            .write()
            .map_err(poisoned)?
            .insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, TutorProfile>>,
    updates: AtomicUsize,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: TutorProfile) {
        if let Ok(mut profiles) = self.profiles.write() {
            profiles.insert(profile.id.clone(), profile);
        }
    }

    /// Snapshot of a stored profile.
    pub fn get(&self, subject_id: &str) -> Option<TutorProfile> {
        self.profiles.read().ok()?.get(subject_id).cloned()
    }

    /// Number of successful `update` calls so far.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn with_profile<F>(&self, subject_id: &str, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut TutorProfile),
    {
        let mut profiles = self.profiles.write().map_err(poisoned)?;
        let profile = profiles
            .get_mut(subject_id)
            .ok_or_else(|| StoreError::NotFound {
                key: subject_id.to_string(),
            })?;
        f(profile);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn tutor_profile(&self, subject_id: &str) -> Result<Option<TutorProfile>, StoreError> {
        Ok(self.profiles.read().map_err(poisoned)?.get(subject_id).cloned())
    }

    async fn update(&self, subject_id: &str, outcome: &VerificationOutcome) -> Result<(), StoreError> {
        self.with_profile(subject_id, |p| {
            // Replaces the previous outcome wholesale; nothing is merged.
            p.transcript.status = Some(ReviewState::from(outcome.status));
            p.transcript.verified_at = outcome.verified_at;
            p.transcript.verification_data = Some(outcome.verification_data.clone());
        })?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn mark_pending(&self, subject_id: &str, document_path: &str) -> Result<(), StoreError> {
        self.with_profile(subject_id, |p| {
            p.transcript = TranscriptRecord {
                file_path: Some(document_path.to_string()),
                status: Some(ReviewState::Pending),
                verified_at: None,
                verification_data: None,
            };
        })
    }
}
