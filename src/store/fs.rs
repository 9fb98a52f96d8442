//! Document store backed by a local directory.

use super::{DocumentStore, StoreError};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Stores documents as files below `root`. Keys are relative paths.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key onto a file below `root`, refusing absolute keys and `..`.
    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(key);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || escapes {
            return Err(StoreError::Backend(format!("invalid document path '{key}'")));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let file = self.resolve(path)?;
        match tokio::fs::read(&file).await {
            Ok(bytes) => {
                debug!("Read {} bytes from {}", bytes.len(), file.display());
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                key: path.to_string(),
            }),
            Err(e) => Err(StoreError::Backend(format!(
                "failed to read '{}': {}",
                file.display(),
                e
            ))),
        }
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), StoreError> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Backend(format!("create {}: {}", parent.display(), e)))?;
        }

        // Write to a sibling temp file, then rename, so readers never see a partial file.
        let tmp = temp_path(&file);
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StoreError::Backend(format!("write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &file)
            .await
            .map_err(|e| StoreError::Backend(format!("rename to {}: {}", file.display(), e)))?;

        debug!("Stored {} bytes at {}", bytes.len(), file.display());
        Ok(())
    }
}

/// `a.png` → `a.png.upload.tmp`, so siblings differing only by extension
/// never share a temp file.
fn temp_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".upload.tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        store
            .put("tutor-1/t.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        assert_eq!(store.fetch("tutor-1/t.png").await.unwrap(), vec![1, 2, 3]);
        assert!(!dir.path().join("tutor-1/t.png.upload.tmp").exists());
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let err = store.fetch("nope.pdf").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { key } if key == "nope.pdf"));
    }

    #[test]
    fn traversal_is_refused() {
        let store = FsDocumentStore::new("/srv/transcripts");
        for key in ["../etc/passwd", "/etc/passwd", "a/../../b", ""] {
            assert!(
                matches!(store.resolve(key), Err(StoreError::Backend(_))),
                "{key}"
            );
        }
        assert_eq!(
            store.resolve("u1/./t.pdf").unwrap(),
            PathBuf::from("/srv/transcripts/u1/./t.pdf")
        );
    }

    #[test]
    fn fetch_blocks_on_runtime() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"jpeg").unwrap();
        let store = FsDocumentStore::new(dir.path());
        let bytes = tokio_test::block_on(store.fetch("a.jpg")).unwrap();
        assert_eq!(bytes, b"jpeg");
    }

    #[test]
    fn temp_files_differ_per_extension() {
        assert_eq!(
            temp_path(Path::new("u/a.png")),
            PathBuf::from("u/a.png.upload.tmp")
        );
        assert_ne!(temp_path(Path::new("u/a.png")), temp_path(Path::new("u/a.jpg")));
    }

    #[tokio::test]
    async fn concurrent_puts_to_sibling_names_both_land() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let (png, jpg) = tokio::join!(
            store.put("u/a.png", vec![1; 4096], "image/png"),
            store.put("u/a.jpg", vec![2; 4096], "image/jpeg")
        );
        png.unwrap();
        jpg.unwrap();
        assert_eq!(store.fetch("u/a.png").await.unwrap(), vec![1; 4096]);
        assert_eq!(store.fetch("u/a.jpg").await.unwrap(), vec![2; 4096]);
    }
}
