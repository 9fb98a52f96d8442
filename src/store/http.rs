//! Document store backed by an object-storage REST API.
//!
//! Speaks the common `/storage/v1/object/{bucket}/{path}` layout: `GET` to
//! download, `POST` with `x-upsert: true` to upload. The service key is sent
//! both as a bearer token and as `apikey`.

use super::{DocumentStore, StoreError};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl HttpDocumentStore {
    pub fn new(
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        service_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StoreError::Backend(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            bucket: bucket.into(),
            service_key: service_key.into(),
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.bucket.trim_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }
}

/// Some storage gateways answer a missing object with `400` and a
/// `not_found` body instead of a plain `404`.
fn is_missing(status: StatusCode, body: &str) -> bool {
    status == StatusCode::NOT_FOUND
        || (status == StatusCode::BAD_REQUEST
            && (body.contains("not_found") || body.contains("Object not found")))
}

fn transport_error(url: &str, e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Backend(format!("request to {url} timed out"))
    } else {
        StoreError::Backend(format!("request to {url} failed: {e}"))
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let url = self.object_url(path);
        debug!("Downloading document: {}", url);

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_missing(status, &body) {
                return Err(StoreError::NotFound {
                    key: path.to_string(),
                });
            }
            return Err(StoreError::Backend(format!("GET {url}: HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(&url, e))?;
        debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        let url = self.object_url(path);
        let size = bytes.len();

        let response = self
            .authorized(self.client.post(&url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Backend(format!(
                "POST {url}: HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        info!("Uploaded {} bytes to {}", size, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> HttpDocumentStore {
        HttpDocumentStore::new(base, "transcripts", "key", 5).unwrap()
    }

    #[test]
    fn object_url_joins_segments() {
        assert_eq!(
            store("https://db.example.com/").object_url("u1/a.pdf"),
            "https://db.example.com/storage/v1/object/transcripts/u1/a.pdf"
        );
        assert_eq!(
            store("https://db.example.com").object_url("/u1/a.pdf"),
            "https://db.example.com/storage/v1/object/transcripts/u1/a.pdf"
        );
    }

    #[test]
    fn missing_object_detection() {
        assert!(is_missing(StatusCode::NOT_FOUND, ""));
        assert!(is_missing(
            StatusCode::BAD_REQUEST,
            r#"{"statusCode":"404","error":"not_found","message":"Object not found"}"#
        ));
        assert!(!is_missing(StatusCode::BAD_REQUEST, "bad key"));
        assert!(!is_missing(StatusCode::FORBIDDEN, "not_found"));
    }

    #[tokio::test]
    async fn unreachable_host_is_backend_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let s = HttpDocumentStore::new("http://127.0.0.1:9", "b", "k", 2).unwrap();
        let err = s.fetch("x.png").await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
