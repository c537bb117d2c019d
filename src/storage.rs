use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::error::TaskError;

/// Object storage at its interface boundary: write bytes under a path, get
/// back a public reference. Paths are append-only by construction
/// (timestamped), so writes never contend for the same key.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, TaskError>;
}

/// Stores artifacts in an HTTP-addressable bucket (S3/GCS-compatible PUT
/// semantics). Public references are served from `public_base` when the
/// bucket sits behind a CDN, otherwise straight from the endpoint.
pub struct HttpBucketStore {
    client: Client,
    endpoint: String,
    bucket: String,
    public_base: String,
}

/// Ceiling on one artifact upload; no upload may block session teardown
/// indefinitely.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

impl HttpBucketStore {
    pub fn new(endpoint: &str, bucket: &str, public_base: Option<&str>) -> Self {
        Self {
            client: Client::builder()
                .timeout(UPLOAD_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            public_base: public_base
                .unwrap_or(endpoint)
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn object_url(&self, base: &str, path: &str) -> String {
        format!("{base}/{}/{path}", self.bucket)
    }
}

#[async_trait]
impl ArtifactStore for HttpBucketStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, TaskError> {
        let target = self.object_url(&self.endpoint, path);
        let size = bytes.len();

        let response = self
            .client
            .put(&target)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| TaskError::StorageWrite(format!("PUT {target}: {e}")))?;

        if !response.status().is_success() {
            return Err(TaskError::StorageWrite(format!(
                "PUT {target}: status {}",
                response.status()
            )));
        }

        debug!(path, size, "artifact stored");
        Ok(self.object_url(&self.public_base, path))
    }
}

/// Build the storage key for one artifact:
/// `category/ownerId/monitorId/artifact-timestamp.ext`. Pure function of
/// its inputs so two captures at different instants never collide.
pub fn artifact_path(
    category: &str,
    user_id: &str,
    monitor_id: &str,
    artifact: &str,
    ext: &str,
    at: DateTime<Utc>,
) -> String {
    format!(
        "{category}/{user_id}/{monitor_id}/{artifact}-{}.{ext}",
        at.format("%Y%m%dT%H%M%S%3fZ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn artifact_path_is_keyed_by_owner_monitor_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let path = artifact_path("snapshots", "u-7", "m-3", "screenshot", "png", at);
        assert_eq!(path, "snapshots/u-7/m-3/screenshot-20260314T092653000Z.png");
    }

    #[test]
    fn distinct_instants_produce_distinct_paths() {
        let first = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let second = first + chrono::Duration::milliseconds(1);
        assert_ne!(
            artifact_path("snapshots", "u", "m", "page", "pdf", first),
            artifact_path("snapshots", "u", "m", "page", "pdf", second)
        );
    }

    #[test]
    fn object_urls_join_cleanly_regardless_of_trailing_slash() {
        let store = HttpBucketStore::new("https://storage.local/", "artifacts", None);
        assert_eq!(
            store.object_url(&store.endpoint, "a/b.png"),
            "https://storage.local/artifacts/a/b.png"
        );

        let fronted = HttpBucketStore::new(
            "https://storage.local",
            "artifacts",
            Some("https://cdn.example.com/"),
        );
        assert_eq!(
            fronted.object_url(&fronted.public_base, "a/b.png"),
            "https://cdn.example.com/artifacts/a/b.png"
        );
    }
}
