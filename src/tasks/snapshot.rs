use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::dom;
use crate::error::TaskError;
use crate::session::BrowserSession;
use crate::storage::{ArtifactStore, artifact_path};
use crate::tasks::{TaskContext, TaskStrategy, join_error};

/// Hex digest of the page's extracted text. Pure function of the text, so
/// an unchanged page hashes identically across captures.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Captures the page as text hash, full-page raster and paginated
/// document, and publishes both artifacts to object storage.
pub struct SnapshotTask {
    store: Arc<dyn ArtifactStore>,
}

impl SnapshotTask {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TaskStrategy for SnapshotTask {
    async fn run(
        &self,
        session: &BrowserSession,
        ctx: &TaskContext,
    ) -> Result<Value, TaskError> {
        let tab = session.tab.clone();
        let url = ctx.target_url.clone();
        let timeout = ctx.kind.navigation_timeout();

        let (text, screenshot, pdf) = tokio::task::spawn_blocking(move || {
            dom::navigate(&tab, &url, timeout)?;
            let text = dom::extract_visible_text(&tab)?;
            let screenshot = dom::full_page_screenshot(&tab)?;
            let pdf = dom::render_pdf(&tab)?;
            Ok::<_, TaskError>((text, screenshot, pdf))
        })
        .await
        .map_err(join_error)??;

        let hash = content_hash(&text);

        let user = ctx.request.user_id.as_deref().unwrap_or("anonymous");
        let monitor = ctx.request.monitor_id.as_deref().unwrap_or("adhoc");
        let captured_at = Utc::now();
        let screenshot_path =
            artifact_path("snapshots", user, monitor, "screenshot", "png", captured_at);
        let pdf_path = artifact_path("snapshots", user, monitor, "page", "pdf", captured_at);

        // Both artifacts are required; issue the uploads concurrently and
        // fail the task on the first error.
        let (screenshot_url, pdf_url) = tokio::try_join!(
            self.store.put(&screenshot_path, screenshot, "image/png"),
            self.store.put(&pdf_path, pdf, "application/pdf"),
        )?;

        Ok(json!({
            "screenshotUrl": screenshot_url,
            "pdfUrl": pdf_url,
            "contentHash": hash,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_a_pure_function_of_the_text() {
        let first = content_hash("Welcome to the dashboard");
        let again = content_hash("Welcome to the dashboard");
        let changed = content_hash("Welcome to the dashboard!");

        assert_eq!(first, again);
        assert_ne!(first, changed);
    }

    #[test]
    fn hash_is_a_lowercase_hex_digest() {
        let hash = content_hash("");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
