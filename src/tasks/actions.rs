use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::debug;

use crate::dom;
use crate::error::TaskError;
use crate::session::BrowserSession;
use crate::steps::{STEP_SETTLE_DELAY, run_step};
use crate::storage::{ArtifactStore, artifact_path};
use crate::tasks::{TaskContext, TaskStrategy, join_error};
use crate::types::validate_steps;

/// Navigates once, replays the request's action steps strictly in order,
/// and publishes a screenshot of the final state. Any step failure aborts
/// the remainder; there is no partial-success reporting.
pub struct ScheduledActionsTask {
    store: Arc<dyn ArtifactStore>,
}

impl ScheduledActionsTask {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TaskStrategy for ScheduledActionsTask {
    async fn run(
        &self,
        session: &BrowserSession,
        ctx: &TaskContext,
    ) -> Result<Value, TaskError> {
        // The orchestrator already rejected malformed configs before the
        // session existed; this re-read just hands us the list.
        let steps = validate_steps(ctx.request.action_config.as_ref())?;

        let tab = session.tab.clone();
        let url = ctx.target_url.clone();
        let timeout = ctx.kind.navigation_timeout();

        let (completed, screenshot) = tokio::task::spawn_blocking(move || {
            dom::navigate(&tab, &url, timeout)?;

            for (index, raw) in steps.iter().enumerate() {
                debug!(step = index + 1, total = steps.len(), "running action step");
                run_step(&tab, raw)?;
                std::thread::sleep(STEP_SETTLE_DELAY);
            }

            // One more settle before capturing the final state.
            std::thread::sleep(STEP_SETTLE_DELAY);
            let screenshot = dom::full_page_screenshot(&tab)?;
            Ok::<_, TaskError>((steps.len(), screenshot))
        })
        .await
        .map_err(join_error)??;

        let user = ctx.request.user_id.as_deref().unwrap_or("anonymous");
        let monitor = ctx.request.monitor_id.as_deref().unwrap_or("adhoc");
        let path = artifact_path("actions", user, monitor, "final-state", "png", Utc::now());
        let screenshot_url = self.store.put(&path, screenshot, "image/png").await?;

        Ok(json!({
            "stepsCompleted": completed,
            "screenshotUrl": screenshot_url,
        }))
    }
}
