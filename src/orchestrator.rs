use std::time::Instant;

use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::error::TaskError;
use crate::session::SessionManager;
use crate::tasks::{StrategyRegistry, TaskContext};
use crate::types::{TaskKind, TaskRequest, validate_steps};

/// The entry point for one task invocation: validate, acquire a session,
/// run the matching strategy, and release the session on every path.
pub struct Orchestrator {
    sessions: SessionManager,
    strategies: StrategyRegistry,
}

impl Orchestrator {
    pub fn new(sessions: SessionManager, strategies: StrategyRegistry) -> Self {
        Self {
            sessions,
            strategies,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Run one task to completion. Every rejection that can be decided
    /// from the request alone happens before a session is acquired; once
    /// one exists it is released exactly once, whatever the strategy does.
    pub async fn execute(
        &self,
        task_name: &str,
        request: TaskRequest,
    ) -> Result<Value, TaskError> {
        let target_url = validate_target_url(request.url.as_deref())?;
        let kind = TaskKind::parse(task_name)
            .ok_or_else(|| TaskError::UnknownTask(task_name.to_string()))?;
        if kind == TaskKind::ScheduledActions {
            validate_steps(request.action_config.as_ref())?;
        }

        info!(task = kind.as_str(), url = %target_url, "task started");
        let started = Instant::now();

        let session = self.sessions.acquire().await?;
        let ctx = TaskContext {
            kind,
            target_url: target_url.clone(),
            request,
        };
        let outcome = self.strategies.resolve(kind).run(&session, &ctx).await;
        self.sessions.release(session).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(_) => info!(task = kind.as_str(), url = %target_url, elapsed_ms, "task finished"),
            Err(e) => {
                warn!(task = kind.as_str(), url = %target_url, elapsed_ms, error = %e, "task failed")
            }
        }

        outcome
    }
}

fn validate_target_url(url: Option<&str>) -> Result<String, TaskError> {
    let raw = url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| TaskError::InvalidRequest("URL is a required parameter.".into()))?;

    let parsed = Url::parse(raw)
        .map_err(|e| TaskError::InvalidRequest(format!("invalid url '{raw}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(raw.to_string()),
        scheme => Err(TaskError::InvalidRequest(format!(
            "unsupported url scheme '{scheme}': only http and https are allowed"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_or_blank_url_is_rejected_with_the_contract_message() {
        for input in [None, Some(""), Some("   ")] {
            let err = validate_target_url(input).unwrap_err();
            assert_eq!(err.to_string(), "URL is a required parameter.");
        }
    }

    #[test]
    fn only_web_schemes_are_accepted() {
        assert!(validate_target_url(Some("https://example.com")).is_ok());
        assert!(validate_target_url(Some("http://example.com/a?b=c")).is_ok());

        for input in ["ftp://example.com", "file:///etc/passwd", "not a url"] {
            let err = validate_target_url(Some(input)).unwrap_err();
            assert!(matches!(err, TaskError::InvalidRequest(_)), "{input}");
        }
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let url = validate_target_url(Some("  https://example.com  ")).unwrap();
        assert_eq!(url, "https://example.com");
    }
}
