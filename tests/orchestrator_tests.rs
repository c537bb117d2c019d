//! Pre-acquisition validation and resource-balance properties of the
//! orchestrator. Every rejection tested here must fire before a browser
//! session is acquired, which keeps these tests independent of Chrome.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use pagewarden::audit::{AuditReport, PerformanceAuditor};
use pagewarden::error::TaskError;
use pagewarden::orchestrator::Orchestrator;
use pagewarden::session::SessionManager;
use pagewarden::storage::ArtifactStore;
use pagewarden::tasks::StrategyRegistry;
use pagewarden::types::TaskRequest;

struct NullStore;

#[async_trait]
impl ArtifactStore for NullStore {
    async fn put(
        &self,
        path: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, TaskError> {
        Ok(format!("https://storage.test/{path}"))
    }
}

struct NullAuditor;

#[async_trait]
impl PerformanceAuditor for NullAuditor {
    async fn audit(
        &self,
        _url: &str,
        _debug_port: u16,
        _categories: &[&str],
    ) -> Result<AuditReport, TaskError> {
        AuditReport::parse(br#"{"categories": {}, "audits": {}}"#)
    }
}

fn orchestrator() -> Orchestrator {
    let strategies = StrategyRegistry::new(
        Arc::new(NullStore),
        Arc::new(NullAuditor),
        "window.axe = {};".into(),
        50,
    );
    Orchestrator::new(SessionManager::new(None), strategies)
}

fn request(url: Option<&str>, action_config: Option<Value>) -> TaskRequest {
    TaskRequest {
        url: url.map(String::from),
        action_config,
        monitor_id: None,
        user_id: None,
    }
}

fn assert_no_session_touched(orchestrator: &Orchestrator) {
    assert_eq!(orchestrator.sessions().acquired(), 0);
    assert_eq!(orchestrator.sessions().released(), 0);
}

#[tokio::test]
async fn missing_url_is_rejected_before_any_session_exists() {
    let orchestrator = orchestrator();

    for task in ["performance", "accessibility", "snapshot", "brokenLinks"] {
        let err = orchestrator
            .execute(task, request(None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::InvalidRequest(_)), "{task}");
        assert_eq!(err.to_string(), "URL is a required parameter.");
    }

    assert_no_session_touched(&orchestrator);
}

#[tokio::test]
async fn missing_url_wins_even_when_the_task_is_also_unknown() {
    let orchestrator = orchestrator();
    let err = orchestrator
        .execute("definitelyNotATask", request(None, None))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::InvalidRequest(_)));
    assert_no_session_touched(&orchestrator);
}

#[tokio::test]
async fn unknown_task_is_rejected_before_any_session_exists() {
    let orchestrator = orchestrator();
    let err = orchestrator
        .execute("colorContrast", request(Some("https://example.com"), None))
        .await
        .unwrap_err();

    assert!(matches!(err, TaskError::UnknownTask(_)));
    assert_eq!(err.to_string(), "Task 'colorContrast' not found.");
    assert_no_session_touched(&orchestrator);
}

#[tokio::test]
async fn non_web_url_schemes_are_rejected() {
    let orchestrator = orchestrator();
    let err = orchestrator
        .execute("snapshot", request(Some("ftp://example.com/file"), None))
        .await
        .unwrap_err();

    assert!(matches!(err, TaskError::InvalidRequest(_)));
    assert_no_session_touched(&orchestrator);
}

#[tokio::test]
async fn malformed_action_config_never_opens_a_session() {
    let orchestrator = orchestrator();
    let url = Some("https://example.com");

    for config in [
        None,
        Some(json!({})),
        Some(json!({"steps": 42})),
        Some(json!({"steps": {}})),
        Some(json!({"steps": []})),
    ] {
        let err = orchestrator
            .execute("scheduledActions", request(url, config.clone()))
            .await
            .unwrap_err();
        assert!(
            matches!(err, TaskError::InvalidActionConfig(_)),
            "config {config:?} produced {err:?}"
        );
        assert!(err.to_string().contains("steps"));
    }

    assert_no_session_touched(&orchestrator);
}

#[tokio::test]
async fn action_config_validation_runs_only_for_scheduled_actions() {
    // A garbage actionConfig on a non-actions task must not trip the
    // step validation; this request still fails on its missing url.
    let orchestrator = orchestrator();
    let err = orchestrator
        .execute("brokenLinks", request(None, Some(json!({"steps": 42}))))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::InvalidRequest(_)));
    assert_no_session_touched(&orchestrator);
}
