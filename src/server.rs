use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde_json::{Value, json};
use tracing::info;

use crate::orchestrator::Orchestrator;
use crate::types::TaskRequest;

/// Shared state handed to every request handler.
pub struct AppState {
    pub orchestrator: Orchestrator,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/task/{task_name}", post(run_task))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn run_task(
    State(state): State<Arc<AppState>>,
    Path(task_name): Path<String>,
    Json(request): Json<TaskRequest>,
) -> (StatusCode, Json<Value>) {
    match state.orchestrator.execute(&task_name, request).await {
        Ok(payload) => (StatusCode::OK, Json(success_envelope(payload))),
        Err(e) => (
            e.status_code(),
            Json(json!({
                "status": "error",
                "message": e.to_string(),
            })),
        ),
    }
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Flatten the strategy payload into the success envelope so callers see
/// `{"status":"success", ...task fields}`.
fn success_envelope(payload: Value) -> Value {
    let mut body = match payload {
        Value::Object(fields) => fields,
        _ => serde_json::Map::new(),
    };
    body.insert("status".to_string(), json!("success"));
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_flattens_payload_fields() {
        let envelope = success_envelope(json!({"score": 92, "metrics": {"a": 1}}));
        assert_eq!(envelope["status"], "success");
        assert_eq!(envelope["score"], 92);
        assert_eq!(envelope["metrics"]["a"], 1);
    }

    #[test]
    fn status_discriminator_wins_over_payload_collisions() {
        let envelope = success_envelope(json!({"status": "weird"}));
        assert_eq!(envelope["status"], "success");
    }
}
