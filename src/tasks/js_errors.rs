use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use headless_chrome::protocol::cdp::types::Event;
use serde::Serialize;
use serde_json::{Value, json};

use crate::dom;
use crate::error::TaskError;
use crate::session::BrowserSession;
use crate::tasks::{TaskContext, TaskStrategy, join_error};

/// Hard ceiling on buffered entries; a pathological page cannot grow the
/// collector without bound.
const CAPTURE_CAP: usize = 64;

/// How many captured entries the result echoes back.
const REPORT_LIMIT: usize = 10;

/// One captured page-side error, in arrival order, no dedup.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CapturedError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// Append to the bounded collector, dropping overflow silently.
pub(crate) fn push_capped(buffer: &mut Vec<CapturedError>, entry: CapturedError, cap: usize) {
    if buffer.len() < cap {
        buffer.push(entry);
    }
}

fn entry_for(event: &Event) -> Option<CapturedError> {
    match event {
        Event::RuntimeExceptionThrown(e) => {
            let details = &e.params.exception_details;
            let message = details
                .exception
                .as_ref()
                .and_then(|remote| remote.description.clone())
                .unwrap_or_else(|| details.text.clone());
            Some(CapturedError {
                kind: "exception".to_string(),
                message,
            })
        }
        Event::RuntimeConsoleAPICalled(e) => {
            if !format!("{:?}", e.params.Type).eq_ignore_ascii_case("error") {
                return None;
            }
            let message = e
                .params
                .args
                .iter()
                .map(|arg| match &arg.value {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => arg.description.clone().unwrap_or_default(),
                })
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            Some(CapturedError {
                kind: "console".to_string(),
                message,
            })
        }
        _ => None,
    }
}

/// Navigates with a buffered collector subscribed to uncaught exceptions
/// and console error messages for exactly that one load.
pub struct JsErrorsTask;

#[async_trait]
impl TaskStrategy for JsErrorsTask {
    async fn run(
        &self,
        session: &BrowserSession,
        ctx: &TaskContext,
    ) -> Result<Value, TaskError> {
        let tab = session.tab.clone();
        let url = ctx.target_url.clone();
        let timeout = ctx.kind.navigation_timeout();

        let captured = tokio::task::spawn_blocking(move || {
            let buffer: Arc<Mutex<Vec<CapturedError>>> = Arc::new(Mutex::new(Vec::new()));

            tab.enable_runtime()
                .map_err(|e| TaskError::Execution(format!("error capture setup failed: {e}")))?;

            let sink = buffer.clone();
            tab.add_event_listener(Arc::new(move |event: &Event| {
                if let Some(entry) = entry_for(event) {
                    if let Ok(mut guard) = sink.lock() {
                        push_capped(&mut guard, entry, CAPTURE_CAP);
                    }
                }
            }))
            .map_err(|e| TaskError::Execution(format!("error capture setup failed: {e}")))?;

            dom::navigate(&tab, &url, timeout)?;

            // Subscription scope ends with this navigation.
            let _ = tab.disable_runtime();

            let captured = buffer
                .lock()
                .map(|guard| guard.clone())
                .unwrap_or_default();
            Ok::<_, TaskError>(captured)
        })
        .await
        .map_err(join_error)??;

        let reported: Vec<&CapturedError> = captured.iter().take(REPORT_LIMIT).collect();

        Ok(json!({
            "errorCount": captured.len(),
            "errors": reported,
        }))
    }
}
