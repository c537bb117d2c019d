use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TaskError;

/// Inbound task request body. `url` stays optional here so the orchestrator
/// owns the rejection message instead of the JSON extractor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    pub url: Option<String>,
    #[serde(default)]
    pub action_config: Option<Value>,
    #[serde(default)]
    pub monitor_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// The closed set of task kinds this service knows how to run. Unknown
/// names are rejected before any session is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Performance,
    Accessibility,
    JsErrors,
    BrokenLinks,
    Snapshot,
    ScheduledActions,
}

impl TaskKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "performance" => Some(TaskKind::Performance),
            "accessibility" => Some(TaskKind::Accessibility),
            "jsErrors" => Some(TaskKind::JsErrors),
            "brokenLinks" => Some(TaskKind::BrokenLinks),
            "snapshot" => Some(TaskKind::Snapshot),
            "scheduledActions" => Some(TaskKind::ScheduledActions),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Performance => "performance",
            TaskKind::Accessibility => "accessibility",
            TaskKind::JsErrors => "jsErrors",
            TaskKind::BrokenLinks => "brokenLinks",
            TaskKind::Snapshot => "snapshot",
            TaskKind::ScheduledActions => "scheduledActions",
        }
    }

    /// Wall-clock budget for the initial page load. The snapshot task gets
    /// a longer window because it renders the full page twice.
    pub fn navigation_timeout(&self) -> Duration {
        match self {
            TaskKind::Snapshot => Duration::from_secs(60),
            _ => Duration::from_secs(30),
        }
    }
}

/// A single atomic scripted-interaction step.
///
/// Steps arrive as raw JSON and are deserialized one at a time during
/// execution, so a sequence with an unknown step kind still executes its
/// leading valid steps before failing at the offender.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionStep {
    #[serde(rename = "type")]
    TypeInto { selector: String, text: String },
    #[serde(rename = "click")]
    Click { selector: String },
    #[serde(rename = "waitForSelector")]
    WaitForSelector { selector: String },
    #[serde(rename = "wait")]
    Wait { duration: u64 },
}

const KNOWN_STEP_KINDS: [&str; 4] = ["type", "click", "waitForSelector", "wait"];

/// Deserialize one raw step, distinguishing an unknown kind (which must
/// surface the offending tag) from a malformed body of a known kind.
pub fn parse_step(raw: &Value) -> Result<ActionStep, TaskError> {
    let kind = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| TaskError::InvalidActionConfig("step is missing a 'type' field".into()))?;

    if !KNOWN_STEP_KINDS.contains(&kind) {
        return Err(TaskError::UnknownStepType(kind.to_string()));
    }

    serde_json::from_value(raw.clone())
        .map_err(|e| TaskError::InvalidActionConfig(format!("malformed '{kind}' step: {e}")))
}

/// Pull the step list out of `actionConfig`, rejecting anything that is
/// not a non-empty array. Runs before a session is acquired.
pub fn validate_steps(config: Option<&Value>) -> Result<Vec<Value>, TaskError> {
    let steps = config
        .and_then(|c| c.get("steps"))
        .ok_or_else(|| {
            TaskError::InvalidActionConfig("actionConfig.steps is required".into())
        })?;

    let steps = steps.as_array().ok_or_else(|| {
        TaskError::InvalidActionConfig("actionConfig.steps must be an array of steps".into())
    })?;

    if steps.is_empty() {
        return Err(TaskError::InvalidActionConfig(
            "actionConfig.steps must not be empty".into(),
        ));
    }

    Ok(steps.clone())
}

/// Outcome of probing one link from within the page context.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LinkCheckResult {
    pub url: String,
    pub status: u16,
}
