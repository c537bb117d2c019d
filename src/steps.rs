use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Element, Tab};
use serde_json::Value;
use tracing::debug;

use crate::error::TaskError;
use crate::types::{ActionStep, parse_step};

/// Pause between scripted steps and before the final capture so UI state
/// triggered by the previous step can stabilize.
pub const STEP_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Deadline for a selector to appear before an input step acts on it.
const INPUT_WAIT: Duration = Duration::from_secs(10);

/// Deadline for a bare waitForSelector step.
const SELECTOR_WAIT: Duration = Duration::from_secs(15);

/// Execute one scripted step against the page. Steps are never retried;
/// the first failure is the step's outcome.
pub fn run_step(tab: &Arc<Tab>, raw: &Value) -> Result<(), TaskError> {
    let step = parse_step(raw)?;
    debug!(?step, "executing step");

    match step {
        ActionStep::TypeInto { selector, text } => {
            let element = wait_for(tab, &selector, INPUT_WAIT)?;
            element
                .click()
                .map_err(|e| TaskError::Execution(format!("focusing '{selector}' failed: {e}")))?;
            tab.type_str(&text)
                .map_err(|e| TaskError::Execution(format!("typing into '{selector}' failed: {e}")))?;
        }
        ActionStep::Click { selector } => {
            let element = wait_for(tab, &selector, INPUT_WAIT)?;
            element
                .click()
                .map_err(|e| TaskError::Execution(format!("clicking '{selector}' failed: {e}")))?;
        }
        ActionStep::WaitForSelector { selector } => {
            wait_for(tab, &selector, SELECTOR_WAIT)?;
        }
        ActionStep::Wait { duration } => {
            // The caller-supplied pause is trusted as-is.
            std::thread::sleep(Duration::from_millis(duration));
        }
    }

    Ok(())
}

fn wait_for<'a>(
    tab: &'a Arc<Tab>,
    selector: &str,
    timeout: Duration,
) -> Result<Element<'a>, TaskError> {
    tab.wait_for_element_with_custom_timeout(selector, timeout)
        .map_err(|e| TaskError::SelectorTimeout(format!("'{selector}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Steps that touch a live tab are exercised in the scheduled-actions
    // strategy; here we pin down the executor's input contract.

    #[test]
    fn unknown_step_kind_is_rejected_before_any_browser_work() {
        let raw = json!({"type": "hover", "selector": "#menu"});
        let err = parse_step(&raw).unwrap_err();
        assert!(matches!(err, TaskError::UnknownStepType(kind) if kind == "hover"));
    }

    #[test]
    fn settle_delay_is_short() {
        assert!(STEP_SETTLE_DELAY < Duration::from_secs(1));
    }
}
