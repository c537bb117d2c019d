use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::dom;
use crate::error::TaskError;
use crate::session::BrowserSession;
use crate::tasks::{TaskContext, TaskStrategy, join_error};

/// How many of the leading violations are echoed back in full.
const TOP_VIOLATION_LIMIT: usize = 3;

/// JavaScript run after the rule engine is injected: executes the engine
/// and flattens its result to the fields this task reports on.
const COLLECT_JS: &str = r#"
(async () => {
    const result = await axe.run(document);
    return JSON.stringify({
        violations: result.violations.map(v => ({ impact: v.impact, help: v.help })),
        passes: result.passes.length,
    });
})()
"#;

/// One rule violation as the engine reports it: a severity bucket plus the
/// engine's help text.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleViolation {
    pub impact: Option<String>,
    pub help: String,
}

#[derive(Debug, Deserialize)]
struct RuleEngineReport {
    violations: Vec<RuleViolation>,
    passes: u64,
}

/// Violation totals bucketed by the engine's severity scale.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ViolationCounts {
    pub critical: u64,
    pub serious: u64,
    pub moderate: u64,
    pub minor: u64,
}

impl ViolationCounts {
    pub fn tally(violations: &[RuleViolation]) -> Self {
        let mut counts = ViolationCounts::default();
        for violation in violations {
            match violation.impact.as_deref() {
                Some("critical") => counts.critical += 1,
                Some("serious") => counts.serious += 1,
                Some("moderate") => counts.moderate += 1,
                Some("minor") => counts.minor += 1,
                // Impact-less rules exist; they carry no severity weight.
                _ => {}
            }
        }
        counts
    }
}

/// Navigates to the target, injects the configured accessibility rule
/// engine into the page context, and buckets its findings.
pub struct AccessibilityTask {
    rule_script: Arc<str>,
}

impl AccessibilityTask {
    pub fn new(rule_script: Arc<str>) -> Self {
        Self { rule_script }
    }
}

#[async_trait]
impl TaskStrategy for AccessibilityTask {
    async fn run(
        &self,
        session: &BrowserSession,
        ctx: &TaskContext,
    ) -> Result<Value, TaskError> {
        let tab = session.tab.clone();
        let url = ctx.target_url.clone();
        let timeout = ctx.kind.navigation_timeout();
        let rule_script = self.rule_script.clone();

        let report: RuleEngineReport = tokio::task::spawn_blocking(move || {
            dom::navigate(&tab, &url, timeout)?;

            tab.evaluate(&rule_script, false)
                .map_err(|e| TaskError::Execution(format!("rule engine injection failed: {e}")))?;

            let result = tab
                .evaluate(COLLECT_JS, true)
                .map_err(|e| TaskError::Execution(format!("rule engine run failed: {e}")))?;
            let raw = result
                .value
                .and_then(|v| v.as_str().map(String::from))
                .ok_or_else(|| TaskError::Execution("rule engine returned no data".into()))?;

            serde_json::from_str(&raw)
                .map_err(|e| TaskError::Execution(format!("rule engine returned bad data: {e}")))
        })
        .await
        .map_err(join_error)??;

        // Engine order is already most-severe-first; keep it and truncate.
        let top_violations: Vec<Value> = report
            .violations
            .iter()
            .take(TOP_VIOLATION_LIMIT)
            .map(|v| {
                json!({
                    "description": v.help,
                    "impact": v.impact.as_deref().unwrap_or("unknown"),
                })
            })
            .collect();

        Ok(json!({
            "violations": ViolationCounts::tally(&report.violations),
            "passes": report.passes,
            "topViolations": top_violations,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(impact: Option<&str>, help: &str) -> RuleViolation {
        RuleViolation {
            impact: impact.map(String::from),
            help: help.to_string(),
        }
    }

    #[test]
    fn tally_buckets_by_severity() {
        let violations = vec![
            violation(Some("critical"), "Images must have alternate text"),
            violation(Some("critical"), "Buttons must have discernible text"),
            violation(Some("serious"), "Elements must meet color contrast"),
            violation(Some("minor"), "Landmarks should be unique"),
            violation(Some("minor"), "Page should contain a level-one heading"),
            violation(Some("minor"), "All content should be inside landmarks"),
        ];

        assert_eq!(
            ViolationCounts::tally(&violations),
            ViolationCounts {
                critical: 2,
                serious: 1,
                moderate: 0,
                minor: 3,
            }
        );
    }

    #[test]
    fn impactless_violations_are_not_counted() {
        let violations = vec![violation(None, "Review this manually")];
        assert_eq!(ViolationCounts::tally(&violations), ViolationCounts::default());
    }

    #[test]
    fn engine_report_parses_from_collector_output() {
        let raw = r#"{
            "violations": [
                {"impact": "critical", "help": "Images must have alternate text"},
                {"impact": null, "help": "Review this manually"}
            ],
            "passes": 40
        }"#;
        let report: RuleEngineReport = serde_json::from_str(raw).unwrap();
        assert_eq!(report.passes, 40);
        assert_eq!(report.violations.len(), 2);
        assert_eq!(report.violations[0].impact.as_deref(), Some("critical"));
    }
}
