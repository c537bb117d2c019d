use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::audit::PerformanceAuditor;
use crate::error::TaskError;
use crate::session::BrowserSession;
use crate::tasks::{TaskContext, TaskStrategy};

/// Runs the external performance-audit capability against the session's own
/// browser endpoint, restricted to the performance category.
pub struct PerformanceTask {
    auditor: Arc<dyn PerformanceAuditor>,
}

impl PerformanceTask {
    pub fn new(auditor: Arc<dyn PerformanceAuditor>) -> Self {
        Self { auditor }
    }
}

#[async_trait]
impl TaskStrategy for PerformanceTask {
    async fn run(
        &self,
        session: &BrowserSession,
        ctx: &TaskContext,
    ) -> Result<Value, TaskError> {
        let report = self
            .auditor
            .audit(&ctx.target_url, session.debug_port, &["performance"])
            .await?;

        let score = report.category_score("performance").ok_or_else(|| {
            TaskError::AuditCapability("report carries no performance score".into())
        })?;

        Ok(json!({
            "score": (score * 100.0).round() as i64,
            "metrics": {
                "firstContentfulPaint": report.display_value("first-contentful-paint"),
                "largestContentfulPaint": report.display_value("largest-contentful-paint"),
                "totalBlockingTime": report.display_value("total-blocking-time"),
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::audit::AuditReport;

    #[test]
    fn score_rounds_to_nearest_integer_on_the_percent_scale() {
        let report = AuditReport::parse(
            br#"{"categories": {"performance": {"score": 0.874}}, "audits": {}}"#,
        )
        .unwrap();
        let score = report.category_score("performance").unwrap();
        assert_eq!((score * 100.0).round() as i64, 87);

        let report = AuditReport::parse(
            br#"{"categories": {"performance": {"score": 0.995}}, "audits": {}}"#,
        )
        .unwrap();
        let score = report.category_score("performance").unwrap();
        assert_eq!((score * 100.0).round() as i64, 100);
    }
}
