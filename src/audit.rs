use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::TaskError;

/// Report shape shared with the external audit capability: category scores
/// on a 0-1 scale plus per-audit display-formatted values.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditReport {
    #[serde(default)]
    categories: HashMap<String, AuditCategory>,
    #[serde(default)]
    audits: HashMap<String, AuditEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct AuditCategory {
    score: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct AuditEntry {
    #[serde(rename = "displayValue")]
    display_value: Option<String>,
}

impl AuditReport {
    pub fn parse(raw: &[u8]) -> Result<Self, TaskError> {
        serde_json::from_slice(raw)
            .map_err(|e| TaskError::AuditCapability(format!("unreadable report: {e}")))
    }

    /// Score for one category on the capability's native 0-1 scale.
    pub fn category_score(&self, category: &str) -> Option<f64> {
        self.categories.get(category).and_then(|c| c.score)
    }

    /// Display-formatted value of one named audit, e.g. "1.2 s".
    pub fn display_value(&self, audit: &str) -> String {
        self.audits
            .get(audit)
            .and_then(|a| a.display_value.clone())
            .unwrap_or_else(|| "n/a".to_string())
    }
}

/// The performance-audit capability at its call boundary: audit a URL
/// through an already-running browser's DevTools endpoint, restricted to
/// the given categories.
#[async_trait]
pub trait PerformanceAuditor: Send + Sync {
    async fn audit(
        &self,
        url: &str,
        debug_port: u16,
        categories: &[&str],
    ) -> Result<AuditReport, TaskError>;
}

/// Drives the Lighthouse CLI against the session's own browser process and
/// reads the JSON report off stdout.
pub struct LighthouseCli {
    binary: String,
}

impl LighthouseCli {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }
}

impl Default for LighthouseCli {
    fn default() -> Self {
        Self::new("lighthouse")
    }
}

#[async_trait]
impl PerformanceAuditor for LighthouseCli {
    async fn audit(
        &self,
        url: &str,
        debug_port: u16,
        categories: &[&str],
    ) -> Result<AuditReport, TaskError> {
        debug!(url, debug_port, "running lighthouse");

        let output = Command::new(&self.binary)
            .arg(url)
            .arg("--quiet")
            .arg("--output=json")
            .arg("--output-path=stdout")
            .arg(format!("--port={debug_port}"))
            .arg(format!("--only-categories={}", categories.join(",")))
            .output()
            .await
            .map_err(|e| TaskError::AuditCapability(format!("failed to run {}: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TaskError::AuditCapability(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        AuditReport::parse(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "categories": {
            "performance": { "score": 0.874 }
        },
        "audits": {
            "first-contentful-paint": { "displayValue": "1.2 s" },
            "largest-contentful-paint": { "displayValue": "2.8 s" },
            "total-blocking-time": { "displayValue": "150 ms" },
            "speed-index": {}
        }
    }"#;

    #[test]
    fn parses_scores_and_display_values() {
        let report = AuditReport::parse(REPORT.as_bytes()).unwrap();
        assert_eq!(report.category_score("performance"), Some(0.874));
        assert_eq!(report.display_value("first-contentful-paint"), "1.2 s");
        assert_eq!(report.display_value("total-blocking-time"), "150 ms");
    }

    #[test]
    fn missing_audits_fall_back_to_placeholder() {
        let report = AuditReport::parse(REPORT.as_bytes()).unwrap();
        assert_eq!(report.display_value("speed-index"), "n/a");
        assert_eq!(report.display_value("interactive"), "n/a");
    }

    #[test]
    fn absent_category_yields_no_score() {
        let report = AuditReport::parse(b"{}").unwrap();
        assert_eq!(report.category_score("performance"), None);
    }

    #[test]
    fn garbage_report_is_an_audit_failure() {
        let err = AuditReport::parse(b"not json").unwrap_err();
        assert!(matches!(err, TaskError::AuditCapability(_)));
    }
}
