//! One strategy per task kind, all behind a single capability: consume a
//! live browser session, produce the task-specific payload.

mod accessibility;
mod actions;
mod broken_links;
mod js_errors;
mod performance;
mod snapshot;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinError;

use crate::audit::PerformanceAuditor;
use crate::error::TaskError;
use crate::session::BrowserSession;
use crate::storage::ArtifactStore;
use crate::types::{TaskKind, TaskRequest};

pub use accessibility::{AccessibilityTask, RuleViolation, ViolationCounts};
pub use actions::ScheduledActionsTask;
pub use broken_links::BrokenLinksTask;
pub use js_errors::{CapturedError, JsErrorsTask};
pub use performance::PerformanceTask;
pub use snapshot::{SnapshotTask, content_hash};

/// Everything a strategy may need beyond the session itself.
pub struct TaskContext {
    pub kind: TaskKind,
    /// Validated, non-empty http(s) target.
    pub target_url: String,
    pub request: TaskRequest,
}

/// The shared capability every task kind implements.
#[async_trait]
pub trait TaskStrategy: Send + Sync {
    async fn run(
        &self,
        session: &BrowserSession,
        ctx: &TaskContext,
    ) -> Result<Value, TaskError>;
}

/// Static mapping from the closed set of task kinds to their strategies.
/// All strategy dependencies are injected here, once, at startup.
pub struct StrategyRegistry {
    performance: PerformanceTask,
    accessibility: AccessibilityTask,
    js_errors: JsErrorsTask,
    broken_links: BrokenLinksTask,
    snapshot: SnapshotTask,
    scheduled_actions: ScheduledActionsTask,
}

impl StrategyRegistry {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        auditor: Arc<dyn PerformanceAuditor>,
        rule_script: Arc<str>,
        link_check_cap: usize,
    ) -> Self {
        Self {
            performance: PerformanceTask::new(auditor),
            accessibility: AccessibilityTask::new(rule_script),
            js_errors: JsErrorsTask,
            broken_links: BrokenLinksTask::new(link_check_cap),
            snapshot: SnapshotTask::new(store.clone()),
            scheduled_actions: ScheduledActionsTask::new(store),
        }
    }

    pub fn resolve(&self, kind: TaskKind) -> &dyn TaskStrategy {
        match kind {
            TaskKind::Performance => &self.performance,
            TaskKind::Accessibility => &self.accessibility,
            TaskKind::JsErrors => &self.js_errors,
            TaskKind::BrokenLinks => &self.broken_links,
            TaskKind::Snapshot => &self.snapshot,
            TaskKind::ScheduledActions => &self.scheduled_actions,
        }
    }
}

/// A panicked blocking closure is a strategy failure like any other, not a
/// process fault.
pub(crate) fn join_error(e: JoinError) -> TaskError {
    TaskError::Execution(format!("browser task panicked: {e}"))
}
