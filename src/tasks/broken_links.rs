use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::dom;
use crate::error::TaskError;
use crate::links;
use crate::session::BrowserSession;
use crate::tasks::{TaskContext, TaskStrategy, join_error};

/// Extracts the page's outbound links and probes a capped subset for
/// reachability from within the page context.
pub struct BrokenLinksTask {
    cap: usize,
}

impl BrokenLinksTask {
    pub fn new(cap: usize) -> Self {
        Self { cap }
    }
}

#[async_trait]
impl TaskStrategy for BrokenLinksTask {
    async fn run(
        &self,
        session: &BrowserSession,
        ctx: &TaskContext,
    ) -> Result<Value, TaskError> {
        let tab = session.tab.clone();
        let url = ctx.target_url.clone();
        let timeout = ctx.kind.navigation_timeout();
        let cap = self.cap;

        let (total, results) = tokio::task::spawn_blocking(move || {
            dom::navigate(&tab, &url, timeout)?;

            let hrefs = dom::extract_links(&tab)?;
            let (total, candidates) = links::dedup_and_cap(hrefs, cap);
            debug!(total, checking = candidates.len(), "link candidates gathered");

            let results = links::check_all(&tab, &candidates);
            Ok::<_, TaskError>((total, results))
        })
        .await
        .map_err(join_error)??;

        let broken: Vec<_> = results.iter().filter(|r| links::is_broken(r)).collect();

        Ok(json!({
            "totalLinksFound": total,
            "checkedLinks": results.len(),
            "brokenLinks": broken,
        }))
    }
}
