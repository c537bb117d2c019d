use std::collections::HashSet;
use std::sync::Arc;

use headless_chrome::Tab;
use tracing::debug;
use url::Url;

use crate::error::TaskError;
use crate::types::LinkCheckResult;

/// Synthetic status for a probe that never produced an HTTP response:
/// timeout, transport failure, or a fetch the page context may not make.
pub const NETWORK_ERROR_STATUS: u16 = 599;

/// Per-link probe deadline in milliseconds.
const PROBE_TIMEOUT_MS: u64 = 8_000;

/// Reduce raw hrefs to the candidate set: absolute http/https only,
/// deduplicated by exact string in first-seen order, then sliced to `cap`.
/// Returns the pre-cap unique count alongside the retained links.
pub fn dedup_and_cap(hrefs: Vec<String>, cap: usize) -> (usize, Vec<String>) {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for href in hrefs {
        if !is_absolute_web_url(&href) {
            continue;
        }
        if seen.insert(href.clone()) {
            unique.push(href);
        }
    }

    let total = unique.len();
    unique.truncate(cap);
    (total, unique)
}

fn is_absolute_web_url(href: &str) -> bool {
    match Url::parse(href) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Probe every retained link from within the page's execution context.
/// One failed probe maps to the sentinel status; it never aborts the batch.
pub fn check_all(tab: &Arc<Tab>, links: &[String]) -> Vec<LinkCheckResult> {
    links
        .iter()
        .map(|link| {
            let status = probe(tab, link);
            debug!(url = %link, status, "link probed");
            LinkCheckResult {
                url: link.clone(),
                status,
            }
        })
        .collect()
}

/// A link is reported broken on any client or server error status,
/// including the network-error sentinel.
pub fn is_broken(result: &LinkCheckResult) -> bool {
    result.status >= 400
}

fn probe(tab: &Arc<Tab>, link: &str) -> u16 {
    let encoded = match serde_json::to_string(link) {
        Ok(encoded) => encoded,
        Err(_) => return NETWORK_ERROR_STATUS,
    };

    let script = format!(
        r#"(async () => {{
            const controller = new AbortController();
            const timer = setTimeout(() => controller.abort(), {PROBE_TIMEOUT_MS});
            try {{
                const response = await fetch({encoded}, {{
                    method: 'HEAD',
                    redirect: 'follow',
                    signal: controller.signal,
                }});
                return response.status;
            }} catch (_) {{
                return {NETWORK_ERROR_STATUS};
            }} finally {{
                clearTimeout(timer);
            }}
        }})()"#
    );

    match tab.evaluate(&script, true) {
        Ok(result) => result
            .value
            .and_then(|v| v.as_u64())
            .map(|status| status as u16)
            .unwrap_or(NETWORK_ERROR_STATUS),
        Err(_) => NETWORK_ERROR_STATUS,
    }
}
