use std::sync::Arc;
use std::time::Duration;

use headless_chrome::Tab;
use headless_chrome::protocol::cdp::Page;

use crate::error::TaskError;

/// Pause after the load event so late-settling resources and scripts get a
/// moment before we inspect the page.
const NAVIGATION_SETTLE: Duration = Duration::from_millis(1500);

/// JavaScript injected to collect every anchor href as the browser resolved
/// it (absolute form), serialized as a JSON array.
const LINKS_JS: &str = r#"
JSON.stringify(Array.from(document.querySelectorAll('a[href]')).map(a => a.href))
"#;

/// JavaScript injected to measure the full scrollable extent of the page,
/// not just the viewport.
const PAGE_SIZE_JS: &str = r#"
JSON.stringify({
  width: Math.max(
    document.body ? document.body.scrollWidth : 0,
    document.documentElement.scrollWidth
  ),
  height: Math.max(
    document.body ? document.body.scrollHeight : 0,
    document.documentElement.scrollHeight
  )
})
"#;

/// Navigate the page and block until the load settles, within `timeout`.
/// All other waits on this tab inherit the same deadline.
pub fn navigate(tab: &Arc<Tab>, url: &str, timeout: Duration) -> Result<(), TaskError> {
    tab.set_default_timeout(timeout);
    tab.navigate_to(url)
        .map_err(|e| TaskError::Execution(format!("navigation to {url} failed: {e}")))?;
    tab.wait_until_navigated()
        .map_err(|e| TaskError::NavigationTimeout(format!("{url}: {e}")))?;
    std::thread::sleep(NAVIGATION_SETTLE);
    Ok(())
}

/// Visible text of the page as the user would read it.
pub fn extract_visible_text(tab: &Arc<Tab>) -> Result<String, TaskError> {
    let result = tab
        .evaluate("document.body ? document.body.innerText : ''", false)
        .map_err(|e| TaskError::Execution(format!("text extraction failed: {e}")))?;
    Ok(result
        .value
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default())
}

/// Every anchor href on the page, in document order, already resolved to
/// absolute form by the browser.
pub fn extract_links(tab: &Arc<Tab>) -> Result<Vec<String>, TaskError> {
    let result = tab
        .evaluate(LINKS_JS, false)
        .map_err(|e| TaskError::Execution(format!("link extraction failed: {e}")))?;
    let raw = result
        .value
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_else(|| "[]".to_string());
    serde_json::from_str(&raw)
        .map_err(|e| TaskError::Execution(format!("link extraction returned bad data: {e}")))
}

/// Raster capture of the entire page, clipped to its full scrollable size.
pub fn full_page_screenshot(tab: &Arc<Tab>) -> Result<Vec<u8>, TaskError> {
    let (width, height) = page_size(tab)?;
    let clip = Page::Viewport {
        x: 0.0,
        y: 0.0,
        width,
        height,
        scale: 1.0,
    };
    tab.capture_screenshot(
        Page::CaptureScreenshotFormatOption::Png,
        None,
        Some(clip),
        true,
    )
    .map_err(|e| TaskError::Execution(format!("screenshot capture failed: {e}")))
}

/// Paginated document rendering of the page.
pub fn render_pdf(tab: &Arc<Tab>) -> Result<Vec<u8>, TaskError> {
    tab.print_to_pdf(None)
        .map_err(|e| TaskError::Execution(format!("pdf rendering failed: {e}")))
}

fn page_size(tab: &Arc<Tab>) -> Result<(f64, f64), TaskError> {
    let result = tab
        .evaluate(PAGE_SIZE_JS, false)
        .map_err(|e| TaskError::Execution(format!("page measurement failed: {e}")))?;
    let raw = result
        .value
        .and_then(|v| v.as_str().map(String::from))
        .ok_or_else(|| TaskError::Execution("page measurement returned no data".into()))?;
    let size: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| TaskError::Execution(format!("page measurement returned bad data: {e}")))?;

    let width = size.get("width").and_then(|v| v.as_f64()).unwrap_or(1280.0);
    let height = size.get("height").and_then(|v| v.as_f64()).unwrap_or(800.0);
    // A zero-sized document still produces a visible capture.
    Ok((width.max(1.0), height.max(1.0)))
}
