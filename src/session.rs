use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, info, warn};

use crate::error::TaskError;

/// One browser process plus one active page, owned exclusively by a single
/// task invocation. Never pooled, never reused.
pub struct BrowserSession {
    _browser: Browser,
    pub tab: Arc<Tab>,
    /// DevTools port the process was launched on. The performance auditor
    /// attaches to the same endpoint through this port.
    pub debug_port: u16,
    created_at: Instant,
}

/// Launches and tears down one-shot browser sessions. Process-lifetime
/// counters make the acquire/release balance observable.
pub struct SessionManager {
    chrome_path: Option<PathBuf>,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl SessionManager {
    pub fn new(chrome_path: Option<PathBuf>) -> Self {
        Self {
            chrome_path,
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    /// Launch a fresh browser process with a blank page. A failure here is
    /// fatal for the request; a new process per request means launch
    /// failures are not expected to be transient within the same call.
    pub async fn acquire(&self) -> Result<BrowserSession, TaskError> {
        let chrome_path = self.chrome_path.clone();
        let session = tokio::task::spawn_blocking(move || launch(chrome_path))
            .await
            .map_err(|e| TaskError::SessionLaunch(format!("launch task panicked: {e}")))?
            .map_err(|e| TaskError::SessionLaunch(format!("{e:#}")))?;

        self.acquired.fetch_add(1, Ordering::SeqCst);
        debug!(debug_port = session.debug_port, "browser session acquired");
        Ok(session)
    }

    /// Tear the session down. Counted before the teardown runs so the
    /// acquire/release balance holds even when Chrome exits uncleanly; a
    /// teardown failure is logged and never re-raised over an
    /// already-decided task outcome.
    pub async fn release(&self, session: BrowserSession) {
        self.released.fetch_add(1, Ordering::SeqCst);
        let lifetime_ms = session.created_at.elapsed().as_millis() as u64;

        let outcome = tokio::task::spawn_blocking(move || {
            // Ask the page to close first so Chrome can unload it; dropping
            // the Browser handle then reaps the process itself, which also
            // covers a page stuck in an indeterminate state.
            let closed = session.tab.close(false).map(|_| ());
            drop(session);
            closed
        })
        .await;

        match outcome {
            Ok(Ok(())) => info!(lifetime_ms, "browser session released"),
            Ok(Err(e)) => warn!(lifetime_ms, error = %e, "session teardown reported an error"),
            Err(e) => warn!(lifetime_ms, error = %e, "session teardown task panicked"),
        }
    }

    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }
}

fn launch(chrome_path: Option<PathBuf>) -> Result<BrowserSession> {
    // Randomized so concurrent invocations never contend for the endpoint.
    let debug_port: u16 = rand::random_range(9300..9700);

    let options = LaunchOptions {
        headless: true,
        // Containers this service ships in run without a usable sandbox.
        sandbox: false,
        window_size: Some((1280, 800)),
        port: Some(debug_port),
        path: chrome_path,
        args: vec![
            OsStr::new("--no-first-run"),
            OsStr::new("--no-default-browser-check"),
            OsStr::new("--disable-gpu"),
            OsStr::new("--disable-dev-shm-usage"),
        ],
        // Long-running audits can go quiet on the CDP socket; don't let the
        // idle watchdog kill the process under a live task.
        idle_browser_timeout: Duration::from_secs(600),
        ..Default::default()
    };

    let browser = Browser::new(options)?;
    let tab = browser.new_tab()?;

    Ok(BrowserSession {
        _browser: browser,
        tab,
        debug_port,
        created_at: Instant::now(),
    })
}
