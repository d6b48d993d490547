//! `PageSession` — one live browser page for the duration of one task.
//!
//! Wraps navigation (with retry + per-attempt timeout), click-by-text, and
//! the in-page text probes behind the narrow [`PageDriver`] trait so the
//! extraction/classification core runs against a fake page in tests.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::browser;
use crate::error::SentryError;

/// Navigation retry budget: 3 attempts, fixed 2 s backoff, 30 s per attempt.
pub const NAV_ATTEMPTS: u32 = 3;
pub const NAV_BACKOFF_MS: u64 = 2_000;
pub const NAV_ATTEMPT_TIMEOUT_MS: u64 = 30_000;

/// Which part of the document a probe scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePass {
    /// Short allow-list of structural containers likely to hold one label each.
    Structural,
    /// Every element, stopping once the limit is reached.
    FullDocument,
}

/// The page-automation capability the tasks consume: navigate, click a
/// control by its text, run a text probe in page context.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to `url`, retrying per the fixed budget.
    async fn open(&self, url: &str) -> Result<(), SentryError>;

    /// Click the first clickable element whose trimmed, case-insensitive
    /// text equals `label` exactly. `false` when nothing matched — callers
    /// treat that as "already in the desired state".
    async fn click_control(&self, label: &str) -> Result<bool, SentryError>;

    /// Collect text fragments containing any of `needles` (case-insensitive)
    /// in document order, up to `limit`.
    async fn probe(
        &self,
        pass: ProbePass,
        needles: &[&str],
        limit: usize,
    ) -> Result<Vec<String>, SentryError>;
}

// Containers that typically hold one signal label each. The full-document
// selector is the forward-progress fallback when the layout changes.
const STRUCTURAL_SELECTOR: &str = "td, th, li, span, strong, b, h1, h2, h3";
const FULL_DOCUMENT_SELECTOR: &str = "*";

// Fragments longer than this are nested wrappers repeating the whole panel,
// not individual labels.
const MAX_FRAGMENT_LEN: usize = 64;

pub struct PageSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl PageSession {
    /// Discover a browser executable and launch a headless instance with a
    /// blank page ready for [`PageDriver::open`].
    pub async fn launch() -> Result<Self, SentryError> {
        let exe = browser::find_chrome_executable().ok_or_else(|| {
            SentryError::Launch(
                "no Chromium-family browser found; install Chrome/Chromium or set CHROME_EXECUTABLE"
                    .to_string(),
            )
        })?;

        info!("🚀 Launching headless browser ({})", exe);
        let cfg = browser::build_headless_config(&exe)
            .map_err(|e| SentryError::Launch(e.to_string()))?;

        let (browser, mut handler_events) = Browser::launch(cfg)
            .await
            .map_err(|e| SentryError::Launch(format!("{}: {}", exe, e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler_events.next().await {
                if let Err(e) = event {
                    warn!("CDP handler error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SentryError::Launch(format!("failed to open tab: {}", e)))?;

        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    /// Close the browser and stop the CDP handler. Called on every exit
    /// path; for a timed-out task this teardown is what stops whatever the
    /// browser was still doing.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser close error (non-fatal): {}", e);
        }
        self.handler.abort();
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, js: String) -> Result<T, SentryError> {
        self.page
            .evaluate(js)
            .await
            .map_err(|e| SentryError::Evaluate(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| SentryError::Evaluate(e.to_string()))
    }
}

#[async_trait]
impl PageDriver for PageSession {
    async fn open(&self, url: &str) -> Result<(), SentryError> {
        for attempt in 1..=NAV_ATTEMPTS {
            let nav = timeout(
                Duration::from_millis(NAV_ATTEMPT_TIMEOUT_MS),
                self.page.goto(url),
            )
            .await;
            match nav {
                Ok(Ok(_)) => {
                    info!("🌐 Navigation succeeded (attempt {}): {}", attempt, url);
                    return Ok(());
                }
                Ok(Err(e)) => {
                    warn!("Navigation attempt {}/{} failed: {}", attempt, NAV_ATTEMPTS, e)
                }
                Err(_) => warn!(
                    "Navigation attempt {}/{} timed out after {} ms",
                    attempt, NAV_ATTEMPTS, NAV_ATTEMPT_TIMEOUT_MS
                ),
            }
            if attempt < NAV_ATTEMPTS {
                sleep(Duration::from_millis(NAV_BACKOFF_MS)).await;
            }
        }
        Err(SentryError::Navigation {
            url: url.to_string(),
            attempts: NAV_ATTEMPTS,
        })
    }

    async fn click_control(&self, label: &str) -> Result<bool, SentryError> {
        let label_json =
            serde_json::to_string(label).map_err(|e| SentryError::Evaluate(e.to_string()))?;
        let js = format!(
            r#"((label) => {{
                const want = label.trim().toLowerCase();
                const nodes = document.querySelectorAll(
                    "button, a, input[type='button'], input[type='submit'], [role='button']"
                );
                for (const el of nodes) {{
                    const text = (el.innerText || el.value || '').trim().toLowerCase();
                    if (text === want) {{ el.click(); return true; }}
                }}
                return false;
            }})({label_json})"#
        );
        self.eval::<bool>(js).await
    }

    async fn probe(
        &self,
        pass: ProbePass,
        needles: &[&str],
        limit: usize,
    ) -> Result<Vec<String>, SentryError> {
        let selector = match pass {
            ProbePass::Structural => STRUCTURAL_SELECTOR,
            ProbePass::FullDocument => FULL_DOCUMENT_SELECTOR,
        };
        let needles_json =
            serde_json::to_string(needles).map_err(|e| SentryError::Evaluate(e.to_string()))?;
        let js = format!(
            r#"((needles, limit) => {{
                const out = [];
                const nodes = document.querySelectorAll("{selector}");
                for (const el of nodes) {{
                    const text = (el.textContent || '').trim();
                    if (!text || text.length > {MAX_FRAGMENT_LEN}) continue;
                    const lower = text.toLowerCase();
                    if (needles.some((n) => lower.includes(n))) {{
                        out.push(text);
                        if (out.length >= limit) break;
                    }}
                }}
                return out;
            }})({needles_json}, {limit})"#
        );
        self.eval::<Vec<String>>(js).await
    }
}
