use crate::config::Config;
use crate::error::ScrapeError;
use crate::logging;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat, NavigateParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";
const VIEWPORT_WIDTH: u32 = 1920;
const VIEWPORT_HEIGHT: u32 = 1080;
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);
// No new resource entries for this long counts as network idle.
const IDLE_WINDOW: Duration = Duration::from_secs(1);
// Upper bound for a single CDP round trip, capped by the shortest configured wait.
const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const LOAD_STATE_JS: &str = r#"(() => {
  let resources = 0;
  try { resources = performance.getEntriesByType('resource').length; } catch (_) {}
  return { ready: document.readyState === 'complete', resources };
})()"#;

// Collects the elements whose own text contains `needle`, in document order.
const LOCATE_JS: &str = r#"
function wlwatchLocate(needle) {
  const hits = [];
  const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT);
  let node;
  while ((node = walker.nextNode())) {
    if (node.data.includes(needle) && node.parentElement) {
      hits.push(node.parentElement);
    }
  }
  return hits;
}
function wlwatchVisible(el) {
  const rect = el.getBoundingClientRect();
  const style = window.getComputedStyle(el);
  return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none';
}
function wlwatchInRow(el) {
  return el.closest('tr') !== null;
}
"#;

/// What to wait for on the page.
#[derive(Debug, Clone, Copy)]
pub enum WaitTarget<'a> {
    Selector(&'a str),
    Text(&'a str),
}

/// Result of looking up the row that holds a locating text.
#[derive(Debug, Clone, PartialEq)]
pub enum RowQuery {
    NoMatch,
    NoRow,
    Cells(Vec<String>),
}

/// The slice of browser automation the pipeline relies on.
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ScrapeError>;

    /// Resolves to `false` when `timeout` expires before the target shows up.
    async fn wait_visible(
        &self,
        target: WaitTarget<'_>,
        timeout: Duration,
    ) -> Result<bool, ScrapeError>;

    async fn query_row_cells(&self, text: &str) -> Result<RowQuery, ScrapeError>;

    async fn screenshot(&self, path: &Path) -> anyhow::Result<()>;
}

/// Loads the target page and waits for the data table.
pub async fn acquire_page<D: PageDriver>(driver: &D, config: &Config) -> Result<(), ScrapeError> {
    logging::Logger::new()
        .path(&config.target_url)
        .info("page.navigate", "Opening gauge page");
    driver
        .navigate(&config.target_url, config.navigation_timeout)
        .await?;

    let visible = driver
        .wait_visible(
            WaitTarget::Selector(&config.table_selector),
            config.table_timeout,
        )
        .await?;
    if !visible {
        return Err(ScrapeError::NavigationTimeout {
            target: format!("table {:?}", config.table_selector),
            timeout: config.table_timeout,
        });
    }

    logging::Logger::new()
        .path(&config.target_url)
        .info("page.ready", "Data table is visible");
    Ok(())
}

#[derive(Deserialize)]
struct RowProbe {
    matched: bool,
    cells: Option<Vec<String>>,
}

impl From<RowProbe> for RowQuery {
    fn from(probe: RowProbe) -> Self {
        match (probe.matched, probe.cells) {
            (false, _) => RowQuery::NoMatch,
            (true, None) => RowQuery::NoRow,
            (true, Some(cells)) => RowQuery::Cells(cells),
        }
    }
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn visibility_script(target: WaitTarget<'_>) -> String {
    match target {
        WaitTarget::Selector(selector) => format!(
            "(() => {{ {LOCATE_JS} const el = document.querySelector({}); return !!el && wlwatchVisible(el); }})()",
            js_string(selector)
        ),
        WaitTarget::Text(text) => format!(
            "(() => {{ {LOCATE_JS} return wlwatchLocate({}).filter(wlwatchInRow).some(wlwatchVisible); }})()",
            js_string(text)
        ),
    }
}

fn row_cells_script(text: &str) -> String {
    format!(
        r#"(() => {{
  {LOCATE_JS}
  const hits = wlwatchLocate({});
  if (hits.length === 0) return {{ matched: false, cells: null }};
  const row = hits.map((el) => el.closest('tr')).find(Boolean);
  if (!row) return {{ matched: true, cells: null }};
  return {{ matched: true, cells: Array.from(row.querySelectorAll(':scope > td')).map((td) => td.innerText) }};
}})()"#,
        js_string(text)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
struct LoadState {
    ready: bool,
    resources: u64,
}

/// Counts how long the document has been complete with a steady resource count.
#[derive(Debug, Default)]
struct IdleTracker {
    last_resources: Option<u64>,
    stable: Duration,
}

impl IdleTracker {
    /// Feeds one poll result; `None` means the page could not be queried and resets the window.
    fn observe(&mut self, state: Option<LoadState>, step: Duration) -> bool {
        match state {
            Some(state) if state.ready && self.last_resources == Some(state.resources) => {
                self.stable += step;
            }
            _ => self.stable = Duration::ZERO,
        }
        self.last_resources = state.map(|state| state.resources);
        self.stable >= IDLE_WINDOW
    }
}

/// Polls until the page looks network idle. Unbounded; callers wrap it in [`within`].
async fn wait_for_network_idle<F, Fut>(mut sample: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<LoadState>>,
{
    let mut tracker = IdleTracker::default();
    loop {
        if tracker.observe(sample().await, IDLE_POLL_INTERVAL) {
            return;
        }
        sleep(IDLE_POLL_INTERVAL).await;
    }
}

/// Runs a page-loading step, turning an expired `limit` into `NavigationTimeout`.
async fn within<T>(
    target: &str,
    limit: Duration,
    work: impl Future<Output = Result<T, ScrapeError>>,
) -> Result<T, ScrapeError> {
    timeout(limit, work)
        .await
        .unwrap_or_else(|_| {
            Err(ScrapeError::NavigationTimeout {
                target: target.to_string(),
                timeout: limit,
            })
        })
}

fn request_timeout(config: &Config) -> Duration {
    MAX_REQUEST_TIMEOUT
        .min(config.navigation_timeout)
        .min(config.table_timeout)
        .min(config.station_timeout)
}

/// One isolated Chromium instance with a single page, alive for one run.
pub struct ChromeBrowser {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    _profile_dir: tempfile::TempDir,
}

impl ChromeBrowser {
    pub async fn launch(config: &Config) -> Result<Self, ScrapeError> {
        // Fresh profile per run so no cookies or cache survive between runs.
        let profile_dir = tempfile::tempdir()
            .map_err(|e| ScrapeError::Launch(format!("failed to create profile dir: {e}")))?;

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                device_scale_factor: Some(1.0),
                ..Default::default()
            })
            .request_timeout(request_timeout(config))
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={USER_AGENT}"))
            .user_data_dir(profile_dir.path());

        builder = if config.headless {
            builder.with_head().arg("--headless=new")
        } else {
            builder.with_head()
        };
        if let Some(path) = config.chrome_path.as_ref() {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder.build().map_err(ScrapeError::Launch)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler.abort();
                return Err(ScrapeError::Launch(format!("failed to open page: {err}")));
            }
        };

        if let Err(err) = page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(
                "Object.defineProperty(navigator, 'webdriver', { get: () => false });".to_string(),
            ))
            .await
        {
            logging::Logger::new().error(
                "browser.webdriver_mask_failed",
                &err,
                "Failed to mask navigator.webdriver",
            );
        }

        logging::Logger::new().info("browser.launched", "Browser started");
        Ok(Self {
            browser,
            page,
            handler,
            _profile_dir: profile_dir,
        })
    }

    /// Shuts the browser down; never fails, problems are only logged.
    pub async fn close(mut self) {
        if let Err(err) = self.browser.close().await {
            logging::Logger::new().error("browser.close_failed", &err, "Failed to close browser");
        }
        if let Err(err) = self.browser.wait().await {
            logging::Logger::new().error("browser.wait_failed", &err, "Failed to reap browser");
        }
        self.handler.abort();
        logging::Logger::new().info("browser.closed", "Browser closed");
    }

    async fn load_state(&self) -> Option<LoadState> {
        match self.page.evaluate(LOAD_STATE_JS).await {
            Ok(result) => result.into_value::<LoadState>().ok(),
            // Expected while the old document is being replaced.
            Err(err) => {
                logging::Logger::new().error_text(err.to_string()).warn(
                    "page.load_state_failed",
                    "Load-state query failed, retrying",
                );
                None
            }
        }
    }
}

impl PageDriver for ChromeBrowser {
    async fn navigate(&self, url: &str, limit: Duration) -> Result<(), ScrapeError> {
        let load = async {
            // Returns once the navigation commits, so slow loads are bounded by `limit` alone.
            let committed = self
                .page
                .execute(NavigateParams::new(url))
                .await
                .map_err(|e| match e {
                    CdpError::Timeout => ScrapeError::NavigationTimeout {
                        target: url.to_string(),
                        timeout: limit,
                    },
                    e => ScrapeError::Navigation(e.to_string()),
                })?;
            if let Some(error_text) = committed.result.error_text.as_ref() {
                return Err(ScrapeError::Navigation(error_text.clone()));
            }

            wait_for_network_idle(|| self.load_state()).await;
            logging::Logger::new()
                .path(url)
                .info("page.network_idle", "Page reached network idle");
            Ok(())
        };

        within(url, limit, load).await
    }

    async fn wait_visible(
        &self,
        target: WaitTarget<'_>,
        limit: Duration,
    ) -> Result<bool, ScrapeError> {
        let script = visibility_script(target);
        let deadline = Instant::now() + limit;
        loop {
            match self.page.evaluate(script.as_str()).await {
                Ok(result) => {
                    if result.into_value::<bool>().unwrap_or(false) {
                        return Ok(true);
                    }
                }
                // The page may still be swapping documents; keep polling.
                Err(err) => {
                    logging::Logger::new().error_text(err.to_string()).warn(
                        "page.poll_failed",
                        "Visibility probe failed, retrying until deadline",
                    );
                }
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn query_row_cells(&self, text: &str) -> Result<RowQuery, ScrapeError> {
        let probe = self
            .page
            .evaluate(row_cells_script(text))
            .await
            .map_err(|e| ScrapeError::Navigation(e.to_string()))?
            .into_value::<RowProbe>()
            .map_err(|e| ScrapeError::RowStructure(format!("unexpected row probe result: {e}")))?;
        Ok(probe.into())
    }

    async fn screenshot(&self, path: &Path) -> anyhow::Result<()> {
        let bytes = self
            .page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await?;
        tokio::fs::write(path, &bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePage, test_config};

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string("a'b\"c"), r#""a'b\"c""#);
        assert_eq!(js_string("อินทร์บุรี"), "\"อินทร์บุรี\"");
    }

    #[test]
    fn scripts_embed_the_needle_as_a_literal() {
        let script = visibility_script(WaitTarget::Text("อินทร์บุรี"));
        assert!(script.contains("wlwatchLocate(\"อินทร์บุรี\")"));
        let script = visibility_script(WaitTarget::Selector("table.wl"));
        assert!(script.contains("document.querySelector(\"table.wl\")"));
        let script = row_cells_script("อินทร์บุรี");
        assert!(script.contains("closest('tr')"));
    }

    #[test]
    fn text_wait_only_counts_matches_inside_a_row() {
        let script = visibility_script(WaitTarget::Text("อินทร์บุรี"));
        assert!(script.contains(".filter(wlwatchInRow).some(wlwatchVisible)"));
        assert!(LOCATE_JS.contains("el.closest('tr') !== null"));
    }

    fn state(ready: bool, resources: u64) -> Option<LoadState> {
        Some(LoadState { ready, resources })
    }

    #[test]
    fn idle_needs_a_full_window_of_steady_complete_polls() {
        let step = Duration::from_millis(250);
        let mut tracker = IdleTracker::default();
        assert!(!tracker.observe(state(true, 10), step));
        assert!(!tracker.observe(state(true, 10), step));
        assert!(!tracker.observe(state(true, 10), step));
        assert!(!tracker.observe(state(true, 10), step));
        assert!(tracker.observe(state(true, 10), step));
    }

    #[test]
    fn new_resources_loading_or_query_errors_reset_the_window() {
        let step = Duration::from_millis(500);
        let mut tracker = IdleTracker::default();
        tracker.observe(state(true, 3), step);
        assert!(!tracker.observe(state(true, 4), step));
        assert!(!tracker.observe(state(false, 4), step));
        assert!(!tracker.observe(None, step));
        assert!(!tracker.observe(state(true, 4), step));
        assert!(!tracker.observe(state(true, 4), step));
        assert!(tracker.observe(state(true, 4), step));
    }

    #[tokio::test]
    async fn settles_once_resources_stop_growing() {
        let polls = std::cell::Cell::new(0u64);
        let sample = || {
            polls.set(polls.get() + 1);
            let resources = polls.get().min(3);
            async move { state(true, resources) }
        };
        within("https://example.test", Duration::from_secs(10), async {
            wait_for_network_idle(sample).await;
            Ok(())
        })
        .await
        .unwrap();
        assert!(polls.get() >= 7);
    }

    #[tokio::test]
    async fn busy_page_fails_with_navigation_timeout_at_the_configured_limit() {
        let limit = Duration::from_millis(300);
        let polls = std::cell::Cell::new(0u64);
        let sample = || {
            polls.set(polls.get() + 1);
            let resources = polls.get();
            async move { state(true, resources) }
        };
        let err = within("https://example.test", limit, async {
            wait_for_network_idle(sample).await;
            Ok(())
        })
        .await
        .unwrap_err();
        match err {
            ScrapeError::NavigationTimeout { target, timeout } => {
                assert_eq!(target, "https://example.test");
                assert_eq!(timeout, limit);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn request_timeout_never_exceeds_the_shortest_wait() {
        assert_eq!(request_timeout(&test_config()), Duration::from_secs(1));
        let mut config = test_config();
        config.navigation_timeout = Duration::from_secs(120);
        config.table_timeout = Duration::from_secs(120);
        config.station_timeout = Duration::from_secs(120);
        assert_eq!(request_timeout(&config), MAX_REQUEST_TIMEOUT);
    }

    #[test]
    fn row_probe_maps_to_query() {
        let probe: RowProbe = serde_json::from_str(r#"{"matched":false,"cells":null}"#).unwrap();
        assert_eq!(RowQuery::from(probe), RowQuery::NoMatch);
        let probe: RowProbe = serde_json::from_str(r#"{"matched":true,"cells":null}"#).unwrap();
        assert_eq!(RowQuery::from(probe), RowQuery::NoRow);
        let probe: RowProbe =
            serde_json::from_str(r#"{"matched":true,"cells":["1","อินทร์บุรี","14.21"]}"#)
                .unwrap();
        assert_eq!(
            RowQuery::from(probe),
            RowQuery::Cells(vec![
                "1".to_string(),
                "อินทร์บุรี".to_string(),
                "14.21".to_string()
            ])
        );
    }

    #[tokio::test]
    async fn acquire_page_fails_when_table_never_shows() {
        let page = FakePage {
            table_visible: false,
            ..FakePage::with_row(&["1", "อินทร์บุรี", "14.21"])
        };
        let err = acquire_page(&page, &test_config()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::NavigationTimeout { .. }));
    }

    #[tokio::test]
    async fn acquire_page_propagates_navigation_timeout() {
        let page = FakePage {
            navigation_times_out: true,
            ..FakePage::with_row(&["1", "อินทร์บุรี", "14.21"])
        };
        let err = acquire_page(&page, &test_config()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::NavigationTimeout { .. }));
        assert_eq!(page.calls(), vec!["navigate"]);
    }

    #[tokio::test]
    async fn acquire_page_waits_for_table_after_navigation() {
        let page = FakePage::with_row(&["1", "อินทร์บุรี", "14.21"]);
        acquire_page(&page, &test_config()).await.unwrap();
        assert_eq!(page.calls(), vec!["navigate", "wait:selector"]);
    }
}
