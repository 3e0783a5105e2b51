//! Fakes for the browser and broadcast seams.

use crate::browser::{PageDriver, RowQuery, WaitTarget};
use crate::config::Config;
use crate::error::{NotifyError, ScrapeError};
use crate::notifier::Broadcaster;
use std::cell::RefCell;
use std::path::Path;
use std::time::Duration;

pub(crate) fn test_config() -> Config {
    Config::from_lookup(|name| match name {
        "LINE_CHANNEL_ACCESS_TOKEN" => Some("test-token".to_string()),
        "STATION_TIMEOUT_SECS" | "TABLE_TIMEOUT_SECS" | "NAVIGATION_TIMEOUT_SECS" => {
            Some("1".to_string())
        }
        _ => None,
    })
    .unwrap()
}

pub(crate) struct FakePage {
    pub navigation_times_out: bool,
    pub table_visible: bool,
    /// Station text visible inside a table row.
    pub station_visible: bool,
    pub row: RowQuery,
    pub screenshot_fails: bool,
    pub calls: RefCell<Vec<String>>,
}

impl FakePage {
    pub fn with_row(cells: &[&str]) -> Self {
        Self {
            navigation_times_out: false,
            table_visible: true,
            station_visible: true,
            row: RowQuery::Cells(cells.iter().map(|cell| cell.to_string()).collect()),
            screenshot_fails: false,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: &str) {
        self.calls.borrow_mut().push(call.to_string());
    }
}

impl PageDriver for FakePage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ScrapeError> {
        self.record("navigate");
        if self.navigation_times_out {
            return Err(ScrapeError::NavigationTimeout {
                target: url.to_string(),
                timeout,
            });
        }
        Ok(())
    }

    async fn wait_visible(
        &self,
        target: WaitTarget<'_>,
        _timeout: Duration,
    ) -> Result<bool, ScrapeError> {
        match target {
            WaitTarget::Selector(_) => {
                self.record("wait:selector");
                Ok(self.table_visible)
            }
            WaitTarget::Text(_) => {
                self.record("wait:text");
                Ok(self.station_visible)
            }
        }
    }

    async fn query_row_cells(&self, _text: &str) -> Result<RowQuery, ScrapeError> {
        self.record("query");
        Ok(self.row.clone())
    }

    async fn screenshot(&self, _path: &Path) -> anyhow::Result<()> {
        self.record("screenshot");
        if self.screenshot_fails {
            anyhow::bail!("page crashed");
        }
        Ok(())
    }
}

/// Records every message and answers with a fixed outcome.
#[derive(Default)]
pub(crate) struct FakeBroadcaster {
    pub fail: bool,
    pub sent: RefCell<Vec<String>>,
}

impl FakeBroadcaster {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.borrow().clone()
    }
}

impl Broadcaster for FakeBroadcaster {
    async fn broadcast(&self, text: &str) -> Result<(), NotifyError> {
        self.sent.borrow_mut().push(text.to_string());
        if self.fail {
            return Err(NotifyError::Delivery {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(())
    }
}
