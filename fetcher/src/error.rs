use std::time::Duration;
use thiserror::Error;
use wlwatch_core::ParseReadingError;

/// Failures while acquiring the page or extracting the reading.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("timed out after {timeout:?} waiting for {target}")]
    NavigationTimeout { target: String, timeout: Duration },

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("station text {text:?} not visible after {timeout:?}")]
    StationNotFound { text: String, timeout: Duration },

    #[error("row structure error: {0}")]
    RowStructure(String),

    #[error(transparent)]
    ReadingParse(#[from] ParseReadingError),
}

impl ScrapeError {
    /// Short label quoted in the error alert.
    pub fn description(&self) -> &'static str {
        match self {
            ScrapeError::Launch(_) => "Browser",
            ScrapeError::NavigationTimeout { .. } | ScrapeError::StationNotFound { .. } => {
                "Timeout"
            }
            ScrapeError::Navigation(_) => "Navigation",
            ScrapeError::RowStructure(_) => "Table layout",
            ScrapeError::ReadingParse(_) => "Invalid reading",
        }
    }

    /// No page exists yet, so there is nothing to screenshot.
    pub fn before_page(&self) -> bool {
        matches!(self, ScrapeError::Launch(_))
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("LINE_CHANNEL_ACCESS_TOKEN is not set")]
    MissingCredential,

    #[error("broadcast api error: status={status} body={body}")]
    Delivery { status: u16, body: String },

    #[error("broadcast transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error("state store failure: {0:#}")]
    State(anyhow::Error),
}
