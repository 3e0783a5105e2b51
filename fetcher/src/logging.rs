use tracing::{error, info, warn};

pub(crate) const TARGET: &str = "wlwatch_fetcher";

#[derive(Clone, Default)]
pub(crate) struct Logger {
    station: Option<String>,
    value: Option<String>,
    threshold: Option<f64>,
    path: Option<String>,
    status: Option<u16>,
    error_text: Option<String>,
}

impl Logger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn station(mut self, station: impl Into<String>) -> Self {
        self.station = Some(station.into());
        self
    }

    pub(crate) fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub(crate) fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub(crate) fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub(crate) fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub(crate) fn error_text(mut self, error_text: impl Into<String>) -> Self {
        self.error_text = Some(error_text.into());
        self
    }

    pub(crate) fn info(&self, event: &'static str, message: &str) {
        info!(
            target: TARGET,
            event,
            station = self.station.as_deref(),
            value = self.value.as_deref(),
            threshold = self.threshold,
            path = self.path.as_deref(),
            status = self.status,
            error_text = ?self.error_text,
            "{}",
            message
        );
    }

    pub(crate) fn warn(&self, event: &'static str, message: &str) {
        warn!(
            target: TARGET,
            event,
            station = self.station.as_deref(),
            value = self.value.as_deref(),
            threshold = self.threshold,
            path = self.path.as_deref(),
            status = self.status,
            error_text = ?self.error_text,
            "{}",
            message
        );
    }

    pub(crate) fn error<E: std::fmt::Debug>(&self, event: &'static str, err: &E, message: &str) {
        error!(
            target: TARGET,
            event,
            station = self.station.as_deref(),
            value = self.value.as_deref(),
            threshold = self.threshold,
            path = self.path.as_deref(),
            status = self.status,
            error_text = ?self.error_text,
            error = ?err,
            "{}",
            message
        );
    }
}
