use crate::browser::PageDriver;
use crate::config::Config;
use crate::error::ScrapeError;
use crate::logging;
use crate::notifier::{Broadcaster, notify};
use wlwatch_core::message::{compose_failure, compose_fatal};

/// What the failure path managed to do; the original error is reported by the caller.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FailureReport {
    pub screenshot_saved: bool,
    pub alert_sent: bool,
}

/// Screenshots the page (when there is one) and sends the error alert.
///
/// Both steps are best effort: their failures are logged and never replace
/// `err`, which the caller propagates afterwards.
pub async fn report_failure<D: PageDriver, B: Broadcaster>(
    page: Option<&D>,
    err: &ScrapeError,
    config: &Config,
    broadcaster: &B,
) -> FailureReport {
    let mut report = FailureReport::default();

    logging::Logger::new()
        .station(&config.station_label)
        .error_text(err.to_string())
        .error("scrape.failed", err, "Failed to read the station level");

    if let Some(page) = page {
        let path = config.screenshot_path.display().to_string();
        let logger = logging::Logger::new().path(&path);
        match page.screenshot(&config.screenshot_path).await {
            Ok(()) => {
                logger.info("failure.screenshot_saved", "Saved debug screenshot");
                report.screenshot_saved = true;
            }
            Err(screenshot_err) => {
                logger.error(
                    "failure.screenshot_failed",
                    &screenshot_err,
                    "Could not capture debug screenshot",
                );
            }
        }
    }

    let text = if err.before_page() {
        compose_fatal(&err.to_string())
    } else {
        compose_failure(
            &config.station_label,
            err.description(),
            &config.artifact_name,
        )
    };
    report.alert_sent = notify(broadcaster, &text).await;

    logging::Logger::new().station(&config.station_label).info(
        "failure.reported",
        &format!(
            "screenshot_saved={} alert_sent={}",
            report.screenshot_saved, report.alert_sent
        ),
    );
    report
}
