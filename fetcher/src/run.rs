use crate::browser::{ChromeBrowser, PageDriver, acquire_page};
use crate::config::Config;
use crate::error::{RunError, ScrapeError};
use crate::failure::report_failure;
use crate::locator::extract_reading;
use crate::logging;
use crate::notifier::{Broadcaster, notify};
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use wlwatch_core::message::{StationLabels, compose_alert};
use wlwatch_core::{Detection, Reading, detect_change};
use wlwatch_state::StateStore;

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAULT: u8 = 1;
pub const EXIT_STEP_FAILED: u8 = 2;
pub const EXIT_DELIVERY_FAILED: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Alert delivered and the new reading stored.
    Notified { reading: String },
    Unchanged { reading: String },
    /// Alert composed but not delivered; the stored reading was left alone.
    DeliveryFailed { reading: String },
}

/// Launches a browser, runs one scrape-compare-notify pass and closes it.
pub async fn run_once<S: StateStore, B: Broadcaster>(
    config: &Config,
    store: &S,
    broadcaster: &B,
) -> Result<RunOutcome, RunError> {
    let browser = match ChromeBrowser::launch(config).await {
        Ok(browser) => browser,
        Err(err) => {
            report_failure::<ChromeBrowser, _>(None, &err, config, broadcaster).await;
            return Err(err.into());
        }
    };

    let result = execute(&browser, config, store, broadcaster, Utc::now()).await;
    browser.close().await;
    result
}

async fn scrape<D: PageDriver>(page: &D, config: &Config) -> Result<Reading, ScrapeError> {
    acquire_page(page, config).await?;
    extract_reading(page, &config.station_text, config.station_timeout).await
}

/// The pipeline over an already open page.
pub async fn execute<D: PageDriver, S: StateStore, B: Broadcaster>(
    page: &D,
    config: &Config,
    store: &S,
    broadcaster: &B,
    now: DateTime<Utc>,
) -> Result<RunOutcome, RunError> {
    let reading = match scrape(page, config).await {
        Ok(reading) => reading,
        Err(err) => {
            report_failure(Some(page), &err, config, broadcaster).await;
            return Err(err.into());
        }
    };

    let logger = logging::Logger::new()
        .station(&config.station_label)
        .value(&reading.text)
        .threshold(config.bank_level);

    let previous = store.get(&config.state_key).await;
    let detection = detect_change(
        previous.as_ref().map(|value| value.as_deref()),
        &reading.text,
    );

    match detection {
        Detection::Failed { reason } => {
            let err = anyhow!("loading previous reading from {}: {reason}", store.backend());
            logger.error("state.read_failed", &err, "Cannot compare with previous reading");
            Err(RunError::State(err))
        }
        Detection::Unchanged => {
            logger.info("reading.unchanged", "Level unchanged, nothing to send");
            Ok(RunOutcome::Unchanged {
                reading: reading.text,
            })
        }
        Detection::Changed { previous } => {
            let message = compose_alert(
                &StationLabels {
                    station: &config.station_label,
                    area: &config.area_label,
                    river: &config.river_label,
                },
                reading.value,
                config.bank_level,
                now,
            );
            logger.info(
                "reading.changed",
                &format!(
                    "Level changed from {} to {}",
                    previous.as_deref().unwrap_or("nothing"),
                    reading.text
                ),
            );
            logger.info("alert.composed", &message);

            if !notify(broadcaster, &message).await {
                logger.warn(
                    "state.not_advanced",
                    "Delivery failed, keeping previous reading for the next run",
                );
                return Ok(RunOutcome::DeliveryFailed {
                    reading: reading.text,
                });
            }

            store
                .put(&config.state_key, &reading.text)
                .await
                .map_err(RunError::State)?;
            logger.info("state.saved", "Stored new reading");
            Ok(RunOutcome::Notified {
                reading: reading.text,
            })
        }
    }
}

/// Process exit status for a finished run.
pub fn exit_code(result: &Result<RunOutcome, RunError>) -> u8 {
    match result {
        Ok(RunOutcome::Notified { .. } | RunOutcome::Unchanged { .. }) => EXIT_OK,
        Ok(RunOutcome::DeliveryFailed { .. }) => EXIT_DELIVERY_FAILED,
        Err(RunError::Scrape(_)) => EXIT_STEP_FAILED,
        Err(RunError::State(_)) => EXIT_FAULT,
    }
}
