use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use reqwest::Client as HTTPClient;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wlwatch_state::{DynamoDbStore, FileStore, StateBackend, StateStore};

use crate::config::{Config, StateLocation};
use crate::error::RunError;
use crate::notifier::LineBroadcaster;
use crate::run::{EXIT_FAULT, RunOutcome};

mod browser;
mod config;
mod error;
mod failure;
mod locator;
mod logging;
mod notifier;
mod run;
#[cfg(test)]
mod testing;

async fn open_state_store(config: &Config) -> StateBackend {
    match &config.state {
        StateLocation::File(path) => StateBackend::File(FileStore::new(path)),
        StateLocation::DynamoDb { table_name } => {
            let client =
                DynamoDbClient::new(&aws_config::defaults(BehaviorVersion::latest()).load().await);
            StateBackend::DynamoDb(DynamoDbStore::new(client, table_name))
        }
    }
}

fn log_result(config: &Config, result: &Result<RunOutcome, RunError>) {
    let logger = logging::Logger::new().station(&config.station_label);
    match result {
        Ok(RunOutcome::Notified { reading }) => logger
            .value(reading)
            .info("run.notified", "Run finished, alert delivered"),
        Ok(RunOutcome::Unchanged { reading }) => logger
            .value(reading)
            .info("run.unchanged", "Run finished, nothing to do"),
        Ok(RunOutcome::DeliveryFailed { reading }) => logger.value(reading).warn(
            "run.delivery_failed",
            "Run finished, alert not delivered; it will be retried on the next run",
        ),
        // Already reported with screenshot and error alert.
        Err(RunError::Scrape(err)) => logger.error_text(err.to_string()).warn(
            "run.step_failed",
            &format!("Scrape step failed ({})", err.description()),
        ),
        Err(err) => logger.error("run.failed", err, "Run aborted"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()) // Enable log level filtering via `RUST_LOG` env var
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .with_target(false)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            logging::Logger::new().error("config.invalid", &err, "Invalid configuration");
            return ExitCode::from(EXIT_FAULT);
        }
    };
    if config.line_token.is_none() {
        logging::Logger::new().warn(
            "config.missing_token",
            "LINE_CHANNEL_ACCESS_TOKEN is not set, alerts cannot be delivered",
        );
    }

    let http_client = match HTTPClient::builder().timeout(config.http_timeout).build() {
        Ok(client) => client,
        Err(err) => {
            logging::Logger::new().error("config.http_client", &err, "Cannot build HTTP client");
            return ExitCode::from(EXIT_FAULT);
        }
    };
    let broadcaster = LineBroadcaster::new(http_client, &config);
    let store = open_state_store(&config).await;

    logging::Logger::new()
        .station(&config.station_label)
        .threshold(config.bank_level)
        .path(&config.target_url)
        .info(
            "run.start",
            &format!("Starting water level check (state: {})", store.backend()),
        );

    let result = run::run_once(&config, &store, &broadcaster).await;
    log_result(&config, &result);
    ExitCode::from(run::exit_code(&result))
}
