use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_TARGET_URL: &str = "https://www.thaiwater.net/water/wl";
const DEFAULT_STATION_TEXT: &str = "อินทร์บุรี";
const DEFAULT_AREA_LABEL: &str = "จ.อ.อินทร์บุรี";
const DEFAULT_RIVER_LABEL: &str = "เจ้าพระยา";
const DEFAULT_BANK_LEVEL: f64 = 13.00;
const DEFAULT_TABLE_SELECTOR: &str = "table";
const DEFAULT_WAIT_SECS: u64 = 120;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BROADCAST_URL: &str = "https://api.line.me/v2/bot/message/broadcast";
const DEFAULT_STATE_FILE: &str = "last_level.json";
const DEFAULT_SCREENSHOT_PATH: &str = "debug_screenshot.png";
const DEFAULT_ARTIFACT_NAME: &str = "debug-screenshot";

#[derive(Debug, Clone, PartialEq)]
pub enum StateLocation {
    File(PathBuf),
    DynamoDb { table_name: String },
}

/// Everything a run needs, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub target_url: String,
    pub station_text: String,
    pub station_label: String,
    pub area_label: String,
    pub river_label: String,
    pub bank_level: f64,
    pub table_selector: String,
    pub navigation_timeout: Duration,
    pub table_timeout: Duration,
    pub station_timeout: Duration,
    pub http_timeout: Duration,
    pub line_token: Option<String>,
    pub broadcast_url: String,
    pub state: StateLocation,
    pub state_key: String,
    pub screenshot_path: PathBuf,
    pub artifact_name: String,
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source; blank values are unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let text = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let station_text = text("STATION_TEXT", DEFAULT_STATION_TEXT);
        let state = match var("STATE_TABLE_NAME") {
            Some(table_name) => StateLocation::DynamoDb { table_name },
            None => StateLocation::File(text("STATE_FILE", DEFAULT_STATE_FILE).into()),
        };

        Ok(Self {
            target_url: text("TARGET_URL", DEFAULT_TARGET_URL),
            station_label: text("STATION_LABEL", &station_text),
            area_label: text("AREA_LABEL", DEFAULT_AREA_LABEL),
            river_label: text("RIVER_LABEL", DEFAULT_RIVER_LABEL),
            bank_level: parse_var(var("BANK_LEVEL"), "BANK_LEVEL", DEFAULT_BANK_LEVEL)?,
            table_selector: text("TABLE_SELECTOR", DEFAULT_TABLE_SELECTOR),
            navigation_timeout: secs_var(
                var("NAVIGATION_TIMEOUT_SECS"),
                "NAVIGATION_TIMEOUT_SECS",
                DEFAULT_WAIT_SECS,
            )?,
            table_timeout: secs_var(
                var("TABLE_TIMEOUT_SECS"),
                "TABLE_TIMEOUT_SECS",
                DEFAULT_WAIT_SECS,
            )?,
            station_timeout: secs_var(
                var("STATION_TIMEOUT_SECS"),
                "STATION_TIMEOUT_SECS",
                DEFAULT_WAIT_SECS,
            )?,
            http_timeout: secs_var(
                var("HTTP_TIMEOUT_SECS"),
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?,
            line_token: var("LINE_CHANNEL_ACCESS_TOKEN"),
            broadcast_url: text("LINE_BROADCAST_URL", DEFAULT_BROADCAST_URL),
            state,
            state_key: text("STATE_KEY", &station_text),
            screenshot_path: text("SCREENSHOT_PATH", DEFAULT_SCREENSHOT_PATH).into(),
            artifact_name: text("ARTIFACT_NAME", DEFAULT_ARTIFACT_NAME),
            chrome_path: var("CHROME_PATH").map(PathBuf::from),
            headless: parse_bool(var("HEADLESS"), "HEADLESS", true)?,
            station_text,
        })
    }
}

fn parse_var<T>(value: Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("invalid value for {name}: {value:?}")),
        None => Ok(default),
    }
}

fn secs_var(value: Option<String>, name: &str, default: u64) -> Result<Duration> {
    parse_var(value, name, default).map(Duration::from_secs)
}

fn parse_bool(value: Option<String>, name: &str, default: bool) -> Result<bool> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!("invalid value for {name}: {value:?}")),
    }
}
