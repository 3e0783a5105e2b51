use thiserror::Error;

use crate::change::normalize_text;

#[derive(Debug, Error, PartialEq)]
#[error("reading {raw:?} is not a decimal number")]
pub struct ParseReadingError {
    pub raw: String,
}

/// A water level as scraped from the gauge table.
///
/// `text` is the whitespace-normalized form of the cell and is what gets
/// compared and persisted; `value` is only used for formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub text: String,
    pub value: f64,
}

impl Reading {
    pub fn parse(raw: &str) -> Result<Self, ParseReadingError> {
        let text = normalize_text(raw);
        let value = text
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| ParseReadingError {
                raw: raw.to_string(),
            })?;
        Ok(Self { text, value })
    }
}
