use crate::browser::{PageDriver, RowQuery, WaitTarget};
use crate::error::ScrapeError;
use crate::logging;
use std::time::Duration;
use wlwatch_core::Reading;

/// Position of the water-level cell inside a station row.
pub const READING_CELL_OFFSET: usize = 2;

/// Finds the station row and returns the raw text of its reading cell.
pub async fn locate_reading_cell<D: PageDriver>(
    driver: &D,
    text: &str,
    timeout: Duration,
) -> Result<String, ScrapeError> {
    let not_found = || ScrapeError::StationNotFound {
        text: text.to_string(),
        timeout,
    };

    logging::Logger::new()
        .station(text)
        .info("station.wait", "Waiting for station text");
    // Only matches inside a table row count, so a stray hit elsewhere keeps us waiting.
    if !driver.wait_visible(WaitTarget::Text(text), timeout).await? {
        return match driver.query_row_cells(text).await? {
            RowQuery::NoRow => Err(ScrapeError::RowStructure(format!(
                "{text:?} never appeared inside a table row"
            ))),
            _ => Err(not_found()),
        };
    }

    match driver.query_row_cells(text).await? {
        RowQuery::NoMatch => Err(not_found()),
        RowQuery::NoRow => Err(ScrapeError::RowStructure(format!(
            "{text:?} is not inside a table row"
        ))),
        RowQuery::Cells(cells) => reading_cell(cells, text),
    }
}

fn reading_cell(mut cells: Vec<String>, text: &str) -> Result<String, ScrapeError> {
    if cells.len() <= READING_CELL_OFFSET {
        return Err(ScrapeError::RowStructure(format!(
            "row for {text:?} has {} cells, reading expected at index {READING_CELL_OFFSET}",
            cells.len()
        )));
    }
    Ok(cells.swap_remove(READING_CELL_OFFSET))
}

pub async fn extract_reading<D: PageDriver>(
    driver: &D,
    text: &str,
    timeout: Duration,
) -> Result<Reading, ScrapeError> {
    let raw = locate_reading_cell(driver, text, timeout).await?;
    let reading = Reading::parse(&raw)?;
    logging::Logger::new()
        .station(text)
        .value(&reading.text)
        .info("station.located", "Extracted station level");
    Ok(reading)
}
