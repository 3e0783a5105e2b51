/// Outcome of comparing a fresh reading with the persisted one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Changed { previous: Option<String> },
    Unchanged,
    /// The prior state could not be loaded, so no decision is possible.
    Failed { reason: String },
}

/// Collapses whitespace runs to a single space and trims both ends.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compares the current reading text against the stored one.
///
/// Equality is textual: "14.2" and "14.20" are different readings.
pub fn detect_change<E: std::fmt::Display>(
    previous: Result<Option<&str>, E>,
    current: &str,
) -> Detection {
    let previous = match previous {
        Ok(previous) => previous,
        Err(err) => {
            return Detection::Failed {
                reason: err.to_string(),
            };
        }
    };

    match previous.map(normalize_text) {
        Some(previous) if previous == normalize_text(current) => Detection::Unchanged,
        previous => Detection::Changed { previous },
    }
}
