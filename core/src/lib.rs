pub mod change;
pub mod message;
pub mod reading;

pub use change::{Detection, detect_change, normalize_text};
pub use reading::{ParseReadingError, Reading};

/// Unit used by the gauge network: meters above mean sea level.
pub const LEVEL_UNIT: &str = "ม.รทก.";
